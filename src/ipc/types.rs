use serde::Deserialize;

use crate::grading::GradingSession;
use crate::hierarchy::HierarchySelection;
use crate::model::User;
use crate::store::Store;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub store: Store,
    pub user: Option<User>,
    /// Last resolved santri-list selection, kept between requests.
    pub roster: HierarchySelection,
    pub grading: Option<GradingSession>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            user: None,
            roster: HierarchySelection::default(),
            grading: None,
        }
    }
}
