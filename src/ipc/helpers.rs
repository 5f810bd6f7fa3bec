use crate::ipc::error::HandlerErr;
use crate::ipc::types::AppState;
use crate::model::User;

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Missing, null and `"All"` all mean "no constraint".
pub fn get_filter_str(params: &serde_json::Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => {
            let Some(s) = v.as_str() else {
                return Err(HandlerErr::bad_params(format!(
                    "{} must be string or null",
                    key
                )));
            };
            let t = s.trim();
            if t.is_empty() || t.eq_ignore_ascii_case("ALL") {
                Ok(None)
            } else {
                Ok(Some(t.to_string()))
            }
        }
    }
}

pub fn current_user(state: &AppState) -> Result<&User, HandlerErr> {
    state
        .user
        .as_ref()
        .ok_or_else(|| HandlerErr::new("not_logged_in", "log in first"))
}
