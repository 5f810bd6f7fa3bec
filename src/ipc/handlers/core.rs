use serde_json::json;
use tracing::info;

use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::get_required_str;
use crate::ipc::types::{AppState, Request};
use crate::model::{Role, User};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "user": state.user,
            "studentCount": state.store.students().len(),
            "userCount": state.store.users().len(),
            "examResultCount": state.store.exam_results().len(),
        }),
    )
}

/// No credentials are checked: any non-empty username gets in. A seeded user
/// with the same role and username is reused so ids line up with the data.
fn session_login(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let role_raw = get_required_str(params, "role")?;
    let role = Role::parse(&role_raw)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown role: {}", role_raw)))?;
    let username = get_required_str(params, "username")?;
    let username = username.trim();
    if username.is_empty() {
        return Err(HandlerErr::bad_params("username must not be empty"));
    }

    let user = match state.store.find_user(role, username) {
        Some(u) => u.clone(),
        None => synthesize_user(role, username),
    };
    info!(user_id = %user.id, role = ?user.role, "session started");
    state.grading = None;
    state.user = Some(user.clone());
    Ok(json!({ "user": user }))
}

fn synthesize_user(role: Role, username: &str) -> User {
    let (id, name) = match role {
        // A guardian logs in with the NIS of their child.
        Role::Guardian => (username.to_string(), format!("Wali Santri {}", username)),
        Role::Teacher => (username.to_string(), format!("Ustadz {}", username)),
        Role::Staff => (username.to_string(), format!("Staf {}", username)),
        Role::Admin => {
            let mut name = username.to_string();
            if let Some(first) = name.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            (format!("admin-{}", username), name)
        }
    };
    User {
        id,
        name,
        role,
        username: Some(username.to_string()),
        email: None,
        phone: None,
        branch: None,
        is_active: true,
    }
}

fn handle_session_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    match session_login(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_session_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(user) = state.user.take() {
        info!(user_id = %user.id, "session ended");
    }
    state.grading = None;
    ok(&req.id, json!({}))
}

fn handle_session_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "user": state.user }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "session.login" => Some(handle_session_login(state, req)),
        "session.logout" => Some(handle_session_logout(state, req)),
        "session.current" => Some(handle_session_current(state, req)),
        _ => None,
    }
}
