use serde_json::json;

use crate::access::{self, Section};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{current_user, get_required_str};
use crate::ipc::types::{AppState, Request};

fn access_menu(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let user = current_user(state)?;
    let sections: Vec<serde_json::Value> = access::menu(user.role)
        .into_iter()
        .map(|s| json!({ "id": s.id(), "label": s.label() }))
        .collect();
    Ok(json!({
        "role": user.role,
        "sections": sections,
        "canEditExams": access::can_edit_exams(user.role),
        "canManageStudents": access::can_manage_students(user.role),
    }))
}

fn access_check(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let user = current_user(state)?;
    let raw = get_required_str(params, "section")?;
    let section = Section::parse(&raw)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown section: {}", raw)))?;
    Ok(json!({
        "section": section.id(),
        "visible": access::section_visible(user.role, section),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "access.menu" => access_menu(state),
        "access.check" => access_check(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
