use serde_json::json;
use std::collections::BTreeSet;

use crate::access::{self, Section};
use crate::hierarchy::{self, distinct_branches, HierarchySelection};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{current_user, get_filter_str, get_required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{Program, StudentStatus};
use crate::store::{NewStudent, StudentPatch};

fn require_manager(state: &AppState) -> Result<(), HandlerErr> {
    let user = current_user(state)?;
    if !access::can_manage_students(user.role) {
        return Err(HandlerErr::new(
            "forbidden",
            "only admin and staff manage santri data",
        ));
    }
    Ok(())
}

fn parse_program(raw: Option<String>) -> Result<Option<Program>, HandlerErr> {
    raw.map(|p| {
        Program::parse(&p).ok_or_else(|| HandlerErr::bad_params(format!("unknown program: {}", p)))
    })
    .transpose()
}

fn branches_list(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    current_user(state)?;
    Ok(json!({ "branches": state.store.branches() }))
}

fn students_list(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let user = current_user(state)?;
    let students = access::visible_students(user, state.store.students());
    Ok(json!({ "students": students }))
}

fn students_get(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let user = current_user(state)?;
    let id = get_required_str(params, "studentId")?;
    // Out-of-scope students look the same as missing ones.
    let Some(student) = state
        .store
        .student(&id)
        .filter(|s| access::can_view_student(user, s))
    else {
        return Err(HandlerErr::new("not_found", format!("student not found: {}", id)));
    };
    Ok(json!({
        "student": student,
        "teacherName": state.store.teacher_name(&student.teacher_id),
        "examResult": state.store.exam_result(&student.id),
    }))
}

fn students_create(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_manager(state)?;
    let new: NewStudent = serde_json::from_value(params.clone())
        .map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    let id = state.store.add_student(new)?;
    Ok(json!({ "studentId": id }))
}

fn students_update(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_manager(state)?;
    let id = get_required_str(params, "studentId")?;
    let patch: StudentPatch = match params.get("patch") {
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|e| HandlerErr::bad_params(format!("patch: {}", e)))?,
        None => return Err(HandlerErr::bad_params("missing patch")),
    };
    let student = state.store.patch_student(&id, patch)?;
    Ok(json!({ "student": student }))
}

/// Branch → teacher → track drill-down for the santri list. Selectors left
/// out of `params` keep their previous value.
fn students_hierarchy(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let user = current_user(state)?;
    if !access::section_visible(user.role, Section::Santri) {
        return Err(HandlerErr::new("forbidden", "santri list is not available for this role"));
    }

    let mut wanted = state.roster.clone();
    if let Some(b) = get_filter_str(params, "branch")? {
        wanted.branch = Some(b);
    }
    if let Some(t) = get_filter_str(params, "teacherId")? {
        wanted.teacher_id = Some(t);
    }
    if let Some(p) = parse_program(get_filter_str(params, "track")?)? {
        wanted.track = p;
    }
    if let Some(raw) = get_filter_str(params, "status")? {
        wanted.status = StudentStatus::parse(&raw)
            .ok_or_else(|| HandlerErr::bad_params(format!("unknown status: {}", raw)))?;
    }

    let view = hierarchy::resolve(state.store.students(), &wanted);
    let teachers: Vec<serde_json::Value> = view
        .teachers
        .iter()
        .map(|id| json!({ "id": id, "name": state.store.teacher_name(id) }))
        .collect();
    let result = json!({
        "selection": view.selection,
        "branches": view.branches,
        "teachers": teachers,
        "tracksVisible": view.tracks_visible(),
        "tracks": Program::ALL.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
        "students": view.students,
    });
    let resolved: HierarchySelection = view.selection;
    state.roster = resolved;
    Ok(result)
}

/// Options for the flat Branch / Program / Grade dropdowns. Grades narrow to
/// the chosen program.
fn students_filter_options(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    current_user(state)?;
    let program = parse_program(get_filter_str(params, "program")?)?;
    let students = state.store.students();

    let grades: BTreeSet<&str> = students
        .iter()
        .filter(|s| program.map(|p| s.program == p).unwrap_or(true))
        .map(|s| s.grade.as_str())
        .collect();
    let mut teacher_ids: Vec<&str> = Vec::new();
    for s in students {
        if s.teacher_id.trim().is_empty() {
            continue;
        }
        if !teacher_ids.contains(&s.teacher_id.as_str()) {
            teacher_ids.push(s.teacher_id.as_str());
        }
    }
    let teachers: Vec<serde_json::Value> = teacher_ids
        .into_iter()
        .map(|id| json!({ "id": id, "name": state.store.teacher_name(id) }))
        .collect();

    Ok(json!({
        "branches": distinct_branches(students),
        "teachers": teachers,
        "grades": grades,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "branches.list" => branches_list(state),
        "students.list" => students_list(state),
        "students.get" => students_get(state, &req.params),
        "students.create" => students_create(state, &req.params),
        "students.update" => students_update(state, &req.params),
        "students.hierarchy" => students_hierarchy(state, &req.params),
        "students.filterOptions" => students_filter_options(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
