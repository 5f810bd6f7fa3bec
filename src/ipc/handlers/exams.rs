use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;

use crate::access;
use crate::exam::{rating_label, round_off_1_decimal, ExamCategory, PASSING_AVERAGE, SCORE_OPTIONS, UNGRADED};
use crate::grading::GradingSession;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{current_user, get_filter_str, get_required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{ExamResult, Program, Student};

fn exams_criteria() -> serde_json::Value {
    let categories: Vec<serde_json::Value> = ExamCategory::ALL
        .iter()
        .map(|c| {
            json!({
                "type": c,
                "label": c.label(),
                "program": c.program(),
                "fields": c.fields(),
            })
        })
        .collect();
    json!({
        "categories": categories,
        "scoreOptions": SCORE_OPTIONS,
        "ungradedScore": UNGRADED,
        "passingAverage": PASSING_AVERAGE,
    })
}

fn result_summary(result: Option<&ExamResult>) -> serde_json::Value {
    match result {
        Some(r) => json!({
            "type": r.category,
            "average": r.average,
            "rating": rating_label(r.average),
            "date": r.date,
        }),
        None => serde_json::Value::Null,
    }
}

/// Students the current user may grade or view, narrowed by the flat
/// Branch / Program / Grade filters.
fn exams_roster(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let user = current_user(state)?;
    let branch = get_filter_str(params, "branch")?;
    let program = match get_filter_str(params, "program")? {
        Some(p) => Some(
            Program::parse(&p)
                .ok_or_else(|| HandlerErr::bad_params(format!("unknown program: {}", p)))?,
        ),
        None => None,
    };
    let grade = get_filter_str(params, "grade")?;

    let rows: Vec<serde_json::Value> = access::visible_students(user, state.store.students())
        .into_iter()
        .filter(|s| branch.as_deref().map(|b| s.branch == b).unwrap_or(true))
        .filter(|s| program.map(|p| s.program == p).unwrap_or(true))
        .filter(|s| grade.as_deref().map(|g| s.grade == g).unwrap_or(true))
        .map(|s| {
            let result = state.store.exam_result(&s.id);
            json!({
                "student": s,
                "graded": result.and_then(|r| r.average).is_some(),
                "result": result_summary(result),
            })
        })
        .collect();
    Ok(json!({
        "readOnly": !access::can_edit_exams(user.role),
        "students": rows,
    }))
}

fn visible_student<'a>(state: &'a AppState, id: &str) -> Result<&'a Student, HandlerErr> {
    let user = current_user(state)?;
    state
        .store
        .student(id)
        .filter(|s| access::can_view_student(user, s))
        .ok_or_else(|| HandlerErr::new("not_found", format!("student not found: {}", id)))
}

fn exams_open(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "studentId")?;
    let read_only = !access::can_edit_exams(current_user(state)?.role);
    let student = visible_student(state, &id)?;
    let session = GradingSession::open(student, state.store.exam_result(&id), read_only);
    let view = session.view();
    state.grading = Some(session);
    Ok(json!({ "session": view }))
}

/// The open session, checked against `sessionId` when the caller sends one.
fn open_session<'a>(
    state: &'a mut AppState,
    params: &serde_json::Value,
) -> Result<&'a mut GradingSession, HandlerErr> {
    current_user(state)?;
    let wanted = get_filter_str(params, "sessionId")?;
    let Some(session) = state.grading.as_mut() else {
        return Err(HandlerErr::new("no_session", "open a student's exam sheet first"));
    };
    if let Some(w) = wanted {
        if session.id().to_string() != w {
            return Err(HandlerErr::new("no_session", "exam sheet was closed or replaced"));
        }
    }
    Ok(session)
}

fn exams_set_type(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let raw = get_required_str(params, "type")?;
    let category = ExamCategory::parse(&raw)
        .ok_or_else(|| HandlerErr::new("invalid_type", format!("unknown exam type: {}", raw)))?;
    let session = open_session(state, params)?;
    session.set_category(category)?;
    Ok(json!({ "session": session.view() }))
}

fn exams_set_score(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let field = get_required_str(params, "field")?;
    let score = params
        .get("score")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params("missing score"))?;
    let session = open_session(state, params)?;
    session.set_score(&field, score, Utc::now())?;
    Ok(json!({ "session": session.view() }))
}

fn exams_set_notes(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let notes = get_required_str(params, "notes")?;
    let session = open_session(state, params)?;
    session.set_notes(&notes)?;
    Ok(json!({ "session": session.view() }))
}

fn exams_promotion_repeat(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let session = open_session(state, params)?;
    session.choose_repeat()?;
    Ok(json!({ "session": session.view() }))
}

fn exams_promotion_advance(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let index = match params.get("optionIndex") {
        None => 0,
        Some(v) if v.is_null() => 0,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| HandlerErr::bad_params("optionIndex must be a non-negative integer"))?
            as usize,
    };
    let session = open_session(state, params)?;
    session.choose_advance(index)?;
    Ok(json!({ "session": session.view() }))
}

fn exams_save(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    // The sheet stays open until the commit succeeds.
    let session = open_session(state, params)?.clone();
    let outcome = session.commit(&mut state.store, Utc::now())?;
    state.grading = None;
    Ok(json!(outcome))
}

fn exams_close(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    current_user(state)?;
    state.grading = None;
    Ok(json!({}))
}

fn exams_results(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let user = current_user(state)?;
    let results: Vec<serde_json::Value> = access::visible_students(user, state.store.students())
        .into_iter()
        .filter_map(|s| state.store.exam_result(&s.id).map(|r| (s, r)))
        .map(|(s, r)| {
            json!({
                "studentId": s.id,
                "name": s.name,
                "result": r,
                "rating": rating_label(r.average),
            })
        })
        .collect();
    Ok(json!({ "results": results }))
}

/// Mean of saved averages per exam category over the visible students.
fn exams_recap(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let user = current_user(state)?;
    let students = access::visible_students(user, state.store.students());

    let mut totals: BTreeMap<ExamCategory, (f64, usize)> =
        ExamCategory::ALL.iter().map(|c| (*c, (0.0, 0))).collect();
    for s in &students {
        let Some(r) = state.store.exam_result(&s.id) else {
            continue;
        };
        let Some(avg) = r.average else {
            continue;
        };
        if let Some(entry) = totals.get_mut(&r.category) {
            entry.0 += avg;
            entry.1 += 1;
        }
    }

    let categories: Vec<serde_json::Value> = ExamCategory::ALL
        .iter()
        .map(|c| {
            let (total, count) = totals.get(c).copied().unwrap_or((0.0, 0));
            let average = (count > 0).then(|| round_off_1_decimal(total / count as f64));
            json!({
                "type": c,
                "label": c.label(),
                "average": average,
                "count": count,
            })
        })
        .collect();
    Ok(json!({
        "studentCount": students.len(),
        "categories": categories,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "exams.criteria" => Ok(exams_criteria()),
        "exams.roster" => exams_roster(state, &req.params),
        "exams.open" => exams_open(state, &req.params),
        "exams.setType" => exams_set_type(state, &req.params),
        "exams.setScore" => exams_set_score(state, &req.params),
        "exams.setNotes" => exams_set_notes(state, &req.params),
        "exams.promotion.repeat" => exams_promotion_repeat(state, &req.params),
        "exams.promotion.advance" => exams_promotion_advance(state, &req.params),
        "exams.save" => exams_save(state, &req.params),
        "exams.close" => exams_close(state),
        "exams.results" => exams_results(state),
        "exams.recap" => exams_recap(state),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::seed::Seed;
    use crate::store::Store;

    fn value(result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
        match result {
            Ok(v) => v,
            Err(e) => panic!("{}: {}", e.code, e.message),
        }
    }

    #[test]
    fn failed_save_keeps_the_sheet_open() {
        let store = Store::new(Seed::demo());
        let teacher = store.find_user(Role::Teacher, "sayyadi").cloned();
        let mut state = AppState::new(store);
        state.user = teacher;

        value(exams_open(&mut state, &json!({ "studentId": "NIS002" })));
        value(exams_set_score(
            &mut state,
            &json!({ "field": "Ketelitian Huruf", "score": 80 }),
        ));

        // Directory without the student: the commit cannot land.
        let full = std::mem::replace(
            &mut state.store,
            Store::new(Seed {
                students: Vec::new(),
                ..Seed::demo()
            }),
        );
        let Err(e) = exams_save(&mut state, &json!({})) else {
            panic!("save into a directory without NIS002 must fail");
        };
        assert_eq!(e.code, "not_found");
        let kept = state.grading.as_ref().map(|s| s.view());
        assert_eq!(kept.and_then(|v| v.average), Some(40.0));

        state.store = full;
        let saved = value(exams_save(&mut state, &json!({})));
        assert_eq!(saved["saved"], true);
        assert!(state.grading.is_none());
        assert!(state.store.exam_result("NIS002").is_some());
    }
}
