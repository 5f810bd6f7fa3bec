use serde_json::json;

use crate::grading::GradingError;
use crate::store::StoreError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        let code = match e {
            StoreError::UnknownStudent(_) => "not_found",
            StoreError::EmptyField(_) => "bad_params",
        };
        HandlerErr::new(code, e.to_string())
    }
}

impl From<GradingError> for HandlerErr {
    fn from(e: GradingError) -> Self {
        let code = match &e {
            GradingError::ReadOnly => "forbidden",
            GradingError::CategoryNotOffered { .. } => "invalid_type",
            GradingError::UnknownField { .. } | GradingError::InvalidScore(_) => "invalid_score",
            GradingError::NotEligible | GradingError::NoSuchOption(_) => "not_eligible",
            GradingError::Store(StoreError::UnknownStudent(_)) => "not_found",
            GradingError::Store(StoreError::EmptyField(_)) => "bad_params",
        };
        HandlerErr::new(code, e.to_string())
    }
}
