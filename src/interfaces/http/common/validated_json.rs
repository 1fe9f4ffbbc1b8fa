//! `Json<T>` extractor that also enforces `validator` rules
//!
//! A body that does not parse is answered 400 `invalid_json`. A body that
//! parses but breaks a rule is answered 422 `validation_error`, with every
//! failing field path listed under `details.fields`.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::json;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use super::ApiError;

/// Deserialized and validated request body.
///
/// ```ignore
/// async fn checkout(ValidatedJson(req): ValidatedJson<CheckoutRequest>) { .. }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(unreadable_body)?;
        body.validate().map_err(|errors| broken_rules(&errors))?;
        Ok(Self(body))
    }
}

fn unreadable_body(rejection: JsonRejection) -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        "invalid_json",
        format!("Invalid JSON: {}", rejection.body_text()),
    )
}

fn broken_rules(errors: &ValidationErrors) -> ApiError {
    let mut fields = BTreeMap::new();
    collect_fields(errors, None, &mut fields);

    let message = if fields.is_empty() {
        "request body failed validation".to_string()
    } else {
        fields
            .iter()
            .map(|(path, reasons)| format!("{}: {}", path, reasons.join(", ")))
            .collect::<Vec<_>>()
            .join("; ")
    };
    ApiError::validation(message).with_details(json!({ "fields": fields }))
}

/// Flatten nested and list errors into `items[0].price` style paths.
fn collect_fields(
    errors: &ValidationErrors,
    parent: Option<&str>,
    out: &mut BTreeMap<String, Vec<String>>,
) {
    for (field, kind) in errors.errors() {
        let path = match parent {
            Some(parent) => format!("{}.{}", parent, field),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                out.entry(path).or_default().extend(list.iter().map(reason));
            }
            ValidationErrorsKind::Struct(inner) => collect_fields(inner, Some(&path), out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_fields(inner, Some(&format!("{}[{}]", path, index)), out);
                }
            }
        }
    }
}

fn reason(error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => error.code.to_string(),
    }
}
