use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{AnswerSet, Identity, UserId};
use super::location::Geocoder;
use super::repository::{PersistenceError, ProfileRepository};
use super::service::{EntryDecision, OnboardingService, OnboardingServiceError};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Router builder exposing the onboarding endpoints.
pub fn onboarding_router<R, G>(service: Arc<OnboardingService<R, G>>) -> Router
where
    R: ProfileRepository + 'static,
    G: Geocoder + 'static,
{
    Router::new()
        .route("/api/v1/onboarding/entry", get(entry_handler::<R, G>))
        .route("/api/v1/onboarding/flows/:flow", get(flow_handler::<R, G>))
        .route(
            "/api/v1/onboarding/basic-info",
            post(basic_info_handler::<R, G>),
        )
        .route(
            "/api/v1/onboarding/questionnaire",
            post(questionnaire_handler::<R, G>),
        )
        .route("/api/v1/locations", get(locations_handler::<R, G>))
        .with_state(service)
}

/// Identity forwarded by the auth layer in front of this service.
pub fn identity_from_headers(headers: &HeaderMap) -> Option<Identity> {
    let user_id = headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|value| !value.is_empty())?;
    let email = headers
        .get(USER_EMAIL_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    Some(Identity {
        user_id: UserId(user_id.to_string()),
        email: email.trim().to_string(),
    })
}

fn decision_payload(decision: EntryDecision) -> serde_json::Value {
    json!({
        "decision": decision,
        "redirect": decision.redirect(),
    })
}

fn error_response(error: OnboardingServiceError) -> Response {
    match error {
        OnboardingServiceError::Unauthenticated => {
            let payload = json!({
                "error": error.to_string(),
                "redirect": EntryDecision::Login.redirect(),
            });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        }
        OnboardingServiceError::Invalid(step_error) => {
            let payload = json!({
                "error": step_error.error.to_string(),
                "step": step_error.step,
                "field": step_error.field,
                "detail": step_error.error,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        OnboardingServiceError::Persistence(PersistenceError::Unavailable(reason)) => {
            let payload = json!({
                "error": "profile storage unavailable",
                "detail": reason,
            });
            (StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response()
        }
        other => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn entry_handler<R, G>(
    State(service): State<Arc<OnboardingService<R, G>>>,
    headers: HeaderMap,
) -> Response
where
    R: ProfileRepository + 'static,
    G: Geocoder + 'static,
{
    let identity = identity_from_headers(&headers);
    match service.entry(identity.as_ref()) {
        Ok(decision) => (StatusCode::OK, axum::Json(decision_payload(decision))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn flow_handler<R, G>(
    State(service): State<Arc<OnboardingService<R, G>>>,
    Path(flow): Path<String>,
) -> Response
where
    R: ProfileRepository + 'static,
    G: Geocoder + 'static,
{
    match service.flows().by_name(&flow) {
        Some(table) => (StatusCode::OK, axum::Json(table)).into_response(),
        None => {
            let payload = json!({
                "error": format!("unknown onboarding flow '{flow}'"),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn basic_info_handler<R, G>(
    State(service): State<Arc<OnboardingService<R, G>>>,
    headers: HeaderMap,
    axum::Json(answers): axum::Json<AnswerSet>,
) -> Response
where
    R: ProfileRepository + 'static,
    G: Geocoder + 'static,
{
    let identity = identity_from_headers(&headers);
    match service.submit_basic_info(identity.as_ref(), answers) {
        Ok(next) => (StatusCode::OK, axum::Json(decision_payload(next))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn questionnaire_handler<R, G>(
    State(service): State<Arc<OnboardingService<R, G>>>,
    headers: HeaderMap,
    axum::Json(answers): axum::Json<AnswerSet>,
) -> Response
where
    R: ProfileRepository + 'static,
    G: Geocoder + 'static,
{
    let identity = identity_from_headers(&headers);
    match service.submit_questionnaire(identity.as_ref(), answers) {
        Ok(next) => (StatusCode::OK, axum::Json(decision_payload(next))).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationQuery {
    #[serde(default)]
    q: String,
}

pub(crate) async fn locations_handler<R, G>(
    State(service): State<Arc<OnboardingService<R, G>>>,
    Query(query): Query<LocationQuery>,
) -> Response
where
    R: ProfileRepository + 'static,
    G: Geocoder + 'static,
{
    let places = service.suggest_locations(&query.q).await;
    (StatusCode::OK, axum::Json(json!({ "results": places }))).into_response()
}
