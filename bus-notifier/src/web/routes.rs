//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};
use tracing::{error, warn};

use crate::domain::{Subscription, UserId};
use crate::store::SubscribeError;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/routes", get(list_routes))
        .route(
            "/users/:user/subscriptions",
            get(list_subscriptions).post(subscribe),
        )
        .route("/users/:user/subscriptions/:index", delete(unsubscribe))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Every route in the catalog, sorted by name.
async fn list_routes(State(state): State<AppState>) -> Json<RoutesResponse> {
    let routes = state
        .catalog()
        .list()
        .await
        .into_iter()
        .map(RouteSummary::from)
        .collect();

    Json(RoutesResponse { routes })
}

async fn list_subscriptions(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<SubscriptionsResponse>, AppError> {
    let user = parse_user(&user)?;
    let subs = state.subscriptions.list(&user).await?;
    Ok(Json(response_for(&user, subs)))
}

/// Add a subscription; responds with the user's updated list.
async fn subscribe(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(req): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<SubscriptionsResponse>), AppError> {
    let user = parse_user(&user)?;
    if req.target_stop.trim().is_empty() {
        return Err(AppError::BadRequest {
            message: "target_stop must not be empty".into(),
        });
    }

    state
        .subscriptions
        .subscribe(&user, req.into_subscription())
        .await?;
    let subs = state.subscriptions.list(&user).await?;

    Ok((StatusCode::CREATED, Json(response_for(&user, subs))))
}

/// Remove a subscription by position; responds with the removed entry.
async fn unsubscribe(
    State(state): State<AppState>,
    Path((user, index)): Path<(String, usize)>,
) -> Result<Json<SubscriptionView>, AppError> {
    let user = parse_user(&user)?;
    let removed = state.subscriptions.unsubscribe(&user, index).await?;
    Ok(Json(SubscriptionView::new(index, removed)))
}

fn parse_user(raw: &str) -> Result<UserId, AppError> {
    UserId::parse(raw).map_err(|e| AppError::BadRequest {
        message: e.to_string(),
    })
}

fn response_for(user: &UserId, subs: Vec<Subscription>) -> SubscriptionsResponse {
    SubscriptionsResponse {
        user: user.to_string(),
        subscriptions: subs
            .into_iter()
            .enumerate()
            .map(|(i, s)| SubscriptionView::new(i, s))
            .collect(),
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Internal { message: String },
}

impl From<SubscribeError> for AppError {
    fn from(e: SubscribeError) -> Self {
        match e {
            SubscribeError::Validation(_) => AppError::BadRequest {
                message: e.to_string(),
            },
            SubscribeError::NotFound { .. } => AppError::NotFound {
                message: e.to_string(),
            },
            SubscribeError::Store(_) => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "Request failed");
        } else {
            warn!(%status, %message, "Request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
