// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::{
    body::Bytes,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, Method, StatusCode, Uri},
    middleware::map_response,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::application::spark_application::SparkApplicationService;
use crate::domain::repository::RegistryError;
use crate::domain::status::ApplicationRef;
use crate::presentation::translator::{self, ValidationError};
use crate::presentation::wire::{
    Empty, ErrorBody, HealthResponse, ListSparkApplicationsResponse, SparkApplication,
};

pub struct AppState {
    pub service: Arc<dyn SparkApplicationService>,
}

/// Bare router, without transport middleware.
pub fn app(service: Arc<dyn SparkApplicationService>) -> Router {
    let state = Arc::new(AppState { service });

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/namespaces/{namespace}/applications",
            post(create_application).get(list_applications),
        )
        .route(
            "/api/v1/namespaces/{namespace}/applications/{name}",
            get(get_application).delete(delete_application),
        )
        .route(
            "/api/v1/namespaces/{namespace}/applications/{name}/status",
            post(transition_status),
        )
        .route(
            "/api/v1/namespaces/{namespace}/applications/{name}/events",
            get(watch_application),
        )
        .fallback(unmatched_route)
        .method_not_allowed_fallback(unsupported_method)
        .with_state(state)
}

/// Router with request tracing and a per-request deadline. A request that
/// misses the deadline is dropped, which cancels its handler.
pub fn app_with_layers(service: Arc<dyn SparkApplicationService>, request_timeout: Duration) -> Router {
    app(service)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(map_response(deadline_as_error))
        .layer(TraceLayer::new_for_http())
}

/// `TimeoutLayer` answers with a bare 408; give it the JSON error body.
async fn deadline_as_error(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return ApiError::DeadlineExceeded.into_response();
    }
    response
}

async fn unmatched_route(method: Method, uri: Uri) -> ApiError {
    ApiError::UnmatchedRoute {
        method,
        path: uri.path().to_string(),
    }
}

async fn unsupported_method(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed {
        method,
        path: uri.path().to_string(),
    }
}

/// `Path` whose rejection is reported as an `INVALID_ARGUMENT` error body.
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(ValidationError::MalformedPath(rejection.body_text()).into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("no route for {method} {path}")]
    UnmatchedRoute { method: Method, path: String },

    #[error("method {method} is not supported on {path}")]
    MethodNotAllowed { method: Method, path: String },

    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            Self::Registry(RegistryError::AlreadyExists { .. }) => {
                (StatusCode::CONFLICT, "ALREADY_EXISTS")
            }
            Self::Registry(RegistryError::NotFound { .. }) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Registry(RegistryError::Transition(_)) => (StatusCode::CONFLICT, "ABORTED"),
            Self::Registry(RegistryError::Identity(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
            }
            Self::UnmatchedRoute { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::MethodNotAllowed { .. } => (StatusCode::METHOD_NOT_ALLOWED, "UNIMPLEMENTED"),
            Self::DeadlineExceeded => (StatusCode::REQUEST_TIMEOUT, "DEADLINE_EXCEEDED"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!(code, "Request rejected: {}", self);
        }

        let body = ErrorBody {
            code: code.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

async fn create_application(
    State(state): State<Arc<AppState>>,
    ApiPath(namespace): ApiPath<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<SparkApplication>), ApiError> {
    translator::validate_path(&namespace, None)?;
    let request = translator::decode_create_request(&body)?;
    let spec = translator::to_application_spec(request)?;

    let application = state.service.create_application(&namespace, spec).await?;
    Ok((StatusCode::CREATED, Json(translator::to_wire(&application))))
}

async fn list_applications(
    State(state): State<Arc<AppState>>,
    ApiPath(namespace): ApiPath<String>,
) -> Result<Json<ListSparkApplicationsResponse>, ApiError> {
    translator::validate_path(&namespace, None)?;
    let applications = state.service.list_applications(&namespace).await;
    Ok(Json(translator::to_list_response(&applications)))
}

async fn get_application(
    State(state): State<Arc<AppState>>,
    ApiPath((namespace, name)): ApiPath<(String, String)>,
) -> Result<Json<SparkApplication>, ApiError> {
    translator::validate_path(&namespace, Some(&name))?;
    let application = state.service.get_application(&namespace, &name).await?;
    Ok(Json(translator::to_wire(&application)))
}

async fn delete_application(
    State(state): State<Arc<AppState>>,
    ApiPath((namespace, name)): ApiPath<(String, String)>,
) -> Result<Json<Empty>, ApiError> {
    translator::validate_path(&namespace, Some(&name))?;
    state.service.delete_application(&namespace, &name).await?;
    Ok(Json(Empty {}))
}

async fn transition_status(
    State(state): State<Arc<AppState>>,
    ApiPath((namespace, name)): ApiPath<(String, String)>,
    body: Bytes,
) -> Result<Json<SparkApplication>, ApiError> {
    translator::validate_path(&namespace, Some(&name))?;
    let request = translator::decode_transition_request(&body)?;

    let outcome = state
        .service
        .transition_application(&namespace, &ApplicationRef::Name(name), &request)
        .await?;
    Ok(Json(translator::to_wire(&outcome.application)))
}

async fn watch_application(
    State(state): State<Arc<AppState>>,
    ApiPath((namespace, name)): ApiPath<(String, String)>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    translator::validate_path(&namespace, Some(&name))?;
    let events = state.service.watch_application(&namespace, &name).await?;

    let stream = events.map(|event| {
        Event::default()
            .event(event.kind())
            .json_data(translator::to_wire_event(&event))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
