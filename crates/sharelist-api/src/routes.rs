use std::sync::{Arc, LazyLock};

use axum::extract::{MatchedPath, Path, Query, Request, State};
use axum::http::header::USER_AGENT;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sharelist_core::models::ordered_tasks;
use sharelist_core::remote::TodoBackend;
use sharelist_core::{ListId, Task, TaskId};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{AppError, Incident};

static UUID_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$").ok()
});

fn is_uuid(value: &str) -> bool {
    UUID_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(value))
}

/// List ids that can be placed in a redirect path without escaping
fn is_path_safe(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}

pub struct AppState<B> {
    pub backend: Arc<B>,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B> AppState<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }
}

pub fn app_router<B: TodoBackend + 'static>(state: AppState<B>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/list/{list_id}", get(show_list::<B>))
        .route("/list/{list_id}/tasks", get(list_tasks::<B>))
        .route_layer(middleware::from_fn(report_incidents))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

#[derive(Debug, Deserialize)]
struct RootQuery {
    list: Option<String>,
    task: Option<String>,
}

/// `/` opens a fresh list. Old share links (`/?list=..&task=..`) are forwarded.
async fn root(Query(query): Query<RootQuery>) -> Redirect {
    let legacy_list = query.list.filter(|list| is_path_safe(list));
    let Some(list_id) = legacy_list else {
        return Redirect::to(&format!("/list/{}", ListId::generate()));
    };

    match query.task.filter(|task| is_uuid(task)) {
        Some(task_id) => Redirect::to(&format!("/list/{list_id}?task_id={task_id}")),
        None => Redirect::to(&format!("/list/{list_id}")),
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    task_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListPage {
    list_id: ListId,
    task: Option<Task>,
    db_error: Option<String>,
}

/// Page data for a list: optional preloaded task plus a health check.
/// Backend failures are reported in the payload, never as an error status.
async fn show_list<B: TodoBackend>(
    State(state): State<AppState<B>>,
    Path(list_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Json<ListPage> {
    let list_id = ListId::from(list_id);

    let task = match query.task_id {
        Some(task_id) if is_uuid(&task_id) => {
            preload_task(state.backend.as_ref(), &list_id, &TaskId::from(task_id)).await
        }
        Some(task_id) => {
            tracing::warn!(list_id = %list_id, task_id = %task_id, "Invalid task_id format");
            None
        }
        None => None,
    };

    let db_error = match state.backend.count_tasks(Some(&list_id)).await {
        Ok(_) => None,
        Err(error) => {
            tracing::error!(list_id = %list_id, %error, "Database health check failed");
            Some(format!(
                "Database connection error for list {list_id}: {}. Please check server logs.",
                remote_message(&error)
            ))
        }
    };

    Json(ListPage {
        list_id,
        task,
        db_error,
    })
}

async fn preload_task<B: TodoBackend>(backend: &B, list_id: &ListId, task_id: &TaskId) -> Option<Task> {
    match backend.fetch_task(list_id, task_id).await {
        Ok(task) => task,
        Err(error) if error.is_no_rows() => None,
        Err(error) => {
            tracing::error!(list_id = %list_id, task_id = %task_id, %error, "Failed to preload task");
            None
        }
    }
}

fn remote_message(error: &sharelist_core::Error) -> String {
    match error {
        sharelist_core::Error::Remote(remote) => remote.message.clone(),
        other => other.to_string(),
    }
}

/// Tasks of a list in display order
async fn list_tasks<B: TodoBackend>(
    State(state): State<AppState<B>>,
    Path(list_id): Path<String>,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = state.backend.fetch_tasks(&ListId::from(list_id)).await?;
    Ok(Json(ordered_tasks(&tasks)))
}

/// Log every 5xx with its incident id and request context. Server errors
/// that did not come from [`AppError`] get an incident of their own.
async fn report_incidents(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string());
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let response = next.run(request).await;
    if !response.status().is_server_error() {
        return response;
    }

    let (incident, response) = match response.extensions().get::<Incident>().cloned() {
        Some(incident) => (incident, response),
        None => {
            let incident = Incident::new(response.status(), "Unhandled server error");
            (incident.clone(), incident.into_response())
        }
    };

    tracing::error!(
        error_id = %incident.id,
        status = incident.status.as_u16(),
        message = %incident.message,
        url = %uri,
        route = route.as_deref().unwrap_or("unknown"),
        method = %method,
        user_agent = user_agent.as_deref().unwrap_or("unknown"),
        timestamp = %Utc::now().to_rfc3339(),
        "Request failed"
    );
    response
}
