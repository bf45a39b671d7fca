//! In-process HTTP server for exercising conditional requests.
//!
//! Serves a widget store whose resources carry entity tags and modification
//! timestamps, so clients can exercise `If-None-Match`, `If-Modified-Since`,
//! `If-Match`, and `If-Unmodified-Since` against real 304/412 answers. Side
//! endpoints cover CORS preflight (`/restricted`), OPTIONS rejection
//! (`/locked`), and header echoing (`/echo`).

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, options, post},
    Json, Router,
};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Widget {
    pub id: Uuid,
    pub name: String,
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl Widget {
    fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            revision: 1,
            // HTTP dates carry whole seconds only
            updated_at: Utc::now().trunc_subsecs(0),
        }
    }

    /// Opaque validator, without quotes or a weakness prefix.
    pub fn etag(&self) -> String {
        format!("rev-{}", self.revision)
    }
}

#[derive(Deserialize)]
pub struct WidgetInput {
    pub name: String,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Widget>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route(
            "/widgets",
            get(list_widgets).post(create_widget).options(widgets_options),
        )
        .route(
            "/widgets/{id}",
            get(get_widget).put(update_widget).delete(delete_widget),
        )
        .route("/restricted", options(restricted_options))
        .route("/locked", options(locked_options))
        .route("/echo", post(echo_headers))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// `If-None-Match` / `If-Match` value with any `W/` prefix and quotes removed.
fn tag_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    let raw = headers.get(name)?.to_str().ok()?.trim();
    let raw = raw.strip_prefix("W/").unwrap_or(raw);
    Some(raw.trim_matches('"').to_string())
}

fn date_value(headers: &HeaderMap, name: header::HeaderName) -> Option<DateTime<Utc>> {
    let raw = headers.get(name)?.to_str().ok()?;
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn validator_headers(widget: &Widget) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(etag) = HeaderValue::from_str(&format!("\"{}\"", widget.etag())) {
        headers.insert(header::ETAG, etag);
    }
    let last_modified = widget
        .updated_at
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    if let Ok(value) = HeaderValue::from_str(&last_modified) {
        headers.insert(header::LAST_MODIFIED, value);
    }
    headers
}

async fn list_widgets(State(db): State<Db>) -> Json<Vec<Widget>> {
    let widgets = db.read().await;
    Json(widgets.values().cloned().collect())
}

async fn create_widget(
    State(db): State<Db>,
    Json(input): Json<WidgetInput>,
) -> impl IntoResponse {
    let widget = Widget::new(input.name);
    let headers = validator_headers(&widget);
    db.write().await.insert(widget.id, widget.clone());
    (StatusCode::CREATED, headers, Json(widget))
}

async fn get_widget(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    request_headers: HeaderMap,
) -> Response {
    let widgets = db.read().await;
    let Some(widget) = widgets.get(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let unchanged = tag_value(&request_headers, header::IF_NONE_MATCH)
        .map(|tag| tag == widget.etag())
        .unwrap_or(false)
        || date_value(&request_headers, header::IF_MODIFIED_SINCE)
            .map(|since| widget.updated_at <= since)
            .unwrap_or(false);

    if unchanged {
        (StatusCode::NOT_MODIFIED, validator_headers(widget)).into_response()
    } else {
        (
            StatusCode::OK,
            validator_headers(widget),
            Json(widget.clone()),
        )
            .into_response()
    }
}

async fn update_widget(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    request_headers: HeaderMap,
    Json(input): Json<WidgetInput>,
) -> Response {
    let mut widgets = db.write().await;
    let Some(widget) = widgets.get_mut(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(tag) = tag_value(&request_headers, header::IF_MATCH) {
        if tag != widget.etag() {
            return StatusCode::PRECONDITION_FAILED.into_response();
        }
    }
    if let Some(since) = date_value(&request_headers, header::IF_UNMODIFIED_SINCE) {
        if widget.updated_at > since {
            return StatusCode::PRECONDITION_FAILED.into_response();
        }
    }

    widget.name = input.name;
    widget.revision += 1;
    widget.updated_at = Utc::now().trunc_subsecs(0);
    (
        StatusCode::OK,
        validator_headers(widget),
        Json(widget.clone()),
    )
        .into_response()
}

async fn delete_widget(State(db): State<Db>, Path(id): Path<Uuid>) -> StatusCode {
    if db.write().await.remove(&id).is_some() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn widgets_options() -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(header::ALLOW, HeaderValue::from_static("GET, POST, OPTIONS"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    (StatusCode::NO_CONTENT, headers)
}

async fn restricted_options() -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(header::ALLOW, HeaderValue::from_static("GET, POST, OPTIONS"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("https://app.example.com"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type, x-request-id"),
    );
    (StatusCode::NO_CONTENT, headers)
}

async fn locked_options() -> StatusCode {
    StatusCode::METHOD_NOT_ALLOWED
}

async fn echo_headers(request_headers: HeaderMap) -> Json<HashMap<String, Vec<String>>> {
    let mut echoed: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in request_headers.iter() {
        if let Ok(value) = value.to_str() {
            echoed
                .entry(name.as_str().to_string())
                .or_default()
                .push(value.to_string());
        }
    }
    Json(echoed)
}
