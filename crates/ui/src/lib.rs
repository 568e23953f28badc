pub mod composer;
pub mod draft;
pub mod error;
pub mod history;
pub mod pages;

use std::result::Result as StdResult;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post, put};
use axum::{Form, Router};
use maud::Markup;
use parking_lot::Mutex;
use serde::Deserialize;
use shared_types::HttpMethod;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::composer::{Composer, RelayClient};
use crate::draft::{Draft, RowEdit, Rows};
use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub composer: Arc<Mutex<Composer>>,
    pub relay: RelayClient,
}

impl AppState {
    pub fn new(composer: Composer, relay: RelayClient) -> Self {
        Self {
            composer: Arc::new(Mutex::new(composer)),
            relay,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/send", post(send))
        .route("/draft/method", post(set_method))
        .route("/body/format", post(format_body))
        .route("/body/clear", post(clear_body))
        .route("/rows/:rows", post(add_row))
        .route("/rows/:rows/:index", put(edit_row).delete(remove_row))
        .route("/requests/:id", get(load_request).delete(delete_request))
        .nest_service(
            "/static",
            ServeDir::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static")),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Markup {
    let composer = state.composer.lock();
    pages::index(&composer)
}

#[derive(Debug, Deserialize)]
pub struct SendForm {
    #[serde(default)]
    pub name: String,
    pub url: String,
    pub method: HttpMethod,
    pub body: Option<String>,
}

async fn send(State(state): State<AppState>, Form(form): Form<SendForm>) -> Response {
    let pending = {
        let mut composer = state.composer.lock();
        composer.draft.name = form.name;
        composer.draft.url = form.url;
        if let Some(body) = form.body {
            composer.draft.body = body;
        }
        composer.draft.set_method(form.method);

        match composer.begin_send() {
            Ok(pending) => pending,
            Err(err) => {
                tracing::debug!("Send rejected: {}", err);
                return Redirect::to("/").into_response();
            }
        }
    };

    // a dropped browser connection must not leave the composer loading
    let task_state = state.clone();
    let task_pending = pending.clone();
    let finished = tokio::spawn(async move {
        let outcome = task_state.relay.execute(&task_pending.request).await;
        task_state.composer.lock().finish_send(task_pending, outcome);
    })
    .await;

    if let Err(err) = finished {
        tracing::error!("Send task failed: {:?}", err);
        state
            .composer
            .lock()
            .finish_send(pending, Err(anyhow::anyhow!("Failed to make request")));
    }

    Redirect::to("/").into_response()
}

/// Request bar values sent along with draft edits so unsent typing survives
/// the re-render.
#[derive(Debug, Default, Deserialize)]
pub struct BarForm {
    pub name: Option<String>,
    pub url: Option<String>,
    // the textarea is disabled, and so not submitted, for GET
    pub body: Option<String>,
}

impl BarForm {
    fn apply(self, draft: &mut Draft) {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(url) = self.url {
            draft.url = url;
        }
        if let Some(body) = self.body {
            draft.body = body;
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MethodForm {
    pub method: HttpMethod,
    pub name: Option<String>,
    pub url: Option<String>,
    pub body: Option<String>,
}

async fn set_method(State(state): State<AppState>, Form(form): Form<MethodForm>) -> Redirect {
    let mut composer = state.composer.lock();
    let bar = BarForm {
        name: form.name,
        url: form.url,
        body: form.body,
    };
    bar.apply(&mut composer.draft);
    composer.draft.set_method(form.method);
    Redirect::to("/")
}

async fn format_body(State(state): State<AppState>, Form(bar): Form<BarForm>) -> Redirect {
    let mut composer = state.composer.lock();
    bar.apply(&mut composer.draft);
    let formatted = composer.draft.format_body();
    composer.notice = formatted.err();
    Redirect::to("/")
}

async fn clear_body(State(state): State<AppState>, Form(bar): Form<BarForm>) -> Redirect {
    let mut composer = state.composer.lock();
    bar.apply(&mut composer.draft);
    composer.draft.clear_body();
    Redirect::to("/")
}

fn parse_rows(segment: &str) -> StdResult<Rows, StatusCode> {
    match segment {
        "headers" => Ok(Rows::Headers),
        "params" => Ok(Rows::QueryParams),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn add_row(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Form(bar): Form<BarForm>,
) -> StdResult<Redirect, StatusCode> {
    let rows = parse_rows(&segment)?;
    let mut composer = state.composer.lock();
    bar.apply(&mut composer.draft);
    composer.draft.add_row(rows);
    Ok(Redirect::to("/"))
}

#[derive(Debug, Deserialize)]
pub struct RowForm {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
    // unchecked checkboxes are not submitted
    pub enabled: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub body: Option<String>,
}

async fn edit_row(
    State(state): State<AppState>,
    Path((segment, index)): Path<(String, usize)>,
    Form(form): Form<RowForm>,
) -> StdResult<Redirect, StatusCode> {
    let rows = parse_rows(&segment)?;
    let mut composer = state.composer.lock();
    let draft = &mut composer.draft;
    let bar = BarForm {
        name: form.name,
        url: form.url,
        body: form.body,
    };
    bar.apply(draft);
    draft.edit_row(rows, index, RowEdit::Key(form.key));
    draft.edit_row(rows, index, RowEdit::Value(form.value));
    draft.edit_row(rows, index, RowEdit::Enabled(form.enabled.is_some()));
    Ok(Redirect::to("/"))
}

// htmx puts DELETE parameters in the query string
async fn remove_row(
    State(state): State<AppState>,
    Path((segment, index)): Path<(String, usize)>,
    Query(bar): Query<BarForm>,
) -> StdResult<Redirect, StatusCode> {
    let rows = parse_rows(&segment)?;
    let mut composer = state.composer.lock();
    bar.apply(&mut composer.draft);
    composer.draft.remove_row(rows, index);
    Ok(Redirect::to("/"))
}

async fn load_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StdResult<Redirect, StatusCode> {
    match state.composer.lock().load_saved(&id) {
        Some(_) => Ok(Redirect::to("/")),
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn delete_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StdResult<Redirect, AppError> {
    state.composer.lock().delete_saved(&id)?;
    Ok(Redirect::to("/"))
}
