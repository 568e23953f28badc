use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use maud::html;

use crate::pages::page;

/// Failure inside a page handler, such as a history slot that cannot be
/// written.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Error: {:?}", self.0);
        let body = page(
            "Error",
            html! {
                h1 { "Something went wrong" }
                p { (self.0.to_string()) }
                a href="/" { "Back to the tester" }
            },
        );
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
