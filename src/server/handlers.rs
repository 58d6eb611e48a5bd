use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::feed::{encode_entry, encode_feed};
use crate::service::{FeedService, ServiceError};
use crate::storage::FeedStore;

pub const FEED_CONTENT_TYPE: &str = "application/atom+xml; type=feed;charset=UTF-8";
pub const ENTRY_CONTENT_TYPE: &str = "text/xml; charset=UTF-8";

/// GET /feeds/{feed}
pub async fn get_feed<S: FeedStore>(
    State(service): State<Arc<FeedService<S>>>,
    Path(feed): Path<String>,
) -> Result<Response, ServiceError> {
    let feed = service.get_feed(&feed).await?;
    let body = encode_feed(&feed)
        .map_err(|e| ServiceError::Internal(anyhow::Error::new(e).context("Failed to encode feed")))?;
    Ok(([(header::CONTENT_TYPE, FEED_CONTENT_TYPE)], body).into_response())
}

/// POST /feeds/{feed}
pub async fn add_entry<S: FeedStore>(
    State(service): State<Arc<FeedService<S>>>,
    Path(feed): Path<String>,
    body: Bytes,
) -> Result<Response, ServiceError> {
    let entry = service.add_entry(&feed, &body).await?;
    let body = encode_entry(&entry)
        .map_err(|e| ServiceError::Internal(anyhow::Error::new(e).context("Failed to encode entry")))?;
    Ok((
        StatusCode::CREATED,
        [(header::CONTENT_TYPE, ENTRY_CONTENT_TYPE)],
        body,
    )
        .into_response())
}

/// Client errors carry their message; internal errors are logged and
/// answered with a generic body.
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::NotFound(feed) => {
                tracing::debug!(feed = %feed, "Feed not found");
                (StatusCode::NOT_FOUND, "No such feed").into_response()
            }
            ServiceError::InvalidTitle | ServiceError::Decode(_) => {
                let message = self.to_string();
                tracing::debug!(error = %message, "Rejected request");
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            ServiceError::Internal(e) => {
                tracing::error!(error = %format!("{:#}", e), "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
