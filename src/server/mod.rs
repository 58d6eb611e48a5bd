//! HTTP boundary: maps `/feeds/{feed}` requests onto [`FeedService`] calls.

mod handlers;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::service::FeedService;
use crate::storage::FeedStore;

pub use handlers::{ENTRY_CONTENT_TYPE, FEED_CONTENT_TYPE};

pub fn create_router<S: FeedStore>(service: Arc<FeedService<S>>) -> Router {
    Router::new()
        .route(
            "/feeds/{feed}",
            get(handlers::get_feed::<S>).post(handlers::add_entry::<S>),
        )
        .with_state(service)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn run_server<S: FeedStore>(
    addr: SocketAddr,
    service: Arc<FeedService<S>>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, create_router(service)).await?;
    Ok(())
}
