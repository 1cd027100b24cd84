// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! IxADO web control plane (SSE only)
//!
//! HTTP endpoints exposing state queries, mutations, and the per-agent
//! live log stream. The HTML UI is a separate concern; this crate serves
//! JSON and Server-Sent Events.

mod chatter;
mod routes;
mod stream;

pub use chatter::{contains_terminal_keywords, is_file_interaction_chatter, should_suppress};
pub use routes::{router, sort_agents, AppState, WebRunner};
pub use stream::{derive_failure_summary, enrich_event, EnrichedFrame, RecoveryLink};

use std::net::SocketAddr;
use std::sync::Arc;

/// Bind and serve the control plane until the process exits.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<(), std::io::Error> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "web control plane listening");
    axum::serve(listener, app).await
}
