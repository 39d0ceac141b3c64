//! HTTP serve command implementation.
//!
//! `GET /v1/{id}` fetches report `id` with the shared session and returns
//! the portal's JSON body unchanged.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use clap::Args;
use tracing::{error, info, warn};

use axiom::AuthenticatedClient;

use crate::config::Config;

const ERROR_BODY: &str = "There was an error. Check the logs";

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:3000")]
    pub addr: SocketAddr,
}

pub async fn run(args: ServeArgs, config: Config) -> Result<()> {
    let client = Arc::new(super::connect(&config).await?);
    let app = router(client);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;
    info!(addr = %args.addr, "Serving reports");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Interrupted, shutting down");
        })
        .await
        .context("Server error")
}

pub fn router(client: Arc<AuthenticatedClient>) -> Router {
    Router::new()
        .route("/v1/:id", get(get_report))
        .route("/health", get(health))
        .with_state(client)
}

async fn health() -> &'static str {
    "ok"
}

async fn get_report(State(client): State<Arc<AuthenticatedClient>>, Path(id): Path<u64>) -> Response {
    match fetch_with_retry(&client, id).await {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => {
            error!(report_id = id, error = %err, "Failed to serve report");
            (StatusCode::BAD_GATEWAY, ERROR_BODY).into_response()
        }
    }
}

/// Fetch a report, logging in again once if the session has expired.
///
/// Requests that fail on the same expired session share one login.
async fn fetch_with_retry(client: &AuthenticatedClient, id: u64) -> axiom::Result<Vec<u8>> {
    let session = client.session().await;
    match session.fetch_resource(id).await {
        Err(err) if err.is_auth_expired() => {
            warn!(report_id = id, "Session expired");
            client.replace_expired(&session).await?;
            client.fetch_resource(id).await
        }
        other => other,
    }
}
