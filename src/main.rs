//! This project is split in 2 main modules:
//!
//! - [gateway] (Moneris hosted payment page integration)
//! - [checkout] (storefront facing surface)
#![doc = include_str!("../README.md")]

use std::net::{Ipv4Addr, SocketAddrV4};

use axum::Router;
use tracing_subscriber::EnvFilter;

/// Storefront side of the protocol
///
/// This module defines the checkout handoff endpoint and the settlement of
/// verified payments against the order store.
mod checkout;

mod db;
/// Moneris gateway integration
///
/// This module defines the redirect field set, the server-side transaction
/// verification call, and the browser return callbacks.
mod gateway;
mod settings;
mod state;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .init();

    match dotenvy::dotenv() {
        Ok(p) => tracing::info!(path = %p.display(), "Loaded environment variables from .env file"),
        Err(e) => tracing::warn!("Failed to load environment variables from .env: {e}"),
    };
    let settings = settings::Settings::from_env();
    let db = db::Db::connect().await.expect("database is not available");
    let state = state::AppState::new(db, gateway::MonerisGateway::new(), settings);

    let app = Router::new()
        .merge(checkout::api::router())
        .nest("/moneris", gateway::api::router())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3030);

    let listener = tokio::net::TcpListener::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
        .await
        .unwrap();

    tracing::info!("Serving on port {port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .unwrap();
}
