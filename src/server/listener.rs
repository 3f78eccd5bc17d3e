use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::http::connection::{Connection, ConnectionSettings};
use crate::routing::Router;
use crate::storage::{DiskStore, FileStore};

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;
    info!("Listening on {}", cfg.listen_addr);
    info!("Serving files from {}", cfg.directory.display());

    let router = Arc::new(Router::new(DiskStore::new(cfg.directory.clone())));
    serve(listener, router, cfg.connection_settings()).await
}

/// Accepts connections forever, one task per connection.
pub async fn serve<F: FileStore>(
    listener: TcpListener,
    router: Arc<Router<F>>,
    settings: ConnectionSettings,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await.context("accept failed")?;
        info!("Accepted connection from {}", peer);

        let router = Arc::clone(&router);
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, router, settings);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
            tracing::debug!("Connection from {} closed", peer);
        });
    }
}
