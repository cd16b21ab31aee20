use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use storage::{AppointmentStore, JsonFileStore};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod transport;

use config::load_settings;
use transport::UdpServer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.bind_addr))?;

    let durable = Arc::new(JsonFileStore::new(&settings.data_file));
    let store = AppointmentStore::open(durable).await;
    let server = UdpServer::bind(addr, store)
        .await?
        .with_crash_after(settings.crash_after);

    info!(
        addr = %server.local_addr()?,
        data_file = %settings.data_file.display(),
        crash_after = ?settings.crash_after,
        "scheduler server listening"
    );

    tokio::select! {
        result = server.serve() => {
            if let Err(error) = &result {
                error!(error = %format!("{error:#}"), "server stopped");
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}
