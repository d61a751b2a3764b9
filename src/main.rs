//! Portal gate binary entry point.

use portal_gate::access::{DirectorySource, RoleAccessTable, RoleDirectory, TrustedHeaderSource};
use portal_gate::audit::{AuditSink, StdoutSink};
use portal_gate::config::{
    AccessRuleValidator, BasicValidator, ConfigLoader, LogFormat, PortalConfig,
};
use portal_gate::gate::RequestGate;
use portal_gate::rate_limit::RateLimiter;
use portal_gate::server::PortalServer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Interval between rate-limiter bucket sweeps.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Buckets idle past their window plus this margin are dropped.
const BUCKET_MAX_AGE: Duration = Duration::from_secs(600);

fn init_tracing(config: &PortalConfig) {
    // RUST_LOG wins over the configured level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_string()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PORTAL_GATE_CONFIG").ok())
        .unwrap_or_else(|| "portal-gate.toml".to_string());

    let loader = ConfigLoader::new()
        .with_validator(BasicValidator)
        .with_validator(AccessRuleValidator);
    let config = loader.load_or_default(&config_path)?;

    init_tracing(&config);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path,
        "Starting portal gate"
    );

    let table = RoleAccessTable::new(&config.access.protected)?;
    let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
    let directory = RoleDirectory::new(
        config.access.assignments.clone(),
        config.access.default_role.clone(),
    );
    let gate = Arc::new(RequestGate::new(
        config.gate.clone(),
        Arc::clone(&limiter),
        table,
        Arc::new(DirectorySource::new(TrustedHeaderSource::new(), directory)),
        Arc::new(StdoutSink::new()) as Arc<dyn AuditSink>,
    ));

    // Periodic sweep of idle rate-limit buckets
    let sweep_limiter = Arc::clone(&limiter);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            sweep_limiter.cleanup(BUCKET_MAX_AGE);
        }
    });

    let mut server = PortalServer::new(config.server.clone(), gate);

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            let _ = shutdown.send(()).await;
        }
    });

    if let Err(e) = server.run().await {
        error!(error = %e, "Server failed");
        return Err(e.into());
    }

    Ok(())
}
