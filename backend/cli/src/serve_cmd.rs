//! `heatlens serve`: load config, wire the pipeline, start the gateway.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use heatlens_gateway::{start_server, GatewayState};
use heatlens_providers::ProviderRegistry;
use heatlens_workflow::UsabilityWorkflow;
use tracing::info;

pub async fn run(config_path: &Path, port: Option<u16>) -> Result<()> {
    let mut config = heatlens_config::load(config_path).await?;
    if let Some(port) = port {
        config.server.get_or_insert_with(Default::default).port = Some(port);
    }
    crate::init_logging(&config)?;
    let config = heatlens_config::prepare(config)?;

    let registry = ProviderRegistry::from_config(&config)?;
    let workflow = UsabilityWorkflow::from_config(&config, &registry)?;

    let bind = config.bind_address();
    let ip: IpAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address: {bind}"))?;
    let addr = SocketAddr::new(ip, config.port());

    info!(
        addr = %addr,
        config = %config_path.display(),
        providers = ?registry.list(),
        batch_size = config.batch_size(),
        output_dir = %config.output_dir().display(),
        "Starting heatlens gateway"
    );
    start_server(addr, GatewayState::new(Arc::new(workflow))).await
}
