use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use engine::{Engine, EventType, Payload};
use okx_gateway::OkxGateway;
use okx_trader::config::{self, AppConfig};
use okx_trader::notifier::WebhookNotifier;
use strategy::DemoStrategy;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let app_config = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::from_env()?,
    };
    app_config.validate()?;
    let app_config = config::init(app_config);

    info!(
        version = okx_trader::VERSION,
        sim = app_config.okx.sim,
        "starting okx-trader"
    );

    let engine = Arc::new(Engine::new());

    let notifier = Arc::new(WebhookNotifier::new(engine.clone(), app_config.notify.clone())?);
    let symbol = app_config
        .trading
        .symbols
        .first()
        .cloned()
        .unwrap_or_else(|| "BTC-USDT-SWAP".to_string());
    let demo = Arc::new(DemoStrategy::new(engine.clone(), symbol));
    let gateway = Arc::new(OkxGateway::new(engine.clone(), app_config.okx.clone())?);

    engine.register_component(notifier);
    engine.register_component(demo);
    engine.register_component(gateway);

    let quitter = engine.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            let _ = quitter.publish(EventType::Quit, Payload::Quit).await;
        }
    });

    engine.run().await?;
    info!("shutdown complete");
    Ok(())
}
