//! HASHRIG gateway binary.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hashrig_economy::{GameEconomy, PayoutGateway};
use hashrig_gateway::{telemetry, AppState, FaucetPayClient, GatewayArgs, SimulatedPayout};

fn main() -> anyhow::Result<()> {
    let args = GatewayArgs::parse();
    telemetry::init_telemetry(&args.log_level, args.log_json)?;

    let economy = Arc::new(GameEconomy::new(args.economy_config()?)?);

    // The blocking HTTP client owns a runtime of its own; build it (and drop
    // the last handle) outside tokio.
    let payout: Arc<dyn PayoutGateway> = match args.live_payout_key()? {
        Some(key) => {
            tracing::warn!(endpoint = %args.faucetpay_endpoint, "live payouts enabled");
            Arc::new(
                FaucetPayClient::new(&args.faucetpay_endpoint, key)
                    .context("building FaucetPay client")?,
            )
        }
        None => {
            tracing::info!("payouts are simulated");
            Arc::new(SimulatedPayout)
        }
    };

    let state = AppState::new(economy, Arc::clone(&payout), args.qr_service.clone());
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(serve(args, state))?;

    drop(runtime);
    drop(payout);
    Ok(())
}

async fn serve(args: GatewayArgs, state: AppState) -> anyhow::Result<()> {
    let app = hashrig_gateway::router(state);
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    tracing::info!(addr = %args.bind, "hashrig gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("hashrig gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
