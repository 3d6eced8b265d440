//! Gateway configuration.
//!
//! Runtime settings come from the command line with environment fallbacks.
//! Economy balance data comes from a TOML file (or built-in defaults).

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use hashrig_economy::EconomyConfig;

/// Default FaucetPay send endpoint.
pub const FAUCETPAY_SEND_URL: &str = "https://faucetpay.io/api/v1/send";

/// Default QR code image service.
pub const QR_SERVICE_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";

/// HASHRIG gateway command line.
#[derive(Debug, Clone, Parser)]
#[command(name = "hashrig_gateway", version, about = "HTTP gateway for the HASHRIG economy")]
pub struct GatewayArgs {
    /// Address to listen on.
    #[arg(long, env = "HASHRIG_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Economy TOML file. Built-in defaults when absent.
    #[arg(long, env = "HASHRIG_ECONOMY_CONFIG")]
    pub economy_config: Option<PathBuf>,

    /// Log filter directive, e.g. `info` or `hashrig_economy=debug`.
    #[arg(long, env = "HASHRIG_LOG", default_value = "info")]
    pub log_level: String,

    /// Emit JSON log lines.
    #[arg(long, env = "HASHRIG_LOG_JSON")]
    pub log_json: bool,

    /// Deposit wallet. Overrides the economy file.
    #[arg(long, env = "FAUCETPAY_WALLET_ADDRESS")]
    pub wallet_address: Option<String>,

    /// FaucetPay API key. Required with `--live-payouts`.
    #[arg(long, env = "FAUCETPAY_API_KEY", hide_env_values = true)]
    pub faucetpay_api_key: Option<String>,

    /// FaucetPay send endpoint.
    #[arg(long, env = "FAUCETPAY_ENDPOINT", default_value = FAUCETPAY_SEND_URL)]
    pub faucetpay_endpoint: String,

    /// Send real payouts through FaucetPay instead of simulating them.
    #[arg(long, env = "HASHRIG_LIVE_PAYOUTS")]
    pub live_payouts: bool,

    /// QR code image service used for deposit links.
    #[arg(long, env = "HASHRIG_QR_SERVICE", default_value = QR_SERVICE_URL)]
    pub qr_service: url::Url,
}

impl GatewayArgs {
    /// Loads the economy configuration and applies command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or fails validation.
    pub fn economy_config(&self) -> anyhow::Result<EconomyConfig> {
        let mut config = match &self.economy_config {
            Some(path) => EconomyConfig::from_file(path)
                .with_context(|| format!("loading economy config {}", path.display()))?,
            None => EconomyConfig::default(),
        };

        if let Some(wallet) = &self.wallet_address {
            config.payments.wallet_address.clone_from(wallet);
        }
        config.validate().context("validating economy config")?;
        Ok(config)
    }

    /// Returns the API key, or an error if live payouts were requested without one.
    ///
    /// # Errors
    ///
    /// Fails when `--live-payouts` is set and no non-empty key is configured.
    pub fn live_payout_key(&self) -> anyhow::Result<Option<&str>> {
        if !self.live_payouts {
            return Ok(None);
        }
        match self.faucetpay_api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(Some(key)),
            _ => anyhow::bail!("--live-payouts requires FAUCETPAY_API_KEY"),
        }
    }
}
