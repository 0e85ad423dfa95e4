use std::{fmt, str::FromStr, time::Duration};

use alloy::primitives::Address;
use anyhow::Result;
use rust_decimal::Decimal;

use super::env_helper::{load_env_var, load_env_var_or, load_optional_env_var};
use crate::utils::constants::{
    DEFAULT_ASSET_PRICE_USD, DEFAULT_FALLBACK_LTV_RATIO, DEFAULT_HTTP_PORT,
    DEFAULT_MAX_CAP_ON_HEALTH_FACTOR, DEFAULT_REFRESH_DELAYS_MS,
};

#[derive(Clone)]
pub struct LocalConfig {
    pub rpc_url: String,
    pub private_key: String,
    pub lending_pool_address: Address,
    pub asset_address: Address,
    pub receipt_token_address: Option<Address>,
    pub debt_token_address: Address,
    pub asset_price_usd: Decimal,
    pub fallback_ltv_ratio: Decimal,
    pub max_cap_on_health_factor: u64,
    pub use_as_collateral: bool,
    pub refresh_schedule: RefreshSchedule,
    pub port: u16,
}

impl LocalConfig {
    pub fn load_from_env() -> Result<Self> {
        let config = Self {
            rpc_url: load_env_var("RPC_URL")?,
            private_key: load_env_var("PRIVATE_KEY")?,
            lending_pool_address: load_env_var("LENDING_POOL_ADDRESS")?,
            asset_address: load_env_var("ASSET_ADDRESS")?,
            receipt_token_address: load_optional_env_var("RECEIPT_TOKEN_ADDRESS")?,
            debt_token_address: load_env_var("DEBT_TOKEN_ADDRESS")?,
            asset_price_usd: load_env_var_or("ASSET_PRICE_USD", DEFAULT_ASSET_PRICE_USD)?,
            fallback_ltv_ratio: load_env_var_or("FALLBACK_LTV_RATIO", DEFAULT_FALLBACK_LTV_RATIO)?,
            max_cap_on_health_factor: load_env_var_or(
                "MAX_CAP_ON_HEALTH_FACTOR",
                DEFAULT_MAX_CAP_ON_HEALTH_FACTOR,
            )?,
            use_as_collateral: load_env_var_or("USE_AS_COLLATERAL", true)?,
            refresh_schedule: load_env_var_or("REFRESH_DELAYS_MS", RefreshSchedule::default())?,
            port: load_env_var_or("PORT", DEFAULT_HTTP_PORT)?,
        };

        if config.fallback_ltv_ratio < Decimal::ZERO || config.fallback_ltv_ratio > Decimal::ONE {
            anyhow::bail!(
                "FALLBACK_LTV_RATIO must be between 0 and 1, got {}",
                config.fallback_ltv_ratio
            );
        }

        Ok(config)
    }
}

// The private key never reaches the logs.
impl fmt::Debug for LocalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalConfig")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("lending_pool_address", &self.lending_pool_address)
            .field("asset_address", &self.asset_address)
            .field("receipt_token_address", &self.receipt_token_address)
            .field("debt_token_address", &self.debt_token_address)
            .field("asset_price_usd", &self.asset_price_usd)
            .field("fallback_ltv_ratio", &self.fallback_ltv_ratio)
            .field("max_cap_on_health_factor", &self.max_cap_on_health_factor)
            .field("use_as_collateral", &self.use_as_collateral)
            .field("refresh_schedule", &self.refresh_schedule)
            .field("port", &self.port)
            .finish()
    }
}

/// Delays between the sequential refresh passes that follow a confirmed transaction
///
/// Parsed from a comma separated list of milliseconds, e.g. `3000,2000,2000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSchedule {
    delays: Vec<Duration>,
}

impl RefreshSchedule {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    pub fn passes(&self) -> usize {
        self.delays.len()
    }
}

impl Default for RefreshSchedule {
    fn default() -> Self {
        Self::new(
            DEFAULT_REFRESH_DELAYS_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        )
    }
}

impl FromStr for RefreshSchedule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let delays = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|_| anyhow::anyhow!("invalid refresh delay: {}", part))
            })
            .collect::<Result<Vec<_>>>()?;

        if delays.is_empty() {
            anyhow::bail!("refresh schedule needs at least one pass");
        }

        Ok(Self::new(delays))
    }
}
