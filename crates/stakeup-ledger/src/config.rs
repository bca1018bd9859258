//! Ledger configuration.
//!
//! Provides [`LedgerConfig`] with defaults matching the deployed fee
//! schedule. Values are layered from an optional TOML file and then
//! `STAKEUP_*` environment variables (e.g. `STAKEUP_REDEEM_BPS=25`).
//! Addresses given through the environment must carry the `0x` prefix.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use stakeup_core::constants::{
    AUTO_DEPLOY_WINDOW, BPS_SCALE, DEFAULT_MINT_BPS, DEFAULT_PERFORMANCE_BPS, DEFAULT_REDEEM_BPS,
    DEFAULT_UNDERLYING_DECIMALS, WAD_DECIMALS,
};
use stakeup_core::error::ConfigError;
use stakeup_core::types::Address;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "STAKEUP";

/// Configuration for a [`ShareLedger`](crate::ShareLedger).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Fee on deposits, in bps of the deposited value.
    pub mint_bps: u16,
    /// Fee on redemptions, in bps of the redeemed shares.
    pub redeem_bps: u16,
    /// Fee on realized pool yield, in bps.
    pub performance_bps: u16,
    /// Account credited with every fee.
    pub fee_sink: Address,
    /// Decimals of the underlying token and of pool receipt tokens.
    pub underlying_decimals: u8,
    /// Fail `poke` instead of valuing a pool at zero when its rate is missing.
    pub strict_rates: bool,
    /// How long before a commit phase ends idle underlying gets deployed.
    pub auto_deploy_window_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            mint_bps: DEFAULT_MINT_BPS,
            redeem_bps: DEFAULT_REDEEM_BPS,
            performance_bps: DEFAULT_PERFORMANCE_BPS,
            fee_sink: Address::ZERO,
            underlying_decimals: DEFAULT_UNDERLYING_DECIMALS,
            strict_rates: false,
            auto_deploy_window_secs: AUTO_DEPLOY_WINDOW,
        }
    }
}

impl LedgerConfig {
    /// Default configuration crediting fees to `fee_sink`.
    pub fn with_fee_sink(fee_sink: Address) -> Self {
        Self {
            fee_sink,
            ..Self::default()
        }
    }

    /// Conventional location of the config file (`<config dir>/stakeup/ledger.toml`).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stakeup")
            .join("ledger.toml")
    }

    /// Load from `path` (required when given) or the default path (optional),
    /// then apply `STAKEUP_*` environment overrides.
    ///
    /// The result is not validated; [`ShareLedger::new`](crate::ShareLedger::new)
    /// validates it, and callers may still fill in the fee sink first.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::build(p, true, None),
            None => Self::build(&Self::default_path(), false, None),
        }
    }

    fn build(
        path: &Path,
        required: bool,
        env: Option<::config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let cfg = ::config::Config::builder()
            .add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Toml)
                    .required(required),
            )
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        cfg.try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Check fee bounds, decimals and the fee sink.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("mint_bps", self.mint_bps),
            ("redeem_bps", self.redeem_bps),
            ("performance_bps", self.performance_bps),
        ] {
            if u128::from(value) > BPS_SCALE {
                return Err(ConfigError::InvalidBps { field, value });
            }
        }
        if self.underlying_decimals > WAD_DECIMALS {
            return Err(ConfigError::InvalidDecimals(self.underlying_decimals));
        }
        if self.fee_sink.is_zero() {
            return Err(ConfigError::ZeroFeeSink);
        }
        Ok(())
    }
}
