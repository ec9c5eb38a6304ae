//! # Protocol Configuration & Constants
//!
//! Every magic number of the executor lives here, next to
//! [`ExecutorConfig`], the per-network parameter set that genesis fixes and
//! every validator must agree on byte for byte.
//!
//! Constants are consensus-critical. Configuration is too, but it is at
//! least loaded rather than compiled in, so devnets can tune it.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{Address, Id, ShortId};

// ---------------------------------------------------------------------------
// Fixed-point & Time
// ---------------------------------------------------------------------------

/// Denominator of a deposit offer's `interest_rate_nominator`.
/// A nominator of 100_000 is a 10% reward over the full deposit term.
pub const INTEREST_RATE_DENOMINATOR: u64 = 1_000_000;

/// Seconds per day, for writing durations that humans can read.
pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// One whole unit of the fee asset in its smallest denomination.
pub const UNIT: u64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// Well-known ids
// ---------------------------------------------------------------------------

/// Subnet id of the primary network. Every validator validates it.
pub const PRIMARY_NETWORK_ID: Id = Id::EMPTY;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum memo field length in bytes.
pub const MAX_MEMO_LENGTH: usize = 256;

/// Maximum chain name length. Names are printable ASCII.
pub const MAX_CHAIN_NAME_LENGTH: usize = 128;

/// How deep multisig aliases may nest inside each other. A deeper alias is
/// treated as unable to sign.
pub const MAX_ALIAS_NESTING_DEPTH: usize = 3;

/// Maximum addresses in one owner set.
pub const MAX_OWNER_ADDRESSES: usize = 64;

/// Default Bech32 human-readable prefix for addresses.
pub const DEFAULT_ADDRESS_HRP: &str = "lumen";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from loading or checking an [`ExecutorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("min validator stake {min} exceeds max {max}")]
    StakeBounds { min: u64, max: u64 },

    #[error("stake duration bounds invalid: min {min}s, max {max}s")]
    DurationBounds { min: u64, max: u64 },

    #[error("max supply {max_supply} is zero")]
    ZeroMaxSupply { max_supply: u64 },

    #[error("reward import chain must differ from this chain")]
    RewardImportChainIsSelf,
}

// ---------------------------------------------------------------------------
// ExecutorConfig
// ---------------------------------------------------------------------------

/// Network parameters consumed by the executor.
///
/// `Default` is a devnet-ish parameter set; real networks load theirs
/// from genesis JSON via [`ExecutorConfig::from_json`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Id of this (platform) chain. Export destinations must differ.
    pub chain_id: Id,
    /// Asset that pays fees, is bonded, deposited and rewarded.
    pub fee_asset_id: Id,
    /// Fee burned by ordinary transactions.
    pub tx_fee: u64,
    /// Fee burned by `CreateSubnetTx`.
    pub create_subnet_fee: u64,
    /// Fee burned by `CreateChainTx`.
    pub create_chain_fee: u64,
    /// Minimum bonded weight of a primary-network validator.
    pub min_validator_stake: u64,
    /// Maximum bonded weight of a primary-network validator.
    pub max_validator_stake: u64,
    /// Minimum staking window, seconds.
    pub min_stake_duration: u64,
    /// Maximum staking window, seconds.
    pub max_stake_duration: u64,
    /// How far past chain time a staker may schedule its start, seconds.
    pub max_future_start_time: u64,
    /// How far past the wall clock an advance-time proposal may go, seconds.
    pub max_future_block_time: u64,
    /// Minimum age of a timestamped cross-chain record before import, seconds.
    pub cross_chain_sync_bound: u64,
    /// Chain that escrows validator rewards for import.
    pub reward_import_chain_id: Id,
    /// Address the escrowed reward records are indexed under.
    pub treasury_address: Address,
    /// Hard cap on total supply, including reserved deposit rewards.
    pub max_supply: u64,
    /// Bond/deposit lock model enabled. When false, every locked value and
    /// every bond/deposit transaction kind is rejected.
    pub lock_mode_bond_deposit: bool,
    /// When true, validators prove their node key; otherwise their
    /// consortium member signs for them.
    pub verify_node_signature: bool,
    /// Bech32 HRP used when rendering addresses in logs.
    pub address_hrp: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            chain_id: Id::from_label("lumen/platform"),
            fee_asset_id: Id::from_label("lumen/asset/LUM"),
            tx_fee: UNIT / 1_000,
            create_subnet_fee: UNIT / 10,
            create_chain_fee: UNIT / 10,
            min_validator_stake: 2_000 * UNIT,
            max_validator_stake: 3_000_000 * UNIT,
            min_stake_duration: 14 * SECONDS_PER_DAY,
            max_stake_duration: 365 * SECONDS_PER_DAY,
            max_future_start_time: 14 * SECONDS_PER_DAY,
            max_future_block_time: 10,
            cross_chain_sync_bound: 10,
            reward_import_chain_id: Id::from_label("lumen/contract-chain"),
            treasury_address: ShortId::from_label("lumen/treasury"),
            max_supply: 1_000_000_000 * UNIT,
            lock_mode_bond_deposit: true,
            verify_node_signature: true,
            address_hrp: DEFAULT_ADDRESS_HRP.to_string(),
        }
    }
}

impl ExecutorConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading executor config {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("loading executor config {}", path.display()))
    }

    /// Reject parameter sets that cannot possibly describe a working chain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_validator_stake > self.max_validator_stake {
            return Err(ConfigError::StakeBounds {
                min: self.min_validator_stake,
                max: self.max_validator_stake,
            });
        }
        if self.min_stake_duration == 0 || self.min_stake_duration > self.max_stake_duration {
            return Err(ConfigError::DurationBounds {
                min: self.min_stake_duration,
                max: self.max_stake_duration,
            });
        }
        if self.max_supply == 0 {
            return Err(ConfigError::ZeroMaxSupply {
                max_supply: self.max_supply,
            });
        }
        if self.reward_import_chain_id == self.chain_id {
            return Err(ConfigError::RewardImportChainIsSelf);
        }
        Ok(())
    }

    /// Render an address for logs with the configured HRP, falling back to
    /// hex if the HRP is somehow unusable.
    pub fn display_address(&self, address: &Address) -> String {
        address
            .to_bech32(&self.address_hrp)
            .unwrap_or_else(|_| address.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ExecutorConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config = ExecutorConfig::from_json(r#"{ "tx_fee": 42 }"#).unwrap();
        assert_eq!(config.tx_fee, 42);
        assert_eq!(config.min_stake_duration, ExecutorConfig::default().min_stake_duration);
    }

    #[test]
    fn rejects_inverted_stake_bounds() {
        let json = r#"{ "min_validator_stake": 10, "max_validator_stake": 5 }"#;
        match ExecutorConfig::from_json(json) {
            Err(ConfigError::StakeBounds { min: 10, max: 5 }) => {}
            other => panic!("expected StakeBounds, got {:?}", other),
        }
    }

    #[test]
    fn rejects_zero_min_duration() {
        let json = r#"{ "min_stake_duration": 0 }"#;
        assert!(matches!(
            ExecutorConfig::from_json(json),
            Err(ConfigError::DurationBounds { .. })
        ));
    }

    #[test]
    fn rejects_garbage_json() {
        assert!(matches!(
            ExecutorConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ExecutorConfig::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("/definitely/not/here.json"));
    }

    #[test]
    fn addresses_display_as_bech32() {
        let config = ExecutorConfig::default();
        let shown = config.display_address(&ShortId::from_label("alice"));
        assert!(shown.starts_with("lumen1"));
    }

    #[test]
    fn interest_denominator_sanity() {
        // A deposit never earns more than its principal per unit of rate.
        assert!(INTEREST_RATE_DENOMINATOR > 0);
        assert_eq!(UNIT, 1_000_000_000);
    }
}
