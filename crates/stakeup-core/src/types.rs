//! Core types: addresses, pool phases, token sources.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{MAINNET_FRAX, MAINNET_USDC};
use crate::error::ConfigError;

/// A 20-byte account, pool, or contract identifier.
///
/// Serialized as a `0x`-prefixed lowercase hex string.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Create an Address from a byte array.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Deterministic address with every byte set to `seed`.
    pub fn from_seed(seed: u8) -> Self {
        Self([seed; 20])
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = hex::FromHexError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_string()
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// Lifecycle phase of a receipt-issuing pool, as published by the pool feed.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PoolState {
    #[default]
    Other,
    /// Accepting underlying commitments.
    Commit,
    ReadyPreHoldSwap,
    PendingPreHoldSwap,
    Holding,
    ReadyPostHoldSwap,
    PendingPostHoldSwap,
    EmergencyExit,
    /// Settled: receipts redeem for underlying at the final rate.
    FinalWithdraw,
}

impl PoolState {
    /// Whether receipt tokens of a pool in this phase can still be deposited.
    pub fn accepts_receipts(&self) -> bool {
        !matches!(self, Self::FinalWithdraw | Self::EmergencyExit)
    }

    /// Whether receipts redeem for underlying in this phase.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::FinalWithdraw)
    }
}

/// Where a token used by an environment comes from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenSource {
    /// A locally simulated token with the given decimals.
    Mock(u8),
    /// A known externally deployed token.
    External(Address),
}

/// Resolved token metadata.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenInfo {
    pub address: Address,
    pub decimals: u8,
}

impl TokenSource {
    /// Resolve decimals for this source. Mock tokens are assigned `mock_address`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidDecimals`] if a mock declares more than 18 decimals
    /// - [`ConfigError::UnknownToken`] if an external address is not a known token
    ///
    /// # Examples
    ///
    /// ```
    /// use stakeup_core::types::{Address, TokenSource};
    /// let usdc = TokenSource::Mock(6).resolve(Address::from_seed(1)).unwrap();
    /// assert_eq!(usdc.decimals, 6);
    /// ```
    pub fn resolve(&self, mock_address: Address) -> Result<TokenInfo, ConfigError> {
        match self {
            Self::Mock(decimals) if *decimals <= 18 => Ok(TokenInfo {
                address: mock_address,
                decimals: *decimals,
            }),
            Self::Mock(decimals) => Err(ConfigError::InvalidDecimals(*decimals)),
            Self::External(address) => {
                let decimals = match address.0 {
                    MAINNET_USDC => 6,
                    MAINNET_FRAX => 18,
                    _ => return Err(ConfigError::UnknownToken(*address)),
                };
                Ok(TokenInfo {
                    address: *address,
                    decimals,
                })
            }
        }
    }
}
