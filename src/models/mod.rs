/*
 * Domain types and error taxonomy for the quote aggregator
 */

use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rpc::ChainError;

/// Protocol family of a liquidity venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    V2,
    V3,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::V2 => write!(f, "V2"),
            Protocol::V3 => write!(f, "V3"),
        }
    }
}

/// An ERC-20 token (or the native gas token) with resolved metadata.
///
/// Immutable after construction. Addresses are compared case-insensitively
/// throughout the engine, so the stored form is already canonical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub is_native: bool,
}

impl Token {
    #[must_use]
    pub fn new(address: Address, symbol: &str, name: &str, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals,
            is_native: false,
        }
    }
}

/// Static description of one liquidity venue, loaded once at startup.
///
/// A V2 venue carries factory + router; a V3 venue carries factory + quoter
/// plus a swap router for route building. Never mutated after boot.
#[derive(Debug, Clone)]
pub struct VenueConfig {
    pub name: String,
    pub version: Protocol,
    pub factory: Address,
    pub router: Option<Address>,
    pub quoter: Option<Address>,
}

/// Price-impact warning bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningLevel {
    Low,
    Medium,
    High,
    VeryHigh,
    Extreme,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceImpactWarning {
    pub level: WarningLevel,
    pub should_block: bool,
    pub message: String,
}

/// One venue's answer for a swap: output amount, impact, and the pool behind it.
///
/// Invariants: `amount_out > 0`; `fee_tier` is present iff `protocol` is V3.
#[derive(Debug, Clone)]
pub struct VenueQuote {
    pub venue: String,
    pub protocol: Protocol,
    pub amount_out: U256,
    /// Percent, always >= 0.
    pub price_impact: Decimal,
    pub gas_estimate: u64,
    pub fee_tier: Option<u32>,
    pub pool_address: Address,
    pub warning: PriceImpactWarning,
}

/// Savings of the best route relative to the worst surviving route.
#[derive(Debug, Clone)]
pub struct Savings {
    /// Percent, rounded to two decimal places.
    pub percentage: Decimal,
    /// In integer units of the output token.
    pub absolute_amount: U256,
}

/// Ranked result of fanning one swap out across every configured venue.
///
/// `quotes` is ordered best-first; the best quote is always `quotes[0]`.
#[derive(Debug, Clone)]
pub struct AggregatedQuote {
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: U256,
    pub quotes: Vec<VenueQuote>,
    pub savings: Savings,
    pub recommendation: String,
}

impl AggregatedQuote {
    #[must_use]
    pub fn best(&self) -> &VenueQuote {
        &self.quotes[0]
    }
}

/// Result of the per-route allowance pre-check.
///
/// Per-route, not per-request: sibling routes may target different routers
/// and each is checked independently.
#[derive(Debug, Clone)]
pub enum Approval {
    /// Input is the native token; allowances do not apply.
    NativeInput,
    /// Existing allowance already covers the input amount.
    Sufficient,
    /// An approve transaction is required before the swap.
    Needed {
        token: Address,
        spender: Address,
        amount: U256,
    },
}

impl Approval {
    #[must_use]
    pub fn needed(&self) -> bool {
        matches!(self, Approval::Needed { .. })
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Approval::NativeInput => "Native token input requires no approval",
            Approval::Sufficient => "Existing allowance is sufficient",
            Approval::Needed { .. } => "Token approval required before this swap",
        }
    }
}

/// Ready-to-send transaction material for one quote.
#[derive(Debug, Clone)]
pub struct RouteArtifact {
    /// Destination router for this route.
    pub to: Address,
    pub calldata: Vec<u8>,
    /// Non-zero only when the input token is native.
    pub value: U256,
    /// Placeholder recipient; the caller fills this in before signing.
    pub from: Address,
    pub approval: Approval,
}

#[derive(Debug, Error)]
pub enum HermesError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown token {0}: metadata unavailable in registry and on chain")]
    UnknownToken(String),

    #[error("No liquidity available for this token pair on any configured venue")]
    NoLiquidity,

    #[error("Request deadline exceeded")]
    Timeout,

    #[error("Chain read failed: {0}")]
    Chain(#[from] ChainError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, HermesError>;
