/*
 * Request and response shapes for the aggregator API
 */

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::PriceImpactWarning;

/// Every field is optional at the serde level so that a missing field maps
/// to the 400 taxonomy instead of a framework-level rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(default)]
    pub token_in: Option<String>,
    #[serde(default)]
    pub token_out: Option<String>,
    #[serde(default)]
    pub amount_in: Option<String>,
    #[serde(default)]
    pub slippage: Option<f64>,
    #[serde(default)]
    pub user_address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Success<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Success<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSide {
    pub address: String,
    pub symbol: String,
    pub amount: String,
    pub amount_wei: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBody {
    pub to: String,
    pub data: String,
    pub value: String,
    /// Placeholder; the caller fills in the sender before signing.
    pub from: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalBody {
    pub needed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuote {
    pub dex: String,
    pub dex_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_tier: Option<u32>,
    pub amount_out: String,
    pub amount_out_wei: String,
    pub price_impact: Decimal,
    pub gas_estimate: u64,
    pub pool_address: String,
    pub price_impact_warning: PriceImpactWarning,
    pub transaction: TransactionBody,
    pub approval: ApprovalBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsBody {
    pub percentage: Decimal,
    pub amount: String,
    pub amount_wei: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteData {
    pub token_in: TokenSide,
    pub token_out: TokenSide,
    pub best_route: RouteQuote,
    pub all_quotes: Vec<RouteQuote>,
    pub savings: SavingsBody,
    pub slippage: String,
    pub minimum_amount_out: String,
    pub minimum_amount_out_wei: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub dex: String,
    pub dex_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_tier: Option<u32>,
    pub amount_out: String,
    pub amount_out_wei: String,
    pub pool_address: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTxData {
    pub to: String,
    pub data: String,
    pub value: String,
    pub approval_needed: bool,
    pub route: RouteSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregator_contract: Option<String>,
}
