/*
 * Venue adapter abstraction: one uniform capability per liquidity venue
 */

pub mod uniswap_v2;
pub mod uniswap_v3;

use async_trait::async_trait;
use ethers::{
    abi::{self, Token as AbiToken},
    types::{Address, U256},
    utils::keccak256,
};

use crate::models::{Protocol, Result, Token, VenueQuote};
use crate::rpc::ChainReader;
use crate::tokens;
use crate::utils::format_address;

/// Uniform venue capability. `quote_all` returns an empty list when the
/// venue has no liquidity for the pair; only transport failures raise.
#[async_trait]
pub trait DexAdapter: Send + Sync {
    async fn quote_all(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: U256,
    ) -> Result<Vec<VenueQuote>>;

    /// Whether the venue has a pool for the pair. `fee_tier` narrows the
    /// check for tiered venues and is ignored by constant-product ones.
    async fn pool_exists(
        &self,
        token_in: Address,
        token_out: Address,
        fee_tier: Option<u32>,
    ) -> Result<bool>;

    async fn token_info(&self, address: Address) -> Result<Token>;

    fn name(&self) -> &str;

    fn version(&self) -> Protocol;
}

/// Shared `token_info` implementation: the native sentinel never touches the
/// chain, everything else is an ERC-20 metadata round.
pub(crate) async fn erc20_token_info(reader: &dyn ChainReader, address: Address) -> Result<Token> {
    if tokens::is_native(address) {
        return Ok(Token {
            address,
            symbol: "ETH".to_string(),
            name: "Ether".to_string(),
            decimals: 18,
            is_native: true,
        });
    }

    let metadata = reader
        .erc20_metadata(address)
        .await
        .map_err(|_| crate::models::HermesError::UnknownToken(format_address(address)))?;

    Ok(Token {
        address,
        symbol: metadata.symbol,
        name: metadata.name,
        decimals: metadata.decimals,
        is_native: false,
    })
}

/// Selector + ABI-encoded arguments, the wire form of every router call.
pub(crate) fn encode_call(signature: &str, args: &[AbiToken]) -> Vec<u8> {
    let selector = &keccak256(signature.as_bytes())[0..4];
    let mut data = Vec::from(selector);
    data.extend_from_slice(&abi::encode(args));
    data
}
