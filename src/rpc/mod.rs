/*
 * Chain-reader capability boundary: typed read calls against the standard
 * ERC-20, V2 and V3 interfaces. Adapters depend only on this trait.
 */

mod client;
mod retry;

pub use client::EvmChainReader;

use async_trait::async_trait;
use ethers::types::{Address, U256};
use thiserror::Error;

/// Errors at the chain boundary. "Not found" (a zero address from a factory
/// lookup) is not an error; those reads return `Option`.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("execution reverted: {0}")]
    Revert(String),

    #[error("malformed response: {0}")]
    InvalidResponse(String),
}

pub type ChainResult<T> = std::result::Result<T, ChainError>;

/// ERC-20 metadata bundle resolved in one round of parallel reads.
#[derive(Debug, Clone)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// The V3 pool fields the engine reads from `slot0`.
#[derive(Debug, Clone, Copy)]
pub struct Slot0 {
    pub sqrt_price_x96: U256,
    pub tick: i32,
}

/// Read-only chain access. Every call is a deterministic `eth_call` for a
/// given chain state; implementations must be safe for concurrent use.
#[async_trait]
pub trait ChainReader: Send + Sync {
    // ERC-20
    async fn erc20_name(&self, token: Address) -> ChainResult<String>;
    async fn erc20_symbol(&self, token: Address) -> ChainResult<String>;
    async fn erc20_decimals(&self, token: Address) -> ChainResult<u8>;
    async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> ChainResult<U256>;
    async fn erc20_total_supply(&self, token: Address) -> ChainResult<U256>;

    /// Name, symbol and decimals in one concurrent round.
    async fn erc20_metadata(&self, token: Address) -> ChainResult<TokenMetadata> {
        let (name, symbol, decimals) = tokio::try_join!(
            self.erc20_name(token),
            self.erc20_symbol(token),
            self.erc20_decimals(token),
        )?;
        Ok(TokenMetadata {
            name,
            symbol,
            decimals,
        })
    }

    // V2 factory (pairs are themselves ERC-20s; totalSupply reuses the
    // ERC-20 read)
    async fn v2_get_pair(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> ChainResult<Option<Address>>;
    async fn v2_all_pairs_length(&self, factory: Address) -> ChainResult<U256>;
    async fn v2_all_pairs(&self, factory: Address, index: U256) -> ChainResult<Option<Address>>;

    // V2 pair
    async fn v2_reserves(&self, pair: Address) -> ChainResult<(U256, U256)>;
    async fn v2_token0(&self, pair: Address) -> ChainResult<Address>;
    async fn v2_token1(&self, pair: Address) -> ChainResult<Address>;

    // V2 router
    async fn v2_amount_out(
        &self,
        router: Address,
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> ChainResult<U256>;
    async fn v2_amounts_out(
        &self,
        router: Address,
        amount_in: U256,
        path: &[Address],
    ) -> ChainResult<Vec<U256>>;
    async fn v2_amounts_in(
        &self,
        router: Address,
        amount_out: U256,
        path: &[Address],
    ) -> ChainResult<Vec<U256>>;

    // V3 factory
    async fn v3_get_pool(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> ChainResult<Option<Address>>;

    // V3 pool
    async fn v3_slot0(&self, pool: Address) -> ChainResult<Slot0>;
    async fn v3_liquidity(&self, pool: Address) -> ChainResult<u128>;
    async fn v3_fee(&self, pool: Address) -> ChainResult<u32>;
    async fn v3_token0(&self, pool: Address) -> ChainResult<Address>;
    async fn v3_token1(&self, pool: Address) -> ChainResult<Address>;
    async fn v3_tick_spacing(&self, pool: Address) -> ChainResult<i32>;

    // V3 quoter
    async fn v3_quote_exact_input_single(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_in: U256,
        sqrt_price_limit: U256,
    ) -> ChainResult<U256>;
}
