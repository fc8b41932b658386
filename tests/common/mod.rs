/*
 * Shared mock chain reader for integration tests
 */

// Each test binary uses a different slice of the mock surface.
#![allow(dead_code)]

use async_trait::async_trait;
use ethers::types::{Address, U256};
use std::collections::HashMap;

use hermes::models::{Protocol, VenueConfig};
use hermes::rpc::{ChainError, ChainReader, ChainResult, Slot0};

pub const V2_FACTORY: u64 = 0x100;
pub const V2_ROUTER: u64 = 0x101;
pub const V3_FACTORY: u64 = 0x200;
pub const V3_QUOTER: u64 = 0x201;
pub const V3_ROUTER: u64 = 0x202;

#[must_use]
pub fn addr(low: u64) -> Address {
    Address::from_low_u64_be(low)
}

#[must_use]
pub fn v2_venue() -> VenueConfig {
    VenueConfig {
        name: "Uniswap V2".to_string(),
        version: Protocol::V2,
        factory: addr(V2_FACTORY),
        router: Some(addr(V2_ROUTER)),
        quoter: None,
    }
}

#[must_use]
pub fn v3_venue() -> VenueConfig {
    VenueConfig {
        name: "Uniswap V3".to_string(),
        version: Protocol::V3,
        factory: addr(V3_FACTORY),
        router: Some(addr(V3_ROUTER)),
        quoter: Some(addr(V3_QUOTER)),
    }
}

#[derive(Clone)]
pub struct MockV2Pair {
    pub address: Address,
    pub token0: Address,
    pub reserve0: U256,
    pub reserve1: U256,
}

#[derive(Clone)]
pub struct MockV3Pool {
    pub address: Address,
    pub token0: Address,
    pub sqrt_price_x96: U256,
    pub liquidity: u128,
    /// `None` makes the quoter revert for this pool's tier.
    pub quote: Option<U256>,
}

/// In-memory chain state. Built up front, then shared read-only.
#[derive(Default)]
pub struct MockChainReader {
    tokens: HashMap<Address, (String, String, u8)>,
    v2_pairs: HashMap<(Address, Address), MockV2Pair>,
    v3_pools: HashMap<(Address, Address, u32), MockV3Pool>,
    allowances: HashMap<(Address, Address, Address), U256>,
    v2_factory_unreachable: bool,
}

fn pair_key(a: Address, b: Address) -> (Address, Address) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl MockChainReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(mut self, address: Address, symbol: &str, decimals: u8) -> Self {
        self.tokens.insert(
            address,
            (format!("{symbol} Token"), symbol.to_string(), decimals),
        );
        self
    }

    #[must_use]
    pub fn with_v2_pair(mut self, token_a: Address, token_b: Address, pair: MockV2Pair) -> Self {
        self.v2_pairs.insert(pair_key(token_a, token_b), pair);
        self
    }

    #[must_use]
    pub fn with_v3_pool(
        mut self,
        token_a: Address,
        token_b: Address,
        fee: u32,
        pool: MockV3Pool,
    ) -> Self {
        let (a, b) = pair_key(token_a, token_b);
        self.v3_pools.insert((a, b, fee), pool);
        self
    }

    /// Make every V2 factory read fail at the transport layer.
    #[must_use]
    pub fn with_unreachable_v2_factory(mut self) -> Self {
        self.v2_factory_unreachable = true;
        self
    }

    #[must_use]
    pub fn with_allowance(
        mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Self {
        self.allowances.insert((token, owner, spender), amount);
        self
    }

    fn token(&self, address: Address) -> ChainResult<&(String, String, u8)> {
        self.tokens
            .get(&address)
            .ok_or_else(|| ChainError::Revert(format!("unknown token {address:#x}")))
    }

    fn v2_pair_by_address(&self, pair: Address) -> ChainResult<&MockV2Pair> {
        self.v2_pairs
            .values()
            .find(|p| p.address == pair)
            .ok_or_else(|| ChainError::Revert(format!("unknown pair {pair:#x}")))
    }

    fn v3_pool_by_address(&self, pool: Address) -> ChainResult<&MockV3Pool> {
        self.v3_pools
            .values()
            .find(|p| p.address == pool)
            .ok_or_else(|| ChainError::Revert(format!("unknown pool {pool:#x}")))
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn erc20_name(&self, token: Address) -> ChainResult<String> {
        Ok(self.token(token)?.0.clone())
    }

    async fn erc20_symbol(&self, token: Address) -> ChainResult<String> {
        Ok(self.token(token)?.1.clone())
    }

    async fn erc20_decimals(&self, token: Address) -> ChainResult<u8> {
        Ok(self.token(token)?.2)
    }

    async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> ChainResult<U256> {
        Ok(self
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default())
    }

    async fn erc20_total_supply(&self, _token: Address) -> ChainResult<U256> {
        Ok(U256::zero())
    }

    async fn v2_get_pair(
        &self,
        _factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> ChainResult<Option<Address>> {
        if self.v2_factory_unreachable {
            return Err(ChainError::Transport("rpc endpoint unreachable".to_string()));
        }
        Ok(self
            .v2_pairs
            .get(&pair_key(token_a, token_b))
            .map(|p| p.address))
    }

    async fn v2_all_pairs_length(&self, _factory: Address) -> ChainResult<U256> {
        Ok(U256::from(self.v2_pairs.len()))
    }

    async fn v2_all_pairs(
        &self,
        _factory: Address,
        _index: U256,
    ) -> ChainResult<Option<Address>> {
        Ok(None)
    }

    async fn v2_reserves(&self, pair: Address) -> ChainResult<(U256, U256)> {
        let pair = self.v2_pair_by_address(pair)?;
        Ok((pair.reserve0, pair.reserve1))
    }

    async fn v2_token0(&self, pair: Address) -> ChainResult<Address> {
        Ok(self.v2_pair_by_address(pair)?.token0)
    }

    async fn v2_token1(&self, pair: Address) -> ChainResult<Address> {
        let target = self.v2_pair_by_address(pair)?.address;
        self.v2_pairs
            .iter()
            .find(|(_, p)| p.address == target)
            .map(|((a, b), p)| if p.token0 == *a { *b } else { *a })
            .ok_or_else(|| ChainError::Revert("unknown pair".to_string()))
    }

    async fn v2_amount_out(
        &self,
        _router: Address,
        _amount_in: U256,
        _reserve_in: U256,
        _reserve_out: U256,
    ) -> ChainResult<U256> {
        Err(ChainError::Revert("not mocked".to_string()))
    }

    async fn v2_amounts_out(
        &self,
        _router: Address,
        _amount_in: U256,
        _path: &[Address],
    ) -> ChainResult<Vec<U256>> {
        Err(ChainError::Revert("not mocked".to_string()))
    }

    async fn v2_amounts_in(
        &self,
        _router: Address,
        _amount_out: U256,
        _path: &[Address],
    ) -> ChainResult<Vec<U256>> {
        Err(ChainError::Revert("not mocked".to_string()))
    }

    async fn v3_get_pool(
        &self,
        _factory: Address,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> ChainResult<Option<Address>> {
        let (a, b) = pair_key(token_a, token_b);
        Ok(self.v3_pools.get(&(a, b, fee)).map(|p| p.address))
    }

    async fn v3_slot0(&self, pool: Address) -> ChainResult<Slot0> {
        let pool = self.v3_pool_by_address(pool)?;
        Ok(Slot0 {
            sqrt_price_x96: pool.sqrt_price_x96,
            tick: 0,
        })
    }

    async fn v3_liquidity(&self, pool: Address) -> ChainResult<u128> {
        Ok(self.v3_pool_by_address(pool)?.liquidity)
    }

    async fn v3_fee(&self, pool: Address) -> ChainResult<u32> {
        let target = self.v3_pool_by_address(pool)?.address;
        self.v3_pools
            .iter()
            .find(|(_, p)| p.address == target)
            .map(|((_, _, fee), _)| *fee)
            .ok_or_else(|| ChainError::Revert("unknown pool".to_string()))
    }

    async fn v3_token0(&self, pool: Address) -> ChainResult<Address> {
        Ok(self.v3_pool_by_address(pool)?.token0)
    }

    async fn v3_token1(&self, pool: Address) -> ChainResult<Address> {
        let target = self.v3_pool_by_address(pool)?.address;
        self.v3_pools
            .iter()
            .find(|(_, p)| p.address == target)
            .map(|((a, b, _), p)| if p.token0 == *a { *b } else { *a })
            .ok_or_else(|| ChainError::Revert("unknown pool".to_string()))
    }

    async fn v3_tick_spacing(&self, _pool: Address) -> ChainResult<i32> {
        Ok(60)
    }

    async fn v3_quote_exact_input_single(
        &self,
        _quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        _amount_in: U256,
        _sqrt_price_limit: U256,
    ) -> ChainResult<U256> {
        let (a, b) = pair_key(token_in, token_out);
        let pool = self
            .v3_pools
            .get(&(a, b, fee))
            .ok_or_else(|| ChainError::Revert("no pool for tier".to_string()))?;
        pool.quote
            .ok_or_else(|| ChainError::Revert("quoter reverted".to_string()))
    }
}
