/*
 * Uniswap V2 venue adapter: factory lookup, reserve orientation,
 * constant-product quote
 */

use async_trait::async_trait;
use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::{debug, warn};

use super::DEFAULT_SWAP_GAS;
use crate::dex::{erc20_token_info, DexAdapter};
use crate::math;
use crate::models::{HermesError, Protocol, Result, Token, VenueConfig, VenueQuote};
use crate::rpc::{ChainError, ChainReader};

pub struct UniswapV2Adapter {
    reader: Arc<dyn ChainReader>,
    config: VenueConfig,
}

impl UniswapV2Adapter {
    pub fn new(reader: Arc<dyn ChainReader>, config: VenueConfig) -> Result<Self> {
        if config.router.is_none() {
            return Err(HermesError::Config(format!(
                "V2 venue {} is missing a router address",
                config.name
            )));
        }
        Ok(Self { reader, config })
    }
}

#[async_trait]
impl DexAdapter for UniswapV2Adapter {
    async fn quote_all(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: U256,
    ) -> Result<Vec<VenueQuote>> {
        let pair = match self
            .reader
            .v2_get_pair(self.config.factory, token_in.address, token_out.address)
            .await?
        {
            Some(pair) => pair,
            None => {
                debug!(
                    venue = %self.config.name,
                    token_in = %token_in.symbol,
                    token_out = %token_out.symbol,
                    "no pair registered"
                );
                return Ok(Vec::new());
            }
        };

        // A revert from the pair means a broken or empty pool, not a failed
        // request; only transport errors abort the venue.
        let state = tokio::try_join!(self.reader.v2_reserves(pair), self.reader.v2_token0(pair));
        let ((reserve0, reserve1), token0) = match state {
            Ok(read) => read,
            Err(ChainError::Transport(msg)) => {
                return Err(HermesError::Chain(ChainError::Transport(msg)))
            }
            Err(e) => {
                warn!(venue = %self.config.name, pair = %pair, error = %e, "pair read failed");
                return Ok(Vec::new());
            }
        };

        let (reserve_in, reserve_out) = if token0 == token_in.address {
            (reserve0, reserve1)
        } else {
            (reserve1, reserve0)
        };
        if reserve_in.is_zero() || reserve_out.is_zero() {
            debug!(venue = %self.config.name, pair = %pair, "pair has no liquidity");
            return Ok(Vec::new());
        }

        let amount_out = match math::v2_amount_out(amount_in, reserve_in, reserve_out) {
            Ok(out) if !out.is_zero() => out,
            Ok(_) => return Ok(Vec::new()),
            Err(e) => {
                warn!(venue = %self.config.name, pair = %pair, error = %e, "quote math failed");
                return Ok(Vec::new());
            }
        };

        let price_impact = math::v2_price_impact(amount_in, amount_out, reserve_in, reserve_out);
        let warning = math::warning_for_impact(price_impact);

        Ok(vec![VenueQuote {
            venue: self.config.name.clone(),
            protocol: Protocol::V2,
            amount_out,
            price_impact,
            gas_estimate: DEFAULT_SWAP_GAS,
            fee_tier: None,
            pool_address: pair,
            warning,
        }])
    }

    async fn pool_exists(
        &self,
        token_in: Address,
        token_out: Address,
        _fee_tier: Option<u32>,
    ) -> Result<bool> {
        let pair = self
            .reader
            .v2_get_pair(self.config.factory, token_in, token_out)
            .await?;
        Ok(pair.is_some())
    }

    async fn token_info(&self, address: Address) -> Result<Token> {
        erc20_token_info(self.reader.as_ref(), address).await
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn version(&self) -> Protocol {
        Protocol::V2
    }
}
