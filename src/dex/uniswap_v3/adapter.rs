/*
 * Uniswap V3 venue adapter: concurrent fan-out across fee tiers, quoter
 * simulation, sqrt-price based impact
 */

use async_trait::async_trait;
use ethers::types::{Address, U256};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::{DEFAULT_SWAP_GAS, FEE_TIERS};
use crate::dex::{erc20_token_info, DexAdapter};
use crate::math;
use crate::models::{HermesError, Protocol, Result, Token, VenueConfig, VenueQuote};
use crate::rpc::{ChainReader, ChainResult};

pub struct UniswapV3Adapter {
    reader: Arc<dyn ChainReader>,
    config: VenueConfig,
    quoter: Address,
}

impl UniswapV3Adapter {
    pub fn new(reader: Arc<dyn ChainReader>, config: VenueConfig) -> Result<Self> {
        let quoter = config.quoter.ok_or_else(|| {
            HermesError::Config(format!(
                "V3 venue {} is missing a quoter address",
                config.name
            ))
        })?;
        Ok(Self {
            reader,
            config,
            quoter,
        })
    }
}

#[async_trait]
impl DexAdapter for UniswapV3Adapter {
    async fn quote_all(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: U256,
    ) -> Result<Vec<VenueQuote>> {
        if amount_in.is_zero() {
            return Ok(Vec::new());
        }

        // One task per fee tier; a failing tier is logged and dropped, it
        // never takes the venue down with it.
        let mut tasks: JoinSet<(u32, Option<VenueQuote>)> = JoinSet::new();
        for fee in FEE_TIERS {
            let reader = Arc::clone(&self.reader);
            let venue = self.config.name.clone();
            let factory = self.config.factory;
            let quoter = self.quoter;
            let token_in = token_in.clone();
            let token_out = token_out.clone();
            tasks.spawn(async move {
                let quote = match quote_tier(
                    reader, &venue, factory, quoter, &token_in, &token_out, amount_in, fee,
                )
                .await
                {
                    Ok(quote) => quote,
                    Err(e) => {
                        warn!(venue = %venue, fee, error = %e, "fee tier quote failed");
                        None
                    }
                };
                (fee, quote)
            });
        }

        let mut quotes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Some(quote))) => quotes.push(quote),
                Ok((_, None)) => {}
                Err(e) => warn!(venue = %self.config.name, error = %e, "tier task panicked"),
            }
        }
        quotes.sort_by_key(|q| q.fee_tier);
        Ok(quotes)
    }

    async fn pool_exists(
        &self,
        token_in: Address,
        token_out: Address,
        fee_tier: Option<u32>,
    ) -> Result<bool> {
        match fee_tier {
            Some(fee) => {
                let pool = self
                    .reader
                    .v3_get_pool(self.config.factory, token_in, token_out, fee)
                    .await?;
                Ok(pool.is_some())
            }
            None => {
                for fee in FEE_TIERS {
                    let pool = self
                        .reader
                        .v3_get_pool(self.config.factory, token_in, token_out, fee)
                        .await?;
                    if pool.is_some() {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    async fn token_info(&self, address: Address) -> Result<Token> {
        erc20_token_info(self.reader.as_ref(), address).await
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn version(&self) -> Protocol {
        Protocol::V3
    }
}

#[allow(clippy::too_many_arguments)]
async fn quote_tier(
    reader: Arc<dyn ChainReader>,
    venue: &str,
    factory: Address,
    quoter: Address,
    token_in: &Token,
    token_out: &Token,
    amount_in: U256,
    fee: u32,
) -> ChainResult<Option<VenueQuote>> {
    let pool = match reader
        .v3_get_pool(factory, token_in.address, token_out.address, fee)
        .await?
    {
        Some(pool) => pool,
        None => return Ok(None),
    };

    let (slot0, liquidity, token0) = tokio::try_join!(
        reader.v3_slot0(pool),
        reader.v3_liquidity(pool),
        reader.v3_token0(pool),
    )?;
    if liquidity == 0 || slot0.sqrt_price_x96.is_zero() {
        debug!(venue, fee, pool = %pool, "tier has no active liquidity");
        return Ok(None);
    }

    let amount_out = reader
        .v3_quote_exact_input_single(
            quoter,
            token_in.address,
            token_out.address,
            fee,
            amount_in,
            U256::zero(),
        )
        .await?;
    if amount_out.is_zero() {
        return Ok(None);
    }

    // Mid price of the output token per input token, oriented by token0.
    let mid_price = if token0 == token_in.address {
        math::sqrt_price_x96_to_price(slot0.sqrt_price_x96, token_in.decimals, token_out.decimals)
    } else {
        let price0 =
            math::sqrt_price_x96_to_price(slot0.sqrt_price_x96, token_out.decimals, token_in.decimals);
        if price0 > 0.0 {
            1.0 / price0
        } else {
            0.0
        }
    };
    let execution_price = (math::u256_to_f64(amount_out)
        / 10f64.powi(i32::from(token_out.decimals)))
        / (math::u256_to_f64(amount_in) / 10f64.powi(i32::from(token_in.decimals)));

    // The quoter reports only amountOut; the post-swap sqrt price is
    // reconstructed from the execution/mid-price ratio.
    let sqrt_after =
        math::sqrt_price_after_swap(slot0.sqrt_price_x96, execution_price, mid_price);
    let price_impact = math::v3_price_impact(slot0.sqrt_price_x96, sqrt_after);
    let warning = math::warning_for_impact(price_impact);

    Ok(Some(VenueQuote {
        venue: venue.to_string(),
        protocol: Protocol::V3,
        amount_out,
        price_impact,
        gas_estimate: DEFAULT_SWAP_GAS,
        fee_tier: Some(fee),
        pool_address: pool,
        warning,
    }))
}
