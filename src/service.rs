/*
 * Aggregator service: fans a swap out across every configured venue in
 * parallel, ranks the surviving quotes and builds ready-to-send routes
 */

use chrono::Utc;
use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dex::{uniswap_v2, uniswap_v3, DexAdapter};
use crate::dex::{uniswap_v2::UniswapV2Adapter, uniswap_v3::UniswapV3Adapter};
use crate::math;
use crate::models::{
    AggregatedQuote, Approval, HermesError, Protocol, Result, RouteArtifact, Savings, Token,
    VenueConfig, VenueQuote,
};
use crate::rpc::{ChainReader, EvmChainReader};
use crate::tokens::{TokenCache, TokenRegistry};
use crate::utils::format_address;

/// Swap deadline attached to every built route.
const ROUTE_DEADLINE_SECS: u64 = 1800;

/// Fee tier used to rank V2 quotes against tiered venues (V2's 0.3% fee).
const V2_RANKING_TIER: u32 = 3000;

pub struct AggregatorService {
    reader: Arc<dyn ChainReader>,
    registry: TokenRegistry,
    token_cache: TokenCache,
    adapters: Vec<Arc<dyn DexAdapter>>,
    v2_router: Option<Address>,
    v3_router: Option<Address>,
    aggregator_contract: Option<Address>,
}

impl AggregatorService {
    pub fn from_config(config: &Config) -> Result<Self> {
        let reader: Arc<dyn ChainReader> = Arc::new(EvmChainReader::new(&config.rpc_url)?);
        Self::with_reader(reader, config.venues.clone(), config.aggregator_contract)
    }

    /// Build the service over an existing reader. The venue list is fixed at
    /// construction; there is no runtime registration.
    pub fn with_reader(
        reader: Arc<dyn ChainReader>,
        venues: Vec<VenueConfig>,
        aggregator_contract: Option<Address>,
    ) -> Result<Self> {
        let mut adapters: Vec<Arc<dyn DexAdapter>> = Vec::new();
        let mut v2_router = None;
        let mut v3_router = None;

        for venue in venues {
            info!(venue = %venue.name, version = %venue.version, "registering venue adapter");
            match venue.version {
                Protocol::V2 => {
                    v2_router = venue.router;
                    adapters.push(Arc::new(UniswapV2Adapter::new(
                        Arc::clone(&reader),
                        venue,
                    )?));
                }
                Protocol::V3 => {
                    v3_router = venue.router;
                    adapters.push(Arc::new(UniswapV3Adapter::new(
                        Arc::clone(&reader),
                        venue,
                    )?));
                }
            }
        }
        if adapters.is_empty() {
            return Err(HermesError::Config(
                "no liquidity venues configured".to_string(),
            ));
        }

        Ok(Self {
            reader,
            registry: TokenRegistry::with_defaults(),
            token_cache: TokenCache::new(),
            adapters,
            v2_router,
            v3_router,
            aggregator_contract,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    #[must_use]
    pub fn aggregator_contract(&self) -> Option<Address> {
        self.aggregator_contract
    }

    /// Resolve token metadata: registry first, then the chain through a
    /// short-lived cache. A token unknown to both is terminal.
    pub async fn resolve_token(&self, address: Address) -> Result<Token> {
        if let Some(token) = self.registry.get_by_address(address) {
            return Ok(token.clone());
        }
        if let Some(token) = self.token_cache.get(address) {
            return Ok(token);
        }

        let metadata = self
            .reader
            .erc20_metadata(address)
            .await
            .map_err(|e| {
                warn!(token = %address, error = %e, "token metadata lookup failed");
                HermesError::UnknownToken(format_address(address))
            })?;
        let token = Token {
            address,
            symbol: metadata.symbol,
            name: metadata.name,
            decimals: metadata.decimals,
            is_native: false,
        };
        self.token_cache.insert(token.clone());
        Ok(token)
    }

    /// Quote a swap against every venue in parallel and rank the results.
    ///
    /// A venue that errors contributes nothing; the request only fails when
    /// every venue comes back empty.
    pub async fn aggregate(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<AggregatedQuote> {
        if token_in == token_out {
            return Err(HermesError::InvalidInput(
                "input and output tokens are identical".to_string(),
            ));
        }
        if amount_in.is_zero() {
            return Err(HermesError::InvalidInput(
                "input amount must be positive".to_string(),
            ));
        }

        let (token_in, token_out) =
            tokio::try_join!(self.resolve_token(token_in), self.resolve_token(token_out))?;

        let mut tasks: JoinSet<(String, Result<Vec<VenueQuote>>)> = JoinSet::new();
        for adapter in &self.adapters {
            let adapter = Arc::clone(adapter);
            let token_in = token_in.clone();
            let token_out = token_out.clone();
            tasks.spawn(async move {
                let name = adapter.name().to_string();
                let quotes = adapter.quote_all(&token_in, &token_out, amount_in).await;
                (name, quotes)
            });
        }

        let mut quotes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((venue, Ok(mut venue_quotes))) => {
                    debug!(venue = %venue, count = venue_quotes.len(), "venue answered");
                    quotes.append(&mut venue_quotes);
                }
                Ok((venue, Err(e))) => {
                    warn!(venue = %venue, error = %e, "venue failed, dropping its quotes");
                }
                Err(e) => warn!(error = %e, "venue task panicked"),
            }
        }
        if quotes.is_empty() {
            return Err(HermesError::NoLiquidity);
        }

        rank_quotes(&mut quotes);
        let savings = compute_savings(&quotes);
        let recommendation = recommendation(&quotes, &savings);

        info!(
            token_in = %token_in.symbol,
            token_out = %token_out.symbol,
            quotes = quotes.len(),
            best = %quotes[0].venue,
            "aggregation complete"
        );

        Ok(AggregatedQuote {
            token_in,
            token_out,
            amount_in,
            quotes,
            savings,
            recommendation,
        })
    }

    /// Build the transaction material for one quote: router calldata, value,
    /// and the per-route allowance pre-check.
    pub async fn build_route(
        &self,
        quote: &VenueQuote,
        token_in: &Token,
        token_out: &Token,
        amount_in: U256,
        slippage_percent: f64,
        user: Option<Address>,
    ) -> Result<RouteArtifact> {
        let min_amount_out = math::min_amount_out(quote.amount_out, slippage_percent);
        let deadline = unix_deadline();
        let recipient = Address::zero();
        let router = self.router_for(quote)?;

        let calldata = match quote.protocol {
            Protocol::V2 => {
                let path = [token_in.address, token_out.address];
                if token_in.is_native {
                    uniswap_v2::router::swap_exact_eth_for_tokens(
                        min_amount_out,
                        &path,
                        recipient,
                        deadline,
                    )
                } else if token_out.is_native {
                    uniswap_v2::router::swap_exact_tokens_for_eth(
                        amount_in,
                        min_amount_out,
                        &path,
                        recipient,
                        deadline,
                    )
                } else {
                    uniswap_v2::router::swap_exact_tokens_for_tokens(
                        amount_in,
                        min_amount_out,
                        &path,
                        recipient,
                        deadline,
                    )
                }
            }
            Protocol::V3 => {
                let fee = quote.fee_tier.ok_or_else(|| {
                    HermesError::Internal("V3 quote is missing its fee tier".to_string())
                })?;
                uniswap_v3::router::exact_input_single(
                    token_in.address,
                    token_out.address,
                    fee,
                    recipient,
                    deadline,
                    amount_in,
                    min_amount_out,
                    U256::zero(),
                )
            }
        };

        let value = if token_in.is_native {
            amount_in
        } else {
            U256::zero()
        };
        let approval = self.check_approval(token_in, amount_in, router, user).await;

        Ok(RouteArtifact {
            to: router,
            calldata,
            value,
            from: Address::zero(),
            approval,
        })
    }

    /// Allowance pre-check for one route. Checked against this route's
    /// router; a read failure degrades to "approval needed".
    async fn check_approval(
        &self,
        token_in: &Token,
        amount_in: U256,
        spender: Address,
        user: Option<Address>,
    ) -> Approval {
        if token_in.is_native {
            return Approval::NativeInput;
        }
        let owner = match user {
            Some(owner) => owner,
            None => {
                return Approval::Needed {
                    token: token_in.address,
                    spender,
                    amount: amount_in,
                }
            }
        };

        match self
            .reader
            .erc20_allowance(token_in.address, owner, spender)
            .await
        {
            Ok(allowance) if allowance >= amount_in => Approval::Sufficient,
            Ok(_) => Approval::Needed {
                token: token_in.address,
                spender,
                amount: amount_in,
            },
            Err(e) => {
                warn!(token = %token_in.symbol, error = %e, "allowance read failed, assuming approval needed");
                Approval::Needed {
                    token: token_in.address,
                    spender,
                    amount: amount_in,
                }
            }
        }
    }

    fn router_for(&self, quote: &VenueQuote) -> Result<Address> {
        let router = match quote.protocol {
            Protocol::V2 => self.v2_router,
            Protocol::V3 => self.v3_router,
        };
        router.ok_or_else(|| {
            HermesError::Internal(format!(
                "no router configured for {} route on {}",
                quote.protocol, quote.venue
            ))
        })
    }
}

fn unix_deadline() -> U256 {
    let now = Utc::now().timestamp().max(0) as u64;
    U256::from(now + ROUTE_DEADLINE_SECS)
}

/// Total order over quotes: output amount descending, then lower impact,
/// then lower fee tier (V2 ranks as the canonical 0.3% tier), then venue
/// name for stability.
fn rank_quotes(quotes: &mut [VenueQuote]) {
    quotes.sort_by_key(|q| {
        (
            Reverse(q.amount_out),
            q.price_impact,
            q.fee_tier.unwrap_or(V2_RANKING_TIER),
            q.venue.clone(),
        )
    });
}

fn compute_savings(quotes: &[VenueQuote]) -> Savings {
    let best = quotes[0].amount_out;
    let worst = quotes
        .iter()
        .map(|q| q.amount_out)
        .min()
        .unwrap_or(best);

    if quotes.len() < 2 || worst.is_zero() || best <= worst {
        return Savings {
            percentage: Decimal::ZERO,
            absolute_amount: U256::zero(),
        };
    }

    let spread = best - worst;
    let raw = math::u256_to_f64(spread) / math::u256_to_f64(worst) * 100.0;
    let mut percentage = Decimal::try_from(raw).unwrap_or(Decimal::ZERO).round_dp(2);
    percentage.rescale(2);

    Savings {
        percentage,
        absolute_amount: spread,
    }
}

fn recommendation(quotes: &[VenueQuote], savings: &Savings) -> String {
    // Venue display names already carry the protocol tag ("Uniswap V3").
    let best = &quotes[0];
    if quotes.len() == 1 {
        return format!(
            "Use {}, the only venue with liquidity for this pair",
            best.venue
        );
    }

    match (best.protocol, best.fee_tier) {
        (Protocol::V3, Some(fee)) => format!(
            "Use {} ({}% fee tier) for {}% better price",
            best.venue,
            f64::from(fee) / 10_000.0,
            savings.percentage
        ),
        _ => format!("Use {} for {}% better price", best.venue, savings.percentage),
    }
}
