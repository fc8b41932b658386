/*
 * REST API surface: validation, decimal parsing, response shaping. The only
 * layer where engine errors map to HTTP statuses.
 */

pub mod types;

use ethers::types::{Address, Bytes, U256};
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{get, post, routes, State};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::error;

use crate::math;
use crate::models::{Approval, HermesError, Result, RouteArtifact, Token, VenueQuote};
use crate::service::AggregatorService;
use crate::utils::{format_address, format_amount, parse_address, parse_amount};
use types::{
    ApprovalBody, BuildTxData, ErrorBody, QuoteData, QuoteRequest, RouteQuote, RouteSummary,
    SavingsBody, Success, TokenSide, TransactionBody,
};

/// End-to-end deadline per request; outstanding chain reads are abandoned
/// when it fires.
const REQUEST_DEADLINE: Duration = Duration::from_secs(10);

const DEFAULT_SLIPPAGE_PERCENT: f64 = 0.5;

pub struct ApiState {
    pub service: Arc<AggregatorService>,
}

type ApiResult<T> = std::result::Result<Json<Success<T>>, Custom<Json<ErrorBody>>>;

fn error_response(err: &HermesError) -> Custom<Json<ErrorBody>> {
    let status = match err {
        HermesError::InvalidInput(_) | HermesError::UnknownToken(_) | HermesError::NoLiquidity => {
            Status::BadRequest
        }
        HermesError::Timeout => Status::GatewayTimeout,
        HermesError::Chain(_) | HermesError::Config(_) | HermesError::Internal(_) => {
            error!(error = %err, "request failed");
            Status::InternalServerError
        }
    };
    Custom(
        status,
        Json(ErrorBody {
            success: false,
            error: err.to_string(),
        }),
    )
}

#[post("/api/aggregator/quote", data = "<request>")]
pub async fn quote(request: Json<QuoteRequest>, state: &State<ApiState>) -> ApiResult<QuoteData> {
    let request = request.into_inner();
    match timeout(REQUEST_DEADLINE, handle_quote(&state.service, request)).await {
        Ok(Ok(data)) => Ok(Json(Success::new(data))),
        Ok(Err(e)) => Err(error_response(&e)),
        Err(_) => Err(error_response(&HermesError::Timeout)),
    }
}

#[post("/api/aggregator/build-tx", data = "<request>")]
pub async fn build_tx(
    request: Json<QuoteRequest>,
    state: &State<ApiState>,
) -> ApiResult<BuildTxData> {
    let request = request.into_inner();
    match timeout(REQUEST_DEADLINE, handle_build_tx(&state.service, request)).await {
        Ok(Ok(data)) => Ok(Json(Success::new(data))),
        Ok(Err(e)) => Err(error_response(&e)),
        Err(_) => Err(error_response(&HermesError::Timeout)),
    }
}

#[get("/health")]
pub async fn health_check() -> &'static str {
    "OK"
}

#[must_use]
pub fn create_rocket(state: ApiState, port: u16) -> rocket::Rocket<rocket::Build> {
    let figment = rocket::Config::figment()
        .merge(("port", port))
        .merge(("address", "0.0.0.0"));
    rocket::custom(figment)
        .manage(state)
        .mount("/", routes![quote, build_tx, health_check])
}

/// Validated and parsed request inputs.
struct SwapInputs {
    token_in: Token,
    token_out_address: Address,
    amount_in: U256,
    slippage: f64,
    user: Option<Address>,
}

async fn validate(service: &AggregatorService, request: &QuoteRequest) -> Result<SwapInputs> {
    let token_in_raw = request
        .token_in
        .as_deref()
        .ok_or_else(|| HermesError::InvalidInput("tokenIn is required".to_string()))?;
    let token_out_raw = request
        .token_out
        .as_deref()
        .ok_or_else(|| HermesError::InvalidInput("tokenOut is required".to_string()))?;
    let amount_in_raw = request
        .amount_in
        .as_deref()
        .ok_or_else(|| HermesError::InvalidInput("amountIn is required".to_string()))?;

    let token_in_address = parse_address(token_in_raw)?;
    let token_out_address = parse_address(token_out_raw)?;
    let user = match &request.user_address {
        Some(raw) => Some(parse_address(raw)?),
        None => None,
    };

    let slippage = request.slippage.unwrap_or(DEFAULT_SLIPPAGE_PERCENT);
    if !(0.0..=100.0).contains(&slippage) {
        return Err(HermesError::InvalidInput(format!(
            "slippage must be between 0 and 100, got {slippage}"
        )));
    }

    // Decimals come from the registry or the chain before the amount can be
    // shifted into integer units.
    let token_in = service.resolve_token(token_in_address).await?;
    let amount_in = parse_amount(amount_in_raw, token_in.decimals)?;
    if amount_in.is_zero() {
        return Err(HermesError::InvalidInput(
            "amountIn must be positive".to_string(),
        ));
    }

    Ok(SwapInputs {
        token_in,
        token_out_address,
        amount_in,
        slippage,
        user,
    })
}

async fn handle_quote(service: &AggregatorService, request: QuoteRequest) -> Result<QuoteData> {
    let inputs = validate(service, &request).await?;
    let aggregated = service
        .aggregate(inputs.token_in.address, inputs.token_out_address, inputs.amount_in)
        .await?;

    // Route artifacts are built after ranking so every surviving quote gets
    // one, each with its own approval check.
    let mut routes = Vec::with_capacity(aggregated.quotes.len());
    for venue_quote in &aggregated.quotes {
        let artifact = service
            .build_route(
                venue_quote,
                &aggregated.token_in,
                &aggregated.token_out,
                inputs.amount_in,
                inputs.slippage,
                inputs.user,
            )
            .await?;
        routes.push(route_quote_body(
            venue_quote,
            &artifact,
            aggregated.token_out.decimals,
        ));
    }

    let best = aggregated.best();
    let min_out = math::min_amount_out(best.amount_out, inputs.slippage);
    let out_decimals = aggregated.token_out.decimals;

    Ok(QuoteData {
        token_in: TokenSide {
            address: format_address(aggregated.token_in.address),
            symbol: aggregated.token_in.symbol.clone(),
            amount: format_amount(inputs.amount_in, aggregated.token_in.decimals),
            amount_wei: inputs.amount_in.to_string(),
        },
        token_out: TokenSide {
            address: format_address(aggregated.token_out.address),
            symbol: aggregated.token_out.symbol.clone(),
            amount: format_amount(best.amount_out, out_decimals),
            amount_wei: best.amount_out.to_string(),
        },
        best_route: routes[0].clone(),
        all_quotes: routes,
        savings: SavingsBody {
            percentage: aggregated.savings.percentage,
            amount: format_amount(aggregated.savings.absolute_amount, out_decimals),
            amount_wei: aggregated.savings.absolute_amount.to_string(),
        },
        slippage: format!("{}%", inputs.slippage),
        minimum_amount_out: format_amount(min_out, out_decimals),
        minimum_amount_out_wei: min_out.to_string(),
        recommendation: aggregated.recommendation.clone(),
    })
}

async fn handle_build_tx(service: &AggregatorService, request: QuoteRequest) -> Result<BuildTxData> {
    let inputs = validate(service, &request).await?;
    let aggregated = service
        .aggregate(inputs.token_in.address, inputs.token_out_address, inputs.amount_in)
        .await?;
    let best = aggregated.best();

    let artifact = service
        .build_route(
            best,
            &aggregated.token_in,
            &aggregated.token_out,
            inputs.amount_in,
            inputs.slippage,
            inputs.user,
        )
        .await?;

    Ok(BuildTxData {
        to: format_address(artifact.to),
        data: Bytes::from(artifact.calldata.clone()).to_string(),
        value: artifact.value.to_string(),
        approval_needed: artifact.approval.needed(),
        route: RouteSummary {
            dex: best.protocol.to_string(),
            dex_name: best.venue.clone(),
            fee_tier: best.fee_tier,
            amount_out: format_amount(best.amount_out, aggregated.token_out.decimals),
            amount_out_wei: best.amount_out.to_string(),
            pool_address: format_address(best.pool_address),
        },
        aggregator_contract: service.aggregator_contract().map(format_address),
    })
}

fn route_quote_body(quote: &VenueQuote, artifact: &RouteArtifact, out_decimals: u8) -> RouteQuote {
    RouteQuote {
        dex: quote.protocol.to_string(),
        dex_name: quote.venue.clone(),
        fee_tier: quote.fee_tier,
        amount_out: format_amount(quote.amount_out, out_decimals),
        amount_out_wei: quote.amount_out.to_string(),
        price_impact: quote.price_impact,
        gas_estimate: quote.gas_estimate,
        pool_address: format_address(quote.pool_address),
        price_impact_warning: quote.warning.clone(),
        transaction: TransactionBody {
            to: format_address(artifact.to),
            data: Bytes::from(artifact.calldata.clone()).to_string(),
            value: artifact.value.to_string(),
            from: format_address(artifact.from),
        },
        approval: approval_body(&artifact.approval),
    }
}

fn approval_body(approval: &Approval) -> ApprovalBody {
    match approval {
        Approval::Needed {
            token,
            spender,
            amount,
        } => ApprovalBody {
            needed: true,
            message: approval.message().to_string(),
            token: Some(format_address(*token)),
            spender: Some(format_address(*spender)),
            amount: Some(amount.to_string()),
        },
        _ => ApprovalBody {
            needed: false,
            message: approval.message().to_string(),
            token: None,
            spender: None,
            amount: None,
        },
    }
}
