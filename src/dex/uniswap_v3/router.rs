/*
 * Uniswap V3 swap-router calldata builder
 */

use ethers::abi::Token as AbiToken;
use ethers::types::{Address, U256};

use crate::dex::encode_call;

/// `exactInputSingle` with the canonical tuple form
/// `(tokenIn, tokenOut, fee, recipient, deadline, amountIn,
///   amountOutMinimum, sqrtPriceLimitX96)`.
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn exact_input_single(
    token_in: Address,
    token_out: Address,
    fee: u32,
    recipient: Address,
    deadline: U256,
    amount_in: U256,
    amount_out_minimum: U256,
    sqrt_price_limit_x96: U256,
) -> Vec<u8> {
    encode_call(
        "exactInputSingle((address,address,uint24,address,uint256,uint256,uint256,uint160))",
        &[AbiToken::Tuple(vec![
            AbiToken::Address(token_in),
            AbiToken::Address(token_out),
            AbiToken::Uint(U256::from(fee)),
            AbiToken::Address(recipient),
            AbiToken::Uint(deadline),
            AbiToken::Uint(amount_in),
            AbiToken::Uint(amount_out_minimum),
            AbiToken::Uint(sqrt_price_limit_x96),
        ])],
    )
}
