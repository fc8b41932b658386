/*
 * Uniswap V2 router calldata builders
 */

use ethers::abi::Token as AbiToken;
use ethers::types::{Address, U256};

use crate::dex::encode_call;

fn path_token(path: &[Address]) -> AbiToken {
    AbiToken::Array(path.iter().copied().map(AbiToken::Address).collect())
}

/// `swapExactETHForTokens(amountOutMin, path, to, deadline)`; the input
/// amount rides along as the transaction value.
#[must_use]
pub fn swap_exact_eth_for_tokens(
    amount_out_min: U256,
    path: &[Address],
    recipient: Address,
    deadline: U256,
) -> Vec<u8> {
    encode_call(
        "swapExactETHForTokens(uint256,address[],address,uint256)",
        &[
            AbiToken::Uint(amount_out_min),
            path_token(path),
            AbiToken::Address(recipient),
            AbiToken::Uint(deadline),
        ],
    )
}

/// `swapExactTokensForETH(amountIn, amountOutMin, path, to, deadline)`.
#[must_use]
pub fn swap_exact_tokens_for_eth(
    amount_in: U256,
    amount_out_min: U256,
    path: &[Address],
    recipient: Address,
    deadline: U256,
) -> Vec<u8> {
    encode_call(
        "swapExactTokensForETH(uint256,uint256,address[],address,uint256)",
        &[
            AbiToken::Uint(amount_in),
            AbiToken::Uint(amount_out_min),
            path_token(path),
            AbiToken::Address(recipient),
            AbiToken::Uint(deadline),
        ],
    )
}

/// `swapExactTokensForTokens(amountIn, amountOutMin, path, to, deadline)`.
#[must_use]
pub fn swap_exact_tokens_for_tokens(
    amount_in: U256,
    amount_out_min: U256,
    path: &[Address],
    recipient: Address,
    deadline: U256,
) -> Vec<u8> {
    encode_call(
        "swapExactTokensForTokens(uint256,uint256,address[],address,uint256)",
        &[
            AbiToken::Uint(amount_in),
            AbiToken::Uint(amount_out_min),
            path_token(path),
            AbiToken::Address(recipient),
            AbiToken::Uint(deadline),
        ],
    )
}
