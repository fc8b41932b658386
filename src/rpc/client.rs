/*
 * EvmChainReader: ChainReader over an ethers HTTP provider. Calls are
 * hand-encoded (selector + ABI words) and decoded from the raw return data.
 */

use async_trait::async_trait;
use ethers::{
    abi::{self, ParamType, Token},
    providers::{Http, Middleware, Provider, ProviderError},
    types::{Address, Bytes, TransactionRequest, U256},
    utils::keccak256,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::retry::with_retries;
use super::{ChainError, ChainReader, ChainResult, Slot0};

/// Per-read transport timeout. The request-level deadline in the HTTP layer
/// takes precedence.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

pub struct EvmChainReader {
    provider: Arc<Provider<Http>>,
}

impl EvmChainReader {
    pub fn new(rpc_url: &str) -> ChainResult<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| ChainError::Transport(format!("invalid RPC endpoint: {e}")))?;
        Ok(Self {
            provider: Arc::new(provider),
        })
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> ChainResult<Bytes> {
        let tx: ethers::types::transaction::eip2718::TypedTransaction =
            TransactionRequest::new().to(to).data(Bytes::from(data)).into();
        let provider = Arc::clone(&self.provider);
        with_retries(move || {
            let provider = Arc::clone(&provider);
            let tx = tx.clone();
            async move {
                match timeout(READ_TIMEOUT, provider.call(&tx, None)).await {
                    Ok(Ok(bytes)) => Ok(bytes),
                    Ok(Err(e)) => Err(classify(&e)),
                    Err(_) => Err(ChainError::Transport(format!(
                        "read against {to:#x} timed out"
                    ))),
                }
            }
        })
        .await
    }

    async fn call_words(&self, to: Address, data: Vec<u8>, words: usize) -> ChainResult<Bytes> {
        let result = self.call(to, data).await?;
        if result.len() < words * 32 {
            return Err(ChainError::InvalidResponse(format!(
                "expected {} return words from {to:#x}, got {} bytes",
                words,
                result.len()
            )));
        }
        Ok(result)
    }
}

fn classify(err: &ProviderError) -> ChainError {
    let msg = err.to_string();
    if msg.to_lowercase().contains("revert") {
        ChainError::Revert(msg)
    } else {
        ChainError::Transport(msg)
    }
}

fn calldata(signature: &str, args: &[Token]) -> Vec<u8> {
    let selector = &keccak256(signature.as_bytes())[0..4];
    let mut data = Vec::from(selector);
    data.extend_from_slice(&abi::encode(args));
    data
}

fn word_u256(data: &[u8], index: usize) -> U256 {
    U256::from_big_endian(&data[index * 32..(index + 1) * 32])
}

fn word_address(data: &[u8], index: usize) -> Address {
    Address::from_slice(&data[index * 32 + 12..(index + 1) * 32])
}

/// Decode an `int24` return word (sign-extended through the upper bytes).
fn word_int24(data: &[u8], index: usize) -> i32 {
    let word = &data[index * 32..(index + 1) * 32];
    let raw = (i32::from(word[29]) << 16) | (i32::from(word[30]) << 8) | i32::from(word[31]);
    if word[29] >= 0x80 {
        #[allow(clippy::cast_possible_wrap)]
        let extended = raw | 0xFF00_0000_u32 as i32;
        extended
    } else {
        raw
    }
}

fn decode_string(data: &[u8]) -> ChainResult<String> {
    let tokens = abi::decode(&[ParamType::String], data)
        .map_err(|e| ChainError::InvalidResponse(format!("string decode failed: {e}")))?;
    match tokens.into_iter().next() {
        Some(Token::String(s)) => Ok(s),
        _ => Err(ChainError::InvalidResponse(
            "string return value missing".to_string(),
        )),
    }
}

fn decode_u256_array(data: &[u8]) -> ChainResult<Vec<U256>> {
    let tokens = abi::decode(&[ParamType::Array(Box::new(ParamType::Uint(256)))], data)
        .map_err(|e| ChainError::InvalidResponse(format!("uint[] decode failed: {e}")))?;
    match tokens.into_iter().next() {
        Some(Token::Array(items)) => items
            .into_iter()
            .map(|t| match t {
                Token::Uint(v) => Ok(v),
                other => Err(ChainError::InvalidResponse(format!(
                    "unexpected array element: {other:?}"
                ))),
            })
            .collect(),
        _ => Err(ChainError::InvalidResponse(
            "uint[] return value missing".to_string(),
        )),
    }
}

fn address_array(path: &[Address]) -> Token {
    Token::Array(path.iter().copied().map(Token::Address).collect())
}

fn non_zero(address: Address) -> Option<Address> {
    if address.is_zero() {
        None
    } else {
        Some(address)
    }
}

#[async_trait]
impl ChainReader for EvmChainReader {
    async fn erc20_name(&self, token: Address) -> ChainResult<String> {
        let result = self.call(token, calldata("name()", &[])).await?;
        decode_string(&result)
    }

    async fn erc20_symbol(&self, token: Address) -> ChainResult<String> {
        let result = self.call(token, calldata("symbol()", &[])).await?;
        decode_string(&result)
    }

    async fn erc20_decimals(&self, token: Address) -> ChainResult<u8> {
        let result = self.call_words(token, calldata("decimals()", &[]), 1).await?;
        let value = word_u256(&result, 0);
        if value > U256::from(u8::MAX) {
            return Err(ChainError::InvalidResponse(format!(
                "decimals out of range for {token:#x}: {value}"
            )));
        }
        Ok(value.as_u32() as u8)
    }

    async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> ChainResult<U256> {
        let data = calldata(
            "allowance(address,address)",
            &[Token::Address(owner), Token::Address(spender)],
        );
        let result = self.call_words(token, data, 1).await?;
        Ok(word_u256(&result, 0))
    }

    async fn erc20_total_supply(&self, token: Address) -> ChainResult<U256> {
        let result = self
            .call_words(token, calldata("totalSupply()", &[]), 1)
            .await?;
        Ok(word_u256(&result, 0))
    }

    async fn v2_get_pair(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> ChainResult<Option<Address>> {
        let data = calldata(
            "getPair(address,address)",
            &[Token::Address(token_a), Token::Address(token_b)],
        );
        let result = self.call_words(factory, data, 1).await?;
        Ok(non_zero(word_address(&result, 0)))
    }

    async fn v2_all_pairs_length(&self, factory: Address) -> ChainResult<U256> {
        let result = self
            .call_words(factory, calldata("allPairsLength()", &[]), 1)
            .await?;
        Ok(word_u256(&result, 0))
    }

    async fn v2_all_pairs(&self, factory: Address, index: U256) -> ChainResult<Option<Address>> {
        let data = calldata("allPairs(uint256)", &[Token::Uint(index)]);
        let result = self.call_words(factory, data, 1).await?;
        Ok(non_zero(word_address(&result, 0)))
    }

    async fn v2_reserves(&self, pair: Address) -> ChainResult<(U256, U256)> {
        let result = self
            .call_words(pair, calldata("getReserves()", &[]), 2)
            .await?;
        Ok((word_u256(&result, 0), word_u256(&result, 1)))
    }

    async fn v2_token0(&self, pair: Address) -> ChainResult<Address> {
        let result = self.call_words(pair, calldata("token0()", &[]), 1).await?;
        Ok(word_address(&result, 0))
    }

    async fn v2_token1(&self, pair: Address) -> ChainResult<Address> {
        let result = self.call_words(pair, calldata("token1()", &[]), 1).await?;
        Ok(word_address(&result, 0))
    }

    async fn v2_amount_out(
        &self,
        router: Address,
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> ChainResult<U256> {
        let data = calldata(
            "getAmountOut(uint256,uint256,uint256)",
            &[
                Token::Uint(amount_in),
                Token::Uint(reserve_in),
                Token::Uint(reserve_out),
            ],
        );
        let result = self.call_words(router, data, 1).await?;
        Ok(word_u256(&result, 0))
    }

    async fn v2_amounts_out(
        &self,
        router: Address,
        amount_in: U256,
        path: &[Address],
    ) -> ChainResult<Vec<U256>> {
        let data = calldata(
            "getAmountsOut(uint256,address[])",
            &[Token::Uint(amount_in), address_array(path)],
        );
        let result = self.call(router, data).await?;
        decode_u256_array(&result)
    }

    async fn v2_amounts_in(
        &self,
        router: Address,
        amount_out: U256,
        path: &[Address],
    ) -> ChainResult<Vec<U256>> {
        let data = calldata(
            "getAmountsIn(uint256,address[])",
            &[Token::Uint(amount_out), address_array(path)],
        );
        let result = self.call(router, data).await?;
        decode_u256_array(&result)
    }

    async fn v3_get_pool(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> ChainResult<Option<Address>> {
        let data = calldata(
            "getPool(address,address,uint24)",
            &[
                Token::Address(token_a),
                Token::Address(token_b),
                Token::Uint(U256::from(fee)),
            ],
        );
        let result = self.call_words(factory, data, 1).await?;
        Ok(non_zero(word_address(&result, 0)))
    }

    async fn v3_slot0(&self, pool: Address) -> ChainResult<Slot0> {
        let result = self.call_words(pool, calldata("slot0()", &[]), 2).await?;
        Ok(Slot0 {
            sqrt_price_x96: word_u256(&result, 0),
            tick: word_int24(&result, 1),
        })
    }

    async fn v3_liquidity(&self, pool: Address) -> ChainResult<u128> {
        let result = self
            .call_words(pool, calldata("liquidity()", &[]), 1)
            .await?;
        let value = word_u256(&result, 0);
        if value.bits() > 128 {
            return Err(ChainError::InvalidResponse(format!(
                "liquidity out of range for {pool:#x}: {value}"
            )));
        }
        Ok(value.as_u128())
    }

    async fn v3_fee(&self, pool: Address) -> ChainResult<u32> {
        let result = self.call_words(pool, calldata("fee()", &[]), 1).await?;
        Ok(word_u256(&result, 0).as_u32())
    }

    async fn v3_token0(&self, pool: Address) -> ChainResult<Address> {
        let result = self.call_words(pool, calldata("token0()", &[]), 1).await?;
        Ok(word_address(&result, 0))
    }

    async fn v3_token1(&self, pool: Address) -> ChainResult<Address> {
        let result = self.call_words(pool, calldata("token1()", &[]), 1).await?;
        Ok(word_address(&result, 0))
    }

    async fn v3_tick_spacing(&self, pool: Address) -> ChainResult<i32> {
        let result = self
            .call_words(pool, calldata("tickSpacing()", &[]), 1)
            .await?;
        Ok(word_int24(&result, 0))
    }

    async fn v3_quote_exact_input_single(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_in: U256,
        sqrt_price_limit: U256,
    ) -> ChainResult<U256> {
        let data = calldata(
            "quoteExactInputSingle(address,address,uint24,uint256,uint160)",
            &[
                Token::Address(token_in),
                Token::Address(token_out),
                Token::Uint(U256::from(fee)),
                Token::Uint(amount_in),
                Token::Uint(sqrt_price_limit),
            ],
        );
        let result = self.call_words(quoter, data, 1).await?;
        Ok(word_u256(&result, 0))
    }
}
