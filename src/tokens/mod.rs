/*
 * Token registry: well-known tokens keyed by address and symbol, the native
 * token sentinel, and a short-lived cache for chain-resolved metadata
 */

use ethers::types::Address;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::models::Token;

/// Sentinel address denoting the chain's native gas token. No ERC-20 call is
/// ever issued against it and it never requires an approval.
pub const NATIVE_TOKEN_ADDRESS: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";

pub const WETH_ADDRESS: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
pub const USDC_ADDRESS: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const USDT_ADDRESS: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";
pub const DAI_ADDRESS: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";
pub const WBTC_ADDRESS: &str = "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599";

const METADATA_CACHE_TTL: Duration = Duration::from_secs(300);

#[must_use]
pub fn native_token_address() -> Address {
    NATIVE_TOKEN_ADDRESS.parse().unwrap()
}

/// Case-insensitive check against the native sentinel. Address bytes are the
/// canonical form, so plain equality covers every input casing.
#[must_use]
pub fn is_native(address: Address) -> bool {
    address == native_token_address()
}

/// In-memory table of well-known tokens, built once at startup and read-only
/// afterwards. Lookups are constant-time.
pub struct TokenRegistry {
    by_address: HashMap<Address, Token>,
    by_symbol: HashMap<String, Token>,
}

impl TokenRegistry {
    /// Registry seeded with the chain's well-known token set.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            by_address: HashMap::new(),
            by_symbol: HashMap::new(),
        };

        let native = Token {
            address: native_token_address(),
            symbol: "ETH".to_string(),
            name: "Ether".to_string(),
            decimals: 18,
            is_native: true,
        };
        registry.insert(native);

        for (address, symbol, name, decimals) in [
            (WETH_ADDRESS, "WETH", "Wrapped Ether", 18u8),
            (USDC_ADDRESS, "USDC", "USD Coin", 6),
            (USDT_ADDRESS, "USDT", "Tether USD", 6),
            (DAI_ADDRESS, "DAI", "Dai Stablecoin", 18),
            (WBTC_ADDRESS, "WBTC", "Wrapped BTC", 8),
        ] {
            let parsed = Address::from_str(address).unwrap();
            registry.insert(Token::new(parsed, symbol, name, decimals));
        }

        registry
    }

    fn insert(&mut self, token: Token) {
        self.by_symbol
            .insert(token.symbol.to_uppercase(), token.clone());
        self.by_address.insert(token.address, token);
    }

    #[must_use]
    pub fn get_by_address(&self, address: Address) -> Option<&Token> {
        self.by_address.get(&address)
    }

    #[must_use]
    pub fn get_by_symbol(&self, symbol: &str) -> Option<&Token> {
        self.by_symbol.get(&symbol.to_uppercase())
    }

    #[must_use]
    pub fn get_all(&self) -> Vec<&Token> {
        self.by_address.values().collect()
    }

    /// The fixed intermediary set: native, wrapped native, and the majors.
    #[must_use]
    pub fn get_common_bases(&self) -> Vec<&Token> {
        ["ETH", "WETH", "USDC", "USDT", "DAI"]
            .iter()
            .filter_map(|symbol| self.get_by_symbol(symbol))
            .collect()
    }

    #[must_use]
    pub fn is_native(&self, address: Address) -> bool {
        is_native(address)
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// TTL cache for token metadata resolved from the chain, so an unknown token
/// costs one metadata read per window. The quote path itself is never cached.
pub struct TokenCache {
    ttl: Duration,
    entries: RwLock<HashMap<Address, (Token, Instant)>>,
}

impl TokenCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(METADATA_CACHE_TTL)
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn get(&self, address: Address) -> Option<Token> {
        let entries = self.entries.read().ok()?;
        let (token, stored_at) = entries.get(&address)?;
        if stored_at.elapsed() > self.ttl {
            return None;
        }
        Some(token.clone())
    }

    pub fn insert(&self, token: Token) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(token.address, (token, Instant::now()));
        }
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_address;

    #[test]
    fn symbol_lookup_ignores_case() {
        let registry = TokenRegistry::with_defaults();
        assert_eq!(registry.get_by_symbol("usdc").unwrap().decimals, 6);
        assert_eq!(registry.get_by_symbol("Weth").unwrap().decimals, 18);
        assert!(registry.get_by_symbol("NOPE").is_none());
    }

    #[test]
    fn address_lookup_accepts_any_input_casing() {
        let registry = TokenRegistry::with_defaults();
        let mixed = parse_address("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48").unwrap();
        let lower = parse_address("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48").unwrap();
        assert_eq!(
            registry.get_by_address(mixed).unwrap().symbol,
            registry.get_by_address(lower).unwrap().symbol
        );
    }

    #[test]
    fn native_sentinel_is_case_insensitive() {
        let upper = parse_address("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE").unwrap();
        assert!(is_native(upper));
        let registry = TokenRegistry::with_defaults();
        assert!(registry.get_by_address(upper).unwrap().is_native);
    }

    #[test]
    fn common_bases_are_the_intermediary_set() {
        let registry = TokenRegistry::with_defaults();
        let symbols: Vec<&str> = registry
            .get_common_bases()
            .iter()
            .map(|t| t.symbol.as_str())
            .collect();
        assert_eq!(symbols, ["ETH", "WETH", "USDC", "USDT", "DAI"]);
    }

    #[test]
    fn metadata_cache_expires() {
        let cache = TokenCache::with_ttl(Duration::from_millis(10));
        let token = Token::new(Address::random(), "TEST", "Test Token", 18);
        cache.insert(token.clone());
        assert!(cache.get(token.address).is_some());
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get(token.address).is_none());
    }
}
