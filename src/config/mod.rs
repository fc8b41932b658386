/*
 * Configuration management: environment-driven, loaded once at startup
 */

use ethers::types::Address;
use std::env;
use tracing::warn;

use crate::models::{HermesError, Protocol, Result, VenueConfig};
use crate::utils::parse_address;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rpc_url: String,
    /// Fixed venue list; adapters are constructed from this at boot.
    pub venues: Vec<VenueConfig>,
    /// Optional on-chain executor surfaced in build-tx responses.
    pub aggregator_contract: Option<Address>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| HermesError::Config(format!("invalid PORT {raw}: {e}")))?,
            Err(_) => DEFAULT_PORT,
        };
        let rpc_url = env::var("RPC_URL")
            .map_err(|_| HermesError::Config("RPC_URL not set".to_string()))?;

        let mut venues = Vec::new();
        if let Some(venue) = v2_venue_from_env()? {
            venues.push(venue);
        }
        if let Some(venue) = v3_venue_from_env()? {
            venues.push(venue);
        }
        if venues.is_empty() {
            return Err(HermesError::Config(
                "no venues configured: set FACTORY_ADDRESS/ROUTER_ADDRESS and/or the V3_* variables"
                    .to_string(),
            ));
        }

        Ok(Config {
            port,
            rpc_url,
            venues,
            aggregator_contract: optional_address("AGGREGATOR_CONTRACT_ADDRESS")?,
        })
    }
}

fn v2_venue_from_env() -> Result<Option<VenueConfig>> {
    let factory = optional_address("FACTORY_ADDRESS")?;
    let router = optional_address("ROUTER_ADDRESS")?;
    match (factory, router) {
        (Some(factory), Some(router)) => Ok(Some(VenueConfig {
            name: "Uniswap V2".to_string(),
            version: Protocol::V2,
            factory,
            router: Some(router),
            quoter: None,
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(HermesError::Config(
            "ROUTER_ADDRESS must be set alongside FACTORY_ADDRESS".to_string(),
        )),
        (None, Some(_)) => Err(HermesError::Config(
            "FACTORY_ADDRESS must be set alongside ROUTER_ADDRESS".to_string(),
        )),
    }
}

fn v3_venue_from_env() -> Result<Option<VenueConfig>> {
    let factory = optional_address("V3_FACTORY_ADDRESS")?;
    let quoter = optional_address("V3_QUOTER_ADDRESS")?;
    let router = optional_address("V3_SWAP_ROUTER_ADDRESS")?;
    match (factory, quoter) {
        (Some(factory), Some(quoter)) => {
            if router.is_none() {
                warn!("V3_SWAP_ROUTER_ADDRESS not set; V3 quotes will have no buildable route");
            }
            Ok(Some(VenueConfig {
                name: "Uniswap V3".to_string(),
                version: Protocol::V3,
                factory,
                router,
                quoter: Some(quoter),
            }))
        }
        (None, None) => Ok(None),
        (Some(_), None) => Err(HermesError::Config(
            "V3_QUOTER_ADDRESS must be set alongside V3_FACTORY_ADDRESS".to_string(),
        )),
        (None, Some(_)) => Err(HermesError::Config(
            "V3_FACTORY_ADDRESS must be set alongside V3_QUOTER_ADDRESS".to_string(),
        )),
    }
}

fn optional_address(var: &str) -> Result<Option<Address>> {
    match env::var(var) {
        Ok(raw) => parse_address(&raw)
            .map(Some)
            .map_err(|_| HermesError::Config(format!("{var} is not a valid address: {raw}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so environment mutation stays sequential.
    #[test]
    fn from_env_builds_and_validates_venues() {
        env::set_var("RPC_URL", "http://localhost:8545");
        env::set_var("PORT", "3210");
        env::set_var("FACTORY_ADDRESS", "0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f");
        env::set_var("ROUTER_ADDRESS", "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D");
        env::set_var("V3_FACTORY_ADDRESS", "0x1F98431c8aD98523631AE4a59f267346ea31F984");
        env::set_var("V3_QUOTER_ADDRESS", "0xb27308f9F90D607463bb33eA1BeBb41C27CE5AB6");
        env::set_var(
            "V3_SWAP_ROUTER_ADDRESS",
            "0xE592427A0AEce92De3Edee1F18E0157C05861564",
        );
        env::remove_var("AGGREGATOR_CONTRACT_ADDRESS");

        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 3210);
        assert_eq!(config.venues.len(), 2);
        assert_eq!(config.venues[0].version, Protocol::V2);
        assert!(config.venues[0].router.is_some());
        assert_eq!(config.venues[1].version, Protocol::V3);
        assert!(config.venues[1].quoter.is_some());
        assert!(config.aggregator_contract.is_none());

        // A partial V2 variable set is a configuration error.
        env::remove_var("ROUTER_ADDRESS");
        assert!(matches!(
            Config::from_env(),
            Err(HermesError::Config(msg)) if msg.contains("ROUTER_ADDRESS")
        ));

        // Dropping the V2 set entirely leaves the V3 venue alone.
        env::remove_var("FACTORY_ADDRESS");
        let config = Config::from_env().unwrap();
        assert_eq!(config.venues.len(), 1);
        assert_eq!(config.venues[0].version, Protocol::V3);

        // With no venues at all, startup must fail.
        env::remove_var("V3_FACTORY_ADDRESS");
        env::remove_var("V3_QUOTER_ADDRESS");
        env::remove_var("V3_SWAP_ROUTER_ADDRESS");
        assert!(matches!(
            Config::from_env(),
            Err(HermesError::Config(msg)) if msg.contains("no venues")
        ));

        env::remove_var("RPC_URL");
        env::remove_var("PORT");
    }
}
