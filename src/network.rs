use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, address};
use serde::{Deserialize, Serialize};

/// Edge router deployment, identical on both supported chains.
const EDGE_ROUTER: Address = address!("DfB50fB4BE4A0F7E9A7e5641944471bB0D2902D9");

// Ethereum mainnet (Uniswap)
const ETH_V2_ROUTER: Address = address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D");
const ETH_V3_ROUTER: Address = address!("68b3465833fb72A70ecDF485E0e4C7bD8665Fc45");
const ETH_V3_QUOTER: Address = address!("61fFE014bA17989E743c5F6cB21bF9697530B21e");
const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

// BNB Smart Chain (PancakeSwap)
const BSC_V2_ROUTER: Address = address!("10ED43C718714eb63d5aA57B78B54704E256024E");
const BSC_V3_ROUTER: Address = address!("13f4EA83D0bd40E75C8222255bc855a974568Dd4");
const BSC_V3_QUOTER: Address = address!("B048Bbc1Ee6b733FFfCFb9e9CeF7375518e25997");
const WBNB: Address = address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c");

/// The chains a trade can be executed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    #[serde(rename = "ETH")]
    Ethereum,
    #[serde(rename = "BSC")]
    Bsc,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Ethereum, Network::Bsc];

    pub fn key(&self) -> &'static str {
        match self {
            Network::Ethereum => "ETH",
            Network::Bsc => "BSC",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ETH" | "ETHEREUM" => Ok(Network::Ethereum),
            "BSC" | "BNB" => Ok(Network::Bsc),
            other => Err(format!("Invalid network selected: {other} (expected ETH or BSC)")),
        }
    }
}

/// Static per-chain deployment data. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub network: Network,
    pub name: &'static str,
    pub rpc_url: String,
    pub chain_id: u64,
    pub native_symbol: &'static str,
    pub v2_router: Address,
    pub v2_weth: Address,
    pub v3_router: Address,
    pub v3_quoter: Address,
    pub v3_weth: Address,
    pub edge_router: Address,
}

impl NetworkConfig {
    pub fn new(network: Network, rpc_url: impl Into<String>) -> Self {
        match network {
            Network::Ethereum => Self::ethereum(rpc_url),
            Network::Bsc => Self::bsc(rpc_url),
        }
    }

    pub fn ethereum(rpc_url: impl Into<String>) -> Self {
        Self {
            network: Network::Ethereum,
            name: "Ethereum",
            rpc_url: rpc_url.into(),
            chain_id: 1,
            native_symbol: "ETH",
            v2_router: ETH_V2_ROUTER,
            v2_weth: WETH,
            v3_router: ETH_V3_ROUTER,
            v3_quoter: ETH_V3_QUOTER,
            v3_weth: WETH,
            edge_router: EDGE_ROUTER,
        }
    }

    pub fn bsc(rpc_url: impl Into<String>) -> Self {
        Self {
            network: Network::Bsc,
            name: "BSC",
            rpc_url: rpc_url.into(),
            chain_id: 56,
            native_symbol: "BNB",
            v2_router: BSC_V2_ROUTER,
            v2_weth: WBNB,
            v3_router: BSC_V3_ROUTER,
            v3_quoter: BSC_V3_QUOTER,
            v3_weth: WBNB,
            edge_router: EDGE_ROUTER,
        }
    }
}
