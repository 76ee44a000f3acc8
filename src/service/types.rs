use std::fmt;

use alloy::primitives::{Address, TxHash, U256};
use rmcp::schemars::{self, JsonSchema};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::service::utils::{BPS_DENOMINATOR, NATIVE_DECIMALS, SellAmount, format_units};
use crate::service::{ServiceResult, TradeError};

// Core trade types

/// Liquidity venue a quote came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Venue {
    V2,
    V3 { fee_tier: u32 },
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::V2 => write!(f, "V2"),
            Venue::V3 { fee_tier } => {
                write!(f, "V3 ({}%)", Decimal::new(*fee_tier as i64, 4).normalize())
            }
        }
    }
}

/// A venue's answer for one input amount. Never built with `amount_out == 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolQuote {
    pub venue: Venue,
    pub amount_in: U256,
    pub amount_out: U256,
    pub path: Vec<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, JsonSchema, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeDirection::Buy => write!(f, "buy"),
            TradeDirection::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeAmount {
    /// Native currency to spend, e.g. "0.1".
    Native(String),
    /// Tokens to sell: amount, base units or a share of the balance.
    Tokens(SellAmount),
}

/// One buy or sell request. Built per trade and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeIntent {
    pub token: Address,
    pub direction: TradeDirection,
    pub amount: TradeAmount,
    pub settings: TradeSettings,
}

impl TradeIntent {
    pub fn buy(token: Address, native_amount: impl Into<String>, settings: TradeSettings) -> Self {
        Self {
            token,
            direction: TradeDirection::Buy,
            amount: TradeAmount::Native(native_amount.into()),
            settings,
        }
    }

    pub fn sell(token: Address, amount: &str, settings: TradeSettings) -> ServiceResult<Self> {
        Ok(Self {
            token,
            direction: TradeDirection::Sell,
            amount: TradeAmount::Tokens(amount.parse()?),
            settings,
        })
    }
}

/// Slippage and gas budget for one trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeSettings {
    pub slippage_bps: u32,
    pub gas_limit: u64,
}

impl TradeSettings {
    pub const DEFAULT_SLIPPAGE_BPS: u32 = 500;
    pub const DEFAULT_GAS_LIMIT: u64 = 500_000;
    pub const MIN_GAS_LIMIT: u64 = 21_000;
    pub const MAX_GAS_LIMIT: u64 = 1_000_000;

    pub fn new(slippage_bps: u32, gas_limit: u64) -> ServiceResult<Self> {
        let settings = Self {
            slippage_bps,
            gas_limit,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Builds settings from a slippage percentage as the wallet service stores
    /// it (`0.1..=100`).
    pub fn from_percent(slippage_percent: Decimal, gas_limit: u64) -> ServiceResult<Self> {
        if slippage_percent < Decimal::new(1, 1) || slippage_percent > Decimal::ONE_HUNDRED {
            return Err(TradeError::InvalidInput(format!(
                "Slippage must be between 0.1% and 100%, got {slippage_percent}%"
            )));
        }

        let slippage_bps = (slippage_percent * Decimal::ONE_HUNDRED)
            .trunc()
            .to_u32()
            .ok_or_else(|| {
                TradeError::InvalidInput(format!("Invalid slippage {slippage_percent}%"))
            })?;
        Self::new(slippage_bps, gas_limit)
    }

    pub fn validate(&self) -> ServiceResult<()> {
        if self.slippage_bps > BPS_DENOMINATOR {
            return Err(TradeError::InvalidInput(format!(
                "Slippage must be between 0 and {BPS_DENOMINATOR} bps, got {}",
                self.slippage_bps
            )));
        }
        if !(Self::MIN_GAS_LIMIT..=Self::MAX_GAS_LIMIT).contains(&self.gas_limit) {
            return Err(TradeError::InvalidInput(format!(
                "Gas limit must be between {} and {}, got {}",
                Self::MIN_GAS_LIMIT,
                Self::MAX_GAS_LIMIT,
                self.gas_limit
            )));
        }
        Ok(())
    }

    /// Replaces whichever fields the caller supplied.
    pub fn with_overrides(
        self,
        slippage_bps: Option<u32>,
        gas_limit: Option<u64>,
    ) -> ServiceResult<Self> {
        Self::new(
            slippage_bps.unwrap_or(self.slippage_bps),
            gas_limit.unwrap_or(self.gas_limit),
        )
    }
}

impl Default for TradeSettings {
    fn default() -> Self {
        Self {
            slippage_bps: Self::DEFAULT_SLIPPAGE_BPS,
            gas_limit: Self::DEFAULT_GAS_LIMIT,
        }
    }
}

/// Outcome of a confirmed swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeResult {
    pub transaction_hash: TxHash,
    pub confirmed: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub venue: Venue,
    pub direction: TradeDirection,
    pub amount_in: U256,
    pub expected_out: U256,
    pub minimum_out: U256,
    /// `expected_out` formatted in the output asset's decimals.
    pub output_amount: String,
    pub output_symbol: String,
    pub token_symbol: String,
    /// Decimals of the traded token.
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub balance: U256,
    pub symbol: String,
    pub decimals: u8,
    pub formatted: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
    pub formatted_supply: String,
}

/// How many tokens a native amount buys right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPrice {
    pub venue: Venue,
    pub amount_in: U256,
    pub amount_out: U256,
    /// Tokens per one unit of native currency.
    pub price: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasEstimate {
    pub gas: u64,
    pub gas_price: u128,
    /// `gas * gas_price` formatted as native currency.
    pub cost: String,
    pub native_symbol: String,
}

// Tool layer types

#[derive(Debug, JsonSchema, Serialize)]
#[serde(untagged)]
pub enum ToolResult<T> {
    Success(T),
    Error { error: TradeError },
}

impl<T> From<ServiceResult<T>> for ToolResult<T> {
    fn from(result: ServiceResult<T>) -> Self {
        match result {
            Ok(response) => ToolResult::Success(response),
            Err(error) => ToolResult::Error { error },
        }
    }
}

#[derive(Debug, JsonSchema, Serialize, Deserialize)]
pub struct ExecuteBuyRequest {
    /// Network to trade on: "ETH" or "BSC"
    pub network: String,
    /// Token contract address to buy
    pub token_address: String,
    /// Native currency to spend in human-readable format (e.g., "0.1" for 0.1 ETH)
    pub amount: String,
    /// Optional: slippage tolerance in basis points (e.g., 500 for 5%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage_bps: Option<u32>,
    /// Optional: gas limit for the swap transaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
}

#[derive(Debug, JsonSchema, Serialize, Deserialize)]
pub struct ExecuteSellRequest {
    /// Network to trade on: "ETH" or "BSC"
    pub network: String,
    /// Token contract address to sell
    pub token_address: String,
    /// Amount to sell: "1.5" (tokens), "1500000" or "0x16e360" (base units), or "50%" (share of balance)
    pub amount: String,
    /// Optional: slippage tolerance in basis points (e.g., 500 for 5%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage_bps: Option<u32>,
    /// Optional: gas limit for the swap transaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
}

#[derive(Debug, JsonSchema, Serialize)]
pub struct TradeResponse {
    pub transaction_hash: String,
    pub confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// Venue that filled the trade, e.g. "V2" or "V3 (0.3%)"
    pub venue: String,
    pub direction: TradeDirection,
    /// Input amount (raw)
    pub amount_in: String,
    /// Quoted output amount (raw)
    pub expected_out: String,
    /// Minimum accepted output after slippage (raw)
    pub minimum_out: String,
    /// Quoted output amount formatted with decimals
    pub output_amount: String,
    pub output_symbol: String,
    pub token_symbol: String,
}

impl From<TradeResult> for TradeResponse {
    fn from(result: TradeResult) -> Self {
        Self {
            transaction_hash: result.transaction_hash.to_string(),
            confirmed: result.confirmed,
            block_number: result.block_number,
            gas_used: result.gas_used,
            venue: result.venue.to_string(),
            direction: result.direction,
            amount_in: result.amount_in.to_string(),
            expected_out: result.expected_out.to_string(),
            minimum_out: result.minimum_out.to_string(),
            output_amount: result.output_amount,
            output_symbol: result.output_symbol,
            token_symbol: result.token_symbol,
        }
    }
}

#[derive(Debug, JsonSchema, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Network to query: "ETH" or "BSC"
    pub network: String,
    /// Token contract address
    pub token_address: String,
}

#[derive(Debug, JsonSchema, Serialize)]
pub struct TokenBalanceResponse {
    /// Raw balance value
    pub balance: String,
    /// Balance formatted with proper decimals
    pub formatted_balance: String,
    pub decimals: u8,
    pub symbol: String,
}

impl From<TokenBalance> for TokenBalanceResponse {
    fn from(balance: TokenBalance) -> Self {
        Self {
            balance: balance.balance.to_string(),
            formatted_balance: balance.formatted,
            decimals: balance.decimals,
            symbol: balance.symbol,
        }
    }
}

#[derive(Debug, JsonSchema, Serialize, Deserialize)]
pub struct CheckAllowanceRequest {
    /// Network to query: "ETH" or "BSC"
    pub network: String,
    /// Token contract address
    pub token_address: String,
    /// Amount the edge router must be allowed to spend, in human-readable format
    pub amount: String,
}

#[derive(Debug, JsonSchema, Serialize)]
pub struct CheckAllowanceResponse {
    /// Whether the current allowance covers the amount
    pub sufficient: bool,
}

#[derive(Debug, JsonSchema, Serialize)]
pub struct TokenInfoResponse {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Total supply (raw)
    pub total_supply: String,
    /// Total supply formatted with proper decimals
    pub formatted_supply: String,
}

impl From<TokenInfo> for TokenInfoResponse {
    fn from(info: TokenInfo) -> Self {
        Self {
            address: info.address.to_string(),
            name: info.name,
            symbol: info.symbol,
            decimals: info.decimals,
            total_supply: info.total_supply.to_string(),
            formatted_supply: info.formatted_supply,
        }
    }
}

#[derive(Debug, JsonSchema, Serialize, Deserialize)]
pub struct TokenPriceRequest {
    /// Network to query: "ETH" or "BSC"
    pub network: String,
    /// Token contract address
    pub token_address: String,
    /// Optional: native amount to quote (defaults to "1")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_amount: Option<String>,
}

#[derive(Debug, JsonSchema, Serialize)]
pub struct TokenPriceResponse {
    pub venue: String,
    /// Native amount quoted (raw)
    pub amount_in: String,
    /// Tokens received (raw)
    pub amount_out: String,
    /// Tokens per one unit of native currency
    pub price: String,
}

impl From<TokenPrice> for TokenPriceResponse {
    fn from(price: TokenPrice) -> Self {
        Self {
            venue: price.venue.to_string(),
            amount_in: price.amount_in.to_string(),
            amount_out: price.amount_out.to_string(),
            price: price.price,
        }
    }
}

#[derive(Debug, JsonSchema, Serialize, Deserialize)]
pub struct EstimateBuyGasRequest {
    /// Network to query: "ETH" or "BSC"
    pub network: String,
    /// Token contract address to buy
    pub token_address: String,
    /// Native currency to spend in human-readable format
    pub amount: String,
    /// Optional: slippage tolerance in basis points used for the simulated minimum
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage_bps: Option<u32>,
}

#[derive(Debug, JsonSchema, Serialize)]
pub struct EstimateGasResponse {
    /// Estimated gas units
    pub gas: String,
    /// Current gas price in wei
    pub gas_price: String,
    /// Estimated cost in native currency
    pub cost: String,
    pub native_symbol: String,
}

impl From<GasEstimate> for EstimateGasResponse {
    fn from(estimate: GasEstimate) -> Self {
        Self {
            gas: estimate.gas.to_string(),
            gas_price: estimate.gas_price.to_string(),
            cost: estimate.cost,
            native_symbol: estimate.native_symbol,
        }
    }
}

/// Gas cost in native currency.
pub(crate) fn format_gas_cost(gas: u64, gas_price: u128) -> String {
    format_units(U256::from(gas) * U256::from(gas_price), NATIVE_DECIMALS)
}
