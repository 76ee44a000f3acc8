use std::str::FromStr;
use std::time::Duration;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{Json, ServerHandler, tool, tool_handler, tool_router};
use tracing::instrument;

use crate::config::Config;
use crate::network::{Network, NetworkConfig};
use crate::service::executor::TradeExecutor;
use crate::service::types::{
    CheckAllowanceRequest, CheckAllowanceResponse, EstimateBuyGasRequest, EstimateGasResponse,
    ExecuteBuyRequest, ExecuteSellRequest, TokenBalanceResponse, TokenInfoResponse,
    TokenPriceRequest, TokenPriceResponse, TokenRequest, ToolResult, TradeResponse, TradeSettings,
};
use crate::service::utils::parse_address;
use crate::service::{ServiceResult, TradeError};

/// MCP tool surface over [`TradeExecutor`].
///
/// Holds configuration only. Every call builds a fresh executor for the
/// requested network, so no trade state outlives a request.
pub struct TradeBotService {
    tool_router: ToolRouter<Self>,
    networks: Vec<NetworkConfig>,
    private_key: String,
    defaults: TradeSettings,
    confirmation_timeout: Duration,
}

// MCP Tool Layer
#[tool_router]
impl TradeBotService {
    pub fn new(config: &Config) -> Self {
        if config.wallet.private_key.is_empty() {
            tracing::warn!("No private key configured. Trade tools will fail until one is set.");
        }

        Self {
            tool_router: Self::tool_router(),
            networks: Network::ALL
                .iter()
                .map(|network| config.network_config(*network))
                .collect(),
            private_key: config.wallet.private_key.clone(),
            defaults: config.trading.default_settings(),
            confirmation_timeout: config.trading.confirmation_timeout(),
        }
    }

    #[instrument(skip(self))]
    #[tool(
        description = "Buy a token with ETH or BNB through the edge router. Picks the first Uniswap/PancakeSwap V3 fee tier or V2 pool with liquidity."
    )]
    pub async fn execute_buy(
        &self,
        Parameters(req): Parameters<ExecuteBuyRequest>,
    ) -> Json<ToolResult<TradeResponse>> {
        let result = self.execute_buy_impl(req).await;
        if let Err(e) = &result {
            tracing::error!("Failed to execute buy: {e}");
        }
        Json(result.into())
    }

    #[instrument(skip(self))]
    #[tool(
        description = "Sell a token for ETH or BNB through the edge router. Amount may be tokens (\"1.5\"), base units (\"1500000\"), or a share of the balance (\"50%\"). Approves the edge router first when needed."
    )]
    pub async fn execute_sell(
        &self,
        Parameters(req): Parameters<ExecuteSellRequest>,
    ) -> Json<ToolResult<TradeResponse>> {
        let result = self.execute_sell_impl(req).await;
        if let Err(e) = &result {
            tracing::error!("Failed to execute sell: {e}");
        }
        Json(result.into())
    }

    #[instrument(skip(self))]
    #[tool(description = "Query the trading wallet's balance of an ERC20/BEP20 token")]
    pub async fn get_token_balance(
        &self,
        Parameters(req): Parameters<TokenRequest>,
    ) -> Json<ToolResult<TokenBalanceResponse>> {
        let result = self.get_token_balance_impl(req).await;
        if let Err(e) = &result {
            tracing::error!("Failed to get token balance: {e}");
        }
        Json(result.into())
    }

    #[instrument(skip(self))]
    #[tool(description = "Check whether the edge router may already spend an amount of a token")]
    pub async fn check_allowance(
        &self,
        Parameters(req): Parameters<CheckAllowanceRequest>,
    ) -> Json<ToolResult<CheckAllowanceResponse>> {
        let result = self.check_allowance_impl(req).await;
        if let Err(e) = &result {
            tracing::error!("Failed to check allowance: {e}");
        }
        Json(result.into())
    }

    #[instrument(skip(self))]
    #[tool(description = "Get token name, symbol, decimals and total supply")]
    pub async fn get_token_info(
        &self,
        Parameters(req): Parameters<TokenRequest>,
    ) -> Json<ToolResult<TokenInfoResponse>> {
        let result = self.get_token_info_impl(req).await;
        if let Err(e) = &result {
            tracing::error!("Failed to get token info: {e}");
        }
        Json(result.into())
    }

    #[instrument(skip(self))]
    #[tool(
        description = "Quote how many tokens a native amount (default 1 ETH/BNB) buys right now"
    )]
    pub async fn get_token_price(
        &self,
        Parameters(req): Parameters<TokenPriceRequest>,
    ) -> Json<ToolResult<TokenPriceResponse>> {
        let result = self.get_token_price_impl(req).await;
        if let Err(e) = &result {
            tracing::error!("Failed to get token price: {e}");
        }
        Json(result.into())
    }

    #[instrument(skip(self))]
    #[tool(description = "Estimate gas for buying a token without sending a transaction")]
    pub async fn estimate_buy_gas(
        &self,
        Parameters(req): Parameters<EstimateBuyGasRequest>,
    ) -> Json<ToolResult<EstimateGasResponse>> {
        let result = self.estimate_buy_gas_impl(req).await;
        if let Err(e) = &result {
            tracing::error!("Failed to estimate buy gas: {e}");
        }
        Json(result.into())
    }
}

// Business Logic - request parsing and executor wiring
impl TradeBotService {
    fn executor(&self, network: &str) -> ServiceResult<TradeExecutor> {
        let network = Network::from_str(network).map_err(TradeError::InvalidInput)?;
        let network_config = self
            .networks
            .iter()
            .find(|config| config.network == network)
            .cloned()
            .ok_or_else(|| {
                TradeError::InternalError(format!("No configuration for network {network}"))
            })?;

        if self.private_key.is_empty() {
            return Err(TradeError::InvalidInput(
                "No wallet private key configured".to_string(),
            ));
        }

        TradeExecutor::connect(network_config, &self.private_key, self.confirmation_timeout)
    }

    #[instrument(skip(self), err)]
    async fn execute_buy_impl(&self, req: ExecuteBuyRequest) -> ServiceResult<TradeResponse> {
        let executor = self.executor(&req.network)?;
        let token = parse_address(&req.token_address)?;
        let settings = self.defaults.with_overrides(req.slippage_bps, req.gas_limit)?;

        let result = executor.execute_buy(token, &req.amount, settings).await?;
        Ok(result.into())
    }

    #[instrument(skip(self), err)]
    async fn execute_sell_impl(&self, req: ExecuteSellRequest) -> ServiceResult<TradeResponse> {
        let executor = self.executor(&req.network)?;
        let token = parse_address(&req.token_address)?;
        let settings = self.defaults.with_overrides(req.slippage_bps, req.gas_limit)?;

        let result = executor.execute_sell(token, &req.amount, settings).await?;
        Ok(result.into())
    }

    #[instrument(skip(self), err)]
    async fn get_token_balance_impl(
        &self,
        req: TokenRequest,
    ) -> ServiceResult<TokenBalanceResponse> {
        let executor = self.executor(&req.network)?;
        let token = parse_address(&req.token_address)?;
        Ok(executor.get_token_balance(token).await?.into())
    }

    #[instrument(skip(self), err)]
    async fn check_allowance_impl(
        &self,
        req: CheckAllowanceRequest,
    ) -> ServiceResult<CheckAllowanceResponse> {
        let executor = self.executor(&req.network)?;
        let token = parse_address(&req.token_address)?;
        let sufficient = executor.check_allowance(token, &req.amount).await?;
        Ok(CheckAllowanceResponse { sufficient })
    }

    #[instrument(skip(self), err)]
    async fn get_token_info_impl(&self, req: TokenRequest) -> ServiceResult<TokenInfoResponse> {
        let executor = self.executor(&req.network)?;
        let token = parse_address(&req.token_address)?;
        Ok(executor.get_token_info(token).await?.into())
    }

    #[instrument(skip(self), err)]
    async fn get_token_price_impl(
        &self,
        req: TokenPriceRequest,
    ) -> ServiceResult<TokenPriceResponse> {
        let executor = self.executor(&req.network)?;
        let token = parse_address(&req.token_address)?;
        let price = executor
            .get_token_price(token, req.native_amount.as_deref())
            .await?;
        Ok(price.into())
    }

    #[instrument(skip(self), err)]
    async fn estimate_buy_gas_impl(
        &self,
        req: EstimateBuyGasRequest,
    ) -> ServiceResult<EstimateGasResponse> {
        let executor = self.executor(&req.network)?;
        let token = parse_address(&req.token_address)?;
        let settings = self.defaults.with_overrides(req.slippage_bps, None)?;
        let estimate = executor
            .estimate_buy_gas(token, &req.amount, settings.slippage_bps)
            .await?;
        Ok(estimate.into())
    }
}

#[tool_handler]
impl ServerHandler for TradeBotService {}
