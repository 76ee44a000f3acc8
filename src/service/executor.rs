use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, TxHash, U256};
use tracing::instrument;

use crate::network::NetworkConfig;
use crate::repository::{
    AlloyChainRepository, ChainRepository, ExactInputSingle, RepositoryError, SwapCall, TxOptions,
    TxReceipt,
};
use crate::service::pool_router::PoolRouter;
use crate::service::token::TokenContractProxy;
use crate::service::types::{
    GasEstimate, PoolQuote, TokenBalance, TokenInfo, TokenPrice, TradeAmount, TradeDirection,
    TradeIntent, TradeResult, TradeSettings, Venue, format_gas_cost,
};
use crate::service::utils::{
    NATIVE_DECIMALS, SellAmount, calculate_minimum_out, format_units, parse_units, swap_deadline,
};
use crate::service::{ServiceResult, TradeError};

/// Gas limit of the approval transaction sent before a sell.
pub const APPROVAL_GAS_LIMIT: u64 = 100_000;

/// Default time to wait for a swap receipt.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(180);

/// Trade lifecycle stages, logged as each one is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Init,
    Quote,
    BalanceCheck,
    ApprovalCheck,
    ApprovalSubmit,
    ApprovalConfirm,
    Submit,
    Confirm,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "INIT",
            Stage::Quote => "QUOTE",
            Stage::BalanceCheck => "BALANCE_CHECK",
            Stage::ApprovalCheck => "APPROVAL_CHECK",
            Stage::ApprovalSubmit => "APPROVAL_SUBMIT",
            Stage::ApprovalConfirm => "APPROVAL_CONFIRM",
            Stage::Submit => "SUBMIT",
            Stage::Confirm => "CONFIRM",
            Stage::Done => "DONE",
        };
        f.write_str(name)
    }
}

fn enter(stage: Stage, side: TradeDirection, token: Address) {
    tracing::info!(%stage, %side, %token, "trade stage");
}

/// Maps a failed chain read to `BlockchainError`, keeping what was being read.
fn read_failed(what: String) -> impl FnOnce(RepositoryError) -> TradeError {
    move |e| {
        tracing::error!("{what} failed: {e}");
        TradeError::BlockchainError(format!("{what} failed: {e}"))
    }
}

/// Executes buys and sells through the edge router for one network and one
/// wallet.
///
/// A trade runs strictly in sequence:
/// `INIT → BALANCE_CHECK → [APPROVAL_CHECK → APPROVAL_SUBMIT →
/// APPROVAL_CONFIRM] → QUOTE → SUBMIT → CONFIRM → DONE`. The executor keeps no state
/// between trades; every balance and allowance is read fresh.
pub struct TradeExecutor {
    repository: Arc<dyn ChainRepository>,
    network: NetworkConfig,
    router: PoolRouter,
    confirmation_timeout: Duration,
}

impl TradeExecutor {
    /// Connects to `network.rpc_url` and signs with `private_key` (hex, with
    /// or without `0x`).
    pub fn connect(
        network: NetworkConfig,
        private_key: &str,
        confirmation_timeout: Duration,
    ) -> ServiceResult<Self> {
        let repository = AlloyChainRepository::connect(&network.rpc_url, private_key)?;
        tracing::info!(
            "Trade executor on {} for wallet {}",
            network.name,
            repository.signer_address()
        );
        Ok(Self::with_repository(
            Arc::new(repository),
            network,
            confirmation_timeout,
        ))
    }

    pub fn with_repository(
        repository: Arc<dyn ChainRepository>,
        network: NetworkConfig,
        confirmation_timeout: Duration,
    ) -> Self {
        let router = PoolRouter::new(repository.clone(), network.clone());
        Self {
            repository,
            network,
            router,
            confirmation_timeout,
        }
    }

    pub fn wallet_address(&self) -> Address {
        self.repository.signer_address()
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    fn token(&self, address: Address) -> TokenContractProxy {
        TokenContractProxy::new(self.repository.clone(), address)
    }

    pub async fn execute(&self, intent: &TradeIntent) -> ServiceResult<TradeResult> {
        match (intent.direction, &intent.amount) {
            (TradeDirection::Buy, TradeAmount::Native(amount)) => {
                self.execute_buy(intent.token, amount, intent.settings).await
            }
            (TradeDirection::Sell, TradeAmount::Tokens(amount)) => {
                self.sell(intent.token, amount, intent.settings).await
            }
            (direction, amount) => Err(TradeError::InvalidInput(format!(
                "A {direction} cannot take amount {amount:?}"
            ))),
        }
    }

    /// Spend `native_amount` (e.g. "0.1") of ETH/BNB on `token`.
    #[instrument(skip(self), fields(network = self.network.name), err)]
    pub async fn execute_buy(
        &self,
        token: Address,
        native_amount: &str,
        settings: TradeSettings,
    ) -> ServiceResult<TradeResult> {
        let side = TradeDirection::Buy;
        enter(Stage::Init, side, token);
        settings.validate()?;

        let amount_in = parse_units(native_amount, NATIVE_DECIMALS)?;
        if amount_in.is_zero() {
            return Err(TradeError::InvalidInput(
                "Buy amount must be greater than zero".to_string(),
            ));
        }

        let proxy = self.token(token);
        let (symbol, decimals) = proxy.metadata().await;
        let wallet = self.wallet_address();

        enter(Stage::BalanceCheck, side, token);
        let balance = self
            .repository
            .get_native_balance(wallet)
            .await
            .map_err(read_failed(format!(
                "Reading {} balance of {wallet}",
                self.network.native_symbol
            )))?;
        if balance < amount_in {
            return Err(TradeError::InsufficientBalance {
                symbol: self.network.native_symbol.to_string(),
                have: format_units(balance, NATIVE_DECIMALS),
                need: format_units(amount_in, NATIVE_DECIMALS),
            });
        }

        enter(Stage::Quote, side, token);
        let quote = self.router.detect_pool(side, token, amount_in).await?;
        let minimum_out = calculate_minimum_out(quote.amount_out, settings.slippage_bps)?;
        tracing::info!(
            "Buying {symbol} with {} {} on {}: expected {}, minimum {}",
            format_units(amount_in, NATIVE_DECIMALS),
            self.network.native_symbol,
            quote.venue,
            format_units(quote.amount_out, decimals),
            format_units(minimum_out, decimals),
        );

        let receipt = self
            .submit_and_confirm(side, token, &quote, minimum_out, amount_in, settings)
            .await?;

        enter(Stage::Done, side, token);
        Ok(TradeResult {
            transaction_hash: receipt.transaction_hash,
            confirmed: true,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            venue: quote.venue,
            direction: side,
            amount_in,
            expected_out: quote.amount_out,
            minimum_out,
            output_amount: format_units(quote.amount_out, decimals),
            output_symbol: symbol.clone(),
            token_symbol: symbol,
            decimals,
        })
    }

    /// Sell `amount` of `token`: "1.5", raw base units ("1500000" or hex),
    /// or a share of the balance ("50%").
    pub async fn execute_sell(
        &self,
        token: Address,
        amount: &str,
        settings: TradeSettings,
    ) -> ServiceResult<TradeResult> {
        let amount: SellAmount = amount.parse()?;
        self.sell(token, &amount, settings).await
    }

    #[instrument(skip(self), fields(network = self.network.name), err)]
    async fn sell(
        &self,
        token: Address,
        amount: &SellAmount,
        settings: TradeSettings,
    ) -> ServiceResult<TradeResult> {
        let side = TradeDirection::Sell;
        enter(Stage::Init, side, token);
        settings.validate()?;

        let proxy = self.token(token);
        let (symbol, decimals) = proxy.metadata().await;
        let wallet = self.wallet_address();

        enter(Stage::BalanceCheck, side, token);
        let balance = proxy.balance_of(wallet).await?;
        let amount_in = amount.resolve(balance, decimals)?;
        if balance < amount_in {
            return Err(TradeError::InsufficientTokenBalance {
                symbol,
                have: format_units(balance, decimals),
                need: format_units(amount_in, decimals),
            });
        }

        enter(Stage::ApprovalCheck, side, token);
        let allowance = proxy.allowance(wallet, self.network.edge_router).await?;
        if allowance < amount_in {
            tracing::info!(
                "Allowance {allowance} below {amount_in}, approving edge router for {symbol}"
            );
            self.approve(&proxy, U256::MAX).await?;
        }

        enter(Stage::Quote, side, token);
        let quote = self.router.detect_pool(side, token, amount_in).await?;
        let minimum_out = calculate_minimum_out(quote.amount_out, settings.slippage_bps)?;
        tracing::info!(
            "Selling {} {symbol} on {}: expected {} {}, minimum {}",
            format_units(amount_in, decimals),
            quote.venue,
            format_units(quote.amount_out, NATIVE_DECIMALS),
            self.network.native_symbol,
            format_units(minimum_out, NATIVE_DECIMALS),
        );

        let receipt = self
            .submit_and_confirm(side, token, &quote, minimum_out, U256::ZERO, settings)
            .await?;

        enter(Stage::Done, side, token);
        Ok(TradeResult {
            transaction_hash: receipt.transaction_hash,
            confirmed: true,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            venue: quote.venue,
            direction: side,
            amount_in,
            expected_out: quote.amount_out,
            minimum_out,
            output_amount: format_units(quote.amount_out, NATIVE_DECIMALS),
            output_symbol: self.network.native_symbol.to_string(),
            token_symbol: symbol,
            decimals,
        })
    }

    async fn submit_and_confirm(
        &self,
        side: TradeDirection,
        token: Address,
        quote: &PoolQuote,
        minimum_out: U256,
        value: U256,
        settings: TradeSettings,
    ) -> ServiceResult<TxReceipt> {
        let fee = self
            .repository
            .get_fee_data()
            .await
            .map_err(read_failed("Reading fee data".to_string()))?;

        enter(Stage::Submit, side, token);
        let call = self.swap_call(side, quote, minimum_out, swap_deadline());
        let method = call.method_name();
        let options = TxOptions {
            value,
            gas_limit: settings.gas_limit,
            gas_price: Some(fee.gas_price),
        };

        let tx_hash = self
            .repository
            .submit_swap(self.network.edge_router, call, options)
            .await
            .map_err(|e| {
                tracing::error!("{method} for {token} failed to submit: {e}");
                TradeError::SubmissionFailed {
                    stage: format!("{side} via {method}"),
                    reason: e.to_string(),
                }
            })?;
        tracing::info!("Submitted {side} transaction {tx_hash}");

        enter(Stage::Confirm, side, token);
        self.confirm(tx_hash).await
    }

    fn swap_call(
        &self,
        side: TradeDirection,
        quote: &PoolQuote,
        minimum_out: U256,
        deadline: U256,
    ) -> SwapCall {
        let wallet = self.wallet_address();
        match (quote.venue, side) {
            (Venue::V2, TradeDirection::Buy) => SwapCall::V2ExactEthForTokens {
                router: self.network.v2_router,
                amount_out_min: minimum_out,
                path: quote.path.clone(),
                to: wallet,
                deadline,
            },
            (Venue::V2, TradeDirection::Sell) => SwapCall::V2ExactTokensForEth {
                router: self.network.v2_router,
                amount_in: quote.amount_in,
                amount_out_min: minimum_out,
                path: quote.path.clone(),
                to: wallet,
                deadline,
            },
            (Venue::V3 { fee_tier }, _) => SwapCall::V3ExactInputSingle {
                router: self.network.v3_router,
                params: ExactInputSingle {
                    token_in: quote.path[0],
                    token_out: quote.path[1],
                    fee: fee_tier,
                    recipient: wallet,
                    deadline,
                    amount_in: quote.amount_in,
                    amount_out_minimum: minimum_out,
                },
            },
        }
    }

    /// One receipt within the confirmation timeout, with status 1.
    async fn confirm(&self, tx_hash: TxHash) -> ServiceResult<TxReceipt> {
        match self
            .repository
            .wait_for_receipt(tx_hash, self.confirmation_timeout)
            .await
        {
            Ok(receipt) if receipt.success => {
                tracing::info!(
                    "Transaction {tx_hash} confirmed in block {:?}, gas used {}",
                    receipt.block_number,
                    receipt.gas_used
                );
                Ok(receipt)
            }
            Ok(_) => Err(TradeError::TransactionReverted {
                tx_hash: tx_hash.to_string(),
            }),
            Err(RepositoryError::Timeout { waited_secs, .. }) => {
                tracing::warn!("No receipt for {tx_hash} after {waited_secs}s");
                Err(TradeError::ConfirmationTimeout {
                    tx_hash: tx_hash.to_string(),
                    waited_secs,
                })
            }
            Err(e) => Err(read_failed(format!("Waiting for {tx_hash}"))(e)),
        }
    }

    /// Approve the edge router for `amount` and wait for the receipt.
    async fn approve(&self, proxy: &TokenContractProxy, amount: U256) -> ServiceResult<TxReceipt> {
        let token = proxy.address();
        let options = TxOptions {
            value: U256::ZERO,
            gas_limit: APPROVAL_GAS_LIMIT,
            gas_price: None,
        };

        enter(Stage::ApprovalSubmit, TradeDirection::Sell, token);
        let tx_hash = proxy
            .approve(self.network.edge_router, amount, options)
            .await
            .map_err(|e| TradeError::ApprovalFailed {
                tx_hash: None,
                reason: e.to_string(),
            })?;

        enter(Stage::ApprovalConfirm, TradeDirection::Sell, token);
        let receipt = self
            .repository
            .wait_for_receipt(tx_hash, self.confirmation_timeout)
            .await
            .map_err(|e| TradeError::ApprovalFailed {
                tx_hash: Some(tx_hash.to_string()),
                reason: e.to_string(),
            })?;

        if !receipt.success {
            return Err(TradeError::ApprovalFailed {
                tx_hash: Some(tx_hash.to_string()),
                reason: "approval transaction reverted".to_string(),
            });
        }

        tracing::info!("Approval {tx_hash} confirmed for {token}");
        Ok(receipt)
    }

    /// Submit `approve(edgeRouter, amount)`, `MAX_UINT256` when no amount is
    /// given, and wait for it.
    #[instrument(skip(self), err)]
    pub async fn approve_token(
        &self,
        token: Address,
        amount: Option<U256>,
    ) -> ServiceResult<TxReceipt> {
        self.approve(&self.token(token), amount.unwrap_or(U256::MAX)).await
    }

    #[instrument(skip(self), err)]
    pub async fn get_token_balance(&self, token: Address) -> ServiceResult<TokenBalance> {
        let proxy = self.token(token);
        let balance = proxy.balance_of(self.wallet_address()).await?;
        let (symbol, decimals) = proxy.metadata().await;

        Ok(TokenBalance {
            balance,
            formatted: format_units(balance, decimals),
            symbol,
            decimals,
        })
    }

    /// Whether the edge router may already spend `amount` (human-readable) of
    /// `token` for this wallet.
    #[instrument(skip(self), err)]
    pub async fn check_allowance(&self, token: Address, amount: &str) -> ServiceResult<bool> {
        let proxy = self.token(token);
        let amount = parse_units(amount, proxy.decimals().await)?;
        let allowance = proxy
            .allowance(self.wallet_address(), self.network.edge_router)
            .await?;
        Ok(allowance >= amount)
    }

    pub async fn get_token_info(&self, token: Address) -> ServiceResult<TokenInfo> {
        let proxy = self.token(token);
        let (name, symbol, decimals, total_supply) = tokio::join!(
            proxy.name(),
            proxy.symbol(),
            proxy.decimals(),
            proxy.total_supply()
        );

        Ok(TokenInfo {
            address: token,
            name,
            symbol,
            decimals,
            total_supply,
            formatted_supply: format_units(total_supply, decimals),
        })
    }

    /// Quote how many tokens `native_amount` (default "1") buys.
    #[instrument(skip(self), err)]
    pub async fn get_token_price(
        &self,
        token: Address,
        native_amount: Option<&str>,
    ) -> ServiceResult<TokenPrice> {
        let amount_in = parse_units(native_amount.unwrap_or("1"), NATIVE_DECIMALS)?;
        if amount_in.is_zero() {
            return Err(TradeError::InvalidInput(
                "Amount must be greater than zero".to_string(),
            ));
        }

        let quote = self
            .router
            .detect_pool(TradeDirection::Buy, token, amount_in)
            .await?;
        let decimals = self.token(token).decimals().await;

        let one_native = U256::from(10u64).pow(U256::from(NATIVE_DECIMALS));
        let per_native = quote.amount_out * one_native / amount_in;

        Ok(TokenPrice {
            venue: quote.venue,
            amount_in,
            amount_out: quote.amount_out,
            price: format_units(per_native, decimals),
        })
    }

    /// `eth_estimateGas` for the swap `execute_buy` would submit.
    #[instrument(skip(self), err)]
    pub async fn estimate_buy_gas(
        &self,
        token: Address,
        native_amount: &str,
        slippage_bps: u32,
    ) -> ServiceResult<GasEstimate> {
        let amount_in = parse_units(native_amount, NATIVE_DECIMALS)?;
        if amount_in.is_zero() {
            return Err(TradeError::InvalidInput(
                "Buy amount must be greater than zero".to_string(),
            ));
        }

        let quote = self
            .router
            .detect_pool(TradeDirection::Buy, token, amount_in)
            .await?;
        let minimum_out = calculate_minimum_out(quote.amount_out, slippage_bps)?;
        let call = self.swap_call(TradeDirection::Buy, &quote, minimum_out, swap_deadline());

        let gas = self
            .repository
            .estimate_swap_gas(self.network.edge_router, call, amount_in)
            .await
            .map_err(read_failed(format!("Estimating buy gas for {token}")))?;
        let fee = self
            .repository
            .get_fee_data()
            .await
            .map_err(read_failed("Reading fee data".to_string()))?;

        Ok(GasEstimate {
            gas,
            gas_price: fee.gas_price,
            cost: format_gas_cost(gas, fee.gas_price),
            native_symbol: self.network.native_symbol.to_string(),
        })
    }
}
