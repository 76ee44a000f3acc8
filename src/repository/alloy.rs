use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{
    Address, TxHash, U256,
    aliases::{U24, U160},
};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tracing::instrument;

use super::error::RepositoryError;
use crate::repository::contract::{IERC20, IEdgeRouter, IQuoterV2, IUniswapV2Router02};
use crate::repository::{
    ChainRepository, ExactInputSingle, FeeData, RepoResult, SwapCall, TxOptions, TxReceipt,
};

/// Delay between `eth_getTransactionReceipt` polls.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

pub struct AlloyChainRepository<P> {
    provider: Arc<P>,
    signer: Address,
}

impl<P: Provider + Clone + 'static> AlloyChainRepository<P> {
    /// Wraps a provider that already signs with the key behind `signer`.
    pub fn new(provider: Arc<P>, signer: Address) -> Self {
        Self { provider, signer }
    }
}

impl AlloyChainRepository<DynProvider> {
    /// Connects to `rpc_url` with a wallet-filling provider for `private_key`.
    ///
    /// The key may carry a `0x` prefix or not.
    pub fn connect(rpc_url: &str, private_key: &str) -> Result<Self, RepositoryError> {
        let key = normalize_private_key(private_key)?;
        let signer = PrivateKeySigner::from_str(&key)
            .map_err(|e| RepositoryError::ParseError(format!("Invalid private key: {e}")))?;
        let address = signer.address();

        let url = rpc_url
            .parse()
            .map_err(|e| RepositoryError::ParseError(format!("Invalid RPC URL: {e}")))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Self::new(Arc::new(provider), address))
    }
}

/// Strips whitespace and an optional `0x` prefix, then checks for 32 hex bytes.
pub fn normalize_private_key(raw: &str) -> Result<String, RepositoryError> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RepositoryError::ParseError(
            "Invalid private key: expected 32 bytes of hex".to_string(),
        ));
    }

    Ok(format!("0x{hex}"))
}

fn edge_call_request<P: Provider + Clone>(
    router: &IEdgeRouter::IEdgeRouterInstance<Arc<P>>,
    call: SwapCall,
) -> alloy::rpc::types::TransactionRequest {
    match call {
        SwapCall::V2ExactEthForTokens {
            router: venue,
            amount_out_min,
            path,
            to,
            deadline,
        } => router
            .swapExactETHForTokensSupportingFeeOnTransferTokens(
                venue,
                amount_out_min,
                path,
                to,
                deadline,
            )
            .into_transaction_request(),
        SwapCall::V2ExactTokensForEth {
            router: venue,
            amount_in,
            amount_out_min,
            path,
            to,
            deadline,
        } => router
            .swapExactTokensForETHSupportingFeeOnTransferTokens(
                venue,
                amount_in,
                amount_out_min,
                path,
                to,
                deadline,
            )
            .into_transaction_request(),
        SwapCall::V3ExactInputSingle {
            router: venue,
            params,
        } => router
            .exactInputSingle(venue, exact_input_single_params(params))
            .into_transaction_request(),
    }
}

fn exact_input_single_params(params: ExactInputSingle) -> IEdgeRouter::ExactInputSingleParams {
    IEdgeRouter::ExactInputSingleParams {
        tokenIn: params.token_in,
        tokenOut: params.token_out,
        fee: U24::from(params.fee),
        recipient: params.recipient,
        deadline: params.deadline,
        amountIn: params.amount_in,
        amountOutMinimum: params.amount_out_minimum,
        sqrtPriceLimitX96: U160::ZERO,
    }
}

fn apply_options(
    tx: alloy::rpc::types::TransactionRequest,
    from: Address,
    options: TxOptions,
) -> alloy::rpc::types::TransactionRequest {
    let mut tx = tx.from(from).value(options.value).gas_limit(options.gas_limit);
    if let Some(gas_price) = options.gas_price {
        tx = tx.gas_price(gas_price);
    }
    tx
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync + 'static> ChainRepository for AlloyChainRepository<P> {
    fn signer_address(&self) -> Address {
        self.signer
    }

    #[instrument(skip(self), err)]
    async fn get_native_balance(&self, owner: Address) -> RepoResult<U256> {
        self.provider.get_balance(owner).await.map_err(|e| {
            if e.to_string().contains("429") {
                tracing::warn!("Rate limited while getting native balance for {}", owner);
            }
            RepositoryError::RpcError(e.to_string())
        })
    }

    #[instrument(skip(self), err)]
    async fn get_fee_data(&self) -> RepoResult<FeeData> {
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| RepositoryError::RpcError(e.to_string()))?;

        Ok(FeeData { gas_price })
    }

    #[instrument(skip(self), err)]
    async fn erc20_balance_of(&self, token: Address, owner: Address) -> RepoResult<U256> {
        IERC20::new(token, self.provider.clone())
            .balanceOf(owner)
            .call()
            .await
            .map_err(RepositoryError::from_contract)
    }

    #[instrument(skip(self), err)]
    async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> RepoResult<U256> {
        IERC20::new(token, self.provider.clone())
            .allowance(owner, spender)
            .call()
            .await
            .map_err(RepositoryError::from_contract)
    }

    #[instrument(skip(self), err)]
    async fn erc20_decimals(&self, token: Address) -> RepoResult<u8> {
        IERC20::new(token, self.provider.clone())
            .decimals()
            .call()
            .await
            .map_err(RepositoryError::from_contract)
    }

    #[instrument(skip(self), err)]
    async fn erc20_symbol(&self, token: Address) -> RepoResult<String> {
        IERC20::new(token, self.provider.clone())
            .symbol()
            .call()
            .await
            .map_err(RepositoryError::from_contract)
    }

    #[instrument(skip(self), err)]
    async fn erc20_name(&self, token: Address) -> RepoResult<String> {
        IERC20::new(token, self.provider.clone())
            .name()
            .call()
            .await
            .map_err(RepositoryError::from_contract)
    }

    #[instrument(skip(self), err)]
    async fn erc20_total_supply(&self, token: Address) -> RepoResult<U256> {
        IERC20::new(token, self.provider.clone())
            .totalSupply()
            .call()
            .await
            .map_err(RepositoryError::from_contract)
    }

    #[instrument(skip(self), err)]
    async fn erc20_approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
        options: TxOptions,
    ) -> RepoResult<TxHash> {
        let contract = IERC20::new(token, self.provider.clone());
        let mut call = contract
            .approve(spender, amount)
            .from(self.signer)
            .gas(options.gas_limit);
        if let Some(gas_price) = options.gas_price {
            call = call.gas_price(gas_price);
        }

        let pending = call.send().await.map_err(|e| {
            tracing::error!("Failed to send approval on {} for {}: {}", token, spender, e);
            RepositoryError::from_contract(e)
        })?;

        Ok(*pending.tx_hash())
    }

    #[instrument(skip(self), err)]
    async fn v2_get_amounts_out(
        &self,
        router: Address,
        amount_in: U256,
        path: Vec<Address>,
    ) -> RepoResult<Vec<U256>> {
        tracing::debug!(
            "Getting swap amounts for path: {:?}, amount_in: {}",
            path,
            amount_in
        );

        let router = IUniswapV2Router02::new(router, self.provider.clone());

        let amounts = router
            .getAmountsOut(amount_in, path.clone())
            .call()
            .await
            .map_err(|e| {
                tracing::debug!("Failed to get amounts out for path {:?}: {}", path, e);
                RepositoryError::from_contract(e)
            })?;

        tracing::debug!("Swap amounts result: {:?}", amounts);
        Ok(amounts.to_vec())
    }

    #[instrument(skip(self), err)]
    async fn v3_quote_exact_input_single(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_in: U256,
    ) -> RepoResult<U256> {
        let quoter = IQuoterV2::new(quoter, self.provider.clone());

        let params = IQuoterV2::QuoteExactInputSingleParams {
            tokenIn: token_in,
            tokenOut: token_out,
            amountIn: amount_in,
            fee: U24::from(fee),
            sqrtPriceLimitX96: U160::ZERO,
        };

        let result = quoter
            .quoteExactInputSingle(params)
            .call()
            .await
            .map_err(|e| {
                tracing::debug!(
                    "Failed to get V3 quote for {} -> {} (fee: {}): {}",
                    token_in,
                    token_out,
                    fee,
                    e
                );
                RepositoryError::from_contract(e)
            })?;

        tracing::debug!(
            "V3 quote result - amountOut: {}, gasEstimate: {}",
            result.amountOut,
            result.gasEstimate
        );

        Ok(result.amountOut)
    }

    #[instrument(skip(self), err)]
    async fn submit_swap(
        &self,
        edge_router: Address,
        call: SwapCall,
        options: TxOptions,
    ) -> RepoResult<TxHash> {
        let method = call.method_name();
        let router = IEdgeRouter::new(edge_router, self.provider.clone());
        let tx = apply_options(edge_call_request(&router, call), self.signer, options);

        let pending = self.provider.send_transaction(tx).await.map_err(|e| {
            tracing::error!("Failed to send {} through edge router: {}", method, e);
            RepositoryError::RpcError(e.to_string())
        })?;

        Ok(*pending.tx_hash())
    }

    #[instrument(skip(self), err)]
    async fn estimate_swap_gas(
        &self,
        edge_router: Address,
        call: SwapCall,
        value: U256,
    ) -> RepoResult<u64> {
        let router = IEdgeRouter::new(edge_router, self.provider.clone());
        let tx = edge_call_request(&router, call)
            .from(self.signer)
            .value(value);

        self.provider.estimate_gas(tx).await.map_err(|e| {
            RepositoryError::ContractError(format!("Failed to estimate swap gas: {e}"))
        })
    }

    #[instrument(skip(self), err)]
    async fn wait_for_receipt(&self, tx_hash: TxHash, timeout: Duration) -> RepoResult<TxReceipt> {
        let poll = async {
            loop {
                match self.provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => {
                        // keep polling until the deadline
                        tracing::warn!("Receipt lookup for {} failed, retrying: {}", tx_hash, e);
                    }
                }
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
            }
        };

        let receipt = tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| RepositoryError::Timeout {
                what: format!("receipt of {tx_hash}"),
                waited_secs: timeout.as_secs(),
            })?;

        Ok(TxReceipt {
            transaction_hash: receipt.transaction_hash,
            success: receipt.status(),
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }
}
