pub mod alloy;
pub mod contract;
pub mod error;

use std::time::Duration;

use ::alloy::primitives::{Address, TxHash, U256};
pub use self::alloy::AlloyChainRepository;
use async_trait::async_trait;
pub use error::RepositoryError;

pub(crate) type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// Gas pricing returned by `eth_gasPrice`, sent as a legacy `gasPrice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeData {
    pub gas_price: u128,
}

/// Per-transaction overrides applied to every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOptions {
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: Option<u128>,
}

/// A mined transaction, reduced to what the trade path needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// Arguments of a V3 single-hop swap as forwarded by the edge router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactInputSingle {
    pub token_in: Address,
    pub token_out: Address,
    pub fee: u32,
    pub recipient: Address,
    pub deadline: U256,
    pub amount_in: U256,
    pub amount_out_minimum: U256,
}

/// One of the three edge router entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapCall {
    /// `swapExactETHForTokensSupportingFeeOnTransferTokens`, native value attached.
    V2ExactEthForTokens {
        router: Address,
        amount_out_min: U256,
        path: Vec<Address>,
        to: Address,
        deadline: U256,
    },
    /// `swapExactTokensForETHSupportingFeeOnTransferTokens`.
    V2ExactTokensForEth {
        router: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: Vec<Address>,
        to: Address,
        deadline: U256,
    },
    /// `exactInputSingle`.
    V3ExactInputSingle {
        router: Address,
        params: ExactInputSingle,
    },
}

impl SwapCall {
    pub fn method_name(&self) -> &'static str {
        match self {
            SwapCall::V2ExactEthForTokens { .. } => {
                "swapExactETHForTokensSupportingFeeOnTransferTokens"
            }
            SwapCall::V2ExactTokensForEth { .. } => {
                "swapExactTokensForETHSupportingFeeOnTransferTokens"
            }
            SwapCall::V3ExactInputSingle { .. } => "exactInputSingle",
        }
    }

    pub fn amount_out_min(&self) -> U256 {
        match self {
            SwapCall::V2ExactEthForTokens { amount_out_min, .. }
            | SwapCall::V2ExactTokensForEth { amount_out_min, .. } => *amount_out_min,
            SwapCall::V3ExactInputSingle { params, .. } => params.amount_out_minimum,
        }
    }
}

/// Chain access for a single network and a single signing key.
///
/// Implementations talk JSON-RPC and translate provider failures into
/// `RepositoryError`. Every call hits the chain: nothing is cached, so each
/// balance or allowance check observes current state.
#[async_trait]
pub trait ChainRepository: Send + Sync {
    /// Address of the key that signs every write issued through this repository.
    fn signer_address(&self) -> Address;

    /// Native currency balance (wei) of `owner`.
    async fn get_native_balance(&self, owner: Address) -> RepoResult<U256>;

    /// Current gas pricing.
    async fn get_fee_data(&self) -> RepoResult<FeeData>;

    /// `balanceOf(owner)` on `token`.
    async fn erc20_balance_of(&self, token: Address, owner: Address) -> RepoResult<U256>;

    /// `allowance(owner, spender)` on `token`.
    async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> RepoResult<U256>;

    async fn erc20_decimals(&self, token: Address) -> RepoResult<u8>;

    async fn erc20_symbol(&self, token: Address) -> RepoResult<String>;

    async fn erc20_name(&self, token: Address) -> RepoResult<String>;

    async fn erc20_total_supply(&self, token: Address) -> RepoResult<U256>;

    /// Broadcasts `approve(spender, amount)` and returns the transaction hash
    /// without waiting for it to be mined.
    async fn erc20_approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
        options: TxOptions,
    ) -> RepoResult<TxHash>;

    /// `getAmountsOut(amount_in, path)` on a V2 router.
    async fn v2_get_amounts_out(
        &self,
        router: Address,
        amount_in: U256,
        path: Vec<Address>,
    ) -> RepoResult<Vec<U256>>;

    /// `quoteExactInputSingle` on a V3 quoter with `sqrtPriceLimitX96 = 0`.
    async fn v3_quote_exact_input_single(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_in: U256,
    ) -> RepoResult<U256>;

    /// Broadcasts a swap through the edge router and returns the transaction hash.
    async fn submit_swap(
        &self,
        edge_router: Address,
        call: SwapCall,
        options: TxOptions,
    ) -> RepoResult<TxHash>;

    /// `eth_estimateGas` for a swap through the edge router.
    async fn estimate_swap_gas(
        &self,
        edge_router: Address,
        call: SwapCall,
        value: U256,
    ) -> RepoResult<u64>;

    /// Waits until one receipt for `tx_hash` is observed or `timeout` elapses.
    async fn wait_for_receipt(&self, tx_hash: TxHash, timeout: Duration) -> RepoResult<TxReceipt>;
}
