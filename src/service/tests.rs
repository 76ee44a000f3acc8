use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, B256, TxHash, U256, address};
use async_trait::async_trait;
use rmcp::handler::server::wrapper::Parameters;
use tokio::time::sleep;

use crate::config::Config;
use crate::network::NetworkConfig;
use crate::repository::{
    ChainRepository, FeeData, RepositoryError, SwapCall, TxOptions, TxReceipt,
};
use crate::service::executor::{APPROVAL_GAS_LIMIT, TradeExecutor};
use crate::service::trading::TradeBotService;
use crate::service::types::{
    ExecuteBuyRequest, TokenRequest, ToolResult, TradeDirection, TradeIntent, TradeSettings, Venue,
};
use crate::service::{ErrorKind, PoolRouter, TradeError};

const WALLET: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
const TOKEN: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");
const APPROVE_TX: TxHash = B256::repeat_byte(0xaa);
const SWAP_TX: TxHash = B256::repeat_byte(0xbb);
const GAS_PRICE: u128 = 20_000_000_000;

// Anvil's first dev account; only used to sign read-only calls in live tests.
const DEV_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn units(amount: u64, decimals: u8) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(decimals))
}

fn eth(milli: u64) -> U256 {
    U256::from(milli) * units(1, 15)
}

fn network() -> NetworkConfig {
    NetworkConfig::ethereum("http://localhost:8545")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReceiptOutcome {
    Success,
    Reverted,
    Timeout,
}

/// Chain call as observed by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    NativeBalance,
    FeeData,
    BalanceOf,
    Allowance,
    Symbol,
    Decimals,
    Name,
    TotalSupply,
    Approve { amount: U256, options: TxOptions },
    V2Quote { path: Vec<Address> },
    V3Quote { fee: u32 },
    Submit { call: SwapCall, options: TxOptions },
    EstimateGas { value: U256 },
    WaitForReceipt(TxHash),
}

/// In-memory chain that records every call in order.
struct FakeChain {
    native_balance: U256,
    token_balance: U256,
    allowance: U256,
    symbol: Option<&'static str>,
    decimals: Option<u8>,
    /// Fee tiers missing here revert like an uninitialized pool.
    v3_quotes: HashMap<u32, U256>,
    v2_quote: Result<Vec<U256>, RepositoryError>,
    approve_fails: bool,
    approval_receipt: ReceiptOutcome,
    swap_receipt: ReceiptOutcome,
    calls: Mutex<Vec<Call>>,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self {
            native_balance: U256::ZERO,
            token_balance: U256::ZERO,
            allowance: U256::ZERO,
            symbol: Some("TKN"),
            decimals: Some(18),
            v3_quotes: HashMap::new(),
            v2_quote: Err(RepositoryError::ContractError(
                "execution reverted: UniswapV2Library: INSUFFICIENT_LIQUIDITY".to_string(),
            )),
            approve_fails: false,
            approval_receipt: ReceiptOutcome::Success,
            swap_receipt: ReceiptOutcome::Success,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeChain {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn submitted(&self) -> Vec<(SwapCall, TxOptions)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Submit { call, options } => Some((call, options)),
                _ => None,
            })
            .collect()
    }

    fn quoted(&self) -> bool {
        self.calls()
            .iter()
            .any(|call| matches!(call, Call::V2Quote { .. } | Call::V3Quote { .. }))
    }
}

#[async_trait]
impl ChainRepository for FakeChain {
    fn signer_address(&self) -> Address {
        WALLET
    }

    async fn get_native_balance(&self, _owner: Address) -> Result<U256, RepositoryError> {
        self.record(Call::NativeBalance);
        Ok(self.native_balance)
    }

    async fn get_fee_data(&self) -> Result<FeeData, RepositoryError> {
        self.record(Call::FeeData);
        Ok(FeeData {
            gas_price: GAS_PRICE,
        })
    }

    async fn erc20_balance_of(
        &self,
        _token: Address,
        _owner: Address,
    ) -> Result<U256, RepositoryError> {
        self.record(Call::BalanceOf);
        Ok(self.token_balance)
    }

    async fn erc20_allowance(
        &self,
        _token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, RepositoryError> {
        self.record(Call::Allowance);
        Ok(self.allowance)
    }

    async fn erc20_decimals(&self, _token: Address) -> Result<u8, RepositoryError> {
        self.record(Call::Decimals);
        self.decimals
            .ok_or_else(|| RepositoryError::ContractError("decimals() reverted".to_string()))
    }

    async fn erc20_symbol(&self, _token: Address) -> Result<String, RepositoryError> {
        self.record(Call::Symbol);
        self.symbol
            .map(str::to_string)
            .ok_or_else(|| RepositoryError::ContractError("symbol() reverted".to_string()))
    }

    async fn erc20_name(&self, _token: Address) -> Result<String, RepositoryError> {
        self.record(Call::Name);
        Err(RepositoryError::ContractError("name() reverted".to_string()))
    }

    async fn erc20_total_supply(&self, _token: Address) -> Result<U256, RepositoryError> {
        self.record(Call::TotalSupply);
        Ok(units(1_000_000, 18))
    }

    async fn erc20_approve(
        &self,
        _token: Address,
        _spender: Address,
        amount: U256,
        options: TxOptions,
    ) -> Result<TxHash, RepositoryError> {
        self.record(Call::Approve { amount, options });
        if self.approve_fails {
            return Err(RepositoryError::RpcError("insufficient funds for gas".to_string()));
        }
        Ok(APPROVE_TX)
    }

    async fn v2_get_amounts_out(
        &self,
        _router: Address,
        _amount_in: U256,
        path: Vec<Address>,
    ) -> Result<Vec<U256>, RepositoryError> {
        self.record(Call::V2Quote { path });
        self.v2_quote.clone()
    }

    async fn v3_quote_exact_input_single(
        &self,
        _quoter: Address,
        _token_in: Address,
        _token_out: Address,
        fee: u32,
        _amount_in: U256,
    ) -> Result<U256, RepositoryError> {
        self.record(Call::V3Quote { fee });
        self.v3_quotes
            .get(&fee)
            .copied()
            .ok_or_else(|| RepositoryError::ContractError("execution reverted".to_string()))
    }

    async fn submit_swap(
        &self,
        _edge_router: Address,
        call: SwapCall,
        options: TxOptions,
    ) -> Result<TxHash, RepositoryError> {
        self.record(Call::Submit { call, options });
        Ok(SWAP_TX)
    }

    async fn estimate_swap_gas(
        &self,
        _edge_router: Address,
        _call: SwapCall,
        value: U256,
    ) -> Result<u64, RepositoryError> {
        self.record(Call::EstimateGas { value });
        Ok(180_000)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<TxReceipt, RepositoryError> {
        self.record(Call::WaitForReceipt(tx_hash));
        let outcome = if tx_hash == APPROVE_TX {
            self.approval_receipt
        } else {
            self.swap_receipt
        };

        match outcome {
            ReceiptOutcome::Timeout => Err(RepositoryError::Timeout {
                what: format!("receipt of {tx_hash}"),
                waited_secs: timeout.as_secs(),
            }),
            outcome => Ok(TxReceipt {
                transaction_hash: tx_hash,
                success: outcome == ReceiptOutcome::Success,
                block_number: Some(19_000_000),
                gas_used: 150_000,
            }),
        }
    }
}

fn executor(chain: FakeChain) -> (TradeExecutor, Arc<FakeChain>) {
    let chain = Arc::new(chain);
    let executor =
        TradeExecutor::with_repository(chain.clone(), network(), Duration::from_secs(180));
    (executor, chain)
}

fn settings(slippage_bps: u32) -> TradeSettings {
    TradeSettings::new(slippage_bps, 300_000).unwrap()
}

// Pool routing

#[tokio::test]
async fn test_detect_pool_scans_tiers_in_order() {
    let chain = Arc::new(FakeChain {
        v3_quotes: HashMap::from([(10000, units(5, 18))]),
        v2_quote: Ok(vec![eth(100), units(9, 18)]),
        ..Default::default()
    });
    let router = PoolRouter::new(chain.clone(), network());

    let quote = router
        .detect_pool(TradeDirection::Buy, TOKEN, eth(100))
        .await
        .unwrap();

    assert_eq!(quote.venue, Venue::V3 { fee_tier: 10000 });
    assert_eq!(quote.amount_out, units(5, 18));
    assert_eq!(quote.path, vec![network().v3_weth, TOKEN]);
    assert_eq!(
        chain.calls(),
        vec![
            Call::V3Quote { fee: 100 },
            Call::V3Quote { fee: 500 },
            Call::V3Quote { fee: 3000 },
            Call::V3Quote { fee: 10000 },
        ]
    );
}

#[tokio::test]
async fn test_detect_pool_takes_first_match_not_best() {
    let chain = Arc::new(FakeChain {
        v3_quotes: HashMap::from([(500, units(1, 18)), (3000, units(2, 18))]),
        ..Default::default()
    });
    let router = PoolRouter::new(chain, network());

    let quote = router
        .detect_pool(TradeDirection::Buy, TOKEN, eth(100))
        .await
        .unwrap();
    assert_eq!(quote.venue, Venue::V3 { fee_tier: 500 });
}

#[tokio::test]
async fn test_detect_pool_falls_back_to_v2() {
    let chain = Arc::new(FakeChain {
        v3_quotes: HashMap::from([(3000, U256::ZERO)]),
        v2_quote: Ok(vec![units(100, 18), eth(250)]),
        ..Default::default()
    });
    let router = PoolRouter::new(chain.clone(), network());

    let quote = router
        .detect_pool(TradeDirection::Sell, TOKEN, units(100, 18))
        .await
        .unwrap();

    assert_eq!(quote.venue, Venue::V2);
    assert_eq!(quote.amount_out, eth(250));
    assert_eq!(quote.path, vec![TOKEN, network().v2_weth]);
    assert_eq!(
        chain.calls().last(),
        Some(&Call::V2Quote {
            path: vec![TOKEN, network().v2_weth]
        })
    );
}

#[tokio::test]
async fn test_detect_pool_without_liquidity_fails() {
    let (executor, chain) = executor(FakeChain {
        native_balance: eth(1000),
        ..Default::default()
    });

    let err = executor
        .execute_buy(TOKEN, "0.1", settings(500))
        .await
        .unwrap_err();

    assert!(matches!(err, TradeError::NoViablePool { .. }), "{err}");
    assert_eq!(err.kind(), ErrorKind::NoLiquidity);
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_detect_pool_rejects_short_v2_amounts() {
    let chain = Arc::new(FakeChain {
        v2_quote: Ok(vec![eth(100)]),
        ..Default::default()
    });
    let router = PoolRouter::new(chain, network());

    let err = router
        .detect_pool(TradeDirection::Buy, TOKEN, eth(100))
        .await
        .unwrap_err();

    match err {
        TradeError::NoViablePool { reason, .. } => {
            assert_eq!(reason, "Invalid amounts returned from router")
        }
        other => panic!("Expected NoViablePool, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_detect_pool_propagates_v2_transport_failure() {
    let chain = Arc::new(FakeChain {
        v2_quote: Err(RepositoryError::RpcError("connection reset".to_string())),
        ..Default::default()
    });
    let router = PoolRouter::new(chain, network());

    let err = router
        .detect_pool(TradeDirection::Buy, TOKEN, eth(100))
        .await
        .unwrap_err();

    assert!(matches!(err, TradeError::BlockchainError(_)), "{err}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_quotes_are_idempotent() {
    let chain = Arc::new(FakeChain {
        v3_quotes: HashMap::from([(3000, units(42, 18))]),
        ..Default::default()
    });
    let router = PoolRouter::new(chain.clone(), network());

    let first = router
        .detect_pool(TradeDirection::Buy, TOKEN, eth(100))
        .await
        .unwrap();
    let second = router
        .detect_pool(TradeDirection::Buy, TOKEN, eth(100))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert!(
        !chain
            .calls()
            .iter()
            .any(|call| matches!(call, Call::Submit { .. } | Call::Approve { .. }))
    );
}

// Buy

#[tokio::test]
async fn test_execute_buy_should_work() {
    let (executor, chain) = executor(FakeChain {
        native_balance: eth(500),
        v3_quotes: HashMap::from([(3000, units(1, 18))]),
        ..Default::default()
    });

    let result = executor
        .execute_buy(TOKEN, "0.1", settings(1000))
        .await
        .unwrap();

    assert_eq!(result.transaction_hash, SWAP_TX);
    assert!(result.confirmed);
    assert_eq!(result.venue, Venue::V3 { fee_tier: 3000 });
    assert_eq!(result.direction, TradeDirection::Buy);
    assert_eq!(result.amount_in, eth(100));
    assert_eq!(result.expected_out, units(1, 18));
    assert_eq!(result.minimum_out, eth(900));
    assert_eq!(result.output_amount, "1");
    assert_eq!(result.output_symbol, "TKN");
    assert_eq!(result.block_number, Some(19_000_000));

    let fee_reads = chain
        .calls()
        .iter()
        .filter(|call| matches!(call, Call::FeeData))
        .count();
    assert_eq!(fee_reads, 1);

    let submitted = chain.submitted();
    assert_eq!(submitted.len(), 1);
    let (call, options) = &submitted[0];
    assert_eq!(options.value, eth(100));
    assert_eq!(options.gas_limit, 300_000);
    assert_eq!(options.gas_price, Some(GAS_PRICE));
    assert_eq!(call.method_name(), "exactInputSingle");
    assert_eq!(call.amount_out_min(), eth(900));
    match call {
        SwapCall::V3ExactInputSingle { router, params } => {
            assert_eq!(*router, network().v3_router);
            assert_eq!(params.token_in, network().v3_weth);
            assert_eq!(params.token_out, TOKEN);
            assert_eq!(params.fee, 3000);
            assert_eq!(params.recipient, WALLET);
            assert_eq!(params.amount_in, eth(100));
            assert_eq!(params.amount_out_minimum, eth(900));
        }
        other => panic!("Expected exactInputSingle, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_execute_buy_via_v2_attaches_value() {
    let (executor, chain) = executor(FakeChain {
        native_balance: eth(500),
        v2_quote: Ok(vec![eth(100), units(1000, 18)]),
        ..Default::default()
    });

    let result = executor
        .execute_buy(TOKEN, "0.1", settings(0))
        .await
        .unwrap();
    assert_eq!(result.venue, Venue::V2);
    assert_eq!(result.minimum_out, units(1000, 18));

    let (call, options) = chain.submitted().remove(0);
    assert_eq!(options.value, eth(100));
    match call {
        SwapCall::V2ExactEthForTokens {
            router,
            amount_out_min,
            path,
            to,
            ..
        } => {
            assert_eq!(router, network().v2_router);
            assert_eq!(amount_out_min, units(1000, 18));
            assert_eq!(path, vec![network().v2_weth, TOKEN]);
            assert_eq!(to, WALLET);
        }
        other => panic!("Expected swapExactETHForTokens, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_execute_buy_with_insufficient_balance_should_fail() {
    let (executor, chain) = executor(FakeChain {
        native_balance: eth(10),
        v3_quotes: HashMap::from([(3000, units(1, 18))]),
        ..Default::default()
    });

    let err = executor
        .execute_buy(TOKEN, "1", settings(500))
        .await
        .unwrap_err();

    match &err {
        TradeError::InsufficientBalance { symbol, have, need } => {
            assert_eq!(symbol, "ETH");
            assert_eq!(have, "0.01");
            assert_eq!(need, "1");
        }
        other => panic!("Expected InsufficientBalance, got: {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert!(!chain.quoted());
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_execute_buy_rejects_bad_input_before_touching_chain() {
    for (amount, settings) in [
        ("abc", settings(500)),
        ("0", settings(500)),
        ("-1", settings(500)),
        (
            "0.1",
            TradeSettings {
                slippage_bps: 10_001,
                gas_limit: 300_000,
            },
        ),
        (
            "0.1",
            TradeSettings {
                slippage_bps: 500,
                gas_limit: 20_000,
            },
        ),
    ] {
        let (executor, chain) = executor(FakeChain {
            native_balance: eth(500),
            ..Default::default()
        });
        let err = executor
            .execute_buy(TOKEN, amount, settings)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input, "{amount}: {err}");
        assert!(chain.calls().is_empty(), "{amount}: {:?}", chain.calls());
    }
}

#[tokio::test]
async fn test_execute_buy_reverted_should_fail() {
    let (executor, _chain) = executor(FakeChain {
        native_balance: eth(500),
        v3_quotes: HashMap::from([(500, units(1, 18))]),
        swap_receipt: ReceiptOutcome::Reverted,
        ..Default::default()
    });

    let err = executor
        .execute_buy(TOKEN, "0.1", settings(500))
        .await
        .unwrap_err();

    match &err {
        TradeError::TransactionReverted { tx_hash } => assert_eq!(tx_hash, &SWAP_TX.to_string()),
        other => panic!("Expected TransactionReverted, got: {other:?}"),
    }
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_execute_buy_confirmation_timeout_is_not_resubmitted() {
    let (executor, chain) = executor(FakeChain {
        native_balance: eth(500),
        v3_quotes: HashMap::from([(500, units(1, 18))]),
        swap_receipt: ReceiptOutcome::Timeout,
        ..Default::default()
    });

    let err = executor
        .execute_buy(TOKEN, "0.1", settings(500))
        .await
        .unwrap_err();

    assert!(
        matches!(err, TradeError::ConfirmationTimeout { waited_secs: 180, .. }),
        "{err}"
    );
    assert_eq!(chain.submitted().len(), 1);
}

#[tokio::test]
async fn test_execute_buy_unprotected_minimum_should_fail() {
    let (executor, chain) = executor(FakeChain {
        native_balance: eth(500),
        v3_quotes: HashMap::from([(100, U256::from(1u64))]),
        ..Default::default()
    });

    let err = executor
        .execute_buy(TOKEN, "0.1", settings(500))
        .await
        .unwrap_err();

    assert!(matches!(err, TradeError::InvalidMinimumAmount { .. }), "{err}");
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_metadata_falls_back_to_defaults() {
    let (executor, _chain) = executor(FakeChain {
        native_balance: eth(500),
        symbol: None,
        decimals: None,
        v3_quotes: HashMap::from([(3000, units(3, 18))]),
        ..Default::default()
    });

    let result = executor
        .execute_buy(TOKEN, "0.1", settings(500))
        .await
        .unwrap();

    assert_eq!(result.token_symbol, "UNKNOWN");
    assert_eq!(result.decimals, 18);
    assert_eq!(result.output_amount, "3");
}

// Sell

#[tokio::test]
async fn test_execute_sell_percentage_approves_first() {
    let (executor, chain) = executor(FakeChain {
        token_balance: units(200, 18),
        allowance: U256::ZERO,
        v2_quote: Ok(vec![units(100, 18), eth(250)]),
        ..Default::default()
    });

    let result = executor
        .execute_sell(TOKEN, "50%", settings(500))
        .await
        .unwrap();

    assert_eq!(result.amount_in, units(100, 18));
    assert_eq!(result.output_symbol, "ETH");
    assert_eq!(result.output_amount, "0.25");

    let sequence: Vec<&str> = chain
        .calls()
        .iter()
        .filter_map(|call| match call {
            Call::Allowance => Some("allowance"),
            Call::Approve { .. } => Some("approve"),
            Call::WaitForReceipt(hash) if *hash == APPROVE_TX => Some("wait-approval"),
            Call::V2Quote { .. } | Call::V3Quote { .. } => Some("quote"),
            Call::Submit { .. } => Some("submit"),
            _ => None,
        })
        .collect();
    assert_eq!(sequence.first(), Some(&"allowance"));
    assert_eq!(sequence[1..3], ["approve", "wait-approval"]);
    assert_eq!(sequence.last(), Some(&"submit"));
    let first_quote = sequence.iter().position(|step| *step == "quote").unwrap();
    assert!(first_quote > 2);

    let approval = chain
        .calls()
        .into_iter()
        .find_map(|call| match call {
            Call::Approve { amount, options } => Some((amount, options)),
            _ => None,
        })
        .unwrap();
    assert_eq!(approval.0, U256::MAX);
    assert_eq!(approval.1.gas_limit, APPROVAL_GAS_LIMIT);

    let (call, options) = chain.submitted().remove(0);
    assert_eq!(options.value, U256::ZERO);
    match call {
        SwapCall::V2ExactTokensForEth {
            router,
            amount_in,
            amount_out_min,
            path,
            to,
            ..
        } => {
            assert_eq!(router, network().v2_router);
            assert_eq!(amount_in, units(100, 18));
            assert_eq!(amount_out_min, eth(250) * U256::from(9500u32) / U256::from(10000u32));
            assert_eq!(path, vec![TOKEN, network().v2_weth]);
            assert_eq!(to, WALLET);
        }
        other => panic!("Expected swapExactTokensForETH, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_execute_sell_with_allowance_skips_approval() {
    let (executor, chain) = executor(FakeChain {
        token_balance: units(200, 18),
        allowance: U256::MAX,
        v3_quotes: HashMap::from([(10000, eth(300))]),
        ..Default::default()
    });

    let result = executor
        .execute_sell(TOKEN, "1.5", settings(500))
        .await
        .unwrap();

    assert_eq!(result.amount_in, units(15, 17));
    assert!(!chain.calls().iter().any(|call| matches!(call, Call::Approve { .. })));
    match chain.submitted().remove(0).0 {
        SwapCall::V3ExactInputSingle { params, .. } => {
            assert_eq!(params.token_in, TOKEN);
            assert_eq!(params.token_out, network().v3_weth);
            assert_eq!(params.fee, 10000);
        }
        other => panic!("Expected exactInputSingle, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_execute_sell_raw_units() {
    let (executor, _chain) = executor(FakeChain {
        token_balance: U256::from(2_000_000u64),
        allowance: U256::MAX,
        decimals: Some(6),
        v3_quotes: HashMap::from([(500, eth(1))]),
        ..Default::default()
    });

    let result = executor
        .execute_sell(TOKEN, "1500000", settings(500))
        .await
        .unwrap();
    assert_eq!(result.amount_in, U256::from(1_500_000u64));
}

#[tokio::test]
async fn test_execute_sell_with_insufficient_tokens_should_fail() {
    let (executor, chain) = executor(FakeChain {
        token_balance: units(1, 18),
        allowance: U256::MAX,
        v3_quotes: HashMap::from([(500, eth(1))]),
        ..Default::default()
    });

    let err = executor
        .execute_sell(TOKEN, "2.0", settings(500))
        .await
        .unwrap_err();

    match &err {
        TradeError::InsufficientTokenBalance { symbol, have, need } => {
            assert_eq!(symbol, "TKN");
            assert_eq!(have, "1");
            assert_eq!(need, "2");
        }
        other => panic!("Expected InsufficientTokenBalance, got: {other:?}"),
    }
    assert!(!chain.quoted());
}

#[tokio::test]
async fn test_execute_sell_failed_approval_never_submits() {
    let (executor, chain) = executor(FakeChain {
        token_balance: units(200, 18),
        v3_quotes: HashMap::from([(3000, eth(100))]),
        approval_receipt: ReceiptOutcome::Reverted,
        ..Default::default()
    });

    let err = executor
        .execute_sell(TOKEN, "100%", settings(500))
        .await
        .unwrap_err();

    match &err {
        TradeError::ApprovalFailed { tx_hash, .. } => {
            assert_eq!(tx_hash.as_deref(), Some(APPROVE_TX.to_string().as_str()))
        }
        other => panic!("Expected ApprovalFailed, got: {other:?}"),
    }
    assert!(chain.submitted().is_empty());
    assert!(!chain.quoted());
}

#[tokio::test]
async fn test_execute_sell_unconfirmed_approval_never_submits() {
    let (executor, chain) = executor(FakeChain {
        token_balance: units(200, 18),
        v3_quotes: HashMap::from([(3000, eth(100))]),
        approval_receipt: ReceiptOutcome::Timeout,
        ..Default::default()
    });

    let err = executor
        .execute_sell(TOKEN, "50%", settings(500))
        .await
        .unwrap_err();

    match &err {
        TradeError::ApprovalFailed { tx_hash, reason } => {
            assert_eq!(tx_hash.as_deref(), Some(APPROVE_TX.to_string().as_str()));
            assert!(reason.contains("180s"), "{reason}");
        }
        other => panic!("Expected ApprovalFailed, got: {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Approval);
    assert!(!chain.quoted());
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_execute_sell_unsent_approval_never_submits() {
    let (executor, chain) = executor(FakeChain {
        token_balance: units(200, 18),
        v3_quotes: HashMap::from([(3000, eth(100))]),
        approve_fails: true,
        ..Default::default()
    });

    let err = executor
        .execute_sell(TOKEN, "10", settings(500))
        .await
        .unwrap_err();

    assert!(matches!(err, TradeError::ApprovalFailed { tx_hash: None, .. }), "{err}");
    assert_eq!(err.kind(), ErrorKind::Approval);
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_execute_dispatches_intent() {
    let (executor, chain) = executor(FakeChain {
        native_balance: eth(500),
        token_balance: units(200, 18),
        allowance: U256::MAX,
        v3_quotes: HashMap::from([(3000, units(1, 18))]),
        ..Default::default()
    });

    let buy = TradeIntent::buy(TOKEN, "0.1", settings(500));
    assert_eq!(
        executor.execute(&buy).await.unwrap().direction,
        TradeDirection::Buy
    );

    let sell = TradeIntent::sell(TOKEN, "25%", settings(500)).unwrap();
    let result = executor.execute(&sell).await.unwrap();
    assert_eq!(result.direction, TradeDirection::Sell);
    assert_eq!(result.amount_in, units(50, 18));
    assert_eq!(chain.submitted().len(), 2);
}

// Queries

#[tokio::test]
async fn test_get_token_balance_should_work() {
    let (executor, _chain) = executor(FakeChain {
        token_balance: U256::from(100_500_000u64),
        decimals: Some(6),
        symbol: Some("USDT"),
        ..Default::default()
    });

    let balance = executor.get_token_balance(TOKEN).await.unwrap();
    assert_eq!(balance.formatted, "100.5");
    assert_eq!(balance.symbol, "USDT");
    assert_eq!(balance.decimals, 6);
}

#[tokio::test]
async fn test_check_allowance_should_work() {
    let (executor, _chain) = executor(FakeChain {
        allowance: units(10, 18),
        ..Default::default()
    });

    assert!(executor.check_allowance(TOKEN, "10").await.unwrap());
    assert!(!executor.check_allowance(TOKEN, "10.5").await.unwrap());
}

#[tokio::test]
async fn test_approve_token_defaults_to_max() {
    let (executor, chain) = executor(FakeChain::default());

    let receipt = executor.approve_token(TOKEN, None).await.unwrap();
    assert_eq!(receipt.transaction_hash, APPROVE_TX);
    assert!(chain.calls().contains(&Call::Approve {
        amount: U256::MAX,
        options: TxOptions {
            value: U256::ZERO,
            gas_limit: APPROVAL_GAS_LIMIT,
            gas_price: None,
        },
    }));
}

#[tokio::test]
async fn test_get_token_info_is_best_effort() {
    let (executor, _chain) = executor(FakeChain::default());

    let info = executor.get_token_info(TOKEN).await.unwrap();
    assert_eq!(info.name, "UNKNOWN");
    assert_eq!(info.symbol, "TKN");
    assert_eq!(info.formatted_supply, "1000000");
}

#[tokio::test]
async fn test_get_token_price_should_work() {
    let (executor, _chain) = executor(FakeChain {
        decimals: Some(6),
        v3_quotes: HashMap::from([(500, U256::from(1_000_000_000u64))]),
        ..Default::default()
    });

    let price = executor.get_token_price(TOKEN, Some("0.5")).await.unwrap();
    assert_eq!(price.venue, Venue::V3 { fee_tier: 500 });
    assert_eq!(price.amount_in, eth(500));
    assert_eq!(price.price, "2000");
}

#[tokio::test]
async fn test_estimate_buy_gas_should_work() {
    let (executor, chain) = executor(FakeChain {
        v3_quotes: HashMap::from([(3000, units(1, 18))]),
        ..Default::default()
    });

    let estimate = executor
        .estimate_buy_gas(TOKEN, "0.1", 500)
        .await
        .unwrap();

    assert_eq!(estimate.gas, 180_000);
    assert_eq!(estimate.gas_price, GAS_PRICE);
    assert_eq!(estimate.cost, "0.0036");
    assert_eq!(estimate.native_symbol, "ETH");
    assert!(chain.calls().contains(&Call::EstimateGas { value: eth(100) }));
    assert!(chain.submitted().is_empty());
}

// Tool layer

async fn get_test_config() -> Config {
    Config::from_yaml("config/test.yaml").await.unwrap()
}

/// Add delay between tests to avoid rate limiting
async fn avoid_rate_limit() {
    sleep(Duration::from_millis(500)).await;
}

#[tokio::test]
async fn test_tool_without_private_key_returns_error() {
    let config = get_test_config().await;
    let service = TradeBotService::new(&config);

    let result = service
        .execute_buy(Parameters(ExecuteBuyRequest {
            network: "ETH".to_string(),
            token_address: TOKEN.to_string(),
            amount: "0.1".to_string(),
            slippage_bps: None,
            gas_limit: None,
        }))
        .await
        .0;

    match result {
        ToolResult::Error { error } => assert!(matches!(error, TradeError::InvalidInput(_))),
        ToolResult::Success(_) => panic!("Expected error but got success"),
    }
}

#[tokio::test]
async fn test_tool_with_unknown_network_returns_error() {
    let mut config = get_test_config().await;
    config.wallet.private_key = DEV_PRIVATE_KEY.to_string();
    let service = TradeBotService::new(&config);

    let result = service
        .get_token_info(Parameters(TokenRequest {
            network: "SOL".to_string(),
            token_address: TOKEN.to_string(),
        }))
        .await
        .0;

    match result {
        ToolResult::Error { error } => {
            assert!(error.to_string().contains("Invalid network selected"), "{error}")
        }
        ToolResult::Success(_) => panic!("Expected error but got success"),
    }
}

#[tokio::test]
#[serial_test::serial]
#[ignore]
async fn test_get_token_info_live_should_work() {
    avoid_rate_limit().await;
    let mut config = get_test_config().await;
    config.wallet.private_key = DEV_PRIVATE_KEY.to_string();
    let service = TradeBotService::new(&config);

    let result = service
        .get_token_info(Parameters(TokenRequest {
            network: "ETH".to_string(),
            token_address: TOKEN.to_string(),
        }))
        .await
        .0;

    match result {
        ToolResult::Success(info) => {
            println!(
                "✅ Token info: {} ({}), supply {}",
                info.name, info.symbol, info.formatted_supply
            );
            assert_eq!(info.symbol, "USDT");
            assert_eq!(info.decimals, 6);
        }
        ToolResult::Error { error } => panic!("Expected success but got error: {error}"),
    }
}

#[tokio::test]
#[serial_test::serial]
#[ignore]
async fn test_get_token_price_live_should_work() {
    avoid_rate_limit().await;
    let executor = TradeExecutor::connect(
        get_test_config().await.network_config(crate::network::Network::Ethereum),
        DEV_PRIVATE_KEY,
        Duration::from_secs(30),
    )
    .unwrap();

    let price = executor.get_token_price(TOKEN, None).await.unwrap();
    println!("✅ 1 ETH buys {} USDT via {}", price.price, price.venue);
    assert!(!price.amount_out.is_zero());
}
