use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repository::RepositoryError;

/// How a caller should react to a failed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, JsonSchema, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input; correct it and try again.
    Input,
    /// Not enough native currency or tokens.
    InsufficientFunds,
    /// No venue can fill the trade right now.
    NoLiquidity,
    /// The approval transaction failed; the sell was not submitted.
    Approval,
    /// The swap was mined and reverted.
    Reverted,
    /// Provider or network trouble.
    Transient,
    Internal,
}

#[derive(Debug, Clone, Error, JsonSchema, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum TradeError {
    // Input errors
    /// A token address, amount, percentage, key or setting is malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The computed minimum output is zero although slippage protection was requested.
    #[error(
        "Invalid minimum amount: quote of {expected_out} with {slippage_bps} bps slippage leaves no protection"
    )]
    InvalidMinimumAmount {
        expected_out: String,
        slippage_bps: u32,
    },

    // Funds
    /// The wallet holds less native currency than the buy needs.
    #[error("Insufficient {symbol} balance. Have: {have} {symbol}, Need: {need} {symbol}")]
    InsufficientBalance {
        symbol: String,
        have: String,
        need: String,
    },

    /// The wallet holds fewer tokens than the sell needs.
    #[error("Insufficient token balance. Have: {have} {symbol}, Need: {need} {symbol}")]
    InsufficientTokenBalance {
        symbol: String,
        have: String,
        need: String,
    },

    // Liquidity
    /// Neither a V3 fee tier nor the V2 path returned a usable quote.
    #[error("No viable pool for token {token}: {reason}")]
    NoViablePool { token: String, reason: String },

    // On-chain failures
    /// The approval transaction could not be sent, reverted, or never confirmed.
    #[error("Token approval failed{}: {reason}", tx_suffix(.tx_hash))]
    ApprovalFailed {
        tx_hash: Option<String>,
        reason: String,
    },

    /// The swap transaction was mined with status 0.
    #[error("Transaction {tx_hash} reverted on-chain")]
    TransactionReverted { tx_hash: String },

    /// No receipt was observed in time. The transaction may still be mined.
    #[error("Timed out after {waited_secs}s waiting for transaction {tx_hash}")]
    ConfirmationTimeout { tx_hash: String, waited_secs: u64 },

    /// Broadcasting the swap failed. It may or may not have reached the mempool.
    #[error("Failed to submit {stage}: {reason}")]
    SubmissionFailed { stage: String, reason: String },

    // Infrastructure errors (abstracted from repository layer)
    /// A read against the chain failed.
    #[error("Blockchain connection error: {0}")]
    BlockchainError(String),

    /// An unexpected internal error occurred.
    #[error("Internal error: {0}")]
    InternalError(String),
}

fn tx_suffix(tx_hash: &Option<String>) -> String {
    tx_hash
        .as_ref()
        .map(|hash| format!(" ({hash})"))
        .unwrap_or_default()
}

impl TradeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TradeError::InvalidInput(_) | TradeError::InvalidMinimumAmount { .. } => {
                ErrorKind::Input
            }
            TradeError::InsufficientBalance { .. }
            | TradeError::InsufficientTokenBalance { .. } => ErrorKind::InsufficientFunds,
            TradeError::NoViablePool { .. } => ErrorKind::NoLiquidity,
            TradeError::ApprovalFailed { .. } => ErrorKind::Approval,
            TradeError::TransactionReverted { .. } => ErrorKind::Reverted,
            TradeError::ConfirmationTimeout { .. }
            | TradeError::SubmissionFailed { .. }
            | TradeError::BlockchainError(_) => ErrorKind::Transient,
            TradeError::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Whether repeating the failed step as-is is safe.
    ///
    /// Only reads qualify. A submission or confirmation failure must first be
    /// checked against the chain, since the first transaction may still land.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TradeError::BlockchainError(_))
    }
}

impl From<RepositoryError> for TradeError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::RpcError(msg) | RepositoryError::ContractError(msg) => {
                TradeError::BlockchainError(format!("Failed to interact with blockchain: {msg}"))
            }
            RepositoryError::ParseError(msg) => TradeError::InvalidInput(msg),
            RepositoryError::Timeout { what, waited_secs } => TradeError::ConfirmationTimeout {
                tx_hash: what,
                waited_secs,
            },
        }
    }
}
