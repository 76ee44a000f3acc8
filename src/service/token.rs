use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use tracing::instrument;

use crate::repository::{ChainRepository, TxOptions};
use crate::service::ServiceResult;

pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";
pub const DEFAULT_DECIMALS: u8 = 18;

/// ERC-20 accessor bound to one token address and the repository's signer.
///
/// Metadata reads never fail: a token that does not implement `symbol`,
/// `decimals`, `name` or `totalSupply` gets a default. Balance, allowance and
/// approval errors are returned to the caller.
#[derive(Clone)]
pub struct TokenContractProxy {
    repository: Arc<dyn ChainRepository>,
    address: Address,
}

impl TokenContractProxy {
    pub fn new(repository: Arc<dyn ChainRepository>, address: Address) -> Self {
        Self {
            repository,
            address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn symbol(&self) -> String {
        match self.repository.erc20_symbol(self.address).await {
            Ok(symbol) => symbol,
            Err(e) => {
                tracing::warn!("symbol() failed for {}: {e}", self.address);
                UNKNOWN_SYMBOL.to_string()
            }
        }
    }

    pub async fn decimals(&self) -> u8 {
        match self.repository.erc20_decimals(self.address).await {
            Ok(decimals) => decimals,
            Err(e) => {
                tracing::warn!("decimals() failed for {}: {e}", self.address);
                DEFAULT_DECIMALS
            }
        }
    }

    pub async fn name(&self) -> String {
        match self.repository.erc20_name(self.address).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!("name() failed for {}: {e}", self.address);
                UNKNOWN_SYMBOL.to_string()
            }
        }
    }

    pub async fn total_supply(&self) -> U256 {
        self.repository
            .erc20_total_supply(self.address)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("totalSupply() failed for {}: {e}", self.address);
                U256::ZERO
            })
    }

    /// Symbol and decimals, read concurrently.
    pub async fn metadata(&self) -> (String, u8) {
        tokio::join!(self.symbol(), self.decimals())
    }

    #[instrument(skip(self), fields(token = %self.address), err)]
    pub async fn balance_of(&self, owner: Address) -> ServiceResult<U256> {
        Ok(self.repository.erc20_balance_of(self.address, owner).await?)
    }

    #[instrument(skip(self), fields(token = %self.address), err)]
    pub async fn allowance(&self, owner: Address, spender: Address) -> ServiceResult<U256> {
        Ok(self
            .repository
            .erc20_allowance(self.address, owner, spender)
            .await?)
    }

    /// Broadcasts `approve(spender, amount)`. Does not wait for the receipt.
    #[instrument(skip(self), fields(token = %self.address), err)]
    pub async fn approve(
        &self,
        spender: Address,
        amount: U256,
        options: TxOptions,
    ) -> ServiceResult<TxHash> {
        Ok(self
            .repository
            .erc20_approve(self.address, spender, amount, options)
            .await?)
    }
}
