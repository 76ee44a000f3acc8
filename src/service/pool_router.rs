use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::instrument;

use crate::network::NetworkConfig;
use crate::repository::{ChainRepository, RepositoryError};
use crate::service::types::{PoolQuote, TradeDirection, Venue};
use crate::service::{ServiceResult, TradeError};

/// Venues probed for every quote, in order. The first one that returns a
/// non-zero amount wins, even if a later one would pay more.
pub const PROBE_ORDER: [Venue; 5] = [
    Venue::V3 { fee_tier: 100 },
    Venue::V3 { fee_tier: 500 },
    Venue::V3 { fee_tier: 3000 },
    Venue::V3 { fee_tier: 10000 },
    Venue::V2,
];

/// Outcome of a single probe.
enum Probe {
    Quote(U256),
    /// The venue cannot fill this trade; carries the reason.
    Skip(String),
}

/// Finds a venue that can fill a trade between the native wrapper and a token.
pub struct PoolRouter {
    repository: Arc<dyn ChainRepository>,
    network: NetworkConfig,
}

impl PoolRouter {
    pub fn new(repository: Arc<dyn ChainRepository>, network: NetworkConfig) -> Self {
        Self {
            repository,
            network,
        }
    }

    /// Quote `amount_in` on the buy path (`[WETH, token]`) or the sell path
    /// (`[token, WETH]`). Read-only.
    #[instrument(skip(self), err)]
    pub async fn detect_pool(
        &self,
        side: TradeDirection,
        token: Address,
        amount_in: U256,
    ) -> ServiceResult<PoolQuote> {
        let mut last_reason = String::from("no pool returned a quote");

        for venue in PROBE_ORDER {
            let path = self.path(venue, side, token);
            match self.probe(venue, &path, amount_in).await? {
                Probe::Quote(amount_out) => {
                    tracing::info!("Pool found on {venue}: {amount_in} -> {amount_out}");
                    return Ok(PoolQuote {
                        venue,
                        amount_in,
                        amount_out,
                        path,
                    });
                }
                Probe::Skip(reason) => {
                    tracing::debug!("{venue} skipped: {reason}");
                    last_reason = reason;
                }
            }
        }

        Err(TradeError::NoViablePool {
            token: token.to_string(),
            reason: last_reason,
        })
    }

    fn path(&self, venue: Venue, side: TradeDirection, token: Address) -> Vec<Address> {
        let wrapped = match venue {
            Venue::V2 => self.network.v2_weth,
            Venue::V3 { .. } => self.network.v3_weth,
        };
        match side {
            TradeDirection::Buy => vec![wrapped, token],
            TradeDirection::Sell => vec![token, wrapped],
        }
    }

    /// V3 failures of any kind skip the tier. On V2 only a contract error
    /// (no pair) is a skip; transport failures abort the scan.
    async fn probe(&self, venue: Venue, path: &[Address], amount_in: U256) -> ServiceResult<Probe> {
        match venue {
            Venue::V3 { fee_tier } => {
                match self
                    .repository
                    .v3_quote_exact_input_single(
                        self.network.v3_quoter,
                        path[0],
                        path[1],
                        fee_tier,
                        amount_in,
                    )
                    .await
                {
                    Ok(amount_out) if !amount_out.is_zero() => Ok(Probe::Quote(amount_out)),
                    Ok(_) => Ok(Probe::Skip(format!("fee tier {fee_tier} quoted zero"))),
                    Err(e) => {
                        tracing::warn!("V3 quote failed for fee tier {fee_tier}: {e}");
                        Ok(Probe::Skip(format!("fee tier {fee_tier} failed: {e}")))
                    }
                }
            }
            Venue::V2 => {
                let amounts = match self
                    .repository
                    .v2_get_amounts_out(self.network.v2_router, amount_in, path.to_vec())
                    .await
                {
                    Ok(amounts) => amounts,
                    Err(e @ RepositoryError::ContractError(_)) => {
                        return Ok(Probe::Skip(format!("V2 router rejected the path: {e}")));
                    }
                    Err(e) => {
                        tracing::error!("V2 getAmountsOut failed: {e}");
                        return Err(e.into());
                    }
                };

                if amounts.len() < 2 {
                    return Ok(Probe::Skip("Invalid amounts returned from router".to_string()));
                }

                match amounts.last() {
                    Some(amount_out) if !amount_out.is_zero() => Ok(Probe::Quote(*amount_out)),
                    _ => Ok(Probe::Skip("V2 quoted zero".to_string())),
                }
            }
        }
    }
}
