pub mod error;
pub mod executor;
pub mod pool_router;
pub mod token;
pub mod trading;
pub mod types;
pub mod utils;

#[cfg(test)]
mod tests;

pub use error::{ErrorKind, TradeError};
pub use executor::TradeExecutor;
pub use pool_router::{PROBE_ORDER, PoolRouter};
pub use token::TokenContractProxy;
pub use trading::TradeBotService;
pub use types::*;
pub use utils::SellAmount;

pub(crate) type ServiceResult<T> = std::result::Result<T, TradeError>;
