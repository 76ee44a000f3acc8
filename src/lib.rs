pub mod app;
pub mod config;
pub mod middleware;
pub mod network;
pub mod repository;
pub mod service;

pub use app::build_app;

// Re-export the trading core for embedding without the tool server
pub use network::{Network, NetworkConfig};
pub use service::{
    ErrorKind, PoolQuote, SellAmount, TradeBotService, TradeDirection, TradeError, TradeExecutor,
    TradeIntent, TradeResult, TradeSettings, Venue,
};
