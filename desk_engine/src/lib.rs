pub mod account;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod models;
pub mod sizing;
pub mod time_sync;

pub use engine::OrderEngine;
pub use error::EngineError;
pub use gateway::{BinanceGateway, ExchangeGateway};
pub use models::*;
