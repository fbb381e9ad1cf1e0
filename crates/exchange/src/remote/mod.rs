pub mod binance_client;
pub mod responses;

pub use binance_client::BinanceClient;
