pub mod aliases;
pub mod cache;
pub mod config;
pub mod error;
pub mod fuzzy;
pub mod http_client;
pub mod logging;
pub mod market_value;
pub mod normalize;
pub mod odds;
pub mod prediction;
pub mod rate_limit;
pub mod reconcile;
pub mod results_fetch;
pub mod stats;
pub mod store;
pub mod transfermarkt;
