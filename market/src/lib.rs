//! Market-data acquisition: provider collaborators, the moving-average
//! signal, a TTL cache for computed results and the batched fetcher that
//! ties them together under provider rate limits.

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod provider;
pub mod signal;
pub mod types;
pub mod universe;

pub use cache::TtlCache;
pub use error::{MarketError, SignalError};
pub use fetcher::{BatchFetcher, FetchConfig};
pub use provider::MarketDataApi;
pub use signal::{SignalParams, compute_signal};
pub use types::{Direction, Sample, SignalResult};
