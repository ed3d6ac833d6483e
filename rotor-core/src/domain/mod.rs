//! Domain types shared across the pipeline.

mod signal;
mod snapshot;
mod trade;

pub use signal::{MomentumSignal, SectorRanking};
pub use snapshot::{Position, PortfolioSnapshot, SnapshotIntegrity};
pub use trade::{SizedTrade, TradeAction};
