//! Rotor Core — signal math, sizing, and risk for the sector-rotation pipeline.
//!
//! This crate contains the decision logic of the pipeline:
//! - Domain types (snapshots, positions, sized trades, ranked signals)
//! - 12-1 momentum signal generation over a sector-ETF universe
//! - Cash-feasible position sizing (sells before buys)
//! - Risk limits and the kill switch
//! - Price provider trait with Yahoo and synthetic implementations
//!
//! Orchestration (pipeline stages, journaling, order submission) lives in
//! `rotor-engine`; this crate has no engine state and performs no I/O beyond
//! the provider implementations and the kill-switch store.

pub mod data;
pub mod domain;
pub mod momentum;
pub mod risk;
pub mod sizing;
pub mod universe;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: decision-pipeline types are Send + Sync.
    ///
    /// The engine crate hands collaborators across a trait-object boundary;
    /// if any core type loses Send + Sync the build breaks here first.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::PortfolioSnapshot>();
        require_sync::<domain::PortfolioSnapshot>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::SizedTrade>();
        require_sync::<domain::SizedTrade>();
        require_send::<domain::MomentumSignal>();
        require_sync::<domain::MomentumSignal>();
        require_send::<domain::SectorRanking>();
        require_sync::<domain::SectorRanking>();

        require_send::<risk::RiskLimits>();
        require_sync::<risk::RiskLimits>();
        require_send::<risk::BatchValidation>();
        require_sync::<risk::BatchValidation>();
        require_send::<risk::FileKillSwitch>();
        require_sync::<risk::FileKillSwitch>();

        require_send::<sizing::SizerConfig>();
        require_sync::<sizing::SizerConfig>();

        require_send::<universe::Universe>();
        require_sync::<universe::Universe>();

        require_send::<data::PriceSeries>();
        require_sync::<data::PriceSeries>();
    }
}
