/// Collector module
///
/// This module groups the logic responsible for:
/// - Running the periodic poll of one account
/// - Turning API results into gauge observations
/// - Keeping the fixed cycle cadence
///
/// The collector layer is the orchestration layer between:
/// - The game API session (fetch operations)
/// - A metrics sink (Prometheus registry in production)
///
/// Design notes:
/// - API and decoding logic MUST NOT live here
/// - The loop is sequential, one call at a time
pub mod runner;

pub use runner::Collector;
