/// Utility helpers used by the collector loop.
///
/// IMPORTANT:
/// - No API or metrics logic should live here.
/// - This module must remain lightweight and deterministic.
///

use std::time::Duration;

/// Time left to wait so that one cycle lasts `interval`.
///
/// Returns zero when `elapsed` already exceeds `interval`: an overrun
/// is not an error, the next cycle simply starts at once.
///
/// Examples:
/// - (300s, 12s)  -> 288s
/// - (300s, 300s) -> 0s
/// - (300s, 420s) -> 0s
///
pub fn remaining_wait(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}
