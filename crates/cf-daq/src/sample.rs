//! Raw sample model.

use cf_core::ChannelId;
use std::time::Instant;

/// Largest magnitude a 24-bit two's-complement conversion can produce.
pub const CODE_MAX: i32 = (1 << 23) - 1;

/// One raw conversion result.
///
/// Lives only within a single cycle's processing; the sample source owns
/// the batch until it hands the whole cycle to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Flat channel index across both converters.
    pub channel: ChannelId,
    /// 24-bit two's-complement conversion result.
    pub code: i32,
    /// Completion time on the shared monotonic clock.
    pub taken_at: Instant,
}

impl RawSample {
    /// Whether the code is representable by the converter at all.
    /// Codes outside this window indicate a bus or framing fault, not a
    /// saturated input.
    pub fn code_in_range(&self) -> bool {
        (-CODE_MAX..=CODE_MAX).contains(&self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_range_window() {
        let mk = |code| RawSample {
            channel: ChannelId::from_index(0),
            code,
            taken_at: Instant::now(),
        };
        assert!(mk(0).code_in_range());
        assert!(mk(CODE_MAX).code_in_range());
        assert!(mk(-CODE_MAX).code_in_range());
        assert!(!mk(CODE_MAX + 1).code_in_range());
        assert!(!mk(i32::MIN).code_in_range());
    }
}
