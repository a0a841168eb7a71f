//! Per-channel smoothing.
//!
//! A single 24-bit conversion carries quantization and thermal noise well
//! above the millikelvin target, so each channel runs through a rolling
//! window; averaging trades latency for resolution. The bank is owned by
//! the coordinator alone and cleared whole after any fault-dropped cycle,
//! so pre- and post-fault data of unknown continuity never mix.

use std::collections::VecDeque;

use cf_core::{ChannelId, Real};
use serde::{Deserialize, Serialize};

/// Smoothing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FilterMode {
    /// Simple moving average over the last `window` samples.
    Sma { window: usize },
    /// Exponentially weighted average; `window` still bounds the stored
    /// history used for settling bookkeeping.
    Ewma { window: usize, alpha: Real },
}

impl FilterMode {
    pub fn window(&self) -> usize {
        match self {
            FilterMode::Sma { window } | FilterMode::Ewma { window, .. } => *window,
        }
    }
}

#[derive(Debug, Clone)]
struct ChannelFilter {
    history: VecDeque<Real>,
    ewma: Option<Real>,
}

impl ChannelFilter {
    fn new(window: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(window),
            ewma: None,
        }
    }

    fn update(&mut self, mode: FilterMode, value: Real) -> Real {
        let window = mode.window();
        if self.history.len() == window {
            self.history.pop_front();
        }
        self.history.push_back(value);

        match mode {
            FilterMode::Sma { .. } => {
                self.history.iter().sum::<Real>() / self.history.len() as Real
            }
            FilterMode::Ewma { alpha, .. } => {
                let smoothed = match self.ewma {
                    // Seed with the first post-reset sample.
                    None => value,
                    Some(prev) => alpha * value + (1.0 - alpha) * prev,
                };
                self.ewma = Some(smoothed);
                smoothed
            }
        }
    }

    fn clear(&mut self) {
        self.history.clear();
        self.ewma = None;
    }
}

/// The filter state for every channel in the rig.
#[derive(Debug, Clone)]
pub struct FilterBank {
    mode: FilterMode,
    channels: Vec<(ChannelId, ChannelFilter)>,
}

impl FilterBank {
    pub fn new(mode: FilterMode, channels: &[ChannelId]) -> Self {
        Self {
            mode,
            channels: channels
                .iter()
                .map(|&ch| (ch, ChannelFilter::new(mode.window())))
                .collect(),
        }
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Feed one channel's reading, returning the smoothed value.
    ///
    /// Unknown channels pass through unfiltered; the coordinator only
    /// feeds channels it registered at construction.
    pub fn update(&mut self, channel: ChannelId, kelvin: Real) -> Real {
        match self
            .channels
            .iter_mut()
            .find(|(ch, _)| *ch == channel)
        {
            Some((_, filter)) => filter.update(self.mode, kelvin),
            None => kelvin,
        }
    }

    /// Samples currently held for a channel.
    pub fn fill(&self, channel: ChannelId) -> usize {
        self.channels
            .iter()
            .find(|(ch, _)| *ch == channel)
            .map_or(0, |(_, f)| f.history.len())
    }

    /// Drop all history on every channel.
    pub fn reset(&mut self) {
        for (_, filter) in &mut self.channels {
            filter.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(i: u16) -> ChannelId {
        ChannelId::from_index(i)
    }

    #[test]
    fn sma_averages_the_window() {
        let mut bank = FilterBank::new(FilterMode::Sma { window: 4 }, &[ch(0)]);
        assert_eq!(bank.update(ch(0), 2.0), 2.0);
        assert_eq!(bank.update(ch(0), 4.0), 3.0);
        assert_eq!(bank.update(ch(0), 6.0), 4.0);
        assert_eq!(bank.update(ch(0), 8.0), 5.0);
        // Window is full; the first sample falls out.
        assert_eq!(bank.update(ch(0), 10.0), 7.0);
    }

    #[test]
    fn channels_are_independent() {
        let mut bank = FilterBank::new(FilterMode::Sma { window: 2 }, &[ch(0), ch(1)]);
        bank.update(ch(0), 100.0);
        assert_eq!(bank.update(ch(1), 10.0), 10.0);
        assert_eq!(bank.fill(ch(0)), 1);
        assert_eq!(bank.fill(ch(1)), 1);
    }

    #[test]
    fn constant_input_converges_within_one_window() {
        for mode in [
            FilterMode::Sma { window: 8 },
            FilterMode::Ewma {
                window: 8,
                alpha: 0.4,
            },
        ] {
            let mut bank = FilterBank::new(mode, &[ch(0)]);
            let mut out = 0.0;
            for _ in 0..8 {
                out = bank.update(ch(0), 293.15);
            }
            assert!((out - 293.15).abs() < 1e-9, "mode {mode:?} gave {out}");
        }
    }

    #[test]
    fn ewma_weights_recent_samples() {
        let mut bank = FilterBank::new(
            FilterMode::Ewma {
                window: 4,
                alpha: 0.5,
            },
            &[ch(0)],
        );
        assert_eq!(bank.update(ch(0), 10.0), 10.0);
        assert_eq!(bank.update(ch(0), 20.0), 15.0);
        assert_eq!(bank.update(ch(0), 20.0), 17.5);
    }

    #[test]
    fn reset_clears_every_channel() {
        let mut bank = FilterBank::new(FilterMode::Sma { window: 4 }, &[ch(0), ch(1)]);
        bank.update(ch(0), 1.0);
        bank.update(ch(1), 2.0);
        bank.reset();
        assert_eq!(bank.fill(ch(0)), 0);
        assert_eq!(bank.fill(ch(1)), 0);
        // Post-reset, the filter restarts from the new sample alone.
        assert_eq!(bank.update(ch(0), 50.0), 50.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn smoothed_stays_within_input_bounds(
                inputs in prop::collection::vec(250.0_f64..350.0, 1..40),
                window in 1_usize..16,
            ) {
                let mut bank = FilterBank::new(FilterMode::Sma { window }, &[ch(0)]);
                let lo = inputs.iter().cloned().fold(f64::INFINITY, f64::min);
                let hi = inputs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                for &x in &inputs {
                    let out = bank.update(ch(0), x);
                    prop_assert!(out >= lo - 1e-12 && out <= hi + 1e-12);
                }
            }
        }
    }
}
