//! Emission timing
//!
//! STREAM emission accumulates fractional bursts across steps. One burst
//! emits one particle per emission point; a burst is released every time the
//! accumulator is positive, so the carried remainder is never dropped.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How an emitter releases particles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EmissionMethod {
    /// Continuous emission at `speed / particle_size` bursts per second
    #[default]
    Stream,
    /// One burst whenever the emitter has no live particles
    Burst,
}

/// Carry-over state of stream emission
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmissionScheduler {
    unemitted_bursts: f32,
}

impl EmissionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bursts owed but not yet released
    pub fn unemitted_bursts(&self) -> f32 {
        self.unemitted_bursts
    }

    /// Forget any owed bursts
    pub fn reset(&mut self) {
        self.unemitted_bursts = 0.0;
    }

    /// Accumulate one step of stream emission and return the interpolation
    /// offset of every burst to release now.
    ///
    /// Offsets in `[0, 1)` tell how far into the step each burst happened,
    /// so particles of a fast stream are spread along their path instead of
    /// piling up at the source. A non-positive particle size owes nothing.
    pub fn stream_bursts(&mut self, speed: f32, fixed_step: f32, particle_size: f32) -> Vec<f32> {
        if !(particle_size > 0.0) {
            return Vec::new();
        }

        let burst_count = speed * fixed_step / particle_size;
        if !burst_count.is_finite() {
            return Vec::new();
        }
        self.unemitted_bursts += burst_count;

        let mut offsets = Vec::new();
        let mut burst = 0u32;
        while self.unemitted_bursts > 0.0 {
            let offset = if burst_count > 0.0 {
                burst as f32 / burst_count
            } else {
                0.0
            };
            offsets.push(offset);
            self.unemitted_bursts -= 1.0;
            burst += 1;
        }
        offsets
    }
}

/// What happened during one emitter step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Particles that entered the solver
    pub emitted: usize,
    /// Particles retired because their life ran out
    pub killed: usize,
    /// Emissions refused because the pool was full
    pub refused: usize,
}

impl StepReport {
    /// Whether the set of active particles changed
    pub fn changed(&self) -> bool {
        self.emitted > 0 || self.killed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_unit_rate_emits_once_per_step() {
        let mut scheduler = EmissionScheduler::new();
        for _ in 0..5 {
            assert_eq!(scheduler.stream_bursts(1.0, 1.0, 1.0), vec![0.0]);
            assert_eq!(scheduler.unemitted_bursts(), 0.0);
        }
    }

    #[test]
    fn test_half_rate_carries_remainder() {
        let mut scheduler = EmissionScheduler::new();
        // 0.5 owed: released, accumulator goes negative and absorbs the next step
        assert_eq!(scheduler.stream_bursts(0.5, 1.0, 1.0).len(), 1);
        assert_eq!(scheduler.unemitted_bursts(), -0.5);
        assert_eq!(scheduler.stream_bursts(0.5, 1.0, 1.0).len(), 0);
        assert_eq!(scheduler.unemitted_bursts(), 0.0);
    }

    #[test]
    fn test_offsets_spread_over_step() {
        let mut scheduler = EmissionScheduler::new();
        let offsets = scheduler.stream_bursts(4.0, 1.0, 1.0);
        assert_eq!(offsets, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test_case(0.0 ; "zero size")]
    #[test_case(-1.0 ; "negative size")]
    #[test_case(f32::NAN ; "nan size")]
    fn test_degenerate_particle_size(size: f32) {
        let mut scheduler = EmissionScheduler::new();
        assert!(scheduler.stream_bursts(1.0, 1.0, size).is_empty());
        assert_eq!(scheduler.unemitted_bursts(), 0.0);
    }

    #[test]
    fn test_zero_speed_never_emits() {
        let mut scheduler = EmissionScheduler::new();
        for _ in 0..10 {
            assert!(scheduler.stream_bursts(0.0, 0.02, 0.1).is_empty());
        }
    }

    #[test_case(0.3, 0.1, 0.1 ; "fractional rate")]
    #[test_case(1.7, 0.02, 0.05 ; "fast small particles")]
    #[test_case(0.05, 0.016, 0.2 ; "slow large particles")]
    fn test_long_run_rate_converges(speed: f32, fixed_step: f32, size: f32) {
        let mut scheduler = EmissionScheduler::new();
        let steps = 10_000;
        let total: usize = (0..steps)
            .map(|_| scheduler.stream_bursts(speed, fixed_step, size).len())
            .sum();

        let expected = f64::from(speed * fixed_step / size) * f64::from(steps);
        // the accumulator never drifts by more than one burst
        assert!((total as f64 - expected).abs() <= 1.0 + expected * 1e-4);
    }

    #[test]
    fn test_report_changed() {
        assert!(!StepReport::default().changed());
        assert!(
            !StepReport {
                refused: 3,
                ..Default::default()
            }
            .changed()
        );
        assert!(
            StepReport {
                killed: 1,
                ..Default::default()
            }
            .changed()
        );
    }
}
