//! Sizes per-tick audio blocks from host timestamps.

use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Turns the host time between ticks into a sample count.
///
/// The fractional remainder carries over to the next tick, so the samples
/// handed out since `reset` always equal `elapsed * sample_rate` rounded down,
/// whatever the tick spacing or rate.
#[derive(Debug, Clone)]
pub struct BlockPacer {
    sample_rate: u32,
    nominal: Duration,
    last: Option<Duration>,
    /// Leftover `nanos * sample_rate`, always below one sample.
    carry: u128,
}

impl BlockPacer {
    /// `nominal` is the span used for a tick with no earlier timestamp.
    pub fn new(sample_rate: u32, nominal: Duration) -> Self {
        Self {
            sample_rate,
            nominal,
            last: None,
            carry: 0,
        }
    }

    /// Start counting from host time `now`, dropping any remainder.
    pub fn reset(&mut self, now: Duration) {
        self.last = Some(now);
        self.carry = 0;
    }

    /// Samples covering the time since the previous call (or `reset`).
    ///
    /// Timestamps that go backwards yield an empty block.
    pub fn frames_until(&mut self, now: Duration) -> usize {
        let span = match self.last {
            Some(last) => {
                self.last = Some(now.max(last));
                now.saturating_sub(last)
            }
            None => {
                self.last = Some(now);
                self.nominal
            }
        };
        let exact = span.as_nanos() * self.sample_rate as u128 + self.carry;
        self.carry = exact % NANOS_PER_SEC;
        usize::try_from(exact / NANOS_PER_SEC).unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn first_tick_uses_nominal_span() {
        let mut pacer = BlockPacer::new(48_000, ms(20));
        assert_eq!(pacer.frames_until(ms(500)), 960);
        assert_eq!(pacer.frames_until(ms(510)), 480);
    }

    #[test]
    fn remainder_carries_across_ticks() {
        // 8000 / 30 is not whole; only the final fraction may be missing.
        let mut pacer = BlockPacer::new(8_000, Duration::ZERO);
        pacer.reset(Duration::ZERO);
        let tick = Duration::from_nanos(1_000_000_000 / 30);
        let sizes: Vec<usize> = (1..=30u32).map(|k| pacer.frames_until(tick * k)).collect();
        assert!(sizes.iter().all(|&n| n == 266 || n == 267), "{sizes:?}");
        // 30 ticks of 33_333_333 ns fall 10 ns short of a full second.
        assert_eq!(sizes.iter().sum::<usize>(), 7_999);
    }

    #[test]
    fn uneven_gaps_follow_host_time() {
        let mut pacer = BlockPacer::new(8_000, ms(33));
        pacer.reset(ms(1_000));
        let gaps = [ms(1_033), ms(1_140), ms(1_141), ms(1_250)];
        let sizes: Vec<usize> = gaps.iter().map(|&t| pacer.frames_until(t)).collect();
        assert_eq!(sizes, vec![264, 856, 8, 872]);
        assert_eq!(sizes.iter().sum::<usize>(), 2_000);
    }

    #[test]
    fn backwards_timestamps_yield_nothing() {
        let mut pacer = BlockPacer::new(8_000, ms(33));
        pacer.reset(ms(100));
        assert_eq!(pacer.frames_until(ms(50)), 0);
        assert_eq!(pacer.frames_until(ms(110)), 80);
    }
}
