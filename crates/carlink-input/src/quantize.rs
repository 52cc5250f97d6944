use std::collections::HashMap;

use crate::event::EventCode;

/// Axis quantization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizerConfig {
    /// Buckets on each side of centre (`P`). Default: 4.
    pub partitions: u32,
    /// Largest raw axis magnitude. Default: 32767.
    pub axis_max: i32,
}

impl Default for QuantizerConfig {
    fn default() -> Self {
        Self {
            partitions: 4,
            axis_max: 32767,
        }
    }
}

/// Map a raw axis value to a bucket in `[-P, P]`.
///
/// The raw value is clamped to `[-axis_max, axis_max]` on both sides, then
/// divided by `axis_max / P` and truncated toward zero.
pub fn quantize(raw: i32, config: QuantizerConfig) -> i32 {
    let max = i64::from(config.axis_max.max(1));
    let clamped = i64::from(raw).clamp(-max, max);
    (clamped * i64::from(config.partitions) / max) as i32
}

/// Remembers the last bucket sent for each axis.
#[derive(Debug, Default, Clone)]
pub struct AxisDedup {
    last_sent: HashMap<EventCode, i32>,
}

impl AxisDedup {
    /// Returns true (and records `bucket`) when it differs from the last
    /// bucket sent for `axis`. The first bucket of each axis is always new.
    pub fn accept(&mut self, axis: EventCode, bucket: i32) -> bool {
        match self.last_sent.insert(axis, bucket) {
            Some(previous) => previous != bucket,
            None => true,
        }
    }

    pub fn last_sent(&self, axis: EventCode) -> Option<i32> {
        self.last_sent.get(&axis).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CFG: QuantizerConfig = QuantizerConfig {
        partitions: 4,
        axis_max: 32767,
    };

    #[test]
    fn buckets_span_minus_p_to_p() {
        assert_eq!(quantize(0, CFG), 0);
        assert_eq!(quantize(8191, CFG), 0);
        assert_eq!(quantize(8192, CFG), 1);
        assert_eq!(quantize(-8192, CFG), -1);
        assert_eq!(quantize(32767, CFG), 4);
        assert_eq!(quantize(-32767, CFG), -4);
    }

    #[test]
    fn clamping_is_symmetric() {
        assert_eq!(quantize(-32768, CFG), -4);
        assert_eq!(quantize(i32::MIN, CFG), -4);
        assert_eq!(quantize(40_000, CFG), 4);
        assert_eq!(quantize(i32::MAX, CFG), 4);
    }

    #[test]
    fn other_partition_counts() {
        let cfg = QuantizerConfig {
            partitions: 2,
            axis_max: 100,
        };
        assert_eq!(quantize(49, cfg), 0);
        assert_eq!(quantize(50, cfg), 1);
        assert_eq!(quantize(-100, cfg), -2);
    }

    #[test]
    fn dedup_is_per_axis() {
        let mut dedup = AxisDedup::default();
        assert!(dedup.accept(EventCode::AbsY, 0));
        assert!(!dedup.accept(EventCode::AbsY, 0));
        assert!(dedup.accept(EventCode::AbsRx, 0));
        assert!(dedup.accept(EventCode::AbsY, 1));
        assert!(!dedup.accept(EventCode::AbsRx, 0));
        assert_eq!(dedup.last_sent(EventCode::AbsY), Some(1));
        assert_eq!(dedup.last_sent(EventCode::AbsX), None);
    }
}
