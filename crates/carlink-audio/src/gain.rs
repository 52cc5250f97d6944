use std::sync::atomic::{AtomicU64, Ordering};

/// Microphone and background-track gains, applied as plain multipliers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    pub mic: f32,
    pub track: f32,
}

impl Gains {
    /// Operator talking: microphone only.
    pub const MIC_ONLY: Gains = Gains {
        mic: 1.0,
        track: 0.0,
    };

    /// Idle: background track only.
    pub const TRACK_ONLY: Gains = Gains {
        mic: 0.0,
        track: 1.0,
    };

    pub fn new(mic: f32, track: f32) -> Self {
        Self { mic, track }
    }
}

impl Default for Gains {
    fn default() -> Self {
        Self::TRACK_ONLY
    }
}

/// The gain pair shared between the input encoder (writer) and the mixer
/// (reader).
///
/// Both gains live in one 64-bit word, so a reader always observes a pair
/// that was stored together.
#[derive(Debug)]
pub struct SharedGainState {
    packed: AtomicU64,
}

impl SharedGainState {
    pub fn new(initial: Gains) -> Self {
        Self {
            packed: AtomicU64::new(pack(initial)),
        }
    }

    pub fn snapshot(&self) -> Gains {
        unpack(self.packed.load(Ordering::Acquire))
    }

    pub fn set(&self, gains: Gains) {
        self.packed.store(pack(gains), Ordering::Release);
    }

    pub fn set_pair(&self, mic: f32, track: f32) {
        self.set(Gains::new(mic, track));
    }
}

impl Default for SharedGainState {
    fn default() -> Self {
        Self::new(Gains::default())
    }
}

fn pack(gains: Gains) -> u64 {
    (u64::from(gains.mic.to_bits()) << 32) | u64::from(gains.track.to_bits())
}

fn unpack(word: u64) -> Gains {
    Gains {
        mic: f32::from_bits((word >> 32) as u32),
        track: f32::from_bits(word as u32),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn defaults_to_track_only() {
        assert_eq!(SharedGainState::default().snapshot(), Gains::TRACK_ONLY);
    }

    #[test]
    fn stores_arbitrary_values() {
        let state = SharedGainState::default();
        state.set_pair(0.25, -3.5);
        assert_eq!(state.snapshot(), Gains::new(0.25, -3.5));

        state.set_pair(f32::MAX, 1e-9);
        assert_eq!(state.snapshot(), Gains::new(f32::MAX, 1e-9));
    }

    #[test]
    fn concurrent_reader_never_sees_a_torn_pair() {
        let state = Arc::new(SharedGainState::default());
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let state = Arc::clone(&state);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                for i in 0..200_000 {
                    if i % 2 == 0 {
                        state.set(Gains::MIC_ONLY);
                    } else {
                        state.set(Gains::TRACK_ONLY);
                    }
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        while !done.load(Ordering::SeqCst) {
            let seen = state.snapshot();
            assert!(
                seen == Gains::MIC_ONLY || seen == Gains::TRACK_ONLY,
                "torn gain pair observed: {seen:?}"
            );
        }
        writer.join().unwrap();
    }
}
