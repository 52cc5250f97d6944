use crate::gain::Gains;

/// Pad with silence or truncate so `samples` holds exactly `len` samples.
pub fn normalize(samples: &mut Vec<i16>, len: usize) {
    samples.resize(len, 0);
}

/// Mix two equal-length chunks into `out`.
///
/// Each output sample is `mic * gains.mic + track * gains.track`, truncated
/// toward zero and saturated to the i16 range (a NaN result becomes 0).
pub fn mix_into(mic: &[i16], track: &[i16], gains: Gains, out: &mut Vec<i16>) {
    debug_assert_eq!(mic.len(), track.len());
    out.clear();
    out.extend(
        mic.iter()
            .zip(track)
            .map(|(&m, &t)| (f32::from(m) * gains.mic + f32::from(t) * gains.track) as i16),
    );
}

/// Serialize samples as little-endian i16, the audio channel's wire format.
pub fn encode_le(samples: &[i16], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(samples.len() * 2);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mix(mic: &[i16], track: &[i16], gains: Gains) -> Vec<i16> {
        let mut out = Vec::new();
        mix_into(mic, track, gains, &mut out);
        out
    }

    #[test]
    fn full_gains_saturate_instead_of_wrapping() {
        let out = mix(&[i16::MAX; 8], &[i16::MAX; 8], Gains::new(1.0, 1.0));
        assert!(out.iter().all(|&s| s == i16::MAX));

        let out = mix(&[i16::MIN; 8], &[-1; 8], Gains::new(1.0, 1.0));
        assert!(out.iter().all(|&s| s == i16::MIN));
    }

    #[test]
    fn gains_select_sources() {
        let mic = [100, -200, 300];
        let track = [7, 8, 9];
        assert_eq!(mix(&mic, &track, Gains::MIC_ONLY), vec![100, -200, 300]);
        assert_eq!(mix(&mic, &track, Gains::TRACK_ONLY), vec![7, 8, 9]);
        assert_eq!(mix(&mic, &track, Gains::new(0.5, 2.0)), vec![64, -84, 168]);
    }

    #[test]
    fn fractional_results_truncate_toward_zero() {
        assert_eq!(mix(&[3, -3], &[0, 0], Gains::new(0.5, 0.0)), vec![1, -1]);
    }

    #[test]
    fn nan_gain_yields_silence() {
        assert_eq!(mix(&[1000], &[1000], Gains::new(f32::NAN, 1.0)), vec![0]);
    }

    #[test]
    fn normalize_pads_and_truncates() {
        let mut short = vec![1, 2];
        normalize(&mut short, 4);
        assert_eq!(short, vec![1, 2, 0, 0]);

        let mut long = vec![1, 2, 3, 4, 5];
        normalize(&mut long, 3);
        assert_eq!(long, vec![1, 2, 3]);
    }

    #[test]
    fn encodes_little_endian() {
        let mut bytes = Vec::new();
        encode_le(&[1, -2, 0x1234], &mut bytes);
        assert_eq!(bytes, vec![0x01, 0x00, 0xFE, 0xFF, 0x34, 0x12]);
    }
}
