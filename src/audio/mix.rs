//! Channel down-mixing and level normalization

/// Average interleaved channels into one mono channel
///
/// A trailing partial frame is ignored.
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let scale = 1.0 / channels as f32;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// Largest absolute sample value, ignoring non-finite samples
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .filter(|s| s.is_finite())
        .fold(0.0f32, |acc, s| acc.max(s.abs()))
}

/// Scale samples so the loudest one reaches full scale
///
/// Returns the peak that was divided out, or `None` for silent input, which
/// is left untouched.
pub fn normalize_peak(samples: &mut [f32]) -> Option<f32> {
    let peak = peak(samples);
    if peak == 0.0 {
        return None;
    }
    let scale = 1.0 / peak;
    for s in samples.iter_mut() {
        *s *= scale;
    }
    Some(peak)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_averages_channels() {
        let stereo = [1.0, -1.0, 0.5, 0.5, 0.2];
        assert_eq!(downmix_to_mono(&stereo, 2), vec![0.0, 0.5]);

        let quad = [1.0, 1.0, 0.0, 0.0];
        assert_eq!(downmix_to_mono(&quad, 4), vec![0.5]);
    }

    #[test]
    fn test_mono_passes_through() {
        assert_eq!(downmix_to_mono(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[test]
    fn test_normalize_scales_to_full_range() {
        let mut samples = vec![0.25, -0.5, 0.1];
        assert_eq!(normalize_peak(&mut samples), Some(0.5));
        assert_eq!(samples, vec![0.5, -1.0, 0.2]);
    }

    #[test]
    fn test_silent_input_is_not_scaled() {
        let mut samples = vec![0.0; 16];
        assert_eq!(normalize_peak(&mut samples), None);
        assert!(samples.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_peak_skips_nan() {
        assert_eq!(peak(&[f32::NAN, -0.3, 0.2]), 0.3);
    }
}
