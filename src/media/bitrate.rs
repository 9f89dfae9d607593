/*!
 * Target bitrate allocation.
 *
 * The whole size budget is spread evenly over the duration: the audio
 * track takes its share first and the remainder goes to video. There is
 * no container overhead margin, so real outputs land slightly above the
 * target.
 */

/// Compute the video bitrate in kbps that fills `target_size_bytes`.
///
/// `floor((target_size_bytes * 8 - audio_bitrate_bps * duration_s) / duration_s / 1000)`
///
/// The result is not clamped and goes negative when the audio alone exceeds
/// the budget; callers must check it is positive before encoding.
/// `duration_s` must be strictly positive.
pub fn allocate(duration_s: f64, audio_bitrate_bps: u64, target_size_bytes: f64) -> i64 {
    let total_bits = target_size_bytes * 8.0;
    let audio_bits = audio_bitrate_bps as f64 * duration_s;
    ((total_bits - audio_bits) / duration_s / 1000.0).floor() as i64
}

/// Smallest target size in bytes for which [`allocate`] yields at least 1 kbps.
pub fn minimum_target_size_bytes(duration_s: f64, audio_bitrate_bps: u64) -> u64 {
    // (audio + 1000 bps of video) for the whole duration, in bytes
    let bits = (audio_bitrate_bps as f64 + 1000.0) * duration_s;
    let mut candidate = (bits / 8.0).ceil();

    // float rounding can land a few bytes short of the threshold
    for _ in 0..MAX_ROUNDING_STEPS {
        if !candidate.is_finite() || allocate(duration_s, audio_bitrate_bps, candidate) >= 1 {
            break;
        }
        candidate = next_byte_count(candidate);
    }
    candidate as u64
}

const MAX_ROUNDING_STEPS: usize = 16;

/// Next whole byte count above `bytes` that is distinct as an `f64`
fn next_byte_count(bytes: f64) -> f64 {
    let stepped = bytes + 1.0;
    if stepped > bytes {
        stepped
    } else {
        // past 2^53 a single byte is below the float resolution
        f64::from_bits(bytes.to_bits() + 1)
    }
}
