/*!
 * Tests for bitrate allocation
 */

use vidsqueeze::media::{allocate, minimum_target_size_bytes};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// A larger budget never lowers the allocated bitrate
#[test]
fn test_allocate_withGrowingTarget_shouldNeverDecrease() {
    let mut previous = i64::MIN;
    for step in 1..=200 {
        let target = step as f64 * 5_000_000.0;
        let kbps = allocate(1234.5, 160_000, target);
        assert!(kbps >= previous, "allocation dropped at {} bytes", target);
        previous = kbps;
    }
}

/// More audio leaves less room for video
#[test]
fn test_allocate_withHigherAudioBitrate_shouldLowerVideo() {
    let low = allocate(600.0, 96_000, GIB);
    let high = allocate(600.0, 320_000, GIB);
    assert!(low > high);
    // 224 kbps of extra audio comes straight off the video
    assert_eq!(low - high, 224);
}

/// Video and audio together fit the budget
#[test]
fn test_allocate_result_shouldFitTarget() {
    for (duration, audio, target) in [
        (60.0, 128_000u64, 50_000_000.0),
        (5400.0, 192_000, 1.8 * GIB),
        (42.42, 64_000, 3_000_000.0),
    ] {
        let kbps = allocate(duration, audio, target);
        let predicted_bytes = (kbps as f64 * 1000.0 + audio as f64) * duration / 8.0;
        assert!(predicted_bytes <= target, "{} > {}", predicted_bytes, target);
    }
}

/// The documented example: one hour, 128 kbps audio, 1.8 GiB
#[test]
fn test_allocate_oneHourMovie() {
    assert_eq!(allocate(3600.0, 128_000, 1.8 * GIB), 4166);
}

/// The minimum size is the threshold between rejected and accepted targets
#[test]
fn test_minimum_target_size_withSeveralDurations_shouldBeThreshold() {
    for duration in [1.0, 59.94, 600.0, 7200.0] {
        let minimum = minimum_target_size_bytes(duration, 128_000);
        assert!(allocate(duration, 128_000, minimum as f64) >= 1);
        assert!(allocate(duration, 128_000, minimum as f64 - 1.0) < 1);
    }
}
