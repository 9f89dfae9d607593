/*!
 * Common test utilities for the vidsqueeze test suite
 */

use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Result;
use tempfile::TempDir;

/// Route library logs to the test output, once per process
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = r#"1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
It contains multiple entries.

3
00:00:10,000 --> 00:00:14,000
For testing purposes.
"#;
    create_test_file(dir, filename, content)
}

/// Writes an executable shell script
#[cfg(unix)]
pub fn create_script(dir: &Path, filename: &str, body: &str) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = create_test_file(dir, filename, &format!("#!/bin/sh\n{}\n", body))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// Scripted ffprobe answering the duration and audio bitrate queries
#[cfg(unix)]
pub fn create_fake_ffprobe(dir: &Path, duration: &str, audio_bitrate: &str) -> Result<PathBuf> {
    let body = format!(
        r#"case "$*" in
  *format=duration*) echo "{}" ;;
  *stream=bit_rate*) echo "{}" ;;
esac"#,
        duration, audio_bitrate
    );
    create_script(dir, "fake_ffprobe.sh", &body)
}

/// Scripted ffmpeg reporting progress then creating its output file
///
/// The output name is the argument before the trailing `-y`.
#[cfg(unix)]
pub fn create_fake_ffmpeg(dir: &Path) -> Result<PathBuf> {
    let body = r#"out=""
prev=""
for arg in "$@"; do out="$prev"; prev="$arg"; done
printf 'frame=  10 fps=0.0 size=   256kB time=00:00:15.00 bitrate= 139.8kbits/s\r' >&2
printf 'frame=  20 fps= 20 size=   512kB time=00:00:30.00 bitrate= 139.8kbits/s\r' >&2
printf 'frame=  30 fps= 20 size=   768kB time=00:00:45.00 bitrate= 139.8kbits/s\n' >&2
: > "$out""#;
    create_script(dir, "fake_ffmpeg.sh", body)
}

/// Scripted ffmpeg that fails after some diagnostics
#[cfg(unix)]
pub fn create_failing_ffmpeg(dir: &Path) -> Result<PathBuf> {
    let body = r#"echo "Input #0, mov,mp4,m4a,3gp,3g2,mj2" >&2
echo "Unknown encoder 'libx264'" >&2
exit 1"#;
    create_script(dir, "failing_ffmpeg.sh", body)
}
