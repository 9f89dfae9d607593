use anyhow::{Result, Context};
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Extensions treated as video inputs when a directory is expanded
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v",
    "mpg", "mpeg", "ogv", "ts", "mts", "m2ts",
];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Append a suffix to the file stem, keeping the directory: `a/b.mp4` -> `a/b{suffix}.{extension}`
    pub fn sibling_with_suffix<P: AsRef<Path>>(input_file: P, suffix: &str, extension: &str) -> PathBuf {
        let input_file = input_file.as_ref();
        let stem = input_file.file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push_str(suffix);
        output_filename.push('.');
        output_filename.push_str(extension);

        match input_file.parent() {
            Some(parent) => parent.join(output_filename),
            None => PathBuf::from(output_filename),
        }
    }

    // @generates: `{stem}_compressed.{ext}` next to the source
    pub fn compressed_output_path<P: AsRef<Path>>(source: P, extension: &str) -> PathBuf {
        Self::sibling_with_suffix(source, "_compressed", extension)
    }

    // @generates: `{stem}_translated.srt` next to the input subtitle
    pub fn translated_output_path<P: AsRef<Path>>(subtitle: P) -> PathBuf {
        Self::sibling_with_suffix(subtitle, "_translated", "srt")
    }

    /// Express `target` relative to `base_dir`, e.g. `../subs/movie.srt`
    ///
    /// Both paths are made absolute against the current directory first; no
    /// symlinks are resolved. Returns `None` when the paths share no root
    /// (different drives on Windows).
    pub fn relative_to<P1: AsRef<Path>, P2: AsRef<Path>>(target: P1, base_dir: P2) -> Option<PathBuf> {
        let target = Self::lexical_absolute(target.as_ref()).ok()?;
        let base = Self::lexical_absolute(base_dir.as_ref()).ok()?;

        let target_parts: Vec<Component> = target.components().collect();
        let base_parts: Vec<Component> = base.components().collect();

        if target_parts.first() != base_parts.first() {
            return None;
        }

        let common = target_parts
            .iter()
            .zip(base_parts.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut relative = PathBuf::new();
        for _ in common..base_parts.len() {
            relative.push("..");
        }
        for part in &target_parts[common..] {
            relative.push(part.as_os_str());
        }
        Some(relative)
    }

    /// Absolute path with `.` and `..` folded without touching the filesystem
    fn lexical_absolute(path: &Path) -> Result<PathBuf> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .context("Failed to read current directory")?
                .join(path)
        };

        let mut out = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    out.pop();
                }
                other => out.push(other.as_os_str()),
            }
        }
        Ok(out)
    }

    /// Find files with a specific extension in a directory
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let extension = extension.trim_start_matches('.');
        Self::find_matching(dir, |ext| ext.eq_ignore_ascii_case(extension))
    }

    /// Find video files in a directory tree, skipping our own outputs
    pub fn find_videos<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut videos = Self::find_matching(dir, |ext| {
            VIDEO_EXTENSIONS.iter().any(|v| ext.eq_ignore_ascii_case(v))
        })?;
        videos.retain(|p| {
            !p.file_stem()
                .map(|s| s.to_string_lossy().ends_with("_compressed"))
                .unwrap_or(false)
        });
        Ok(videos)
    }

    fn find_matching<P, F>(dir: P, accept: F) -> Result<Vec<PathBuf>>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> bool,
    {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if accept(&ext.to_string_lossy()) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        Ok(result)
    }

    /// Expand a mix of file and directory arguments into video files
    pub fn expand_video_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for input in inputs {
            if Self::dir_exists(input) {
                files.extend(Self::find_videos(input)?);
            } else {
                // Missing files are kept so the job reports them
                files.push(input.clone());
            }
        }
        Ok(files)
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                Self::ensure_dir(parent)?;
            }
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }
}
