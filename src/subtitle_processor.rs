use std::fs;
use std::fmt;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context};
use std::path::{Path, PathBuf};
use log::{debug, warn};
use crate::errors::SubtitleError;

// @module: SRT reading and writing

// @const: SRT timing line regex, accepting `.` as millisecond separator too
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("static regex")
});

const UTF8_BOM: &str = "\u{feff}";

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    // @field: Sequence number as written in the file
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text, lines joined with '\n', may be empty
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    /// Convert start time to formatted SRT timestamp
    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms)
    }

    /// Convert end time to formatted SRT timestamp
    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    /// Render the entry block with the given line ending
    fn render(&self, eol: &str) -> String {
        let mut block = format!(
            "{}{eol}{} --> {}{eol}",
            self.seq_num,
            self.format_start_time(),
            self.format_end_time(),
        );
        // a blank line would end the block early
        for line in self.text.lines().filter(|l| !l.trim().is_empty()) {
            block.push_str(line);
            block.push_str(eol);
        }
        block.push_str(eol);
        block
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render("\n"))
    }
}

/// Parsed subtitle file with the encoding details needed to write it back
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// Entries in file order
    pub entries: Vec<SubtitleEntry>,

    /// Whether the input started with a UTF-8 byte order mark
    pub has_bom: bool,

    /// Whether the input used CRLF line endings
    pub crlf: bool,
}

impl SubtitleCollection {
    /// Read and parse an SRT file
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
        let collection = Self::from_bytes(path.to_path_buf(), &bytes)?;
        debug!("Parsed {} subtitle entries from {}", collection.entries.len(), path.display());
        Ok(collection)
    }

    /// Parse raw file bytes, remembering BOM and line endings
    pub fn from_bytes(source_file: PathBuf, bytes: &[u8]) -> std::result::Result<Self, SubtitleError> {
        let content = std::str::from_utf8(bytes)
            .map_err(|e| SubtitleError::Encoding(format!("{}: {}", source_file.display(), e)))?;

        let has_bom = content.starts_with(UTF8_BOM);
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        let crlf = content.contains("\r\n");

        let entries = Self::parse_srt_string(content)
            .map_err(|_| SubtitleError::Empty(source_file.display().to_string()))?;

        Ok(SubtitleCollection {
            source_file,
            entries,
            has_bom,
            crlf,
        })
    }

    /// Parse SRT format string into subtitle entries
    ///
    /// Entries keep their file order and numbering. An entry whose text is
    /// empty is kept with empty text so the output lines up with the input.
    pub fn parse_srt_string(content: &str) -> std::result::Result<Vec<SubtitleEntry>, SubtitleError> {
        let mut entries: Vec<SubtitleEntry> = Vec::new();
        let mut lines = content.lines().enumerate().peekable();

        let mut pending_seq: Option<usize> = None;
        let mut current: Option<SubtitleEntry> = None;

        while let Some((line_no, line)) = lines.next() {
            let trimmed = line.trim();

            if let Some(entry) = current.as_mut() {
                if trimmed.is_empty() {
                    entries.extend(current.take());
                    continue;
                }

                // A new block without a blank separator
                let next_is_timing = lines
                    .peek()
                    .map(|(_, next)| TIMESTAMP_REGEX.is_match(next.trim()))
                    .unwrap_or(false);
                if next_is_timing && trimmed.parse::<usize>().is_ok() {
                    entries.extend(current.take());
                    pending_seq = trimmed.parse().ok();
                    continue;
                }

                if !entry.text.is_empty() {
                    entry.text.push('\n');
                }
                entry.text.push_str(trimmed);
                continue;
            }

            if trimmed.is_empty() {
                continue;
            }

            if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                let seq_num = pending_seq
                    .take()
                    .unwrap_or_else(|| entries.last().map(|e| e.seq_num + 1).unwrap_or(1));
                current = Some(SubtitleEntry::new(
                    seq_num,
                    Self::parse_timestamp_to_ms(&caps, 1),
                    Self::parse_timestamp_to_ms(&caps, 5),
                    String::new(),
                ));
                continue;
            }

            if let Ok(num) = trimmed.parse::<usize>() {
                pending_seq = Some(num);
                continue;
            }

            warn!("Unexpected text at line {} outside a subtitle block: {}", line_no + 1, trimmed);
        }

        entries.extend(current.take());

        if entries.is_empty() {
            return Err(SubtitleError::Empty("content".to_string()));
        }

        Ok(entries)
    }

    /// Parse timestamp captures to milliseconds
    fn parse_timestamp_to_ms(caps: &regex::Captures, start_idx: usize) -> u64 {
        let field = |offset: usize| -> u64 {
            caps.get(start_idx + offset)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        };

        (field(0) * 3600 + field(1) * 60 + field(2)) * 1000 + field(3)
    }

    /// Source texts in file order
    pub fn texts(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.text.clone()).collect()
    }

    /// Copy of this collection with each entry's text replaced, keeping timing and numbering
    pub fn with_texts(&self, texts: Vec<String>) -> Self {
        let entries = self
            .entries
            .iter()
            .zip(texts)
            .map(|(entry, text)| SubtitleEntry { text, ..entry.clone() })
            .collect();

        SubtitleCollection {
            source_file: self.source_file.clone(),
            entries,
            has_bom: self.has_bom,
            crlf: self.crlf,
        }
    }

    /// Serialize back to SRT with the original BOM and line endings
    pub fn to_srt_string(&self) -> String {
        let eol = if self.crlf { "\r\n" } else { "\n" };
        let mut out = String::new();
        if self.has_bom {
            out.push_str(UTF8_BOM);
        }
        for entry in &self.entries {
            out.push_str(&entry.render(eol));
        }
        out
    }

    /// Write subtitles to an SRT file
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        crate::file_utils::FileManager::write_to_file(path, &self.to_srt_string())
            .with_context(|| format!("Failed to write subtitle file: {}", path.display()))
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}
