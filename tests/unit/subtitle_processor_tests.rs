/*!
 * Tests for SRT reading and writing
 */

use std::fs;
use anyhow::Result;

use vidsqueeze::subtitle_processor::{SubtitleCollection, SubtitleEntry};
use crate::common;

/// Reading a file yields its entries with timing in milliseconds
#[test]
fn test_read_from_file_withSampleFile_shouldParseEntries() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "sample.srt")?;

    let collection = SubtitleCollection::read_from_file(&path)?;

    assert_eq!(collection.entries.len(), 3);
    assert_eq!(collection.entries[0], SubtitleEntry::new(1, 1000, 4000, "This is a test subtitle.".to_string()));
    assert_eq!(collection.entries[2].start_time_ms, 10_000);
    assert!(!collection.has_bom);
    assert!(!collection.crlf);
    Ok(())
}

/// Multi-line texts survive a write and a re-read
#[test]
fn test_write_to_srt_withMultilineText_shouldReadBackIdentical() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = "1\n00:00:01,500 --> 00:00:03,250\n- Who's there?\n- Nobody.\n\n2\n01:02:03,004 --> 01:02:05,000\n<i>Silence</i>\n\n";
    let source = common::create_test_file(temp_dir.path(), "dialog.srt", content)?;

    let collection = SubtitleCollection::read_from_file(&source)?;
    assert_eq!(collection.entries[0].text, "- Who's there?\n- Nobody.");
    assert_eq!(collection.entries[1].start_time_ms, 3_723_004);

    let copy = temp_dir.path().join("copy.srt");
    collection.write_to_srt(&copy)?;
    assert_eq!(fs::read_to_string(&copy)?, content);
    Ok(())
}

/// Blank lines inside a replacement text never split the block
#[test]
fn test_with_texts_withBlankLinesInText_shouldKeepEveryEntryWhole() -> Result<()> {
    let collection = SubtitleCollection::from_bytes(
        "two.srt".into(),
        b"1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nBye\n\n",
    )?;

    let replaced = collection.with_texts(vec!["a\n\nb".to_string(), "c\n   \nd\n".to_string()]);
    let reparsed = SubtitleCollection::parse_srt_string(&replaced.to_srt_string())?;

    assert_eq!(reparsed.len(), 2);
    assert_eq!(reparsed[0].text, "a\nb");
    assert_eq!(reparsed[1].text, "c\nd");
    assert_eq!(reparsed[1].seq_num, 2);
    Ok(())
}

/// Dot separators in timings are accepted and written back with commas
#[test]
fn test_parse_srt_string_withDotMilliseconds_shouldNormalize() -> Result<()> {
    let entries = SubtitleCollection::parse_srt_string("7\n00:00:02.100 --> 00:00:04.900\nHi\n")?;
    assert_eq!(entries[0].seq_num, 7);
    assert_eq!(entries[0].format_start_time(), "00:00:02,100");
    assert_eq!(entries[0].format_end_time(), "00:00:04,900");
    Ok(())
}

/// A file with no entries is rejected
#[test]
fn test_read_from_file_withNoEntries_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "empty.srt", "\n\n")?;
    assert!(SubtitleCollection::read_from_file(&path).is_err());
    Ok(())
}

/// Missing files are reported with their path
#[test]
fn test_read_from_file_withMissingFile_shouldMentionPath() {
    let error = SubtitleCollection::read_from_file("/definitely/not/here.srt").unwrap_err();
    assert!(format!("{:#}", error).contains("/definitely/not/here.srt"));
}
