use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for translation language codes
///
/// The translation service accepts a fixed list of codes, mostly ISO 639-1
/// with a few regional or 639-3 exceptions (`zh-cn`, `nso`). Users may also
/// type ISO 639-2/B, ISO 639-2/T or English names; those are mapped onto
/// the list here.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("English", "en"), ("French", "fr"), ("German", "de"), ("Spanish", "es"), ("Italian", "it"),
    ("Portuguese", "pt"), ("Russian", "ru"), ("Chinese", "zh-cn"), ("Japanese", "ja"), ("Korean", "ko"),
    ("Arabic", "ar"), ("Dutch", "nl"), ("Greek", "el"), ("Turkish", "tr"), ("Polish", "pl"), ("Czech", "cs"),
    ("Hungarian", "hu"), ("Romanian", "ro"), ("Bulgarian", "bg"), ("Ukrainian", "uk"), ("Serbian", "sr"),
    ("Croatian", "hr"), ("Slovak", "sk"), ("Swedish", "sv"), ("Finnish", "fi"), ("Danish", "da"),
    ("Norwegian", "no"), ("Hebrew", "he"), ("Hindi", "hi"), ("Vietnamese", "vi"), ("Indonesian", "id"),
    ("Malay", "ms"), ("Thai", "th"), ("Filipino", "tl"), ("Persian", "fa"), ("Urdu", "ur"), ("Bengali", "bn"),
    ("Slovenian", "sl"), ("Estonian", "et"), ("Latvian", "lv"), ("Lithuanian", "lt"), ("Georgian", "ka"),
    ("Armenian", "hy"), ("Azerbaijani", "az"), ("Albanian", "sq"), ("Macedonian", "mk"), ("Basque", "eu"),
    ("Catalan", "ca"), ("Galician", "gl"), ("Welsh", "cy"), ("Irish", "ga"), ("Scottish Gaelic", "gd"),
    ("Icelandic", "is"), ("Maltese", "mt"), ("Swahili", "sw"), ("Afrikaans", "af"), ("Zulu", "zu"),
    ("Xhosa", "xh"), ("Sesotho", "st"), ("Yoruba", "yo"), ("Igbo", "ig"), ("Hausa", "ha"), ("Somali", "so"),
    ("Amharic", "am"), ("Tigrinya", "ti"), ("Oromo", "om"), ("Kinyarwanda", "rw"), ("Kirundi", "rn"),
    ("Lingala", "ln"), ("Luganda", "lg"), ("Shona", "sn"), ("Sesotho sa Leboa", "nso"), ("Tswana", "tn"),
    ("Tsonga", "ts"), ("Venda", "ve"),
];

/// Whether a code is in the supported list as-is
pub fn is_supported(code: &str) -> bool {
    SUPPORTED_LANGUAGES.iter().any(|(_, c)| *c == code)
}

/// Map an ISO 639-2/B code onto its 639-2/T equivalent
fn bibliographic_to_terminology(code: &str) -> &str {
    match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        other => other,
    }
}

/// Find the list code whose primary subtag is `part1` (`zh` -> `zh-cn`)
fn find_by_primary_subtag(part1: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .map(|(_, c)| *c)
        .find(|c| c.split('-').next() == Some(part1))
}

/// Normalize a user-supplied language code or name to a supported code
pub fn normalize_language_code(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if is_supported(&normalized_code) {
        return Ok(normalized_code);
    }

    // English names, as shown by the `languages` command
    if let Some((_, c)) = SUPPORTED_LANGUAGES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(&normalized_code))
    {
        return Ok(c.to_string());
    }

    let primary = normalized_code.split(['-', '_']).next().unwrap_or_default();

    // Two-letter codes with an unsupported region (zh-tw, pt-br)
    if primary.len() == 2 {
        if let Some(c) = find_by_primary_subtag(primary) {
            return Ok(c.to_string());
        }
    }
    // Three-letter codes go through ISO 639-3 to reach the two-letter form
    else if primary.len() == 3 {
        let part2t = bibliographic_to_terminology(primary);
        if let Some(lang) = Language::from_639_3(part2t) {
            if let Some(c) = lang.to_639_1().and_then(find_by_primary_subtag) {
                return Ok(c.to_string());
            }
        }
    }

    Err(anyhow!("Unsupported language code: {}", code))
}

/// Get the display name for a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_language_code(code)?;
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(_, c)| *c == normalized)
        .map(|(name, _)| name.to_string())
        .ok_or_else(|| anyhow!("Failed to get language name for code: {}", normalized))
}

/// Check if two language codes represent the same supported language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_language_code(code1), normalize_language_code(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
