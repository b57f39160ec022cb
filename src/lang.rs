// src/lang.rs
//! Language detection for normalized feed text.
//!
//! `Unknown` is returned for short or ambiguous input instead of a guess.
//! Downstream, `Unknown` never triggers a translation (see [`needs_translation`]).

use std::fmt;

/// Inputs shorter than this (in chars, after trim) are not classified.
pub const MIN_DETECT_CHARS: usize = 10;
/// Classifier confidence below this is reported as `Unknown`.
pub const MIN_CONFIDENCE: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Language {
    /// ISO 639-1 when a two-letter code exists, ISO 639-3 otherwise.
    Code(String),
    Unknown,
}

impl Language {
    pub fn code(&self) -> Option<&str> {
        match self {
            Language::Code(c) => Some(c.as_str()),
            Language::Unknown => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code().unwrap_or("unknown"))
    }
}

pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Language;
}

/// Trigram classifier backed by `whatlang`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Language {
        let text = text.trim();
        if text.chars().count() < MIN_DETECT_CHARS {
            return Language::Unknown;
        }
        match whatlang::detect(text) {
            Some(info) if info.confidence() >= MIN_CONFIDENCE => {
                Language::Code(iso639_1(info.lang().code()).to_string())
            }
            _ => Language::Unknown,
        }
    }
}

/// Translate only when the text is in a *known* language other than `target`.
pub fn needs_translation(detected: &Language, target: &str) -> bool {
    match detected {
        Language::Code(code) => !code.eq_ignore_ascii_case(target),
        // Ambiguous text is assumed to already be in the target language.
        Language::Unknown => false,
    }
}

/// Map whatlang's ISO 639-3 codes to the two-letter codes translation APIs expect.
fn iso639_1(code3: &str) -> &str {
    match code3 {
        "por" => "pt",
        "eng" => "en",
        "spa" => "es",
        "fra" => "fr",
        "deu" => "de",
        "ita" => "it",
        "nld" => "nl",
        "rus" => "ru",
        "ukr" => "uk",
        "pol" => "pl",
        "ces" => "cs",
        "swe" => "sv",
        "dan" => "da",
        "nob" => "no",
        "fin" => "fi",
        "tur" => "tr",
        "ell" => "el",
        "ron" => "ro",
        "hun" => "hu",
        "cmn" => "zh",
        "jpn" => "ja",
        "kor" => "ko",
        "ara" => "ar",
        "heb" => "he",
        "hin" => "hi",
        "ind" => "id",
        "vie" => "vi",
        "tha" => "th",
        "cat" => "ca",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_unknown() {
        assert_eq!(WhatlangDetector.detect("Oil up"), Language::Unknown);
        assert_eq!(WhatlangDetector.detect("   "), Language::Unknown);
    }

    #[test]
    fn unknown_never_translates() {
        assert!(!needs_translation(&Language::Unknown, "pt"));
        assert!(!needs_translation(&Language::Code("PT".into()), "pt"));
        assert!(needs_translation(&Language::Code("en".into()), "pt"));
    }

    #[test]
    fn three_letter_codes_are_mapped() {
        assert_eq!(iso639_1("por"), "pt");
        assert_eq!(iso639_1("eng"), "en");
        assert_eq!(iso639_1("epo"), "epo");
    }
}
