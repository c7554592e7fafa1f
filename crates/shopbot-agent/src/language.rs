// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Language detection restricted to the supported conversation languages.

use shopbot_core::Language;
use whatlang::{Detector, Lang};

/// Classifies free text as Russian or English.
///
/// Text without letters (digits, emoji, punctuation) or in a script neither
/// language uses is unclassified. Detection never fails loudly.
pub struct LanguageDetector {
    detector: Detector,
    fallback: Language,
}

impl LanguageDetector {
    pub fn new(fallback: Language) -> Self {
        Self {
            detector: Detector::with_allowlist(vec![Lang::Rus, Lang::Eng]),
            fallback,
        }
    }

    /// The detected language, or `None` when the text cannot be classified.
    pub fn classify(&self, text: &str) -> Option<Language> {
        if !text.chars().any(char::is_alphabetic) {
            return None;
        }
        match self.detector.detect_lang(text)? {
            Lang::Rus => Some(Language::Ru),
            Lang::Eng => Some(Language::En),
            _ => None,
        }
    }

    /// The detected language, or the fallback.
    pub fn detect(&self, text: &str) -> Language {
        self.classify(text).unwrap_or(self.fallback)
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyrillic_is_russian() {
        let detector = LanguageDetector::default();
        assert_eq!(detector.detect("Привет"), Language::Ru);
        assert_eq!(
            detector.detect("Сколько стоит этот товар?"),
            Language::Ru
        );
    }

    #[test]
    fn latin_is_english() {
        let detector = LanguageDetector::default();
        assert_eq!(detector.detect("Do you sell Widget"), Language::En);
    }

    #[test]
    fn unclassifiable_text_falls_back() {
        let detector = LanguageDetector::new(Language::Ru);
        for text in ["", "   ", "12345", "🙂🙂", "?!"] {
            assert_eq!(detector.classify(text), None, "text: {text:?}");
            assert_eq!(detector.detect(text), Language::Ru);
        }
    }

    #[test]
    fn unsupported_script_is_unclassified() {
        let detector = LanguageDetector::default();
        assert_eq!(detector.classify("你好，我想买东西"), None);
    }
}
