//! Target-script detection.
//! A regex character-class heuristic: a string "is in the target script" when it
//! contains at least one letter of the script the target language is written in.
//! Governs whether a query needs translating into the English-only catalog and
//! whether results need translating back.

use regex::Regex;

/// Classifies strings as written (at least partly) in the target language's script.
#[derive(Debug, Clone)]
pub struct ScriptDetector {
    target_lang: String,
    pattern: Regex,
}

/// Character class for the script a language is written in.
fn script_class(lang: &str) -> &'static str {
    match lang {
        "ru" | "uk" | "be" | "bg" | "sr" | "mk" | "kk" | "ky" | "tg" | "mn" => r"\p{Cyrillic}",
        "el" => r"\p{Greek}",
        "zh" | "ja" => r"[\p{Han}\p{Hiragana}\p{Katakana}]",
        "ko" => r"\p{Hangul}",
        "ar" | "fa" | "ur" => r"\p{Arabic}",
        "he" => r"\p{Hebrew}",
        "hi" | "mr" | "ne" => r"\p{Devanagari}",
        "th" => r"\p{Thai}",
        "ka" => r"\p{Georgian}",
        "hy" => r"\p{Armenian}",
        // Latin-script targets: any non-Latin letter is the best available signal.
        _ => r"[\p{L}&&[^\p{Latin}]]",
    }
}

impl ScriptDetector {
    pub fn for_language(target_lang: &str) -> Result<Self, regex::Error> {
        let lang = target_lang.trim().to_lowercase();
        let pattern = Regex::new(script_class(&lang))?;
        Ok(Self {
            target_lang: lang,
            pattern,
        })
    }

    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    /// True when `text` contains a letter of the target script.
    pub fn is_target_script(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}
