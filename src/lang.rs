use std::collections::BTreeSet;

/// Tesseract language code to engine language code.
const LANG_MAP: &[(&str, &str)] = &[
    ("eng", "en"),
    ("kor", "korean"),
    ("chi_sim", "ch"),
    ("chi_tra", "chinese_cht"),
    ("jpn", "japan"),
    ("deu", "german"),
    ("fra", "french"),
    ("spa", "es"),
    ("por", "pt"),
    ("ita", "it"),
    ("rus", "ru"),
    ("ara", "ar"),
    ("hin", "hi"),
    ("vie", "vi"),
    ("tha", "th"),
    ("tur", "tr"),
    ("ukr", "uk"),
    ("pol", "pl"),
    ("nld", "nl"),
    ("nor", "no"),
    ("swe", "sv"),
    ("dan", "da"),
    ("fin", "fi"),
    ("hun", "hu"),
    ("ces", "cs"),
    ("ron", "ro"),
    ("bul", "bg"),
    ("hrv", "hr"),
    ("slk", "sk"),
    ("slv", "sl"),
    ("ell", "el"),
    ("heb", "he"),
    ("ind", "id"),
    ("msa", "ms"),
    ("tam", "ta"),
    ("tel", "te"),
    ("kan", "ka"),
    ("mar", "mr"),
    ("nep", "ne"),
    ("ben", "bn"),
    ("urd", "ur"),
    ("fas", "fa"),
    ("mya", "my"),
    ("khm", "km"),
    ("lao", "lo"),
    ("lat", "la"),
    ("est", "et"),
    ("lav", "lv"),
    ("lit", "lt"),
];

pub const DEFAULT_LANGUAGE: &str = "en";

/// Unknown codes are passed through unchanged.
pub fn tesseract_to_paddle(lang: &str) -> &str {
    LANG_MAP
        .iter()
        .find(|(tesseract, _)| *tesseract == lang)
        .map(|(_, paddle)| *paddle)
        .unwrap_or(lang)
}

pub fn supported_languages() -> BTreeSet<&'static str> {
    LANG_MAP.iter().map(|(tesseract, _)| *tesseract).collect()
}

/// Engine language for a host language list: the first entry, translated.
pub fn select_language(languages: &[String]) -> &str {
    languages
        .first()
        .map(|lang| tesseract_to_paddle(lang))
        .unwrap_or(DEFAULT_LANGUAGE)
}
