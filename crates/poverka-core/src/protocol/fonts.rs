//! Font selection for protocol rendering.
//!
//! Cyrillic text needs an embedded TrueType font. Without one the builtin
//! Helvetica is used and the text is transliterated to ASCII.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// TrueType fonts with Cyrillic coverage found on common systems.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial Unicode.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Font the renderer will use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontChoice {
    /// TrueType file embedded into the document.
    External(PathBuf),
    /// Builtin Helvetica with transliterated text.
    Builtin,
}

impl FontChoice {
    /// Returns `true` if the font can show Cyrillic.
    pub fn is_unicode(&self) -> bool {
        matches!(self, FontChoice::External(_))
    }
}

/// Pick the configured font if it exists, else the first system font found.
pub fn resolve_font(configured: Option<&Path>) -> FontChoice {
    if let Some(path) = configured {
        if path.is_file() {
            return FontChoice::External(path.to_path_buf());
        }
        warn!("Configured protocol font {} not found", path.display());
    }
    resolve_from(SYSTEM_FONT_CANDIDATES.iter().map(Path::new))
}

fn resolve_from<'a>(candidates: impl IntoIterator<Item = &'a Path>) -> FontChoice {
    match candidates.into_iter().find(|p| p.is_file()) {
        Some(path) => {
            debug!("Using system font {}", path.display());
            FontChoice::External(path.to_path_buf())
        }
        None => {
            warn!("No Cyrillic TrueType font found, protocol text will be transliterated");
            FontChoice::Builtin
        }
    }
}

/// Transliterate Russian text and typographic symbols to printable ASCII.
pub fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }
        let lower = c.to_lowercase().next().unwrap_or(c);
        let mapped = match lower {
            'а' => "a",
            'б' => "b",
            'в' => "v",
            'г' => "g",
            'д' => "d",
            'е' => "e",
            'ё' => "e",
            'ж' => "zh",
            'з' => "z",
            'и' => "i",
            'й' => "y",
            'к' => "k",
            'л' => "l",
            'м' => "m",
            'н' => "n",
            'о' => "o",
            'п' => "p",
            'р' => "r",
            'с' => "s",
            'т' => "t",
            'у' => "u",
            'ф' => "f",
            'х' => "kh",
            'ц' => "ts",
            'ч' => "ch",
            'ш' => "sh",
            'щ' => "shch",
            'ъ' => "",
            'ы' => "y",
            'ь' => "",
            'э' => "e",
            'ю' => "yu",
            'я' => "ya",
            '№' => "No.",
            '°' => "deg",
            '±' => "+/-",
            '—' | '–' | '−' => "-",
            '↑' => "^",
            '↓' => "v",
            'δ' => "d",
            '\u{a0}' => " ",
            _ => "?",
        };
        if c.is_uppercase() {
            let mut chars = mapped.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        } else {
            out.push_str(mapped);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transliterate() {
        assert_eq!(transliterate("Протокол № 17"), "Protokol No. 17");
        assert_eq!(transliterate("Щит ±1.5%"), "Shchit +/-1.5%");
        assert_eq!(transliterate("21 °C"), "21 degC");
        assert_eq!(transliterate("Годен"), "Goden");
        assert!(transliterate("Δ=0.50 ↑↓").is_ascii());
    }

    #[test]
    fn test_resolve_configured_font() {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("font.ttf");
        std::fs::write(&font, b"not really a font").unwrap();
        assert_eq!(resolve_font(Some(&font)), FontChoice::External(font.clone()));
    }

    #[test]
    fn test_resolve_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.ttf");
        assert_eq!(resolve_from([missing.as_path()]), FontChoice::Builtin);
        assert!(!FontChoice::Builtin.is_unicode());
    }
}
