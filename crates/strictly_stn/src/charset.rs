//! Character set conversion of scanned property values to UTF-8.
//!
//! Values are scanned as bytes; once the `CA` property of a top-level game
//! tree is known, every value in that tree is decoded with it. Files without
//! `CA` are ISO-8859-1.

use tracing::{instrument, warn};

/// Character sets understood by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
pub enum Charset {
    /// UTF-8.
    #[strum(to_string = "UTF-8")]
    Utf8,
    /// ISO-8859-1.
    #[default]
    #[strum(to_string = "ISO-8859-1")]
    Latin1,
    /// 7-bit ASCII.
    #[strum(to_string = "US-ASCII")]
    Ascii,
    /// Windows code page 1252.
    #[strum(to_string = "windows-1252")]
    Windows1252,
}

/// Code points for bytes 0x80..=0x9F in code page 1252; zero means unassigned.
const CP1252_HIGH: [u16; 32] = [
    0x20AC, 0, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160, 0x2039,
    0x0152, 0, 0x017D, 0, 0, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, 0x02DC,
    0x2122, 0x0161, 0x203A, 0x0153, 0, 0x017E, 0x0178,
];

impl Charset {
    /// Resolves a charset label, case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        match label.as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "latin-1" | "l1" => {
                Some(Self::Latin1)
            }
            "us-ascii" | "ascii" => Some(Self::Ascii),
            "windows-1252" | "cp1252" => Some(Self::Windows1252),
            _ => None,
        }
    }

    /// Resolves a label, falling back to ISO-8859-1 for unknown names.
    #[instrument]
    pub fn from_label_or_default(label: &str) -> Self {
        Self::from_label(label).unwrap_or_else(|| {
            warn!(label, "Unknown charset, assuming ISO-8859-1");
            Self::Latin1
        })
    }

    /// Decodes bytes into a string.
    ///
    /// Invalid UTF-8 sequences become U+FFFD; ASCII input with high bytes is
    /// read as ISO-8859-1.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 | Self::Ascii => bytes.iter().map(|b| char::from(*b)).collect(),
            Self::Windows1252 => bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => match CP1252_HIGH[usize::from(b - 0x80)] {
                        0 => char::from(b),
                        code => char::from_u32(u32::from(code))
                            .unwrap_or(char::REPLACEMENT_CHARACTER),
                    },
                    _ => char::from(b),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve() {
        assert_eq!(Charset::from_label("UTF-8"), Some(Charset::Utf8));
        assert_eq!(Charset::from_label("iso-8859-1"), Some(Charset::Latin1));
        assert_eq!(Charset::from_label("klingon"), None);
        assert_eq!(Charset::from_label_or_default("klingon"), Charset::Latin1);
    }

    #[test]
    fn latin1_high_bytes() {
        assert_eq!(Charset::Latin1.decode(b"Gr\xfc\xdfe"), "Grüße");
        assert_eq!(Charset::Utf8.decode("Grüße".as_bytes()), "Grüße");
    }

    #[test]
    fn windows_quotes() {
        assert_eq!(Charset::Windows1252.decode(b"\x93hi\x94 \x80"), "\u{201C}hi\u{201D} €");
    }
}
