//! Text encodings for the string-based codecs.
//!
//! Encoding is a plain byte conversion; decoding is lossy but
//! deterministic, substituting U+FFFD (or the raw Latin-1 interpretation)
//! instead of failing. That determinism is load-bearing for the XML codec,
//! which decodes input bytes with whatever encoding the document declares
//! even when the caller converted the string with a different one, so a
//! mismatch must yield a stable garbled string rather than an error.

/// Supported text encodings.
///
/// UTF-16 text carries a byte-order mark; UTF-8 does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Utf8
    }
}

impl Encoding {
    /// The label written into XML declarations.
    pub fn label(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Utf16Le => "utf-16",
            Encoding::Utf16Be => "utf-16be",
            Encoding::Latin1 => "iso-8859-1",
        }
    }

    /// Resolves a declaration label, case-insensitively. Unknown labels
    /// resolve to `None` and the caller falls back to its own encoding.
    pub fn for_label(label: &str) -> Option<Encoding> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Encoding::Utf8),
            "utf-16" | "utf16" | "utf-16le" | "utf16le" => Some(Encoding::Utf16Le),
            "utf-16be" | "utf16be" | "unicodefffe" => Some(Encoding::Utf16Be),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Some(Encoding::Latin1),
            _ => None,
        }
    }

    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Utf8 => text.as_bytes().to_vec(),
            Encoding::Utf16Le => text
                .encode_utf16()
                .flat_map(|unit| unit.to_le_bytes())
                .collect(),
            Encoding::Utf16Be => text
                .encode_utf16()
                .flat_map(|unit| unit.to_be_bytes())
                .collect(),
            // Characters outside the Latin-1 range substitute as '?'.
            Encoding::Latin1 => text
                .chars()
                .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
                .collect(),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            Encoding::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
            Encoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }

    /// The byte-order mark character the encoding prepends to produced
    /// text, if any.
    pub(crate) fn bom_char(&self) -> Option<char> {
        match self {
            Encoding::Utf16Le | Encoding::Utf16Be => Some('\u{FEFF}'),
            Encoding::Utf8 | Encoding::Latin1 => None,
        }
    }
}

fn decode_utf16(bytes: &[u8], combine: fn([u8; 2]) -> u16) -> String {
    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| combine([pair[0], pair[1]]))
        .collect();
    if bytes.len() % 2 == 1 {
        units.push(0xFFFD);
    }
    String::from_utf16_lossy(&units)
}

/// Detects a leading byte-order mark, returning the encoding it names and
/// the mark's byte length.
pub(crate) fn sniff_bom(bytes: &[u8]) -> Option<(Encoding, usize)> {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        Some((Encoding::Utf8, 3))
    } else if bytes.starts_with(&[0xFF, 0xFE]) {
        Some((Encoding::Utf16Le, 2))
    } else if bytes.starts_with(&[0xFE, 0xFF]) {
        Some((Encoding::Utf16Be, 2))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_round_trip() {
        let text = "prix: 12€, café";
        let bytes = Encoding::Utf8.encode(text);
        assert_eq!(Encoding::Utf8.decode(&bytes), text);
    }

    #[test]
    fn test_utf16_round_trips_both_orders() {
        let text = "smörgåsbord \u{1F980}";
        for encoding in [Encoding::Utf16Le, Encoding::Utf16Be] {
            let bytes = encoding.encode(text);
            assert_eq!(encoding.decode(&bytes), text);
        }
    }

    #[test]
    fn test_latin1_substitutes_out_of_range_characters() {
        let bytes = Encoding::Latin1.encode("café €");
        assert_eq!(bytes, b"caf\xe9 ?");
        assert_eq!(Encoding::Latin1.decode(&bytes), "café ?");
    }

    #[test]
    fn test_latin1_decode_of_utf8_bytes_is_deterministic_mojibake() {
        let bytes = Encoding::Utf8.encode("é");
        assert_eq!(Encoding::Latin1.decode(&bytes), "Ã©");
    }

    #[test]
    fn test_utf8_decode_replaces_invalid_sequences() {
        assert_eq!(Encoding::Utf8.decode(&[0x61, 0xFF, 0x62]), "a\u{FFFD}b");
    }

    #[test]
    fn test_utf16_decode_pads_odd_tail() {
        let mut bytes = Encoding::Utf16Le.encode("ab");
        bytes.push(0x00);
        assert_eq!(Encoding::Utf16Le.decode(&bytes), "ab\u{FFFD}");
    }

    #[test]
    fn test_bom_sniffing() {
        assert_eq!(
            sniff_bom(&[0xEF, 0xBB, 0xBF, b'x']),
            Some((Encoding::Utf8, 3))
        );
        assert_eq!(sniff_bom(&[0xFF, 0xFE, 0x00]), Some((Encoding::Utf16Le, 2)));
        assert_eq!(sniff_bom(&[0xFE, 0xFF, 0x00]), Some((Encoding::Utf16Be, 2)));
        assert_eq!(sniff_bom(b"<?xml"), None);
    }

    #[test]
    fn test_labels_resolve_case_insensitively() {
        assert_eq!(Encoding::for_label("UTF-8"), Some(Encoding::Utf8));
        assert_eq!(Encoding::for_label(" Utf-16 "), Some(Encoding::Utf16Le));
        assert_eq!(Encoding::for_label("ISO-8859-1"), Some(Encoding::Latin1));
        assert_eq!(Encoding::for_label("ebcdic"), None);
    }

    #[test]
    fn test_every_label_resolves_to_its_encoding() {
        for encoding in [
            Encoding::Utf8,
            Encoding::Utf16Le,
            Encoding::Utf16Be,
            Encoding::Latin1,
        ] {
            assert_eq!(Encoding::for_label(encoding.label()), Some(encoding));
        }
    }
}
