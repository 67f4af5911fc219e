//! The built-in Helvetica font used for watermark and page number text
//!
//! Helvetica is one of the 14 standard PDF fonts, so nothing is embedded: the
//! font dictionary only names it. Widths come from the Adobe AFM metrics and
//! are needed to center text the same way a viewer will lay it out.

use lopdf::{Dictionary, Object};

/// Name of the standard font
pub const FONT_NAME: &[u8] = b"Helvetica";

/// Width used for codes with no glyph in either table (0x7F..=0x9F)
const DEFAULT_WIDTH: u16 = 556;

/// Helvetica advance widths for character codes 32..=126, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, // space ! " # $ % & '
    333, 333, 389, 584, 278, 333, 278, 278, // ( ) * + , - . /
    556, 556, 556, 556, 556, 556, 556, 556, // 0-7
    556, 556, 278, 278, 584, 584, 584, 556, // 8 9 : ; < = > ?
    1015, 667, 667, 722, 722, 667, 611, 778, // @ A-G
    722, 278, 500, 667, 556, 833, 722, 778, // H-O
    667, 778, 722, 667, 611, 722, 667, 944, // P-W
    667, 667, 611, 278, 278, 278, 469, 556, // X Y Z [ \ ] ^ _
    333, 556, 556, 500, 556, 556, 278, 556, // ` a-g
    556, 222, 222, 500, 222, 833, 556, 556, // h-o
    556, 556, 333, 500, 278, 556, 500, 722, // p-w
    500, 500, 500, 334, 260, 334, 584, // x y z { | } ~
];

/// Helvetica advance widths for WinAnsi codes 0xA0..=0xFF, in 1/1000 em
const HELVETICA_LATIN1_WIDTHS: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, // nbsp ¡ ¢ £ ¤ ¥ ¦ §
    333, 737, 370, 556, 584, 333, 737, 333, // ¨ © ª « ¬ shy ® ¯
    400, 584, 333, 333, 333, 556, 537, 278, // ° ± ² ³ ´ µ ¶ ·
    333, 333, 365, 556, 834, 834, 834, 611, // ¸ ¹ º » ¼ ½ ¾ ¿
    667, 667, 667, 667, 667, 667, 1000, 722, // À-Å Æ Ç
    667, 667, 667, 667, 278, 278, 278, 278, // È-Ë Ì-Ï
    722, 722, 778, 778, 778, 778, 778, 584, // Ð Ñ Ò-Ö ×
    778, 722, 722, 722, 722, 667, 667, 611, // Ø Ù-Ü Ý Þ ß
    556, 556, 556, 556, 556, 556, 889, 500, // à-å æ ç
    556, 556, 556, 556, 278, 278, 278, 278, // è-ë ì-ï
    556, 556, 556, 556, 556, 556, 556, 584, // ð ñ ò-ö ÷
    611, 556, 556, 556, 556, 500, 556, 500, // ø ù-ü ý þ ÿ
];

/// Create the Type1 font dictionary for Helvetica with WinAnsiEncoding
pub fn helvetica_font() -> Dictionary {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(FONT_NAME.to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    font
}

/// Encode text as single-byte WinAnsi codes
///
/// Latin-1 characters map to their own code; anything else becomes `?`.
pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            code @ 0x20..=0x7E | code @ 0xA0..=0xFF => code as u8,
            _ => b'?',
        })
        .collect()
}

/// Advance width of one encoded byte in 1/1000 em
fn glyph_width(code: u8) -> u16 {
    match code {
        32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
        0xA0..=0xFF => HELVETICA_LATIN1_WIDTHS[(code - 0xA0) as usize],
        _ => DEFAULT_WIDTH,
    }
}

/// Rendered width of `text` at `font_size`, in points
pub fn string_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = encode_text(text)
        .into_iter()
        .map(|code| u32::from(glyph_width(code)))
        .sum();
    units as f32 * font_size / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_table_covers_printable_ascii() {
        assert_eq!(HELVETICA_WIDTHS.len(), (b'~' - b' ' + 1) as usize);
        assert_eq!(glyph_width(b' '), 278);
        assert_eq!(glyph_width(b'~'), 584);
        assert_eq!(glyph_width(b'W'), 944);
    }

    #[test]
    fn test_latin1_widths() {
        assert_eq!(glyph_width(0xC9), 667); // É
        assert_eq!(glyph_width(0xA9), 737); // ©
        assert_eq!(glyph_width(0xBC), 834); // ¼
        assert_eq!(glyph_width(0xC6), 1000); // Æ
        assert_eq!(glyph_width(0xFF), 500); // ÿ
    }

    #[test]
    fn test_string_width_accented() {
        // É 667 + T 611 + É 667 = 1945
        let width = string_width("ÉTÉ", 10.0);
        assert!((width - 19.45).abs() < 0.001);
    }

    #[test]
    fn test_string_width_draft() {
        // D 722 + R 722 + A 667 + F 611 + T 611 = 3333
        let width = string_width("DRAFT", 40.0);
        assert!((width - 133.32).abs() < 0.001);
    }

    #[test]
    fn test_empty_string_has_no_width() {
        assert_eq!(string_width("", 72.0), 0.0);
    }

    #[test]
    fn test_encode_replaces_non_latin1() {
        assert_eq!(encode_text("Café"), vec![b'C', b'a', b'f', 0xE9]);
        assert_eq!(encode_text("日本"), b"??".to_vec());
    }

    #[test]
    fn test_font_dictionary() {
        let font = helvetica_font();
        assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
        assert_eq!(font.get(b"Subtype").unwrap().as_name().unwrap(), b"Type1");
    }
}
