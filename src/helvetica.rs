//! Metrics and encoding of the standard Helvetica font, which every PDF viewer ships with.
//! Text is written with the `WinAnsiEncoding`, so only the characters of that code page
//! can be shown; everything else is replaced.

use unicode_normalization::UnicodeNormalization as _;

/// The name the font is registered under in the page resources.
pub const RESOURCE_NAME: &str = "F1";
/// The PostScript name of the font.
pub const BASE_FONT: &str = "Helvetica";
/// The byte written in place of characters missing from the code page.
const REPLACEMENT: u8 = b'?';

/// Advance widths in 1/1000 em for the codes 32 to 126 (from the Helvetica AFM).
const ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // space to /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0 to 9
    278, 278, 584, 584, 584, 556, 1015, // : to @
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A to M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N to Z
    278, 278, 278, 469, 556, 333, // [ to `
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a to m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n to z
    334, 260, 334, 584, // { to ~
];

/// Advance widths for the codes 160 to 255, where the code page matches Latin-1.
const LATIN1_WIDTHS: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // A0
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // B0
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // C0
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // D0
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // E0
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // F0
];

/// The characters of the 0x80 to 0x9F block, where the code page departs from Latin-1.
const WINDOWS_1252_EXTRAS: [(char, u8, u16); 27] = [
    ('€', 0x80, 556),
    ('‚', 0x82, 222),
    ('ƒ', 0x83, 556),
    ('„', 0x84, 333),
    ('…', 0x85, 1000),
    ('†', 0x86, 556),
    ('‡', 0x87, 556),
    ('ˆ', 0x88, 333),
    ('‰', 0x89, 1000),
    ('Š', 0x8A, 667),
    ('‹', 0x8B, 333),
    ('Œ', 0x8C, 1000),
    ('Ž', 0x8E, 611),
    ('‘', 0x91, 222),
    ('’', 0x92, 222),
    ('“', 0x93, 333),
    ('”', 0x94, 333),
    ('•', 0x95, 350),
    ('–', 0x96, 556),
    ('—', 0x97, 1000),
    ('˜', 0x98, 333),
    ('™', 0x99, 1000),
    ('š', 0x9A, 500),
    ('›', 0x9B, 333),
    ('œ', 0x9C, 944),
    ('ž', 0x9E, 500),
    ('Ÿ', 0x9F, 667),
];

/// Maps a character to its code in the `WinAnsiEncoding`, if it has one.
fn win_ansi_code(character: char) -> Option<u8> {
    match character as u32 {
        0x20..=0x7E | 0xA0..=0xFF => Some(character as u32 as u8),
        _ => WINDOWS_1252_EXTRAS
            .iter()
            .find(|(extra, _, _)| *extra == character)
            .map(|(_, code, _)| *code),
    }
}

/// Encodes the text in the `WinAnsiEncoding` after normalizing it in the NFC form,
/// so that decomposed accents coming from the data export still map onto a single code.
pub fn encode(text: &str) -> Vec<u8> {
    text.nfc()
        .map(|character| match win_ansi_code(character) {
            Some(code) => code,
            None => {
                log::warn!(
                    "Unable to encode the character {:?} with the Helvetica font, replacing it",
                    character
                );
                REPLACEMENT
            }
        })
        .collect()
}

/// The advance width of an encoded byte in 1/1000 em.
fn code_width(code: u8) -> u16 {
    match code {
        0x20..=0x7E => ASCII_WIDTHS[(code - 0x20) as usize],
        0xA0..=0xFF => LATIN1_WIDTHS[(code - 0xA0) as usize],
        _ => WINDOWS_1252_EXTRAS
            .iter()
            .find(|(_, extra_code, _)| *extra_code == code)
            .map(|(_, _, width)| *width)
            .unwrap_or(556),
    }
}

/// The width of the text in units of the font size.
pub fn string_unit_width(text: &str) -> f32 {
    encode(text)
        .into_iter()
        .map(|code| code_width(code) as f32)
        .sum::<f32>()
        / 1000.0
}
