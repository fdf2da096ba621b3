//! Purpose: Best-effort repair of text damaged by encoding mix-ups before upload.
//! Exports: `repair_text`.
//! Role: Applied to item title, author, and contents after type/length checks.
//! Invariants: Deterministic and idempotent: `repair_text(repair_text(s)) == repair_text(s)`.
//! Invariants: Only rewrites byte sequences that decode as valid UTF-8; clean text is untouched.

/// Characters Windows-1252 places in 0x80..=0x9F. `None` slots fall back to
/// the Latin-1 control character with the same value.
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

pub fn repair_text(input: &str) -> String {
    let mut text = strip_terminal_escapes(input);
    while let Some(fixed) = fix_mojibake_pass(&text) {
        text = fixed;
    }
    normalize_line_breaks(&text)
}

/// The byte a character came from if it was produced by decoding one byte as
/// Windows-1252 (or Latin-1 for the slots Windows-1252 leaves undefined).
fn single_byte(ch: char) -> Option<u8> {
    let code = ch as u32;
    if code <= 0xFF {
        return Some(code as u8);
    }
    CP1252_HIGH
        .iter()
        .position(|slot| *slot == Some(ch))
        .map(|index| 0x80 + index as u8)
}

fn sequence_len(lead: u8) -> Option<usize> {
    match lead {
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

/// One left-to-right pass; `None` when nothing changed.
fn fix_mojibake_pass(text: &str) -> Option<String> {
    if text.is_ascii() {
        return None;
    }
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    let mut index = 0;

    while index < chars.len() {
        if let Some(decoded) = decode_sequence_at(&chars, index) {
            let (ch, consumed) = decoded;
            out.push(ch);
            index += consumed;
            changed = true;
            continue;
        }
        out.push(chars[index]);
        index += 1;
    }

    changed.then_some(out)
}

fn decode_sequence_at(chars: &[char], index: usize) -> Option<(char, usize)> {
    let lead = single_byte(chars[index])?;
    let len = sequence_len(lead)?;
    let tail = chars.get(index + 1..index + len)?;

    let mut bytes = Vec::with_capacity(len);
    bytes.push(lead);
    for ch in tail {
        let byte = single_byte(*ch)?;
        if !(0x80..=0xBF).contains(&byte) {
            return None;
        }
        bytes.push(byte);
    }

    let decoded = std::str::from_utf8(&bytes).ok()?;
    let mut decoded_chars = decoded.chars();
    let ch = decoded_chars.next()?;
    decoded_chars.next().is_none().then_some((ch, len))
}

/// Drop ANSI CSI sequences (`ESC [ <digits and ;> <letter>`).
fn strip_terminal_escapes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut index = 0;

    while index < chars.len() {
        if chars[index] == '\u{1b}' && chars.get(index + 1) == Some(&'[') {
            let mut end = index + 2;
            while end < chars.len() && (chars[end].is_ascii_digit() || chars[end] == ';') {
                end += 1;
            }
            if end < chars.len() && chars[end].is_ascii_alphabetic() {
                index = end + 1;
                continue;
            }
        }
        out.push(chars[index]);
        index += 1;
    }
    out
}

fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace(['\r', '\u{2028}', '\u{2029}', '\u{0085}'], "\n")
}
