// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP string escaping (ISO 10303-21 section 6.4.3)

use std::fmt::Write;

/// Decode the raw contents of a STEP string literal (without the quotes)
pub fn decode_step_string(raw: &str) -> String {
    if !raw.contains('\'') && !raw.contains('\\') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(c) = rest.chars().next() {
        match c {
            '\'' if rest.starts_with("''") => {
                out.push('\'');
                rest = &rest[2..];
            }
            '\\' => {
                let (decoded, consumed) = decode_directive(rest);
                out.push_str(&decoded);
                rest = &rest[consumed..];
            }
            _ => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    out
}

/// Decode one backslash directive at the start of `s`
///
/// Returns the decoded text and the number of bytes consumed.
fn decode_directive(s: &str) -> (String, usize) {
    if s.starts_with("\\\\") {
        return ("\\".to_string(), 2);
    }

    if let Some(body) = s.strip_prefix("\\X2\\") {
        return decode_wide(body, 4).map_or_else(
            || ("\\".to_string(), 1),
            |(text, used)| (text, 4 + used),
        );
    }

    if let Some(body) = s.strip_prefix("\\X4\\") {
        return decode_wide(body, 8).map_or_else(
            || ("\\".to_string(), 1),
            |(text, used)| (text, 4 + used),
        );
    }

    if let Some(hex) = s.strip_prefix("\\X\\").and_then(|b| b.get(..2)) {
        if let Ok(byte) = u8::from_str_radix(hex, 16) {
            return (char::from(byte).to_string(), 5);
        }
    }

    if let Some(c) = s.strip_prefix("\\S\\").and_then(|b| b.chars().next()) {
        if c.is_ascii() {
            return (char::from(c as u8 + 0x80).to_string(), 3 + c.len_utf8());
        }
    }

    // Code page switch (\PA\ .. \PI\) carries no text
    let bytes = s.as_bytes();
    if bytes.len() >= 4 && bytes[1] == b'P' && bytes[2].is_ascii_uppercase() && bytes[3] == b'\\' {
        return (String::new(), 4);
    }

    ("\\".to_string(), 1)
}

/// Decode hex groups of `width` digits terminated by `\X0\`
fn decode_wide(body: &str, width: usize) -> Option<(String, usize)> {
    let end = body.find("\\X0\\")?;
    let hex = &body[..end];
    if hex.len() % width != 0 {
        return None;
    }

    let mut units = Vec::with_capacity(hex.len() / width);
    for chunk in hex.as_bytes().chunks(width) {
        let chunk = std::str::from_utf8(chunk).ok()?;
        units.push(u32::from_str_radix(chunk, 16).ok()?);
    }

    let text = if width == 4 {
        let wide: Vec<u16> = units.iter().map(|&u| u as u16).collect();
        char::decode_utf16(wide)
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    } else {
        units
            .into_iter()
            .map(|u| char::from_u32(u).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    };

    Some((text, end + 4))
}

/// Encode text as a STEP string literal, including the quotes
pub fn encode_step_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');

    let mut wide: Vec<u16> = Vec::new();
    for c in text.chars() {
        if (' '..='~').contains(&c) {
            flush_wide(&mut out, &mut wide);
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(c),
            }
        } else {
            let mut buf = [0u16; 2];
            wide.extend_from_slice(c.encode_utf16(&mut buf));
        }
    }
    flush_wide(&mut out, &mut wide);

    out.push('\'');
    out
}

fn flush_wide(out: &mut String, wide: &mut Vec<u16>) {
    if wide.is_empty() {
        return;
    }
    out.push_str("\\X2\\");
    for unit in wide.drain(..) {
        let _ = write!(out, "{:04X}", unit);
    }
    out.push_str("\\X0\\");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_untouched() {
        assert_eq!(decode_step_string("Wall 1"), "Wall 1");
        assert_eq!(encode_step_string("Wall 1"), "'Wall 1'");
    }

    #[test]
    fn test_quotes_and_backslashes() {
        assert_eq!(decode_step_string("it''s a \\\\ test"), "it's a \\ test");
        assert_eq!(encode_step_string("it's a \\ test"), "'it''s a \\\\ test'");
    }

    #[test]
    fn test_unicode_uses_x2() {
        let encoded = encode_step_string("내화 등급");
        assert_eq!(encoded, "'\\X2\\B0B4D654\\X0\\ \\X2\\B4F1AE09\\X0\\'");
        let inner = &encoded[1..encoded.len() - 1];
        assert_eq!(decode_step_string(inner), "내화 등급");
    }

    #[test]
    fn test_latin1_directives() {
        assert_eq!(decode_step_string("Gr\\X\\FC\\X\\DFe"), "Grüße");
        assert_eq!(decode_step_string("\\S\\|"), "ü");
        assert_eq!(decode_step_string("\\PA\\abc"), "abc");
    }
}
