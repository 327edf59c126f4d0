//! Decoding of C literal token text into values.
//!
//! The lexer hands back raw matched text; these helpers turn it into the
//! value the interpreter stores, applying C's literal-typing rules.

/// How an integer literal was suffixed/sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntLit {
    pub value: u64,
    pub unsigned: bool,
    /// 0 = none, 1 = `l`, 2 = `ll`.
    pub longs: u8,
}

/// Decode an integer literal (decimal, octal or hex, with `u`/`l`/`ll`
/// suffixes in any case or order).
pub fn decode_int(text: &str) -> Option<IntLit> {
    let bytes = text.as_bytes();
    let mut end = bytes.len();
    let mut unsigned = false;
    let mut longs: u8 = 0;
    while end > 0 {
        match bytes[end - 1] {
            b'u' | b'U' => {
                unsigned = true;
                end -= 1;
            }
            b'l' | b'L' => {
                longs += 1;
                end -= 1;
            }
            _ => break,
        }
    }
    if longs > 2 {
        return None;
    }
    let digits = &text[..end];
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        u64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<u64>().ok()?
    };
    Some(IntLit { value, unsigned, longs })
}

/// Decode a float literal. Returns the value and whether the `f` suffix
/// (single precision) was present.
pub fn decode_float(text: &str) -> Option<(f64, bool)> {
    let (digits, single) = match text.as_bytes().last() {
        Some(b'f') | Some(b'F') => (&text[..text.len() - 1], true),
        _ => (text, false),
    };
    digits.parse::<f64>().ok().map(|v| (v, single))
}

/// Decode one escape sequence starting after the backslash. Returns the
/// byte value and how many input bytes were consumed.
fn decode_escape(bytes: &[u8]) -> Option<(u8, usize)> {
    let (value, used) = match *bytes.first()? {
        b'n' => (b'\n', 1),
        b't' => (b'\t', 1),
        b'r' => (b'\r', 1),
        b'a' => (0x07, 1),
        b'b' => (0x08, 1),
        b'f' => (0x0c, 1),
        b'v' => (0x0b, 1),
        b'0'..=b'7' => {
            let mut v: u32 = 0;
            let mut n = 0;
            while n < 3 && n < bytes.len() && (b'0'..=b'7').contains(&bytes[n]) {
                v = v * 8 + u32::from(bytes[n] - b'0');
                n += 1;
            }
            ((v & 0xff) as u8, n)
        }
        b'x' => {
            let mut v: u32 = 0;
            let mut n = 1;
            while n < bytes.len() && bytes[n].is_ascii_hexdigit() {
                v = v * 16 + u32::from((bytes[n] as char).to_digit(16)?);
                n += 1;
            }
            if n == 1 {
                return None;
            }
            ((v & 0xff) as u8, n)
        }
        other => (other, 1),
    };
    Some((value, used))
}

/// Decode a char literal including the surrounding quotes. Multi-character
/// constants take the first character.
pub fn decode_char(text: &str) -> Option<u8> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?.as_bytes();
    match inner.first()? {
        b'\\' => decode_escape(&inner[1..]).map(|(v, _)| v),
        byte => Some(*byte),
    }
}

/// Decode a string literal including the surrounding quotes, resolving
/// escapes to bytes.
pub fn decode_string(text: &str) -> Option<Vec<u8>> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?.as_bytes();
    let mut out = Vec::with_capacity(inner.len());
    let mut i = 0;
    while i < inner.len() {
        if inner[i] == b'\\' {
            let (v, used) = decode_escape(&inner[i + 1..])?;
            out.push(v);
            i += 1 + used;
        } else {
            out.push(inner[i]);
            i += 1;
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn int_literal_bases_and_suffixes() {
        assert_eq!(decode_int("42"), Some(IntLit { value: 42, unsigned: false, longs: 0 }));
        assert_eq!(decode_int("0x1F"), Some(IntLit { value: 31, unsigned: false, longs: 0 }));
        assert_eq!(decode_int("017"), Some(IntLit { value: 15, unsigned: false, longs: 0 }));
        assert_eq!(decode_int("0"), Some(IntLit { value: 0, unsigned: false, longs: 0 }));
        assert_eq!(decode_int("7UL"), Some(IntLit { value: 7, unsigned: true, longs: 1 }));
        assert_eq!(decode_int("7ll"), Some(IntLit { value: 7, unsigned: false, longs: 2 }));
    }

    #[test]
    fn float_literal_suffix() {
        assert_eq!(decode_float("1.5"), Some((1.5, false)));
        assert_eq!(decode_float("1.5f"), Some((1.5, true)));
        assert_eq!(decode_float("1e3"), Some((1000.0, false)));
    }

    #[test]
    fn char_escapes() {
        assert_eq!(decode_char("'a'"), Some(b'a'));
        assert_eq!(decode_char(r"'\n'"), Some(b'\n'));
        assert_eq!(decode_char(r"'\0'"), Some(0));
        assert_eq!(decode_char(r"'\x41'"), Some(b'A'));
    }

    #[test]
    fn string_escapes() {
        assert_eq!(decode_string(r#""ab\tc""#), Some(b"ab\tc".to_vec()));
        assert_eq!(decode_string(r#""\x41\102\n""#), Some(b"AB\n".to_vec()));
        assert_eq!(decode_string(r#""""#), Some(Vec::new()));
    }
}
