//! Canonical text encodings shared by every peer.
//!
//! Signatures are computed over text, so two implementations only agree if
//! they print JSON values and percent-escapes byte-for-byte alike. The
//! layout here is the one peers already emit: sorted keys, `", "` / `": "`
//! separators, ASCII-only escapes, and floats in shortest round-trip form
//! with a signed two-digit exponent outside `[1e-4, 1e16)`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Number, Value};

/// Everything except `A-Z a-z 0-9 - . _ ~` is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Clone, Copy)]
struct Separators {
    item: &'static str,
    key: &'static str,
}

const SPACED: Separators = Separators {
    item: ", ",
    key: ": ",
};

const COMPACT: Separators = Separators {
    item: ",",
    key: ":",
};

/// Sorted-key JSON with spaced separators, as used inside signatures.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, SPACED);
    out
}

/// Sorted-key JSON with compact separators, as used for encrypted bodies.
pub fn compact_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, COMPACT);
    out
}

/// Percent-encode `text` as a query-string component.
///
/// `*` becomes `%2A`, a space becomes `%20` (never `+`), `~` is kept.
pub fn percent_encode(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

/// Canonical JSON of `value`, percent-encoded.
pub fn encode_component(value: &Value) -> String {
    percent_encode(&canonical_json(value))
}

fn write_value(out: &mut String, value: &Value, seps: Separators) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&format_number(n)),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(seps.item);
                }
                write_value(out, item, seps);
            }
            out.push(']');
        }
        Value::Object(obj) => {
            let mut keys: Vec<&String> = obj.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(seps.item);
                }
                write_string(out, key);
                out.push_str(seps.key);
                write_value(out, &obj[key], seps);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
    }
    out.push('"');
}

fn format_number(n: &Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            return format_float(f);
        }
    }
    n.to_string()
}

/// Shortest round-trip float text in positional form for decimal exponents
/// in `[-4, 16)` and scientific form otherwise.
fn format_float(f: f64) -> String {
    // `{:e}` yields the shortest round-trip digits, e.g. "-1.2345e-5".
    let scientific = format!("{:e}", f);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return f.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return f.to_string();
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    if (-4..16).contains(&exponent) {
        if exponent >= 0 {
            let int_len = exponent as usize + 1;
            if digits.len() <= int_len {
                format!("{}{}{}.0", sign, digits, "0".repeat(int_len - digits.len()))
            } else {
                format!("{}{}.{}", sign, &digits[..int_len], &digits[int_len..])
            }
        } else {
            let zeros = "0".repeat((-exponent - 1) as usize);
            format!("{}0.{}{}", sign, zeros, digits)
        }
    } else {
        let (lead, rest) = digits.split_at(1);
        let fraction = if rest.is_empty() {
            String::new()
        } else {
            format!(".{}", rest)
        };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}{}{}e{}{:02}",
            sign,
            lead,
            fraction,
            exp_sign,
            exponent.unsigned_abs()
        )
    }
}
