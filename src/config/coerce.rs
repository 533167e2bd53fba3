//! Natural-type inference for substituted text.
//!
//! Mirrors how a YAML reader types an unquoted scalar, so that a value pulled
//! out of the environment ends up with the type it would have had if it had
//! been written into the file directly.

use super::value::ConfigValue;

/// Infers the most specific scalar type `s` spells.
///
/// Booleans and nulls match case-insensitively; the empty string and `~` are
/// null. Integers must fit in `i64`, otherwise the text stays a string.
pub fn infer_scalar(s: &str) -> ConfigValue {
    if s.eq_ignore_ascii_case("true") {
        return ConfigValue::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return ConfigValue::Boolean(false);
    }

    if s.is_empty() || s == "~" || s.eq_ignore_ascii_case("null") {
        return ConfigValue::Null;
    }

    if let Some(i) = parse_integer(s) {
        return ConfigValue::Integer(i);
    }

    if let Some(f) = parse_float(s) {
        return ConfigValue::Float(f);
    }

    ConfigValue::String(s.to_string())
}

/// Parses inline `[...]` or `{...}` text as a flow collection.
///
/// Returns `None` for anything that is not a well-formed sequence or mapping.
pub fn infer_collection(s: &str) -> Option<ConfigValue> {
    let trimmed = s.trim();
    if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
        return None;
    }

    let mut document: serde_yaml::Value = serde_yaml::from_str(trimmed).ok()?;
    document.apply_merge().ok()?;
    match ConfigValue::from_yaml(document).ok()? {
        value @ (ConfigValue::Sequence(_) | ConfigValue::Mapping(_)) => Some(value),
        _ => None,
    }
}

fn parse_integer(s: &str) -> Option<i64> {
    let (negative, body) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let magnitude = if let Some(hex) = body.strip_prefix("0x") {
        radix_digits(hex, 16)?
    } else if let Some(oct) = body.strip_prefix("0o") {
        radix_digits(oct, 8)?
    } else {
        radix_digits(body, 10)?
    };

    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
}

fn radix_digits(digits: &str, radix: u32) -> Option<i128> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    i128::from_str_radix(digits, radix).ok()
}

fn parse_float(s: &str) -> Option<f64> {
    let body = s.strip_prefix(['-', '+']).unwrap_or(s);
    let negative = s.starts_with('-');

    if body.eq_ignore_ascii_case(".inf") {
        return Some(if negative { f64::NEG_INFINITY } else { f64::INFINITY });
    }
    if s.eq_ignore_ascii_case(".nan") {
        return Some(f64::NAN);
    }

    if !looks_like_float(body) {
        return None;
    }
    s.parse::<f64>().ok()
}

// [0-9]* ( . [0-9]* )? ( [eE] [-+]? [0-9]+ )? with at least one mantissa
// digit, and at least a dot or an exponent.
fn looks_like_float(body: &str) -> bool {
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
        None => (body, None),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (mantissa, None),
    };

    let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !frac_part.map_or(true, all_digits) {
        return false;
    }
    if int_part.is_empty() && frac_part.map_or(true, str::is_empty) {
        return false;
    }

    match exponent {
        Some(exp) => {
            let digits = exp.strip_prefix(['-', '+']).unwrap_or(exp);
            !digits.is_empty() && all_digits(digits)
        }
        None => frac_part.is_some(),
    }
}
