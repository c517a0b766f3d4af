/// Removes thousands separators from the integer part. Commas must split it
/// into groups of three digits after a leading group of one to three.
fn strip_thousands(text: &str) -> Option<String> {
    if !text.contains(',') {
        return Some(text.to_string());
    }

    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let all_digits = |group: &str| group.bytes().all(|b| b.is_ascii_digit());
    let mut groups = integer.split(',');
    let first = groups.next()?;
    if first.is_empty() || first.len() > 3 || !all_digits(first) {
        return None;
    }

    let mut digits = format!("{sign}{first}");
    for group in groups {
        if group.len() != 3 || !all_digits(group) {
            return None;
        }
        digits.push_str(group);
    }
    if let Some(fraction) = fraction {
        digits.push('.');
        digits.push_str(fraction);
    }
    Some(digits)
}

fn parse_plain(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    strip_thousands(text)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parses a numeric cell leniently: surrounding whitespace, thousands
/// separators and a trailing `%` are accepted. Anything else is missing.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let text = raw.trim();
    let text = text.strip_suffix('%').unwrap_or(text);
    parse_plain(text.trim_end())
}

/// Parses a 0-1 fraction. A `%` suffix means the cell is on another scale,
/// so it is treated as missing rather than reinterpreted.
pub fn parse_fraction(raw: &str) -> Option<f64> {
    let text = raw.trim();
    if text.ends_with('%') {
        return None;
    }
    parse_plain(text)
}

/// Parses an integral code, accepting float-style exports such as `2.0`.
/// Non-integral values are missing.
pub fn parse_code(raw: &str) -> Option<i64> {
    let value = parse_numeric(raw)?;
    (value.fract() == 0.0 && value.abs() < i64::MAX as f64).then_some(value as i64)
}

/// Parses a year cell, accepting float-style exports such as `2016.0`.
pub fn parse_year(raw: &str) -> Option<i32> {
    parse_code(raw).and_then(|year| i32::try_from(year).ok())
}

/// Mean of the present values. `None` when nothing is present.
pub fn mean_present(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// `part / total * 100`, undefined for a zero or missing denominator.
pub fn share(part: Option<f64>, total: Option<f64>) -> Option<f64> {
    match (part, total) {
        (Some(part), Some(total)) if total != 0.0 => {
            Some(part / total * 100.0).filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}
