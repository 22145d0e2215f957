//! String and number formatting helpers for widget text

/// Replace `{0}`, `{1}`, ... with the matching argument.
/// Placeholders without an argument are left as they are.
pub fn format_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            let arg = args.get(index)?;
            Some((arg, close))
        });
        match replaced {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape `& > < " '` for safe insertion into markup
pub fn html_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '>' => out.push_str("&gt;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Reverse of [`html_encode`], plus numeric character references
pub fn html_decode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let entity = after.find(';').and_then(|semi| {
            let decoded = decode_entity(&after[1..semi])?;
            Some((decoded, semi))
        });
        match entity {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "gt" => Some('>'),
        "lt" => Some('<'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Truncate to at most `max` characters, ending with `...`.
/// With `word_break`, cut at the last space that keeps the result in bounds.
pub fn ellipsis(s: &str, max: usize, word_break: bool) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    let head: String = s.chars().take(keep).collect();

    if word_break
        && let Some(space) = head.rfind(' ')
        && space > 0
    {
        return format!("{}...", &head[..space]);
    }
    format!("{}...", head)
}

/// Upper-case the first character
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Left-pad `s` with `pad` to at least `width` characters
pub fn left_pad(s: &str, width: usize, pad: char) -> String {
    let len = s.chars().count();
    let mut out: String = std::iter::repeat_n(pad, width.saturating_sub(len)).collect();
    out.push_str(s);
    out
}

/// Clamp `value` to `[min, max]`. NaN bounds are ignored.
pub fn constrain(value: f64, min: f64, max: f64) -> f64 {
    let mut v = value;
    if !min.is_nan() && v < min {
        v = min;
    }
    if !max.is_nan() && v > max {
        v = max;
    }
    v
}

/// Snap `value` to the nearest multiple of `increment` (measured from
/// `min`), then constrain to `[min, max]`. Increment 0 only constrains.
pub fn snap(value: f64, increment: f64, min: f64, max: f64) -> f64 {
    if increment == 0.0 || !increment.is_finite() {
        return constrain(value, min, max);
    }
    let origin = if min.is_finite() { min } else { 0.0 };
    let steps = ((value - origin) / increment).round();
    constrain(origin + steps * increment, min, max)
}

/// Fixed-point rendering with `precision` decimals
pub fn to_fixed(value: f64, precision: usize) -> String {
    format!("{:.*}", precision, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_template() {
        assert_eq!(format_template("Page {0} of {1}", &["2", "9"]), "Page 2 of 9");
        assert_eq!(format_template("{1}{0}{1}", &["a", "b"]), "bab");
        assert_eq!(format_template("{2} {x} {", &["a"]), "{2} {x} {");
        assert_eq!(format_template("no placeholders", &[]), "no placeholders");
    }

    #[test]
    fn test_html_roundtrip_chars() {
        let raw = r#"<a href="x">Tom & 'Jerry'</a>"#;
        let encoded = html_encode(raw);
        assert_eq!(
            encoded,
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
        assert_eq!(html_decode(&encoded), raw);
    }

    #[test]
    fn test_html_decode_entities() {
        assert_eq!(html_decode("&#65;&#x42;&nbsp;"), "AB\u{a0}");
        assert_eq!(html_decode("fish & chips &bogus;"), "fish & chips &bogus;");
        assert_eq!(html_decode("trailing &"), "trailing &");
    }

    #[test]
    fn test_ellipsis() {
        assert_eq!(ellipsis("short", 10, false), "short");
        assert_eq!(ellipsis("The quick brown fox", 10, false), "The qui...");
        assert_eq!(ellipsis("The quick brown fox", 12, true), "The...");
        assert_eq!(ellipsis("Averyveryverylongword", 10, true), "Averyve...");
    }

    #[test]
    fn test_capitalize_and_pad() {
        assert_eq!(capitalize("grid"), "Grid");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("élan"), "Élan");
        assert_eq!(left_pad("7", 3, '0'), "007");
        assert_eq!(left_pad("1234", 3, '0'), "1234");
    }

    #[test]
    fn test_number_helpers() {
        assert_eq!(constrain(15.0, 0.0, 10.0), 10.0);
        assert_eq!(constrain(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(constrain(5.0, f64::NAN, f64::NAN), 5.0);

        assert_eq!(snap(17.0, 5.0, 0.0, 100.0), 15.0);
        assert_eq!(snap(18.0, 5.0, 0.0, 100.0), 20.0);
        assert_eq!(snap(18.0, 5.0, 1.0, 100.0), 16.0);
        assert_eq!(snap(120.0, 5.0, 0.0, 100.0), 100.0);
        assert_eq!(snap(7.3, 0.0, 0.0, 5.0), 5.0);

        assert_eq!(to_fixed(3.14159, 2), "3.14");
        assert_eq!(to_fixed(2.0, 0), "2");
    }
}
