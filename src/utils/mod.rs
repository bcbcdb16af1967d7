use distance::levenshtein;
use regex::RegexBuilder;

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.4;

pub fn parse_fuzzy_threshold(value: &str) -> Result<f64, String> {
    let trimmed = value.trim();
    let parsed: f64 = trimmed
        .parse()
        .map_err(|_| "expected a number between 0 and 1".to_string())?;
    if !(0.0..=1.0).contains(&parsed) {
        return Err("threshold must be between 0 and 1".to_string());
    }
    Ok(parsed)
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn is_safe_url(url: &str) -> bool {
    let u = url.trim().to_lowercase();
    u.starts_with('/') || u.starts_with("https://") || u.starts_with("http://")
}

pub fn safe_href(url: &str) -> &str {
    if is_safe_url(url) {
        url
    } else {
        "#"
    }
}

/// Escapes `text` and wraps case-insensitive occurrences of `query` in `<mark>`.
pub fn highlight(text: &str, query: &str) -> String {
    let q = query.trim();
    if q.is_empty() {
        return escape_html(text);
    }
    let re = match RegexBuilder::new(&regex::escape(q))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re,
        Err(_) => return escape_html(text),
    };

    let mut out = String::new();
    let mut last = 0;
    for m in re.find_iter(text) {
        out.push_str(&escape_html(&text[last..m.start()]));
        out.push_str("<mark>");
        out.push_str(&escape_html(m.as_str()));
        out.push_str("</mark>");
        last = m.end();
    }
    out.push_str(&escape_html(&text[last..]));
    out
}

pub fn contains_case_insensitive(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Best normalized edit distance between `pattern` and any window of
/// `haystack` with the pattern's length. 0.0 is an exact substring hit.
pub fn fuzzy_score(haystack: &str, pattern: &str) -> f64 {
    let pattern: Vec<char> = pattern.trim().to_lowercase().chars().collect();
    if pattern.is_empty() {
        return 0.0;
    }
    let hay: Vec<char> = haystack.to_lowercase().chars().collect();
    let needle: String = pattern.iter().collect();
    let plen = pattern.len();

    if hay.len() <= plen {
        let whole: String = hay.iter().collect();
        return levenshtein(&whole, &needle) as f64 / plen as f64;
    }

    let mut best = usize::MAX;
    for window in hay.windows(plen) {
        let candidate: String = window.iter().collect();
        let d = levenshtein(&candidate, &needle);
        if d < best {
            best = d;
            if best == 0 {
                break;
            }
        }
    }
    best as f64 / plen as f64
}

pub fn fuzzy_match(haystack: &str, pattern: &str, threshold: f64) -> bool {
    fuzzy_score(haystack, pattern) <= threshold
}

pub fn parse_hex_color(value: &str) -> Result<(u8, u8, u8), String> {
    let raw = value.trim();
    let hex = raw
        .strip_prefix('#')
        .ok_or_else(|| format!("expected '#rgb' or '#rrggbb', got '{raw}'"))?;
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return Err(format!("expected '#rgb' or '#rrggbb', got '{raw}'")),
    };
    let value =
        u32::from_str_radix(&expanded, 16).map_err(|_| format!("invalid hex color '{raw}'"))?;
    Ok((
        ((value >> 16) & 0xff) as u8,
        ((value >> 8) & 0xff) as u8,
        (value & 0xff) as u8,
    ))
}

pub fn format_hex_color(r: u8, g: u8, b: u8) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}
