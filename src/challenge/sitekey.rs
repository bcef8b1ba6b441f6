//! reCAPTCHA site-key extraction from the challenge page

use regex::Regex;
use std::sync::OnceLock;

const SITE_KEY_PATTERNS: [&str; 2] = [
    // grecaptcha.render(..., {'sitekey': '...'})
    r#"['"]sitekey['"]\s*:\s*['"]([^'"]+)['"]"#,
    // <div class="g-recaptcha" data-sitekey="...">
    r#"data-sitekey\s*=\s*['"]([^'"]+)['"]"#,
];

fn site_key_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        SITE_KEY_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

/// Finds the embedded reCAPTCHA site-key in a challenge page body
pub fn extract_site_key(body: &str) -> Option<&str> {
    site_key_patterns()
        .iter()
        .find_map(|pattern| pattern.captures(body))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}
