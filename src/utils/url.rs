//! URL helpers: host normalization, origin extraction and tracking-parameter stripping

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Query parameters that never change page identity
const TRACKING_PARAMS: &[&str] = &[
    // UTM
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_id",
    // Ad click ids
    "fbclid",
    "gclid",
    "gclsrc",
    "msclkid",
    "dclid",
    "mc_cid",
    "mc_eid",
    // Analytics / email
    "_ga",
    "_gid",
    "_hsenc",
    "_hsmi",
    "mkt_tok",
    "ref",
    "ref_",
    "tag",
    "psc",
];

/// Session-like parameter names (cache busters, nonces, signatures)
static SESSION_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*_(ts|time|rnd|nonce|sig|cache)$").unwrap());

fn is_tracking_param(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("utm_")
        || TRACKING_PARAMS.contains(&lower.as_str())
        || SESSION_PARAM_RE.is_match(&lower)
}

/// Lower-case a host and strip presentation prefixes (`www.`, `m.`, `smile.`).
pub fn normalize_host(host: &str) -> String {
    let lower = host.trim().trim_end_matches('.').to_ascii_lowercase();
    for prefix in ["www.", "m.", "smile."] {
        if let Some(rest) = lower.strip_prefix(prefix) {
            return rest.to_string();
        }
    }
    lower
}

/// Normalize a page URL for use as a cooldown key.
///
/// Drops the fragment, tracking parameters and any trailing slash on a non-root
/// path. Unparsable input is returned trimmed.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut parsed) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };
    parsed.set_fragment(None);

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(path.trim_end_matches('/'));
    }
    parsed.to_string()
}

/// `scheme://host[:port]` for a URL; unparsable input is returned trimmed.
pub fn origin_of(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(parsed) => parsed.origin().ascii_serialization(),
        Err(_) => raw.trim().to_string(),
    }
}
