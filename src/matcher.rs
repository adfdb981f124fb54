//! Request matching logic.
//!
//! Evaluates incoming requests against the configured rules and returns
//! the first rule whose predicates all hold.

use crate::config::RequestRule;
use axum::http::HeaderMap;
use regex::Regex;
use std::collections::HashMap;

/// Find the first rule matching a request, in declaration order.
///
/// Per-rule checks short-circuit cheapest-first: path, method, headers,
/// query parameters, body. Returning `None` is a normal outcome, not an
/// error.
///
/// `body` is the fully buffered request body; `None` means the body could
/// not be read, which fails any non-empty body pattern.
pub fn find_match<'a>(
    rules: &'a [RequestRule],
    method: &str,
    path: &str,
    query: &str,
    headers: &HeaderMap,
    body: Option<&[u8]>,
) -> Option<&'a RequestRule> {
    let query_params = parse_query_string(query);

    rules.iter().find(|rule| {
        rule.path == path
            && rule.method.eq_ignore_ascii_case(method)
            && matches_headers(&rule.headers, headers)
            && matches_query_params(&rule.query_params, &query_params)
            && matches_body(&rule.body, body)
    })
}

/// Match a single pattern against a value, with regex-or-exact duality.
///
/// The pattern is compiled as a regex and matched unanchored; a pattern
/// that fails to compile degrades to exact string equality. This lets
/// rule authors write either a literal value or a pattern in the same
/// field.
fn pattern_matches(pattern: &str, value: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(value),
        Err(_) => pattern == value,
    }
}

/// Check every header pattern in the rule against the request headers.
///
/// Header names are case-insensitive and only the first value per name is
/// considered; an absent header compares as the empty string. An empty
/// pattern map matches any request.
fn matches_headers(rule_headers: &HashMap<String, String>, headers: &HeaderMap) -> bool {
    rule_headers.iter().all(|(name, pattern)| {
        let value = headers
            .get(name.as_str())
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        pattern_matches(pattern, value)
    })
}

/// Check every query-parameter pattern in the rule against the decoded
/// query string.
///
/// An absent parameter compares as the empty string; parameters present
/// in the request but not named in the rule are ignored.
fn matches_query_params(
    rule_params: &HashMap<String, String>,
    query_params: &HashMap<String, String>,
) -> bool {
    rule_params.iter().all(|(name, pattern)| {
        let value = query_params.get(name).map(String::as_str).unwrap_or("");
        pattern_matches(pattern, value)
    })
}

/// Check the rule's body pattern against the raw request body.
///
/// An empty pattern matches any body, including an absent one. Unlike the
/// header and query matchers, an invalid pattern is a non-match rather
/// than an exact-equality fallback; body patterns are assumed to be
/// deliberate regexes.
fn matches_body(rule_body: &str, body: Option<&[u8]>) -> bool {
    if rule_body.is_empty() {
        return true;
    }
    let Some(body) = body else {
        return false;
    };
    match regex::bytes::Regex::new(rule_body) {
        Ok(re) => re.is_match(body),
        Err(_) => false,
    }
}

/// Parse a query string into decoded key-value pairs.
///
/// The first value wins when a parameter repeats.
fn parse_query_string(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for part in query.split('&') {
        if part.is_empty() {
            continue;
        }
        let (key, value) = part.split_once('=').unwrap_or((part, ""));
        params
            .entry(percent_decode(key))
            .or_insert_with(|| percent_decode(value));
    }

    params
}

/// Decode `%XX` escapes byte-wise and `+` as space.
///
/// Malformed escapes pass through literally.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
