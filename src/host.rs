//! Bare host extraction from user-entered `host[:port]` strings

/// Strip a trailing `:port` from `raw`, leaving bracketed IPv6 literals intact.
///
/// - `[v6]:port` → `[v6]`; `[v6]` alone is returned unchanged
/// - `host:port` (exactly one colon) → `host`
/// - anything else, including unbracketed IPv6, is returned unchanged
pub fn parse_host(raw: &str) -> &str {
    if raw.contains('[') && raw.contains(']') {
        // contains(']') guarantees a match
        let close = raw.find(']').unwrap_or(raw.len() - 1);
        let (literal, rest) = raw.split_at(close + 1);
        return if rest.starts_with(':') { literal } else { raw };
    }

    if raw.matches(':').count() == 1 {
        return raw.split(':').next().unwrap_or(raw);
    }

    raw
}
