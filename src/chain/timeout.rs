//! Step timeout strings such as `10m`, `1d2h30m15s` or `500ms`.
use regex::Regex;
use std::sync::OnceLock;

fn segment_regex() -> &'static Regex {
    static SEGMENT: OnceLock<Regex> = OnceLock::new();
    SEGMENT.get_or_init(|| {
        Regex::new(r"(\d+)\s*(ms|w|d|h|m|s)").expect("regex for timeout segments")
    })
}

/// Parse a timeout into milliseconds. `None` for malformed or zero timeouts.
pub fn parse_timeout(raw: &str) -> Option<u64> {
    let compact: String = raw.split_whitespace().collect();
    if compact.is_empty() {
        return None;
    }
    let mut consumed = 0;
    let mut total: u64 = 0;
    for cap in segment_regex().captures_iter(&compact) {
        let whole = cap.get(0)?;
        if whole.start() != consumed {
            return None;
        }
        consumed = whole.end();
        let amount: u64 = cap[1].parse().ok()?;
        let unit_ms: u64 = match &cap[2] {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            "w" => 604_800_000,
            _ => return None,
        };
        total = total.checked_add(amount.checked_mul(unit_ms)?)?;
    }
    if consumed != compact.len() || total == 0 {
        return None;
    }
    Some(total)
}
