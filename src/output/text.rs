//! Outcome text protocol
//!
//! A successful measurement renders as:
//!
//! ```text
//! [Start data]
//! 512.000000 498.250000 505.125000 510.000000 499.875000 501.500000
//! 503.000000
//! [End data]
//! Total 504.250000 MB/s
//! ```
//!
//! Six values per line with six decimals, space separated. The helper prints this
//! block on stdout and the process backend parses it back, so parsing is tolerant
//! of surrounding diagnostics and of any line-break convention.

/// Opening marker of the sample block
pub const START_MARKER: &str = "[Start data]";

/// Closing marker of the sample block
pub const END_MARKER: &str = "[End data]";

/// Samples per rendered line
pub const VALUES_PER_LINE: usize = 6;

/// Render samples and total score in the canonical format
pub fn render_outcome(samples: &[f64], total_score: f64) -> String {
    let mut out = String::with_capacity(samples.len() * 12 + 64);
    out.push_str(START_MARKER);
    out.push('\n');

    for line in samples.chunks(VALUES_PER_LINE) {
        let values: Vec<String> = line.iter().map(|v| format!("{:.6}", v)).collect();
        out.push_str(&values.join(" "));
        out.push('\n');
    }

    out.push_str(END_MARKER);
    out.push('\n');
    out.push_str(&format!("Total {:.6} MB/s", total_score));
    out
}

/// Extract the sample series from outcome text
///
/// Uses the first start marker and the last end marker. Returns `None` when
/// either marker is missing, they are out of order, or any token between them
/// is not a finite number.
pub fn parse_samples(text: &str) -> Option<Vec<f64>> {
    let start = text.find(START_MARKER)? + START_MARKER.len();
    let end = text.rfind(END_MARKER)?;
    if end < start {
        return None;
    }

    text[start..end]
        .split_whitespace()
        .map(|token| token.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect()
}

/// Extract the total score from the `Total <score> MB/s` line after the data block
pub fn parse_total(text: &str) -> Option<f64> {
    let tail = &text[text.rfind(END_MARKER)? + END_MARKER.len()..];

    tail.lines().find_map(|line| {
        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some("Total"), Some(value)) => value.parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    })
}

/// Last line of `text` that contains anything besides whitespace
pub fn last_non_empty_line(text: &str) -> Option<&str> {
    text.lines()
        .rev()
        .map(|line| line.trim_end_matches('\r'))
        .find(|line| !line.trim().is_empty())
}
