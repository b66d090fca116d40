//! Duration input and display.
//!
//! Accepted input forms:
//!
//! - plain seconds: `90`
//! - unit suffixes: `45s`, `5m`, `1h30m`, `2h5m10s`
//! - clock form: `MM:SS` or `HH:MM:SS`

use crate::error::ValidationError;

/// Total seconds from hours, minutes and seconds fields.
///
/// # Errors
/// Returns [`ValidationError::InvalidDuration`] on overflow.
pub fn from_hms(hours: u64, minutes: u64, seconds: u64) -> Result<u64, ValidationError> {
    hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(seconds))
        .ok_or_else(|| ValidationError::InvalidDuration(format!("{hours}h{minutes}m{seconds}s")))
}

/// Parse a duration in any of the accepted forms into seconds.
///
/// # Errors
/// Returns [`ValidationError::InvalidDuration`] for anything else.
pub fn parse_duration(input: &str) -> Result<u64, ValidationError> {
    let text = input.trim();
    let invalid = || ValidationError::InvalidDuration(input.to_string());

    if text.is_empty() {
        return Err(invalid());
    }
    if text.chars().all(|c| c.is_ascii_digit()) {
        return text.parse().map_err(|_| invalid());
    }
    if text.contains(':') {
        return parse_clock(text).ok_or_else(invalid);
    }
    parse_units(text).ok_or_else(invalid)
}

fn parse_clock(text: &str) -> Option<u64> {
    let fields: Vec<u64> = text
        .split(':')
        .map(|f| {
            if f.is_empty() || !f.chars().all(|c| c.is_ascii_digit()) {
                None
            } else {
                f.parse().ok()
            }
        })
        .collect::<Option<_>>()?;

    match fields.as_slice() {
        [m, s] if *s < 60 => from_hms(0, *m, *s).ok(),
        [h, m, s] if *m < 60 && *s < 60 => from_hms(*h, *m, *s).ok(),
        _ => None,
    }
}

fn parse_units(text: &str) -> Option<u64> {
    let mut total: u64 = 0;
    let mut digits = String::new();
    let mut last_rank = u8::MAX;

    for c in text.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let (rank, factor) = match c.to_ascii_lowercase() {
            'h' => (2, 3600),
            'm' => (1, 60),
            's' => (0, 1),
            _ => return None,
        };
        // Units must be given largest first and at most once.
        if digits.is_empty() || rank >= last_rank {
            return None;
        }
        let value: u64 = digits.parse().ok()?;
        total = total.checked_add(value.checked_mul(factor)?)?;
        digits.clear();
        last_rank = rank;
    }

    if !digits.is_empty() {
        return None;
    }
    Some(total)
}

/// Render seconds as `HH:MM:SS`.
pub fn format_hms(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
