use std::time::Duration;

/// Parse a clip time such as `00:01:00`, `01:30`, `1.02:00:00` or `00:00:05.5`.
///
/// Accepted shapes are `[d.]hh:mm[:ss[.fraction]]` and a bare integer, which
/// counts whole days. Components out of range (minutes above 59 and so on)
/// are rejected.
pub fn parse_timecode(text: &str) -> Option<Duration> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if !text.contains(':') {
        let days: u64 = parse_digits(text)?;
        return Some(Duration::from_secs(days.checked_mul(86_400)?));
    }

    let (days, clock) = match text.split_once('.') {
        Some((head, rest)) if !head.contains(':') => (parse_digits(head)?, rest),
        _ => (0, text),
    };

    let mut parts = clock.split(':');
    let hours: u64 = parse_digits(parts.next()?)?;
    let minutes: u64 = parse_digits(parts.next()?)?;
    let (seconds, nanos) = match parts.next() {
        Some(sec) => parse_seconds(sec)?,
        None => (0, 0),
    };
    if parts.next().is_some() || hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }

    let total = days
        .checked_mul(86_400)?
        .checked_add(hours * 3_600 + minutes * 60 + seconds)?;
    Some(Duration::new(total, nanos))
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_seconds(s: &str) -> Option<(u64, u32)> {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (s, None),
    };
    let whole = parse_digits(whole)?;

    let nanos = match frac {
        None => 0,
        Some(f) => {
            if f.is_empty() || f.len() > 9 || !f.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let padded = format!("{:0<9}", f);
            padded.parse().ok()?
        }
    };

    Some((whole, nanos))
}

/// Format as `hh:mm:ss.ff` (hours within the day, hundredths truncated)
pub fn format_timecode(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = (secs / 3_600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    let hundredths = duration.subsec_millis() / 10;
    format!(
        "{:02}:{:02}:{:02}.{:02}",
        hours, minutes, seconds, hundredths
    )
}

/// Parse the `HH:MM:SS.ff` captures ffmpeg prints into seconds
pub fn clock_to_seconds(hours: &str, minutes: &str, seconds: &str) -> Option<f64> {
    let h: f64 = hours.parse().ok()?;
    let m: f64 = minutes.parse().ok()?;
    let s: f64 = seconds.parse().ok()?;
    Some(h * 3_600.0 + m * 60.0 + s)
}
