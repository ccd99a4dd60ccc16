//! Parsing of the renderer's elapsed/remaining time codes.

use std::time::Duration;

/// Parses a renderer time code into a duration.
///
/// The renderer prints `MM:SS.CC` (minutes, seconds, centiseconds) and switches
/// to `HH:MM:SS.CC` once a render runs past the hour. Seconds and centiseconds
/// are always two digits wide; minutes are at least two.
///
/// Returns `None` for anything that doesn't have that shape.
pub fn parse_timecode(input: &str) -> Option<Duration> {
    let (clock, centis) = input.split_once('.')?;
    let centis = fixed_width(centis, 2)?;

    let mut fields = clock.rsplit(':');
    let seconds = fixed_width(fields.next()?, 2)?;
    if seconds >= 60 {
        return None;
    }

    let minutes_field = fields.next()?;
    if minutes_field.len() < 2 {
        return None;
    }
    let minutes = digits(minutes_field)?;
    let hours = match fields.next() {
        Some(hours) => {
            if minutes_field.len() != 2 || minutes >= 60 {
                return None;
            }
            digits(hours)?
        }
        None => 0,
    };
    if fields.next().is_some() {
        return None;
    }

    let total_seconds = (hours * 60 + minutes) * 60 + seconds;
    Some(Duration::from_millis(total_seconds * 1000 + centis * 10))
}

fn fixed_width(field: &str, width: usize) -> Option<u64> {
    if field.len() != width {
        return None;
    }
    digits(field)
}

fn digits(field: &str) -> Option<u64> {
    // Nine digits keeps the arithmetic below far from overflowing.
    if field.is_empty() || field.len() > 9 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}
