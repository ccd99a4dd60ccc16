//! Grammar for the renderer's per-frame progress lines.
//!
//! A progress line looks like:
//!
//! ```text
//! Fra:12 Mem:24.5M (Peak 30M) | Time:01:23.45 | Remaining:00:05.00 | Mem:20.10M, Peak:22.50M | SceneA, ViewLayer | Synchronizing Objects | Cube
//! ```
//!
//! The line is split on `|` into segments and each segment is matched against
//! its labelled shape. The `Remaining:` segment and the trailing extra
//! information segment are optional; everything else must be present or the
//! line is not a progress line at all.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::timecode::parse_timecode;

/// One parsed progress line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Frame being rendered.
    pub frame: u32,
    /// Global memory usage in megabytes.
    pub memory_global: f64,
    /// Time since the render started.
    #[serde(with = "duration_ms")]
    pub render_time: Duration,
    /// Estimated time left, when the renderer printed one.
    #[serde(default, with = "option_duration_ms")]
    pub remaining_time: Option<Duration>,
    /// Current memory usage in megabytes.
    pub memory_current: f64,
    /// Peak memory usage in megabytes.
    pub memory_current_peak: f64,
    /// Scene name.
    pub scene: String,
    /// Render (view) layer name.
    pub render_layer: String,
    /// Status text, e.g. `Synchronizing Objects` or `Sample 12/128`.
    pub information: String,
    /// Additional status text following the status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_information: Option<String>,
}

/// Parses one line of renderer output.
///
/// Returns `None` for anything that is not a complete progress line: banners,
/// warnings, blank lines and truncated progress lines are all expected on the
/// renderer's stdout and are simply not records.
pub fn parse_line(line: &str) -> Option<ProgressRecord> {
    let mut segments = Segments::new(line.trim_end_matches(['\r', '\n']));

    let (frame, memory_global) = parse_header(segments.next()?)?;
    let render_time = parse_labelled_timecode(segments.next()?, "Time:")?;

    let mut segment = segments.next()?;
    let remaining_time = match segment.strip_prefix("Remaining:") {
        Some(code) => {
            let remaining = parse_timecode(code.trim())?;
            segment = segments.next()?;
            Some(remaining)
        }
        None => None,
    };

    let (memory_current, memory_current_peak) = parse_memory(segment)?;
    let (scene, render_layer) = parse_scene_layer(segments.next()?)?;

    let information = segments.next()?;
    if information.is_empty() {
        return None;
    }

    let extra_information = segments
        .remainder()
        .map(str::trim)
        .filter(|extra| !extra.is_empty())
        .map(str::to_string);

    Some(ProgressRecord {
        frame,
        memory_global,
        render_time,
        remaining_time,
        memory_current,
        memory_current_peak,
        scene,
        render_layer,
        information: information.to_string(),
        extra_information,
    })
}

/// Walks the `|`-delimited segments of a line.
struct Segments<'a> {
    rest: Option<&'a str>,
}

impl<'a> Segments<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: Some(line) }
    }

    /// Next segment, trimmed.
    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest?;
        match rest.split_once('|') {
            Some((segment, tail)) => {
                self.rest = Some(tail);
                Some(segment.trim())
            }
            None => {
                self.rest = None;
                Some(rest.trim())
            }
        }
    }

    /// Everything not consumed yet, pipes included.
    fn remainder(&mut self) -> Option<&'a str> {
        self.rest.take()
    }
}

/// `Fra:<int> Mem:<float>M (...)`
fn parse_header(segment: &str) -> Option<(u32, f64)> {
    let rest = segment.strip_prefix("Fra:")?;
    let (frame, rest) = rest.split_once(' ')?;
    let frame = parse_unsigned(frame)?;

    let rest = rest.trim_start().strip_prefix("Mem:")?;
    let (memory, rest) = rest.split_once('M')?;
    let memory = parse_megabytes(memory)?;

    let detail = rest.trim();
    if !(detail.starts_with('(') && detail.ends_with(')')) {
        return None;
    }

    Some((frame, memory))
}

fn parse_labelled_timecode(segment: &str, label: &str) -> Option<Duration> {
    parse_timecode(segment.strip_prefix(label)?.trim())
}

/// `Mem:<float>M, Peak:<float>M`
fn parse_memory(segment: &str) -> Option<(f64, f64)> {
    let (current, peak) = segment.split_once(',')?;
    let current = current.trim().strip_prefix("Mem:")?.strip_suffix('M')?;
    let peak = peak.trim().strip_prefix("Peak:")?.strip_suffix('M')?;
    Some((parse_megabytes(current)?, parse_megabytes(peak)?))
}

/// `<scene>, <render layer>`, split on the first comma only.
fn parse_scene_layer(segment: &str) -> Option<(String, String)> {
    let (scene, layer) = segment.split_once(',')?;
    Some((scene.trim().to_string(), layer.trim().to_string()))
}

fn parse_unsigned(field: &str) -> Option<u32> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Plain decimal: digits with at most one `.`, no sign, no exponent.
fn parse_megabytes(field: &str) -> Option<f64> {
    let mut seen_digit = false;
    let mut seen_point = false;
    for b in field.bytes() {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_point => seen_point = true,
            _ => return None,
        }
    }
    if !seen_digit {
        return None;
    }
    field.parse().ok()
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod option_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYNC_LINE: &str = "Fra:12 Mem:24.5M (Peak 30M) | Time:01:23.45 | Remaining:00:05.00 | Mem:20.10M, Peak:22.50M | SceneA, ViewLayer | Synchronizing Objects";

    #[test]
    fn test_parse_full_line() {
        let record = parse_line(SYNC_LINE).unwrap();
        assert_eq!(
            record,
            ProgressRecord {
                frame: 12,
                memory_global: 24.5,
                render_time: Duration::from_millis(83_450),
                remaining_time: Some(Duration::from_millis(5_000)),
                memory_current: 20.10,
                memory_current_peak: 22.50,
                scene: "SceneA".to_string(),
                render_layer: "ViewLayer".to_string(),
                information: "Synchronizing Objects".to_string(),
                extra_information: None,
            }
        );
    }

    #[test]
    fn test_parse_without_remaining() {
        let line = "Fra:1 Mem:24.52M (0.00M, Peak 24.52M) | Time:00:00.37 | Mem:0.00M, Peak:0.00M | Scene, View Layer | Synchronizing object | Cube";
        let record = parse_line(line).unwrap();
        assert_eq!(record.frame, 1);
        assert_eq!(record.remaining_time, None);
        assert_eq!(record.render_time, Duration::from_millis(370));
        assert_eq!(record.scene, "Scene");
        assert_eq!(record.render_layer, "View Layer");
        assert_eq!(record.information, "Synchronizing object");
        assert_eq!(record.extra_information.as_deref(), Some("Cube"));
    }

    #[test]
    fn test_parse_remaining_and_extra() {
        let line = "Fra:250 Mem:180.00M (Peak 210.00M) | Time:12:01.50 | Remaining:01:02:03.00 | Mem:150.25M, Peak:160.00M | Shot 010, Layer, Foreground | Rendered 12/64 Tiles | Sample 128/128";
        let record = parse_line(line).unwrap();
        assert_eq!(record.remaining_time, Some(Duration::from_millis(3_723_000)));
        assert_eq!(record.scene, "Shot 010");
        assert_eq!(record.render_layer, "Layer, Foreground");
        assert_eq!(record.information, "Rendered 12/64 Tiles");
        assert_eq!(record.extra_information.as_deref(), Some("Sample 128/128"));
    }

    #[test]
    fn test_extra_information_keeps_later_pipes() {
        let line = "Fra:3 Mem:1M (x) | Time:00:01.00 | Mem:1M, Peak:1M | S, L | Info | a | b";
        let record = parse_line(line).unwrap();
        assert_eq!(record.extra_information.as_deref(), Some("a | b"));
    }

    #[test]
    fn test_trailing_carriage_return() {
        let line = format!("{}\r", SYNC_LINE);
        assert_eq!(parse_line(&line), parse_line(SYNC_LINE));
    }

    #[test]
    fn test_non_progress_lines() {
        for line in [
            "",
            "   ",
            "Blender 2.83.0 (hash 211b6c29f771 built 2020-06-03 15:39:28)",
            "Read blend: /tmp/scene.blend",
            "Saved: '/tmp/out/0001.png'",
            "Warning: unable to open font",
            "Fra:1 Mem:24.52M (0.00M, Peak 24.52M) | Time:00:00.37",
        ] {
            assert!(parse_line(line).is_none(), "line {:?}", line);
        }
    }

    #[test]
    fn test_rejects_missing_mandatory_fields() {
        for line in [
            // no parenthesised detail
            "Fra:1 Mem:2M | Time:00:01.00 | Mem:1M, Peak:1M | S, L | Info",
            // negative frame
            "Fra:-1 Mem:2M (x) | Time:00:01.00 | Mem:1M, Peak:1M | S, L | Info",
            // bad timecode width
            "Fra:1 Mem:2M (x) | Time:0:01.0 | Mem:1M, Peak:1M | S, L | Info",
            // malformed remaining
            "Fra:1 Mem:2M (x) | Time:00:01.00 | Remaining:soon | Mem:1M, Peak:1M | S, L | Info",
            // no peak
            "Fra:1 Mem:2M (x) | Time:00:01.00 | Mem:1M | S, L | Info",
            // scene without layer
            "Fra:1 Mem:2M (x) | Time:00:01.00 | Mem:1M, Peak:1M | Scene | Info",
            // no information
            "Fra:1 Mem:2M (x) | Time:00:01.00 | Mem:1M, Peak:1M | S, L",
            "Fra:1 Mem:2M (x) | Time:00:01.00 | Mem:1M, Peak:1M | S, L |   ",
            // signed and exponent memory values
            "Fra:1 Mem:-2M (x) | Time:00:01.00 | Mem:1M, Peak:1M | S, L | Info",
            "Fra:1 Mem:2M (x) | Time:00:01.00 | Mem:1e3M, Peak:1M | S, L | Info",
        ] {
            assert!(parse_line(line).is_none(), "line {:?}", line);
        }
    }

    #[test]
    fn test_reparse_is_stable() {
        assert_eq!(parse_line(SYNC_LINE), parse_line(SYNC_LINE));
    }

    #[test]
    fn test_record_serializes_durations_as_millis() {
        let record = parse_line(SYNC_LINE).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["render_time"], 83_450);
        assert_eq!(json["remaining_time"], 5_000);
        assert!(json.get("extra_information").is_none());

        let parsed: ProgressRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }
}
