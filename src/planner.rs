//! Turns parsed subtitles into overlay specifications for a renderer.
//!
//! Planning is a pure transformation: one [`OverlaySpec`] per [`Subtitle`],
//! in input order, with the text wrapped and the position and style taken
//! from [`PlanOptions`].

use crate::error::OverlayError;
use crate::layout::wrap;
use crate::srt::Subtitle;

use std::time::Duration;

use regex::Regex;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizontal {
    Center,
}

/// Where an overlay is placed on the output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Anchor {
    pub horizontal: Horizontal,
    /// Distance of the overlay's top edge from the top of the frame, in pixels.
    pub y: u32,
}

impl Default for Anchor {
    fn default() -> Self {
        Self {
            horizontal: Horizontal::Center,
            y: 650,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayStyle {
    /// A fixed-width font family.
    pub font: String,
    pub font_size: u32,
    pub color: String,
    pub background: String,
    pub frame_width: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font: "Courier".to_string(),
            font_size: 40,
            color: "white".to_string(),
            background: "black".to_string(),
            frame_width: 1080,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Maximum line width, in characters.
    pub width: usize,
    pub anchor: Anchor,
    pub style: OverlayStyle,
    /// Remove SRT formatting tags (`<i>`, `{\an8}`, ...) before wrapping.
    pub strip_markup: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            width: 40,
            anchor: Anchor::default(),
            style: OverlayStyle::default(),
            strip_markup: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlaySpec {
    pub lines: Vec<String>,
    pub anchor: Anchor,
    #[serde(rename = "start_secs", serialize_with = "as_secs")]
    pub start: Duration,
    #[serde(rename = "duration_secs", serialize_with = "as_secs")]
    pub duration: Duration,
    pub style: OverlayStyle,
}

impl OverlaySpec {
    pub fn end(&self) -> Duration {
        self.start + self.duration
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

fn as_secs<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

pub fn build_plan(
    entries: &[Subtitle],
    options: &PlanOptions,
) -> Result<Vec<OverlaySpec>, OverlayError> {
    if options.width == 0 {
        return Err(OverlayError::InvalidConfig(
            "wrap width must be at least 1".to_string(),
        ));
    }

    let markup = if options.strip_markup {
        Some(markup_regex()?)
    } else {
        None
    };

    let mut plan = Vec::with_capacity(entries.len());
    for (idx, sub) in entries.iter().enumerate() {
        if sub.hide_at <= sub.show_at {
            return Err(OverlayError::InvalidTiming {
                index: idx + 1,
                start: sub.show_at,
                end: sub.hide_at,
            });
        }

        let content = sub.content();
        let content = match &markup {
            Some(re) => re.replace_all(&content, "").into_owned(),
            None => content,
        };

        plan.push(OverlaySpec {
            lines: wrap(&content, options.width),
            anchor: options.anchor,
            start: sub.show_at,
            duration: sub.hide_at - sub.show_at,
            style: options.style.clone(),
        });
    }

    warn_overlaps(&plan);
    log::info!("Planned {} overlays", plan.len());
    Ok(plan)
}

fn markup_regex() -> Result<Regex, OverlayError> {
    Regex::new(r"</?[A-Za-z][^>]*>|\{\\[^}]*\}")
        .map_err(|err| OverlayError::InvalidConfig(format!("bad markup pattern: {}", err)))
}

/// Overlapping overlays are drawn together, later ones on top.
fn warn_overlaps(plan: &[OverlaySpec]) {
    for (earlier, later) in overlaps(plan) {
        log::warn!(
            "Subtitles {} and {} overlap; both will be shown at once",
            earlier,
            later
        );
    }
}

/// 1-based index pairs `(earlier, later)`: each overlay that starts before an
/// earlier one has ended, paired with the earlier overlay that ends last.
fn overlaps(plan: &[OverlaySpec]) -> Vec<(usize, usize)> {
    let mut found = Vec::new();
    let mut latest: Option<(usize, Duration)> = None;
    for (idx, spec) in plan.iter().enumerate() {
        if let Some((prev, end)) = latest {
            if spec.start < end {
                found.push((prev + 1, idx + 1));
            }
        }
        if latest.map_or(true, |(_, end)| spec.end() > end) {
            latest = Some((idx, spec.end()));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn sub(start_ms: u64, end_ms: u64, text: &str) -> Subtitle {
        Subtitle::new(
            Duration::from_millis(start_ms),
            Duration::from_millis(end_ms),
            text.lines().map(String::from).collect(),
        )
    }

    #[test]
    fn plans_two_entry_file() {
        let input = "1
00:00:01,000 --> 00:00:03,500
Hello world this is a test caption that is fairly long

2
00:00:04,000 --> 00:00:06,000
Short line
";
        let entries = parse(input).unwrap();

        let plan = build_plan(&entries, &PlanOptions::default()).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].start, Duration::from_millis(1000));
        assert_eq!(plan[0].duration, Duration::from_millis(2500));
        assert!(plan[0].lines.iter().all(|l| l.chars().count() <= 40));
        assert_eq!(
            plan[0].lines.join(" "),
            "Hello world this is a test caption that is fairly long"
        );
        assert_eq!(plan[1].start, Duration::from_secs(4));
        assert_eq!(plan[1].duration, Duration::from_secs(2));
        assert_eq!(plan[1].lines, vec!["Short line"]);
    }

    #[test]
    fn uses_configured_anchor_and_style() {
        let plan = build_plan(&[sub(0, 1000, "hi")], &PlanOptions::default()).unwrap();

        assert_eq!(plan[0].anchor.horizontal, Horizontal::Center);
        assert_eq!(plan[0].anchor.y, 650);
        assert_eq!(plan[0].style.font_size, 40);
        assert_eq!(plan[0].style.color, "white");
        assert_eq!(plan[0].style.background, "black");
        assert_eq!(plan[0].style.frame_width, 1080);
    }

    #[test]
    fn keeps_order_and_count() {
        let entries = vec![sub(5000, 6000, "c"), sub(0, 1000, "a"), sub(2000, 3000, "b")];

        let plan = build_plan(&entries, &PlanOptions::default()).unwrap();

        let texts: Vec<String> = plan.iter().map(OverlaySpec::text).collect();
        assert_eq!(texts, vec!["c", "a", "b"]);
    }

    #[test]
    fn overlapping_entries_are_kept() {
        let entries = vec![sub(0, 3000, "first"), sub(1000, 2000, "second")];

        let plan = build_plan(&entries, &PlanOptions::default()).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[1].start, Duration::from_secs(1));
    }

    #[test]
    fn finds_overlaps_beyond_neighbours() {
        let entries = vec![sub(0, 10_000, "long"), sub(1000, 2000, "a"), sub(3000, 4000, "b")];
        let plan = build_plan(&entries, &PlanOptions::default()).unwrap();

        assert_eq!(overlaps(&plan), vec![(1, 2), (1, 3)]);
    }

    #[test]
    fn touching_entries_do_not_overlap() {
        let entries = vec![sub(0, 1000, "a"), sub(1000, 2000, "b"), sub(2500, 3000, "c")];
        let plan = build_plan(&entries, &PlanOptions::default()).unwrap();

        assert!(overlaps(&plan).is_empty());
    }

    #[test]
    fn overlap_names_the_latest_ending_entry() {
        let entries = vec![sub(0, 2000, "a"), sub(1000, 5000, "b"), sub(4000, 6000, "c")];
        let plan = build_plan(&entries, &PlanOptions::default()).unwrap();

        assert_eq!(overlaps(&plan), vec![(1, 2), (2, 3)]);
    }

    #[test]
    fn zero_duration_is_invalid_timing() {
        let entries = vec![sub(0, 1000, "fine"), sub(2000, 2000, "empty")];

        match build_plan(&entries, &PlanOptions::default()) {
            Err(OverlayError::InvalidTiming { index, start, end }) => {
                assert_eq!(index, 2);
                assert_eq!(start, Duration::from_secs(2));
                assert_eq!(end, Duration::from_secs(2));
            }
            other => panic!("expected invalid timing, got {:?}", other),
        }
    }

    #[test]
    fn reversed_timing_is_invalid_timing() {
        let entries = vec![sub(3000, 1000, "backwards")];

        assert!(matches!(
            build_plan(&entries, &PlanOptions::default()),
            Err(OverlayError::InvalidTiming { index: 1, .. })
        ));
    }

    #[test]
    fn zero_width_is_rejected() {
        let options = PlanOptions {
            width: 0,
            ..PlanOptions::default()
        };

        assert!(matches!(
            build_plan(&[sub(0, 1000, "x")], &options),
            Err(OverlayError::InvalidConfig(_))
        ));
    }

    #[test]
    fn multiline_content_is_flattened() {
        let plan = build_plan(&[sub(0, 1000, "two\nlines")], &PlanOptions::default()).unwrap();

        assert_eq!(plan[0].lines, vec!["two lines"]);
    }

    #[test]
    fn markup_is_kept_unless_stripping() {
        let entries = vec![sub(0, 1000, "{\\an8}<i>Hello</i> <font color=\"red\">there</font>")];

        let kept = build_plan(&entries, &PlanOptions::default()).unwrap();
        assert_eq!(
            kept[0].lines.join(" "),
            "{\\an8}<i>Hello</i> <font color=\"red\">there</font>"
        );

        let options = PlanOptions {
            strip_markup: true,
            ..PlanOptions::default()
        };
        let stripped = build_plan(&entries, &options).unwrap();
        assert_eq!(stripped[0].lines, vec!["Hello there"]);
    }

    #[test]
    fn stripping_leaves_plain_comparisons_alone() {
        let options = PlanOptions {
            strip_markup: true,
            ..PlanOptions::default()
        };

        let plan = build_plan(&[sub(0, 1000, "1 < 2 and 3 > 2")], &options).unwrap();

        assert_eq!(plan[0].lines, vec!["1 < 2 and 3 > 2"]);
    }

    #[test]
    fn serialises_times_as_seconds() {
        let plan = build_plan(&[sub(1000, 3500, "hi")], &PlanOptions::default()).unwrap();

        let json = serde_json::to_value(&plan[0]).unwrap();

        assert_eq!(json["start_secs"], 1.0);
        assert_eq!(json["duration_secs"], 2.5);
        assert_eq!(json["anchor"]["horizontal"], "center");
        assert_eq!(json["anchor"]["y"], 650);
        assert_eq!(json["lines"][0], "hi");
    }
}
