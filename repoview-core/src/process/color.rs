// Color themes.
//
// One strategy per `ColorTheme` variant:
// - by file type: extension lookup, directories take their dominant extension
// - by change frequency: commit count on a clamped linear scale over [0, 50]
// - by recency: age of the latest commit on a clamped 100-day linear scale

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ColorTheme;

pub const DEFAULT_COLOR: &str = "#CED6E0";

/// Extension -> color, after GitHub's linguist palette.
const EXTENSION_COLORS: &[(&str, &str)] = &[
    ("rs", "#dea584"),
    ("js", "#f1e05a"),
    ("jsx", "#f1e05a"),
    ("mjs", "#f1e05a"),
    ("cjs", "#f1e05a"),
    ("ts", "#3178c6"),
    ("tsx", "#3178c6"),
    ("py", "#3572A5"),
    ("rb", "#701516"),
    ("go", "#00ADD8"),
    ("java", "#b07219"),
    ("kt", "#A97BFF"),
    ("swift", "#F05138"),
    ("c", "#555555"),
    ("h", "#555555"),
    ("cpp", "#f34b7d"),
    ("hpp", "#f34b7d"),
    ("cs", "#178600"),
    ("php", "#4F5D95"),
    ("html", "#e34c26"),
    ("css", "#563d7c"),
    ("scss", "#c6538c"),
    ("less", "#1d365d"),
    ("vue", "#41b883"),
    ("svelte", "#ff3e00"),
    ("json", "#292929"),
    ("yml", "#cb171e"),
    ("yaml", "#cb171e"),
    ("toml", "#9c4221"),
    ("md", "#083fa1"),
    ("mdx", "#fcb32c"),
    ("sh", "#89e051"),
    ("lua", "#000080"),
    ("dart", "#00B4AB"),
    ("ex", "#6e4a7e"),
    ("exs", "#6e4a7e"),
    ("hs", "#5e5086"),
    ("scala", "#c22d40"),
    ("sql", "#e38c00"),
    ("graphql", "#e10098"),
    ("xml", "#0060ac"),
    ("png", "#a074c4"),
    ("jpg", "#a074c4"),
    ("jpeg", "#a074c4"),
    ("gif", "#a074c4"),
    ("webp", "#a074c4"),
    ("ico", "#a074c4"),
    ("svg", "#ff9900"),
    ("woff", "#8a8a8a"),
    ("woff2", "#8a8a8a"),
    ("ttf", "#8a8a8a"),
    ("otf", "#8a8a8a"),
];

pub fn extension_color(extension: &str) -> Option<&'static str> {
    EXTENSION_COLORS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, color)| *color)
}

pub fn is_known_extension(extension: &str) -> bool {
    extension_color(extension).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

/// Clamped linear interpolation between two colors.
#[derive(Debug, Clone, Copy)]
pub struct LinearColorScale {
    pub domain: (f64, f64),
    pub range: (Rgb, Rgb),
}

impl LinearColorScale {
    pub fn color(&self, value: f64) -> String {
        let (d0, d1) = self.domain;
        let t = if d1 == d0 { 0.0 } else { ((value - d0) / (d1 - d0)).clamp(0.0, 1.0) };
        self.range.0.lerp(self.range.1, t).to_hex()
    }
}

const SCALE_LOW: Rgb = Rgb(0xf4, 0xf4, 0xf4);

pub const CHANGE_FREQUENCY_SCALE: LinearColorScale = LinearColorScale {
    domain: (0.0, 50.0),
    range: (SCALE_LOW, Rgb(0x3c, 0x40, 0xc6)),
};

/// Days since the last commit, mapped so that "today" is the strong end.
pub const RECENCY_WINDOW_DAYS: f64 = 100.0;
const SECONDS_PER_DAY: f64 = 86_400.0;
pub const RECENCY_SCALE: LinearColorScale = LinearColorScale {
    domain: (RECENCY_WINDOW_DAYS, 0.0),
    range: (SCALE_LOW, Rgb(0x82, 0x34, 0x71)),
};

/// The inputs a theme may color by. Directories pass aggregates of their subtree.
#[derive(Debug, Clone, Copy)]
pub struct ColorInputs<'a> {
    pub dominant_extension: &'a str,
    pub commit_count: usize,
    pub last_commit: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

const MAX_LEGEND_ENTRIES: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct ColorScheme {
    pub theme: ColorTheme,
    pub now: DateTime<Utc>,
}

impl ColorScheme {
    pub fn new(theme: ColorTheme, now: DateTime<Utc>) -> Self {
        Self { theme, now }
    }

    pub fn color(&self, inputs: ColorInputs<'_>) -> String {
        match self.theme {
            ColorTheme::ByFileType => by_file_type(inputs.dominant_extension),
            ColorTheme::ByChangeFrequency => by_change_frequency(inputs.commit_count),
            ColorTheme::ByRecency => by_recency(inputs.last_commit, self.now),
        }
    }

    /// Legend for the rendered leaves' extensions, or the scale endpoints.
    pub fn legend<'a>(
        &self,
        leaf_extensions: impl IntoIterator<Item = &'a str>,
    ) -> Vec<LegendEntry> {
        match self.theme {
            ColorTheme::ByFileType => {
                // Insertion order keeps ties in first-seen order.
                let mut counts: Vec<(&str, usize)> = Vec::new();
                for ext in leaf_extensions.into_iter().filter(|e| !e.is_empty()) {
                    match counts.iter_mut().find(|(seen, _)| *seen == ext) {
                        Some(entry) => entry.1 += 1,
                        None => counts.push((ext, 1)),
                    }
                }
                counts.sort_by(|a, b| b.1.cmp(&a.1));
                counts
                    .into_iter()
                    .take(MAX_LEGEND_ENTRIES)
                    .map(|(ext, _)| LegendEntry {
                        label: format!(".{ext}"),
                        color: by_file_type(ext),
                    })
                    .collect()
            }
            ColorTheme::ByChangeFrequency => vec![
                LegendEntry {
                    label: "0 commits".to_string(),
                    color: CHANGE_FREQUENCY_SCALE.color(0.0),
                },
                LegendEntry {
                    label: "50+ commits".to_string(),
                    color: CHANGE_FREQUENCY_SCALE.color(50.0),
                },
            ],
            ColorTheme::ByRecency => vec![
                LegendEntry {
                    label: "100+ days ago".to_string(),
                    color: RECENCY_SCALE.color(RECENCY_WINDOW_DAYS),
                },
                LegendEntry {
                    label: "today".to_string(),
                    color: RECENCY_SCALE.color(0.0),
                },
            ],
        }
    }
}

fn by_file_type(extension: &str) -> String {
    extension_color(extension).unwrap_or(DEFAULT_COLOR).to_string()
}

fn by_change_frequency(commit_count: usize) -> String {
    CHANGE_FREQUENCY_SCALE.color(commit_count as f64)
}

fn by_recency(last_commit: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let days = match last_commit {
        Some(when) => (now - when).num_seconds() as f64 / SECONDS_PER_DAY,
        None => RECENCY_WINDOW_DAYS,
    };
    RECENCY_SCALE.color(days)
}
