//! Local roll-ups over a page of activity rows.
//!
//! The backend aggregates activity per device and day. Views that chart a page
//! of those rows sum them locally; this module is that summation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Seconds attributed to one application or window title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEntry {
    /// Application name or window title.
    #[serde(alias = "app", alias = "title")]
    pub name: String,
    /// Foreground seconds attributed to `name`.
    #[serde(default)]
    pub seconds: u64,
}

/// Read access to one activity row, implemented by the API models.
pub trait ActivityRow {
    /// Seconds with user input.
    fn active_seconds(&self) -> u64;
    /// Seconds without user input.
    fn idle_seconds(&self) -> u64;
    /// Top applications for the row.
    fn top_apps(&self) -> &[UsageEntry];
    /// Top window titles for the row.
    fn top_titles(&self) -> &[UsageEntry];
}

/// Sum of a set of activity rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityTotals {
    /// Rows folded into the totals.
    pub rows: usize,
    /// Summed active seconds.
    pub active_seconds: u64,
    /// Summed idle seconds.
    pub idle_seconds: u64,
    apps: BTreeMap<String, u64>,
    titles: BTreeMap<String, u64>,
}

impl ActivityTotals {
    /// Fold every row into a fresh total.
    pub fn from_rows<'a, R, I>(rows: I) -> Self
    where
        R: ActivityRow + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        let mut totals = Self::default();
        for row in rows {
            totals.add(row);
        }
        totals
    }

    /// Fold one row into the running total.
    pub fn add<R: ActivityRow + ?Sized>(&mut self, row: &R) {
        self.rows += 1;
        self.active_seconds = self.active_seconds.saturating_add(row.active_seconds());
        self.idle_seconds = self.idle_seconds.saturating_add(row.idle_seconds());
        merge(&mut self.apps, row.top_apps());
        merge(&mut self.titles, row.top_titles());
    }

    /// Active plus idle seconds.
    #[must_use]
    pub const fn tracked_seconds(&self) -> u64 {
        self.active_seconds.saturating_add(self.idle_seconds)
    }

    /// Share of tracked time that was active, or `None` when nothing was tracked.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn active_ratio(&self) -> Option<f64> {
        let tracked = self.tracked_seconds();
        if tracked == 0 {
            return None;
        }
        Some(self.active_seconds as f64 / tracked as f64)
    }

    /// The `limit` applications with the most seconds.
    #[must_use]
    pub fn top_apps(&self, limit: usize) -> Vec<UsageEntry> {
        ranked(&self.apps, limit)
    }

    /// The `limit` window titles with the most seconds.
    #[must_use]
    pub fn top_titles(&self, limit: usize) -> Vec<UsageEntry> {
        ranked(&self.titles, limit)
    }
}

fn merge(into: &mut BTreeMap<String, u64>, entries: &[UsageEntry]) {
    for entry in entries {
        let slot = into.entry(entry.name.clone()).or_default();
        *slot = slot.saturating_add(entry.seconds);
    }
}

fn ranked(source: &BTreeMap<String, u64>, limit: usize) -> Vec<UsageEntry> {
    let mut entries: Vec<UsageEntry> = source
        .iter()
        .map(|(name, seconds)| UsageEntry {
            name: name.clone(),
            seconds: *seconds,
        })
        .collect();
    entries.sort_by(|a, b| b.seconds.cmp(&a.seconds).then_with(|| a.name.cmp(&b.name)));
    entries.truncate(limit);
    entries
}

/// Render seconds as `1h 02m 03s`, `3m 07s`, or `45s`.
#[must_use]
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m {secs:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs:02}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        active: u64,
        idle: u64,
        apps: Vec<UsageEntry>,
        titles: Vec<UsageEntry>,
    }

    impl ActivityRow for Row {
        fn active_seconds(&self) -> u64 {
            self.active
        }
        fn idle_seconds(&self) -> u64 {
            self.idle
        }
        fn top_apps(&self) -> &[UsageEntry] {
            &self.apps
        }
        fn top_titles(&self) -> &[UsageEntry] {
            &self.titles
        }
    }

    fn usage(name: &str, seconds: u64) -> UsageEntry {
        UsageEntry {
            name: name.to_string(),
            seconds,
        }
    }

    fn sample_rows() -> Vec<Row> {
        vec![
            Row {
                active: 3_600,
                idle: 600,
                apps: vec![usage("code", 2_000), usage("firefox", 1_200)],
                titles: vec![usage("main.rs", 900)],
            },
            Row {
                active: 1_800,
                idle: 1_800,
                apps: vec![usage("firefox", 1_000), usage("slack", 500)],
                titles: vec![usage("main.rs", 300), usage("inbox", 600)],
            },
        ]
    }

    #[test]
    fn totals_sum_seconds_across_rows() {
        let rows = sample_rows();
        let totals = ActivityTotals::from_rows(&rows);
        assert_eq!(totals.rows, 2);
        assert_eq!(totals.active_seconds, 5_400);
        assert_eq!(totals.idle_seconds, 2_400);
        assert_eq!(totals.tracked_seconds(), 7_800);
    }

    #[test]
    fn top_lists_merge_by_name_and_rank_descending() {
        let totals = ActivityTotals::from_rows(&sample_rows());
        assert_eq!(
            totals.top_apps(2),
            vec![usage("firefox", 2_200), usage("code", 2_000)]
        );
        assert_eq!(
            totals.top_titles(5),
            vec![usage("main.rs", 1_200), usage("inbox", 600)]
        );
    }

    #[test]
    fn ties_rank_by_name() {
        let rows = vec![Row {
            active: 0,
            idle: 0,
            apps: vec![usage("zsh", 10), usage("bash", 10)],
            titles: Vec::new(),
        }];
        let totals = ActivityTotals::from_rows(&rows);
        assert_eq!(totals.top_apps(1), vec![usage("bash", 10)]);
    }

    #[test]
    fn active_ratio_handles_empty_totals() {
        assert_eq!(ActivityTotals::default().active_ratio(), None);
        let rows = vec![Row {
            active: 30,
            idle: 10,
            apps: Vec::new(),
            titles: Vec::new(),
        }];
        let ratio = ActivityTotals::from_rows(&rows)
            .active_ratio()
            .expect("ratio present");
        assert!((ratio - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn format_duration_picks_units() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(187), "3m 07s");
        assert_eq!(format_duration(3_723), "1h 02m 03s");
        assert_eq!(format_duration(90_000), "25h 00m 00s");
    }

    #[test]
    fn usage_entry_accepts_title_alias() {
        let entry: UsageEntry =
            serde_json::from_str(r#"{"title":"inbox","seconds":12}"#).expect("parse entry");
        assert_eq!(entry, usage("inbox", 12));
    }
}
