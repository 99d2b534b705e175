use crate::core::records::VideoRecord;
use chrono::{DateTime, Days, NaiveDate, Utc};
use clap::ValueEnum;
use std::cmp::Ordering;

/// Duration buckets in minutes. `Short` is closed on both ends, `Medium`
/// excludes 5 and includes 20.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum DurationBucket {
    #[default]
    All,
    Shorts,
    Short,
    Medium,
    Long,
}

impl DurationBucket {
    pub const ALL: [DurationBucket; 5] = [
        DurationBucket::All,
        DurationBucket::Shorts,
        DurationBucket::Short,
        DurationBucket::Medium,
        DurationBucket::Long,
    ];

    pub fn contains(self, minutes: f64) -> bool {
        match self {
            DurationBucket::All => true,
            DurationBucket::Shorts => minutes < 1.0,
            DurationBucket::Short => (1.0..=5.0).contains(&minutes),
            DurationBucket::Medium => minutes > 5.0 && minutes <= 20.0,
            DurationBucket::Long => minutes > 20.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DurationBucket::All => "All",
            DurationBucket::Shorts => "Shorts (<1m)",
            DurationBucket::Short => "Short (1-5m)",
            DurationBucket::Medium => "Medium (5-20m)",
            DurationBucket::Long => "Long (>20m)",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum SortKey {
    #[default]
    Views,
    Newest,
    Engagement,
    Subscribers,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Views,
        SortKey::Newest,
        SortKey::Engagement,
        SortKey::Subscribers,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Views => "Most views",
            SortKey::Newest => "Newest",
            SortKey::Engagement => "Highest engagement",
            SortKey::Subscribers => "Most subscribers",
        }
    }

    /// Descending order on the selected key.
    fn compare(self, a: &VideoRecord, b: &VideoRecord) -> Ordering {
        match self {
            SortKey::Views => b.views.cmp(&a.views),
            SortKey::Newest => b.publish_date.cmp(&a.publish_date),
            SortKey::Engagement => b.engagement_percent.total_cmp(&a.engagement_percent),
            SortKey::Subscribers => b.subscribers.cmp(&a.subscribers),
        }
    }
}

/// Publish-time window. Maps to a calendar-date cutoff for filtering and to
/// the `publishedAfter` timestamp for search requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum TimeWindow {
    #[default]
    All,
    Today,
    Week,
    Month,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 4] = [
        TimeWindow::All,
        TimeWindow::Today,
        TimeWindow::Week,
        TimeWindow::Month,
    ];

    pub fn days(self) -> Option<u64> {
        match self {
            TimeWindow::All => None,
            TimeWindow::Today => Some(1),
            TimeWindow::Week => Some(7),
            TimeWindow::Month => Some(30),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeWindow::All => "All time",
            TimeWindow::Today => "Today",
            TimeWindow::Week => "This week",
            TimeWindow::Month => "This month",
        }
    }

    pub fn cutoff_date(self, today: NaiveDate) -> Option<NaiveDate> {
        self.days()
            .and_then(|days| today.checked_sub_days(Days::new(days)))
    }

    pub fn published_after(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.days().and_then(|days| now.checked_sub_days(Days::new(days)))
    }
}

/// Step through a fixed option list, wrapping at both ends.
pub fn cycle<T: Copy + PartialEq>(options: &[T], current: T, forward: bool) -> T {
    let len = options.len();
    let index = options.iter().position(|o| *o == current).unwrap_or(0);
    let next = if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    };
    options[next]
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewQuery {
    pub bucket: DurationBucket,
    pub sort: SortKey,
    /// Inclusive lower bound on the publish date.
    pub cutoff: Option<NaiveDate>,
}

/// What the table should show. Empty outcomes are kept apart so the caller
/// can tell "nothing fetched" from "everything filtered away".
#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    NoResults,
    FilteredOut,
    Rows(Vec<VideoRecord>),
}

impl ResultView {
    pub fn rows(&self) -> &[VideoRecord] {
        match self {
            ResultView::Rows(rows) => rows,
            _ => &[],
        }
    }
}

/// Filter by cutoff and bucket, then stable-sort descending. Ties keep fetch
/// order. The source slice is left untouched.
pub fn apply(records: &[VideoRecord], query: &ViewQuery) -> ResultView {
    if records.is_empty() {
        return ResultView::NoResults;
    }

    let mut rows: Vec<VideoRecord> = records
        .iter()
        .filter(|r| within_cutoff(r, query.cutoff))
        .filter(|r| query.bucket.contains(r.duration_minutes))
        .cloned()
        .collect();

    if rows.is_empty() {
        return ResultView::FilteredOut;
    }

    rows.sort_by(|a, b| query.sort.compare(a, b));
    ResultView::Rows(rows)
}

fn within_cutoff(record: &VideoRecord, cutoff: Option<NaiveDate>) -> bool {
    match cutoff {
        None => true,
        Some(cutoff) => record.published_on().is_some_and(|date| date >= cutoff),
    }
}
