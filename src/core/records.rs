use crate::core::channels::{ChannelStatsApi, ChannelStatsMap, fetch_channel_stats};
use crate::core::duration::parse_duration_seconds;
use crate::core::youtube::RawVideoItem;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// One row of the result table. Every numeric field is always defined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub channel_id: String,
    /// `YYYY-MM-DD` part of `publishedAt`, empty when unknown.
    pub publish_date: String,
    pub thumbnail_url: String,
    pub tags: Vec<String>,
    pub subscribers: u64,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub engagement_percent: f64,
    pub duration_minutes: f64,
    pub url: String,
}

impl VideoRecord {
    /// Views per subscriber; undefined for channels with no visible subscribers.
    pub fn virality_ratio(&self) -> Option<f64> {
        (self.subscribers > 0).then(|| self.views as f64 / self.subscribers as f64)
    }

    pub fn is_viral(&self, threshold: f64) -> bool {
        self.virality_ratio().is_some_and(|ratio| ratio >= threshold)
    }

    pub fn published_on(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.publish_date, "%Y-%m-%d").ok()
    }
}

/// Turn raw items into records, looking up subscriber counts when a stats
/// source is given. A failed lookup is logged and leaves every count at zero.
pub async fn normalize<A>(items: &[RawVideoItem], stats_api: Option<&A>) -> Vec<VideoRecord>
where
    A: ChannelStatsApi + ?Sized,
{
    let channel_ids: Vec<&str> = items.iter().filter_map(RawVideoItem::channel_id).collect();

    let stats = match stats_api {
        Some(api) if !channel_ids.is_empty() => match fetch_channel_stats(api, &channel_ids).await {
            Ok(stats) => stats,
            Err(err) => {
                warn!(kind = err.kind(), "channel stats unavailable, subscribers default to 0: {err}");
                ChannelStatsMap::new()
            }
        },
        _ => ChannelStatsMap::new(),
    };

    normalize_with_stats(items, &stats)
}

/// Order-preserving; items without a usable id are dropped.
pub fn normalize_with_stats(items: &[RawVideoItem], stats: &ChannelStatsMap) -> Vec<VideoRecord> {
    items
        .iter()
        .filter_map(|item| to_record(item, stats))
        .collect()
}

fn to_record(item: &RawVideoItem, stats: &ChannelStatsMap) -> Option<VideoRecord> {
    let id = item.video_id()?.to_string();
    let snippet = item.snippet.clone().unwrap_or_default();
    let statistics = item.statistics.clone().unwrap_or_default();

    let (views, likes, comments) = (
        statistics.view_count,
        statistics.like_count,
        statistics.comment_count,
    );

    let duration_seconds = item
        .content_details
        .as_ref()
        .and_then(|details| details.duration.as_deref())
        .map_or(0.0, parse_duration_seconds);

    let subscribers = item
        .channel_id()
        .and_then(|channel_id| stats.get(channel_id).copied())
        .unwrap_or(0);

    Some(VideoRecord {
        url: format!("{WATCH_URL}{id}"),
        title: html_escape::decode_html_entities(&snippet.title).into_owned(),
        channel: html_escape::decode_html_entities(&snippet.channel_title).into_owned(),
        channel_id: snippet.channel_id.trim().to_string(),
        publish_date: date_part(&snippet.published_at).to_string(),
        thumbnail_url: snippet.best_thumbnail().unwrap_or_default().to_string(),
        tags: snippet.tags,
        subscribers,
        views,
        likes,
        comments,
        engagement_percent: engagement_percent(views, likes, comments),
        duration_minutes: round2(duration_seconds / 60.0),
        id,
    })
}

/// `(likes + comments) / views * 100`, zero when there are no views.
pub fn engagement_percent(views: u64, likes: u64, comments: u64) -> f64 {
    if views == 0 {
        return 0.0;
    }
    round2(likes.saturating_add(comments) as f64 / views as f64 * 100.0)
}

/// `1234567` -> `1,234,567`.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn date_part(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or_default().trim()
}
