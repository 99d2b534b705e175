use crate::core::channels::{ChannelStatsApi, ChannelStatsMap};
use crate::core::http::HttpClient;
use crate::error::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
/// Upper bound on comma-joined ids per `videos.list` / `channels.list` call.
pub const MAX_IDS_PER_REQUEST: usize = 50;
const VIDEO_PARTS: &str = "snippet,contentDetails,statistics";

/// A `videos.list` or `search.list` item. Every field is optional so partial
/// upstream data never fails the whole page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawVideoItem {
    pub id: Option<RawVideoId>,
    pub snippet: Option<RawSnippet>,
    pub statistics: Option<RawStatistics>,
    #[serde(rename = "contentDetails")]
    pub content_details: Option<RawContentDetails>,
}

/// `videos.list` returns the id as a string, `search.list` nests it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawVideoId {
    Plain(String),
    Nested {
        #[serde(rename = "videoId", default)]
        video_id: Option<String>,
    },
}

impl RawVideoId {
    pub fn video_id(&self) -> Option<&str> {
        let id = match self {
            RawVideoId::Plain(id) => id.as_str(),
            RawVideoId::Nested { video_id } => video_id.as_deref()?,
        };
        let id = id.trim();
        (!id.is_empty()).then_some(id)
    }
}

impl RawVideoItem {
    pub fn video_id(&self) -> Option<&str> {
        self.id.as_ref().and_then(RawVideoId::video_id)
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.snippet
            .as_ref()
            .map(|s| s.channel_id.trim())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSnippet {
    pub title: String,
    #[serde(rename = "channelId")]
    pub channel_id: String,
    #[serde(rename = "channelTitle")]
    pub channel_title: String,
    #[serde(rename = "publishedAt")]
    pub published_at: String,
    pub thumbnails: HashMap<String, RawThumbnail>,
    pub tags: Vec<String>,
}

impl RawSnippet {
    pub fn best_thumbnail(&self) -> Option<&str> {
        ["high", "medium", "default"]
            .iter()
            .find_map(|size| self.thumbnails.get(*size))
            .map(|t| t.url.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawThumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStatistics {
    #[serde(rename = "viewCount", deserialize_with = "lenient_count")]
    pub view_count: u64,
    #[serde(rename = "likeCount", deserialize_with = "lenient_count")]
    pub like_count: u64,
    #[serde(rename = "commentCount", deserialize_with = "lenient_count")]
    pub comment_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawContentDetails {
    pub duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ItemListResponse {
    items: Vec<RawVideoItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChannelListResponse {
    items: Vec<RawChannel>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawChannel {
    id: String,
    statistics: Option<RawChannelStatistics>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawChannelStatistics {
    #[serde(rename = "subscriberCount", deserialize_with = "lenient_count")]
    subscriber_count: u64,
}

/// Counts arrive as decimal strings; accept numbers too and treat anything
/// else as zero.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => 0,
    })
}

/// The video-listing half of the YouTube Data API used by the fetch pipeline.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// `videos.list` with `chart=mostPopular`.
    async fn most_popular(&self, region: &str, max_results: u32)
    -> Result<Vec<RawVideoItem>, ApiError>;

    /// `search.list` restricted to videos; returns ids only.
    async fn search_ids(
        &self,
        query: &str,
        region: &str,
        max_results: u32,
        published_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<String>, ApiError>;

    /// `videos.list` by id, batched to the per-request id limit.
    async fn videos_by_id(&self, ids: &[String]) -> Result<Vec<RawVideoItem>, ApiError>;
}

/// Query for a lookup by explicit ids. `maxResults` is not accepted alongside `id`.
fn id_query(part: &str, ids: &[String]) -> [(&'static str, String); 2] {
    [("part", part.to_string()), ("id", ids.join(","))]
}

#[derive(Clone)]
pub struct YouTubeClient {
    http: HttpClient,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(http: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{YOUTUBE_API_BASE}/{resource}")
    }

    /// Cheapest authenticated call: one chart item, id only.
    pub async fn validate_key(&self) -> Result<(), ApiError> {
        let query = [
            ("part", "id".to_string()),
            ("chart", "mostPopular".to_string()),
            ("maxResults", "1".to_string()),
        ];
        let _: ItemListResponse = self
            .http
            .get_json(&self.endpoint("videos"), &query, &self.api_key)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VideoSource for YouTubeClient {
    async fn most_popular(
        &self,
        region: &str,
        max_results: u32,
    ) -> Result<Vec<RawVideoItem>, ApiError> {
        let query = [
            ("part", VIDEO_PARTS.to_string()),
            ("chart", "mostPopular".to_string()),
            ("regionCode", region.to_string()),
            ("maxResults", max_results.to_string()),
        ];
        let response: ItemListResponse = self
            .http
            .get_json(&self.endpoint("videos"), &query, &self.api_key)
            .await?;
        debug!(region, count = response.items.len(), "fetched trending chart");
        Ok(response.items)
    }

    async fn search_ids(
        &self,
        query: &str,
        region: &str,
        max_results: u32,
        published_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<String>, ApiError> {
        let mut params = vec![
            ("part", "id".to_string()),
            ("q", query.to_string()),
            ("type", "video".to_string()),
            ("regionCode", region.to_string()),
            ("maxResults", max_results.to_string()),
        ];
        if let Some(after) = published_after {
            params.push((
                "publishedAfter",
                after.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }

        let response: ItemListResponse = self
            .http
            .get_json(&self.endpoint("search"), &params, &self.api_key)
            .await?;

        let ids: Vec<String> = response
            .items
            .iter()
            .filter_map(|item| item.video_id().map(str::to_string))
            .collect();
        debug!(query, region, count = ids.len(), "search returned ids");
        Ok(ids)
    }

    async fn videos_by_id(&self, ids: &[String]) -> Result<Vec<RawVideoItem>, ApiError> {
        let mut items = Vec::with_capacity(ids.len());
        for batch in ids.chunks(MAX_IDS_PER_REQUEST) {
            let query = id_query(VIDEO_PARTS, batch);
            let response: ItemListResponse = self
                .http
                .get_json(&self.endpoint("videos"), &query, &self.api_key)
                .await?;
            items.extend(response.items);
        }
        Ok(items)
    }
}

#[async_trait]
impl ChannelStatsApi for YouTubeClient {
    async fn channel_subscribers(&self, ids: &[String]) -> Result<ChannelStatsMap, ApiError> {
        let query = id_query("statistics", ids);
        let response: ChannelListResponse = self
            .http
            .get_json(&self.endpoint("channels"), &query, &self.api_key)
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter(|channel| !channel.id.is_empty())
            .map(|channel| {
                let subscribers = channel.statistics.map_or(0, |s| s.subscriber_count);
                (channel.id, subscribers)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(json: &str) -> Vec<RawVideoItem> {
        serde_json::from_str::<ItemListResponse>(json)
            .expect("valid payload")
            .items
    }

    #[test]
    fn id_lookups_send_only_part_and_ids() {
        let ids = vec!["a1".to_string(), "b2".to_string(), "c3".to_string()];
        let query = id_query(VIDEO_PARTS, &ids);
        assert_eq!(query[0], ("part", VIDEO_PARTS.to_string()));
        assert_eq!(query[1], ("id", "a1,b2,c3".to_string()));
        assert!(query.iter().all(|(name, _)| *name != "maxResults"));

        let query = id_query("statistics", &ids[..1]);
        assert_eq!(query, [("part", "statistics".to_string()), ("id", "a1".to_string())]);
    }

    #[test]
    fn reads_plain_and_nested_ids() {
        let parsed = items(
            r#"{"items": [
                {"id": "plain123"},
                {"id": {"kind": "youtube#video", "videoId": "nested456"}},
                {"id": {"kind": "youtube#channel", "channelId": "UCx"}},
                {"snippet": {"title": "no id"}}
            ]}"#,
        );
        let ids: Vec<Option<&str>> = parsed.iter().map(RawVideoItem::video_id).collect();
        assert_eq!(ids, vec![Some("plain123"), Some("nested456"), None, None]);
    }

    #[test]
    fn counts_tolerate_strings_numbers_and_garbage() {
        let parsed = items(
            r#"{"items": [{"id": "a", "statistics": {"viewCount": "1200", "likeCount": 33, "commentCount": "n/a"}}]}"#,
        );
        let stats = parsed[0].statistics.as_ref().expect("statistics");
        assert_eq!(stats.view_count, 1200);
        assert_eq!(stats.like_count, 33);
        assert_eq!(stats.comment_count, 0);
    }

    #[test]
    fn missing_fields_default() {
        let parsed = items(r#"{"items": [{"id": "a", "statistics": {}, "snippet": {}}]}"#);
        let item = &parsed[0];
        assert_eq!(item.statistics.as_ref().map(|s| s.view_count), Some(0));
        assert_eq!(item.channel_id(), None);
        assert!(item.content_details.is_none());
        assert_eq!(item.snippet.as_ref().and_then(RawSnippet::best_thumbnail), None);
    }

    #[test]
    fn thumbnail_prefers_high_then_smaller() {
        let parsed = items(
            r#"{"items": [{"id": "a", "snippet": {"thumbnails": {
                "default": {"url": "d.jpg"}, "medium": {"url": "m.jpg"}
            }}}]}"#,
        );
        let snippet = parsed[0].snippet.as_ref().expect("snippet");
        assert_eq!(snippet.best_thumbnail(), Some("m.jpg"));
    }

    #[test]
    fn channel_statistics_hidden_count_is_zero() {
        let response: ChannelListResponse = serde_json::from_str(
            r#"{"items": [
                {"id": "UC1", "statistics": {"subscriberCount": "4500"}},
                {"id": "UC2", "statistics": {"hiddenSubscriberCount": true}}
            ]}"#,
        )
        .expect("valid payload");
        let counts: Vec<u64> = response
            .items
            .iter()
            .map(|c| c.statistics.as_ref().map_or(0, |s| s.subscriber_count))
            .collect();
        assert_eq!(counts, vec![4500, 0]);
    }
}
