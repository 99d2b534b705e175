use crate::core::channels::ChannelStatsApi;
use crate::core::filter::TimeWindow;
use crate::core::records::{VideoRecord, normalize};
use crate::core::youtube::VideoSource;
use crate::error::{ApiError, Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FetchMode {
    #[default]
    Trending,
    Search,
}

impl FetchMode {
    pub const ALL: [FetchMode; 2] = [FetchMode::Trending, FetchMode::Search];

    pub fn label(self) -> &'static str {
        match self {
            FetchMode::Trending => "Trending",
            FetchMode::Search => "Niche search",
        }
    }
}

/// Everything that determines what a fetch returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchParams {
    pub mode: FetchMode,
    pub query: String,
    pub region: String,
    pub count: u32,
    pub window: TimeWindow,
}

impl FetchParams {
    pub fn validate(&self) -> Result<()> {
        if self.mode == FetchMode::Search && self.query.trim().is_empty() {
            return Err(Error::custom("Enter a keyword for niche search"));
        }
        if self.region.trim().is_empty() {
            return Err(Error::custom("Region code is required"));
        }
        Ok(())
    }

    /// Label handed to the strategy prompt.
    pub fn topic(&self) -> String {
        match self.mode {
            FetchMode::Search => self.query.trim().to_string(),
            FetchMode::Trending => format!("Trending {}", self.region),
        }
    }
}

/// Run one fetch: trending chart, or search ids then a detail lookup, then
/// normalization with subscriber counts from the same API.
pub async fn fetch_records<S>(
    source: &S,
    params: &FetchParams,
    now: DateTime<Utc>,
) -> std::result::Result<Vec<VideoRecord>, ApiError>
where
    S: VideoSource + ChannelStatsApi,
{
    let items = match params.mode {
        FetchMode::Trending => source.most_popular(&params.region, params.count).await?,
        FetchMode::Search => {
            let ids = source
                .search_ids(
                    params.query.trim(),
                    &params.region,
                    params.count,
                    params.window.published_after(now),
                )
                .await?;
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            source.videos_by_id(&ids).await?
        }
    };

    let records = normalize(&items, Some(source)).await;
    info!(
        mode = params.mode.label(),
        region = %params.region,
        fetched = items.len(),
        kept = records.len(),
        "fetch complete"
    );
    Ok(records)
}

/// Cache key: the credential plus every fetch parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub api_key: String,
    pub params: FetchParams,
}

/// Successful fetches for the lifetime of the process. Entries are only
/// replaced, never expired.
#[derive(Debug, Default)]
pub struct FetchCache {
    entries: HashMap<CacheKey, Vec<VideoRecord>>,
}

impl FetchCache {
    pub fn get(&self, key: &CacheKey) -> Option<&[VideoRecord]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn insert(&mut self, key: CacheKey, records: Vec<VideoRecord>) {
        self.entries.insert(key, records);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::channels::ChannelStatsMap;
    use crate::core::youtube::RawVideoItem;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeYouTube {
        chart: Vec<RawVideoItem>,
        search_hits: Vec<String>,
        details: Vec<RawVideoItem>,
        calls: Mutex<Vec<String>>,
        search_after: Mutex<Option<DateTime<Utc>>>,
    }

    impl FakeYouTube {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VideoSource for FakeYouTube {
        async fn most_popular(
            &self,
            region: &str,
            max_results: u32,
        ) -> std::result::Result<Vec<RawVideoItem>, ApiError> {
            self.calls.lock().unwrap().push(format!("chart:{region}:{max_results}"));
            Ok(self.chart.clone())
        }

        async fn search_ids(
            &self,
            query: &str,
            _region: &str,
            _max_results: u32,
            published_after: Option<DateTime<Utc>>,
        ) -> std::result::Result<Vec<String>, ApiError> {
            self.calls.lock().unwrap().push(format!("search:{query}"));
            *self.search_after.lock().unwrap() = published_after;
            Ok(self.search_hits.clone())
        }

        async fn videos_by_id(
            &self,
            ids: &[String],
        ) -> std::result::Result<Vec<RawVideoItem>, ApiError> {
            self.calls.lock().unwrap().push(format!("videos:{}", ids.join(",")));
            Ok(self.details.clone())
        }
    }

    #[async_trait]
    impl ChannelStatsApi for FakeYouTube {
        async fn channel_subscribers(
            &self,
            ids: &[String],
        ) -> std::result::Result<ChannelStatsMap, ApiError> {
            self.calls.lock().unwrap().push(format!("channels:{}", ids.join(",")));
            Ok(ids.iter().map(|id| (id.clone(), 100)).collect())
        }
    }

    fn items(json: &str) -> Vec<RawVideoItem> {
        serde_json::from_str(json).expect("items")
    }

    fn params(mode: FetchMode, query: &str) -> FetchParams {
        FetchParams {
            mode,
            query: query.to_string(),
            region: "ID".to_string(),
            count: 10,
            window: TimeWindow::Week,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn trending_uses_chart_then_channels() {
        let api = FakeYouTube {
            chart: items(r#"[{"id": "v1", "snippet": {"channelId": "UC1"}}]"#),
            ..FakeYouTube::default()
        };

        let records = fetch_records(&api, &params(FetchMode::Trending, ""), now())
            .await
            .expect("records");

        assert_eq!(api.calls(), vec!["chart:ID:10", "channels:UC1"]);
        assert_eq!(records[0].subscribers, 100);
    }

    #[tokio::test]
    async fn search_resolves_ids_then_details() {
        let api = FakeYouTube {
            search_hits: vec!["v1".into(), "v2".into()],
            details: items(
                r#"[{"id": "v1", "snippet": {"channelId": "UC1"}}, {"id": "v2", "snippet": {"channelId": "UC1"}}]"#,
            ),
            ..FakeYouTube::default()
        };

        let records = fetch_records(&api, &params(FetchMode::Search, " cooking "), now())
            .await
            .expect("records");

        assert_eq!(
            api.calls(),
            vec!["search:cooking", "videos:v1,v2", "channels:UC1"]
        );
        assert_eq!(records.len(), 2);
        assert_eq!(
            *api.search_after.lock().unwrap(),
            Some(Utc.with_ymd_and_hms(2026, 10, 9, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn search_without_hits_skips_detail_lookup() {
        let api = FakeYouTube::default();

        let records = fetch_records(&api, &params(FetchMode::Search, "nothing"), now())
            .await
            .expect("records");

        assert!(records.is_empty());
        assert_eq!(api.calls(), vec!["search:nothing"]);
    }

    #[test]
    fn search_requires_keyword() {
        assert!(params(FetchMode::Search, "  ").validate().is_err());
        assert!(params(FetchMode::Trending, "").validate().is_ok());
    }

    #[test]
    fn topic_depends_on_mode() {
        assert_eq!(params(FetchMode::Search, " vlog ").topic(), "vlog");
        assert_eq!(params(FetchMode::Trending, "").topic(), "Trending ID");
    }

    #[test]
    fn cache_is_keyed_by_every_parameter() {
        let mut cache = FetchCache::default();
        let key = CacheKey {
            api_key: "k".into(),
            params: params(FetchMode::Trending, ""),
        };
        cache.insert(key.clone(), vec![crate::core::records::samples::record("a", 1, 1.0)]);

        assert_eq!(cache.get(&key).map(<[VideoRecord]>::len), Some(1));

        let mut other_region = key.clone();
        other_region.params.region = "US".into();
        assert!(cache.get(&other_region).is_none());

        let mut other_key = key.clone();
        other_key.api_key = "k2".into();
        assert!(cache.get(&other_key).is_none());
        assert_eq!(cache.len(), 1);
    }
}
