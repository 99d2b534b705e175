use crate::core::youtube::MAX_IDS_PER_REQUEST;
use crate::error::ApiError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Channel id -> subscriber count. Absent ids read as zero.
pub type ChannelStatsMap = HashMap<String, u64>;

/// `channels.list?part=statistics` for at most [`MAX_IDS_PER_REQUEST`] ids.
#[async_trait]
pub trait ChannelStatsApi: Send + Sync {
    async fn channel_subscribers(&self, ids: &[String]) -> Result<ChannelStatsMap, ApiError>;
}

/// Resolve subscriber counts for every distinct channel id, one request per
/// batch of 50. The first failing batch aborts the whole lookup.
pub async fn fetch_channel_stats<A, I, S>(api: &A, channel_ids: I) -> Result<ChannelStatsMap, ApiError>
where
    A: ChannelStatsApi + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unique = unique_ids(channel_ids);
    let mut stats = ChannelStatsMap::with_capacity(unique.len());

    for batch in unique.chunks(MAX_IDS_PER_REQUEST) {
        let counts = api.channel_subscribers(batch).await?;
        debug!(requested = batch.len(), returned = counts.len(), "channel stats batch");
        stats.extend(counts);
    }

    Ok(stats)
}

/// Distinct, non-empty ids in first-seen order.
pub fn unique_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|id| id.as_ref().trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::Mutex;

    /// Records every batch and answers `subscribers` for known ids.
    #[derive(Default)]
    pub struct FakeChannels {
        pub subscribers: ChannelStatsMap,
        pub batches: Mutex<Vec<Vec<String>>>,
        pub fail: Option<ApiError>,
    }

    impl FakeChannels {
        pub fn with(entries: &[(&str, u64)]) -> Self {
            Self {
                subscribers: entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                ..Self::default()
            }
        }

        pub fn failing(err: ApiError) -> Self {
            Self {
                fail: Some(err),
                ..Self::default()
            }
        }

        pub fn batch_sizes(&self) -> Vec<usize> {
            self.batches.lock().unwrap().iter().map(Vec::len).collect()
        }
    }

    #[async_trait]
    impl ChannelStatsApi for FakeChannels {
        async fn channel_subscribers(&self, ids: &[String]) -> Result<ChannelStatsMap, ApiError> {
            self.batches.lock().unwrap().push(ids.to_vec());
            if let Some(err) = &self.fail {
                return Err(err.clone());
            }
            Ok(ids
                .iter()
                .filter_map(|id| self.subscribers.get(id).map(|n| (id.clone(), *n)))
                .collect())
        }
    }
}
