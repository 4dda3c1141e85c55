// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! File-backed [`AggregatorStateStore`] (§4.3, §5).

use super::file_store::{load_json, save_json};
use async_trait::async_trait;
use cti_pipeline_bootstrap::platform::Platform;
use cti_pipeline_domain::entities::AggregatorGroup;
use cti_pipeline_domain::repositories::AggregatorStateStore;
use cti_pipeline_domain::value_objects::GroupKey;
use cti_pipeline_domain::PipelineError;
use std::collections::HashMap;
use std::path::PathBuf;

pub struct FileAggregatorStateStore {
    path: PathBuf,
    platform: Box<dyn Platform>,
}

impl FileAggregatorStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, platform: cti_pipeline_bootstrap::platform::create_platform() }
    }
}

#[async_trait]
impl AggregatorStateStore for FileAggregatorStateStore {
    async fn load(&self) -> Result<HashMap<GroupKey, AggregatorGroup>, PipelineError> {
        // `GroupKey` is a struct, not a string, so it cannot be a JSON object
        // key directly; persist as an entry list instead.
        let entries: Vec<(GroupKey, AggregatorGroup)> = load_json(&self.path).await?;
        Ok(entries.into_iter().collect())
    }

    async fn save(&self, state: &HashMap<GroupKey, AggregatorGroup>) -> Result<(), PipelineError> {
        let entries: Vec<(&GroupKey, &AggregatorGroup)> = state.iter().collect();
        save_json(self.platform.as_ref(), &self.path, &entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use cti_pipeline_domain::entities::Event;
    use cti_pipeline_domain::value_objects::{Category, Confidence, EventId, Restriction, Source};

    fn sample_event() -> Event {
        Event::builder(
            EventId::parse("a3a3384e2707a865c24a3ab3803f9f97").unwrap(),
            Source::parse("abuse-ch.feodo").unwrap(),
            Restriction::Public,
            Confidence::Medium,
            Category::Bots,
            Utc::now(),
        )
        .build()
        .unwrap()
    }

    #[tokio::test]
    async fn load_after_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileAggregatorStateStore::new(dir.path().join("aggregator.json"));

        let mut state = HashMap::new();
        let key = GroupKey::new(Source::parse("abuse-ch.feodo").unwrap(), "host");
        state.insert(key.clone(), AggregatorGroup::open(sample_event(), Duration::hours(24)));

        store.save(&state).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn load_with_no_prior_state_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileAggregatorStateStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.unwrap().is_empty());
    }
}
