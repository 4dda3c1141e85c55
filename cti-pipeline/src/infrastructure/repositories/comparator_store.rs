// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! File-backed [`ComparatorStateStore`] (§4.4, §5), one snapshot file per
//! source under a shared directory.

use super::file_store::{load_json, save_json};
use async_trait::async_trait;
use cti_pipeline_bootstrap::platform::Platform;
use cti_pipeline_domain::entities::ComparatorState;
use cti_pipeline_domain::repositories::ComparatorStateStore;
use cti_pipeline_domain::PipelineError;
use std::path::PathBuf;

pub struct FileComparatorStateStore {
    dir: PathBuf,
    platform: Box<dyn Platform>,
}

impl FileComparatorStateStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, platform: cti_pipeline_bootstrap::platform::create_platform() }
    }

    fn path_for(&self, source: &str) -> PathBuf {
        self.dir.join(format!("{}.json", source.replace('/', "_")))
    }
}

#[async_trait]
impl ComparatorStateStore for FileComparatorStateStore {
    async fn load(&self, source: &str) -> Result<ComparatorState, PipelineError> {
        load_json(&self.path_for(source)).await
    }

    async fn save(&self, source: &str, state: &ComparatorState) -> Result<(), PipelineError> {
        save_json(self.platform.as_ref(), &self.path_for(source), state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use cti_pipeline_domain::entities::{ComparatorEntry, Event};
    use cti_pipeline_domain::value_objects::{Category, Confidence, EventId, Restriction, SeriesId, Source};
    use std::collections::HashMap;

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
    async fn load_after_save_round_trips_per_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileComparatorStateStore::new(dir.path().to_path_buf());

        let mut entries = HashMap::new();
        entries.insert(
            "1.2.3.4".to_string(),
            ComparatorEntry {
                last_seen_series: SeriesId::new("series-1"),
                event_snapshot: sample_event(),
                expires: Utc::now() + Duration::days(1),
            },
        );
        let mut state = ComparatorState::empty();
        state.replace(entries);

        store.save("abuse-ch.feodo", &state).await.unwrap();
        let loaded = store.load("abuse-ch.feodo").await.unwrap();
        assert_eq!(loaded, state);

        let other = store.load("other.source").await.unwrap();
        assert!(other.entries.is_empty());
    }
}
