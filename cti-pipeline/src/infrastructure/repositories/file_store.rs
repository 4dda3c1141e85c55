// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Write-then-rename JSON persistence (§5), shared by the aggregator's and
//! comparator's state stores: write the new snapshot to a sibling temp
//! file, `fsync` it, then atomically rename it over the real path. A
//! reader never observes a partially-written snapshot, and a crash between
//! write and rename leaves the previous snapshot intact.

use cti_pipeline_bootstrap::platform::Platform;
use cti_pipeline_domain::PipelineError;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub async fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, PipelineError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| PipelineError::SerializationError(e.to_string())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(err) => Err(PipelineError::IoError(err.to_string())),
    }
}

pub async fn save_json<T: Serialize>(platform: &dyn Platform, path: &Path, value: &T) -> Result<(), PipelineError> {
    let bytes = serde_json::to_vec(value).map_err(|e| PipelineError::SerializationError(e.to_string()))?;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent).await.map_err(|e| PipelineError::IoError(e.to_string()))?;

    let temp_path: PathBuf = parent.join(format!(
        ".{}.tmp-{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("state"),
        ulid::Ulid::new()
    ));

    let mut file = tokio::fs::File::create(&temp_path).await.map_err(|e| PipelineError::IoError(e.to_string()))?;
    file.write_all(&bytes).await.map_err(|e| PipelineError::IoError(e.to_string()))?;
    file.flush().await.map_err(|e| PipelineError::IoError(e.to_string()))?;
    platform.sync_file(&file).await.map_err(|e| PipelineError::IoError(e.to_string()))?;
    drop(file);

    tokio::fs::rename(&temp_path, path).await.map_err(|e| PipelineError::IoError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cti_pipeline_bootstrap::platform::create_platform;
    use std::collections::HashMap;

    #[tokio::test]
    async fn round_trips_through_write_then_rename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let platform = create_platform();

        let mut state: HashMap<String, u32> = HashMap::new();
        state.insert("a".to_string(), 1);

        save_json(platform.as_ref(), &path, &state).await.unwrap();
        let loaded: HashMap<String, u32> = load_json(&path).await.unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let loaded: HashMap<String, u32> = load_json(&path).await.unwrap();
        assert!(loaded.is_empty());
    }
}
