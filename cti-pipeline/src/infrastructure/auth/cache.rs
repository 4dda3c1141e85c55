// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The auth snapshot's signed on-disk cache (§4.7): lets a component that
//! starts while the Auth DB is unreachable load the last snapshot another
//! sibling process fetched, instead of serving nothing. The file is
//! HMAC-SHA256 signed; a mismatched or missing signature is treated the
//! same as a missing file, never as a trusted-but-wrong snapshot.

use cti_pipeline_bootstrap::platform::Platform;
use cti_pipeline_domain::entities::AuthSnapshot;
use cti_pipeline_domain::PipelineError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::PathBuf;
use subtle::ConstantTimeEq;
use tokio::io::AsyncWriteExt;

type HmacSha256 = Hmac<Sha256>;

fn sign(secret: &str, payload: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any length");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

fn verify(secret: &str, payload: &[u8], tag: &[u8]) -> bool {
    let expected = sign(secret, payload);
    expected.as_slice().ct_eq(tag).into()
}

/// A pickle-style snapshot cache: one signed file holding the whole
/// [`AuthSnapshot`], written and verified by the same secret across every
/// component that shares it.
pub struct SignedSnapshotCache {
    path: PathBuf,
    secret: String,
    platform: Box<dyn Platform>,
}

impl SignedSnapshotCache {
    pub fn new(path: PathBuf, secret: impl Into<String>) -> Self {
        Self { path, secret: secret.into(), platform: cti_pipeline_bootstrap::platform::create_platform() }
    }

    /// Signs and atomically writes the snapshot, write-then-rename like
    /// the aggregator's and comparator's state stores (§5).
    pub async fn save(&self, snapshot: &AuthSnapshot) -> Result<(), PipelineError> {
        let payload = serde_json::to_vec(snapshot).map_err(|e| PipelineError::SerializationError(e.to_string()))?;
        let tag = sign(&self.secret, &payload);

        let mut framed = Vec::with_capacity(tag.len() * 2 + 1 + payload.len());
        framed.extend_from_slice(hex::encode(&tag).as_bytes());
        framed.push(b'\n');
        framed.extend_from_slice(&payload);

        let parent = self.path.parent().unwrap_or_else(|| std::path::Path::new("."));
        tokio::fs::create_dir_all(parent).await.map_err(|e| PipelineError::IoError(e.to_string()))?;

        let temp_path = parent.join(format!(
            ".{}.tmp-{}",
            self.path.file_name().and_then(|n| n.to_str()).unwrap_or("auth-snapshot"),
            ulid::Ulid::new()
        ));

        let mut file = tokio::fs::File::create(&temp_path).await.map_err(|e| PipelineError::IoError(e.to_string()))?;
        file.write_all(&framed).await.map_err(|e| PipelineError::IoError(e.to_string()))?;
        file.flush().await.map_err(|e| PipelineError::IoError(e.to_string()))?;
        self.platform.sync_file(&file).await.map_err(|e| PipelineError::IoError(e.to_string()))?;
        drop(file);

        tokio::fs::rename(&temp_path, &self.path).await.map_err(|e| PipelineError::IoError(e.to_string()))
    }

    /// Loads and verifies the cached snapshot. A missing file returns
    /// `Ok(None)`; a present but unsigned, mis-signed, or corrupt file is a
    /// [`PipelineError::SecurityError`], never a silently-empty snapshot.
    pub async fn load(&self) -> Result<Option<AuthSnapshot>, PipelineError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(PipelineError::IoError(err.to_string())),
        };

        let newline = bytes
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| PipelineError::SecurityError("auth snapshot cache is missing its signature line".to_string()))?;
        let (tag_hex, rest) = bytes.split_at(newline);
        let payload = &rest[1..];

        let tag = hex::decode(tag_hex)
            .map_err(|e| PipelineError::SecurityError(format!("auth snapshot cache signature is not valid hex: {e}")))?;

        if !verify(&self.secret, payload, &tag) {
            return Err(PipelineError::SecurityError("auth snapshot cache signature does not match its contents".to_string()));
        }

        let snapshot = serde_json::from_slice(payload).map_err(|e| PipelineError::SerializationError(e.to_string()))?;
        Ok(Some(snapshot))
    }
}
