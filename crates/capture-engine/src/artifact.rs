//! Artifact Manager: finalizes encoder chunks into one immutable recording
//! and hands it to external collaborators.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use duet_common::error::{DuetError, DuetResult};
use duet_media_model::artifact::ArtifactMeta;
use duet_media_model::quality::QualityTier;

use crate::encoder::Chunk;

/// A finalized recording. Cheap to clone; all clones share the bytes.
#[derive(Debug, Clone)]
pub struct Artifact {
    meta: ArtifactMeta,
    bytes: Arc<[u8]>,
}

impl Artifact {
    pub fn meta(&self) -> &ArtifactMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.meta.duration_secs)
    }

    /// View for a local download.
    pub fn to_downloadable(&self) -> Downloadable {
        Downloadable {
            file_name: self.meta.file_name(),
            mime_type: self.meta.mime_type.clone(),
            bytes: Arc::clone(&self.bytes),
        }
    }

    /// View for the save flow.
    pub fn to_storable(&self) -> Storable {
        Storable {
            meta: self.meta.clone(),
            bytes: Arc::clone(&self.bytes),
        }
    }
}

/// Bytes plus the name and type a browser-style download needs.
#[derive(Debug, Clone)]
pub struct Downloadable {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

/// Bytes plus full metadata, as stored by the save flow.
#[derive(Debug, Clone)]
pub struct Storable {
    pub meta: ArtifactMeta,
    pub bytes: Arc<[u8]>,
}

/// What a session contributes to its artifact.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: String,
    pub duration: Duration,
    pub quality: QualityTier,
    pub mime_type: String,
}

/// Concatenates ordered chunks into artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactManager;

impl ArtifactManager {
    pub fn new() -> Self {
        Self
    }

    /// Build the artifact for a finished session.
    ///
    /// Chunks must already be in sequence order. Zero chunks (or zero bytes)
    /// is a failed recording.
    pub fn finalize(&self, summary: &SessionSummary, chunks: &[Chunk]) -> DuetResult<Artifact> {
        if chunks.is_empty() {
            return Err(DuetError::recording_failed("no data was recorded"));
        }
        if let Some(pair) = chunks.windows(2).find(|w| w[1].seq != w[0].seq + 1) {
            return Err(DuetError::recording_failed(format!(
                "chunk sequence broken between {} and {}",
                pair[0].seq, pair[1].seq
            )));
        }

        let total: usize = chunks.iter().map(|c| c.data.len()).sum();
        if total == 0 {
            return Err(DuetError::recording_failed("no data was recorded"));
        }
        let mut bytes = Vec::with_capacity(total);
        for chunk in chunks {
            bytes.extend_from_slice(&chunk.data);
        }

        let meta = ArtifactMeta {
            session_id: summary.session_id.clone(),
            duration_secs: summary.duration.as_secs_f64(),
            quality: summary.quality,
            byte_len: total as u64,
            chunk_count: chunks.len(),
            mime_type: summary.mime_type.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        tracing::info!(
            session = %meta.session_id,
            bytes = meta.byte_len,
            chunks = meta.chunk_count,
            duration_secs = meta.duration_secs,
            "Artifact finalized"
        );
        Ok(Artifact {
            meta,
            bytes: bytes.into(),
        })
    }
}

/// Where an accepted artifact went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactReceipt {
    /// Written to local storage.
    Downloaded { path: PathBuf, sidecar: PathBuf },
    /// Handed to the save flow.
    HandedOff { session_id: String },
}

/// An external collaborator that takes accepted artifacts.
#[async_trait::async_trait]
pub trait ArtifactSink: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, artifact: &Artifact) -> DuetResult<ArtifactReceipt>;
}

/// Writes artifacts into a directory with a JSON metadata sidecar.
#[derive(Debug, Clone)]
pub struct DownloadSink {
    dir: PathBuf,
}

impl DownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl ArtifactSink for DownloadSink {
    fn name(&self) -> &str {
        "download"
    }

    async fn deliver(&self, artifact: &Artifact) -> DuetResult<ArtifactReceipt> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let download = artifact.to_downloadable();
        let path = self.dir.join(&download.file_name);
        tokio::fs::write(&path, &download.bytes[..]).await?;

        let sidecar = path.with_extension("json");
        let json = serde_json::to_string_pretty(artifact.meta())?;
        tokio::fs::write(&sidecar, json).await?;

        tracing::info!(path = %path.display(), bytes = download.bytes.len(), "Artifact downloaded");
        Ok(ArtifactReceipt::Downloaded { path, sidecar })
    }
}

/// Hands storable artifacts to a save flow over a channel.
#[derive(Debug, Clone)]
pub struct SaveFlowSink {
    tx: UnboundedSender<Storable>,
}

impl SaveFlowSink {
    pub fn new(tx: UnboundedSender<Storable>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl ArtifactSink for SaveFlowSink {
    fn name(&self) -> &str {
        "save-flow"
    }

    async fn deliver(&self, artifact: &Artifact) -> DuetResult<ArtifactReceipt> {
        let storable = artifact.to_storable();
        let session_id = storable.meta.session_id.clone();
        self.tx
            .send(storable)
            .map_err(|_| DuetError::unsupported("the save flow is no longer listening"))?;
        tracing::info!(session = %session_id, "Artifact handed to save flow");
        Ok(ArtifactReceipt::HandedOff { session_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(seq: u64, data: &[u8]) -> Chunk {
        Chunk {
            seq,
            start: Duration::from_millis(seq * 250),
            duration: Duration::from_millis(250),
            data: data.to_vec(),
        }
    }

    fn summary() -> SessionSummary {
        SessionSummary {
            session_id: "s1".to_string(),
            duration: Duration::from_secs(5),
            quality: QualityTier::Standard,
            mime_type: "video/x-matroska".to_string(),
        }
    }

    #[test]
    fn finalize_concatenates_in_order() {
        let artifact = ArtifactManager::new()
            .finalize(&summary(), &[chunk(0, b"ab"), chunk(1, b"cd"), chunk(2, b"e")])
            .unwrap();
        assert_eq!(artifact.meta().byte_len, 5);
        assert_eq!(artifact.meta().chunk_count, 3);
        assert_eq!(&artifact.to_downloadable().bytes[..], b"abcde");
        assert_eq!(artifact.duration(), Duration::from_secs(5));
    }

    #[test]
    fn zero_chunks_is_a_failed_recording() {
        let err = ArtifactManager::new().finalize(&summary(), &[]).unwrap_err();
        assert!(matches!(err, DuetError::RecordingFailed { .. }));
    }

    #[test]
    fn gaps_in_the_sequence_are_rejected() {
        let result = ArtifactManager::new().finalize(&summary(), &[chunk(0, b"a"), chunk(2, b"b")]);
        assert!(result.is_err());
    }

    #[test]
    fn views_share_one_allocation() {
        let artifact = ArtifactManager::new()
            .finalize(&summary(), &[chunk(0, b"xyz")])
            .unwrap();
        let download = artifact.to_downloadable();
        let storable = artifact.to_storable();
        assert!(Arc::ptr_eq(&download.bytes, &storable.bytes));
        assert_eq!(download.file_name, "duet-s1.mkv");
        assert_eq!(storable.meta, *artifact.meta());
    }

    #[tokio::test]
    async fn download_sink_writes_file_and_sidecar() {
        let dir = std::env::temp_dir().join("duet_test_download_sink");
        let _ = std::fs::remove_dir_all(&dir);

        let artifact = ArtifactManager::new()
            .finalize(&summary(), &[chunk(0, b"data")])
            .unwrap();
        let receipt = DownloadSink::new(&dir).deliver(&artifact).await.unwrap();
        let ArtifactReceipt::Downloaded { path, sidecar } = receipt else {
            panic!("expected a download receipt");
        };
        assert_eq!(std::fs::read(&path).unwrap(), b"data");
        let meta: ArtifactMeta =
            serde_json::from_str(&std::fs::read_to_string(&sidecar).unwrap()).unwrap();
        assert_eq!(meta.session_id, "s1");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn save_flow_sink_hands_off_storable() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let artifact = ArtifactManager::new()
            .finalize(&summary(), &[chunk(0, b"data")])
            .unwrap();
        let receipt = SaveFlowSink::new(tx).deliver(&artifact).await.unwrap();
        assert_eq!(
            receipt,
            ArtifactReceipt::HandedOff {
                session_id: "s1".to_string()
            }
        );
        assert_eq!(rx.recv().await.unwrap().meta.byte_len, 4);
    }

    #[tokio::test]
    async fn save_flow_sink_reports_closed_channel() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        let artifact = ArtifactManager::new()
            .finalize(&summary(), &[chunk(0, b"data")])
            .unwrap();
        assert!(SaveFlowSink::new(tx).deliver(&artifact).await.is_err());
    }
}
