//! Off-thread compression worker
//!
//! Callers post a request carrying their own correlation id and await the
//! matching response. Jobs run on the blocking pool so gzip never stalls
//! the async workers. There is no timeout and no cancellation: once a
//! request is posted it runs to completion.

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Compression worker is not running")]
    WorkerGone,

    #[error("{action:?} failed: {message}")]
    Failed { action: CompressionAction, message: String },

    #[error("Response {got} does not match request {expected}")]
    Mismatch { expected: Uuid, got: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAction {
    Compress,
    Decompress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionRequest {
    pub id: Uuid,
    pub action: CompressionAction,
    pub data: Vec<u8>,
}

/// Exactly one of `result` / `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionResponse {
    pub id: Uuid,
    pub result: Option<Vec<u8>>,
    pub error: Option<String>,
}

type Job = (CompressionRequest, oneshot::Sender<CompressionResponse>);

pub struct CompressionWorker {
    tx: mpsc::Sender<Job>,
    handle: JoinHandle<()>,
}

impl CompressionWorker {
    /// Start the worker on the current tokio runtime.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::channel::<Job>(64);

        let handle = tokio::spawn(async move {
            while let Some((request, reply)) = rx.recv().await {
                let id = request.id;
                let response = match tokio::task::spawn_blocking(move || process(request)).await {
                    Ok(response) => response,
                    Err(e) => CompressionResponse {
                        id,
                        result: None,
                        error: Some(e.to_string()),
                    },
                };
                // caller may have gone away; nothing to do
                let _ = reply.send(response);
            }
            tracing::debug!("Compression worker stopped");
        });

        Self { tx, handle }
    }

    /// Post a raw request and wait for its response.
    pub async fn submit(&self, request: CompressionRequest) -> Result<CompressionResponse, CompressionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .await
            .map_err(|_| CompressionError::WorkerGone)?;
        reply_rx.await.map_err(|_| CompressionError::WorkerGone)
    }

    async fn run(&self, action: CompressionAction, data: Vec<u8>) -> Result<Vec<u8>, CompressionError> {
        let id = Uuid::new_v4();
        let response = self.submit(CompressionRequest { id, action, data }).await?;

        if response.id != id {
            return Err(CompressionError::Mismatch {
                expected: id,
                got: response.id,
            });
        }
        match (response.result, response.error) {
            (Some(result), None) => Ok(result),
            (_, error) => Err(CompressionError::Failed {
                action,
                message: error.unwrap_or_else(|| "empty response".to_string()),
            }),
        }
    }

    pub async fn compress(&self, data: Vec<u8>) -> Result<Vec<u8>, CompressionError> {
        self.run(CompressionAction::Compress, data).await
    }

    pub async fn decompress(&self, data: Vec<u8>) -> Result<Vec<u8>, CompressionError> {
        self.run(CompressionAction::Decompress, data).await
    }

    /// Stop accepting work. Pending callers see `WorkerGone`.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for CompressionWorker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn process(request: CompressionRequest) -> CompressionResponse {
    let outcome = match request.action {
        CompressionAction::Compress => gzip(&request.data),
        CompressionAction::Decompress => gunzip(&request.data),
    };
    match outcome {
        Ok(result) => CompressionResponse {
            id: request.id,
            result: Some(result),
            error: None,
        },
        Err(e) => CompressionResponse {
            id: request.id,
            result: None,
            error: Some(e.to_string()),
        },
    }
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn gunzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_compress_roundtrip() {
        let worker = CompressionWorker::spawn();
        let data = "journal entry ".repeat(200).into_bytes();

        let packed = worker.compress(data.clone()).await.unwrap();
        assert!(packed.len() < data.len());

        let unpacked = worker.decompress(packed).await.unwrap();
        assert_eq!(unpacked, data);
    }

    #[tokio::test]
    async fn test_correlation_id_roundtrips() {
        let worker = CompressionWorker::spawn();
        let id = Uuid::new_v4();
        let response = worker
            .submit(CompressionRequest {
                id,
                action: CompressionAction::Compress,
                data: b"abc".to_vec(),
            })
            .await
            .unwrap();

        assert_eq!(response.id, id);
        assert!(response.result.is_some());
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_bad_input_reports_error() {
        let worker = CompressionWorker::spawn();
        let err = worker.decompress(b"definitely not gzip".to_vec()).await.unwrap_err();
        assert!(matches!(
            err,
            CompressionError::Failed { action: CompressionAction::Decompress, .. }
        ));
    }

    #[tokio::test]
    async fn test_shutdown_worker_is_gone() {
        let worker = CompressionWorker::spawn();
        worker.shutdown();
        tokio::task::yield_now().await;

        let err = worker.compress(b"x".to_vec()).await.unwrap_err();
        assert!(matches!(err, CompressionError::WorkerGone));
    }
}
