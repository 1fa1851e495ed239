use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;
use tracing::error;

use crate::media::Media;
use crate::profile::Profile;
use crate::reader::Reader;
use crate::scaler::Scaler;
use crate::writer::Writer;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Streaming body handed to a [`Putter`]; produced incrementally while the
/// encoder is still running.
pub type MediaBody = Pin<Box<dyn AsyncRead + Send>>;

#[derive(Debug, Error)]
pub enum CodecError {
    /// The source object format is not recognized. Terminal for that object,
    /// retrying the notification cannot succeed.
    #[error("not supported ({0})")]
    NotSupported(String),

    /// Storage, network or codec failure wrapping the underlying cause. The
    /// delivery layer decides whether the notification is retried.
    #[error("codec I/O error: {0}")]
    Io(#[source] BoxError),
}

impl CodecError {
    pub fn io(err: impl Into<BoxError>) -> CodecError {
        CodecError::Io(err.into())
    }
}

/// Abstract media file reader, the input store capability.
#[async_trait]
pub trait Getter: Send + Sync {
    async fn get(&self, key: &Media) -> Result<Bytes, CodecError>;
}

/// Abstract media file writer, the output store capability.
#[async_trait]
pub trait Putter: Send + Sync {
    async fn put(&self, key: &Media, body: MediaBody) -> Result<(), CodecError>;
}

/// Completion sink, announces one fully transcoded media object.
#[async_trait]
pub trait Emitter: Send + Sync {
    async fn enq(&self, event: MediaPublished) -> Result<(), CodecError>;
}

/// One object-created notification from the inbox store.
#[derive(Debug, Clone)]
pub struct ObjectCreated {
    pub bucket: String,
    pub key: String,
}

/// Completion event: where the derived object family lives and which variants
/// were written.
#[derive(Debug, Clone, Serialize)]
pub struct MediaPublished {
    pub bucket: String,
    pub key: String,
    pub variants: Vec<String>,
}

/// In-memory media object: its key and one decoded frame. The pixel buffer is
/// shared read-only between variant tasks.
#[derive(Clone)]
pub struct Frame {
    pub(crate) key: Media,
    pub(crate) image: Arc<DynamicImage>,
}

/// Transcoding pipeline for one profile: a single reader feeding one
/// scaler/writer pair per configured resolution.
pub struct Codec {
    reader: Reader,
    scaler: Vec<Scaler>,
    writer: Writer,
    emitter: Option<Arc<dyn Emitter>>,
    store_media: String,
}

impl Codec {
    pub fn new(
        profile: &Profile,
        getter: Arc<dyn Getter>,
        putter: Arc<dyn Putter>,
        emitter: Option<Arc<dyn Emitter>>,
        store_media: impl Into<String>,
    ) -> Result<Codec, CodecError> {
        let scaler = profile
            .resolutions
            .iter()
            .cloned()
            .map(Scaler::new)
            .collect();

        Ok(Codec {
            reader: Reader::new(getter)?,
            scaler,
            writer: Writer::new(putter),
            emitter,
            store_media: store_media.into(),
        })
    }

    /// Runs the pipeline for one notification: a single read, then one
    /// concurrent scale-and-write task per resolution, then the optional
    /// completion event on full success.
    ///
    /// Every task runs to completion even when a sibling fails; the first
    /// failure becomes the verdict and variants that were already written
    /// stay in the store. Re-invoking for the same key overwrites the same
    /// variants, so redelivered notifications are safe.
    pub async fn process(&self, evt: &ObjectCreated) -> Result<(), CodecError> {
        let media = self.reader.get(evt).await?;

        let tasks: Vec<JoinHandle<Result<(), CodecError>>> = self
            .scaler
            .iter()
            .map(|scaler| {
                let scaler = scaler.clone();
                let media = media.clone();
                let writer = self.writer.clone();

                tokio::spawn(async move {
                    let variant = tokio::task::spawn_blocking(move || scaler.apply(&media))
                        .await
                        .map_err(CodecError::io)?;

                    writer.put(variant).await
                })
            })
            .collect();

        let mut failed = None;
        for task in tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(err) => Err(CodecError::io(err)),
            };

            if let Err(err) = result {
                error!(key = %evt.key, error = %err, "failed to derive variant");
                failed.get_or_insert(err);
            }
        }
        if let Some(err) = failed {
            return Err(err);
        }

        self.sink(&media).await;

        Ok(())
    }

    /// Best-effort completion event; the variants are already durable, so an
    /// emission failure is logged, not returned.
    async fn sink(&self, media: &Frame) {
        let emitter = match &self.emitter {
            Some(emitter) => emitter,
            None => return,
        };

        let event = MediaPublished {
            bucket: self.store_media.clone(),
            key: media.key.path_key(),
            variants: self
                .scaler
                .iter()
                .map(|scaler| scaler.resolution().to_string())
                .collect(),
        };

        if let Err(err) = emitter.enq(event).await {
            error!(key = %media.key.path_key(), error = %err, "failed to emit completion event");
        }
    }
}
