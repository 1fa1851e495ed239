use async_trait::async_trait;
use aws_sdk_eventbridge::model::PutEventsRequestEntry;
use aws_sdk_s3::types::ByteStream;
use aws_smithy_http::body::SdkBody;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

use crate::codec::{CodecError, Emitter, Getter, MediaBody, MediaPublished, Putter};
use crate::media::Media;

const EVENT_SOURCE: &str = "media-transcoder";
const EVENT_DETAIL_TYPE: &str = "MediaPublished";

/// Inbox bucket reader.
pub struct S3Getter {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Getter {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> S3Getter {
        S3Getter {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl Getter for S3Getter {
    async fn get(&self, key: &Media) -> Result<Bytes, CodecError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.path_key())
            .send()
            .await
            .map_err(CodecError::io)?;

        let body = output.body.collect().await.map_err(CodecError::io)?;

        Ok(body.into_bytes())
    }
}

/// Media bucket writer.
pub struct S3Putter {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Putter {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> S3Putter {
        S3Putter {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl Putter for S3Putter {
    async fn put(&self, key: &Media, mut body: MediaBody) -> Result<(), CodecError> {
        // PutObject wants a sized body, drain the encoder's pipe first
        let mut buf = Vec::new();
        body.read_to_end(&mut buf).await.map_err(CodecError::io)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.path_key())
            .content_type(&key.content_type)
            .body(ByteStream::new(SdkBody::from(buf)))
            .send()
            .await
            .map_err(CodecError::io)?;

        Ok(())
    }
}

/// Completion sink backed by an event bus.
pub struct EventBridgeEmitter {
    client: aws_sdk_eventbridge::Client,
    bus: String,
}

impl EventBridgeEmitter {
    pub fn new(client: aws_sdk_eventbridge::Client, bus: impl Into<String>) -> EventBridgeEmitter {
        EventBridgeEmitter {
            client,
            bus: bus.into(),
        }
    }
}

#[async_trait]
impl Emitter for EventBridgeEmitter {
    async fn enq(&self, event: MediaPublished) -> Result<(), CodecError> {
        let detail = serde_json::to_string(&event).map_err(CodecError::io)?;

        let entry = PutEventsRequestEntry::builder()
            .event_bus_name(&self.bus)
            .source(EVENT_SOURCE)
            .detail_type(EVENT_DETAIL_TYPE)
            .detail(detail)
            .build();

        let output = self
            .client
            .put_events()
            .entries(entry)
            .send()
            .await
            .map_err(CodecError::io)?;

        if output.failed_entry_count() > 0 {
            return Err(CodecError::io(format!(
                "event bus {} rejected {} entries",
                self.bus,
                output.failed_entry_count()
            )));
        }

        Ok(())
    }
}
