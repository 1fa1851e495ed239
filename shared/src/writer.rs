use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use tokio::task;
use tokio_util::io::SyncIoBridge;
use tracing::debug;

use crate::codec::{CodecError, Frame, Putter};

// 93% is the practical quality/size optimum for derived variants
const JPEG_QUALITY: u8 = 93;

const OUTPUT_EXT: &str = "jpg";
const OUTPUT_CONTENT_TYPE: &str = "image/jpg";

/// Encodes a derived frame and persists it to the output store.
#[derive(Clone)]
pub struct Writer {
    putter: Arc<dyn Putter>,
}

impl Writer {
    pub fn new(putter: Arc<dyn Putter>) -> Writer {
        Writer { putter }
    }

    /// Encodes the frame as JPEG and streams it to the output store under the
    /// frame's key with the output extension and content type appended.
    ///
    /// The encoder runs on the blocking pool feeding a pipe, so the transfer
    /// starts before the whole image is encoded. An encode failure surfaces
    /// here even when the store write itself went through.
    pub async fn put(&self, media: Frame) -> Result<(), CodecError> {
        let key = media.key.with_encoding(OUTPUT_EXT, OUTPUT_CONTENT_TYPE);

        debug!(key = %key.path_key(), "write media object");

        let (body, pipe) = tokio::io::duplex(64 * 1024);
        let image = media.image;
        let encode = task::spawn_blocking(move || {
            let mut pipe = SyncIoBridge::new(pipe);
            JpegEncoder::new_with_quality(&mut pipe, JPEG_QUALITY).encode_image(&image.to_rgb8())
        });

        let (put, encode) = tokio::join!(self.putter.put(&key, Box::pin(body)), encode);
        put?;
        encode.map_err(CodecError::io)?.map_err(CodecError::io)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::codec::MediaBody;
    use crate::media::Media;

    #[derive(Default)]
    struct MemPutter {
        objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
    }

    #[async_trait]
    impl Putter for MemPutter {
        async fn put(&self, key: &Media, mut body: MediaBody) -> Result<(), CodecError> {
            let mut buf = Vec::new();
            body.read_to_end(&mut buf).await.map_err(CodecError::io)?;
            self.objects
                .lock()
                .unwrap()
                .insert(key.path_key(), (key.content_type.clone(), buf));

            Ok(())
        }
    }

    struct FailPutter;

    #[async_trait]
    impl Putter for FailPutter {
        async fn put(&self, _key: &Media, _body: MediaBody) -> Result<(), CodecError> {
            Err(CodecError::io("store unavailable"))
        }
    }

    fn frame(width: u32, height: u32) -> Frame {
        Frame {
            key: Media::from_path("av/user1.origin").unwrap(),
            image: Arc::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                width,
                height,
                Rgb([10, 20, 30]),
            ))),
        }
    }

    #[tokio::test]
    async fn encodes_jpeg_under_output_key() {
        let putter = Arc::new(MemPutter::default());
        let writer = Writer::new(putter.clone());

        writer.put(frame(64, 48)).await.unwrap();

        let objects = putter.objects.lock().unwrap();
        let (content_type, body) = objects.get("av/user1.origin.jpg").expect("written object");
        assert_eq!(content_type, "image/jpg");

        let decoded = image::load_from_memory(body).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[tokio::test]
    async fn store_failure_surfaces() {
        let writer = Writer::new(Arc::new(FailPutter));

        let result = writer.put(frame(16, 16)).await;

        assert!(matches!(result, Err(CodecError::Io(_))));
    }
}
