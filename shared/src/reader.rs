use std::io::Cursor;
use std::sync::Arc;

use image::io::Reader as ImageReader;
use image::DynamicImage;
use serde::Deserialize;
use tracing::debug;

use crate::codec::{CodecError, Frame, Getter, ObjectCreated};
use crate::media::Media;

/// Formats the pipeline knows how to acquire. Everything else falls through
/// to `Unsupported` and is rejected before the input store is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MediaFormat {
    Image,
    Link,
    Unsupported(String),
}

impl MediaFormat {
    pub(crate) fn from_path(path: &str) -> MediaFormat {
        let name = path.rsplit('/').next().unwrap_or(path);
        let ext = match name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => String::new(),
        };

        match ext.as_str() {
            "jpg" | "jpeg" => MediaFormat::Image,
            "json" => MediaFormat::Link,
            _ => MediaFormat::Unsupported(ext),
        }
    }
}

/// Remote-hosted original: a link object names the exact URL to fetch.
#[derive(Debug, Deserialize)]
struct Link {
    url: String,
}

/// Acquires decoded pixel data for one source key, following at most one
/// level of indirection for link objects.
pub struct Reader {
    getter: Arc<dyn Getter>,
    http: reqwest::Client,
}

impl Reader {
    pub fn new(getter: Arc<dyn Getter>) -> Result<Reader, CodecError> {
        // a link object names one exact location; a redirect response is a
        // hard failure, never followed
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(CodecError::io)?;

        Ok(Reader { getter, http })
    }

    pub async fn get(&self, evt: &ObjectCreated) -> Result<Frame, CodecError> {
        let path = urlencoding::decode(&evt.key).map_err(CodecError::io)?;
        let key = Media::from_path(&path).map_err(CodecError::io)?;

        debug!(bucket = %evt.bucket, key = %path, "getting media object");

        match MediaFormat::from_path(&path) {
            MediaFormat::Image => self.fetch_media_image(key).await,
            MediaFormat::Link => self.fetch_media_link(key).await,
            MediaFormat::Unsupported(ext) => Err(CodecError::NotSupported(ext)),
        }
    }

    async fn fetch_media_image(&self, key: Media) -> Result<Frame, CodecError> {
        let body = self.getter.get(&key).await?;
        let image = decode(&body)?;

        Ok(Frame {
            key,
            image: Arc::new(image),
        })
    }

    async fn fetch_media_link(&self, key: Media) -> Result<Frame, CodecError> {
        let body = self.getter.get(&key).await?;
        let link: Link = serde_json::from_slice(&body).map_err(CodecError::io)?;
        let image = self.fetch_remote(&link.url).await?;

        Ok(Frame {
            key,
            image: Arc::new(image),
        })
    }

    async fn fetch_remote(&self, url: &str) -> Result<DynamicImage, CodecError> {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "image/*")
            .send()
            .await
            .map_err(CodecError::io)?;

        // redirect statuses land here as-is and fail the success check
        if !response.status().is_success() {
            return Err(CodecError::io(format!("GET {url}: {}", response.status())));
        }

        let body = response.bytes().await.map_err(CodecError::io)?;
        decode(&body)
    }
}

fn decode(body: &[u8]) -> Result<DynamicImage, CodecError> {
    ImageReader::new(Cursor::new(body))
        .with_guessed_format()
        .map_err(CodecError::io)?
        .decode()
        .map_err(CodecError::io)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_format_by_extension() {
        for (path, expect) in [
            ("av/user1.jpg", MediaFormat::Image),
            ("av/USER1.JPG", MediaFormat::Image),
            ("av/user1.jpeg", MediaFormat::Image),
            ("av/user1.json", MediaFormat::Link),
            ("av/user1.png", MediaFormat::Unsupported("png".to_string())),
            ("av/user1", MediaFormat::Unsupported(String::new())),
            ("av.snapshots/user1", MediaFormat::Unsupported(String::new())),
        ] {
            assert_eq!(MediaFormat::from_path(path), expect, "{path}");
        }
    }
}
