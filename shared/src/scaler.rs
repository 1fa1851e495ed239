use std::sync::Arc;

use image::imageops::FilterType;
use image::GenericImageView;
use tracing::debug;

use crate::codec::Frame;
use crate::profile::Resolution;

/// Applies one resolution to a decoded frame. Pure and CPU-bound, meant to
/// run on the blocking pool.
#[derive(Clone)]
pub struct Scaler {
    resolution: Resolution,
}

impl Scaler {
    pub fn new(resolution: Resolution) -> Scaler {
        Scaler { resolution }
    }

    pub(crate) fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn apply(&self, media: &Frame) -> Frame {
        let (src_w, src_h) = media.image.dimensions();
        debug!(
            key = %media.key.path_key(),
            src_w,
            src_h,
            width = self.resolution.width,
            height = self.resolution.height,
            "scaling media object"
        );

        if self.resolution.is_replica() {
            return self.replica(media);
        }

        self.scale_to(media)
    }

    fn replica(&self, media: &Frame) -> Frame {
        Frame {
            key: media.key.with_variant(&self.resolution),
            image: media.image.clone(),
        }
    }

    fn scale_to(&self, media: &Frame) -> Frame {
        let (src_w, src_h) = media.image.dimensions();
        let (crop_x, crop_y) =
            crop_to_scale((src_w, src_h), (self.resolution.width, self.resolution.height));

        let cropped = media.image.crop_imm(
            crop_x / 2,
            crop_y / 2,
            src_w - 2 * (crop_x / 2),
            src_h - 2 * (crop_y / 2),
        );
        let image = cropped.resize_exact(
            self.resolution.width,
            self.resolution.height,
            FilterType::Lanczos3,
        );

        Frame {
            key: media.key.with_variant(&self.resolution),
            image: Arc::new(image),
        }
    }
}

/// Total pixels to trim from each axis so the source aspect ratio matches the
/// target aspect ratio. The caller trims half per side, keeping the crop
/// centered.
pub fn crop_to_scale(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (dst_w, dst_h) = target;

    let aspect_source = src_w as f64 / src_h as f64;
    let aspect_target = dst_w as f64 / dst_h as f64;

    if aspect_source > aspect_target {
        let width = (src_h as f64 * aspect_target) as u32;
        return (src_w - width, 0);
    }

    if aspect_source < aspect_target {
        let height = (src_w as f64 / aspect_target) as u32;
        return (0, src_h - height);
    }

    (0, 0)
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgb, RgbImage};

    use super::*;
    use crate::media::Media;

    fn frame(width: u32, height: u32) -> Frame {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 63])
        });

        Frame {
            key: Media::from_path("dp/photo.jpg").unwrap(),
            image: Arc::new(DynamicImage::ImageRgb8(img)),
        }
    }

    #[test]
    fn crop_matches_target_aspect() {
        for (source, target) in [
            ((1080, 1920), (128, 128)),
            ((1920, 1080), (128, 256)),
            ((1080, 1080), (1080, 1080)),
            ((101, 100), (50, 50)),
            ((480, 720), (1080, 1920)),
        ] {
            let (crop_x, crop_y) = crop_to_scale(source, target);
            let width = source.0 - 2 * (crop_x / 2);
            let height = source.1 - 2 * (crop_y / 2);

            let got = width as f64 / height as f64;
            let want = target.0 as f64 / target.1 as f64;
            assert!(
                (got - want).abs() < 0.02,
                "{source:?} -> {target:?}: cropped to {width}x{height} ({got} vs {want})"
            );
        }
    }

    #[test]
    fn equal_aspect_needs_no_crop() {
        assert_eq!(crop_to_scale((1080, 1080), (128, 128)), (0, 0));
        assert_eq!(crop_to_scale((1920, 1080), (640, 360)), (0, 0));
    }

    #[test]
    fn scales_to_exact_dimensions() {
        let source = frame(1080, 1920);
        let scaled = Scaler::new(Resolution::scale_to("small", 128, 128)).apply(&source);

        assert_eq!(scaled.image.dimensions(), (128, 128));
        assert_eq!(scaled.key.path_key(), "dp/photo.small-128x128");
    }

    #[test]
    fn upscales_to_exact_dimensions() {
        let source = frame(64, 48);
        let scaled = Scaler::new(Resolution::scale_to("cover", 480, 720)).apply(&source);

        assert_eq!(scaled.image.dimensions(), (480, 720));
    }

    #[test]
    fn replica_shares_pixels_untouched() {
        let source = frame(320, 200);
        let replica = Scaler::new(Resolution::replica("origin")).apply(&source);

        assert!(Arc::ptr_eq(&source.image, &replica.image));
        assert_eq!(replica.key.path_key(), "dp/photo.origin");
    }
}
