/// Thumbnail Renderer
///
/// Turns any supported source image into a fixed-size, flattened JPEG:
/// 1. Decode (animated formats yield their first frame)
/// 2. Composite transparency onto the background colour
/// 3. Resize preserving aspect ratio so it fits the target box
/// 4. Center on a background-filled canvas (letterboxing)
/// 5. Encode as JPEG at the requested quality

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, imageops::FilterType, DynamicImage, ImageBuffer, ImageError, Rgb, RgbImage};
use std::path::Path;

use crate::config::{Background, DEFAULT_QUALITY};
use crate::error::{Error, Result};

/// Rendering settings shared by every variant of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderer {
    pub quality: u8,
    pub background: Rgb<u8>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY, Background::White)
    }
}

impl Renderer {
    pub fn new(quality: u8, background: Background) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            background: background.rgb(),
        }
    }

    /// Render from an already-decoded image; `origin` is only used in errors.
    ///
    /// The synchronizer decodes once and calls this for each size.
    pub fn render_image(&self, img: &DynamicImage, target: (u32, u32), origin: &Path) -> Result<Vec<u8>> {
        let canvas = letterbox(img, target, self.background);
        encode_jpeg(&canvas, self.quality).map_err(|source| Error::Render {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Render from encoded bytes (downloaded images)
    pub fn render_bytes(&self, bytes: &[u8], target: (u32, u32), origin: &Path) -> Result<Vec<u8>> {
        let img = image::load_from_memory(bytes).map_err(|source| Error::Render {
            path: origin.to_path_buf(),
            source,
        })?;
        self.render_image(&img, target, origin)
    }
}

/// Decode an image file, sniffing the format from its content
pub fn decode_path(path: &Path) -> Result<DynamicImage> {
    let render_err = |source: ImageError| Error::Render {
        path: path.to_path_buf(),
        source,
    };

    image::ImageReader::open(path)
        .map_err(|e| render_err(ImageError::IoError(e)))?
        .with_guessed_format()
        .map_err(|e| render_err(ImageError::IoError(e)))?
        .decode()
        .map_err(render_err)
}

/// Drop the alpha channel by compositing onto `background`
pub fn flatten(img: &DynamicImage, background: Rgb<u8>) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = u32::from(px[3]);
        let blend = |fg: u8, bg: u8| {
            ((u32::from(fg) * alpha + u32::from(bg) * (255 - alpha) + 127) / 255) as u8
        };
        out.put_pixel(
            x,
            y,
            Rgb([
                blend(px[0], background[0]),
                blend(px[1], background[1]),
                blend(px[2], background[2]),
            ]),
        );
    }
    out
}

/// Largest size with the source's aspect ratio that fits inside `target`.
///
/// Small sources are scaled up; neither side drops below one pixel.
pub fn fit_within(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (sw, sh) = (source.0.max(1) as f64, source.1.max(1) as f64);
    let (tw, th) = (target.0 as f64, target.1 as f64);
    let scale = (tw / sw).min(th / sh);

    let w = ((sw * scale).round() as u32).clamp(1, target.0.max(1));
    let h = ((sh * scale).round() as u32).clamp(1, target.1.max(1));
    (w, h)
}

/// Flatten, resize and center `img` on a `target`-sized canvas
pub fn letterbox(img: &DynamicImage, target: (u32, u32), background: Rgb<u8>) -> RgbImage {
    let flat = flatten(img, background);
    let (w, h) = fit_within(flat.dimensions(), target);
    let resized = imageops::resize(&flat, w, h, FilterType::Lanczos3);

    let mut canvas: RgbImage = ImageBuffer::from_pixel(target.0, target.1, background);
    let x = (target.0 - w) / 2;
    let y = (target.1 - h) / 2;
    imageops::overlay(&mut canvas, &resized, i64::from(x), i64::from(y));
    canvas
}

fn encode_jpeg(canvas: &RgbImage, quality: u8) -> std::result::Result<Vec<u8>, ImageError> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder.encode_image(canvas)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};
    use std::fs;
    use tempfile::TempDir;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn render_file(renderer: &Renderer, source: &Path, target: (u32, u32)) -> Result<Vec<u8>> {
        let img = decode_path(source)?;
        renderer.render_image(&img, target, source)
    }

    fn solid(w: u32, h: u32, px: Rgba<u8>) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, px))
    }

    #[test]
    fn test_fit_within_keeps_aspect() {
        assert_eq!(fit_within((200, 100), (190, 190)), (190, 95));
        assert_eq!(fit_within((100, 400), (100, 100)), (25, 100));
        assert_eq!(fit_within((500, 500), (30, 30)), (30, 30));
        // Upscaling is allowed
        assert_eq!(fit_within((10, 5), (190, 190)), (190, 95));
        // Extreme aspect never collapses to zero
        assert_eq!(fit_within((3000, 1), (30, 30)), (30, 1));
    }

    #[test]
    fn test_letterbox_wide_source() {
        let img = solid(200, 100, Rgba([255, 0, 0, 255]));
        let canvas = letterbox(&img, (190, 190), WHITE);

        assert_eq!(canvas.dimensions(), (190, 190));
        // Image occupies rows 47..142, padding above and below
        for x in [0, 95, 189] {
            assert_eq!(*canvas.get_pixel(x, 0), WHITE);
            assert_eq!(*canvas.get_pixel(x, 46), WHITE);
            assert_eq!(*canvas.get_pixel(x, 142), WHITE);
            assert_eq!(*canvas.get_pixel(x, 189), WHITE);
        }
        let center = canvas.get_pixel(95, 95);
        assert!(center[0] > 240 && center[1] < 15 && center[2] < 15, "{center:?}");
        // Longer side spans the full width
        let edge = canvas.get_pixel(0, 95);
        assert!(edge[0] > 200 && edge[1] < 60, "{edge:?}");
    }

    #[test]
    fn test_letterbox_tall_source_black_background() {
        let img = solid(50, 100, Rgba([0, 0, 255, 255]));
        let canvas = letterbox(&img, (100, 100), BLACK);

        assert_eq!(canvas.dimensions(), (100, 100));
        // Scaled to 50x100, columns 25..75
        for y in [0, 50, 99] {
            assert_eq!(*canvas.get_pixel(0, y), BLACK);
            assert_eq!(*canvas.get_pixel(24, y), BLACK);
            assert_eq!(*canvas.get_pixel(75, y), BLACK);
            assert_eq!(*canvas.get_pixel(99, y), BLACK);
        }
        assert!(canvas.get_pixel(50, 50)[2] > 240);
    }

    #[test]
    fn test_transparency_uses_background() {
        let clear = solid(4, 4, Rgba([255, 0, 0, 0]));
        assert!(flatten(&clear, BLACK).pixels().all(|p| *p == BLACK));
        assert!(flatten(&clear, WHITE).pixels().all(|p| *p == WHITE));

        let half = solid(1, 1, Rgba([255, 255, 255, 128]));
        let px = flatten(&half, BLACK).get_pixel(0, 0)[0];
        assert!((127..=129).contains(&px), "{px}");
    }

    #[test]
    fn test_render_png_to_jpeg_of_exact_size() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("wide.png");
        RgbaImage::from_pixel(64, 32, Rgba([10, 200, 10, 255]))
            .save(&source)
            .unwrap();

        let bytes = render_file(&Renderer::new(85, Background::White), &source, (30, 30)).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (30, 30));
    }

    #[test]
    fn test_render_gif_uses_first_frame() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("elder.gif");
        RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]))
            .save(&source)
            .unwrap();

        let bytes = render_file(&Renderer::default(), &source, (100, 100)).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (100, 100));
    }

    #[test]
    fn test_render_sniffs_content_not_extension() {
        let dir = TempDir::new().unwrap();
        let real_png = dir.path().join("mislabeled.jpg");
        let png = dir.path().join("real.png");
        RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255])).save(&png).unwrap();
        fs::copy(&png, &real_png).unwrap();

        assert!(render_file(&Renderer::default(), &real_png, (30, 30)).is_ok());
    }

    #[test]
    fn test_corrupt_source_is_render_error() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("broken.png");
        fs::write(&source, b"definitely not a png").unwrap();

        let result = render_file(&Renderer::default(), &source, (30, 30));
        assert!(matches!(result, Err(Error::Render { .. })));

        let missing = render_file(&Renderer::default(), &dir.path().join("nope.png"), (30, 30));
        assert!(matches!(missing, Err(Error::Render { .. })));
    }

    #[test]
    fn test_render_bytes_rejects_garbage() {
        let result = Renderer::default().render_bytes(b"<html>", (30, 30), Path::new("remote"));
        assert!(matches!(result, Err(Error::Render { .. })));
    }
}
