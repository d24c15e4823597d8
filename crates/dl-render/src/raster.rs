//! Rasterizer: shapes → single JPEG.
//!
//! Two halves so the CPU-bound part can leave the event loop:
//! [`Rasterizer::capture`] asks the editor for an SVG export (cheap, needs
//! the editor), [`SvgCapture::encode`] renders and encodes it (owned data,
//! safe to run on a blocking thread).
//!
//! The output size is the *first* shape's width/height; the exported
//! document is stretched to fit it.

use crate::svg::{SvgOptions, VectorExport};
use dl_core::model::{ImageFormat, RasterImage, Shape};
use image::codecs::jpeg::JpegEncoder;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;

/// Largest raster side, in pixels.
pub const MAX_EXTENT: u32 = 16_384;

/// Largest raster area, in pixels (256 MiB of RGBA).
pub const MAX_PIXELS: u64 = 1 << 26;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RasterizationError {
    #[error("vector export produced nothing (empty or invalid shape set)")]
    EmptyExport,

    #[error("exported SVG could not be parsed: {0}")]
    InvalidSvg(String),

    #[error("cannot allocate a {width}x{height} raster surface")]
    Surface { width: u32, height: u32 },

    #[error("JPEG encoding failed: {0}")]
    Encode(String),

    #[error("rasterization timed out")]
    Timeout,

    #[error("rasterization task failed: {0}")]
    Task(String),
}

/// An exported SVG document plus its target raster size.
#[derive(Debug, Clone)]
pub struct SvgCapture {
    pub svg: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct Rasterizer {
    /// JPEG quality, 1..=100.
    pub quality: u8,
    pub background: String,
    /// Captures wider or taller than this fail with `Surface`.
    pub max_extent: u32,
    /// Captures with more pixels than this fail with `Surface`.
    pub max_pixels: u64,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self {
            quality: 100,
            background: "#FFFFFF".to_string(),
            max_extent: MAX_EXTENT,
            max_pixels: MAX_PIXELS,
        }
    }
}

impl Rasterizer {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            ..Self::default()
        }
    }

    /// Export + encode in one call.
    pub fn rasterize<E: VectorExport + ?Sized>(
        &self,
        exporter: &E,
        shapes: &[Shape],
    ) -> Result<RasterImage, RasterizationError> {
        self.capture(exporter, shapes)?.encode(self.quality)
    }

    /// Export `shapes` at scale 1 with the background included, sized for
    /// the first shape.
    pub fn capture<E: VectorExport + ?Sized>(
        &self,
        exporter: &E,
        shapes: &[Shape],
    ) -> Result<SvgCapture, RasterizationError> {
        let first = shapes.first().ok_or(RasterizationError::EmptyExport)?;
        let width = pixel_extent(first.bounds.width);
        let height = pixel_extent(first.bounds.height);
        if !self.fits(width, height) {
            return Err(RasterizationError::Surface { width, height });
        }

        let options = SvgOptions {
            background: Some(self.background.clone()),
            scale: 1.0,
        };
        let svg = exporter
            .export_svg(shapes, &options)
            .ok_or(RasterizationError::EmptyExport)?;

        log::debug!(
            "captured {} shape(s) as {} bytes of SVG for a {width}x{height} raster",
            shapes.len(),
            svg.len()
        );
        Ok(SvgCapture { svg, width, height })
    }

    fn fits(&self, width: u32, height: u32) -> bool {
        width > 0
            && height > 0
            && width <= self.max_extent
            && height <= self.max_extent
            && u64::from(width) * u64::from(height) <= self.max_pixels
    }
}

impl SvgCapture {
    /// Render the SVG into a `width`×`height` surface and encode it as JPEG.
    pub fn encode(&self, quality: u8) -> Result<RasterImage, RasterizationError> {
        let (width, height) = (self.width, self.height);

        let tree = usvg::Tree::from_str(&self.svg, &usvg::Options::default())
            .map_err(|e| RasterizationError::InvalidSvg(e.to_string()))?;

        let mut pixmap =
            Pixmap::new(width, height).ok_or(RasterizationError::Surface { width, height })?;

        let size = tree.size();
        let transform = Transform::from_scale(
            width as f32 / size.width(),
            height as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        // Premultiplied RGBA over white → RGB.
        let rgb: Vec<u8> = pixmap
            .data()
            .chunks_exact(4)
            .flat_map(|px| {
                let inv = 255 - px[3];
                [
                    px[0].saturating_add(inv),
                    px[1].saturating_add(inv),
                    px[2].saturating_add(inv),
                ]
            })
            .collect();
        let img = image::RgbImage::from_raw(width, height, rgb)
            .ok_or(RasterizationError::Surface { width, height })?;

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
            .encode_image(&img)
            .map_err(|e| RasterizationError::Encode(e.to_string()))?;

        Ok(RasterImage {
            bytes,
            width,
            height,
            format: ImageFormat::Jpeg,
        })
    }
}

fn pixel_extent(v: f64) -> u32 {
    if v.is_finite() && v >= 1.0 {
        v.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}
