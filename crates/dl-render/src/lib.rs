pub mod hit;
pub mod raster;
pub mod svg;

pub use raster::{RasterizationError, Rasterizer, SvgCapture};
pub use svg::{SvgOptions, VectorExport, export_svg};
