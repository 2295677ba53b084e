use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{RasterError, RasterResult};
use crate::raster::buffer::RasterBuffer;

impl RasterBuffer<Rgba8> {
    /// Copy into an `image` RGBA8 buffer.
    pub fn to_rgba_image(&self) -> RasterResult<image::RgbaImage> {
        let mut bytes = Vec::with_capacity(self.len() * 4);
        for px in self.as_slice() {
            bytes.extend_from_slice(&[px.r, px.g, px.b, px.a]);
        }
        image::RgbaImage::from_raw(self.width(), self.height(), bytes)
            .ok_or_else(|| RasterError::validation("rgba byte length does not match raster size"))
    }

    /// Copy from an `image` RGBA8 buffer.
    pub fn from_rgba_image(img: &image::RgbaImage) -> RasterResult<Self> {
        let data = img
            .pixels()
            .map(|p| Rgba8::new(p[0], p[1], p[2], p[3]))
            .collect();
        Self::from_vec(img.width(), img.height(), data)
    }

    /// Decode an image file into a raster.
    pub fn load_image(path: &Path) -> RasterResult<Self> {
        let img = image::open(path)
            .with_context(|| format!("decode image '{}'", path.display()))?
            .to_rgba8();
        Self::from_rgba_image(&img)
    }

    /// Encode the raster as PNG, creating parent directories as needed.
    pub fn save_png(&self, path: &Path) -> RasterResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        self.to_rgba_image()?
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}
