use std::sync::Arc;

use crate::foundation::core::Size;
use crate::foundation::error::{RasterError, RasterResult};

/// A value that can live in a [`RasterBuffer`] and be produced by band workers.
pub trait Pixel: Copy + Default + Send + Sync + 'static {}

impl<T> Pixel for T where T: Copy + Default + Send + Sync + 'static {}

/// Row-major 2D pixel storage.
///
/// The engine writes the live buffer and reads an immutable [`snapshot`](RasterBuffer::snapshot)
/// of it during each pass.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterBuffer<P> {
    size: Size,
    data: Vec<P>,
}

impl<P: Pixel> RasterBuffer<P> {
    /// Allocate a buffer filled with `P::default()`.
    pub fn new(width: u32, height: u32) -> RasterResult<Self> {
        Self::filled(width, height, P::default())
    }

    /// Allocate a buffer filled with `value`.
    pub fn filled(width: u32, height: u32, value: P) -> RasterResult<Self> {
        let size = Size::new(width, height)?;
        Ok(Self {
            size,
            data: vec![value; size.pixel_count()],
        })
    }

    /// Wrap existing row-major pixels.
    pub fn from_vec(width: u32, height: u32, data: Vec<P>) -> RasterResult<Self> {
        let size = Size::new(width, height)?;
        if data.len() != size.pixel_count() {
            return Err(RasterError::validation(format!(
                "raster data length {} does not match {width}x{height}",
                data.len()
            )));
        }
        Ok(Self { size, data })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.size.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Dimensions as a [`Size`].
    pub fn size(&self) -> Size {
        self.size
    }

    /// Total pixel count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`: buffers are at least 1x1.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pixel at `(x, y)`, or `None` outside the raster.
    pub fn get(&self, x: u32, y: u32) -> Option<P> {
        if !self.size.contains(x, y) {
            return None;
        }
        Some(self.data[self.size.index_of(x, y)])
    }

    /// Pixel at a linear row-major index.
    pub fn get_index(&self, index: usize) -> Option<P> {
        self.data.get(index).copied()
    }

    /// Overwrite the pixel at `(x, y)`.
    pub fn set(&mut self, x: u32, y: u32, value: P) -> RasterResult<()> {
        if !self.size.contains(x, y) {
            return Err(RasterError::validation(format!(
                "pixel ({x}, {y}) outside {}x{} raster",
                self.size.width, self.size.height
            )));
        }
        let i = self.size.index_of(x, y);
        self.data[i] = value;
        Ok(())
    }

    /// Overwrite every pixel.
    pub fn fill(&mut self, value: P) {
        self.data.fill(value);
    }

    /// Immutable copy of the current contents.
    pub fn snapshot(&self) -> Arc<[P]> {
        Arc::from(self.data.as_slice())
    }

    /// Borrow the pixels in row-major order.
    pub fn as_slice(&self) -> &[P] {
        &self.data
    }

    /// Mutably borrow the pixels in row-major order.
    pub fn as_mut_slice(&mut self) -> &mut [P] {
        &mut self.data
    }

    /// Consume the buffer and return its pixels.
    pub fn into_vec(self) -> Vec<P> {
        self.data
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/buffer.rs"]
mod tests;
