use crate::foundation::core::Size;
use crate::foundation::error::RasterResult;
use crate::foundation::math::restrict;
use crate::raster::buffer::Pixel;

/// Read-only view of the raster as it was before the running pass started.
#[derive(Clone, Copy, Debug)]
pub struct Texture<'a, P> {
    data: &'a [P],
    size: Size,
}

impl<'a, P: Pixel> Texture<'a, P> {
    pub(crate) fn new(data: &'a [P], size: Size) -> Self {
        Self { data, size }
    }

    /// Pixel at `(x, y)` with both coordinates clamped into the raster.
    ///
    /// Out-of-range coordinates read the nearest edge pixel.
    pub fn sample_at(&self, x: i64, y: i64) -> P {
        let x = restrict(0, i64::from(self.size.width) - 1, x);
        let y = restrict(0, i64::from(self.size.height) - 1, y);
        self.data[self.size.index_of(x as u32, y as u32)]
    }

    /// Pixel at a linear row-major index.
    pub fn at_index(&self, index: usize) -> P {
        self.data[index]
    }

    /// Raster dimensions.
    pub fn size(&self) -> Size {
        self.size
    }
}

/// Everything a pass sees when it shades one pixel.
#[derive(Clone, Copy, Debug)]
pub struct PixelCtx<'a, P> {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Raster width.
    pub width: u32,
    /// Raster height.
    pub height: u32,
    /// `x / width`.
    pub rx: f64,
    /// `y / height`.
    pub ry: f64,
    /// Row-major linear index.
    pub index: usize,
    /// Value at `index` before this pass started.
    pub previous: P,
    /// Seconds between engine construction and dispatch start.
    pub elapsed: f64,
    /// Pre-pass snapshot for neighborhood reads.
    pub texture: Texture<'a, P>,
}

impl<'a, P: Pixel> PixelCtx<'a, P> {
    pub(crate) fn at(texture: Texture<'a, P>, index: usize, elapsed: f64) -> Self {
        let size = texture.size();
        let (x, y) = size.coords_of(index);
        Self {
            x,
            y,
            width: size.width,
            height: size.height,
            rx: f64::from(x) / f64::from(size.width),
            ry: f64::from(y) / f64::from(size.height),
            index,
            previous: texture.at_index(index),
            elapsed,
            texture,
        }
    }

    /// Clamped read of the pre-pass snapshot; see [`Texture::sample_at`].
    pub fn sample_at(&self, x: i64, y: i64) -> P {
        self.texture.sample_at(x, y)
    }
}

/// A per-pixel transform applied over the whole raster by the dispatch engine.
///
/// Implementations must be bounded per pixel: cancellation is cooperative and only observed
/// between pixels.
pub trait RenderPass<P: Pixel>: Send + Sync {
    /// Shade one pixel. Returning a cancellation error stops the dispatch.
    fn execute(&self, ctx: &PixelCtx<'_, P>) -> RasterResult<P>;

    /// Inapplicable passes are skipped entirely.
    fn is_applicable(&self) -> bool {
        true
    }

    /// Label used in logs and reports.
    fn name(&self) -> &str {
        "pass"
    }
}

/// Adapts a plain closure into a [`RenderPass`].
pub struct FnPass<F> {
    name: String,
    f: F,
}

impl<F> FnPass<F> {
    /// Wrap `f` under a log label.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<P, F> RenderPass<P> for FnPass<F>
where
    P: Pixel,
    F: Fn(&PixelCtx<'_, P>) -> P + Send + Sync,
{
    fn execute(&self, ctx: &PixelCtx<'_, P>) -> RasterResult<P> {
        Ok((self.f)(ctx))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
