//! rasterpass is a parallel, cancellable render-dispatch engine for 2D rasters.
//!
//! A [`DispatchEngine`] owns a [`RasterBuffer`] and an ordered list of [`RenderPass`]es. Each
//! dispatch runs the passes one after another; every pass is fanned out over row bands, one
//! worker thread per band, reading a frozen snapshot of the raster and writing its own band.
//!
//! # Cancellation
//!
//! Work is tied to a [`RenderSession`] epoch. Anything holding an [`EpochToken`] can check
//! whether the session moved on; [`RenderSession::invalidate`] makes every in-flight dispatch
//! stop at its next pixel and report [`DispatchOutcome::Aborted`]. A stale epoch is a
//! control-flow signal, not a failure.
//!
//! # Pipeline overview
//!
//! 1. **Describe**: a [`PipelineDef`] (JSON) names the raster and its [`Shader`]s.
//! 2. **Build**: [`PipelineDef::build_engine`] binds the raster to a session token.
//! 3. **Dispatch**: [`DispatchEngine::dispatch`] or [`DispatchEngine::dispatch_with_progress`].
//! 4. **Save** (optional): [`RasterBuffer::save_png`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod effects;
mod foundation;
mod raster;
mod render;
mod session;

pub use effects::pipeline::PipelineDef;
pub use effects::shaders::{MAX_BLUR_RADIUS, Shader, ShaderInstance, ShaderPass, parse_shader};
pub use foundation::core::{Rgba8, Size};
pub use foundation::error::{RasterError, RasterResult};
pub use raster::buffer::{Pixel, RasterBuffer};
pub use render::dispatch::{
    DispatchEngine, DispatchOpts, DispatchOutcome, DispatchReport, DispatchState, PassReport,
};
pub use render::pass::{FnPass, PixelCtx, RenderPass, Texture};
pub use session::render_session::{EpochToken, RenderSession};
