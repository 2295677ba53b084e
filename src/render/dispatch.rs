use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::foundation::error::{RasterError, RasterResult};
use crate::foundation::math::band_rows;
use crate::raster::buffer::{Pixel, RasterBuffer};
use crate::render::coverage::Coverage;
use crate::render::pass::{FnPass, PixelCtx, RenderPass, Texture};
use crate::session::render_session::EpochToken;

/// Lifecycle of a one-shot [`DispatchEngine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchState {
    /// Accepting pass registrations.
    Idle,
    /// Passes are running.
    Dispatched,
    /// Every applicable pass ran to completion.
    Completed,
    /// The epoch went stale, progress reporting asked to stop, or a pass failed.
    Aborted,
}

/// How a dispatch ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// All applicable passes committed.
    Completed,
    /// Work stopped early; the raster holds whatever was committed before the stop.
    Aborted,
}

/// Band partitioning controls.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchOpts {
    /// Number of worker bands per pass. `None` uses the available parallelism.
    pub bands: Option<usize>,
    /// Re-check the coverage bitmap after the workers join and shade anything left unclaimed.
    pub completeness_sweep: bool,
}

impl Default for DispatchOpts {
    fn default() -> Self {
        Self {
            bands: None,
            completeness_sweep: true,
        }
    }
}

impl DispatchOpts {
    /// Reject settings the engine cannot honor.
    pub fn validate(&self) -> RasterResult<()> {
        if self.bands == Some(0) {
            return Err(RasterError::validation(
                "dispatch 'bands' must be >= 1 when set",
            ));
        }
        Ok(())
    }

    fn resolved_bands(&self) -> usize {
        self.bands.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Per-slot result of one dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassReport {
    /// Registration index of the pass.
    pub slot: usize,
    /// Pass label.
    pub name: String,
    /// `true` when the pass declared itself inapplicable.
    pub skipped: bool,
    /// Worker bands spawned for this pass.
    pub bands: usize,
    /// Pixels claimed in the coverage bitmap when the pass ended.
    pub covered: usize,
    /// Pixels the completeness sweep had to shade after the workers joined.
    pub recovered: usize,
}

/// Summary of a finished dispatch.
#[derive(Clone, Debug)]
pub struct DispatchReport {
    /// Completed or aborted.
    pub outcome: DispatchOutcome,
    /// One entry per pass that was reached, in registration order.
    pub passes: Vec<PassReport>,
    /// Pixels shaded across all passes.
    pub pixels_rendered: u64,
    /// Wall-clock time spent dispatching.
    pub wall_time: Duration,
}

/// Cancellation and progress state shared by every thread of one dispatch.
pub(crate) struct DispatchControl {
    token: EpochToken,
    abort: AtomicBool,
    rendered: AtomicU64,
}

impl DispatchControl {
    pub(crate) fn new(token: EpochToken) -> Self {
        Self {
            token,
            abort: AtomicBool::new(false),
            rendered: AtomicU64::new(0),
        }
    }

    pub(crate) fn check(&self) -> RasterResult<()> {
        if self.abort.load(Ordering::Acquire) {
            return Err(RasterError::interrupted("dispatch aborted"));
        }
        self.token.validate()
    }

    pub(crate) fn abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    pub(crate) fn rendered(&self) -> u64 {
        self.rendered.load(Ordering::Relaxed)
    }

    fn record_pixel(&self) {
        self.rendered.fetch_add(1, Ordering::Relaxed);
    }
}

pub(crate) type PassRun = (DispatchOutcome, Vec<PassReport>);

/// Runs an ordered list of [`RenderPass`]es over a raster, each pass fanned out over row bands.
///
/// The engine is bound to one [`EpochToken`] and dispatches at most once. Pass N+1 always reads
/// the raster exactly as pass N left it; inside a pass every worker reads the frozen pre-pass
/// snapshot and writes only its own band of the live raster.
pub struct DispatchEngine<P: Pixel> {
    token: EpochToken,
    raster: RasterBuffer<P>,
    passes: Vec<Box<dyn RenderPass<P>>>,
    opts: DispatchOpts,
    state: DispatchState,
    texture: Option<Arc<[P]>>,
    created: Instant,
}

impl<P: Pixel> DispatchEngine<P> {
    /// Bind a raster to `token` with default options. Fails fast if the token is already stale.
    pub fn new(token: EpochToken, raster: RasterBuffer<P>) -> RasterResult<Self> {
        Self::with_opts(token, raster, DispatchOpts::default())
    }

    /// Like [`DispatchEngine::new`] with explicit band options.
    pub fn with_opts(
        token: EpochToken,
        raster: RasterBuffer<P>,
        opts: DispatchOpts,
    ) -> RasterResult<Self> {
        opts.validate()?;
        token.validate()?;
        Ok(Self {
            token,
            raster,
            passes: Vec::new(),
            opts,
            state: DispatchState::Idle,
            texture: None,
            created: Instant::now(),
        })
    }

    /// Attach an externally held snapshot that [`texture`](Self::texture) reports outside a
    /// dispatch. It is restored after the dispatch replaces it pass by pass.
    pub fn with_texture(mut self, texture: Option<Arc<[P]>>) -> Self {
        self.texture = texture;
        self
    }

    /// Append a pass. Only allowed while idle; re-validates the epoch on every call.
    pub fn register_pass<R>(&mut self, pass: R) -> RasterResult<()>
    where
        R: RenderPass<P> + 'static,
    {
        if self.state != DispatchState::Idle {
            return Err(RasterError::InvalidState {
                op: "register a pass",
                state: self.state,
            });
        }
        self.token.validate()?;
        self.passes.push(Box::new(pass));
        Ok(())
    }

    /// Append a closure as a pass.
    pub fn register_fn<F>(&mut self, name: &str, f: F) -> RasterResult<()>
    where
        F: Fn(&PixelCtx<'_, P>) -> P + Send + Sync + 'static,
    {
        self.register_pass(FnPass::new(name, f))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Token this engine validates against.
    pub fn token(&self) -> &EpochToken {
        &self.token
    }

    /// Number of registered passes, applicable or not.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// The live raster.
    pub fn raster(&self) -> &RasterBuffer<P> {
        &self.raster
    }

    /// Release the raster.
    pub fn into_raster(self) -> RasterBuffer<P> {
        self.raster
    }

    /// The externally visible snapshot reference.
    pub fn texture(&self) -> Option<&Arc<[P]>> {
        self.texture.as_ref()
    }

    /// Clamped read of the texture snapshot, falling back to the live raster when none is held.
    pub fn sample_at(&self, x: i64, y: i64) -> P {
        let data = match &self.texture {
            Some(t) if t.len() == self.raster.len() => &t[..],
            _ => self.raster.as_slice(),
        };
        Texture::new(data, self.raster.size()).sample_at(x, y)
    }

    /// Run every registered pass once.
    ///
    /// Returns [`RasterError::AlreadyDispatched`] on a second call. A stale epoch is not an error:
    /// the report says [`DispatchOutcome::Aborted`].
    #[tracing::instrument(skip(self), fields(epoch = self.token.epoch(), passes = self.passes.len()))]
    pub fn dispatch(&mut self) -> RasterResult<DispatchReport> {
        let elapsed = self.begin()?;
        let started = Instant::now();
        let ctrl = DispatchControl::new(self.token.clone());
        let run = self.run_passes(&ctrl, elapsed);
        self.finish(run, &ctrl, started)
    }

    pub(super) fn begin(&mut self) -> RasterResult<f64> {
        if self.state != DispatchState::Idle {
            return Err(RasterError::AlreadyDispatched);
        }
        self.state = DispatchState::Dispatched;
        Ok(self.created.elapsed().as_secs_f64())
    }

    pub(super) fn mark_aborted(&mut self) {
        self.state = DispatchState::Aborted;
    }

    pub(super) fn progress_total(&self) -> u64 {
        let applicable = self.passes.iter().filter(|p| p.is_applicable()).count();
        (self.raster.len() as u64).saturating_mul(applicable.max(1) as u64)
    }

    pub(super) fn finish(
        &mut self,
        run: RasterResult<PassRun>,
        ctrl: &DispatchControl,
        started: Instant,
    ) -> RasterResult<DispatchReport> {
        match run {
            Ok((outcome, passes)) => {
                self.state = match outcome {
                    DispatchOutcome::Completed => DispatchState::Completed,
                    DispatchOutcome::Aborted => DispatchState::Aborted,
                };
                let report = DispatchReport {
                    outcome,
                    passes,
                    pixels_rendered: ctrl.rendered(),
                    wall_time: started.elapsed(),
                };
                tracing::debug!(
                    outcome = ?report.outcome,
                    pixels = report.pixels_rendered,
                    "dispatch finished"
                );
                Ok(report)
            }
            Err(e) => {
                self.state = DispatchState::Aborted;
                Err(e)
            }
        }
    }

    pub(super) fn run_passes(
        &mut self,
        ctrl: &DispatchControl,
        elapsed: f64,
    ) -> RasterResult<PassRun> {
        let external = self.texture.clone();
        let mut reports = Vec::with_capacity(self.passes.len());
        let mut outcome = DispatchOutcome::Completed;
        let mut failure = None;

        for (slot, pass) in self.passes.iter().enumerate() {
            if !pass.is_applicable() {
                tracing::debug!(slot, name = pass.name(), "pass skipped");
                reports.push(PassReport {
                    slot,
                    name: pass.name().to_string(),
                    skipped: true,
                    bands: 0,
                    covered: 0,
                    recovered: 0,
                });
                continue;
            }
            if ctrl.check().is_err() {
                outcome = DispatchOutcome::Aborted;
                break;
            }

            let previous = self.raster.snapshot();
            self.texture = Some(Arc::clone(&previous));
            let shaded = shade_pass(
                slot,
                pass.as_ref(),
                &previous,
                &mut self.raster,
                &self.opts,
                ctrl,
                elapsed,
            );
            match shaded {
                Ok((report, aborted)) => {
                    reports.push(report);
                    if aborted {
                        outcome = DispatchOutcome::Aborted;
                        break;
                    }
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let restore = match (&self.texture, &external) {
            (Some(cur), Some(ext)) => !Arc::ptr_eq(cur, ext),
            (None, None) => false,
            _ => true,
        };
        if restore {
            self.texture = external;
        }

        match failure {
            Some(e) => Err(e),
            None => Ok((outcome, reports)),
        }
    }
}

fn shade_pass<P: Pixel>(
    slot: usize,
    pass: &dyn RenderPass<P>,
    previous: &[P],
    raster: &mut RasterBuffer<P>,
    opts: &DispatchOpts,
    ctrl: &DispatchControl,
    elapsed: f64,
) -> RasterResult<(PassReport, bool)> {
    let size = raster.size();
    let width = size.width as usize;
    let rows = band_rows(size.height as usize, opts.resolved_bands());
    let coverage = Coverage::new(size.pixel_count());
    let texture = Texture::new(previous, size);

    let results = std::thread::scope(|scope| {
        let mut results = Vec::new();
        let mut handles = Vec::new();
        for (band, chunk) in raster.as_mut_slice().chunks_mut(rows * width).enumerate() {
            let start = band * rows * width;
            let coverage = &coverage;
            let spawned = std::thread::Builder::new()
                .name(format!("raster-band-{band}"))
                .spawn_scoped(scope, move || {
                    shade_band(pass, texture, coverage, ctrl, chunk, start, elapsed)
                });
            match spawned {
                Ok(h) => handles.push(h),
                Err(e) => {
                    ctrl.abort();
                    results.push(Err(RasterError::Other(
                        anyhow::Error::new(e).context("spawn band worker"),
                    )));
                    break;
                }
            }
        }
        let bands = handles.len();
        tracing::debug!(slot, name = pass.name(), bands, rows, "pass dispatched");
        for (band, h) in handles.into_iter().enumerate() {
            results.push(h.join().unwrap_or_else(|_| {
                tracing::warn!(slot, band, "band worker panicked");
                ctrl.abort();
                Err(RasterError::Other(anyhow::anyhow!(
                    "band worker {band} panicked"
                )))
            }));
        }
        (results, bands)
    });
    let (results, bands) = results;

    let mut aborted = false;
    for r in results {
        match r {
            Ok(()) => {}
            Err(e) if e.is_cancellation() => aborted = true,
            Err(e) => return Err(e),
        }
    }

    let mut recovered = 0;
    if !aborted && opts.completeness_sweep {
        let (n, stopped) = sweep_unclaimed(
            pass,
            texture,
            &coverage,
            ctrl,
            raster.as_mut_slice(),
            elapsed,
        )?;
        recovered = n;
        aborted = stopped;
        if recovered > 0 {
            tracing::warn!(slot, recovered, "completeness sweep shaded unclaimed pixels");
        }
    }

    Ok((
        PassReport {
            slot,
            name: pass.name().to_string(),
            skipped: false,
            bands,
            covered: coverage.claimed(),
            recovered,
        },
        aborted,
    ))
}

fn shade_band<P: Pixel>(
    pass: &dyn RenderPass<P>,
    texture: Texture<'_, P>,
    coverage: &Coverage,
    ctrl: &DispatchControl,
    band: &mut [P],
    start: usize,
    elapsed: f64,
) -> RasterResult<()> {
    for (offset, out) in band.iter_mut().enumerate() {
        ctrl.check()?;
        let index = start + offset;
        if !coverage.claim(index) {
            continue;
        }
        match pass.execute(&PixelCtx::at(texture, index, elapsed)) {
            Ok(v) => *out = v,
            Err(e) => {
                ctrl.abort();
                return Err(e);
            }
        }
        ctrl.record_pixel();
    }
    Ok(())
}

/// Shade every pixel the band workers left unclaimed, from the last index down to 0.
///
/// Returns how many pixels were shaded and whether a cancellation cut the walk short.
fn sweep_unclaimed<P: Pixel>(
    pass: &dyn RenderPass<P>,
    texture: Texture<'_, P>,
    coverage: &Coverage,
    ctrl: &DispatchControl,
    data: &mut [P],
    elapsed: f64,
) -> RasterResult<(usize, bool)> {
    let mut recovered = 0;
    for index in (0..coverage.len()).rev() {
        if coverage.is_claimed(index) {
            continue;
        }
        if ctrl.check().is_err() {
            return Ok((recovered, true));
        }
        if !coverage.claim(index) {
            continue;
        }
        match pass.execute(&PixelCtx::at(texture, index, elapsed)) {
            Ok(v) => data[index] = v,
            Err(e) if e.is_cancellation() => return Ok((recovered, true)),
            Err(e) => return Err(e),
        }
        ctrl.record_pixel();
        recovered += 1;
    }
    Ok((recovered, false))
}

#[cfg(test)]
#[path = "../../tests/unit/render/dispatch.rs"]
mod tests;
