use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::Context as _;

use crate::foundation::error::{RasterError, RasterResult};
use crate::foundation::math::ratio;
use crate::raster::buffer::Pixel;
use crate::render::dispatch::{
    DispatchControl, DispatchEngine, DispatchOutcome, DispatchReport, PassRun,
};

impl<P: Pixel> DispatchEngine<P> {
    /// Dispatch on a driver thread while a poller thread reports progress every `interval`.
    ///
    /// `callback` receives `rendered / (pixels * applicable passes)` in `[0, 1]`, then exactly
    /// `1.0` once after a completed dispatch. Returning an error from the callback aborts the
    /// dispatch; an aborted dispatch never sees the final `1.0`.
    #[tracing::instrument(skip(self, callback), fields(epoch = self.token().epoch()))]
    pub fn dispatch_with_progress<F>(
        &mut self,
        interval: Duration,
        callback: F,
    ) -> RasterResult<DispatchReport>
    where
        F: FnMut(f64) -> RasterResult<()> + Send,
    {
        if interval.is_zero() {
            return Err(RasterError::validation("progress interval must be > 0"));
        }
        let elapsed = self.begin()?;
        let started = Instant::now();
        let total = self.progress_total();
        let ctrl = DispatchControl::new(self.token().clone());
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let scoped = std::thread::scope(
            |scope| -> RasterResult<(RasterResult<PassRun>, Option<(F, bool)>)> {
                let ctrl = &ctrl;
                let poller = std::thread::Builder::new()
                    .name("dispatch-progress".to_string())
                    .spawn_scoped(scope, move || {
                        poll_progress(stop_rx, interval, ctrl, total, callback)
                    })
                    .context("spawn progress poller")?;

                let engine = &mut *self;
                let driver = std::thread::Builder::new()
                    .name("dispatch-driver".to_string())
                    .spawn_scoped(scope, move || {
                        let run = engine.run_passes(ctrl, elapsed);
                        // Wakes the poller immediately instead of waiting out its interval.
                        drop(stop_tx);
                        run
                    });
                let driver = match driver {
                    Ok(h) => h,
                    Err(e) => {
                        ctrl.abort();
                        let _ = poller.join();
                        return Err(RasterError::Other(
                            anyhow::Error::new(e).context("spawn dispatch driver"),
                        ));
                    }
                };

                let run = driver.join().unwrap_or_else(|_| {
                    Err(RasterError::Other(anyhow::anyhow!(
                        "dispatch driver panicked"
                    )))
                });
                let polled = poller.join().ok();
                if polled.is_none() {
                    tracing::warn!("progress callback panicked");
                }
                Ok((run, polled))
            },
        );
        let (mut run, polled) = scoped.inspect_err(|_| self.mark_aborted())?;

        // The callback may decline after the last worker already passed its final check.
        let declined = matches!(polled, Some((_, true)));
        match &mut run {
            Ok((outcome, _)) if declined && *outcome == DispatchOutcome::Completed => {
                tracing::debug!("progress callback declined after the last pixel");
                *outcome = DispatchOutcome::Aborted;
            }
            _ => {}
        }

        let report = self.finish(run, &ctrl, started)?;
        let finished = report.outcome == DispatchOutcome::Completed && self.token().is_valid();
        match polled {
            Some((mut callback, false)) if finished => {
                if let Err(e) = callback(1.0) {
                    tracing::debug!(error = %e, "final progress callback failed");
                }
            }
            _ => {}
        }
        Ok(report)
    }
}

/// Returns the callback and whether it asked to stop.
fn poll_progress<F>(
    stop: Receiver<()>,
    interval: Duration,
    ctrl: &DispatchControl,
    total: u64,
    mut callback: F,
) -> (F, bool)
where
    F: FnMut(f64) -> RasterResult<()>,
{
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return (callback, false),
        }
        if ctrl.check().is_err() {
            return (callback, false);
        }
        if let Err(e) = callback(ratio(ctrl.rendered(), total)) {
            tracing::debug!(error = %e, "progress callback requested abort");
            ctrl.abort();
            return (callback, true);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/progress.rs"]
mod tests;
