use crate::render::dispatch::DispatchState;

/// Convenience result type used across rasterpass.
pub type RasterResult<T> = Result<T, RasterError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum RasterError {
    /// Invalid user-provided data or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// The captured render epoch no longer matches the session.
    ///
    /// This is a control-flow signal, not a failure: the engine absorbs it and reports an aborted
    /// dispatch instead.
    #[error("stale epoch: captured {captured}, session is at {current}")]
    StaleEpoch {
        /// Epoch value held by the caller.
        captured: u64,
        /// Live epoch value of the session at the time of the check.
        current: u64,
    },

    /// A one-shot dispatch engine was asked to dispatch a second time.
    #[error("dispatch error: engine can dispatch only once")]
    AlreadyDispatched,

    /// An operation was attempted in a state that does not allow it.
    #[error("dispatch error: cannot {op} while engine is {state:?}")]
    InvalidState {
        /// Operation that was rejected.
        op: &'static str,
        /// State the engine was in.
        state: DispatchState,
    },

    /// A wait, join or worker was interrupted before it could finish.
    #[error("interrupted: {0}")]
    Interrupted(String),

    /// Errors when serializing or deserializing pipeline definitions.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RasterError {
    /// Build a [`RasterError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`RasterError::Interrupted`] value.
    pub fn interrupted(msg: impl Into<String>) -> Self {
        Self::Interrupted(msg.into())
    }

    /// Build a [`RasterError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for errors that only mean "this work is obsolete or was interrupted".
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::StaleEpoch { .. } | Self::Interrupted(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
