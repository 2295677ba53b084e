pub(crate) mod coverage;
pub(crate) mod dispatch;
pub(crate) mod pass;
mod progress;
