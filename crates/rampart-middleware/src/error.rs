//! Pipeline error types.

use thiserror::Error;

/// Errors raised by the pipeline stacks themselves.
///
/// Errors returned by guards and interceptors are passed through untouched;
/// these only describe conditions the stacks detect on their own.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request's cancellation token fired before a stage could run.
    #[error("request cancelled before {stage} stage")]
    Cancelled {
        /// The stage that was about to run.
        stage: &'static str,
    },
}

/// Fails with [`PipelineError::Cancelled`] once the request is cancelled.
pub(crate) fn ensure_active(request: &rampart_core::Request, stage: &'static str) -> anyhow::Result<()> {
    match rampart_core::RequestContext::from_request(request) {
        Some(ctx) if ctx.is_cancelled() => Err(PipelineError::Cancelled { stage }.into()),
        _ => Ok(()),
    }
}
