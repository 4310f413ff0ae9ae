use std::future::Future;

use tracing::{debug, error, instrument};

use crate::adapter::InteractionAdapter;
use crate::click::model::{ClickMode, ClickOutcome, ClickRequest, InteractionOutcome};
use crate::errors::InteractionError;
use crate::metrics;
use crate::wait::{wait_until, WaitError, WaitSpec};

/// Click with a bounded retry on transient failures.
///
/// One direct attempt first. If it fails with a stale element or an intercepted click, or the
/// target is not present, `locate` is re-invoked and the click repeated until it lands or
/// `window.timeout` elapses. Any other failure is returned untouched.
#[instrument(skip_all, fields(target = request.target))]
pub async fn click_with_retry<A, L, Fut>(
    adapter: &A,
    request: ClickRequest<A::Element>,
    mut locate: L,
    window: WaitSpec,
) -> Result<ClickOutcome, InteractionError>
where
    A: InteractionAdapter,
    L: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<A::Element>, InteractionError>>,
{
    let ClickRequest {
        target,
        initial,
        mode,
    } = request;

    let located = match initial {
        Some(element) => Ok(Some(element)),
        None => locate().await,
    };
    let direct = match located {
        Ok(element) => attempt(adapter, element.as_ref(), mode).await?,
        Err(err) => transient(err)?,
    };
    match direct {
        InteractionOutcome::Success => return Ok(ClickOutcome::Success),
        InteractionOutcome::TransientFailure(kind) => {
            debug!(%kind, "direct click failed; retrying")
        }
        InteractionOutcome::Unavailable => debug!("target not on the page; retrying"),
    }

    let check = || {
        let located = locate();
        async move {
            let element = located.await?;
            let landed = attempt(adapter, element.as_ref(), mode).await?;
            Ok::<_, InteractionError>((landed == InteractionOutcome::Success).then_some(()))
        }
    };

    match wait_until(window, InteractionError::is_transient, check).await {
        Ok(()) => Ok(ClickOutcome::Success),
        Err(WaitError::Timeout { waited, last }) => {
            let last = last.map(|err| err.to_string()).unwrap_or_default();
            error!(?waited, last_error = %last, "Could not click {target}; giving up for this tick");
            metrics::record_retry_exhausted(target);
            Ok(ClickOutcome::Exhausted)
        }
        Err(WaitError::Failed(err)) => Err(err),
    }
}

async fn attempt<A: InteractionAdapter>(
    adapter: &A,
    element: Option<&A::Element>,
    mode: ClickMode,
) -> Result<InteractionOutcome, InteractionError> {
    let Some(element) = element else {
        return Ok(InteractionOutcome::Unavailable);
    };
    let result = match mode {
        ClickMode::Direct => adapter.click(element).await,
        ClickMode::MoveAndClick => adapter.move_and_click(element).await,
    };
    match result {
        Ok(()) => Ok(InteractionOutcome::Success),
        Err(err) => transient(err),
    }
}

fn transient(err: InteractionError) -> Result<InteractionOutcome, InteractionError> {
    match err.transient_kind() {
        Some(kind) => Ok(InteractionOutcome::TransientFailure(kind)),
        None => Err(err),
    }
}
