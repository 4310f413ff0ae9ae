//! Bounded polling with a deadline, the `wait_until` primitive of the interaction layer.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::errors::InteractionError;

/// How long to keep polling and how often.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitSpec {
    pub timeout: Duration,
    pub poll: Duration,
}

impl WaitSpec {
    pub fn new(timeout: Duration, poll: Duration) -> Self {
        Self { timeout, poll }
    }
}

#[derive(Debug, Error)]
pub enum WaitError {
    /// The window elapsed; carries the last swallowed failure, if any
    #[error("condition not met within {waited:?}")]
    Timeout {
        waited: Duration,
        last: Option<InteractionError>,
    },

    /// A failure outside the ignored classes
    #[error(transparent)]
    Failed(InteractionError),
}

/// Poll `check` until it yields a value or `spec.timeout` elapses.
///
/// `Ok(None)` from the check means "not yet". Errors accepted by `ignored` are swallowed and
/// polling continues; any other error ends the wait immediately.
pub async fn wait_until<T, F, Fut, I>(spec: WaitSpec, ignored: I, mut check: F) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, InteractionError>>,
    I: Fn(&InteractionError) -> bool,
{
    let deadline = Instant::now() + spec.timeout;
    let mut last = None;
    loop {
        match check().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(err) if ignored(&err) => {
                debug!(%err, "ignoring failure while waiting");
                last = Some(err);
            }
            Err(err) => return Err(WaitError::Failed(err)),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::Timeout {
                waited: spec.timeout,
                last,
            });
        }
        sleep(spec.poll.min(deadline - now)).await;
    }
}
