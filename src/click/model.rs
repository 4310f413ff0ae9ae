use crate::errors::TransientKind;

/// Result of one click attempt, consumed by the executor straight away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionOutcome {
    Success,
    TransientFailure(TransientKind),
    /// The target is not on the page right now
    Unavailable,
}

/// What the caller learns from `click_with_retry`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    Success,
    /// The retry window elapsed without a successful click
    Exhausted,
}

impl ClickOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, ClickOutcome::Success)
    }
}

/// How the pointer reaches the element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClickMode {
    #[default]
    Direct,
    MoveAndClick,
}

/// Parameters for one resilient click.
#[derive(Clone, Debug)]
pub struct ClickRequest<E> {
    /// Short name used in logs and metric labels
    pub target: &'static str,
    /// Handle for the direct attempt; when absent the locator supplies it
    pub initial: Option<E>,
    pub mode: ClickMode,
}

impl<E> ClickRequest<E> {
    pub fn new(target: &'static str) -> Self {
        Self {
            target,
            initial: None,
            mode: ClickMode::Direct,
        }
    }

    pub fn with_initial(mut self, element: E) -> Self {
        self.initial = Some(element);
        self
    }

    pub fn with_mode(mut self, mode: ClickMode) -> Self {
        self.mode = mode;
        self
    }
}
