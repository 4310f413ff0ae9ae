//! Report cadence and the optional hard deadline of a session.

use std::time::Duration;

use tokio::time::Instant;

/// Wall-clock bookkeeping for one session. `last_report <= now` for every `now` handed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionClock {
    session_start: Instant,
    last_report: Instant,
    report_interval: Duration,
    hard_deadline: Option<Instant>,
}

impl SessionClock {
    /// `session_length` of `None` means the session runs until cancelled.
    pub fn new(start: Instant, report_interval: Duration, session_length: Option<Duration>) -> Self {
        Self {
            session_start: start,
            last_report: start,
            report_interval,
            hard_deadline: session_length.map(|length| start + length),
        }
    }

    pub fn session_start(&self) -> Instant {
        self.session_start
    }

    pub fn last_report(&self) -> Instant {
        self.last_report
    }

    pub fn report_interval(&self) -> Duration {
        self.report_interval
    }

    pub fn hard_deadline(&self) -> Option<Instant> {
        self.hard_deadline
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Active,
    Ended,
}

/// What one advance of the timer produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerAdvance {
    pub report_due: bool,
    pub state: TimerState,
}

impl TimerAdvance {
    pub fn ended(&self) -> bool {
        self.state == TimerState::Ended
    }
}

#[derive(Clone, Debug)]
pub struct SessionTimer {
    clock: SessionClock,
    state: TimerState,
}

impl SessionTimer {
    pub fn new(clock: SessionClock) -> Self {
        Self {
            clock,
            state: TimerState::Active,
        }
    }

    /// Start the clock now.
    pub fn start(report_interval: Duration, session_length: Option<Duration>) -> Self {
        Self::new(SessionClock::new(
            Instant::now(),
            report_interval,
            session_length,
        ))
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.clock.session_start)
    }

    /// Move the timer to `now`. Ended is terminal: later advances report nothing.
    pub fn advance(&mut self, now: Instant) -> TimerAdvance {
        if self.state == TimerState::Ended {
            return TimerAdvance {
                report_due: false,
                state: TimerState::Ended,
            };
        }

        let now = now.max(self.clock.last_report);
        let report_due = now - self.clock.last_report >= self.clock.report_interval;
        if report_due {
            self.clock.last_report = now;
        }

        if matches!(self.clock.hard_deadline, Some(deadline) if now >= deadline) {
            self.state = TimerState::Ended;
        }

        TimerAdvance {
            report_due,
            state: self.state,
        }
    }
}
