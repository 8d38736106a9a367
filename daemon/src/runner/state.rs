//! What the [`Runner`](crate::runner::Runner) is doing right now, for status reports.

use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunnerState {
    /// Nothing to show, waiting for slides to arrive.
    #[default]
    Waiting,
    /// Handing the slide with this index to the display.
    Displaying(usize),
    /// The slide with this index is on screen.
    Showing(usize),
    /// The last slide failed to show, pausing before the next one.
    Backoff,
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerState::Waiting => write!(f, "waiting"),
            RunnerState::Displaying(index) => write!(f, "displaying {index}"),
            RunnerState::Showing(index) => write!(f, "showing {index}"),
            RunnerState::Backoff => write!(f, "backoff"),
        }
    }
}
