//! The runner shows slides from a [`Playlist`] one after another, forever.
//!
//! Working cycle of a Runner:
//! 1. Fetch the next [`Slide`], or wait for the playlist to fill up.
//! 2. Hand the slide to the [`Display`], giving up after a timeout.
//! 3. Sleep for the transition of the slide, or a short backoff if it failed to show.
//!
//! A slide that failed to show is not retried, the playlist cursor has already moved past it.
//! The playlist lock is never held while the display works or the runner sleeps.

mod state;

pub use state::RunnerState;

use smol::Timer;
use smol::channel::Receiver;
use smol::lock::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::display::{Display, DisplayError};
use crate::playlist::{Playlist, Slide};

/// How long to wait for slides before looking at the playlist again.
pub const IDLE_POLL: Duration = Duration::from_secs(1);
/// Pause after a slide failed to show.
pub const BACKOFF: Duration = Duration::from_secs(1);
pub const DEFAULT_DISPLAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a single [`Runner::step`].
#[derive(Debug, PartialEq)]
pub enum Step {
    /// The playlist was empty.
    Idle,
    /// The slide is now on screen.
    Shown(Slide),
    /// The slide with this index could not be shown.
    Failed(usize),
}

pub struct Runner<D: Display> {
    playlist: Arc<Playlist>,
    display: D,
    wake_rx: Receiver<()>,
    timeout: Duration,
    state: Arc<Mutex<RunnerState>>,
}

impl<D: Display> Runner<D> {
    /// Creates a runner showing slides of `playlist` on `display`.
    ///
    /// Every call to the display is abandoned after `timeout`.
    pub fn new(playlist: Arc<Playlist>, display: D, timeout: Duration) -> Self {
        Self {
            wake_rx: playlist.subscribe(),
            playlist,
            display,
            timeout,
            state: Arc::default(),
        }
    }

    /// A handle to the state of this runner, updated as it goes.
    pub fn state(&self) -> Arc<Mutex<RunnerState>> {
        self.state.clone()
    }

    /// The main runner task, it never returns.
    pub async fn run(&mut self) {
        log::info!("runner started, showing slides with `{}`", self.display.name());
        loop {
            match self.step().await {
                Step::Idle => {
                    self.update_state(RunnerState::Waiting).await;
                    self.wait_for_slides().await;
                }
                Step::Shown(slide) => {
                    self.update_state(RunnerState::Showing(slide.index())).await;
                    Timer::after(slide.transition()).await;
                }
                Step::Failed(_) => {
                    self.update_state(RunnerState::Backoff).await;
                    Timer::after(BACKOFF).await;
                }
            }
        }
    }

    /// Advances the playlist and shows the next slide, without pacing afterwards.
    pub async fn step(&mut self) -> Step {
        let Some(slide) = self.playlist.next().await else {
            return Step::Idle;
        };
        self.update_state(RunnerState::Displaying(slide.index()))
            .await;

        let timeout = self.timeout;
        let result = smol::future::race(self.display.show(&slide), async move {
            Timer::after(timeout).await;
            Err(DisplayError::Timeout(timeout))
        })
        .await;

        match result {
            Ok(()) => {
                log::info!(
                    "showing slide {} for {}s",
                    slide.index(),
                    slide.transition_secs()
                );
                Step::Shown(slide)
            }
            Err(err) => {
                log::warn!("slide {}: {err}, skipping", slide.index());
                if let DisplayError::Timeout(_) = err {
                    self.display.dismiss().await;
                }
                Step::Failed(slide.index())
            }
        }
    }

    /// Sleeps until the playlist wakes us up, or [`IDLE_POLL`] elapsed.
    async fn wait_for_slides(&self) {
        smol::future::race(
            async {
                if self.wake_rx.recv().await.is_err() {
                    // Closed, only the poll is left
                    smol::future::pending::<()>().await;
                }
            },
            async {
                Timer::after(IDLE_POLL).await;
            },
        )
        .await;
    }

    async fn update_state(&self, state: RunnerState) {
        *self.state.lock().await = state;
    }
}
