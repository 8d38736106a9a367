//! The shared playlist.
//!
//! Ingestion writes [`Slide`]s into it, the [`Runner`](crate::runner::Runner) takes them out one
//! by one. All reads and writes go through a single lock that is only held for in-memory work,
//! never while a slide is being displayed.
//!
//! When the playlist goes from empty to non-empty it wakes the runner through a single-slot
//! channel. A wake that arrives while another one is still pending is dropped: the runner only
//! cares about what the playlist holds now, not how many times it changed.

mod slots;

pub use slots::{DenseSlots, Slots, SparseSlots};

use clap::ValueEnum;
use smol::channel::{Receiver, Sender, TrySendError};
use smol::lock::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Shortest time a slide stays on screen.
pub const MIN_TRANSITION_SECS: u64 = 1;

/// One image in the playlist.
///
/// The payload is shared read-only once accepted, so handing a slide to the runner does not copy
/// the image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slide {
    index: usize,
    payload: Arc<[u8]>,
    transition: u64,
}

impl Slide {
    /// Creates a slide, clamping the transition to [`MIN_TRANSITION_SECS`].
    #[must_use]
    pub fn new(index: usize, payload: Vec<u8>, transition_secs: i64) -> Self {
        let transition = u64::try_from(transition_secs)
            .unwrap_or(0)
            .max(MIN_TRANSITION_SECS);
        Self {
            index,
            payload: payload.into(),
            transition,
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub fn transition_secs(&self) -> u64 {
        self.transition
    }

    /// How long the slide stays on screen before the runner moves on.
    #[must_use]
    pub fn transition(&self) -> Duration {
        Duration::from_secs(self.transition)
    }
}

/// How slide indices are interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum IndexPolicy {
    /// Indices are keys, gaps are allowed and skipped during rotation.
    #[default]
    Sparse,
    /// Slides form a sequence, new indices are appended at the end.
    Dense,
}

impl fmt::Display for IndexPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexPolicy::Sparse => write!(f, "sparse"),
            IndexPolicy::Dense => write!(f, "dense"),
        }
    }
}

pub struct Playlist {
    slots: Mutex<Box<dyn Slots>>,
    policy: IndexPolicy,
    wake: (Sender<()>, Receiver<()>),
}

impl Playlist {
    /// Creates an empty playlist using the given [`IndexPolicy`].
    #[must_use]
    pub fn new(policy: IndexPolicy) -> Self {
        let slots: Box<dyn Slots> = match policy {
            IndexPolicy::Sparse => Box::<SparseSlots>::default(),
            IndexPolicy::Dense => Box::<DenseSlots>::default(),
        };
        Self {
            slots: Mutex::new(slots),
            policy,
            wake: smol::channel::bounded(1),
        }
    }

    #[must_use]
    pub fn policy(&self) -> IndexPolicy {
        self.policy
    }

    /// Receives a message whenever the playlist stops being empty.
    ///
    /// At most one message is ever pending.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<()> {
        self.wake.1.clone()
    }

    /// Inserts or overwrites the slide at `index`.
    ///
    /// Returns the number of slides afterwards.
    pub async fn put(&self, index: usize, payload: Vec<u8>, transition_secs: i64) -> usize {
        let slide = Slide::new(index, payload, transition_secs);
        let (was_empty, count) = {
            let mut slots = self.slots.lock().await;
            let was_empty = slots.is_empty();
            (was_empty, slots.put(slide))
        };
        if was_empty {
            self.wake();
        }
        count
    }

    /// Throws away every slide and replaces them with the given ones, numbered from 0.
    ///
    /// The next call to [`Playlist::next`] returns slide 0.
    pub async fn replace_all(&self, slides: Vec<(Vec<u8>, i64)>) -> usize {
        let slides: Vec<Slide> = slides
            .into_iter()
            .enumerate()
            .map(|(index, (payload, transition))| Slide::new(index, payload, transition))
            .collect();
        let (was_empty, count) = {
            let mut slots = self.slots.lock().await;
            let was_empty = slots.is_empty();
            slots.replace(slides);
            (was_empty, slots.len())
        };
        if was_empty && count > 0 {
            self.wake();
        }
        count
    }

    /// Removes the slide at `index`, if there is one.
    pub async fn remove(&self, index: usize) -> Option<Slide> {
        self.slots.lock().await.remove(index)
    }

    pub async fn clear(&self) {
        self.slots.lock().await.clear();
    }

    /// Advances the cursor and returns the slide to display.
    ///
    /// Returns [`None`] when there is nothing to show, which callers should treat as "try again
    /// later".
    pub async fn next(&self) -> Option<Slide> {
        self.slots.lock().await.advance()
    }

    pub async fn count(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }

    fn wake(&self) {
        match self.wake.0.try_send(()) {
            Ok(()) => log::debug!("playlist is no longer empty, waking runner"),
            Err(TrySendError::Full(())) => (),
            Err(TrySendError::Closed(())) => {
                log::warn!("wake channel closed, runner falls back to polling");
            }
        }
    }
}

impl Default for Playlist {
    fn default() -> Self {
        Self::new(IndexPolicy::default())
    }
}
