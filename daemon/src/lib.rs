pub mod daemon;
pub mod display;
pub mod playlist;
pub mod runner;
pub mod webhook;

pub use daemon::{DaemonError, Slidecastd};
pub use playlist::{IndexPolicy, Playlist, Slide};
pub use runner::{Runner, RunnerState};
