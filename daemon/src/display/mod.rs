mod viewer;

pub use viewer::{Viewer, ViewerConfig, find_binary};

use std::future::Future;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

use crate::playlist::Slide;

/// Something that can put a [`Slide`] on screen.
///
/// Only one slide is shown at a time: showing a new slide replaces whatever was shown before.
pub trait Display {
    fn name(&self) -> String;

    /// Shows the slide, returning once it is visible or showing it failed.
    fn show(&mut self, slide: &Slide) -> impl Future<Output = Result<(), DisplayError>> + Send;

    /// Takes down whatever is currently shown, if anything.
    fn dismiss(&mut self) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("cannot write image to a temporary file: {0}")]
    TempFile(#[source] std::io::Error),
    #[error("cannot spawn `{binary}`: {source}")]
    CannotSpawn {
        binary: String,
        source: std::io::Error,
    },
    #[error("cannot wait for the viewer: {0}")]
    Wait(#[source] std::io::Error),
    #[error("viewer {status} on DISPLAY={display}")]
    ViewerFailed { display: String, status: ExitStatus },
    #[error("all {0} displays failed, last error: {1}")]
    AllDisplaysFailed(usize, Box<DisplayError>),
    #[error("no display to show the image on")]
    NoDisplay,
    #[error("display timed out after {0:?}")]
    Timeout(Duration),
}
