//! Shows slides with an external image viewer, `feh` by default.

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use smol::Timer;
use smol::process::{Child, Command, Stdio};
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::display::{Display, DisplayError};
use crate::playlist::Slide;

pub const DEFAULT_VIEWER: &str = "feh";
pub const DEFAULT_ARGS: [&str; 3] = ["--fullscreen", "--hide-pointer", "--bg-scale"];
pub const DEFAULT_DISPLAYS: [&str; 2] = [":0", ":0.0"];

/// A viewer exiting within this window decides the outcome by its exit status.
/// One still running afterwards is considered to be showing the image.
const SETTLE: Duration = Duration::from_millis(500);
/// How long a viewer may take to exit after SIGTERM before it is killed.
const TERM_GRACE: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub binary: String,
    pub args: Vec<String>,
    pub displays: Vec<String>,
    /// Where images are written for the viewer to read.
    pub runtime_dir: PathBuf,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_VIEWER.to_string(),
            args: DEFAULT_ARGS.iter().map(ToString::to_string).collect(),
            displays: DEFAULT_DISPLAYS.iter().map(ToString::to_string).collect(),
            runtime_dir: env::temp_dir(),
        }
    }
}

/// The viewer process showing the current slide, and the file it reads.
struct Shown {
    child: Child,
    index: usize,
    _file: NamedTempFile,
}

pub struct Viewer {
    config: ViewerConfig,
    current: Option<Shown>,
}

impl Viewer {
    #[must_use]
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            current: None,
        }
    }

    /// Gets the [`Command`] that shows the image at `path` on the given X display.
    fn sys_command(&self, display: &str, path: &Path) -> Command {
        let mut sys_cmd = Command::new(&self.config.binary);
        sys_cmd.args(&self.config.args).arg(path).env("DISPLAY", display);
        if env::var_os("XAUTHORITY").is_none()
            && let Some(home) = env::var_os("HOME")
        {
            sys_cmd.env("XAUTHORITY", PathBuf::from(home).join(".Xauthority"));
        }
        sys_cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        sys_cmd
    }

    fn write_image(&self, slide: &Slide) -> Result<NamedTempFile, DisplayError> {
        let mut file = tempfile::Builder::new()
            .prefix(&format!("screen_{}_", slide.index()))
            .suffix(".img")
            .tempfile_in(&self.config.runtime_dir)
            .map_err(DisplayError::TempFile)?;
        file.write_all(slide.payload())
            .and_then(|()| file.flush())
            .map_err(DisplayError::TempFile)?;
        Ok(file)
    }
}

impl Display for Viewer {
    fn name(&self) -> String {
        Path::new(&self.config.binary)
            .file_name()
            .map_or_else(|| self.config.binary.clone(), |name| name.to_string_lossy().into_owned())
    }

    async fn show(&mut self, slide: &Slide) -> Result<(), DisplayError> {
        self.dismiss().await;

        let file = self.write_image(slide)?;
        let displays = self.config.displays.clone();
        let mut last_err = None;

        for display in &displays {
            log::debug!(
                "showing slide {} from {} on DISPLAY={display}",
                slide.index(),
                file.path().to_string_lossy()
            );
            let mut child = self
                .sys_command(display, file.path())
                .spawn()
                .map_err(|source| DisplayError::CannotSpawn {
                    binary: self.config.binary.clone(),
                    source,
                })?;

            let settled = smol::future::race(
                async { Some(child.status().await) },
                async {
                    Timer::after(SETTLE).await;
                    None
                },
            )
            .await;

            match settled {
                None => {
                    self.current = Some(Shown {
                        child,
                        index: slide.index(),
                        _file: file,
                    });
                    return Ok(());
                }
                Some(Ok(status)) if status.success() => {
                    log::debug!("`{}` exited successfully", self.config.binary);
                    return Ok(());
                }
                Some(Ok(status)) => {
                    let err = DisplayError::ViewerFailed {
                        display: display.clone(),
                        status,
                    };
                    log::debug!("attempt failed: {err}");
                    last_err = Some(err);
                }
                Some(Err(err)) => return Err(DisplayError::Wait(err)),
            }
        }

        match last_err {
            Some(err) => Err(DisplayError::AllDisplaysFailed(displays.len(), Box::new(err))),
            None => Err(DisplayError::NoDisplay),
        }
    }

    async fn dismiss(&mut self) {
        let Some(mut shown) = self.current.take() else {
            return;
        };
        match shown.child.try_status() {
            Ok(Some(_)) => return,
            Ok(None) => (),
            Err(err) => log::warn!("cannot query viewer of slide {}: {err}", shown.index),
        }

        terminate(&shown.child);
        let exited = smol::future::race(
            async { shown.child.status().await.is_ok() },
            async {
                Timer::after(TERM_GRACE).await;
                false
            },
        )
        .await;
        if !exited {
            log::warn!(
                "viewer of slide {} ignored SIGTERM, killing it",
                shown.index
            );
            if let Err(err) = shown.child.kill() {
                log::warn!("failed to kill viewer of slide {}: {err}", shown.index);
            }
            let _ = shown.child.status().await;
        }
        log::debug!("dismissed slide {}", shown.index);
    }
}

/// Sends a SIGTERM to the viewer.
fn terminate(child: &Child) {
    let Ok(pid) = i32::try_from(child.id()) else {
        log::warn!("viewer pid {} out of range", child.id());
        return;
    };
    if let Err(err) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
        log::warn!("failed to terminate viewer: {err}");
    }
}

/// Looks up the viewer binary the way a shell would.
#[must_use]
pub fn find_binary(name: &str) -> Option<PathBuf> {
    if name.contains('/') {
        let path = PathBuf::from(name);
        return path.is_file().then_some(path);
    }
    env::split_paths(&env::var_os("PATH")?)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
