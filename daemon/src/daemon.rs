//! `slidecastd` entry
//!
//! The daemon that shows images pushed over a webhook.
//! It owns the [`Playlist`], hands it to both the webhook and the [`Runner`], and keeps them
//! running until the process is killed.

use clap::Parser;
use std::env;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::display::{Viewer, ViewerConfig, find_binary};
use crate::playlist::{IndexPolicy, Playlist};
use crate::runner::{DEFAULT_DISPLAY_TIMEOUT, Runner};
use crate::webhook::{DEFAULT_MAX_BODY, Webhook};

#[derive(Parser)]
#[command(
    version = "0.3.0",
    about = "A daemon that shows images pushed over a webhook in an endless slideshow"
)]
struct Cli {
    #[arg(
        short = 'l',
        long = "listen",
        value_name = "ADDR",
        default_value = "0.0.0.0:8081",
        help = "Address the webhook listens on."
    )]
    listen: SocketAddr,

    #[arg(
        short = 'b',
        long = "viewer",
        value_name = "PATH",
        help = "Image viewer used to show images, `feh` if not given."
    )]
    viewer: Option<String>,

    #[arg(
        long = "viewer-arg",
        value_name = "ARG",
        allow_hyphen_values = true,
        help = "Argument passed to the viewer before the image path, replaces the defaults. Can be repeated."
    )]
    viewer_args: Vec<String>,

    #[arg(
        short = 'd',
        long = "display",
        value_name = "DISPLAY",
        help = "X display to try, in order. Can be repeated."
    )]
    displays: Vec<String>,

    #[arg(
        short = 'i',
        long = "index-policy",
        value_enum,
        default_value_t = IndexPolicy::Sparse,
        help = "Whether image indices are sparse keys or positions in a sequence."
    )]
    policy: IndexPolicy,

    #[arg(
        short = 't',
        long = "display-timeout",
        value_name = "DURATION",
        value_parser = parse_duration,
        help = "Give up on the viewer after this long, e.g. `10s`."
    )]
    display_timeout: Option<Duration>,

    #[arg(
        long = "max-body",
        value_name = "BYTES",
        help = "Largest request body the webhook accepts."
    )]
    max_body: Option<usize>,

    #[arg(
        short = 'r',
        long = "runtime-dir",
        value_name = "PATH",
        help = "Where images are stored while shown, inside a `slidecastd` directory that is emptied on startup."
    )]
    runtime_dir: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose", help = "Log debug messages.")]
    verbose: bool,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    duration_str::parse(value).map_err(|err| err.to_string())
}

pub struct Config {
    pub listen: SocketAddr,
    pub viewer: ViewerConfig,
    pub policy: IndexPolicy,
    pub display_timeout: Duration,
    pub max_body: usize,
    pub verbose: bool,
}

impl From<Cli> for Config {
    fn from(parsed: Cli) -> Self {
        let mut viewer = ViewerConfig {
            runtime_dir: parsed
                .runtime_dir
                .map_or_else(sys_runtime_dir, |dir| dir.join(RUNTIME_DIR_NAME)),
            ..ViewerConfig::default()
        };
        if let Some(binary) = parsed.viewer {
            viewer.binary = binary;
        }
        if !parsed.viewer_args.is_empty() {
            viewer.args = parsed.viewer_args;
        }
        if !parsed.displays.is_empty() {
            viewer.displays = parsed.displays;
        }
        Config {
            listen: parsed.listen,
            viewer,
            policy: parsed.policy,
            display_timeout: parsed.display_timeout.unwrap_or(DEFAULT_DISPLAY_TIMEOUT),
            max_body: parsed.max_body.unwrap_or(DEFAULT_MAX_BODY),
            verbose: parsed.verbose,
        }
    }
}

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("failed to prepare runtime directory {}: {source}", .path.to_string_lossy())]
    RuntimeDir { path: PathBuf, source: io::Error },
    #[error("failed to set up logger: {0}")]
    Logger(#[from] fern::InitError),
    #[error("cannot find image viewer `{0}`")]
    ViewerNotFound(String),
    #[error("cannot listen on {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
}

/// The daemon only ever empties a directory of this name.
const RUNTIME_DIR_NAME: &str = "slidecastd";

fn sys_runtime_dir() -> PathBuf {
    env::var_os("XDG_RUNTIME_DIR")
        .map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
        .join(RUNTIME_DIR_NAME)
}

/// Empties the runtime directory, leftovers from an earlier run are of no use.
fn prepare_runtime_dir(path: &Path) -> io::Result<()> {
    if path.exists() {
        std::fs::remove_dir_all(path)?;
    }
    std::fs::create_dir_all(path)
}

fn setup_logger(verbose: bool) -> Result<(), fern::InitError> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                message
            ));
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

pub struct Slidecastd {
    config: Config,
}

impl Slidecastd {
    /// Parses arguments and prepares the environment.
    ///
    /// # Errors
    /// Fatal errors that will cause the program to exit will be returned here.
    pub fn init() -> Result<Self, DaemonError> {
        let config = Config::from(Cli::parse());

        let runtime_dir = &config.viewer.runtime_dir;
        prepare_runtime_dir(runtime_dir).map_err(|source| DaemonError::RuntimeDir {
            path: runtime_dir.clone(),
            source,
        })?;
        setup_logger(config.verbose)?;

        let viewer = find_binary(&config.viewer.binary)
            .ok_or_else(|| DaemonError::ViewerNotFound(config.viewer.binary.clone()))?;
        log::info!("using viewer {}", viewer.to_string_lossy());

        Ok(Self { config })
    }

    /// The real start, only returns if the webhook cannot be set up.
    ///
    /// # Errors
    /// See [`DaemonError::Bind`].
    pub fn start(&self) -> Result<(), DaemonError> {
        smol::block_on(self.serve())
    }

    async fn serve(&self) -> Result<(), DaemonError> {
        let config = &self.config;
        let playlist = Arc::new(Playlist::new(config.policy));
        let mut runner = Runner::new(
            playlist.clone(),
            Viewer::new(config.viewer.clone()),
            config.display_timeout,
        );
        let webhook = Webhook::bind(config.listen, playlist, runner.state(), config.max_body)
            .await
            .map_err(|source| DaemonError::Bind {
                addr: config.listen,
                source,
            })?;
        log::info!(
            "listening on http://{}, {} indices",
            webhook.local_addr().unwrap_or(config.listen),
            config.policy
        );

        smol::future::race(runner.run(), webhook.listen()).await;
        Ok(())
    }
}
