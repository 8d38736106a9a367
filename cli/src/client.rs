//! Talks to the slidecastd webhook

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use ureq::Agent;

use crate::cli::Commands;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot read {}: {source}", .path.to_string_lossy())]
    ReadImage { path: PathBuf, source: io::Error },
    #[error("cannot encode request: {0}")]
    Json(#[from] serde_json::Error),
    #[error("request to {url} failed: {source}")]
    Http { url: String, source: ureq::Error },
}

#[derive(Serialize)]
struct ScreenPayload {
    image: String,
    index: usize,
    transition_time: i64,
}

#[derive(Serialize)]
struct SlidePayload {
    image: String,
    transition_time: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, PartialEq)]
pub struct Request {
    method: Method,
    path: String,
    /// JSON body, only sent with `POST` and `PUT`.
    body: String,
}

#[derive(Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn encode_image(path: &Path) -> Result<String, ClientError> {
    let bytes = std::fs::read(path).map_err(|source| ClientError::ReadImage {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(STANDARD.encode(bytes))
}

impl Request {
    /// Builds the request for a subcommand, reading and encoding any image files it names.
    ///
    /// # Errors
    /// Fails if an image cannot be read.
    pub fn from_command(command: &Commands) -> Result<Self, ClientError> {
        let request = match command {
            Commands::Push {
                file,
                index,
                transition,
            } => {
                let payload = ScreenPayload {
                    image: encode_image(file)?,
                    index: *index,
                    transition_time: *transition,
                };
                Self {
                    method: Method::Post,
                    path: "/webhook".to_string(),
                    body: serde_json::to_string(&payload)?,
                }
            }
            Commands::Replace { files, transition } => {
                let payload = files
                    .iter()
                    .map(|file| {
                        Ok(SlidePayload {
                            image: encode_image(file)?,
                            transition_time: *transition,
                        })
                    })
                    .collect::<Result<Vec<_>, ClientError>>()?;
                Self {
                    method: Method::Put,
                    path: "/playlist".to_string(),
                    body: serde_json::to_string(&payload)?,
                }
            }
            Commands::Remove { index } => {
                Self::bodyless(Method::Delete, format!("/playlist/{index}"))
            }
            Commands::Clear => Self::bodyless(Method::Delete, "/playlist".to_string()),
            Commands::Status => Self::bodyless(Method::Get, "/status".to_string()),
        };
        Ok(request)
    }

    fn bodyless(method: Method, path: String) -> Self {
        Self {
            method,
            path,
            body: String::new(),
        }
    }
}

/// Sends `request` to slidecastd at `host` and reads the whole response.
///
/// Error statuses are returned as a [`Response`] like any other.
///
/// # Errors
/// Fails if the daemon cannot be reached or does not speak HTTP.
pub fn send(host: &str, request: Request) -> Result<Response, ClientError> {
    let agent: Agent = Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .into();
    let url = format!("http://{host}{}", request.path);

    let sent = match request.method {
        Method::Get => agent.get(url.as_str()).call(),
        Method::Delete => agent.delete(url.as_str()).call(),
        Method::Post => agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(request.body),
        Method::Put => agent
            .put(url.as_str())
            .header("Content-Type", "application/json")
            .send(request.body),
    };
    let read = sent.and_then(|mut response| {
        let body = response.body_mut().read_to_string()?;
        Ok(Response {
            status: response.status().as_u16(),
            body: body.trim_end().to_string(),
        })
    });
    read.map_err(|source| ClientError::Http { url, source })
}
