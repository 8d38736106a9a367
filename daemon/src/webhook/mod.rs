//! The webhook feeding the [`Playlist`].
//!
//! Routes:
//! - `POST /webhook` puts one image at an index.
//! - `PUT /playlist` replaces the whole playlist.
//! - `DELETE /playlist/<index>` removes one image, `DELETE /playlist` removes all of them.
//! - `GET /status` reports the number of images and what the runner is doing.
//!
//! Every connection carries exactly one request and is closed after the response.

pub mod http;
pub mod payload;

use smol::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use smol::lock::Mutex;
use smol::net::{TcpListener, TcpStream};
use smol::stream::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

use crate::playlist::Playlist;
use crate::runner::RunnerState;
use http::{Method, RequestHead, Response};
use payload::{ScreenPayload, SlidePayload, decode_image};

pub const DEFAULT_MAX_BODY: usize = 32 * 1024 * 1024;
/// Upper bound for the request line and headers together.
const MAX_HEAD: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed request")]
    Malformed,
    #[error("nothing at {0}")]
    NotFound(String),
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("no image at index {0}")]
    NoSuchSlide(usize),
    #[error("chunked bodies are not supported, send a Content-Length")]
    LengthRequired,
    #[error("body larger than {0} bytes")]
    TooLarge(usize),
    #[error("cannot read payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot decode base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid image data: {0}")]
    Image(#[from] image::ImageError),
    #[error("unrecognised image format")]
    UnknownFormat,
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
}

impl RequestError {
    /// HTTP status code reported for this error.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            RequestError::NotFound(_) | RequestError::NoSuchSlide(_) => 404,
            RequestError::MethodNotAllowed => 405,
            RequestError::LengthRequired => 411,
            RequestError::TooLarge(_) => 413,
            _ => 400,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    Push,
    Replace,
    Remove(usize),
    Clear,
    Status,
}

/// Maps a request line to a [`Route`].
///
/// # Errors
/// [`RequestError::NotFound`] for unknown paths, [`RequestError::MethodNotAllowed`] for known
/// paths requested with the wrong method.
pub fn route(method: &Method, path: &str) -> Result<Route, RequestError> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match (method, segments.as_slice()) {
        (Method::Post, ["webhook"]) => Ok(Route::Push),
        (Method::Put, ["playlist"]) => Ok(Route::Replace),
        (Method::Delete, ["playlist"]) => Ok(Route::Clear),
        (Method::Delete, ["playlist", index]) => index
            .parse()
            .map(Route::Remove)
            .map_err(|_| RequestError::NotFound(path.to_string())),
        (Method::Get, ["status"]) => Ok(Route::Status),
        (_, ["webhook" | "playlist" | "status"] | ["playlist", _]) => {
            Err(RequestError::MethodNotAllowed)
        }
        _ => Err(RequestError::NotFound(path.to_string())),
    }
}

pub struct Webhook {
    listener: TcpListener,
    handler: Handler,
}

/// Everything a connection needs, cloned into each connection task.
#[derive(Clone)]
struct Handler {
    playlist: Arc<Playlist>,
    state: Arc<Mutex<RunnerState>>,
    max_body: usize,
}

impl Webhook {
    /// Binds the webhook to `addr`.
    ///
    /// # Errors
    /// See [`TcpListener::bind`].
    pub async fn bind(
        addr: SocketAddr,
        playlist: Arc<Playlist>,
        state: Arc<Mutex<RunnerState>>,
        max_body: usize,
    ) -> std::io::Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr).await?,
            handler: Handler {
                playlist,
                state,
                max_body,
            },
        })
    }

    /// # Errors
    /// See [`TcpListener::local_addr`].
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, each one is served by its own task.
    pub async fn listen(&self) {
        let mut incoming = self.listener.incoming();
        while let Some(conn) = incoming.next().await {
            match conn {
                Ok(stream) => {
                    let handler = self.handler.clone();
                    smol::spawn(async move { handler.serve(stream).await }).detach();
                }
                Err(err) => log::warn!("failed to accept connection: {err}"),
            }
        }
    }
}

impl Handler {
    async fn serve(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map_or_else(|_| "unknown peer".to_string(), |addr| addr.to_string());
        let mut writer = stream.clone();
        let response = match self.respond(stream, &mut writer).await {
            Ok(response) => response,
            Err(err) => {
                log::warn!("{peer}: {err}");
                Response::text(err.status(), err.to_string())
            }
        };
        if let Err(err) = writer.write_all(&response.to_bytes()).await {
            log::warn!("{peer}: failed to send response: {err}");
        }
        let _ = writer.close().await;
    }

    async fn respond(
        &self,
        stream: TcpStream,
        writer: &mut TcpStream,
    ) -> Result<Response, RequestError> {
        let mut reader = BufReader::new(stream);
        let head = read_head(&mut reader).await?;
        let route = route(&head.method, &head.path)?;
        if head.chunked {
            return Err(RequestError::LengthRequired);
        }
        if head.content_length > self.max_body {
            return Err(RequestError::TooLarge(self.max_body));
        }
        if head.expect_continue && head.content_length > 0 {
            writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await?;
        }
        let mut body = vec![0; head.content_length];
        reader.read_exact(&mut body).await?;
        self.handle(route, &body).await
    }

    async fn handle(&self, route: Route, body: &[u8]) -> Result<Response, RequestError> {
        match route {
            Route::Push => {
                let payload: ScreenPayload = serde_json::from_slice(body)?;
                let image = decode_image(&payload.image)?;
                let count = self
                    .playlist
                    .put(payload.index, image, payload.transition_time)
                    .await;
                log::info!(
                    "received image {} with transition {}s, {count} in playlist",
                    payload.index,
                    payload.transition_time
                );
                Ok(Response::text(
                    200,
                    format!("image {} received", payload.index),
                ))
            }
            Route::Replace => {
                let payloads: Vec<SlidePayload> = serde_json::from_slice(body)?;
                let slides = payloads
                    .iter()
                    .map(|slide| Ok((decode_image(&slide.image)?, slide.transition_time)))
                    .collect::<Result<Vec<_>, RequestError>>()?;
                let count = self.playlist.replace_all(slides).await;
                log::info!("playlist replaced, {count} in playlist");
                Ok(Response::text(
                    200,
                    format!("playlist replaced with {count} images"),
                ))
            }
            Route::Remove(index) => {
                self.playlist
                    .remove(index)
                    .await
                    .ok_or(RequestError::NoSuchSlide(index))?;
                log::info!("removed image {index}");
                Ok(Response::text(200, format!("image {index} removed")))
            }
            Route::Clear => {
                self.playlist.clear().await;
                log::info!("playlist cleared");
                Ok(Response::text(200, "playlist cleared"))
            }
            Route::Status => {
                let count = self.playlist.count().await;
                let state = *self.state.lock().await;
                Ok(Response::json(&serde_json::json!({
                    "count": count,
                    "policy": self.playlist.policy().to_string(),
                    "state": state.to_string(),
                })))
            }
        }
    }
}

/// Reads the request line and headers, up to the blank line.
async fn read_head<R>(reader: &mut R) -> Result<RequestHead, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut head = Vec::new();
    loop {
        let budget = u64::try_from(MAX_HEAD - head.len()).unwrap_or(u64::MAX);
        let mut line = Vec::new();
        (&mut *reader)
            .take(budget)
            .read_until(b'\n', &mut line)
            .await?;
        // Either the peer hung up or the head outgrew MAX_HEAD
        if !line.ends_with(b"\n") {
            return Err(RequestError::Malformed);
        }
        head.extend_from_slice(&line);
        if line == b"\r\n" || line == b"\n" {
            break;
        }
    }
    let head = String::from_utf8(head).map_err(|_| RequestError::Malformed)?;
    http::parse_head(&head)
}
