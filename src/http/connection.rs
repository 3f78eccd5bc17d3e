use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::parser::{ParseError, ParseLimits, parse_http_request};
use crate::http::request::{Method, Request};
use crate::http::writer::ResponseWriter;
use crate::routing::Router;
use crate::storage::FileStore;

const READ_CHUNK: usize = 4096;

/// Per-connection tunables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionSettings {
    pub limits: ParseLimits,
    /// Longest wait for the next bytes of a request; `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

pub struct Connection<S, F> {
    stream: S,
    router: Arc<Router<F>>,
    settings: ConnectionSettings,
    buffer: BytesMut,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

impl<S, F> Connection<S, F>
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: FileStore,
{
    pub fn new(stream: S, router: Arc<Router<F>>, settings: ConnectionSettings) -> Self {
        Self {
            stream,
            router,
            settings,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            state: ConnectionState::Reading,
        }
    }

    /// Drives the connection until it closes.
    ///
    /// Requests are handled strictly one at a time: bytes of the next request
    /// are not parsed until the current response has been written.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    if let Some(req) = self.read_request().await? {
                        self.state = ConnectionState::Processing(req);
                    }
                }

                ConnectionState::Processing(req) => {
                    let keep_alive = req.keep_alive();
                    let mut response = self.router.dispatch(&req).await;

                    if !keep_alive {
                        response.push_header("Connection", "close");
                    }

                    tracing::debug!(
                        method = %req.method,
                        path = %req.path,
                        status = response.status.as_u16(),
                        body_len = response.body.len(),
                        keep_alive,
                        "Handled request"
                    );

                    let writer = if req.method == Method::HEAD {
                        ResponseWriter::without_body(&response)
                    } else {
                        ResponseWriter::new(&response)
                    };
                    self.state = ConnectionState::Writing(writer, keep_alive);
                }

                ConnectionState::Writing(mut writer, keep_alive) => {
                    writer.write_to_stream(&mut self.stream).await?;

                    if keep_alive {
                        self.state = ConnectionState::Reading; // go back for next request
                    } else if let Err(e) = self.stream.shutdown().await {
                        tracing::debug!(error = %e, "Shutdown after close failed");
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Reads until one full request is buffered.
    ///
    /// `Ok(None)` means the connection should end quietly: the peer closed,
    /// went idle past the timeout, or sent something unparseable.
    pub async fn read_request(&mut self) -> anyhow::Result<Option<Request>> {
        loop {
            match parse_http_request(&self.buffer, &self.settings.limits) {
                Ok((request, consumed)) => {
                    self.buffer.advance(consumed);
                    return Ok(Some(request));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data → fall through to read
                }

                Err(e) => {
                    tracing::warn!(error = %e, "Malformed request, closing connection");
                    return Ok(None);
                }
            }

            self.buffer.reserve(READ_CHUNK);
            let n = match self.settings.idle_timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, self.stream.read_buf(&mut self.buffer)).await {
                        Ok(read) => read?,
                        Err(_) => {
                            tracing::debug!(timeout = ?limit, "Connection idle, closing");
                            return Ok(None);
                        }
                    }
                }
                None => self.stream.read_buf(&mut self.buffer).await?,
            };

            if n == 0 {
                if !self.buffer.is_empty() {
                    tracing::debug!(
                        pending = self.buffer.len(),
                        "Peer closed with a partial request"
                    );
                }
                return Ok(None);
            }
        }
    }
}
