//! Camera stream sources
//!
//! A source opens a fresh byte stream on every call; the viewer treats the
//! body as opaque bytes and never parses the multipart framing.
//!
//! Every opened stream may carry a closer. Calling it from another thread
//! unblocks a read that is parked on a silent peer, which is how the viewer
//! stops without waiting on the camera.

use crate::error::{Error, Result};
use crate::scanner::DEFAULT_CHUNK_SIZE;
use crossbeam_channel::{Receiver, Sender, bounded, select};
use std::io::{self, Read};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Body chunks buffered between the HTTP pump and the viewer
const PUMP_DEPTH: usize = 8;

/// Unblocks a pending read on an open stream
pub type StreamCloser = Box<dyn FnOnce() + Send>;

/// A freshly opened byte stream and its closer
pub struct OpenStream {
    pub reader: Box<dyn Read + Send>,
    /// `None` for streams whose reads never park (in-memory data)
    pub closer: Option<StreamCloser>,
}

impl OpenStream {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            closer: None,
        }
    }

    pub fn with_closer(
        reader: impl Read + Send + 'static,
        closer: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            closer: Some(Box::new(closer)),
        }
    }

    /// Socket-backed stream; the closer shuts the socket down both ways
    pub fn tcp(stream: TcpStream) -> Result<Self> {
        let handle = stream.try_clone()?;
        Ok(Self::with_closer(stream, move || {
            if let Err(e) = handle.shutdown(Shutdown::Both) {
                log::debug!("Stream socket shutdown: {}", e);
            }
        }))
    }
}

/// Opens the MJPEG byte stream
pub trait StreamSource: Send {
    fn open(&self) -> Result<OpenStream>;

    /// Human-readable location for logs and status text
    fn describe(&self) -> String;
}

/// MJPEG over HTTP (mjpg-streamer style endpoint)
///
/// The blocking response exposes no socket handle, so the body is read on
/// an `http-body` thread and handed over through a channel. The closer cuts
/// the channel; the pump thread drops the response, and with it the
/// connection, on its next send.
pub struct HttpSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Result<Self> {
        // No overall timeout: the body is an endless stream
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(None::<Duration>)
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl StreamSource for HttpSource {
    fn open(&self) -> Result<OpenStream> {
        let response = self.client.get(&self.url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http(format!("{} returned {}", self.url, status)));
        }
        if let Some(ct) = response.headers().get(reqwest::header::CONTENT_TYPE) {
            log::debug!("{}: content-type {:?}", self.url, ct);
        }
        pump(self.url.clone(), response)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Move a blocking body onto its own thread behind a closable reader
fn pump(url: String, mut body: impl Read + Send + 'static) -> Result<OpenStream> {
    let (data_tx, data_rx) = bounded::<io::Result<Vec<u8>>>(PUMP_DEPTH);
    let (close_tx, close_rx) = bounded::<()>(1);

    thread::Builder::new()
        .name("http-body".to_string())
        .spawn(move || {
            let mut buf = vec![0u8; DEFAULT_CHUNK_SIZE];
            loop {
                let item = match body.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => Ok(buf[..n].to_vec()),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => Err(e),
                };
                let failed = item.is_err();
                if data_tx.send(item).is_err() || failed {
                    break;
                }
            }
            log::debug!("{}: body pump finished", url);
        })
        .map_err(|e| Error::Other(format!("Failed to spawn body thread: {}", e)))?;

    let reader = ChannelReader {
        data: data_rx,
        closed: close_rx,
        pending: Vec::new(),
        pos: 0,
    };
    Ok(OpenStream::with_closer(reader, move || close(close_tx)))
}

fn close(tx: Sender<()>) {
    // A full or disconnected channel means the reader is already closing
    let _ = tx.try_send(());
}

/// Reader side of the body pump
struct ChannelReader {
    data: Receiver<io::Result<Vec<u8>>>,
    closed: Receiver<()>,
    pending: Vec<u8>,
    pos: usize,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pos >= self.pending.len() {
            select! {
                recv(self.data) -> msg => match msg {
                    Ok(Ok(bytes)) => {
                        self.pending = bytes;
                        self.pos = 0;
                    }
                    Ok(Err(e)) => return Err(e),
                    // Pump finished: end of body
                    Err(_) => return Ok(0),
                },
                recv(self.closed) -> _ => {
                    return Err(io::Error::new(io::ErrorKind::ConnectionAborted, "stream closed"));
                }
            }
        }
        let n = (self.pending.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// In-memory source; every `open` replays the same bytes
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        let data: Vec<u8> = data.into();
        Self { data: data.into() }
    }
}

impl StreamSource for MemorySource {
    fn open(&self) -> Result<OpenStream> {
        Ok(OpenStream::new(io::Cursor::new(Arc::clone(&self.data))))
    }

    fn describe(&self) -> String {
        format!("memory ({} bytes)", self.data.len())
    }
}
