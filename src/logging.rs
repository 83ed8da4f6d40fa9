//! Process diagnostics: a `tracing` subscriber writing to stderr, or to the
//! local syslog daemon when `log_to_syslog` is set.

use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg(unix)]
use std::os::unix::net::UnixDatagram;
#[cfg(unix)]
use std::sync::Arc;

const SYSLOG_TAG: &str = "log-shuttle";
const SYSLOG_SOCKETS: [&str; 2] = ["/dev/log", "/var/run/syslog"];
/// LOG_SYSLOG
const FACILITY: u8 = 5;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unable to connect to syslog: {0}")]
    Syslog(#[source] io::Error),

    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber. `RUST_LOG` overrides the default
/// `log_shuttle=info` filter.
pub fn init_tracing(log_to_syslog: bool) -> Result<(), LoggingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("log_shuttle=info"));

    let (stderr_layer, syslog_layer) = if log_to_syslog {
        let writer = SyslogMakeWriter::connect_default()?;
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .without_time()
            .with_target(false);
        (None, Some(layer))
    } else {
        let layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);
        (Some(layer), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(syslog_layer)
        .try_init()?;

    Ok(())
}

fn severity(level: &Level) -> u8 {
    match *level {
        Level::ERROR => 3,
        Level::WARN => 4,
        Level::INFO => 6,
        Level::DEBUG | Level::TRACE => 7,
    }
}

/// Produces one [`SyslogWriter`] per event.
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct SyslogMakeWriter {
    socket: Arc<UnixDatagram>,
    pid: u32,
}

#[cfg(unix)]
impl SyslogMakeWriter {
    /// Connect to the first syslog socket that accepts us.
    pub fn connect_default() -> Result<Self, LoggingError> {
        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no syslog socket found");
        for path in SYSLOG_SOCKETS {
            match Self::connect(Path::new(path)) {
                Ok(writer) => return Ok(writer),
                Err(LoggingError::Syslog(e)) => last_err = e,
                Err(e) => return Err(e),
            }
        }
        Err(LoggingError::Syslog(last_err))
    }

    pub fn connect(path: &Path) -> Result<Self, LoggingError> {
        let socket = UnixDatagram::unbound().map_err(LoggingError::Syslog)?;
        socket.connect(path).map_err(LoggingError::Syslog)?;
        Ok(Self {
            socket: Arc::new(socket),
            pid: std::process::id(),
        })
    }

    fn writer(&self, severity: u8) -> SyslogWriter {
        SyslogWriter {
            socket: Arc::clone(&self.socket),
            prefix: format!("<{}>{}[{}]: ", FACILITY * 8 + severity, SYSLOG_TAG, self.pid),
            buf: Vec::new(),
        }
    }
}

#[cfg(not(unix))]
#[derive(Debug, Clone)]
pub struct SyslogMakeWriter;

#[cfg(not(unix))]
impl SyslogMakeWriter {
    pub fn connect_default() -> Result<Self, LoggingError> {
        Err(LoggingError::Syslog(io::Error::new(
            io::ErrorKind::Unsupported,
            "syslog output requires a unix platform",
        )))
    }

    fn writer(&self, _severity: u8) -> io::Sink {
        io::sink()
    }
}

impl<'a> MakeWriter<'a> for SyslogMakeWriter {
    #[cfg(unix)]
    type Writer = SyslogWriter;
    #[cfg(not(unix))]
    type Writer = io::Sink;

    fn make_writer(&'a self) -> Self::Writer {
        self.writer(severity(&Level::INFO))
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        self.writer(severity(meta.level()))
    }
}

/// Buffers one formatted event and sends it as a single datagram on drop.
#[cfg(unix)]
pub struct SyslogWriter {
    socket: Arc<UnixDatagram>,
    prefix: String,
    buf: Vec<u8>,
}

#[cfg(unix)]
impl Write for SyslogWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(unix)]
impl Drop for SyslogWriter {
    fn drop(&mut self) {
        let message = self.buf.strip_suffix(b"\n").unwrap_or(&self.buf);
        if message.is_empty() {
            return;
        }
        let mut datagram = Vec::with_capacity(self.prefix.len() + message.len());
        datagram.extend_from_slice(self.prefix.as_bytes());
        datagram.extend_from_slice(message);
        // Nowhere left to report a failure to log.
        let _ = self.socket.send(&datagram);
    }
}
