use crate::config::{self, ControlConfig};
use crate::error::{WifiError, WifiResult};
use std::borrow::Cow;
use std::collections::HashSet;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const PING: &str = "PING";
const PONG: &[u8] = b"PONG";

/// Client socket paths currently bound by this process
static OPEN_ENDPOINTS: LazyLock<Mutex<HashSet<PathBuf>>> = LazyLock::new(Default::default);

/// Request/response primitive the network session is built on
pub trait ControlTransport {
    /// Send one command and return the raw bytes of its single reply
    fn request(&self, command: &str) -> WifiResult<Vec<u8>>;

    /// Like [`request`](Self::request), decoding the reply as UTF-8
    fn request_text(&self, command: &str) -> WifiResult<String> {
        let reply = self.request(command)?;
        String::from_utf8(reply).map_err(|_| WifiError::InvalidUtf8 {
            command: command_name(command),
        })
    }
}

/// Connected datagram socket to wpa_supplicant's control interface.
///
/// The client socket file is removed when the channel is closed or dropped.
/// A request whose reply timed out leaves the channel out of sync: the late
/// reply can no longer be told apart from the next one, so every later
/// request fails with `OutOfSync`.
#[derive(Debug)]
pub struct ControlChannel {
    socket: Mutex<UnixDatagram>,
    local_path: PathBuf,
    remote_path: PathBuf,
    reply_buffer: usize,
    out_of_sync: AtomicBool,
    _claim: EndpointClaim,
}

impl ControlChannel {
    /// Bind a private socket for `ifname`, connect it to the daemon and
    /// complete the PING/PONG handshake
    pub fn open(ifname: &str, config: &ControlConfig) -> WifiResult<Self> {
        validate_ifname(ifname)?;
        let local_path = config.local_socket_path(ifname);
        let remote_path = config.remote_socket_path(ifname);

        // Claim before touching the file so a live endpoint is never unlinked
        let claim = EndpointClaim::acquire(&local_path)?;
        remove_stale_socket(&local_path)?;

        let socket = UnixDatagram::bind(&local_path).map_err(|source| WifiError::Bind {
            path: local_path.clone(),
            source,
        })?;
        debug!("Bound control socket {:?}", local_path);

        let channel = Self {
            socket: Mutex::new(socket),
            local_path,
            remote_path,
            reply_buffer: config.reply_buffer,
            out_of_sync: AtomicBool::new(false),
            _claim: claim,
        };

        channel
            .socket()
            .connect(&channel.remote_path)
            .map_err(|source| WifiError::Connect {
                path: channel.remote_path.clone(),
                source,
            })?;

        channel.handshake(config.handshake_attempts, config.handshake_deadline)?;

        let timeout = config.request_timeout.filter(|t| !t.is_zero());
        let socket = channel.socket();
        socket.set_read_timeout(timeout)?;
        socket.set_write_timeout(timeout)?;
        drop(socket);

        info!("Connected to {:?}", channel.remote_path);
        Ok(channel)
    }

    /// Probe the daemon with PING until it answers PONG.
    ///
    /// Each attempt waits at most `deadline / attempts` for the send and the
    /// reply, and no attempt starts once `deadline` has elapsed.
    pub fn handshake(&self, attempts: u32, deadline: Duration) -> WifiResult<()> {
        let socket = self.socket();
        let started = Instant::now();
        let per_attempt = (deadline / attempts.max(1)).max(Duration::from_millis(1));
        let mut buf = vec![0u8; self.reply_buffer + 1];

        for attempt in 1..=attempts {
            let remaining = deadline.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(self.broken(attempt - 1));
            }

            let wait = per_attempt.min(remaining);
            socket.set_read_timeout(Some(wait))?;
            socket.set_write_timeout(Some(wait))?;
            match socket.send(PING.as_bytes()) {
                Ok(_) => {}
                Err(e) if is_timeout(&e) => {
                    debug!(attempt, "Daemon queue full, PING not sent");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            match socket.recv(&mut buf) {
                Ok(0) => return Err(self.broken(attempt)),
                Ok(n) if buf[..n].starts_with(PONG) => {
                    debug!(attempt, "Handshake with {:?} complete", self.remote_path);
                    drain(&socket)?;
                    return Ok(());
                }
                Ok(n) => debug!(
                    attempt,
                    "Ignoring unexpected handshake reply {:?}",
                    String::from_utf8_lossy(&buf[..n])
                ),
                Err(e) if is_timeout(&e) => debug!(attempt, "No reply to PING"),
                Err(e) => return Err(e.into()),
            }
        }

        warn!("Handshake with {:?} failed", self.remote_path);
        Err(self.broken(attempts))
    }

    /// Close the socket and remove the client socket file
    pub fn close(self) {
        debug!("Closing control channel {:?}", self.local_path);
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn remote_path(&self) -> &Path {
        &self.remote_path
    }

    fn socket(&self) -> MutexGuard<'_, UnixDatagram> {
        self.socket.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn broken(&self, attempts: u32) -> WifiError {
        WifiError::ConnectionBroken {
            path: self.remote_path.clone(),
            attempts,
        }
    }
}

impl ControlTransport for ControlChannel {
    fn request(&self, command: &str) -> WifiResult<Vec<u8>> {
        // Held across send and recv: the protocol has no request ids
        let socket = self.socket();
        if self.out_of_sync.load(Ordering::Relaxed) {
            return Err(WifiError::OutOfSync {
                path: self.remote_path.clone(),
            });
        }

        // Unsolicited datagrams would otherwise be read as this reply
        drain(&socket)?;

        debug!(command = %loggable(command), "Sending request");
        match socket.send(command.as_bytes()) {
            Ok(_) => {}
            Err(e) if is_timeout(&e) => {
                return Err(WifiError::Timeout {
                    command: command_name(command),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let mut buf = vec![0u8; self.reply_buffer + 1];
        let n = match socket.recv(&mut buf) {
            Ok(n) => n,
            Err(e) if is_timeout(&e) => {
                self.out_of_sync.store(true, Ordering::Relaxed);
                warn!("No reply to {}, channel is out of sync", command_name(command));
                return Err(WifiError::Timeout {
                    command: command_name(command),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if n == 0 {
            return Err(self.broken(1));
        }
        if n > self.reply_buffer {
            return Err(WifiError::ReplyTruncated {
                command: command_name(command),
                limit: self.reply_buffer,
            });
        }

        buf.truncate(n);
        Ok(buf)
    }
}

impl Drop for ControlChannel {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.local_path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!("Failed to remove socket file {:?}: {}", self.local_path, e);
        }
    }
}

/// Registry entry for a bound client path, released on drop
#[derive(Debug)]
struct EndpointClaim {
    path: PathBuf,
}

impl EndpointClaim {
    fn acquire(path: &Path) -> WifiResult<Self> {
        let mut open = OPEN_ENDPOINTS
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !open.insert(path.to_path_buf()) {
            return Err(WifiError::EndpointBusy {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for EndpointClaim {
    fn drop(&mut self) {
        OPEN_ENDPOINTS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.path);
    }
}

/// Reject names that are not valid kernel interface names or would escape
/// the socket directories
pub fn validate_ifname(ifname: &str) -> WifiResult<()> {
    let valid = !ifname.is_empty()
        && ifname.len() <= config::MAX_IFNAME_LEN
        && ifname != "."
        && ifname != ".."
        && !ifname.contains(|c: char| c == '/' || c.is_whitespace() || c.is_control());
    if valid {
        Ok(())
    } else {
        Err(WifiError::InvalidInterfaceName(ifname.to_string()))
    }
}

/// Remove a socket file left behind by an earlier process
fn remove_stale_socket(path: &Path) -> WifiResult<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            debug!("Removing stale socket {:?}", path);
            std::fs::remove_file(path)?;
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Discard replies that arrived after their attempt timed out
fn drain(socket: &UnixDatagram) -> io::Result<()> {
    socket.set_nonblocking(true)?;
    let mut buf = [0u8; 64];
    let result = loop {
        match socket.recv(&mut buf) {
            Ok(_) => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    socket.set_nonblocking(false)?;
    result
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// First token of a command, used as error context
pub(crate) fn command_name(command: &str) -> String {
    command
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Command text safe to write to logs
pub(crate) fn loggable(command: &str) -> Cow<'_, str> {
    match command.find(" psk ") {
        Some(pos) => Cow::Owned(format!("{} psk <redacted>", &command[..pos])),
        None => Cow::Borrowed(command),
    }
}
