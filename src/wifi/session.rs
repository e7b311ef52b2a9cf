use crate::config::ControlConfig;
use crate::error::{WifiError, WifiResult};
use crate::wifi::handle::{ControlChannel, ControlTransport, command_name};
use std::time::Duration;

// Control interface command vocabulary
pub(crate) const SCAN: &str = "SCAN";
pub(crate) const SCAN_RESULTS: &str = "SCAN_RESULTS";
pub(crate) const ADD_NETWORK: &str = "ADD_NETWORK";
pub(crate) const SET_NETWORK: &str = "SET_NETWORK";
pub(crate) const SELECT_NETWORK: &str = "SELECT_NETWORK";
pub(crate) const LIST_NETWORKS: &str = "LIST_NETWORKS";
pub(crate) const DISCONNECT: &str = "DISCONNECT";
pub(crate) const REMOVE_NETWORK: &str = "REMOVE_NETWORK";

/// High-level wpa_supplicant operations over a control transport.
///
/// The operations themselves live next to their parsers in `scanning`,
/// `connection` and `profile`.
#[derive(Debug)]
pub struct NetworkSession<T> {
    transport: T,
    scan_delay: Duration,
}

impl NetworkSession<ControlChannel> {
    /// Open a control channel for `ifname` and wrap it in a session
    pub fn open(ifname: &str, config: &ControlConfig) -> WifiResult<Self> {
        let channel = ControlChannel::open(ifname, config)?;
        Ok(Self::new(channel, config.scan_delay))
    }

    /// Close the underlying channel
    pub fn close(self) {
        self.transport.close();
    }
}

impl<T: ControlTransport> NetworkSession<T> {
    pub fn new(transport: T, scan_delay: Duration) -> Self {
        Self {
            transport,
            scan_delay,
        }
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn scan_delay(&self) -> Duration {
        self.scan_delay
    }

    pub(crate) fn request_text(&self, command: &str) -> WifiResult<String> {
        self.transport.request_text(command)
    }

    /// Send a command whose only valid reply is `OK`
    pub(crate) fn expect_ok(&self, command: &str) -> WifiResult<()> {
        let reply = self.request_text(command)?;
        ensure_reply(command, &reply, &["OK"])
    }
}

/// Fail with `CommandFailed` unless the trimmed reply is one of `accepted`
pub(crate) fn ensure_reply(command: &str, reply: &str, accepted: &[&str]) -> WifiResult<()> {
    let reply = reply.trim();
    if accepted.contains(&reply) {
        Ok(())
    } else {
        Err(WifiError::CommandFailed {
            command: command_name(command),
            reply: reply.to_string(),
        })
    }
}

/// Data rows of a tabular reply: the trailing newline is stripped and the
/// header line dropped
pub(crate) fn table_rows(reply: &str) -> impl Iterator<Item = &str> {
    reply
        .strip_suffix('\n')
        .unwrap_or(reply)
        .split('\n')
        .skip(1)
}

/// Split a row into exactly `expected` tab-separated fields
pub(crate) fn split_fields<'a>(
    command: &str,
    line: &'a str,
    expected: usize,
) -> WifiResult<Vec<&'a str>> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != expected {
        return Err(WifiError::FieldCount {
            command: command.to_string(),
            line: line.to_string(),
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;

    /// In-memory transport answering from a closure and recording commands
    pub struct ScriptedTransport {
        reply: Box<dyn Fn(&str) -> String>,
        sent: RefCell<Vec<String>>,
    }

    impl ScriptedTransport {
        pub fn new(reply: impl Fn(&str) -> String + 'static) -> Self {
            Self {
                reply: Box::new(reply),
                sent: RefCell::new(Vec::new()),
            }
        }

        pub fn sent(&self) -> Vec<String> {
            self.sent.borrow().clone()
        }
    }

    impl ControlTransport for ScriptedTransport {
        fn request(&self, command: &str) -> WifiResult<Vec<u8>> {
            self.sent.borrow_mut().push(command.to_string());
            Ok((self.reply)(command).into_bytes())
        }
    }

    pub fn session(reply: impl Fn(&str) -> String + 'static) -> NetworkSession<ScriptedTransport> {
        NetworkSession::new(ScriptedTransport::new(reply), Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rows_skip_header_and_trailing_newline() {
        let rows: Vec<_> = table_rows("network id / ssid / bssid / flags\n0\tHome\tany\t\n").collect();
        assert_eq!(rows, vec!["0\tHome\tany\t"]);

        assert_eq!(table_rows("network id / ssid / bssid / flags\n").count(), 0);
        assert_eq!(table_rows("").count(), 0);
    }

    #[test]
    fn split_fields_checks_count() {
        assert_eq!(split_fields("X", "a\tb", 2).unwrap(), vec!["a", "b"]);
        match split_fields("X", "a\tb", 3) {
            Err(WifiError::FieldCount {
                expected, found, ..
            }) => {
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("expected FieldCount, got {other:?}"),
        }
    }

    #[test]
    fn expect_ok_reports_daemon_failure() {
        let session = testing::session(|_| "FAIL\n".to_string());
        match session.expect_ok("DISCONNECT") {
            Err(WifiError::CommandFailed { command, reply }) => {
                assert_eq!(command, "DISCONNECT");
                assert_eq!(reply, "FAIL");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }
}
