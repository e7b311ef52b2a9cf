use crate::error::{WifiError, WifiResult};
use crate::wifi::handle::ControlTransport;
use crate::wifi::session::{ADD_NETWORK, NetworkSession, REMOVE_NETWORK, SET_NETWORK};
use crate::wifi::types::NetworkProfile;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

/// `key_mgmt` value for networks without a recognised scheme
const KEY_MGMT_NONE: &str = "NONE";

/// Settings written to the daemon for one profile, validated up front
struct NetworkSettings<'a> {
    key_mgmt: &'static str,
    proto: Option<&'static str>,
    psk: Option<&'a SecretString>,
}

impl<'a> NetworkSettings<'a> {
    fn for_profile(profile: &'a NetworkProfile) -> WifiResult<Self> {
        let Some(akm) = profile.preferred_key_mgmt() else {
            return Ok(Self {
                key_mgmt: KEY_MGMT_NONE,
                proto: None,
                psk: None,
            });
        };

        let (key_mgmt, proto) = akm.network_settings();
        let psk = if akm.is_psk() {
            match profile.password() {
                Some(password) if !password.expose_secret().is_empty() => Some(password),
                _ => {
                    return Err(WifiError::MissingPassword {
                        ssid: profile.ssid.clone(),
                    });
                }
            }
        } else {
            None
        };

        Ok(Self {
            key_mgmt,
            proto,
            psk,
        })
    }
}

impl<T: ControlTransport> NetworkSession<T> {
    /// Add `profile` to the daemon's configuration and return its new id.
    ///
    /// Each field is set with its own SET_NETWORK; if one is rejected the
    /// network stays on the daemon and `PartialConfiguration` names the field.
    pub fn add_profile(&self, profile: &NetworkProfile) -> WifiResult<u32> {
        let settings = NetworkSettings::for_profile(profile)?;

        let reply = self.request_text(ADD_NETWORK)?;
        let id: u32 = reply.trim().parse().map_err(|_| WifiError::CommandFailed {
            command: ADD_NETWORK.to_string(),
            reply: reply.trim().to_string(),
        })?;

        self.set_network(id, "ssid", &format!("\"{}\"", profile.ssid))?;
        self.set_network(id, "key_mgmt", settings.key_mgmt)?;
        if let Some(proto) = settings.proto {
            self.set_network(id, "proto", proto)?;
        }
        if let Some(psk) = settings.psk {
            self.set_network(id, "psk", &format!("\"{}\"", psk.expose_secret()))?;
        }

        info!(id, "Added network {:?}", profile.ssid);
        Ok(id)
    }

    /// Remove a configured network, failing if the daemon does not know `id`
    pub fn remove_profile(&self, id: u32) -> WifiResult<()> {
        if !self.list_networks()?.iter().any(|n| n.id == id) {
            return Err(WifiError::UnknownNetworkId(id));
        }

        self.expect_ok(&format!("{REMOVE_NETWORK} {id}"))?;
        info!(id, "Removed network");
        Ok(())
    }

    fn set_network(&self, id: u32, field: &'static str, value: &str) -> WifiResult<()> {
        self.expect_ok(&format!("{SET_NETWORK} {id} {field} {value}"))
            .map_err(|source| {
                warn!(id, field, "Network left partially configured");
                WifiError::PartialConfiguration {
                    id,
                    field,
                    source: Box::new(source),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wifi::session::testing;
    use crate::wifi::types::KeyMgmt;

    fn profile(ssid: &str, akm: &[KeyMgmt], password: Option<&str>) -> NetworkProfile {
        let mut profile = NetworkProfile::new(ssid);
        profile.akm.extend(akm.iter().copied());
        if let Some(password) = password {
            profile.set_password(SecretString::from(password.to_string()));
        }
        profile
    }

    fn daemon(command: &str) -> String {
        if command == "ADD_NETWORK" {
            "3\n".to_string()
        } else {
            "OK\n".to_string()
        }
    }

    #[test]
    fn psk_profile_sets_key_mgmt_proto_and_password() {
        let session = testing::session(daemon);
        let home = profile("Home", &[KeyMgmt::Wpa2Psk], Some("correct horse"));

        assert_eq!(session.add_profile(&home).unwrap(), 3);
        assert_eq!(
            session.transport().sent(),
            vec![
                "ADD_NETWORK",
                "SET_NETWORK 3 ssid \"Home\"",
                "SET_NETWORK 3 key_mgmt WPA-PSK",
                "SET_NETWORK 3 proto WPA",
                "SET_NETWORK 3 psk \"correct horse\"",
            ]
        );
    }

    #[test]
    fn eap_profile_sends_no_psk() {
        let session = testing::session(daemon);
        let corp = profile("Corp", &[KeyMgmt::Wpa2Eap], None);

        session.add_profile(&corp).unwrap();
        assert_eq!(
            session.transport().sent(),
            vec![
                "ADD_NETWORK",
                "SET_NETWORK 3 ssid \"Corp\"",
                "SET_NETWORK 3 key_mgmt WPA-EAP",
                "SET_NETWORK 3 proto RSN",
            ]
        );
    }

    #[test]
    fn open_profile_uses_none_without_proto() {
        let session = testing::session(daemon);
        session.add_profile(&profile("Guest", &[], None)).unwrap();
        assert_eq!(
            session.transport().sent(),
            vec![
                "ADD_NETWORK",
                "SET_NETWORK 3 ssid \"Guest\"",
                "SET_NETWORK 3 key_mgmt NONE",
            ]
        );
    }

    #[test]
    fn greatest_scheme_decides_settings() {
        let session = testing::session(daemon);
        let mixed = profile("Mixed", &[KeyMgmt::Wpa2Eap, KeyMgmt::WpaPsk], None);

        session.add_profile(&mixed).unwrap();
        assert!(
            session
                .transport()
                .sent()
                .contains(&"SET_NETWORK 3 key_mgmt WPA-EAP".to_string())
        );
    }

    #[test]
    fn psk_without_password_is_rejected_before_sending() {
        let session = testing::session(daemon);

        for password in [None, Some("")] {
            let home = profile("Home", &[KeyMgmt::WpaPsk], password);
            assert!(matches!(
                session.add_profile(&home),
                Err(WifiError::MissingPassword { .. })
            ));
        }
        assert!(session.transport().sent().is_empty());
    }

    #[test]
    fn rejected_step_reports_partial_configuration() {
        let session = testing::session(|command| {
            if command == "ADD_NETWORK" {
                "7\n".to_string()
            } else if command.contains("proto") {
                "FAIL\n".to_string()
            } else {
                "OK\n".to_string()
            }
        });
        let home = profile("Home", &[KeyMgmt::WpaPsk], Some("secretpass"));

        match session.add_profile(&home) {
            Err(WifiError::PartialConfiguration { id, field, source }) => {
                assert_eq!(id, 7);
                assert_eq!(field, "proto");
                assert!(matches!(*source, WifiError::CommandFailed { .. }));
            }
            other => panic!("expected PartialConfiguration, got {other:?}"),
        }
        // Nothing is sent after the failing step
        assert_eq!(session.transport().sent().len(), 4);
    }

    #[test]
    fn add_network_failure_is_reported() {
        let session = testing::session(|_| "FAIL\n".to_string());
        assert!(matches!(
            session.add_profile(&profile("Guest", &[], None)),
            Err(WifiError::CommandFailed { .. })
        ));
    }

    #[test]
    fn remove_known_network() {
        let session = testing::session(|command| match command {
            "LIST_NETWORKS" => "network id / ssid / bssid / flags\n2\tHome\tany\t\n".to_string(),
            _ => "OK\n".to_string(),
        });

        session.remove_profile(2).unwrap();
        assert_eq!(
            session.transport().sent(),
            vec!["LIST_NETWORKS", "REMOVE_NETWORK 2"]
        );
    }

    #[test]
    fn remove_unknown_network_sends_no_remove() {
        let session = testing::session(|_| "network id / ssid / bssid / flags\n".to_string());

        assert!(matches!(
            session.remove_profile(9),
            Err(WifiError::UnknownNetworkId(9))
        ));
        assert_eq!(session.transport().sent(), vec!["LIST_NETWORKS"]);
    }
}
