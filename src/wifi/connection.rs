use crate::error::{WifiError, WifiResult};
use crate::wifi::handle::ControlTransport;
use crate::wifi::session::{
    DISCONNECT, LIST_NETWORKS, NetworkSession, SELECT_NETWORK, split_fields, table_rows,
};
use crate::wifi::types::{ConfiguredNetwork, NetworkProfile};
use tracing::{info, warn};

impl<T: ControlTransport> NetworkSession<T> {
    /// Networks stored in the daemon's configuration
    pub fn list_networks(&self) -> WifiResult<Vec<ConfiguredNetwork>> {
        let reply = self.request_text(LIST_NETWORKS)?;
        parse_network_list(&reply)
    }

    /// Select the configured network whose SSID matches `profile`.
    ///
    /// Returns the selected id, or `None` without sending anything when no
    /// configured network matches.
    pub fn connect(&self, profile: &NetworkProfile) -> WifiResult<Option<u32>> {
        let networks = self.list_networks()?;
        let Some(network) = networks.iter().find(|n| n.ssid == profile.ssid) else {
            warn!("No configured network for {:?}", profile.ssid);
            return Ok(None);
        };

        self.expect_ok(&format!("{SELECT_NETWORK} {}", network.id))?;
        info!(id = network.id, "Selected network {:?}", network.ssid);
        Ok(Some(network.id))
    }

    /// Disconnect from the current network
    pub fn disconnect(&self) -> WifiResult<()> {
        self.expect_ok(DISCONNECT)
    }
}

/// Parse a LIST_NETWORKS reply: `network id \t ssid \t bssid \t flags` rows
pub fn parse_network_list(reply: &str) -> WifiResult<Vec<ConfiguredNetwork>> {
    table_rows(reply)
        .map(|line| -> WifiResult<ConfiguredNetwork> {
            let fields = split_fields(LIST_NETWORKS, line, 4)?;
            let id: u32 = fields[0].parse().map_err(|_| WifiError::InvalidField {
                command: LIST_NETWORKS.to_string(),
                field: "network id",
                value: fields[0].to_string(),
            })?;
            Ok(ConfiguredNetwork {
                id,
                ssid: fields[1].to_string(),
                bssid: fields[2].to_string(),
                flags: fields[3].to_string(),
            })
        })
        .collect()
}
