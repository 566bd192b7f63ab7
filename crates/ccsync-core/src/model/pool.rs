// ── Address pools and reservations ──

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use super::site::SitePath;
use crate::error::CoreError;

/// A named top-level address block. Independent of the site tree.
///
/// `cidr` is kept as written; host bits are masked when the request is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalPool {
    pub name: String,
    pub cidr: Ipv4Net,
    #[serde(default)]
    pub gateway: Option<Ipv4Addr>,
    #[serde(default)]
    pub dhcp_servers: Vec<Ipv4Addr>,
    #[serde(default)]
    pub dns_servers: Vec<Ipv4Addr>,
}

impl GlobalPool {
    pub fn new(name: &str, cidr: Ipv4Net) -> Self {
        Self {
            name: name.into(),
            cidr,
            gateway: None,
            dhcp_servers: Vec::new(),
            dns_servers: Vec::new(),
        }
    }
}

/// A sub-prefix of a global pool assigned to one site node.
///
/// Containment in the parent pool is enforced by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReservation {
    pub name: String,
    /// Name of the parent global pool.
    pub pool: String,
    pub site: SitePath,
    pub subnet: Ipv4Addr,
    pub prefix_length: u8,
    /// Defaults to the first host of the subnet.
    #[serde(default)]
    pub gateway: Option<Ipv4Addr>,
    /// Default to the parent pool's servers when absent.
    #[serde(default)]
    pub dhcp_servers: Option<Vec<Ipv4Addr>>,
    #[serde(default)]
    pub dns_servers: Option<Vec<Ipv4Addr>>,
}

impl PoolReservation {
    pub fn new(name: &str, pool: &str, site: &str, prefix: Ipv4Net) -> Self {
        Self {
            name: name.into(),
            pool: pool.into(),
            site: SitePath::new(site),
            subnet: prefix.addr(),
            prefix_length: prefix.prefix_len(),
            gateway: None,
            dhcp_servers: None,
            dns_servers: None,
        }
    }

    pub fn prefix(&self) -> Result<Ipv4Net, CoreError> {
        Ipv4Net::new(self.subnet, self.prefix_length).map_err(|e| CoreError::Validation {
            field: "prefix_length".into(),
            reason: format!("{e}: {}/{}", self.subnet, self.prefix_length),
        })
    }

    pub fn gateway(&self) -> Result<Ipv4Addr, CoreError> {
        if let Some(gw) = self.gateway {
            return Ok(gw);
        }
        let prefix = self.prefix()?;
        // `hosts()` skips the network address except on /31 and /32.
        Ok(prefix.hosts().next().unwrap_or_else(|| prefix.network()))
    }
}
