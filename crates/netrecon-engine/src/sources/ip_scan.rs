//! Subnet scan payload: live hosts per subnet.
//!
//! `{"subnets": [{"prefix": "10.0.0.0/24", "status": "active", "tags": [..],
//! "hosts": [{"address": "10.0.0.5", "hostname": ".."}]}]}`

#![allow(clippy::result_large_err)]

use std::collections::BTreeSet;
use std::net::IpAddr;

use netrecon_core::errors::ExError;
use netrecon_core::kinds::STATUS_ACTIVE;
use netrecon_core::model::IpAddressRecord;
use serde::Deserialize;

use super::Snapshot;

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    subnets: Vec<Subnet>,
}

#[derive(Debug, Deserialize)]
struct Subnet {
    prefix: String,
    #[serde(default = "default_status")]
    status: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    hosts: Vec<Host>,
}

fn default_status() -> String {
    STATUS_ACTIVE.to_string()
}

#[derive(Debug, Deserialize)]
struct Host {
    address: String,
    #[serde(default)]
    hostname: Option<String>,
}

/// Live hosts of one scanned subnet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetBatch {
    pub prefix: String,
    pub records: Vec<IpAddressRecord>,
}

/// Scan results, one batch per selected subnet in payload order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpScan {
    pub batches: Vec<SubnetBatch>,
    /// Subnets left out by the status or tag filter
    pub skipped: Vec<String>,
}

impl IpScan {
    pub fn record_count(&self) -> usize {
        self.batches.iter().map(|b| b.records.len()).sum()
    }

    /// Parse a scan, keeping active subnets that carry `tag` when one is given
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the payload has the wrong shape or a prefix or
    /// host address does not parse.
    pub fn parse(snapshot: &Snapshot, tag: Option<&str>) -> Result<Self, ExError> {
        let payload: Payload = snapshot.decode()?;
        let mut scan = IpScan::default();
        // A host seen in two overlapping subnets keeps its first mask.
        let mut seen: BTreeSet<IpAddr> = BTreeSet::new();

        for subnet in payload.subnets {
            let mask = subnet_mask(&subnet.prefix).ok_or_else(|| {
                snapshot.invalid(format!("subnet prefix '{}' does not parse", subnet.prefix))
            })?;
            let tagged = match tag {
                Some(t) => subnet.tags.iter().any(|s| s == t),
                None => true,
            };
            if subnet.status != STATUS_ACTIVE || !tagged {
                scan.skipped.push(subnet.prefix);
                continue;
            }

            let mut records = Vec::with_capacity(subnet.hosts.len());
            for host in subnet.hosts {
                let bare = host.address.split('/').next().unwrap_or("").trim();
                let ip: IpAddr = bare.parse().map_err(|_| {
                    snapshot.invalid(format!("host address '{}' does not parse", host.address))
                })?;
                if !seen.insert(ip) {
                    tracing::warn!(
                        component = module_path!(),
                        address = %ip,
                        subnet = %subnet.prefix,
                        "host already seen in an earlier subnet, skipped"
                    );
                    continue;
                }
                records.push(IpAddressRecord {
                    address: format!("{}/{}", ip, mask),
                    dns_name: host.hostname.unwrap_or_default().trim().to_string(),
                    subnet: subnet.prefix.clone(),
                });
            }
            scan.batches.push(SubnetBatch {
                prefix: subnet.prefix,
                records,
            });
        }

        tracing::debug!(
            component = module_path!(),
            subnets = scan.batches.len(),
            skipped = scan.skipped.len(),
            hosts = scan.record_count(),
            "ip scan parsed"
        );
        Ok(scan)
    }
}

/// Mask length of a `network/len` prefix
fn subnet_mask(prefix: &str) -> Option<u8> {
    let (network, len) = prefix.split_once('/')?;
    let network: IpAddr = network.trim().parse().ok()?;
    let len: u8 = len.trim().parse().ok()?;
    let max = if network.is_ipv4() { 32 } else { 128 };
    (len <= max).then_some(len)
}
