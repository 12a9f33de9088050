//! Kind-specific normalization helpers.
//!
//! These turn raw source strings into the canonical form stored in the
//! registry, so that change detection compares like with like.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::errors::ReconError;

/// Keep only the digits of a phone number
///
/// ```
/// use netrecon_core::normalize::make_phone;
/// assert_eq!(make_phone("+7 (495) 123-45-67"), "74951234567");
/// ```
pub fn make_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Build a group description from its address and mail
///
/// Each part is emitted only when non-empty; the result is never null.
pub fn make_description(address: &str, mail: &str) -> String {
    let mut out = String::from(address);
    if !mail.is_empty() {
        out.push_str("; Email: ");
        out.push_str(mail);
    }
    out
}

/// Slug of a phone directory group
pub fn make_slug(group_id: &str) -> String {
    format!("grp{}", group_id)
}

/// Description of a guest network interface
pub fn make_vm_iface_description(bridge: &str) -> String {
    if bridge.is_empty() {
        String::new()
    } else {
        format!("Host bridge={}", bridge)
    }
}

/// Description of a Proxmox node device
pub fn make_node_description(role: &str, version: &str, cpus: i64, memory_gib: i64) -> String {
    let product = if role == "PBS" {
        "Proxmox BS"
    } else {
        "Proxmox VE"
    };
    format!(
        "{} {}, cpu={}, mem={} GiB",
        product, version, cpus, memory_gib
    )
}

/// Description of a Proxmox guest
pub fn make_vm_description(vm_type: &str, os_type: &str) -> String {
    format!("VM type={}, OStype={}", vm_type, os_type)
}

fn disk_size_regex() -> Result<&'static Regex, ReconError> {
    static RE: OnceLock<Result<Regex, String>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"size=(\d+)([A-Za-z]*)").map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| ReconError::Internal { message: e.clone() })
}

/// Parse a Proxmox disk configuration string into megabytes
///
/// Units step by 1000, not 1024: `M` x1, `G` x1000, `T` x1000000.
/// A CD-ROM drive counts as zero whatever its size token says.
///
/// # Errors
///
/// Returns `InvalidDiskConf` when there is no size token or the unit is
/// not one of `M`, `G`, `T`.
pub fn parse_disk_conf(conf: &str) -> Result<i64, ReconError> {
    if conf.contains("media=cdrom") {
        return Ok(0);
    }
    let caps = disk_size_regex()?
        .captures(conf)
        .ok_or_else(|| ReconError::InvalidDiskConf {
            conf: conf.to_string(),
            reason: "no size token".to_string(),
        })?;
    let size: i64 = caps[1].parse().map_err(|_| ReconError::InvalidDiskConf {
        conf: conf.to_string(),
        reason: format!("size '{}' out of range", &caps[1]),
    })?;
    let multiplier = match &caps[2] {
        "M" => 1,
        "G" => 1_000,
        "T" => 1_000_000,
        other => {
            return Err(ReconError::InvalidDiskConf {
                conf: conf.to_string(),
                reason: format!("unsupported unit '{}'", other),
            })
        }
    };
    size.checked_mul(multiplier)
        .ok_or_else(|| ReconError::InvalidDiskConf {
            conf: conf.to_string(),
            reason: "size overflows".to_string(),
        })
}

const DISK_FAMILIES: [&str; 4] = ["scsi", "mp", "sata", "ide"];

/// Total disk size of a guest configuration in megabytes
///
/// Counts `rootfs` plus each of the `scsiN`, `mpN`, `sataN`, `ideN`
/// families, starting at index 0 and stopping at the first gap.
///
/// # Errors
///
/// Propagates the first `parse_disk_conf` failure.
pub fn calc_disks(config: &BTreeMap<String, String>) -> Result<i64, ReconError> {
    let mut total = 0;
    if let Some(rootfs) = config.get("rootfs") {
        total += parse_disk_conf(rootfs)?;
    }
    for family in DISK_FAMILIES {
        let mut index = 0;
        while let Some(conf) = config.get(&format!("{}{}", family, index)) {
            total += parse_disk_conf(conf)?;
            index += 1;
        }
    }
    Ok(total)
}

/// NIC models whose key carries the MAC address (`virtio=AA:BB:...`)
const MAC_KEYS: [&str; 6] = ["hwaddr", "virtio", "e1000", "e1000e", "rtl8139", "vmxnet3"];

/// Parsed Proxmox guest network device string
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetConfig {
    pub mac: Option<String>,
    pub name: Option<String>,
    pub mtu: Option<i64>,
    pub enabled: bool,
    pub bridge: String,
    /// Static IPv4 with mask; `dhcp` and `manual` yield `None`
    pub ip: Option<String>,
}

/// Parse a `key=value,...` guest network device string
///
/// ```
/// use netrecon_core::normalize::parse_net_config;
/// let net = parse_net_config("virtio=BC:24:11:2E:51:0A,bridge=vmbr0,firewall=1").unwrap();
/// assert_eq!(net.mac.as_deref(), Some("BC:24:11:2E:51:0A"));
/// assert_eq!(net.bridge, "vmbr0");
/// assert!(net.enabled);
/// ```
///
/// # Errors
///
/// Returns `InvalidNetConf` when an item has no `=` or the MTU is not a number.
pub fn parse_net_config(conf: &str) -> Result<NetConfig, ReconError> {
    let mut pairs = BTreeMap::new();
    for item in conf.split(',').filter(|s| !s.is_empty()) {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| ReconError::InvalidNetConf {
                conf: conf.to_string(),
            })?;
        pairs.insert(key.trim(), value.trim());
    }

    // Last matching key wins, in MAC_KEYS order.
    let mac = MAC_KEYS
        .iter()
        .filter_map(|k| pairs.get(k))
        .last()
        .map(|v| v.to_string());
    let mtu = match pairs.get("mtu") {
        Some(v) => Some(v.parse::<i64>().map_err(|_| ReconError::InvalidNetConf {
            conf: conf.to_string(),
        })?),
        None => None,
    };
    let enabled = !matches!(pairs.get("link_down"), Some(v) if *v != "0");
    let ip = pairs
        .get("ip")
        .filter(|v| v.contains('/'))
        .map(|v| v.to_string());

    Ok(NetConfig {
        mac,
        name: pairs.get("name").map(|v| v.to_string()),
        mtu,
        enabled,
        bridge: pairs.get("bridge").map(|v| v.to_string()).unwrap_or_default(),
        ip,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_description_parts() {
        assert_eq!(make_description("Main st. 1", "a@b.c"), "Main st. 1; Email: a@b.c");
        assert_eq!(make_description("Main st. 1", ""), "Main st. 1");
        assert_eq!(make_description("", "a@b.c"), "; Email: a@b.c");
        assert_eq!(make_description("", ""), "");
    }

    #[test]
    fn test_make_slug() {
        assert_eq!(make_slug("831"), "grp831");
    }

    #[test]
    fn test_vm_iface_description() {
        assert_eq!(make_vm_iface_description("vmbr0"), "Host bridge=vmbr0");
        assert_eq!(make_vm_iface_description(""), "");
    }

    #[test]
    fn test_node_description() {
        assert_eq!(
            make_node_description("PVE", "8.1.4", 16, 62),
            "Proxmox VE 8.1.4, cpu=16, mem=62 GiB"
        );
        assert_eq!(
            make_node_description("PBS", "3.1", 4, 8),
            "Proxmox BS 3.1, cpu=4, mem=8 GiB"
        );
    }

    #[test]
    fn test_net_config_link_down_and_ip() {
        let net =
            parse_net_config("name=eth0,hwaddr=AA:BB:CC:DD:EE:FF,ip=10.0.0.9/24,link_down=1,mtu=9000")
                .unwrap();
        assert_eq!(net.name.as_deref(), Some("eth0"));
        assert_eq!(net.ip.as_deref(), Some("10.0.0.9/24"));
        assert_eq!(net.mtu, Some(9000));
        assert!(!net.enabled);
    }

    #[test]
    fn test_net_config_dhcp_has_no_ip() {
        let net = parse_net_config("name=eth0,ip=dhcp").unwrap();
        assert_eq!(net.ip, None);
    }

    #[test]
    fn test_net_config_rejects_bare_item() {
        assert!(matches!(
            parse_net_config("virtio,bridge=vmbr0"),
            Err(ReconError::InvalidNetConf { .. })
        ));
    }
}
