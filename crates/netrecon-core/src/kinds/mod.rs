//! Kind profiles for the three sources: phone directory, subnet scan and
//! Proxmox cluster.

pub mod directory;
pub mod ip;
pub mod proxmox;

pub use directory::{ContactGroupProfile, ContactProfile};
pub use ip::IpScanProfile;
pub use proxmox::{
    ClusterProfile, DeviceProfile, InterfaceProfile, IpAssignmentProfile, PrimaryIp,
    PrimaryIpProfile, VmInterfaceProfile, VmProfile,
};

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_OFFLINE: &str = "offline";
