//! Data model: registry entities, field values and typed observation records.

pub mod entity;
pub mod kind;
pub mod observation;
pub mod value;

pub use entity::{EntityDraft, EntityId, RegistryEntity};
pub use kind::EntityKind;
pub use observation::{
    ClusterRecord, ContactRecord, DeviceRecord, GroupRecord, InterfaceRecord, IpAddressRecord,
    IpAssignmentRecord, Observation, VmInterfaceRecord, VmRecord, VmType, scoped_key,
};
pub use value::FieldValue;
