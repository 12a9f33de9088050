//! Subnet scan: live hosts become IP address entities.

use crate::diff::{FieldRule, FieldTarget};
use crate::matcher::NameFallback;
use crate::model::{EntityKind, FieldValue, IpAddressRecord, RegistryEntity};
use crate::profile::{KindProfile, RetirePolicy};

/// Addresses found by a subnet scan
///
/// Addresses are never retired: a host that is down during one scan is
/// simply not seen.
#[derive(Debug, Clone)]
pub struct IpScanProfile {
    script_name: String,
}

impl IpScanProfile {
    pub fn new(script_name: impl Into<String>) -> Self {
        Self {
            script_name: script_name.into(),
        }
    }
}

impl KindProfile for IpScanProfile {
    type Record = IpAddressRecord;

    fn kind(&self) -> EntityKind {
        EntityKind::IpAddress
    }

    fn field_rules(&self, record: &IpAddressRecord) -> Vec<FieldRule> {
        let dns_name = record.dns_name.to_lowercase();
        vec![
            FieldRule::set(FieldTarget::Name, record.address.as_str()),
            FieldRule::set(FieldTarget::field("dns_name"), FieldValue::opt_text(Some(&dns_name)))
                .preserve()
                .ignore_case(),
            FieldRule::set(FieldTarget::field("status"), super::STATUS_ACTIVE).create_only(),
            FieldRule::set(
                FieldTarget::field("description"),
                format!("Automatically added by script {}", self.script_name),
            )
            .create_only(),
        ]
    }

    fn retire_policy(&self) -> RetirePolicy {
        RetirePolicy::Keep
    }

    /// Nothing is retired and names never match, so pass 1 has nothing to do
    fn owns(&self, _entity: &RegistryEntity) -> bool {
        false
    }

    fn name_fallback(&self) -> NameFallback {
        NameFallback::Disabled
    }

    fn adopts_untracked(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{Policy, ValueSource};

    #[test]
    fn test_dns_name_lowercased_and_preserved() {
        let profile = IpScanProfile::new("ipscan");
        let record = IpAddressRecord {
            address: "10.0.0.5/24".to_string(),
            dns_name: "Host.Example".to_string(),
            subnet: "10.0.0.0/24".to_string(),
        };
        let rules = profile.field_rules(&record);
        assert_eq!(rules[1].source, ValueSource::Literal(FieldValue::text("host.example")));
        assert_eq!(rules[1].policy, Policy::PreserveWhenAbsent);
        assert_eq!(
            rules[3].source,
            ValueSource::Literal(FieldValue::text("Automatically added by script ipscan"))
        );
    }

    #[test]
    fn test_empty_dns_name_is_null() {
        let profile = IpScanProfile::new("ipscan");
        let record = IpAddressRecord {
            address: "10.0.0.6/24".to_string(),
            dns_name: String::new(),
            subnet: "10.0.0.0/24".to_string(),
        };
        assert_eq!(
            profile.field_rules(&record)[1].source,
            ValueSource::Literal(FieldValue::Null)
        );
    }
}
