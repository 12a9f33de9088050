//! Phone directory payload: `{"str": [departments], "ppl": [people]}`.

#![allow(clippy::result_large_err)]

use std::collections::{BTreeMap, BTreeSet};

use netrecon_core::errors::ExError;
use netrecon_core::model::{ContactRecord, GroupRecord};
use serde::Deserialize;

use super::{loose_id, Snapshot};

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(rename = "str", default)]
    departments: Vec<Department>,
    #[serde(rename = "ppl", default)]
    people: Vec<Person>,
}

#[derive(Debug, Deserialize)]
struct Department {
    #[serde(with = "loose_id")]
    str_id: String,
    #[serde(default)]
    str_name: String,
    #[serde(default, with = "loose_id")]
    str_parent: String,
    #[serde(default)]
    adres: Option<String>,
    #[serde(default)]
    mail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Person {
    #[serde(default, with = "loose_id")]
    str_id: String,
    #[serde(with = "loose_id")]
    ppl_id: String,
    #[serde(default)]
    ppl_fio: Option<String>,
    #[serde(default)]
    dlg_name: Option<String>,
    #[serde(default, with = "loose_id")]
    ppl_tel: String,
    #[serde(default, with = "loose_id")]
    ppl_cab: String,
}

/// Records of one directory snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneDirectory {
    pub groups: Vec<GroupRecord>,
    pub contacts: Vec<ContactRecord>,
    /// Positions without a person, dropped
    pub vacancies: usize,
}

/// `0` and empty both mean "no parent department"
fn parent_ref(raw: &str) -> Option<String> {
    match raw.trim() {
        "" | "0" => None,
        id => Some(id.to_string()),
    }
}

/// Stable reorder so that a department comes after its parent
///
/// Depth counts known ancestors; a parent outside the snapshot or a cycle
/// stops the count.
fn parents_first(groups: Vec<GroupRecord>) -> Vec<GroupRecord> {
    let depths: Vec<usize> = {
        let known: BTreeSet<&str> = groups.iter().map(|g| g.id.as_str()).collect();
        let parent_of: BTreeMap<&str, &str> = groups
            .iter()
            .filter_map(|g| g.parent_id.as_deref().map(|p| (g.id.as_str(), p)))
            .collect();
        groups
            .iter()
            .map(|g| {
                let mut depth = 0;
                let mut current = g.id.as_str();
                while let Some(parent) = parent_of.get(current) {
                    if !known.contains(parent) || depth > known.len() {
                        break;
                    }
                    depth += 1;
                    current = parent;
                }
                depth
            })
            .collect()
    };
    let mut keyed: Vec<(usize, GroupRecord)> = depths.into_iter().zip(groups).collect();
    keyed.sort_by_key(|(depth, _)| *depth);
    keyed.into_iter().map(|(_, group)| group).collect()
}

impl PhoneDirectory {
    /// # Errors
    ///
    /// `InvalidInput` when the payload has the wrong shape, an id is empty
    /// or an id occurs twice.
    pub fn parse(snapshot: &Snapshot) -> Result<Self, ExError> {
        let payload: Payload = snapshot.decode()?;
        let mut directory = PhoneDirectory::default();

        let mut seen = BTreeSet::new();
        for dept in payload.departments {
            if dept.str_id.is_empty() {
                return Err(snapshot.invalid(format!("department '{}' has no str_id", dept.str_name)));
            }
            if !seen.insert(dept.str_id.clone()) {
                return Err(snapshot.invalid(format!("duplicate str_id {}", dept.str_id)));
            }
            directory.groups.push(GroupRecord {
                parent_id: parent_ref(&dept.str_parent),
                id: dept.str_id,
                name: dept.str_name.trim().to_string(),
                address: dept.adres.unwrap_or_default(),
                mail: dept.mail.unwrap_or_default(),
            });
        }

        directory.groups = parents_first(directory.groups);

        let mut seen = BTreeSet::new();
        for person in payload.people {
            let name = person.ppl_fio.as_deref().unwrap_or("").trim().to_string();
            if name.is_empty() {
                directory.vacancies += 1;
                continue;
            }
            if person.ppl_id.is_empty() {
                return Err(snapshot.invalid(format!("person '{}' has no ppl_id", name)));
            }
            if !seen.insert(person.ppl_id.clone()) {
                return Err(snapshot.invalid(format!("duplicate ppl_id {}", person.ppl_id)));
            }
            directory.contacts.push(ContactRecord {
                id: person.ppl_id,
                name,
                title: person.dlg_name.unwrap_or_default(),
                group_id: parent_ref(&person.str_id),
                phone: person.ppl_tel,
                room: person.ppl_cab,
            });
        }

        tracing::debug!(
            component = module_path!(),
            groups = directory.groups.len(),
            contacts = directory.contacts.len(),
            vacancies = directory.vacancies,
            "phone directory parsed"
        );
        Ok(directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netrecon_core::errors::ExErrorKind;

    fn snapshot(json: &str) -> Snapshot {
        Snapshot::from_bytes("directory", json.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_groups_and_people() {
        let snap = snapshot(
            r#"{
                "str": [
                    {"str_id": "831", "str_name": "Dept A", "str_parent": "0", "adres": "Main st. 1", "mail": "a@corp"},
                    {"str_id": 832, "str_name": "Unit B", "str_parent": "831", "adres": null, "mail": ""}
                ],
                "ppl": [
                    {"str_id": "832", "ppl_id": "3455", "ppl_fio": "Jane Doe", "dlg_name": "Engineer", "ppl_tel": ":598332", "ppl_cab": "407"},
                    {"str_id": "832", "ppl_id": "3456", "ppl_fio": "", "dlg_name": "Engineer", "ppl_tel": "", "ppl_cab": ""}
                ]
            }"#,
        );
        let dir = PhoneDirectory::parse(&snap).unwrap();

        assert_eq!(dir.groups.len(), 2);
        assert_eq!(dir.groups[0].parent_id, None);
        assert_eq!(dir.groups[1].id, "832");
        assert_eq!(dir.groups[1].parent_id.as_deref(), Some("831"));
        assert_eq!(dir.groups[1].address, "");

        assert_eq!(dir.contacts.len(), 1);
        assert_eq!(dir.contacts[0].group_id.as_deref(), Some("832"));
        assert_eq!(dir.contacts[0].phone, ":598332");
        assert_eq!(dir.vacancies, 1);
    }

    #[test]
    fn test_children_follow_their_parents() {
        let snap = snapshot(
            r#"{"str": [
                {"str_id": "3", "str_name": "Leaf", "str_parent": "2"},
                {"str_id": "2", "str_name": "Mid", "str_parent": "1"},
                {"str_id": "9", "str_name": "Orphan", "str_parent": "77"},
                {"str_id": "1", "str_name": "Root", "str_parent": "0"}
            ]}"#,
        );
        let dir = PhoneDirectory::parse(&snap).unwrap();
        let ids: Vec<&str> = dir.groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["9", "1", "2", "3"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let snap = snapshot(
            r#"{"str": [{"str_id": "1", "str_name": "A"}, {"str_id": "1", "str_name": "B"}], "ppl": []}"#,
        );
        let err = PhoneDirectory::parse(&snap).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }

    #[test]
    fn test_wrong_shape_rejected() {
        let snap = snapshot(r#"{"str": "nope"}"#);
        assert!(PhoneDirectory::parse(&snap).is_err());
    }
}
