use serde::{Deserialize, Serialize};

use crate::set::Set;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(EnvironmentId);
id_type!(TagId);
id_type!(EdgeGroupId);
id_type!(
    /// Environment group. `0` is never stored; in an update it means "leave as is".
    GroupId
);

impl GroupId {
    /// Group every environment lands in until an administrator places it.
    pub const UNASSIGNED: GroupId = GroupId(1);

    pub fn is_unset(&self) -> bool {
        self.0 == 0
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: EnvironmentId,
    pub name: String,
    pub group_id: GroupId,
    /// Attached tags. Order carries no meaning.
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
}

impl Environment {
    pub fn new(id: EnvironmentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            group_id: GroupId::UNASSIGNED,
            tag_ids: Vec::new(),
        }
    }
}

/// A label with a reverse index of the environments wearing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    #[serde(default)]
    pub endpoints: Set<EnvironmentId>,
}

impl Tag {
    pub fn new(id: TagId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            endpoints: Set::new(),
        }
    }
}

/// Membership is held only here; environments never store their edge groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeGroup {
    pub id: EdgeGroupId,
    pub name: String,
    #[serde(default)]
    pub endpoints: Vec<EnvironmentId>,
}

impl EdgeGroup {
    pub fn new(id: EdgeGroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            endpoints: Vec::new(),
        }
    }

    pub fn has_member(&self, environment_id: EnvironmentId) -> bool {
        self.endpoints.contains(&environment_id)
    }

    /// Drop the first occurrence of `environment_id`. Returns false if absent.
    pub fn remove_member(&mut self, environment_id: EnvironmentId) -> bool {
        match self.endpoints.iter().position(|id| *id == environment_id) {
            Some(pos) => {
                self.endpoints.remove(pos);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_transparently() {
        let env = Environment {
            id: EnvironmentId(3),
            name: "edge-01".into(),
            group_id: GroupId(2),
            tag_ids: vec![TagId(1), TagId(4)],
        };
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["group_id"], 2);
        assert_eq!(json["tag_ids"], serde_json::json!([1, 4]));
    }

    #[test]
    fn new_environment_is_unassigned() {
        let env = Environment::new(EnvironmentId(1), "host");
        assert_eq!(env.group_id, GroupId::UNASSIGNED);
        assert!(env.tag_ids.is_empty());
    }

    #[test]
    fn group_zero_is_unset() {
        assert!(GroupId(0).is_unset());
        assert!(!GroupId::UNASSIGNED.is_unset());
    }

    #[test]
    fn remove_member_drops_first_occurrence_only() {
        let mut group = EdgeGroup::new(EdgeGroupId(1), "east");
        group.endpoints = vec![EnvironmentId(5), EnvironmentId(6), EnvironmentId(5)];
        assert!(group.remove_member(EnvironmentId(5)));
        assert_eq!(group.endpoints, vec![EnvironmentId(6), EnvironmentId(5)]);
        assert!(!group.remove_member(EnvironmentId(9)));
    }

    #[test]
    fn tag_without_endpoints_field_deserializes() {
        let tag: Tag = serde_json::from_str(r#"{"id":2,"name":"prod"}"#).unwrap();
        assert!(tag.endpoints.is_empty());
    }
}
