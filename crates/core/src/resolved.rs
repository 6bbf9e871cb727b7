//! Fully resolved schema: every reference replaced by a concrete type, every
//! name fully qualified, common types inlined away.
//!
//! Values here share nothing with the syntax tree they were resolved from.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A fully qualified, `::`-joined entity type name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Name(pub String);

impl Name {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name(s.to_owned())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An entity identity: type plus id, displayed as `Type::"id"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntityUid {
    #[serde(rename = "type")]
    pub ty: Name,
    pub id: String,
}

impl EntityUid {
    pub fn new(ty: &str, id: &str) -> Self {
        EntityUid {
            ty: Name::from(ty),
            id: id.to_owned(),
        }
    }
}

impl fmt::Display for EntityUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.ty, crate::lexer::quote(&self.id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionType {
    Ipaddr,
    Decimal,
    Datetime,
    Duration,
}

impl ExtensionType {
    pub fn name(self) -> &'static str {
        match self {
            ExtensionType::Ipaddr => "ipaddr",
            ExtensionType::Decimal => "decimal",
            ExtensionType::Datetime => "datetime",
            ExtensionType::Duration => "duration",
        }
    }
}

/// A concrete type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Type {
    Bool,
    Long,
    String,
    Extension { name: ExtensionType },
    Set { element: Box<Type> },
    Record(RecordType),
    Entity { name: Name },
}

impl Type {
    pub fn set(element: Type) -> Self {
        Type::Set {
            element: Box::new(element),
        }
    }

    pub fn entity(name: &str) -> Self {
        Type::Entity {
            name: Name::from(name),
        }
    }

    pub fn extension(name: ExtensionType) -> Self {
        Type::Extension { name }
    }

    /// Short human description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Type::Bool => "Bool".to_owned(),
            Type::Long => "Long".to_owned(),
            Type::String => "String".to_owned(),
            Type::Extension { name } => name.name().to_owned(),
            Type::Set { element } => format!("Set<{}>", element.describe()),
            Type::Record(_) => "record".to_owned(),
            Type::Entity { name } => format!("entity type {}", name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordType {
    pub attributes: BTreeMap<String, Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub ty: Type,
    pub required: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEntity {
    pub name: Name,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    pub member_of: Vec<Name>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<RecordType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEnum {
    pub name: Name,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    pub values: Vec<String>,
}

impl ResolvedEnum {
    /// The enum's valid identities, in declaration order. Each call starts a
    /// fresh iteration.
    pub fn entity_uids(&self) -> impl Iterator<Item = EntityUid> + '_ {
        self.values.iter().map(move |v| EntityUid {
            ty: self.name.clone(),
            id: v.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliesTo {
    pub principals: Vec<Name>,
    pub resources: Vec<Name>,
    pub context: RecordType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedAction {
    pub uid: EntityUid,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    pub member_of: Vec<EntityUid>,
    /// `None` when the action applies to nothing
    pub applies_to: Option<AppliesTo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedSchema {
    pub entities: BTreeMap<Name, ResolvedEntity>,
    pub enums: BTreeMap<Name, ResolvedEnum>,
    #[serde(serialize_with = "serialize_actions")]
    pub actions: BTreeMap<EntityUid, ResolvedAction>,
}

impl ResolvedSchema {
    pub fn entity(&self, name: &str) -> Option<&ResolvedEntity> {
        self.entities.get(&Name::from(name))
    }

    pub fn enumeration(&self, name: &str) -> Option<&ResolvedEnum> {
        self.enums.get(&Name::from(name))
    }

    pub fn action(&self, ty: &str, id: &str) -> Option<&ResolvedAction> {
        self.actions.get(&EntityUid::new(ty, id))
    }
}

/// JSON object keys must be strings, so actions are keyed by their display form.
fn serialize_actions<S: Serializer>(
    actions: &BTreeMap<EntityUid, ResolvedAction>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(actions.iter().map(|(uid, a)| (uid.to_string(), a)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_uid_display_quotes_id() {
        let uid = EntityUid::new("NS::Action", "view \"all\"");
        assert_eq!(uid.to_string(), r#"NS::Action::"view \"all\"""#);
    }

    #[test]
    fn enum_uids_are_restartable() {
        let e = ResolvedEnum {
            name: Name::from("Status"),
            annotations: BTreeMap::new(),
            values: vec!["active".into(), "inactive".into()],
        };
        let first: Vec<_> = e.entity_uids().collect();
        let second: Vec<_> = e.entity_uids().collect();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                EntityUid::new("Status", "active"),
                EntityUid::new("Status", "inactive")
            ]
        );
    }

    #[test]
    fn types_serialize_with_type_tag() {
        let t = Type::set(Type::entity("NS::User"));
        assert_eq!(
            serde_json::to_value(&t).unwrap(),
            serde_json::json!({"type": "Set", "element": {"type": "Entity", "name": "NS::User"}})
        );
        assert_eq!(
            serde_json::to_value(Type::extension(ExtensionType::Ipaddr)).unwrap(),
            serde_json::json!({"type": "Extension", "name": "ipaddr"})
        );
    }

    #[test]
    fn actions_serialize_keyed_by_uid() {
        let mut schema = ResolvedSchema::default();
        let uid = EntityUid::new("Action", "view");
        schema.actions.insert(
            uid.clone(),
            ResolvedAction {
                uid,
                annotations: BTreeMap::new(),
                member_of: vec![],
                applies_to: None,
            },
        );
        let v = serde_json::to_value(&schema).unwrap();
        assert!(v["actions"].get("Action::\"view\"").is_some());
    }
}
