//! Conversion between the syntax tree and the JSON schema format.
//!
//! The JSON form is keyed by namespace (`""` for the root) and carries
//! `entityTypes`, `actions`, `commonTypes`, and `annotations`. Comments and
//! declaration order do not survive the trip; declarations sharing a body
//! are split into one entry per name.

use crate::ast::{
    ActionDecl, ActionRef, Annotation, Annotations, AppliesTo, Attribute, Comments,
    CommonTypeDecl, Declaration, EntityDecl, EnumDecl, Item, Namespace, Path, RecordType, Schema,
    Type,
};
use crate::error::JsonError;
use crate::resolve::BUILTIN_PREFIX;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

// ──────────────────────────────────────────────
// AST -> JSON
// ──────────────────────────────────────────────

#[derive(Default)]
struct NamespaceJson {
    annotations: BTreeMap<String, String>,
    entity_types: Map<String, Value>,
    actions: Map<String, Value>,
    common_types: Map<String, Value>,
}

pub fn to_json(schema: &Schema) -> Value {
    let mut namespaces: BTreeMap<String, NamespaceJson> = BTreeMap::new();
    for item in &schema.items {
        match item {
            Item::Namespace(ns) => {
                let entry = namespaces.entry(ns.path.to_string()).or_default();
                entry.annotations.extend(ns.annotations.to_map());
                for decl in &ns.decls {
                    add_decl(entry, decl);
                }
            }
            Item::Decl(decl) => add_decl(namespaces.entry(String::new()).or_default(), decl),
        }
    }

    let mut out = Map::new();
    for (name, ns) in namespaces {
        let mut obj = Map::new();
        if !ns.annotations.is_empty() {
            obj.insert("annotations".to_owned(), json!(ns.annotations));
        }
        obj.insert("entityTypes".to_owned(), Value::Object(ns.entity_types));
        obj.insert("actions".to_owned(), Value::Object(ns.actions));
        obj.insert("commonTypes".to_owned(), Value::Object(ns.common_types));
        out.insert(name, Value::Object(obj));
    }
    Value::Object(out)
}

fn add_decl(ns: &mut NamespaceJson, decl: &Declaration) {
    match decl {
        Declaration::Entity(e) => {
            let v = entity_json(e);
            for name in &e.names {
                ns.entity_types.insert(name.clone(), v.clone());
            }
        }
        Declaration::Enum(e) => {
            let mut obj = Map::new();
            obj.insert("enum".to_owned(), json!(e.values));
            with_annotations(&mut obj, &e.annotations);
            for name in &e.names {
                ns.entity_types.insert(name.clone(), Value::Object(obj.clone()));
            }
        }
        Declaration::Action(a) => {
            let v = action_json(a);
            for name in &a.names {
                ns.actions.insert(name.clone(), v.clone());
            }
        }
        Declaration::CommonType(t) => {
            let mut v = type_json(&t.ty);
            if let Value::Object(obj) = &mut v {
                with_annotations(obj, &t.annotations);
            }
            ns.common_types.insert(t.name.clone(), v);
        }
    }
}

fn with_annotations(obj: &mut Map<String, Value>, annotations: &Annotations) {
    if !annotations.is_empty() {
        obj.insert("annotations".to_owned(), json!(annotations.to_map()));
    }
}

fn path_list(paths: &[Path]) -> Value {
    Value::Array(paths.iter().map(|p| Value::String(p.to_string())).collect())
}

fn entity_json(e: &EntityDecl) -> Value {
    let mut obj = Map::new();
    obj.insert("memberOfTypes".to_owned(), path_list(&e.member_of));
    if let Some(shape) = &e.shape {
        obj.insert("shape".to_owned(), record_json(shape));
    }
    if let Some(tags) = &e.tags {
        obj.insert("tags".to_owned(), type_json(tags));
    }
    with_annotations(&mut obj, &e.annotations);
    Value::Object(obj)
}

fn action_json(a: &ActionDecl) -> Value {
    let mut obj = Map::new();
    let parents: Vec<Value> = a
        .member_of
        .iter()
        .map(|r| match &r.ty {
            Some(ty) => json!({ "id": r.id, "type": ty.to_string() }),
            None => json!({ "id": r.id }),
        })
        .collect();
    obj.insert("memberOf".to_owned(), Value::Array(parents));
    if let Some(at) = &a.applies_to {
        let mut applies = Map::new();
        if let Some(p) = &at.principals {
            applies.insert("principalTypes".to_owned(), path_list(p));
        }
        if let Some(r) = &at.resources {
            applies.insert("resourceTypes".to_owned(), path_list(r));
        }
        if let Some(c) = &at.context {
            applies.insert("context".to_owned(), type_json(c));
        }
        obj.insert("appliesTo".to_owned(), Value::Object(applies));
    }
    with_annotations(&mut obj, &a.annotations);
    Value::Object(obj)
}

fn type_json(ty: &Type) -> Value {
    match ty {
        Type::Path(p) => json!({ "type": "EntityOrCommon", "name": p.to_string() }),
        Type::Entity(p) => json!({ "type": "Entity", "name": p.to_string() }),
        Type::Set(element) => json!({ "type": "Set", "element": type_json(element) }),
        Type::Record(r) => record_json(r),
    }
}

fn record_json(r: &RecordType) -> Value {
    let mut attributes = Map::new();
    for attr in &r.attributes {
        let mut v = type_json(&attr.ty);
        if let Value::Object(obj) = &mut v {
            obj.insert("required".to_owned(), Value::Bool(attr.required));
            with_annotations(obj, &attr.annotations);
        }
        attributes.insert(attr.name.clone(), v);
    }
    json!({ "type": "Record", "attributes": attributes })
}

// ──────────────────────────────────────────────
// JSON -> AST
// ──────────────────────────────────────────────

/// Parse the JSON schema format into a syntax tree with no comments.
/// Entries within a namespace come out in key order: common types, entity
/// types, then actions.
pub fn from_json(src: &str) -> Result<Schema, JsonError> {
    let value: Value = serde_json::from_str(src)?;
    let root = as_object(&value, "")?;

    let mut items = Vec::new();
    for (ns_name, ns_value) in root {
        let ns = as_object(ns_value, ns_name)?;
        let mut decls = Vec::new();
        let mut annotations = Annotations::default();
        for (key, v) in ns {
            let at = format!("{}/{}", ns_name, key);
            match key.as_str() {
                "annotations" => annotations = annotations_from(v, &at)?,
                "entityTypes" | "actions" | "commonTypes" => {}
                _ => return Err(JsonError::shape(at, "unknown namespace field")),
            }
        }
        if let Some(v) = ns.get("commonTypes") {
            for (name, t) in as_object(v, &format!("{}/commonTypes", ns_name))? {
                decls.push(common_type_from(name, t, &format!("{}/commonTypes/{}", ns_name, name))?);
            }
        }
        if let Some(v) = ns.get("entityTypes") {
            for (name, e) in as_object(v, &format!("{}/entityTypes", ns_name))? {
                decls.push(entity_from(name, e, &format!("{}/entityTypes/{}", ns_name, name))?);
            }
        }
        if let Some(v) = ns.get("actions") {
            for (name, a) in as_object(v, &format!("{}/actions", ns_name))? {
                decls.push(action_from(name, a, &format!("{}/actions/{}", ns_name, name))?);
            }
        }

        if ns_name.is_empty() {
            if !annotations.is_empty() {
                return Err(JsonError::shape(
                    "/annotations",
                    "the root namespace cannot carry annotations",
                ));
            }
            items.extend(decls.into_iter().map(Item::Decl));
        } else {
            items.push(Item::Namespace(Namespace {
                path: Path::from(ns_name.as_str()),
                decls,
                annotations,
                comments: Comments::default(),
            }));
        }
    }
    tracing::debug!(items = items.len(), "converted JSON schema");
    Ok(Schema {
        items,
        remaining: Vec::new(),
    })
}

fn as_object<'v>(v: &'v Value, at: &str) -> Result<&'v Map<String, Value>, JsonError> {
    v.as_object()
        .ok_or_else(|| JsonError::shape(at, "expected an object"))
}

fn as_str<'v>(v: &'v Value, at: &str) -> Result<&'v str, JsonError> {
    v.as_str()
        .ok_or_else(|| JsonError::shape(at, "expected a string"))
}

fn string_list(v: &Value, at: &str) -> Result<Vec<String>, JsonError> {
    let arr = v
        .as_array()
        .ok_or_else(|| JsonError::shape(at, "expected an array"))?;
    arr.iter()
        .enumerate()
        .map(|(i, s)| as_str(s, &format!("{}/{}", at, i)).map(str::to_owned))
        .collect()
}

fn path_list_from(v: &Value, at: &str) -> Result<Vec<Path>, JsonError> {
    Ok(string_list(v, at)?
        .iter()
        .map(|s| Path::from(s.as_str()))
        .collect())
}

fn annotations_from(v: &Value, at: &str) -> Result<Annotations, JsonError> {
    let mut out = Vec::new();
    for (key, value) in as_object(v, at)? {
        let value = as_str(value, &format!("{}/{}", at, key))?;
        out.push(Annotation {
            key: key.clone(),
            value: (!value.is_empty()).then(|| value.to_owned()),
        });
    }
    Ok(Annotations(out))
}

fn optional_annotations(obj: &Map<String, Value>, at: &str) -> Result<Annotations, JsonError> {
    match obj.get("annotations") {
        Some(v) => annotations_from(v, &format!("{}/annotations", at)),
        None => Ok(Annotations::default()),
    }
}

fn reject_unknown(obj: &Map<String, Value>, known: &[&str], at: &str) -> Result<(), JsonError> {
    match obj.keys().find(|k| !known.contains(&k.as_str())) {
        Some(k) => Err(JsonError::shape(format!("{}/{}", at, k), "unknown field")),
        None => Ok(()),
    }
}

fn common_type_from(name: &str, v: &Value, at: &str) -> Result<Declaration, JsonError> {
    let annotations = optional_annotations(as_object(v, at)?, at)?;
    Ok(Declaration::CommonType(CommonTypeDecl {
        name: name.to_owned(),
        ty: type_from(v, at)?,
        annotations,
        comments: Comments::default(),
    }))
}

fn entity_from(name: &str, v: &Value, at: &str) -> Result<Declaration, JsonError> {
    let obj = as_object(v, at)?;
    let annotations = optional_annotations(obj, at)?;

    if let Some(values) = obj.get("enum") {
        reject_unknown(obj, &["enum", "annotations"], at)?;
        let values = string_list(values, &format!("{}/enum", at))?;
        if values.is_empty() {
            return Err(JsonError::shape(
                format!("{}/enum", at),
                "enum must declare at least one value",
            ));
        }
        return Ok(Declaration::Enum(EnumDecl {
            names: vec![name.to_owned()],
            values,
            annotations,
            comments: Comments::default(),
        }));
    }

    reject_unknown(obj, &["memberOfTypes", "shape", "tags", "annotations"], at)?;
    let member_of = match obj.get("memberOfTypes") {
        Some(v) => path_list_from(v, &format!("{}/memberOfTypes", at))?,
        None => Vec::new(),
    };
    let shape = match obj.get("shape") {
        Some(v) => {
            let shape_at = format!("{}/shape", at);
            match type_from(v, &shape_at)? {
                Type::Record(r) => Some(r),
                _ => return Err(JsonError::shape(shape_at, "entity shape must be a record")),
            }
        }
        None => None,
    };
    let tags = match obj.get("tags") {
        Some(v) => Some(type_from(v, &format!("{}/tags", at))?),
        None => None,
    };
    Ok(Declaration::Entity(EntityDecl {
        names: vec![name.to_owned()],
        member_of,
        shape,
        tags,
        annotations,
        comments: Comments::default(),
    }))
}

fn action_from(name: &str, v: &Value, at: &str) -> Result<Declaration, JsonError> {
    let obj = as_object(v, at)?;
    reject_unknown(obj, &["memberOf", "appliesTo", "annotations"], at)?;
    let annotations = optional_annotations(obj, at)?;

    let mut member_of = Vec::new();
    if let Some(parents) = obj.get("memberOf") {
        let parents_at = format!("{}/memberOf", at);
        let arr = parents
            .as_array()
            .ok_or_else(|| JsonError::shape(&parents_at, "expected an array"))?;
        for (i, p) in arr.iter().enumerate() {
            let p_at = format!("{}/{}", parents_at, i);
            let p = as_object(p, &p_at)?;
            let id = p
                .get("id")
                .ok_or_else(|| JsonError::shape(&p_at, "missing 'id'"))
                .and_then(|id| as_str(id, &format!("{}/id", p_at)))?;
            let ty = match p.get("type") {
                Some(t) => Some(Path::from(as_str(t, &format!("{}/type", p_at))?)),
                None => None,
            };
            member_of.push(ActionRef {
                ty,
                id: id.to_owned(),
            });
        }
    }

    let applies_to = match obj.get("appliesTo") {
        Some(v) => {
            let at = format!("{}/appliesTo", at);
            let a = as_object(v, &at)?;
            reject_unknown(a, &["principalTypes", "resourceTypes", "context"], &at)?;
            Some(AppliesTo {
                principals: a
                    .get("principalTypes")
                    .map(|v| path_list_from(v, &format!("{}/principalTypes", at)))
                    .transpose()?,
                resources: a
                    .get("resourceTypes")
                    .map(|v| path_list_from(v, &format!("{}/resourceTypes", at)))
                    .transpose()?,
                context: a
                    .get("context")
                    .map(|v| type_from(v, &format!("{}/context", at)))
                    .transpose()?,
                comments: Comments::default(),
            })
        }
        None => None,
    };

    Ok(Declaration::Action(ActionDecl {
        names: vec![name.to_owned()],
        member_of,
        applies_to,
        annotations,
        comments: Comments::default(),
    }))
}

fn type_from(v: &Value, at: &str) -> Result<Type, JsonError> {
    let obj = as_object(v, at)?;
    let tag = obj
        .get("type")
        .ok_or_else(|| JsonError::shape(at, "missing 'type'"))
        .and_then(|t| as_str(t, &format!("{}/type", at)))?;
    let named = || -> Result<Path, JsonError> {
        let name = obj
            .get("name")
            .ok_or_else(|| JsonError::shape(at, format!("'{}' type needs a 'name'", tag)))?;
        Ok(Path::from(as_str(name, &format!("{}/name", at))?))
    };
    // Built-in tags go through the built-in prefix so declarations of the
    // same name cannot shadow them.
    let builtin = |name: &str| Type::path(&format!("{}::{}", BUILTIN_PREFIX, name));
    match tag {
        "Long" => Ok(builtin("Long")),
        "String" => Ok(builtin("String")),
        "Boolean" | "Bool" => Ok(builtin("Bool")),
        "Extension" => Ok(builtin(&named()?.to_string())),
        "Entity" => Ok(Type::Entity(named()?)),
        "EntityOrCommon" => Ok(Type::Path(named()?)),
        "Set" => {
            let element = obj
                .get("element")
                .ok_or_else(|| JsonError::shape(at, "'Set' type needs an 'element'"))?;
            Ok(Type::set(type_from(element, &format!("{}/element", at))?))
        }
        "Record" => {
            let attrs_at = format!("{}/attributes", at);
            let empty = Map::new();
            let attrs = match obj.get("attributes") {
                Some(a) => as_object(a, &attrs_at)?,
                None => &empty,
            };
            let mut attributes = Vec::new();
            for (name, a) in attrs {
                let a_at = format!("{}/{}", attrs_at, name);
                let a_obj = as_object(a, &a_at)?;
                let required = match a_obj.get("required") {
                    Some(Value::Bool(b)) => *b,
                    Some(_) => return Err(JsonError::shape(&a_at, "'required' must be a boolean")),
                    None => true,
                };
                attributes.push(Attribute {
                    name: name.clone(),
                    ty: type_from(a, &a_at)?,
                    required,
                    annotations: optional_annotations(a_obj, &a_at)?,
                    comments: Comments::default(),
                });
            }
            Ok(Type::Record(RecordType::new(attributes)))
        }
        // Any other tag names a common type.
        other => Ok(Type::Path(Path::from(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::format;
    use crate::parser::parse;
    use crate::resolved::{ExtensionType, Type as ResolvedType};

    #[test]
    fn namespaces_and_entity_types() {
        let s = parse(
            r#"entity Root; namespace App { @doc("users") entity User, Admin in [Group] { name: String, age?: Long } tags Set<String>; entity Group; }"#,
        )
        .unwrap();
        let v = to_json(&s);
        assert_eq!(v[""]["entityTypes"]["Root"], json!({ "memberOfTypes": [] }));
        let user = &v["App"]["entityTypes"]["User"];
        assert_eq!(user, &v["App"]["entityTypes"]["Admin"]);
        assert_eq!(user["memberOfTypes"], json!(["Group"]));
        assert_eq!(user["annotations"], json!({ "doc": "users" }));
        assert_eq!(
            user["shape"]["attributes"]["age"],
            json!({ "type": "EntityOrCommon", "name": "Long", "required": false })
        );
        assert_eq!(
            user["tags"],
            json!({ "type": "Set", "element": { "type": "EntityOrCommon", "name": "String" } })
        );
    }

    #[test]
    fn actions_and_enums() {
        let s = parse(
            r#"entity S enum ["on", "off"]; action read; action "write all" in [read, Other::Action::"x"] appliesTo { principal: [U], context: Ctx };"#,
        )
        .unwrap();
        let v = to_json(&s);
        assert_eq!(v[""]["entityTypes"]["S"], json!({ "enum": ["on", "off"] }));
        assert_eq!(
            v[""]["actions"]["write all"],
            json!({
                "memberOf": [{ "id": "read" }, { "id": "x", "type": "Other::Action" }],
                "appliesTo": {
                    "principalTypes": ["U"],
                    "context": { "type": "EntityOrCommon", "name": "Ctx" }
                }
            })
        );
        assert_eq!(v[""]["actions"]["read"], json!({ "memberOf": [] }));
    }

    #[test]
    fn from_json_accepts_every_type_form() {
        let src = r#"{
            "NS": {
                "annotations": { "owner": "team" },
                "commonTypes": {
                    "Ctx": { "type": "Record", "attributes": {
                        "a": { "type": "Long" },
                        "b": { "type": "String", "required": false },
                        "c": { "type": "Boolean" },
                        "d": { "type": "Entity", "name": "User" },
                        "e": { "type": "Extension", "name": "ipaddr" },
                        "f": { "type": "Set", "element": { "type": "EntityOrCommon", "name": "Other" } },
                        "g": { "type": "Other" }
                    } },
                    "Other": { "type": "Long" }
                },
                "entityTypes": { "Color": { "enum": ["red"] }, "User": {} },
                "actions": { "view": { "appliesTo": { "principalTypes": ["User"], "resourceTypes": ["User"], "context": { "type": "Ctx" } } } }
            }
        }"#;
        let schema = from_json(src).unwrap();
        let out = format(&schema);
        assert_eq!(
            out,
            r#"@owner("team")
namespace NS {
  type Ctx = {
    a: __cedar::Long,
    b?: __cedar::String,
    c: __cedar::Bool,
    d: User,
    e: __cedar::ipaddr,
    f: Set<Other>,
    g: Other,
  };

  type Other = __cedar::Long;

  entity Color enum ["red"];

  entity User;

  action view appliesTo {
    principal: [User],
    resource: [User],
    context: Ctx,
  };
}
"#
        );
        assert!(crate::resolve::resolve(&schema).is_ok());
    }

    #[test]
    fn json_round_trip_preserves_meaning() {
        let src = r#"namespace N { type T = { x?: Set<Long> }; entity E in [F] { t: T }; entity F; action a in [b] appliesTo { principal: E, resource: F, context: T }; action b; }"#;
        let direct = crate::resolve::resolve(&parse(src).unwrap()).unwrap();
        let text = to_json(&parse(src).unwrap()).to_string();
        let via_json = crate::resolve::resolve(&from_json(&text).unwrap()).unwrap();
        assert_eq!(direct, via_json);
    }

    #[test]
    fn tagged_builtins_ignore_same_named_declarations() {
        let src = r#"{
            "N": {
                "commonTypes": { "ipaddr": { "type": "String" } },
                "entityTypes": {
                    "Long": {},
                    "User": {},
                    "E": { "shape": { "type": "Record", "attributes": {
                        "x": { "type": "Long" },
                        "y": { "type": "Extension", "name": "ipaddr" },
                        "z": { "type": "EntityOrCommon", "name": "Long" }
                    } } }
                }
            }
        }"#;
        let resolved = crate::resolve::resolve(&from_json(src).unwrap()).unwrap();
        let attrs = &resolved.entity("N::E").unwrap().shape.as_ref().unwrap().attributes;
        assert_eq!(attrs["x"].ty, ResolvedType::Long);
        assert_eq!(attrs["y"].ty, ResolvedType::extension(ExtensionType::Ipaddr));
        assert_eq!(attrs["z"].ty, ResolvedType::entity("N::Long"));
    }

    #[test]
    fn entity_tag_skips_common_types() {
        let src = r#"{
            "N": {
                "commonTypes": { "User": { "type": "Long" } },
                "entityTypes": {
                    "User": {},
                    "E": { "shape": { "type": "Record", "attributes": {
                        "owner": { "type": "Entity", "name": "User" },
                        "alias": { "type": "EntityOrCommon", "name": "User" }
                    } } }
                }
            }
        }"#;
        let schema = from_json(src).unwrap();
        let resolved = crate::resolve::resolve(&schema).unwrap();
        let attrs = &resolved.entity("N::E").unwrap().shape.as_ref().unwrap().attributes;
        assert_eq!(attrs["owner"].ty, ResolvedType::entity("N::User"));
        assert_eq!(attrs["alias"].ty, ResolvedType::Long);

        let back = to_json(&schema);
        assert_eq!(
            back["N"]["entityTypes"]["E"]["shape"]["attributes"]["owner"],
            json!({ "type": "Entity", "name": "User", "required": true })
        );

        let missing = r#"{ "": { "commonTypes": { "T": { "type": "Entity", "name": "T" } }, "entityTypes": {} } }"#;
        let err = crate::resolve::resolve(&from_json(missing).unwrap()).unwrap_err();
        assert_eq!(err.kind(), "UndefinedType");
    }

    #[test]
    fn shape_errors_name_the_location() {
        let err = from_json(r#"{ "": { "entityTypes": { "A": { "shape": { "type": "Long" } } } } }"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "/entityTypes/A/shape: entity shape must be a record");

        let err = from_json(r#"{ "N": { "actions": { "a": { "bogus": 1 } } } }"#).unwrap_err();
        assert_eq!(err.to_string(), "N/actions/a/bogus: unknown field");

        assert!(matches!(from_json("{ nope"), Err(JsonError::Syntax(_))));
    }
}
