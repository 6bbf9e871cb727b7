//! Declaration tables and name lookup.
//!
//! Each namespace contributes a common-type table and an entity/enum table
//! (entities and enums share one table since both name entity types). Both
//! are keyed by fully qualified name. Built-in types live in a fixed table.

use crate::ast::{ActionDecl, CommonTypeDecl, Declaration, EntityDecl, EnumDecl, Path, Schema};
use crate::error::ResolveError;
use crate::parser::is_reserved_type_name;
use crate::resolved::{EntityUid, ExtensionType, Name, Type};
use std::collections::{HashMap, HashSet};

/// Prefix that forces a name to resolve against built-ins only.
pub const BUILTIN_PREFIX: &str = "__cedar";

/// `N::name`, or `name` in the root namespace.
pub fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_owned()
    } else {
        format!("{}::{}", namespace, name)
    }
}

/// The `Action` entity type of a namespace.
pub fn action_type(namespace: &str) -> Name {
    Name(qualify(namespace, "Action"))
}

pub fn builtin_type(name: &str) -> Option<Type> {
    match name {
        "Bool" | "Boolean" => Some(Type::Bool),
        "Long" => Some(Type::Long),
        "String" => Some(Type::String),
        "ipaddr" => Some(Type::extension(ExtensionType::Ipaddr)),
        "decimal" => Some(Type::extension(ExtensionType::Decimal)),
        "datetime" => Some(Type::extension(ExtensionType::Datetime)),
        "duration" => Some(Type::extension(ExtensionType::Duration)),
        _ => None,
    }
}

/// A declaration together with the namespace it was declared in.
pub(crate) struct Scoped<'a, T> {
    pub namespace: String,
    pub decl: &'a T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Table {
    Common,
    EntityType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// The namespace the reference appears in
    Current,
    /// The unqualified root namespace
    Root,
}

/// Lookup order for an unqualified name; built-ins are tried last.
const UNQUALIFIED_PRECEDENCE: [(Table, Scope); 4] = [
    (Table::Common, Scope::Current),
    (Table::EntityType, Scope::Current),
    (Table::Common, Scope::Root),
    (Table::EntityType, Scope::Root),
];

/// What a type reference resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Binding {
    /// Fully qualified common-type name, still to be expanded
    Common(String),
    EntityType(Name),
    Builtin(Type),
}

pub(crate) struct Index<'a> {
    pub common_types: HashMap<String, Scoped<'a, CommonTypeDecl>>,
    /// Qualified common-type names in declaration order
    pub common_order: Vec<String>,
    pub entity_types: HashSet<String>,
    pub entities: Vec<Scoped<'a, EntityDecl>>,
    pub enums: Vec<Scoped<'a, EnumDecl>>,
    pub actions: Vec<Scoped<'a, ActionDecl>>,
    pub action_uids: HashSet<EntityUid>,
}

impl<'a> Index<'a> {
    fn has(&self, table: Table, qualified: &str) -> bool {
        match table {
            Table::Common => self.common_types.contains_key(qualified),
            Table::EntityType => self.entity_types.contains(qualified),
        }
    }

    fn bind(table: Table, qualified: String) -> Binding {
        match table {
            Table::Common => Binding::Common(qualified),
            Table::EntityType => Binding::EntityType(Name(qualified)),
        }
    }

    /// Resolve a type reference appearing in `namespace`.
    ///
    /// `__cedar::X` names only built-ins. Any other qualified name is looked
    /// up in its own namespace, common types first. An unqualified name
    /// follows [`UNQUALIFIED_PRECEDENCE`] and then the built-in table.
    pub fn lookup_type(&self, path: &Path, namespace: &str) -> Result<Binding, ResolveError> {
        if path.is_qualified() && path.segments[0] == BUILTIN_PREFIX {
            let rest = path.segments[1..].join("::");
            return builtin_type(&rest)
                .map(Binding::Builtin)
                .ok_or(ResolveError::UndefinedBuiltin { name: rest });
        }

        let undefined = || ResolveError::UndefinedType {
            name: path.to_string(),
            namespace: namespace.to_owned(),
        };

        if path.is_qualified() {
            let qualified = path.to_string();
            return [Table::Common, Table::EntityType]
                .into_iter()
                .find(|t| self.has(*t, &qualified))
                .map(|t| Self::bind(t, qualified.clone()))
                .ok_or_else(undefined);
        }

        let name = path.basename();
        for (table, scope) in UNQUALIFIED_PRECEDENCE {
            let qualified = match scope {
                Scope::Current => qualify(namespace, name),
                Scope::Root => name.to_owned(),
            };
            if self.has(table, &qualified) {
                return Ok(Self::bind(table, qualified));
            }
        }
        builtin_type(name).map(Binding::Builtin).ok_or_else(undefined)
    }

    /// Resolve a reference that must name an entity or enum type.
    pub fn lookup_entity_type(&self, path: &Path, namespace: &str) -> Result<Name, ResolveError> {
        let candidates = if path.is_qualified() {
            vec![path.to_string()]
        } else {
            vec![qualify(namespace, path.basename()), path.basename().to_owned()]
        };
        candidates
            .into_iter()
            .find(|q| self.entity_types.contains(q))
            .map(Name)
            .ok_or_else(|| ResolveError::UndefinedType {
                name: path.to_string(),
                namespace: namespace.to_owned(),
            })
    }

    fn add_entity_type(&mut self, namespace: &str, name: &str) -> Result<(), ResolveError> {
        let qualified = qualify(namespace, name);
        if !self.entity_types.insert(qualified.clone()) {
            return Err(ResolveError::DuplicateDeclaration {
                kind: "entity type",
                name: qualified,
            });
        }
        Ok(())
    }

    fn add(&mut self, namespace: &str, decl: &'a Declaration) -> Result<(), ResolveError> {
        match decl {
            Declaration::Entity(e) => {
                for name in &e.names {
                    self.add_entity_type(namespace, name)?;
                }
                self.entities.push(Scoped {
                    namespace: namespace.to_owned(),
                    decl: e,
                });
            }
            Declaration::Enum(e) => {
                for name in &e.names {
                    self.add_entity_type(namespace, name)?;
                }
                self.enums.push(Scoped {
                    namespace: namespace.to_owned(),
                    decl: e,
                });
            }
            Declaration::Action(a) => {
                for name in &a.names {
                    let uid = EntityUid {
                        ty: action_type(namespace),
                        id: name.clone(),
                    };
                    if self.action_uids.contains(&uid) {
                        return Err(ResolveError::DuplicateDeclaration {
                            kind: "action",
                            name: uid.to_string(),
                        });
                    }
                    self.action_uids.insert(uid);
                }
                self.actions.push(Scoped {
                    namespace: namespace.to_owned(),
                    decl: a,
                });
            }
            Declaration::CommonType(t) => {
                if is_reserved_type_name(&t.name) {
                    return Err(ResolveError::ReservedName {
                        name: t.name.clone(),
                    });
                }
                let qualified = qualify(namespace, &t.name);
                if self.common_types.contains_key(&qualified) {
                    return Err(ResolveError::DuplicateDeclaration {
                        kind: "common type",
                        name: qualified,
                    });
                }
                self.common_order.push(qualified.clone());
                self.common_types.insert(
                    qualified,
                    Scoped {
                        namespace: namespace.to_owned(),
                        decl: t,
                    },
                );
            }
        }
        Ok(())
    }
}

/// Collect every declaration of `schema` into per-namespace tables,
/// rejecting duplicates. Namespace blocks sharing a path are merged.
pub(crate) fn build_index(schema: &Schema) -> Result<Index<'_>, ResolveError> {
    let mut idx = Index {
        common_types: HashMap::new(),
        common_order: Vec::new(),
        entity_types: HashSet::new(),
        entities: Vec::new(),
        enums: Vec::new(),
        actions: Vec::new(),
        action_uids: HashSet::new(),
    };
    for (namespace, decls) in schema.namespaces() {
        tracing::trace!(namespace = %namespace, decls = decls.len(), "indexing namespace");
        for decl in decls {
            idx.add(&namespace, decl)?;
        }
    }
    Ok(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn lookup(src: &str, name: &str, namespace: &str) -> Result<Binding, ResolveError> {
        let schema = parse(src).unwrap();
        let idx = build_index(&schema).unwrap();
        idx.lookup_type(&Path::from(name), namespace)
    }

    #[test]
    fn common_type_shadows_entity_shadows_builtin() {
        let both = "namespace N { type Long = String; }";
        // reserved names never reach the table through the parser
        assert!(parse(both).is_err());

        let src = "namespace N { type X = Long; entity X; }";
        assert_eq!(lookup(src, "X", "N").unwrap(), Binding::Common("N::X".into()));

        let src = "namespace N { entity X; }";
        assert_eq!(
            lookup(src, "X", "N").unwrap(),
            Binding::EntityType(Name::from("N::X"))
        );

        let src = "namespace N { entity String; }";
        assert_eq!(
            lookup(src, "String", "N").unwrap(),
            Binding::EntityType(Name::from("N::String"))
        );
        assert_eq!(lookup("", "String", "N").unwrap(), Binding::Builtin(Type::String));
        assert_eq!(lookup("", "Boolean", "").unwrap(), Binding::Builtin(Type::Bool));
    }

    #[test]
    fn current_namespace_before_root() {
        let src = "type X = Long; entity Y; namespace N { entity X; }";
        assert_eq!(
            lookup(src, "X", "N").unwrap(),
            Binding::EntityType(Name::from("N::X"))
        );
        assert_eq!(lookup(src, "X", "").unwrap(), Binding::Common("X".into()));
        assert_eq!(
            lookup(src, "Y", "N").unwrap(),
            Binding::EntityType(Name::from("Y"))
        );
    }

    #[test]
    fn root_common_type_shadows_root_entity() {
        let src = "type X = Long; entity X; namespace N {}";
        assert_eq!(lookup(src, "X", "N").unwrap(), Binding::Common("X".into()));
    }

    #[test]
    fn qualified_names_resolve_only_in_their_namespace() {
        let src = "entity X; namespace A { type T = Long; entity E; } namespace B { entity X; }";
        assert_eq!(lookup(src, "A::T", "B").unwrap(), Binding::Common("A::T".into()));
        assert_eq!(
            lookup(src, "A::E", "").unwrap(),
            Binding::EntityType(Name::from("A::E"))
        );
        let err = lookup(src, "A::X", "B").unwrap_err();
        assert!(matches!(err, ResolveError::UndefinedType { ref name, .. } if name == "A::X"));
    }

    #[test]
    fn builtin_prefix_bypasses_declarations() {
        let src = "namespace N { entity Long; }";
        assert_eq!(
            lookup(src, "__cedar::Long", "N").unwrap(),
            Binding::Builtin(Type::Long)
        );
        assert_eq!(
            lookup(src, "__cedar::ipaddr", "N").unwrap(),
            Binding::Builtin(Type::extension(ExtensionType::Ipaddr))
        );
        let err = lookup(src, "__cedar::User", "N").unwrap_err();
        assert_eq!(
            err,
            ResolveError::UndefinedBuiltin {
                name: "User".into()
            }
        );
    }

    #[test]
    fn bare_builtin_prefix_is_an_ordinary_name() {
        let src = "entity __cedar; namespace N { type __cedar = Long; }";
        assert_eq!(
            lookup(src, "__cedar", "").unwrap(),
            Binding::EntityType(Name::from("__cedar"))
        );
        assert_eq!(
            lookup(src, "__cedar", "N").unwrap(),
            Binding::Common("N::__cedar".into())
        );
        assert!(lookup("", "__cedar", "").is_err());
    }

    #[test]
    fn unknown_unqualified_name_is_undefined() {
        let err = lookup("", "Nope", "N").unwrap_err();
        assert_eq!(
            err,
            ResolveError::UndefinedType {
                name: "Nope".into(),
                namespace: "N".into()
            }
        );
    }

    #[test]
    fn entity_lookup_ignores_common_types_and_builtins() {
        let schema = parse("type T = Long; namespace N { entity U; }").unwrap();
        let idx = build_index(&schema).unwrap();
        assert_eq!(
            idx.lookup_entity_type(&Path::from("U"), "N").unwrap(),
            Name::from("N::U")
        );
        assert!(idx.lookup_entity_type(&Path::from("T"), "").is_err());
        assert!(idx.lookup_entity_type(&Path::from("String"), "").is_err());
        assert!(idx.lookup_entity_type(&Path::from("U"), "").is_err());
    }

    #[test]
    fn duplicates_are_rejected() {
        for src in [
            "entity A; entity A;",
            "entity A; entity A enum [\"x\"];",
            "namespace N { entity A; } namespace N { entity A; }",
            "type T = Long; type T = String;",
            "action a; action a;",
            "action \"a\", a;",
        ] {
            let schema = parse(src).unwrap();
            let err = build_index(&schema).err().unwrap();
            assert_eq!(err.kind(), "DuplicateDeclaration", "{}", src);
        }
    }

    #[test]
    fn same_name_in_different_namespaces_is_fine() {
        let schema = parse("entity A; namespace N { entity A; action a; } action a;").unwrap();
        assert!(build_index(&schema).is_ok());
    }
}
