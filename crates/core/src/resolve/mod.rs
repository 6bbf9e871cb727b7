//! Semantic resolution: turn a parsed [`Schema`] into a [`ResolvedSchema`].
//!
//! Passes, in order:
//!
//! 1. index declarations per namespace, rejecting duplicates
//! 2. expand every common type (reports cycles even in unused aliases)
//! 3. resolve entities, enums, then actions
//! 4. check the action parent graph for undefined parents and cycles
//!
//! The first error aborts resolution.

mod index;

pub use index::{action_type, builtin_type, qualify, BUILTIN_PREFIX};

use crate::ast::{self, Schema};
use crate::error::ResolveError;
use crate::resolved::{
    AppliesTo, Attribute, EntityUid, Name, RecordType, ResolvedAction, ResolvedEntity,
    ResolvedEnum, ResolvedSchema, Type,
};
use index::{Binding, Index};
use std::collections::{BTreeMap, HashMap, HashSet};

pub fn resolve(schema: &Schema) -> Result<ResolvedSchema, ResolveError> {
    let index = index::build_index(schema)?;
    let mut resolver = Resolver {
        index: &index,
        expanded: HashMap::new(),
    };

    resolver.check_common_types()?;
    let entities = resolver.resolve_entities()?;
    let enums = resolver.resolve_enums();
    let actions = resolver.resolve_actions()?;
    check_action_graph(&actions)?;

    tracing::debug!(
        entities = entities.len(),
        enums = enums.len(),
        actions = actions.len(),
        "resolved schema"
    );
    Ok(ResolvedSchema {
        entities,
        enums,
        actions,
    })
}

struct Resolver<'i, 'a> {
    index: &'i Index<'a>,
    /// Fully expanded common types by qualified name
    expanded: HashMap<String, Type>,
}

impl<'i, 'a> Resolver<'i, 'a> {
    // -- types ---------------------------------------------------

    fn check_common_types(&mut self) -> Result<(), ResolveError> {
        for name in &self.index.common_order {
            self.expand_common(name, &mut Vec::new())?;
        }
        Ok(())
    }

    /// `in_progress` is the chain of common types being expanded by the
    /// current top-level reference; revisiting any of them is a cycle.
    fn resolve_type(
        &mut self,
        ty: &ast::Type,
        namespace: &str,
        in_progress: &mut Vec<String>,
    ) -> Result<Type, ResolveError> {
        match ty {
            ast::Type::Path(path) => match self.index.lookup_type(path, namespace)? {
                Binding::Builtin(t) => Ok(t),
                Binding::EntityType(name) => Ok(Type::Entity { name }),
                Binding::Common(name) => self.expand_common(&name, in_progress),
            },
            ast::Type::Entity(path) => Ok(Type::Entity {
                name: self.index.lookup_entity_type(path, namespace)?,
            }),
            ast::Type::Set(element) => Ok(Type::set(
                self.resolve_type(element, namespace, in_progress)?,
            )),
            ast::Type::Record(record) => Ok(Type::Record(self.resolve_record(
                record,
                namespace,
                in_progress,
            )?)),
        }
    }

    fn resolve_record(
        &mut self,
        record: &ast::RecordType,
        namespace: &str,
        in_progress: &mut Vec<String>,
    ) -> Result<RecordType, ResolveError> {
        let mut attributes = BTreeMap::new();
        for attr in &record.attributes {
            let ty = self.resolve_type(&attr.ty, namespace, in_progress)?;
            let prev = attributes.insert(
                attr.name.clone(),
                Attribute {
                    ty,
                    required: attr.required,
                    annotations: attr.annotations.to_map(),
                },
            );
            if prev.is_some() {
                return Err(ResolveError::DuplicateDeclaration {
                    kind: "attribute",
                    name: attr.name.clone(),
                });
            }
        }
        Ok(RecordType { attributes })
    }

    fn expand_common(
        &mut self,
        name: &str,
        in_progress: &mut Vec<String>,
    ) -> Result<Type, ResolveError> {
        if let Some(done) = self.expanded.get(name) {
            return Ok(done.clone());
        }
        if let Some(start) = in_progress.iter().position(|n| n == name) {
            let mut cycle = in_progress[start..].to_vec();
            cycle.push(name.to_owned());
            tracing::debug!(cycle = ?cycle, "common type cycle");
            return Err(ResolveError::CommonTypeCycle { cycle });
        }
        let index = self.index;
        let entry = index
            .common_types
            .get(name)
            .ok_or_else(|| ResolveError::UndefinedType {
                name: name.to_owned(),
                namespace: String::new(),
            })?;

        tracing::trace!(common_type = name, "expanding");
        in_progress.push(name.to_owned());
        let result = self.resolve_type(&entry.decl.ty, &entry.namespace, in_progress);
        in_progress.pop();

        let ty = result?;
        self.expanded.insert(name.to_owned(), ty.clone());
        Ok(ty)
    }

    fn resolve_top_type(&mut self, ty: &ast::Type, namespace: &str) -> Result<Type, ResolveError> {
        self.resolve_type(ty, namespace, &mut Vec::new())
    }

    fn resolve_entity_refs(
        &self,
        paths: &[ast::Path],
        namespace: &str,
    ) -> Result<Vec<Name>, ResolveError> {
        paths
            .iter()
            .map(|p| self.index.lookup_entity_type(p, namespace))
            .collect()
    }

    // -- declarations --------------------------------------------

    fn resolve_entities(&mut self) -> Result<BTreeMap<Name, ResolvedEntity>, ResolveError> {
        let index = self.index;
        let mut out = BTreeMap::new();
        for scoped in &index.entities {
            let (ns, decl) = (scoped.namespace.as_str(), scoped.decl);
            let member_of = self.resolve_entity_refs(&decl.member_of, ns)?;
            let shape = match &decl.shape {
                Some(record) => Some(self.resolve_record(record, ns, &mut Vec::new())?),
                None => None,
            };
            let tags = match &decl.tags {
                Some(t) => Some(self.resolve_top_type(t, ns)?),
                None => None,
            };
            for name in &decl.names {
                let name = Name(qualify(ns, name));
                out.insert(
                    name.clone(),
                    ResolvedEntity {
                        name,
                        annotations: decl.annotations.to_map(),
                        member_of: member_of.clone(),
                        shape: shape.clone(),
                        tags: tags.clone(),
                    },
                );
            }
        }
        Ok(out)
    }

    fn resolve_enums(&self) -> BTreeMap<Name, ResolvedEnum> {
        let mut out = BTreeMap::new();
        for scoped in &self.index.enums {
            for name in &scoped.decl.names {
                let name = Name(qualify(&scoped.namespace, name));
                out.insert(
                    name.clone(),
                    ResolvedEnum {
                        name,
                        annotations: scoped.decl.annotations.to_map(),
                        values: scoped.decl.values.clone(),
                    },
                );
            }
        }
        out
    }

    fn resolve_actions(&mut self) -> Result<BTreeMap<EntityUid, ResolvedAction>, ResolveError> {
        let index = self.index;
        let mut out = BTreeMap::new();
        for scoped in &index.actions {
            let (ns, decl) = (scoped.namespace.as_str(), scoped.decl);
            let member_of: Vec<EntityUid> = decl
                .member_of
                .iter()
                .map(|parent| EntityUid {
                    ty: match &parent.ty {
                        Some(path) => Name(path.to_string()),
                        None => action_type(ns),
                    },
                    id: parent.id.clone(),
                })
                .collect();

            for name in &decl.names {
                let uid = EntityUid {
                    ty: action_type(ns),
                    id: name.clone(),
                };
                let applies_to = match &decl.applies_to {
                    Some(at) => Some(self.resolve_applies_to(at, ns, &uid)?),
                    None => None,
                };
                out.insert(
                    uid.clone(),
                    ResolvedAction {
                        uid,
                        annotations: decl.annotations.to_map(),
                        member_of: member_of.clone(),
                        applies_to,
                    },
                );
            }
        }
        Ok(out)
    }

    fn resolve_applies_to(
        &mut self,
        applies_to: &ast::AppliesTo,
        namespace: &str,
        action: &EntityUid,
    ) -> Result<AppliesTo, ResolveError> {
        let principals = match &applies_to.principals {
            Some(paths) => self.resolve_entity_refs(paths, namespace)?,
            None => Vec::new(),
        };
        let resources = match &applies_to.resources {
            Some(paths) => self.resolve_entity_refs(paths, namespace)?,
            None => Vec::new(),
        };
        let context = match &applies_to.context {
            None => RecordType::default(),
            Some(t) => match self.resolve_top_type(t, namespace)? {
                Type::Record(record) => record,
                other => {
                    return Err(ResolveError::InvalidContext {
                        action: action.to_string(),
                        found: other.describe(),
                    })
                }
            },
        };
        Ok(AppliesTo {
            principals,
            resources,
            context,
        })
    }
}

// ──────────────────────────────────────────────
// Action parent graph
// ──────────────────────────────────────────────

fn check_action_graph(actions: &BTreeMap<EntityUid, ResolvedAction>) -> Result<(), ResolveError> {
    for action in actions.values() {
        if let Some(parent) = action.member_of.iter().find(|p| !actions.contains_key(p)) {
            return Err(ResolveError::UndefinedAction {
                action: action.uid.to_string(),
                parent: parent.to_string(),
            });
        }
    }
    let mut done: HashSet<&EntityUid> = HashSet::new();
    for uid in actions.keys() {
        let mut chain = Vec::new();
        visit_action(uid, actions, &mut chain, &mut done)?;
    }
    Ok(())
}

fn visit_action<'s>(
    uid: &'s EntityUid,
    actions: &'s BTreeMap<EntityUid, ResolvedAction>,
    chain: &mut Vec<&'s EntityUid>,
    done: &mut HashSet<&'s EntityUid>,
) -> Result<(), ResolveError> {
    if done.contains(uid) {
        return Ok(());
    }
    if let Some(start) = chain.iter().position(|u| *u == uid) {
        let mut cycle: Vec<String> = chain[start..].iter().map(|u| u.to_string()).collect();
        cycle.push(uid.to_string());
        tracing::debug!(cycle = ?cycle, "action cycle");
        return Err(ResolveError::ActionCycle { cycle });
    }
    chain.push(uid);
    if let Some(action) = actions.get(uid) {
        for parent in &action.member_of {
            visit_action(parent, actions, chain, done)?;
        }
    }
    chain.pop();
    done.insert(uid);
    Ok(())
}
