//! Canonical schema text.
//!
//! Two-space indentation, a blank line between declarations, annotations on
//! their own lines, records expanded one attribute per line with trailing
//! commas. Comments are re-emitted where they were attached, so formatting
//! the parse of formatted output yields the same text.

use crate::ast::{
    ActionDecl, ActionRef, Annotations, AppliesTo, Comments, CommonTypeDecl, Declaration,
    EntityDecl, EnumDecl, Item, Namespace, Path, RecordType, Schema, Type,
};
use crate::lexer::{is_ident, quote};

const INDENT: &str = "  ";

pub fn format(schema: &Schema) -> String {
    let mut p = Printer::default();
    for (i, item) in schema.items.iter().enumerate() {
        if i > 0 {
            p.out.push('\n');
        }
        match item {
            Item::Namespace(ns) => p.namespace(ns),
            Item::Decl(decl) => p.decl(decl, 0),
        }
    }
    if !schema.remaining.is_empty() {
        if !schema.items.is_empty() {
            p.out.push('\n');
        }
        p.comment_lines(&schema.remaining, 0);
    }
    p.out
}

#[derive(Default)]
struct Printer {
    out: String,
}

impl Printer {
    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
    }

    fn comment_lines(&mut self, comments: &[String], depth: usize) {
        for c in comments {
            self.indent(depth);
            self.out.push_str(c);
            self.out.push('\n');
        }
    }

    /// Leading comments and annotations, each on its own line.
    fn prologue(&mut self, comments: &Comments, annotations: &Annotations, depth: usize) {
        self.comment_lines(&comments.before, depth);
        for a in annotations.iter() {
            self.indent(depth);
            self.out.push('@');
            self.out.push_str(&a.key);
            if let Some(v) = &a.value {
                self.out.push('(');
                self.out.push_str(&quote(v));
                self.out.push(')');
            }
            self.out.push('\n');
        }
    }

    fn end_line(&mut self, comments: &Comments) {
        if let Some(c) = &comments.inline {
            self.out.push(' ');
            self.out.push_str(c);
        }
        self.out.push('\n');
    }

    // -- items ---------------------------------------------------

    fn namespace(&mut self, ns: &Namespace) {
        self.prologue(&ns.comments, &ns.annotations, 0);
        self.out.push_str("namespace ");
        self.out.push_str(&ns.path.to_string());
        if ns.decls.is_empty() && ns.comments.remaining.is_empty() {
            self.out.push_str(" {}");
            self.end_line(&ns.comments);
            return;
        }
        self.out.push_str(" {\n");
        for (i, decl) in ns.decls.iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.decl(decl, 1);
        }
        self.comment_lines(&ns.comments.remaining, 1);
        self.out.push('}');
        self.end_line(&ns.comments);
    }

    fn decl(&mut self, decl: &Declaration, depth: usize) {
        self.prologue(decl.comments(), decl.annotations(), depth);
        self.indent(depth);
        match decl {
            Declaration::Entity(e) => self.entity(e, depth),
            Declaration::Enum(e) => self.enumeration(e),
            Declaration::Action(a) => self.action(a, depth),
            Declaration::CommonType(t) => self.common_type(t, depth),
        }
        self.out.push(';');
        self.end_line(decl.comments());
    }

    fn entity(&mut self, e: &EntityDecl, depth: usize) {
        self.out.push_str("entity ");
        self.out.push_str(&e.names.join(", "));
        if !e.member_of.is_empty() {
            self.out.push_str(" in ");
            self.paths(&e.member_of);
        }
        if let Some(shape) = &e.shape {
            self.out.push(' ');
            self.record(shape, depth);
        }
        if let Some(tags) = &e.tags {
            self.out.push_str(" tags ");
            self.ty(tags, depth);
        }
    }

    fn enumeration(&mut self, e: &EnumDecl) {
        self.out.push_str("entity ");
        self.out.push_str(&e.names.join(", "));
        self.out.push_str(" enum [");
        let values: Vec<String> = e.values.iter().map(|v| quote(v)).collect();
        self.out.push_str(&values.join(", "));
        self.out.push(']');
    }

    fn action(&mut self, a: &ActionDecl, depth: usize) {
        self.out.push_str("action ");
        let names: Vec<String> = a.names.iter().map(|n| name(n)).collect();
        self.out.push_str(&names.join(", "));
        if !a.member_of.is_empty() {
            self.out.push_str(" in [");
            let parents: Vec<String> = a.member_of.iter().map(action_ref).collect();
            self.out.push_str(&parents.join(", "));
            self.out.push(']');
        }
        if let Some(applies_to) = &a.applies_to {
            self.out.push_str(" appliesTo ");
            self.applies_to(applies_to, depth);
        }
    }

    fn applies_to(&mut self, at: &AppliesTo, depth: usize) {
        let empty = at.principals.is_none() && at.resources.is_none() && at.context.is_none();
        if empty && at.comments.remaining.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{\n");
        if let Some(principals) = &at.principals {
            self.indent(depth + 1);
            self.out.push_str("principal: ");
            self.paths(principals);
            self.out.push_str(",\n");
        }
        if let Some(resources) = &at.resources {
            self.indent(depth + 1);
            self.out.push_str("resource: ");
            self.paths(resources);
            self.out.push_str(",\n");
        }
        if let Some(context) = &at.context {
            self.indent(depth + 1);
            self.out.push_str("context: ");
            self.ty(context, depth + 1);
            self.out.push_str(",\n");
        }
        self.comment_lines(&at.comments.remaining, depth + 1);
        self.indent(depth);
        self.out.push('}');
    }

    fn common_type(&mut self, t: &CommonTypeDecl, depth: usize) {
        self.out.push_str("type ");
        self.out.push_str(&t.name);
        self.out.push_str(" = ");
        self.ty(&t.ty, depth);
    }

    // -- types ---------------------------------------------------

    fn paths(&mut self, paths: &[Path]) {
        let names: Vec<String> = paths.iter().map(Path::to_string).collect();
        self.out.push('[');
        self.out.push_str(&names.join(", "));
        self.out.push(']');
    }

    /// Writes `ty` at the current position; `depth` is the indentation of
    /// the line it starts on.
    fn ty(&mut self, ty: &Type, depth: usize) {
        match ty {
            Type::Path(p) | Type::Entity(p) => self.out.push_str(&p.to_string()),
            Type::Set(element) => {
                self.out.push_str("Set<");
                self.ty(element, depth);
                self.out.push('>');
            }
            Type::Record(r) => self.record(r, depth),
        }
    }

    fn record(&mut self, r: &RecordType, depth: usize) {
        if r.attributes.is_empty() && r.comments.remaining.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{\n");
        for attr in &r.attributes {
            self.prologue(&attr.comments, &attr.annotations, depth + 1);
            self.indent(depth + 1);
            self.out.push_str(&name(&attr.name));
            if !attr.required {
                self.out.push('?');
            }
            self.out.push_str(": ");
            self.ty(&attr.ty, depth + 1);
            self.out.push(',');
            self.end_line(&attr.comments);
        }
        self.comment_lines(&r.comments.remaining, depth + 1);
        self.indent(depth);
        self.out.push('}');
    }
}

/// Bare when it lexes as an identifier, quoted otherwise.
fn name(s: &str) -> String {
    if is_ident(s) {
        s.to_owned()
    } else {
        quote(s)
    }
}

fn action_ref(r: &ActionRef) -> String {
    match &r.ty {
        Some(ty) => format!("{}::{}", ty, quote(&r.id)),
        None => name(&r.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Attribute;
    use crate::parser::parse;

    fn fmt(src: &str) -> String {
        format(&parse(src).unwrap())
    }

    #[test]
    fn canonical_layout() {
        let out = fmt(
            r#"namespace PhotoApp { @doc("a user") entity User in Group={name:String,"job title"?:String}; entity Group;
            action "view photo",edit in view appliesTo{principal:User,resource:[Photo],context:{}}; action view;
            entity Photo; type Ctx = Set<Long>; entity Status enum ["a","b"]; }"#,
        );
        assert_eq!(
            out,
            r#"namespace PhotoApp {
  @doc("a user")
  entity User in [Group] {
    name: String,
    "job title"?: String,
  };

  entity Group;

  action "view photo", edit in [view] appliesTo {
    principal: [User],
    resource: [Photo],
    context: {},
  };

  action view;

  entity Photo;

  type Ctx = Set<Long>;

  entity Status enum ["a", "b"];
}
"#
        );
    }

    #[test]
    fn comments_are_reemitted() {
        let src = "// header\nentity A { // open\n  // on x\n  x: Long, // after x\n  // tail\n}; // done\n// trailing\n";
        let out = fmt(src);
        assert_eq!(
            out,
            "// header\nentity A {\n  // open\n  // on x\n  x: Long, // after x\n  // tail\n}; // done\n\n// trailing\n"
        );
        assert_eq!(fmt(&out), out);
    }

    #[test]
    fn formatting_is_idempotent() {
        let src = r#"
        /* block */ @a @b("x\ty")
        namespace N::M { // ns
          type T = { inner: { deep?: Set<__cedar::Long> } , };
          entity E, F in [G] = {} tags String; entity G;
          action a in [N::M::Action::"b", "c d"] appliesTo { context: T, principal: E };
          action b; action "c d"; // last
          // before close
        } /* after */
        action top appliesTo {};
        "#;
        let once = fmt(src);
        assert_eq!(fmt(&once), once);
        assert_eq!(parse(&once).unwrap().items.len(), 2);
    }

    #[test]
    fn empty_containers() {
        assert_eq!(fmt(""), "");
        assert_eq!(fmt("namespace N {}"), "namespace N {}\n");
        assert_eq!(fmt("type T = {};"), "type T = {};\n");
    }

    #[test]
    fn hand_built_tree_formats() {
        let schema = Schema {
            items: vec![Item::Decl(Declaration::CommonType(CommonTypeDecl {
                name: "T".into(),
                ty: Type::Record(RecordType::new(vec![Attribute::new(
                    "weird name",
                    Type::set(Type::path("Long")),
                    false,
                )])),
                annotations: Annotations::default(),
                comments: Comments::default(),
            }))],
            remaining: vec![],
        };
        assert_eq!(format(&schema), "type T = {\n  \"weird name\"?: Set<Long>,\n};\n");
    }
}
