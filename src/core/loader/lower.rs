//! Lowering swc modules into the host-neutral syntax tree.
//!
//! Comments are grouped by line: consecutive comments that each start their
//! own line form one group. A group ending on the line right above a
//! declaration is its doc comment; a comment following code on the last line
//! of a declaration is its trailing comment.

use swc_common::{BytePos, Span, Spanned, comments::CommentKind};
use swc_ecma_ast::{
    AssignTarget, Class, ClassExpr, ClassMember, Decl, DefaultDecl, ExportDefaultDecl, Expr, FnDecl,
    FnExpr, ForHead, ImportDecl, ImportSpecifier, ModuleDecl, ModuleExportName, ModuleItem,
    PropName, Stmt, TsEnumDecl, TsEnumMemberId, TsInterfaceDecl, TsTypeElement, VarDecl,
};
use swc_ecma_visit::{Visit, VisitWith};

use crate::core::{
    parsers::ts::ParsedSource,
    syntax::{
        CommentGroup, FieldSpec, FileId, FuncDecl, GroupDecl, Ident, ImportSpec, Node, SourcePos,
        TypeSpec, ValueSpec,
    },
};

/// Lower a parsed file. `resolve` maps a module specifier to a unit path.
pub(super) fn lower_module(
    parsed: &ParsedSource,
    source: &str,
    file: FileId,
    resolve: &dyn Fn(&str) -> Option<String>,
) -> Vec<Node> {
    let lowering = Lowering {
        parsed,
        file,
        comments: CommentIndex::build(parsed, source, file),
        resolve,
    };
    let mut nodes = Vec::new();
    for item in &parsed.module.body {
        lowering.lower_item(item, &mut nodes);
    }
    nodes
}

struct CommentBlock {
    start_line: usize,
    end_line: usize,
    own_line: bool,
    group: CommentGroup,
}

struct CommentIndex {
    blocks: Vec<CommentBlock>,
}

impl CommentIndex {
    fn build(parsed: &ParsedSource, source: &str, file: FileId) -> Self {
        let mut blocks: Vec<CommentBlock> = Vec::new();
        for cmt in &parsed.comments.comments {
            let offset = parsed.offset(cmt.span.lo);
            let start_line = parsed.line(cmt.span.lo);
            let end_line = parsed.line(cmt.span.hi);
            let own_line = starts_line(source, offset as usize);
            let lines = comment_lines(cmt.kind, &cmt.text);

            if own_line
                && let Some(last) = blocks.last_mut()
                && last.own_line
                && last.end_line + 1 == start_line
            {
                last.end_line = end_line;
                last.group.lines.extend(lines);
                continue;
            }
            blocks.push(CommentBlock {
                start_line,
                end_line,
                own_line,
                group: CommentGroup::new(SourcePos::new(file, offset), lines),
            });
        }
        Self { blocks }
    }

    fn doc_for(&self, line: usize) -> Option<CommentGroup> {
        self.blocks
            .iter()
            .find(|b| b.own_line && b.end_line + 1 == line)
            .map(|b| b.group.clone())
    }

    fn trailing_for(&self, line: usize, after: u32) -> Option<CommentGroup> {
        self.blocks
            .iter()
            .find(|b| !b.own_line && b.start_line == line && b.group.pos.offset >= after)
            .map(|b| b.group.clone())
    }
}

fn starts_line(source: &str, offset: usize) -> bool {
    let Some(before) = source.get(..offset) else {
        return false;
    };
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    before[line_start..].trim().is_empty()
}

fn comment_lines(kind: CommentKind, text: &str) -> Vec<String> {
    match kind {
        CommentKind::Line => vec![strip_space(text).trim_end().to_string()],
        CommentKind::Block => text
            .lines()
            .map(|line| {
                let line = line.trim_start();
                let line = line.strip_prefix('*').unwrap_or(line);
                strip_space(line).trim_end().to_string()
            })
            .collect(),
    }
}

fn strip_space(text: &str) -> &str {
    text.strip_prefix(' ').unwrap_or(text)
}

/// Collects the identifiers below a node.
///
/// With `locals` set, a binding identifier (parameter, local variable,
/// destructured name) becomes a local [`ValueSpec`] and a nested function
/// declaration keeps its own body, so the cross-reference index can scope
/// them. Without it every identifier is a plain reference.
struct IdentCollector {
    file: FileId,
    start: BytePos,
    locals: bool,
    idents: Vec<Node>,
}

impl IdentCollector {
    fn nested(&self) -> Self {
        Self {
            file: self.file,
            start: self.start,
            locals: true,
            idents: Vec::new(),
        }
    }

    fn ident(&self, node: &swc_ecma_ast::Ident) -> Ident {
        let offset = node.span.lo.0.saturating_sub(self.start.0);
        Ident::new(node.sym.to_string(), SourcePos::new(self.file, offset))
    }
}

impl Visit for IdentCollector {
    fn visit_ident(&mut self, node: &swc_ecma_ast::Ident) {
        let ident = self.ident(node);
        self.idents.push(Node::Ident(ident));
    }

    fn visit_binding_ident(&mut self, node: &swc_ecma_ast::BindingIdent) {
        if !self.locals {
            node.visit_children_with(self);
            return;
        }
        let mut refs = self.nested();
        if let Some(type_ann) = &node.type_ann {
            type_ann.as_ref().visit_with(&mut refs);
        }
        self.idents.push(Node::Value(ValueSpec {
            names: vec![self.ident(&node.id)],
            doc: None,
            trailing: None,
            body: refs.idents,
        }));
    }

    fn visit_fn_decl(&mut self, node: &FnDecl) {
        if !self.locals {
            node.visit_children_with(self);
            return;
        }
        let mut body = self.nested();
        node.function.as_ref().visit_with(&mut body);
        self.idents.push(Node::Func(FuncDecl {
            name: self.ident(&node.ident),
            doc: None,
            body: body.idents,
        }));
    }

    // Assigning to a name binds nothing new.
    fn visit_assign_target(&mut self, node: &AssignTarget) {
        let locals = std::mem::replace(&mut self.locals, false);
        node.visit_children_with(self);
        self.locals = locals;
    }

    fn visit_for_head(&mut self, node: &ForHead) {
        match node {
            ForHead::Pat(pat) => {
                let locals = std::mem::replace(&mut self.locals, false);
                pat.visit_with(self);
                self.locals = locals;
            }
            other => other.visit_children_with(self),
        }
    }
}

/// Collects the names bound by a pattern, and the references in its type
/// annotations and default values.
struct BindingCollector<'a> {
    lowering: &'a Lowering<'a>,
    names: Vec<Ident>,
    refs: Vec<Node>,
}

impl Visit for BindingCollector<'_> {
    fn visit_binding_ident(&mut self, node: &swc_ecma_ast::BindingIdent) {
        self.names.push(self.lowering.ident(&node.id));
        if let Some(type_ann) = &node.type_ann {
            self.refs.extend(self.lowering.idents(type_ann.as_ref()));
        }
    }

    fn visit_expr(&mut self, node: &Expr) {
        self.refs.extend(self.lowering.idents(node));
    }
}

struct Lowering<'a> {
    parsed: &'a ParsedSource,
    file: FileId,
    comments: CommentIndex,
    resolve: &'a dyn Fn(&str) -> Option<String>,
}

impl Lowering<'_> {
    fn lower_item(&self, item: &ModuleItem, out: &mut Vec<Node>) {
        match item {
            ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => out.push(self.lower_import(import)),
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
                self.lower_decl(&export.decl, export.span, out)
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(export)) => {
                self.lower_default(export, out)
            }
            ModuleItem::Stmt(Stmt::Decl(decl)) => self.lower_decl(decl, decl.span(), out),
            other => out.extend(self.references(other)),
        }
    }

    fn ident(&self, id: &swc_ecma_ast::Ident) -> Ident {
        Ident::new(id.sym.to_string(), self.pos(id.span.lo))
    }

    fn pos(&self, pos: BytePos) -> SourcePos {
        SourcePos::new(self.file, self.parsed.offset(pos))
    }

    /// Identifiers of a declaration body, with its local bindings.
    fn idents<N: VisitWith<IdentCollector> + ?Sized>(&self, node: &N) -> Vec<Node> {
        self.collect(node, true)
    }

    /// Identifiers of top-level code that declares nothing, all as references.
    fn references<N: VisitWith<IdentCollector> + ?Sized>(&self, node: &N) -> Vec<Node> {
        self.collect(node, false)
    }

    fn collect<N: VisitWith<IdentCollector> + ?Sized>(&self, node: &N, locals: bool) -> Vec<Node> {
        let mut collector = IdentCollector {
            file: self.file,
            start: self.parsed.start_pos,
            locals,
            idents: Vec::new(),
        };
        node.visit_with(&mut collector);
        collector.idents
    }

    fn doc(&self, span: Span) -> Option<CommentGroup> {
        self.comments.doc_for(self.parsed.line(span.lo))
    }

    fn trailing(&self, span: Span) -> Option<CommentGroup> {
        self.comments
            .trailing_for(self.parsed.line(span.hi), self.parsed.offset(span.hi))
    }

    fn lower_decl(&self, decl: &Decl, span: Span, out: &mut Vec<Node>) {
        match decl {
            Decl::Fn(func) => out.push(Node::Func(FuncDecl {
                name: self.ident(&func.ident),
                doc: self.doc(span),
                body: self.idents(func.function.as_ref()),
            })),
            Decl::Class(class) => out.push(self.lower_class(&class.ident, &class.class, span)),
            Decl::TsInterface(interface) => out.push(self.lower_interface(interface, span)),
            Decl::TsTypeAlias(alias) => out.push(Node::Type(TypeSpec {
                name: self.ident(&alias.id),
                doc: self.doc(span),
                trailing: self.trailing(span),
                members: self.idents(alias.type_ann.as_ref()),
            })),
            Decl::TsEnum(decl) => out.push(self.lower_enum(decl, span)),
            Decl::Var(var) => out.push(self.lower_var(var, span)),
            other => out.extend(self.references(other)),
        }
    }

    fn lower_default(&self, export: &ExportDefaultDecl, out: &mut Vec<Node>) {
        match &export.decl {
            DefaultDecl::Fn(FnExpr {
                ident: Some(ident),
                function,
            }) => out.push(Node::Func(FuncDecl {
                name: self.ident(ident),
                doc: self.doc(export.span),
                body: self.idents(function.as_ref()),
            })),
            DefaultDecl::Class(ClassExpr {
                ident: Some(ident),
                class,
            }) => out.push(self.lower_class(ident, class, export.span)),
            DefaultDecl::TsInterfaceDecl(interface) => {
                out.push(self.lower_interface(interface, export.span))
            }
            _ => out.extend(self.references(export)),
        }
    }

    fn lower_import(&self, import: &ImportDecl) -> Node {
        let unit = import.src.value.as_str().and_then(|spec| (self.resolve)(spec));
        let specs = import
            .specifiers
            .iter()
            .map(|specifier| {
                let (local, imported) = match specifier {
                    ImportSpecifier::Named(named) => (
                        &named.local,
                        named
                            .imported
                            .as_ref()
                            .map(|i| match i {
                                ModuleExportName::Ident(ident) => ident.sym.to_string(),
                                ModuleExportName::Str(s) => s.value.to_string_lossy().to_string(),
                            })
                            .unwrap_or_else(|| named.local.sym.to_string()),
                    ),
                    ImportSpecifier::Default(default) => (&default.local, "default".to_string()),
                    ImportSpecifier::Namespace(ns) => (&ns.local, "*".to_string()),
                };
                Node::Import(ImportSpec {
                    name: self.ident(local),
                    imported,
                    unit: unit.clone(),
                    doc: None,
                    trailing: None,
                })
            })
            .collect();

        Node::Group(GroupDecl {
            doc: self.doc(import.span),
            specs,
        })
    }

    fn lower_class(&self, name: &swc_ecma_ast::Ident, class: &Class, span: Span) -> Node {
        let mut members = Vec::new();
        if let Some(super_class) = &class.super_class {
            members.extend(self.idents(super_class.as_ref()));
        }
        for implemented in &class.implements {
            members.extend(self.idents(implemented));
        }
        for member in &class.body {
            let (name, body) = match member {
                ClassMember::Method(method) => {
                    (prop_name(self, &method.key), self.idents(method.function.as_ref()))
                }
                ClassMember::ClassProp(prop) => {
                    let mut body = Vec::new();
                    if let Some(type_ann) = &prop.type_ann {
                        body.extend(self.idents(type_ann.as_ref()));
                    }
                    if let Some(value) = &prop.value {
                        body.extend(self.idents(value.as_ref()));
                    }
                    (prop_name(self, &prop.key), body)
                }
                other => (None, self.idents(other)),
            };
            match name {
                Some(name) => members.push(Node::Field(FieldSpec {
                    names: vec![name],
                    doc: self.doc(member.span()),
                    trailing: self.trailing(member.span()),
                    body,
                })),
                None => members.extend(body),
            }
        }

        Node::Type(TypeSpec {
            name: self.ident(name),
            doc: self.doc(span),
            trailing: None,
            members,
        })
    }

    fn lower_interface(&self, interface: &TsInterfaceDecl, span: Span) -> Node {
        let mut members = Vec::new();
        for extended in &interface.extends {
            members.extend(self.idents(extended));
        }
        for element in &interface.body.body {
            let (key, body) = match element {
                TsTypeElement::TsPropertySignature(prop) if !prop.computed => {
                    let body = prop
                        .type_ann
                        .as_ref()
                        .map(|t| self.idents(t.as_ref()))
                        .unwrap_or_default();
                    (Some(prop.key.as_ref()), body)
                }
                TsTypeElement::TsMethodSignature(method) if !method.computed => {
                    let mut body = Vec::new();
                    for param in &method.params {
                        body.extend(self.idents(param));
                    }
                    if let Some(type_ann) = &method.type_ann {
                        body.extend(self.idents(type_ann.as_ref()));
                    }
                    (Some(method.key.as_ref()), body)
                }
                other => (None, self.idents(other)),
            };
            match key {
                Some(Expr::Ident(ident)) => members.push(Node::Field(FieldSpec {
                    names: vec![self.ident(ident)],
                    doc: self.doc(element.span()),
                    trailing: self.trailing(element.span()),
                    body,
                })),
                _ => members.extend(body),
            }
        }

        Node::Type(TypeSpec {
            name: self.ident(&interface.id),
            doc: self.doc(span),
            trailing: None,
            members,
        })
    }

    fn lower_enum(&self, decl: &TsEnumDecl, span: Span) -> Node {
        let mut members = Vec::new();
        for member in &decl.members {
            let name = match &member.id {
                TsEnumMemberId::Ident(ident) => Some(self.ident(ident)),
                TsEnumMemberId::Str(s) => s
                    .value
                    .as_str()
                    .map(|value| Ident::new(value, self.pos(s.span.lo))),
            };
            let body = member
                .init
                .as_ref()
                .map(|init| self.idents(init.as_ref()))
                .unwrap_or_default();
            match name {
                Some(name) => members.push(Node::Field(FieldSpec {
                    names: vec![name],
                    doc: self.doc(member.span),
                    trailing: self.trailing(member.span),
                    body,
                })),
                None => members.extend(body),
            }
        }

        Node::Type(TypeSpec {
            name: self.ident(&decl.id),
            doc: self.doc(span),
            trailing: self.trailing(span),
            members,
        })
    }

    fn lower_var(&self, var: &VarDecl, span: Span) -> Node {
        let statement_line = self.parsed.line(span.lo);
        let specs = var
            .decls
            .iter()
            .map(|declarator| {
                let mut bindings = BindingCollector {
                    lowering: self,
                    names: Vec::new(),
                    refs: Vec::new(),
                };
                declarator.name.visit_with(&mut bindings);
                let mut body = bindings.refs;
                if let Some(init) = &declarator.init {
                    body.extend(self.idents(init.as_ref()));
                }
                // a declarator on its own line may carry its own doc
                let doc = if self.parsed.line(declarator.span.lo) == statement_line {
                    None
                } else {
                    self.doc(declarator.span)
                };
                Node::Value(ValueSpec {
                    names: bindings.names,
                    doc,
                    trailing: self.trailing(declarator.span),
                    body,
                })
            })
            .collect();

        Node::Group(GroupDecl {
            doc: self.doc(span),
            specs,
        })
    }
}

fn prop_name(lowering: &Lowering<'_>, key: &PropName) -> Option<Ident> {
    match key {
        PropName::Ident(ident) => Some(Ident::new(ident.sym.to_string(), lowering.pos(ident.span.lo))),
        PropName::Str(s) => s
            .value
            .as_str()
            .map(|value| Ident::new(value, lowering.pos(s.span.lo))),
        _ => None,
    }
}
