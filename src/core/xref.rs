//! Cross-reference index.
//!
//! Every identifier occurrence of the analyzed units gets an [`OccurrenceId`].
//! Declaring occurrences carry the doc comment, trailing comment and
//! directives written above them; reference occurrences are linked by name to
//! the declaration they use. Parameters and locals of the enclosing bodies
//! come first, then the top-level names of the unit, then its imports.
//!
//! A position visited twice (the same file reached from two units) maps to
//! the same occurrence. Its comments are merged rather than overwritten, and
//! the conflict is logged.

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use crate::core::{
    directive::{Directives, parse_directive_line},
    loader::LoadedUnit,
    logging::Logger,
    syntax::{CommentGroup, FileId, Ident, Node, SourcePos},
};

/// Arena index of an identifier occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OccurrenceId(u32);

impl OccurrenceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceKind {
    Func,
    Type,
    Value,
    Field,
    Import,
    Reference,
}

impl OccurrenceKind {
    pub fn is_declaration(self) -> bool {
        self != OccurrenceKind::Reference
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OccurrenceKind::Func => "func",
            OccurrenceKind::Type => "type",
            OccurrenceKind::Value => "value",
            OccurrenceKind::Field => "field",
            OccurrenceKind::Import => "import",
            OccurrenceKind::Reference => "reference",
        }
    }
}

/// Documentation bundle of a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    pub doc: Option<CommentGroup>,
    pub trailing: Option<CommentGroup>,
    pub directives: Directives,
}

impl Comment {
    /// Doc comment prose without directive lines.
    pub fn text(&self) -> String {
        self.doc.as_ref().map(CommentGroup::text).unwrap_or_default()
    }

    pub fn trailing_text(&self) -> String {
        self.trailing
            .as_ref()
            .map(CommentGroup::text)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.is_none() && self.trailing.is_none() && self.directives.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Path of the owning unit.
    pub unit: String,
    pub comment: Comment,
}

#[derive(Debug, Clone)]
pub struct Occurrence {
    pub id: OccurrenceId,
    pub name: String,
    pub pos: SourcePos,
    pub kind: OccurrenceKind,
    pub declaration: Declaration,
    /// Declaring occurrence a reference resolved to.
    pub target: Option<OccurrenceId>,
}

/// Top-level declaration of a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub name: String,
    pub kind: OccurrenceKind,
    pub occurrence: OccurrenceId,
}

/// Read-only cross-reference table over the analyzed units.
#[derive(Debug, Default)]
pub struct XrefIndex {
    occurrences: Vec<Occurrence>,
    by_pos: HashMap<SourcePos, OccurrenceId>,
    objects: BTreeMap<String, Vec<Object>>,
    files: HashMap<FileId, PathBuf>,
}

impl XrefIndex {
    /// Index every unit whose path starts with `namespace`.
    pub fn build(units: &[LoadedUnit], namespace: &str, logger: &Logger) -> Self {
        let mut builder = Builder::new(logger);
        for unit in units.iter().filter(|u| u.path.starts_with(namespace)) {
            for file in &unit.files {
                builder.files.insert(file.id, file.path.clone());
                builder.visit(&unit.path, &file.nodes, Scope::TopLevel, None);
            }
        }
        builder.link();
        builder.finish()
    }

    pub fn occurrence(&self, id: OccurrenceId) -> Option<&Occurrence> {
        self.occurrences.get(id.index())
    }

    pub fn occurrence_at(&self, file: FileId, offset: u32) -> Option<OccurrenceId> {
        self.by_pos.get(&SourcePos::new(file, offset)).copied()
    }

    /// Declaring occurrence for `id`: itself for a declaration, the linked
    /// declaration for a resolved reference, `None` otherwise.
    pub fn resolve(&self, id: OccurrenceId) -> Option<&Occurrence> {
        let occ = self.occurrence(id)?;
        if occ.kind.is_declaration() {
            return Some(occ);
        }
        occ.target.and_then(|target| self.occurrence(target))
    }

    /// Declaration an occurrence refers to. Unresolved references get their
    /// own bare declaration.
    pub fn declaration(&self, id: OccurrenceId) -> Option<&Declaration> {
        self.resolve(id)
            .or_else(|| self.occurrence(id))
            .map(|occ| &occ.declaration)
    }

    pub fn comment(&self, id: OccurrenceId) -> Option<&Comment> {
        self.declaration(id).map(|decl| &decl.comment)
    }

    /// Cloned directives of the declaration, empty when there are none.
    pub fn directives(&self, id: OccurrenceId) -> Directives {
        self.comment(id)
            .map(|comment| comment.directives.clone())
            .unwrap_or_default()
    }

    pub fn unit_of(&self, id: OccurrenceId) -> Option<&str> {
        self.declaration(id).map(|decl| decl.unit.as_str())
    }

    /// Top-level declarations of a unit, sorted by name.
    pub fn objects(&self, unit: &str) -> &[Object] {
        self.objects.get(unit).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn object_by_name(&self, unit: &str, name: &str) -> Option<&Object> {
        self.objects(unit).iter().find(|obj| obj.name == name)
    }

    pub fn file_path(&self, file: FileId) -> Option<&Path> {
        self.files.get(&file).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scope {
    TopLevel,
    Nested,
}

struct ImportBinding {
    unit: Option<String>,
    imported: String,
    occurrence: OccurrenceId,
}

struct Builder<'a> {
    logger: &'a Logger,
    occurrences: Vec<Occurrence>,
    by_pos: HashMap<SourcePos, OccurrenceId>,
    // comment groups already folded into each entry
    merged: HashMap<OccurrenceId, Vec<SourcePos>>,
    top_level: HashMap<String, BTreeMap<String, OccurrenceId>>,
    imports: HashMap<String, HashMap<String, ImportBinding>>,
    // local bindings of the enclosing declaration bodies, innermost last
    scopes: Vec<HashMap<String, OccurrenceId>>,
    files: HashMap<FileId, PathBuf>,
}

impl<'a> Builder<'a> {
    fn new(logger: &'a Logger) -> Self {
        Self {
            logger,
            occurrences: Vec::new(),
            by_pos: HashMap::new(),
            merged: HashMap::new(),
            top_level: HashMap::new(),
            imports: HashMap::new(),
            scopes: Vec::new(),
            files: HashMap::new(),
        }
    }

    fn visit(&mut self, unit: &str, nodes: &[Node], scope: Scope, group_doc: Option<&CommentGroup>) {
        for node in nodes {
            self.visit_node(unit, node, scope, group_doc);
        }
    }

    fn visit_node(
        &mut self,
        unit: &str,
        node: &Node,
        scope: Scope,
        group_doc: Option<&CommentGroup>,
    ) {
        match node {
            Node::Func(func) => {
                let id = self.declare(unit, &func.name, OccurrenceKind::Func, func.doc.as_ref(), None);
                self.export(unit, &func.name, id, scope);
                self.enter(unit, &func.body);
            }
            Node::Group(group) => {
                let doc = match group.specs.as_slice() {
                    [_] => group.doc.as_ref(),
                    _ => None,
                };
                self.visit(unit, &group.specs, scope, doc);
            }
            Node::Type(spec) => {
                let doc = spec.doc.as_ref().or(group_doc);
                let id = self.declare(unit, &spec.name, OccurrenceKind::Type, doc, spec.trailing.as_ref());
                self.export(unit, &spec.name, id, scope);
                self.enter(unit, &spec.members);
            }
            Node::Value(spec) => {
                let doc = spec.doc.as_ref().or(group_doc);
                for name in &spec.names {
                    let id = self.declare(unit, name, OccurrenceKind::Value, doc, spec.trailing.as_ref());
                    self.export(unit, name, id, scope);
                }
                self.enter(unit, &spec.body);
            }
            Node::Field(spec) => {
                for name in &spec.names {
                    self.declare(unit, name, OccurrenceKind::Field, spec.doc.as_ref(), spec.trailing.as_ref());
                }
                self.enter(unit, &spec.body);
            }
            Node::Import(spec) => {
                let doc = spec.doc.as_ref().or(group_doc);
                let id = self.declare(unit, &spec.name, OccurrenceKind::Import, doc, spec.trailing.as_ref());
                self.imports.entry(unit.to_string()).or_default().insert(
                    spec.name.name.clone(),
                    ImportBinding {
                        unit: spec.unit.clone(),
                        imported: spec.imported.clone(),
                        occurrence: id,
                    },
                );
            }
            Node::Ident(ident) => self.reference(unit, ident),
        }
    }

    /// Visit a declaration body in a new scope. Local values and functions
    /// are bound before the body is visited, so earlier references see them.
    fn enter(&mut self, unit: &str, nodes: &[Node]) {
        let mut locals = HashMap::new();
        for node in nodes {
            match node {
                Node::Func(func) => {
                    let id = self.declare(unit, &func.name, OccurrenceKind::Func, func.doc.as_ref(), None);
                    locals.entry(func.name.name.clone()).or_insert(id);
                }
                Node::Value(spec) => {
                    for name in &spec.names {
                        let id = self.declare(
                            unit,
                            name,
                            OccurrenceKind::Value,
                            spec.doc.as_ref(),
                            spec.trailing.as_ref(),
                        );
                        locals.entry(name.name.clone()).or_insert(id);
                    }
                }
                _ => {}
            }
        }
        self.scopes.push(locals);
        self.visit(unit, nodes, Scope::Nested, None);
        self.scopes.pop();
    }

    fn export(&mut self, unit: &str, name: &Ident, id: OccurrenceId, scope: Scope) {
        if scope == Scope::TopLevel {
            self.top_level
                .entry(unit.to_string())
                .or_default()
                .entry(name.name.clone())
                .or_insert(id);
        }
    }

    fn declare(
        &mut self,
        unit: &str,
        name: &Ident,
        kind: OccurrenceKind,
        doc: Option<&CommentGroup>,
        trailing: Option<&CommentGroup>,
    ) -> OccurrenceId {
        if let Some(&id) = self.by_pos.get(&name.pos) {
            self.merge(id, unit, doc, trailing);
            return id;
        }

        let id = OccurrenceId(self.occurrences.len() as u32);
        let directives = doc
            .map(|doc| doc_directives(doc, id, self.logger))
            .unwrap_or_default();
        let merged = doc.iter().chain(trailing.iter()).map(|g| g.pos).collect();
        self.merged.insert(id, merged);
        self.push(Occurrence {
            id,
            name: name.name.clone(),
            pos: name.pos,
            kind,
            declaration: Declaration {
                unit: unit.to_string(),
                comment: Comment {
                    doc: doc.cloned(),
                    trailing: trailing.cloned(),
                    directives,
                },
            },
            target: None,
        })
    }

    fn reference(&mut self, unit: &str, ident: &Ident) {
        if let Some(&id) = self.by_pos.get(&ident.pos) {
            self.check_unit(id, unit);
            return;
        }
        let target = self
            .scopes
            .iter()
            .rev()
            .find_map(|locals| locals.get(&ident.name))
            .copied();
        let id = OccurrenceId(self.occurrences.len() as u32);
        self.push(Occurrence {
            id,
            name: ident.name.clone(),
            pos: ident.pos,
            kind: OccurrenceKind::Reference,
            declaration: Declaration {
                unit: unit.to_string(),
                comment: Comment::default(),
            },
            target,
        });
    }

    fn push(&mut self, occ: Occurrence) -> OccurrenceId {
        let id = occ.id;
        self.by_pos.insert(occ.pos, id);
        self.occurrences.push(occ);
        id
    }

    fn check_unit(&self, id: OccurrenceId, unit: &str) {
        let occ = &self.occurrences[id.index()];
        if occ.declaration.unit != unit {
            self.logger.warn(format!(
                "{} is declared in {} but was also reached from {}",
                occ.name, occ.declaration.unit, unit
            ));
        }
    }

    fn merge(
        &mut self,
        id: OccurrenceId,
        unit: &str,
        doc: Option<&CommentGroup>,
        trailing: Option<&CommentGroup>,
    ) {
        self.check_unit(id, unit);

        let merged = self.merged.entry(id).or_default();
        let doc = doc.filter(|g| !merged.contains(&g.pos));
        let trailing = trailing.filter(|g| !merged.contains(&g.pos));
        merged.extend(doc.iter().chain(trailing.iter()).map(|g| g.pos));

        let directives = doc
            .map(|doc| doc_directives(doc, id, self.logger))
            .unwrap_or_default();
        let comment = &mut self.occurrences[id.index()].declaration.comment;
        let mut conflicting = false;
        if let Some(doc) = doc {
            conflicting |= append_group(&mut comment.doc, doc);
            comment.directives.extend(directives);
        }
        if let Some(trailing) = trailing {
            conflicting |= append_group(&mut comment.trailing, trailing);
        }

        if conflicting {
            let occ = &self.occurrences[id.index()];
            self.logger.warn(format!(
                "conflicting comments for {} in {}",
                occ.name, occ.declaration.unit
            ));
        }
    }

    fn link(&mut self) {
        for idx in 0..self.occurrences.len() {
            let occ = &self.occurrences[idx];
            if occ.kind != OccurrenceKind::Reference || occ.target.is_some() {
                continue;
            }
            let target = self.lookup(&occ.declaration.unit, &occ.name);
            self.occurrences[idx].target = target;
        }
    }

    fn lookup(&self, unit: &str, name: &str) -> Option<OccurrenceId> {
        if let Some(&id) = self.top_level.get(unit).and_then(|names| names.get(name)) {
            return Some(id);
        }
        let binding = self.imports.get(unit)?.get(name)?;
        let exported = binding
            .unit
            .as_deref()
            .and_then(|target| self.top_level.get(target))
            .and_then(|names| names.get(&binding.imported))
            .copied();
        Some(exported.unwrap_or(binding.occurrence))
    }

    fn finish(self) -> XrefIndex {
        let objects = self
            .top_level
            .into_iter()
            .map(|(unit, names)| {
                let objects = names
                    .into_iter()
                    .map(|(name, id)| Object {
                        name,
                        kind: self.occurrences[id.index()].kind,
                        occurrence: id,
                    })
                    .collect();
                (unit, objects)
            })
            .collect();

        XrefIndex {
            occurrences: self.occurrences,
            by_pos: self.by_pos,
            objects,
            files: self.files,
        }
    }
}

/// Fold `group` into `slot`. Returns whether an earlier group was already there.
fn append_group(slot: &mut Option<CommentGroup>, group: &CommentGroup) -> bool {
    match slot {
        Some(existing) => {
            existing.lines.extend(group.lines.iter().cloned());
            true
        }
        None => {
            *slot = Some(group.clone());
            false
        }
    }
}

fn doc_directives(doc: &CommentGroup, item: OccurrenceId, logger: &Logger) -> Directives {
    let mut directives = Directives::new();
    for line in doc.directive_lines() {
        match parse_directive_line(line) {
            Ok(parsed) => directives.extend(parsed.into_iter().map(|d| d.attached_to(item))),
            Err(err) => logger.warn(err),
        }
    }
    directives
}
