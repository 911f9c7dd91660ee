//! Host-neutral syntax tree handed over by the loader.
//!
//! The loader lowers whatever its parser produces into these few node kinds,
//! which is all the cross-reference builder needs: declarations with their
//! comments, and every identifier occurrence in between.

use std::path::PathBuf;

/// Loader-assigned identity of a source file. The same file always gets the
/// same id within one load, even when several units contain it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// Byte offset of a token inside a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourcePos {
    pub file: FileId,
    pub offset: u32,
}

impl SourcePos {
    pub fn new(file: FileId, offset: u32) -> Self {
        Self { file, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub pos: SourcePos,
}

impl Ident {
    pub fn new(name: impl Into<String>, pos: SourcePos) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }
}

/// A run of comment lines with no blank line in between.
///
/// `lines` hold the comment content with the markers removed: `// hello`
/// becomes `hello`, `// +gen:sample` becomes `+gen:sample`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentGroup {
    /// Position of the first comment of the group; identifies the group.
    pub pos: SourcePos,
    pub lines: Vec<String>,
}

impl CommentGroup {
    pub fn new(pos: SourcePos, lines: Vec<String>) -> Self {
        Self { pos, lines }
    }

    /// Prose of the group: directive lines removed, surrounding blank lines
    /// trimmed, newline-terminated. Empty when nothing is left.
    pub fn text(&self) -> String {
        let prose: Vec<&str> = self
            .lines
            .iter()
            .map(|line| line.trim_end())
            .filter(|line| !is_directive_line(line))
            .collect();
        let start = prose.iter().position(|line| !line.is_empty());
        let end = prose.iter().rposition(|line| !line.is_empty());
        match (start, end) {
            (Some(start), Some(end)) => {
                let mut text = prose[start..=end].join("\n");
                text.push('\n');
                text
            }
            _ => String::new(),
        }
    }

    pub fn directive_lines(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .map(|line| line.as_str())
            .filter(|line| is_directive_line(line))
    }
}

/// Whether a marker-stripped comment line is a directive.
pub fn is_directive_line(line: &str) -> bool {
    line.starts_with('+') || line.starts_with("tsgen:")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Func(FuncDecl),
    Group(GroupDecl),
    Type(TypeSpec),
    Value(ValueSpec),
    Field(FieldSpec),
    Import(ImportSpec),
    Ident(Ident),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: Ident,
    pub doc: Option<CommentGroup>,
    pub body: Vec<Node>,
}

/// Several specs introduced by one statement, e.g. `const a = 1, b = 2;` or
/// an import declaration. The group's doc only applies to a lone spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDecl {
    pub doc: Option<CommentGroup>,
    pub specs: Vec<Node>,
}

/// Class, interface, type alias or enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub name: Ident,
    pub doc: Option<CommentGroup>,
    pub trailing: Option<CommentGroup>,
    pub members: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSpec {
    pub names: Vec<Ident>,
    pub doc: Option<CommentGroup>,
    pub trailing: Option<CommentGroup>,
    pub body: Vec<Node>,
}

/// Member of a type: class property or method, interface member, enum member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub names: Vec<Ident>,
    pub doc: Option<CommentGroup>,
    pub trailing: Option<CommentGroup>,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Local binding.
    pub name: Ident,
    /// Name exported by the source module, `default` or `*`.
    pub imported: String,
    /// Unit the module specifier resolved to, if it is a known unit.
    pub unit: Option<String>,
    pub doc: Option<CommentGroup>,
    pub trailing: Option<CommentGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxFile {
    pub id: FileId,
    pub path: PathBuf,
    pub nodes: Vec<Node>,
}
