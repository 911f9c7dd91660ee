//! Directive comments.
//!
//! A directive is a structured annotation written in a source comment:
//!
//! ```text
//! // +gen:sample
//! // +gen:sample:field tag=json
//! // +foo:valid: 0 < $ && $ <= 10
//! // +foo:pkg=sample,baz +gen=foo
//! //tsgen:build linux,!test
//! ```
//!
//! `+foo:pkg=sample,baz` is parsed as command `foo:pkg` with argument
//! `sample,baz`. Directives must start the comment line, right after `//` and
//! at most one space.
//!
//! - [`parser`]: parses a single comment line
//! - [`block`]: splits a source body into unit-level and inline directives

pub mod block;
pub mod parser;

use std::ops::Deref;

pub use block::{BodyDirectives, parse_directives_from_body, split_directive_block};
pub use parser::{
    BUILD_SENTINEL, DirectiveError, has_start_directive, parse_directive, parse_directive_line,
};

use crate::core::xref::OccurrenceId;

/// One parsed directive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directive {
    /// Source text of the directive, e.g. `+foo:pkg:foo this is a string`.
    pub raw: String,
    /// Command, e.g. `foo:pkg`.
    pub cmd: String,
    /// Argument, e.g. `sample,baz`. May be empty.
    pub arg: String,
    /// Declaration the directive is attached to. Only the cross-reference
    /// index attaches directives; scanned ones are always `None`.
    pub item: Option<OccurrenceId>,
}

impl Directive {
    pub fn new(raw: &str, cmd: &str, arg: &str) -> Self {
        Self {
            raw: raw.to_string(),
            cmd: cmd.to_string(),
            arg: arg.to_string(),
            item: None,
        }
    }

    /// Whether the directive was read from the doc comment of a declaration.
    pub fn is_attached(&self) -> bool {
        self.item.is_some()
    }

    /// Split the argument on spaces, e.g. `+gen:sample -name=Alice DoSomething`.
    pub fn args(&self) -> Vec<&str> {
        self.arg.split_whitespace().collect()
    }

    pub(crate) fn attached_to(mut self, item: OccurrenceId) -> Self {
        self.item = Some(item);
        self
    }
}

impl std::fmt::Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Owned list of directives.
///
/// Every list handed to a plugin is a fresh clone, so nothing a plugin does
/// with it can reach the cached copies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives(Vec<Directive>);

impl Directives {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, directive: Directive) {
        self.0.push(directive);
    }

    /// First directive with exactly this command.
    pub fn get(&self, cmd: &str) -> Option<&Directive> {
        self.0.iter().find(|d| d.cmd == cmd)
    }

    /// Argument of the first directive with this command, or `""`.
    pub fn get_arg(&self, cmd: &str) -> &str {
        self.get(cmd).map(|d| d.arg.as_str()).unwrap_or("")
    }

    /// Directives whose command is `prefix` or one of its `:` sub-commands.
    ///
    /// `+gen:sample` and `gen:sample` both match `gen:sample`,
    /// `gen:sample:foo`, but not `gen:samples`.
    pub fn filter_by(&self, prefix: &str) -> Directives {
        let prefix = prefix.strip_prefix('+').unwrap_or(prefix);
        let prefix = prefix.strip_suffix(':').unwrap_or(prefix);
        self.0
            .iter()
            .filter(|d| matches_command(&d.cmd, prefix))
            .cloned()
            .collect()
    }

    pub fn into_vec(self) -> Vec<Directive> {
        self.0
    }
}

/// `cmd` equals `command` or starts with `command:`.
pub fn matches_command(cmd: &str, command: &str) -> bool {
    match cmd.strip_prefix(command) {
        Some(rest) => rest.is_empty() || rest.starts_with(':'),
        None => false,
    }
}

impl Deref for Directives {
    type Target = [Directive];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Directive>> for Directives {
    fn from(directives: Vec<Directive>) -> Self {
        Self(directives)
    }
}

impl FromIterator<Directive> for Directives {
    fn from_iter<I: IntoIterator<Item = Directive>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Directive> for Directives {
    fn extend<I: IntoIterator<Item = Directive>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Directives {
    type Item = Directive;
    type IntoIter = std::vec::IntoIter<Directive>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Directives {
    type Item = &'a Directive;
    type IntoIter = std::slice::Iter<'a, Directive>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
