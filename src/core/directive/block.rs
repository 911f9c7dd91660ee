//! Splitting a block of lines into unit-level and inline directives.
//!
//! Directive lines that are directly followed by a blank line (or the end of
//! the block) belong to the enclosing unit or declaration:
//!
//! ```ts
//! // +gen:sample
//! // +gen:sample:name Alice
//!
//! export const value = 1;
//! ```
//!
//! Directive lines directly followed by anything else are inline directives,
//! attached to whatever comes next:
//!
//! ```ts
//! // +gen:sample
//! export const value = 1;
//! ```
//!
//! Unit filtering only consults unit-level directives by default.

use super::{Directive, DirectiveError, Directives, has_start_directive, parse_directive_line};

/// Directives collected from one block of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyDirectives {
    pub directives: Directives,
    pub inline: Directives,
    /// Lines that looked like directives but failed to parse. They are not
    /// part of either list.
    pub errors: Vec<DirectiveError>,
}

/// Split a source file body, where directive lines start with `//+`, `// +`
/// or `//tsgen:` at the first column.
pub fn parse_directives_from_body(body: &str) -> BodyDirectives {
    split_lines(body, has_start_directive)
}

/// Split comment text whose markers were already removed, where directive
/// lines start with `+`.
pub fn split_directive_block(text: &str) -> BodyDirectives {
    split_lines(text, |line| line.starts_with('+'))
}

fn split_lines(text: &str, is_directive: impl Fn(&str) -> bool) -> BodyDirectives {
    let lines: Vec<&str> = text.lines().collect();
    let mut result = BodyDirectives::default();
    let mut pending: Vec<Directive> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if !is_directive(line) {
            continue;
        }
        match parse_directive_line(line) {
            Ok(directives) => pending.extend(directives),
            Err(err) => result.errors.push(err),
        }

        match lines.get(idx + 1) {
            // still inside a run of directive lines
            Some(next) if is_directive(next) => {}
            Some(next) if !next.trim().is_empty() => result.inline.extend(pending.drain(..)),
            _ => result.directives.extend(pending.drain(..)),
        }
    }
    result.directives.extend(pending);
    result
}
