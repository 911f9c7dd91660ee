//! Single-line directive parser.

use thiserror::Error;

use super::Directive;

/// Build-constraint sentinel, e.g. `//tsgen:build linux,!test`.
pub const BUILD_SENTINEL: &str = "tsgen:build";

const START_DIRECTIVES: [&str; 3] = ["//+", "// +", "//tsgen:"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("invalid directive ({0})")]
    Invalid(String),
    #[error("invalid directive, commands should contain - instead of _ ({0})")]
    Underscore(String),
}

/// Whether a source line starts a directive comment.
pub fn has_start_directive(line: &str) -> bool {
    START_DIRECTIVES.iter().any(|start| line.starts_with(start))
}

/// Parse a line holding one directive.
///
/// When the line carries several `=` directives (`+a=1 +b=2`), the first one
/// is returned; use [`parse_directive_line`] to get all of them.
pub fn parse_directive(line: &str) -> Result<Directive, DirectiveError> {
    let mut directives = parse_directive_line(line)?;
    Ok(directives.swap_remove(0))
}

/// Parse every directive on a comment line.
///
/// The returned list is never empty.
pub fn parse_directive_line(line: &str) -> Result<Vec<Directive>, DirectiveError> {
    let text = strip_comment_marker(line);
    if text == BUILD_SENTINEL || text.starts_with("tsgen:build ") {
        let arg = text[BUILD_SENTINEL.len()..].trim();
        return Ok(vec![Directive::new(text, BUILD_SENTINEL, arg)]);
    }
    PlusParser::new(text).parse()
}

fn strip_comment_marker(line: &str) -> &str {
    let line = line.trim();
    line.strip_prefix("//").unwrap_or(line).trim()
}

/// Cursor over the plus-directive grammar.
///
/// Each step consumes one `+command[sep arg]` segment. Only `=` arguments can
/// be followed by another segment on the same line.
struct PlusParser<'a> {
    line: &'a str,
    pos: usize,
    parsed: Vec<Directive>,
}

enum Step {
    Done,
    Continue(usize),
}

impl<'a> PlusParser<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            line,
            pos: 0,
            parsed: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<Directive>, DirectiveError> {
        loop {
            match self.segment()? {
                Step::Done => return Ok(self.parsed),
                Step::Continue(next) => self.pos = next,
            }
        }
    }

    fn invalid(&self) -> DirectiveError {
        DirectiveError::Invalid(self.line.to_string())
    }

    fn segment(&mut self) -> Result<Step, DirectiveError> {
        let segment = &self.line[self.pos..];
        let body = segment.strip_prefix('+').ok_or_else(|| self.invalid())?;
        let cmd_len = command_len(body);
        if cmd_len == 0 {
            return Err(self.invalid());
        }
        let cmd = &body[..cmd_len];
        let remain = &body[cmd_len..];

        match remain.chars().next() {
            None => {
                self.parsed.push(Directive::new(segment, cmd, ""));
                Ok(Step::Done)
            }
            Some(' ' | '\t') => {
                self.parsed.push(Directive::new(segment, cmd, remain.trim()));
                Ok(Step::Done)
            }
            Some(':') => {
                let arg = remain[1..].trim();
                if arg.is_empty() {
                    return Err(self.invalid());
                }
                self.parsed.push(Directive::new(segment, cmd, arg));
                Ok(Step::Done)
            }
            Some('=') => {
                let value = &remain[1..];
                let end = value.find([' ', '\t']).unwrap_or(value.len());
                let arg = &value[..end];
                if arg.is_empty() {
                    return Err(self.invalid());
                }
                // "+" + cmd + "=" + arg
                let raw_len = cmd_len + arg.len() + 2;
                self.parsed
                    .push(Directive::new(&segment[..raw_len], cmd, arg));

                let tail = &value[end..];
                let next = tail.trim_start();
                if next.is_empty() {
                    return Ok(Step::Done);
                }
                Ok(Step::Continue(self.line.len() - next.len()))
            }
            Some('_') => Err(DirectiveError::Underscore(self.line.to_string())),
            Some(_) => Err(self.invalid()),
        }
    }
}

/// Length of the longest prefix matching `[a-z]([a-z0-9.:-]*[a-z0-9])?`.
fn command_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    if !bytes.first().is_some_and(|b| b.is_ascii_lowercase()) {
        return 0;
    }
    let mut end = 1 + bytes[1..]
        .iter()
        .take_while(|&&b| b.is_ascii_lowercase() || b.is_ascii_digit() || b".:-".contains(&b))
        .count();
    while end > 1 && b".:-".contains(&bytes[end - 1]) {
        end -= 1;
    }
    end
}
