//! `//tsgen:build` constraints.
//!
//! A constraint line holds space-separated alternatives, each a
//! comma-separated list of tags that must all hold. `!tag` negates a tag:
//!
//! ```text
//! //tsgen:build linux,!test darwin
//! ```
//!
//! means `(linux AND NOT test) OR darwin`. Only constraint lines in the
//! file header (before the first line of code) count, and every one of them
//! must be satisfied. The `tsgen` tag is always set.

use std::collections::BTreeSet;

use crate::core::directive::{BUILD_SENTINEL, has_start_directive, parse_directive};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTags {
    active: BTreeSet<String>,
}

impl Default for BuildTags {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl BuildTags {
    pub fn new(tags: &[String]) -> Self {
        let mut active: BTreeSet<String> = tags.iter().cloned().collect();
        active.insert("tsgen".to_string());
        Self { active }
    }

    pub fn is_set(&self, tag: &str) -> bool {
        self.active.contains(tag)
    }

    /// Evaluate one constraint expression.
    pub fn satisfies(&self, expr: &str) -> bool {
        let expr = expr.trim();
        if expr.is_empty() {
            return true;
        }
        expr.split_whitespace().any(|alternative| {
            alternative.split(',').all(|term| match term.strip_prefix('!') {
                Some(tag) => !self.is_set(tag),
                None => self.is_set(term),
            })
        })
    }

    /// Whether a file with this content takes part in the build.
    pub fn allows(&self, source: &str) -> bool {
        for line in source.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !trimmed.starts_with("//") {
                break;
            }
            if !has_start_directive(line) {
                continue;
            }
            if let Ok(directive) = parse_directive(line)
                && directive.cmd == BUILD_SENTINEL
                && !self.satisfies(&directive.arg)
            {
                return false;
            }
        }
        true
    }
}
