use anyhow::{Result, anyhow};
use std::sync::Arc;
use swc_common::{
    BytePos, FileName, Globals, SourceMap,
    comments::{Comment, SingleThreadedComments},
};
use swc_ecma_ast::Module;
use swc_ecma_parser::{EsSyntax, Parser, StringInput, Syntax, TsSyntax};

/// Comments of a file, extracted from SingleThreadedComments so they can
/// outlive the parser and be sorted by position.
#[derive(Debug, Clone, Default)]
pub struct ExtractedComments {
    pub comments: Vec<Comment>,
}

impl ExtractedComments {
    /// Must be called before SingleThreadedComments is dropped.
    pub fn from_swc(comments: &SingleThreadedComments) -> Self {
        let (leading, trailing) = comments.borrow_all();
        let mut all: Vec<Comment> = leading
            .values()
            .chain(trailing.values())
            .flat_map(|cmts| cmts.iter().cloned())
            .collect();
        all.sort_by_key(|cmt| cmt.span.lo);
        all.dedup_by_key(|cmt| cmt.span.lo);
        Self { comments: all }
    }
}

pub struct ParsedSource {
    pub module: Module,
    pub source_map: Arc<SourceMap>,
    /// Position of the first byte of the file in `source_map`.
    pub start_pos: BytePos,
    pub comments: ExtractedComments,
}

impl ParsedSource {
    /// Byte offset of `pos` within the file.
    pub fn offset(&self, pos: BytePos) -> u32 {
        pos.0.saturating_sub(self.start_pos.0)
    }

    /// 1-based line of `pos`.
    pub fn line(&self, pos: BytePos) -> usize {
        self.source_map.lookup_char_pos(pos).line
    }
}

/// Parse TypeScript or JavaScript source code into an AST.
///
/// `.js`/`.jsx` files use the ECMAScript syntax with JSX enabled, everything
/// else is parsed as TSX.
pub fn parse_ts_source(
    code: String,
    file_path: &str,
    source_map: Arc<SourceMap>,
) -> Result<ParsedSource> {
    use swc_common::GLOBALS;

    GLOBALS.set(&Globals::new(), || {
        let source_file = source_map.new_source_file(FileName::Real(file_path.into()).into(), code);

        let syntax = if file_path.ends_with(".js") || file_path.ends_with(".jsx") {
            Syntax::Es(EsSyntax {
                jsx: true,
                ..Default::default()
            })
        } else {
            Syntax::Typescript(TsSyntax {
                tsx: file_path.ends_with(".tsx"),
                ..Default::default()
            })
        };

        let comments = SingleThreadedComments::default();
        let mut parser = Parser::new(syntax, StringInput::from(&*source_file), Some(&comments));

        let module = parser
            .parse_module()
            .map_err(|e| anyhow!("Failed to parse {}: {:?}", file_path, e))?;

        let extracted_comments = ExtractedComments::from_swc(&comments);

        Ok(ParsedSource {
            module,
            start_pos: source_file.start_pos,
            source_map,
            comments: extracted_comments,
        })
    })
}
