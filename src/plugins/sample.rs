use std::io::Write;

use anyhow::Result;

use crate::core::{
    filter::{CommandFilter, FilterContext},
    generate::{GenContext, GeneratingUnit},
    plugin::Plugin,
    xref::OccurrenceKind,
};

const COMMAND: &str = "gen:sample";
/// `+gen:sample:ref <unit>...` re-exports other units from the generated file.
const REF_COMMAND: &str = "gen:sample:ref";

/// Writes a `declarations` table for every unit marked `+gen:sample`.
///
/// ```text
/// // +gen:sample
/// // +gen:sample:ref app/models
///
/// /** A greeting. */
/// export function hello() {}
/// ```
pub struct SamplePlugin;

impl Plugin for SamplePlugin {
    fn name(&self) -> &str {
        "sample"
    }

    fn filter(&self, ctx: &mut FilterContext) -> Result<()> {
        CommandFilter::new(COMMAND).filter(ctx)
    }

    fn generate(&self, ctx: &mut GenContext) -> Result<()> {
        ctx.for_each_unit(generate_unit)
    }
}

fn generate_unit(ctx: &mut GenContext, unit: &GeneratingUnit) -> Result<()> {
    let mut entries = Vec::new();
    for object in ctx.objects(&unit.path) {
        if object.kind == OccurrenceKind::Import {
            continue;
        }
        let comment = ctx.comment(object.occurrence).cloned().unwrap_or_default();
        let directives: Vec<String> = comment.directives.iter().map(|d| d.raw.clone()).collect();
        entries.push(render_entry(
            &object.name,
            object.kind.as_str(),
            comment.text().trim_end(),
            &directives,
        )?);
    }

    let id = ctx.printer(&unit.path)?;

    let mut exports = Vec::new();
    for target in unit
        .directives
        .iter()
        .filter(|d| d.cmd == REF_COMMAND)
        .flat_map(|d| d.args())
    {
        let alias = ctx.qualify(id, target)?;
        if alias.is_empty() {
            ctx.logger()
                .warn(format!("{} references its own unit", unit.path));
            continue;
        }
        exports.push(alias);
    }

    if entries.is_empty() && exports.is_empty() {
        return Ok(());
    }

    let out = ctx.out(id)?;
    if !entries.is_empty() {
        writeln!(out, "export const declarations = [")?;
        for entry in &entries {
            writeln!(out, "  {},", entry)?;
        }
        writeln!(out, "];")?;
    }
    if !exports.is_empty() {
        if !entries.is_empty() {
            writeln!(out)?;
        }
        writeln!(out, "export {{ {} }};", exports.join(", "))?;
    }
    Ok(())
}

fn render_entry(name: &str, kind: &str, doc: &str, directives: &[String]) -> Result<String> {
    Ok(format!(
        "{{ name: {}, kind: {}, doc: {}, directives: {} }}",
        serde_json::to_string(name)?,
        serde_json::to_string(kind)?,
        serde_json::to_string(doc)?,
        serde_json::to_string(directives)?
    ))
}
