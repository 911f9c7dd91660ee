use std::{io::Write, sync::Arc};

use anyhow::Result;
use pretty_assertions::assert_eq;
use tsgen::core::{
    filter::{CommandFilter, FilterContext},
    generate::GenContext,
    plugin::Plugin,
};

use crate::{Project, Recorder, plugins, run};

/// Includes the units carrying its command and writes its name into each.
struct Marker {
    name: &'static str,
    command: &'static str,
}

impl Plugin for Marker {
    fn name(&self) -> &str {
        self.name
    }

    fn filter(&self, ctx: &mut FilterContext) -> Result<()> {
        CommandFilter::new(self.command).filter_all(ctx)
    }

    fn generate(&self, ctx: &mut GenContext) -> Result<()> {
        ctx.for_each_unit(|ctx, unit| {
            let id = ctx.printer(&unit.path)?;
            let name = ctx.plugin_name().to_string();
            writeln!(ctx.out(id)?, "export const by = {:?};", name)?;
            Ok(())
        })
    }
}

#[test]
fn test_plugins_have_independent_working_sets() -> Result<()> {
    let project = Project::new()?;
    project.write_file("a/index.ts", "// +gen:first\n\nexport const a = 1;\n")?;
    project.write_file("b/index.ts", "// +gen:second:field\nexport const b = 1;\n")?;
    project.write_file(
        "both/index.ts",
        "// +gen:first\n// +gen:second\n\nexport const both = 1;\n",
    )?;

    let config = plugins(vec![
        Arc::new(Marker {
            name: "first",
            command: "gen:first",
        }),
        Arc::new(Marker {
            name: "second",
            command: "+gen:second",
        }),
    ]);
    let report = run(&project, config, &["./..."]).report();

    assert_eq!(
        report.generated,
        vec![
            project.path("a/zz_generated.first.ts"),
            project.path("b/zz_generated.second.ts"),
            project.path("both/zz_generated.first.ts"),
            project.path("both/zz_generated.second.ts"),
        ]
    );
    assert!(
        project
            .read_file("b/zz_generated.second.ts")?
            .contains("export const by = \"second\";")
    );
    Ok(())
}

/// Includes a fixed unit, optionally requesting another one for analysis only.
struct Fixed {
    include: &'static str,
    parse: Option<&'static str>,
    seen: Recorder,
}

impl Plugin for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn filter(&self, ctx: &mut FilterContext) -> Result<()> {
        for unit in ctx.scanned_units() {
            self.seen.push(format!("scanned {}", unit.path));
        }
        ctx.include_unit(self.include)?;
        if let Some(parse) = self.parse {
            ctx.parse_units(&[parse])?;
        }
        Ok(())
    }

    fn generate(&self, ctx: &mut GenContext) -> Result<()> {
        for unit in ctx.generating_units() {
            self.seen.push(format!("generating {}", unit.path));
        }
        if let Some(parse) = self.parse {
            for object in ctx.objects(parse) {
                self.seen.push(format!("object {}", object.name));
            }
        }
        ctx.for_each_unit(|ctx, unit| {
            let id = ctx.printer(&unit.path)?;
            writeln!(ctx.out(id)?, "export {{}};")?;
            Ok(())
        })
    }
}

#[test]
fn test_include_outside_patterns() -> Result<()> {
    let project = Project::new()?;
    project.write_file("one/index.ts", "export const one = 1;\n")?;
    project.write_file("two/index.ts", "export const two = 2;\n")?;

    let seen = Recorder::default();
    let plugin = Fixed {
        include: "root/two",
        parse: None,
        seen: seen.clone(),
    };
    let report = run(&project, plugins(vec![Arc::new(plugin)]), &["./one"]).report();

    assert_eq!(report.included, vec!["root/two"]);
    assert_eq!(
        report.generated,
        vec![project.path("two/zz_generated.fixed.ts")]
    );
    assert_eq!(seen.entries(), vec!["scanned root/one", "generating root/two"]);
    Ok(())
}

#[test]
fn test_parsed_units_are_not_generated() -> Result<()> {
    let project = Project::new()?;
    project.write_file("app/index.ts", "import { Dep } from \"../dep\";\n")?;
    project.write_file(
        "dep/index.ts",
        "export interface Dep {}\nexport function makeDep() {}\n",
    )?;

    let seen = Recorder::default();
    let plugin = Fixed {
        include: "root/app",
        parse: Some("root/dep"),
        seen: seen.clone(),
    };
    let report = run(&project, plugins(vec![Arc::new(plugin)]), &["./app"]).report();

    assert_eq!(
        seen.entries(),
        vec![
            "scanned root/app",
            "generating root/app",
            "object Dep",
            "object makeDep",
        ]
    );
    assert_eq!(
        report.generated,
        vec![project.path("app/zz_generated.fixed.ts")]
    );
    assert!(!project.exists("dep/zz_generated.fixed.ts"));
    Ok(())
}

#[test]
fn test_included_unit_that_does_not_exist() -> Result<()> {
    let project = Project::new()?;
    project.write_file("index.ts", "export const a = 1;\n")?;

    let plugin = Fixed {
        include: "root/ghost",
        parse: None,
        seen: Recorder::default(),
    };
    let run = run(&project, plugins(vec![Arc::new(plugin)]), &["./..."]);

    assert!(run.log.contains("unit root/ghost included by fixed not found"));
    assert!(run.report().generated.is_empty());
    Ok(())
}

/// Includes every scanned unit below a pattern, recording their imports.
struct Subtree {
    pattern: &'static str,
    seen: Recorder,
}

impl Plugin for Subtree {
    fn name(&self) -> &str {
        "subtree"
    }

    fn filter(&self, ctx: &mut FilterContext) -> Result<()> {
        for unit in ctx.units_matching(self.pattern) {
            let imports: Vec<_> = unit.imports.iter().map(String::as_str).collect();
            self.seen
                .push(format!("{} imports [{}]", unit.path, imports.join(", ")));
            ctx.include_unit(&unit.path)?;
        }
        Ok(())
    }

    fn generate(&self, ctx: &mut GenContext) -> Result<()> {
        ctx.for_each_unit(|ctx, unit| {
            let id = ctx.printer(&unit.path)?;
            writeln!(ctx.out(id)?, "export {{}};")?;
            Ok(())
        })
    }
}

#[test]
fn test_include_units_matching_a_pattern() -> Result<()> {
    let project = Project::new()?;
    project.write_file("a/index.ts", "import { b } from \"../b\";\nimport { c } from \"./c\";\n")?;
    project.write_file("a/c/index.ts", "export const c = 1;\n")?;
    project.write_file("b/index.ts", "export const b = 1;\n")?;

    let seen = Recorder::default();
    let plugin = Subtree {
        pattern: "root/a/...",
        seen: seen.clone(),
    };
    let report = run(&project, plugins(vec![Arc::new(plugin)]), &["./..."]).report();

    assert_eq!(
        seen.entries(),
        vec!["root/a imports [root/a/c, root/b]", "root/a/c imports []"]
    );
    assert_eq!(report.included, vec!["root/a", "root/a/c"]);
    assert_eq!(
        report.generated,
        vec![
            project.path("a/c/zz_generated.subtree.ts"),
            project.path("a/zz_generated.subtree.ts"),
        ]
    );
    Ok(())
}
