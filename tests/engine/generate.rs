use std::{io::Write, sync::Arc};

use anyhow::{Result, bail};
use pretty_assertions::assert_eq;
use tsgen::{
    core::{
        errors::ConfigError,
        filter::FilterContext,
        generate::GenContext,
        plugin::Plugin,
    },
    plugins::SamplePlugin,
};

use crate::{Project, plugins, run};

fn sample() -> Vec<Arc<dyn Plugin + Send + Sync>> {
    vec![Arc::new(SamplePlugin)]
}

#[test]
fn test_nested_units_and_empty_session() -> Result<()> {
    let project = Project::new()?;
    project.write_file(
        "index.ts",
        "// +gen:sample\n\n// Hello says hi.\nexport function hello() {}\n",
    )?;
    project.write_file(
        "one/index.ts",
        "// +gen:sample\n\n/** One. */\nexport const one = 1;\n",
    )?;
    project.write_file(
        "one/one-and-a-half/index.ts",
        "// +gen:sample\n// +gen:sample:ref root/one\n\nexport {};\n",
    )?;
    project.write_file(
        "empty/index.ts",
        "// +gen:sample\n\nimport { one } from \"../one\";\n",
    )?;
    project.write_file("unmarked/index.ts", "export const unmarked = true;\n")?;

    let run = run(&project, plugins(sample()), &["./..."]);
    let log = run.log.clone();
    let report = run.report();

    assert_eq!(
        report.generated,
        vec![
            project.path("one/one-and-a-half/zz_generated.sample.ts"),
            project.path("one/zz_generated.sample.ts"),
            project.path("zz_generated.sample.ts"),
        ]
    );
    assert_eq!(
        report.included,
        vec!["root", "root/empty", "root/one", "root/one/one-and-a-half"]
    );
    assert!(!project.exists("empty/zz_generated.sample.ts"));
    assert!(!project.exists("unmarked/zz_generated.sample.ts"));

    let root = project.read_file("zz_generated.sample.ts")?;
    assert!(root.starts_with("// Code generated by tsgen. DO NOT EDIT.\n"));
    assert!(root.contains(
        r#"{ name: "hello", kind: "func", doc: "Hello says hi.", directives: [] },"#
    ));

    let one = project.read_file("one/zz_generated.sample.ts")?;
    assert!(one.contains(r#"{ name: "one", kind: "value", doc: "One.", directives: [] },"#));

    assert_eq!(
        project.read_file("one/one-and-a-half/zz_generated.sample.ts")?,
        "// Code generated by tsgen. DO NOT EDIT.\n\nimport * as one from \"..\";\n\nexport { one };\n"
    );

    assert!(log.contains("Generated files:"));
    assert!(log.contains("\t./one/one-and-a-half/zz_generated.sample.ts"));
    assert!(log.contains("\t./zz_generated.sample.ts"));

    Ok(())
}

#[test]
fn test_stale_output_is_cleaned() -> Result<()> {
    let project = Project::new()?;
    project.write_file("a/index.ts", "export const a = 1;\n")?;
    project.write_file("a/zz_generated.sample.ts", "// stale\n")?;
    project.write_file("a/zz_generated.other.ts", "// not ours\n")?;

    let report = run(&project, plugins(sample()), &["./..."]).report();

    assert_eq!(report.cleaned, vec![project.path("a/zz_generated.sample.ts")]);
    assert!(report.generated.is_empty());
    assert!(!project.exists("a/zz_generated.sample.ts"));
    assert!(project.exists("a/zz_generated.other.ts"));

    Ok(())
}

#[test]
fn test_clean_only_is_idempotent() -> Result<()> {
    let project = Project::new()?;
    project.write_file("index.ts", "// +gen:sample\n\nexport const a = 1;\n")?;
    run(&project, plugins(sample()), &["./..."]).report();
    assert!(project.exists("zz_generated.sample.ts"));

    let clean = || plugins(sample()).with_clean_only(true);

    let first = run(&project, clean(), &["./..."]).report();
    assert_eq!(first.cleaned, vec![project.path("zz_generated.sample.ts")]);
    assert!(first.generated.is_empty());
    assert!(first.included.is_empty());

    let second = run(&project, clean(), &["./..."]).report();
    assert!(second.cleaned.is_empty());
    assert!(project.exists("index.ts"));

    Ok(())
}

#[test]
fn test_custom_file_name() -> Result<()> {
    let project = Project::new()?;
    project.write_file("index.ts", "// +gen:sample\n\nexport const a = 1;\n")?;

    let config = plugins(sample())
        .with_file_name(Arc::new(|plugin: &str| format!("{}.gen.ts", plugin)));
    let report = run(&project, config, &["."]).report();

    assert_eq!(report.generated, vec![project.path("sample.gen.ts")]);
    Ok(())
}

#[test]
fn test_build_tags_exclude_files() -> Result<()> {
    let project = Project::new()?;
    project.write_file(
        "server/index.ts",
        "//tsgen:build server\n\n// +gen:sample\n\nexport const s = 1;\n",
    )?;

    let run_plain = run(&project, plugins(sample()), &["./..."]);
    assert!(run_plain.log.contains("skipping unit root/server without source files"));
    assert!(run_plain.report().generated.is_empty());

    let report = crate::run_with(&project.loader(&["server"]), plugins(sample()), &["./..."])
        .report();
    assert_eq!(
        report.generated,
        vec![project.path("server/zz_generated.sample.ts")]
    );
    Ok(())
}

#[test]
fn test_non_utf8_file_in_unmarked_unit() -> Result<()> {
    let project = Project::new()?;
    project.write_file("index.ts", "// +gen:sample\n\nexport const a = 1;\n")?;
    project.write_bytes("legacy/old.js", b"// caf\xe9\nvar old = 1;\n")?;

    let report = run(&project, plugins(sample()), &["./..."]).report();

    assert_eq!(report.generated, vec![project.path("zz_generated.sample.ts")]);
    assert_eq!(report.included, vec!["root"]);
    Ok(())
}

#[test]
fn test_no_units_for_generating() -> Result<()> {
    let project = Project::new()?;
    project.write_file("index.ts", "export const a = 1;\n")?;

    let run = run(&project, plugins(sample()), &["./..."]);
    assert!(run.log.contains("no units for generating"));
    assert_eq!(run.report().generated, Vec::<std::path::PathBuf>::new());
    Ok(())
}

#[test]
fn test_configuration_errors_stop_before_scanning() -> Result<()> {
    let project = Project::new()?;
    project.write_file("index.ts", "// +gen:sample\n\nexport const a = 1;\n")?;
    project.write_file("zz_generated.sample.ts", "// stale\n")?;

    let err = run(&project, plugins(sample()), &[]).result.unwrap_err();
    assert_eq!(err.downcast_ref::<ConfigError>(), Some(&ConfigError::NoPatterns));

    let config = plugins(sample()).with_enabled(Some(vec!["missing".to_string()]));
    let err = run(&project, config, &["./..."]).result.unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::UnknownPlugin("missing".to_string()))
    );

    let config = plugins(sample()).with_ignored(vec!["sample".to_string()]);
    let err = run(&project, config, &["./..."]).result.unwrap_err();
    assert_eq!(err.downcast_ref::<ConfigError>(), Some(&ConfigError::NoPlugins));

    assert!(project.exists("zz_generated.sample.ts"));
    Ok(())
}

struct Broken;

impl Plugin for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn filter(&self, ctx: &mut FilterContext) -> Result<()> {
        ctx.include_unit("root")
    }

    fn generate(&self, ctx: &mut GenContext) -> Result<()> {
        let id = ctx.printer("root")?;
        writeln!(ctx.out(id)?, "export const partial = 1;")?;
        ctx.close(id)?;
        bail!("boom")
    }
}

#[test]
fn test_generate_error_is_wrapped_and_closed_files_remain() -> Result<()> {
    let project = Project::new()?;
    project.write_file("index.ts", "export const a = 1;\n")?;

    let err = run(&project, plugins(vec![Arc::new(Broken)]), &["./..."])
        .result
        .unwrap_err();

    assert_eq!(format!("{:#}", err), "plugin broken: boom");
    assert!(project.exists("zz_generated.broken.ts"));
    Ok(())
}

#[test]
fn test_formatter_runs_over_generated_files() -> Result<()> {
    let project = Project::new()?;
    project.write_file("index.ts", "// +gen:sample\n\nexport const a = 1;\n")?;

    let formatter = vec![
        "sh".to_string(),
        "-c".to_string(),
        "for f in \"$@\"; do echo '// formatted' >> \"$f\"; done".to_string(),
        "sh".to_string(),
    ];
    let config = plugins(sample()).with_formatter(Some(formatter));
    run(&project, config, &["./..."]).report();

    assert!(project
        .read_file("zz_generated.sample.ts")?
        .ends_with("// formatted\n"));

    let failing = vec![
        "sh".to_string(),
        "-c".to_string(),
        "echo cannot format >&2; exit 1".to_string(),
    ];
    let config = plugins(sample()).with_formatter(Some(failing));
    let err = run(&project, config, &["./..."]).result.unwrap_err();
    assert!(format!("{:#}", err).contains("cannot format"));
    Ok(())
}
