use anyhow::{Context, Result};
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::{CliTest, stderr, stdout};

#[test]
fn test_init_creates_config() -> Result<()> {
    let test = CliTest::new()?;

    let output = test.command().arg("init").output()?;
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "✓ Created .tsgenrc.json\n");
    assert!(test.root().join(".tsgenrc.json").exists());

    let content = test.read_file(".tsgenrc.json")?;
    let parsed: Value = serde_json::from_str(&content).context("Config should be valid JSON")?;
    assert_eq!(parsed["module"], "app");
    assert_eq!(parsed["sourceRoot"], "./");
    assert_eq!(parsed["patterns"], serde_json::json!(["./..."]));
    assert_snapshot!(content.trim_end(), @r#"
    {
      "module": "app",
      "sourceRoot": "./",
      "patterns": [
        "./..."
      ],
      "ignoredPlugins": [],
      "namespace": "",
      "buildTags": []
    }
    "#);
    Ok(())
}

#[test]
fn test_init_fails_if_exists() -> Result<()> {
    let test = CliTest::with_file(".tsgenrc.json", "{}")?;

    let output = test.command().arg("init").output()?;
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stderr(&output), "Error: .tsgenrc.json already exists\n");
    assert_eq!(test.read_file(".tsgenrc.json")?, "{}");
    Ok(())
}

#[test]
fn test_init_config_is_immediately_usable() -> Result<()> {
    let test = CliTest::new()?;
    test.command().arg("init").output()?;
    test.write_file("index.ts", "// +gen:sample\n\nexport const a = 1;\n")?;

    let output = test.generate_command().output()?;
    assert!(
        output.status.success(),
        "generate should work with initialized config. stderr: {}",
        stderr(&output)
    );
    assert!(test.exists("zz_generated.sample.ts"));
    Ok(())
}
