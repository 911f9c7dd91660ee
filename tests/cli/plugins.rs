use anyhow::Result;
use pretty_assertions::assert_eq;

use crate::{CliTest, stdout};

#[test]
fn test_plugins_lists_builtins() -> Result<()> {
    let test = CliTest::new()?;

    let output = test.command().arg("plugins").output()?;
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout(&output),
        "sample\tzz_generated.sample.ts\ninspect\tzz_generated.inspect.ts\n"
    );
    Ok(())
}

#[test]
fn test_plugins_shows_config_state() -> Result<()> {
    let test = CliTest::with_file(
        ".tsgenrc.json",
        r#"{ "ignoredPlugins": ["inspect"], "fileNameTemplate": "{plugin}.gen.ts" }"#,
    )?;

    let output = test.command().arg("plugins").output()?;
    assert_eq!(
        stdout(&output),
        "sample\tsample.gen.ts\ninspect\tinspect.gen.ts (ignored)\n"
    );
    Ok(())
}
