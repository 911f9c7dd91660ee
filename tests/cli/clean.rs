use anyhow::Result;
use pretty_assertions::assert_eq;

use crate::{CliTest, stderr, stdout};

#[test]
fn test_clean_removes_generated_files() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file("a/index.ts", "// +gen:sample\n\nexport const a = 1;\n")?;
    test.write_file("b/index.ts", "// +gen:sample\n\nexport const b = 1;\n")?;
    test.generate_command().output()?;
    assert!(test.exists("a/zz_generated.sample.ts"));

    let output = test.clean_command().output()?;
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "Removed ./a/zz_generated.sample.ts\nRemoved ./b/zz_generated.sample.ts\n✓ Removed 2 generated files\n"
    );
    assert!(!test.exists("a/zz_generated.sample.ts"));
    assert!(!test.exists("b/zz_generated.sample.ts"));
    assert!(test.exists("a/index.ts"));
    Ok(())
}

#[test]
fn test_clean_single_file() -> Result<()> {
    let test = CliTest::with_file("index.ts", "export const a = 1;\n")?;
    test.write_file("zz_generated.sample.ts", "// stale\n")?;

    let output = test.clean_command().output()?;
    assert_eq!(
        stdout(&output),
        "Removed ./zz_generated.sample.ts\n✓ Removed 1 generated file\n"
    );
    Ok(())
}

#[test]
fn test_clean_nothing_to_clean() -> Result<()> {
    let test = CliTest::with_file("index.ts", "export const a = 1;\n")?;

    let output = test.clean_command().output()?;
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "✓ Nothing to clean\n");
    Ok(())
}
