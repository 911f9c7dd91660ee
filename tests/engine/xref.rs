use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use pretty_assertions::assert_eq;
use tsgen::{
    core::{
        filter::FilterContext,
        generate::GenContext,
        loader::{LoadedUnit, Overlay, UnitFiles, UnitLoader, matches_pattern},
        plugin::Plugin,
        syntax::{CommentGroup, FileId, Ident, Node, SourcePos, SyntaxFile, TypeSpec},
    },
    plugins::SamplePlugin,
};

use crate::{Project, Recorder, plugins, run, run_with};

#[test]
fn test_doc_comments_and_directives_reach_plugins() -> Result<()> {
    let project = Project::new()?;
    project.write_file(
        "index.ts",
        "// +gen:sample\n\n// Greeter greets.\n// +gen:sample:field tag=json\nexport interface Greeter {\n  name: string; // who\n}\n",
    )?;

    run(&project, plugins(vec![Arc::new(SamplePlugin)]), &["./..."]).report();

    let generated = project.read_file("zz_generated.sample.ts")?;
    assert!(generated.contains(
        r#"{ name: "Greeter", kind: "type", doc: "Greeter greets.", directives: ["+gen:sample:field tag=json"] },"#
    ));
    Ok(())
}

struct Inspector {
    seen: Recorder,
}

impl Plugin for Inspector {
    fn name(&self) -> &str {
        "inspector"
    }

    fn filter(&self, ctx: &mut FilterContext) -> Result<()> {
        ctx.parse_unit("root/a")?;
        ctx.include_unit("root/b")
    }

    fn generate(&self, ctx: &mut GenContext) -> Result<()> {
        for unit in ["root/a", "root/b"] {
            for object in ctx.objects(unit) {
                let comment = ctx.comment(object.occurrence).cloned().unwrap_or_default();
                self.seen.push(format!(
                    "{} {} doc={:?} trailing={:?}",
                    unit,
                    object.name,
                    comment.text(),
                    comment.trailing_text()
                ));
                for directive in ctx.directives(object.occurrence).iter() {
                    self.seen.push(format!(
                        "{} {} attached={}",
                        object.name,
                        directive.raw,
                        directive.item == Some(object.occurrence)
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Serves one declaration file from two units, each seeing a different doc
/// comment above the same name.
struct SharedFileLoader {
    root: PathBuf,
}

impl SharedFileLoader {
    fn unit(&self, path: &str) -> Option<(String, PathBuf)> {
        let rel = path.strip_prefix("root/")?;
        Some((path.to_string(), self.root.join(rel)))
    }

    fn shared_file(&self, doc_offset: u32, doc: &str) -> SyntaxFile {
        let pos = |offset| SourcePos::new(FileId(0), offset);
        SyntaxFile {
            id: FileId(0),
            path: self.root.join("shared.ts"),
            nodes: vec![Node::Type(TypeSpec {
                name: Ident::new("Shared", pos(40)),
                doc: Some(CommentGroup::new(
                    pos(doc_offset),
                    vec![doc.to_string(), "+gen:shared".to_string()],
                )),
                trailing: None,
                members: Vec::new(),
            })],
        }
    }
}

impl UnitLoader for SharedFileLoader {
    fn root(&self) -> &Path {
        &self.root
    }

    fn module(&self) -> &str {
        "root"
    }

    fn unit_path(&self, dir: &Path) -> Option<String> {
        let rel = dir.strip_prefix(&self.root).ok()?;
        Some(format!("root/{}", rel.to_string_lossy()))
    }

    fn list(&self, patterns: &[String]) -> Result<Vec<UnitFiles>> {
        Ok(["root/a", "root/b"]
            .iter()
            .filter(|path| patterns.iter().any(|p| matches_pattern(p, "root", path)))
            .filter_map(|path| self.unit(path))
            .map(|(path, dir)| UnitFiles {
                files: vec![dir.join("index.ts")],
                path,
                dir,
                imports: BTreeSet::new(),
            })
            .collect())
    }

    fn load(&self, patterns: &[String], _overlay: &Overlay) -> Result<Vec<LoadedUnit>> {
        let docs = [("root/a", 0, "First doc."), ("root/b", 20, "Second doc.")];
        Ok(self
            .list(&["./...".to_string()])?
            .into_iter()
            .filter(|unit| patterns.iter().any(|p| matches_pattern(p, "root", &unit.path)))
            .map(|unit| {
                let (offset, doc) = docs
                    .iter()
                    .find(|(path, _, _)| *path == unit.path)
                    .map(|(_, offset, doc)| (*offset, *doc))
                    .unwrap_or((0, ""));
                LoadedUnit {
                    files: vec![self.shared_file(offset, doc)],
                    path: unit.path,
                    dir: unit.dir,
                    imports: unit.imports,
                }
            })
            .collect())
    }
}

#[test]
fn test_duplicate_docs_are_merged_with_a_warning() -> Result<()> {
    let project = Project::new()?;
    project.write_file("a/index.ts", "export {};\n")?;
    project.write_file("b/index.ts", "export {};\n")?;

    let loader = SharedFileLoader {
        root: project.root().to_path_buf(),
    };
    let seen = Recorder::default();
    let config = plugins(vec![Arc::new(Inspector { seen: seen.clone() })]);
    let run = run_with(&loader, config, &["root/a", "root/b"]);
    let log = run.log.clone();
    run.report();

    assert_eq!(
        seen.entries(),
        vec![
            "root/a Shared doc=\"First doc.\\nSecond doc.\\n\" trailing=\"\"",
            "Shared +gen:shared attached=true",
            "Shared +gen:shared attached=true",
            "root/b Shared doc=\"First doc.\\nSecond doc.\\n\" trailing=\"\"",
            "Shared +gen:shared attached=true",
            "Shared +gen:shared attached=true",
        ]
    );
    assert!(log.contains("conflicting comments for Shared in root/a"));
    assert!(log.contains("Shared is declared in root/a but was also reached from root/b"));
    Ok(())
}

fn find_ident<'n>(nodes: &'n [Node], name: &str) -> Option<&'n Ident> {
    nodes.iter().find_map(|node| match node {
        Node::Ident(ident) if ident.name == name => Some(ident),
        Node::Ident(_) | Node::Import(_) => None,
        Node::Func(func) => find_ident(&func.body, name),
        Node::Group(group) => find_ident(&group.specs, name),
        Node::Type(spec) => find_ident(&spec.members, name),
        Node::Value(spec) => find_ident(&spec.body, name),
        Node::Field(spec) => find_ident(&spec.body, name),
    })
}

struct Resolver {
    seen: Recorder,
}

impl Plugin for Resolver {
    fn name(&self) -> &str {
        "resolver"
    }

    fn filter(&self, ctx: &mut FilterContext) -> Result<()> {
        ctx.parse_unit("root/dep")?;
        ctx.include_unit("root/app")
    }

    fn generate(&self, ctx: &mut GenContext) -> Result<()> {
        let Some(app) = ctx.unit("root/app") else {
            return Ok(());
        };
        for file in &app.files {
            let Some(ident) = find_ident(&file.nodes, "makeDep") else {
                continue;
            };
            let Some(id) = ctx.xref().occurrence_at(file.id, ident.pos.offset) else {
                continue;
            };
            let Some(target) = ctx.xref().resolve(id) else {
                continue;
            };
            let declaration = ctx.declaration(id).cloned();
            self.seen.push(format!(
                "{} -> {} {} in {}",
                ident.name,
                target.kind.as_str(),
                target.name,
                declaration.map(|d| d.unit).unwrap_or_default()
            ));
            self.seen.push(format!("doc {:?}", ctx.comment(id).map(|c| c.text())));
        }
        Ok(())
    }
}

#[test]
fn test_references_resolve_across_units() -> Result<()> {
    let project = Project::new()?;
    project.write_file(
        "app/index.ts",
        "import { makeDep } from \"../dep\";\n\nexport const made = makeDep();\n",
    )?;
    project.write_file(
        "dep/index.ts",
        "// makeDep builds a Dep.\nexport function makeDep() {}\n",
    )?;

    let seen = Recorder::default();
    let config = plugins(vec![Arc::new(Resolver { seen: seen.clone() })]);
    run(&project, config, &["./app"]).report();

    assert_eq!(
        seen.entries(),
        vec![
            "makeDep -> func makeDep in root/dep",
            "doc Some(\"makeDep builds a Dep.\\n\")",
        ]
    );
    Ok(())
}

fn collect_idents<'n>(nodes: &'n [Node], name: &str, found: &mut Vec<&'n Ident>) {
    for node in nodes {
        match node {
            Node::Ident(ident) if ident.name == name => found.push(ident),
            Node::Ident(_) | Node::Import(_) => {}
            Node::Func(func) => collect_idents(&func.body, name, found),
            Node::Group(group) => collect_idents(&group.specs, name, found),
            Node::Type(spec) => collect_idents(&spec.members, name, found),
            Node::Value(spec) => collect_idents(&spec.body, name, found),
            Node::Field(spec) => collect_idents(&spec.body, name, found),
        }
    }
}

/// Records where every reference to `x` in the root unit leads.
struct ReferenceTargets {
    seen: Recorder,
}

impl Plugin for ReferenceTargets {
    fn name(&self) -> &str {
        "targets"
    }

    fn filter(&self, ctx: &mut FilterContext) -> Result<()> {
        ctx.include_unit("root")
    }

    fn generate(&self, ctx: &mut GenContext) -> Result<()> {
        let Some(root) = ctx.unit("root") else {
            return Ok(());
        };
        for file in &root.files {
            let mut found = Vec::new();
            collect_idents(&file.nodes, "x", &mut found);
            for ident in found {
                let Some(id) = ctx.xref().occurrence_at(file.id, ident.pos.offset) else {
                    continue;
                };
                let target = ctx.xref().resolve(id).map(|occ| occ.pos.offset);
                let doc = ctx.comment(id).map(|c| c.text()).unwrap_or_default();
                self.seen.push(format!("{:?} doc={:?}", target, doc));
            }
        }
        Ok(())
    }
}

#[test]
fn test_parameters_shadow_top_level_declarations() -> Result<()> {
    let source = "/** top-level x */\nexport const x = 1;\nexport function f(x: number) {\n  return x;\n}\nexport function g() {\n  return x;\n}\n";
    let top_level = source.find("const x").map(|i| i as u32 + 6);
    let param = source.find("f(x").map(|i| i as u32 + 2);

    let project = Project::new()?;
    project.write_file("index.ts", source)?;

    let seen = Recorder::default();
    let config = plugins(vec![Arc::new(ReferenceTargets { seen: seen.clone() })]);
    run(&project, config, &["./..."]).report();

    assert_eq!(
        seen.entries(),
        vec![
            format!("{:?} doc={:?}", param, ""),
            format!("{:?} doc={:?}", top_level, "top-level x\n"),
        ]
    );
    Ok(())
}
