//! Built-in source scanner over the fixture C project

use std::{
    cell::RefCell,
    path::{Path, PathBuf},
};

use callscope::{
    core::{
        cancel::CancelToken,
        hierarchy::{Direction, GraphBuilder, HierarchyOptions},
        kind::SymbolKind,
        progress::{Progress, Silent},
        provider::RelationProvider,
        record::SymbolRecord,
    },
    infra::{
        source::FsSource,
        walk::{DEFAULT_EXTENSIONS, SourceWalker},
    },
};

mod util;
use util::c_project;

fn indexer(root: &Path) -> callscope::core::fallback::FallbackIndexer
{
    let extensions: Vec<String> = DEFAULT_EXTENSIONS
        .iter()
        .map(|e| e.to_string())
        .collect();
    let walker = SourceWalker::new(&extensions, &[]).unwrap();

    callscope::core::fallback::FallbackIndexer::new(root, walker, None).unwrap()
}

#[derive(Default)]
struct Recorded(RefCell<Vec<(u64, String)>>);

impl Progress for Recorded
{
    fn report(
        &self,
        increment: u64,
        message: &str,
    )
    {
        self.0
            .borrow_mut()
            .push((increment, message.to_string()));
    }
}

#[test]
fn test_finds_fixture_functions() -> anyhow::Result<()>
{
    let tmp = c_project();
    let index = indexer(tmp.path()).index(&Silent, &CancelToken::new())?;

    let mut names: Vec<_> = index
        .functions()
        .iter()
        .map(|f| (f.name.as_str(), f.line_number))
        .collect();
    names.sort();
    assert_eq!(names, vec![("clamp", 4), ("log_value", 13), ("main", 13), ("run", 3)]);

    let run = index
        .functions()
        .iter()
        .find(|f| f.name == "run")
        .unwrap();
    assert_eq!(run.file_path, PathBuf::from("src/main.c"));
    assert_eq!(run.callee_names(), vec!["clamp", "log_value"]);

    assert!(index.skipped.is_empty());
    Ok(())
}

#[test]
fn test_callers_are_sorted_by_site()
{
    let tmp = c_project();
    let index = indexer(tmp.path())
        .index(&Silent, &CancelToken::new())
        .unwrap();

    let callers = index
        .find_callers("log_value")
        .unwrap();
    assert_eq!(
        callers,
        vec![
            SymbolRecord::new("run", "src/main.c", 9),
            SymbolRecord::new("main", "src/main.c", 16),
            SymbolRecord::new("clamp", "src/util.c", 7),
        ]
    );

    // Unknown names have no relations rather than failing
    assert!(
        index
            .find_callers("nothing_here")
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_includers_and_file_lookup()
{
    let tmp = c_project();
    let index = indexer(tmp.path())
        .index(&Silent, &CancelToken::new())
        .unwrap();

    let includers = index
        .find_includers("util.h")
        .unwrap();
    assert_eq!(
        includers,
        vec![SymbolRecord::new("main.c", "src/main.c", 1), SymbolRecord::new("util.c", "src/util.c", 2)]
    );

    let located = index
        .find_file("util.h")
        .unwrap();
    assert_eq!(located, vec![SymbolRecord::new("util.h", "include/util.h", 1)]);
}

#[test]
fn test_progress_adds_up_to_one_hundred()
{
    let tmp = c_project();
    let progress = Recorded::default();

    indexer(tmp.path())
        .index(&progress, &CancelToken::new())
        .unwrap();

    let reports = progress
        .0
        .borrow();
    assert_eq!(reports.len(), 3);
    assert_eq!(
        reports
            .iter()
            .map(|(inc, _)| inc)
            .sum::<u64>(),
        100
    );
}

#[test]
fn test_cancelled_index_is_empty_but_valid()
{
    let tmp = c_project();
    let cancel = CancelToken::new();
    cancel.cancel();

    let index = indexer(tmp.path())
        .index(&Silent, &cancel)
        .unwrap();

    assert!(
        index
            .functions()
            .is_empty()
    );
    assert_eq!(index.call_count(), 0);
}

#[test]
fn test_hierarchy_over_fallback_backend()
{
    let tmp = c_project();
    let index = indexer(tmp.path())
        .index(&Silent, &CancelToken::new())
        .unwrap();
    let source = FsSource::new(tmp.path());
    let builder = GraphBuilder::new(&index, &source, HierarchyOptions::default());

    let root = builder
        .prepare_symbol("log_value")
        .unwrap()
        .unwrap();
    assert_eq!(root.kind, SymbolKind::Function);
    assert_eq!(root.detail, "util.c @ 13");

    let tree = builder.expand(root, Direction::Incoming, 2, &CancelToken::new());

    let callers: Vec<_> = tree
        .children
        .iter()
        .map(|c| {
            (
                c.node
                    .name
                    .as_str(),
                c.node
                    .detail
                    .as_str(),
            )
        })
        .collect();
    // Callers point at the definition of the function they call
    assert_eq!(callers, vec![("run", "util.c @ 13"), ("main", "util.c @ 13"), ("clamp", "util.c @ 13")]);

    // run is called from main one level further up
    assert_eq!(tree.children[0].children.len(), 1);
    assert_eq!(tree.children[0].children[0].node.name, "main");
    assert_eq!(tree.children[0].children[0].node.detail, "main.c @ 3");
    assert!(
        tree.children[2]
            .children
            .iter()
            .any(|c| c.node.name == "run")
    );
}

#[test]
fn test_bad_function_pattern_is_rejected()
{
    let walker = SourceWalker::new(&["c".to_string()], &[]).unwrap();

    assert!(callscope::core::fallback::FallbackIndexer::new("/tmp", walker, Some("(unclosed")).is_err());
}
