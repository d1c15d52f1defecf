//! Hierarchy expansion against a scripted cscope/readtags pair
//!
//! Source text comes from an in-memory accessor; every external command
//! is answered by `util::Scripted`.

use std::path::{Path, PathBuf};

use callscope::{
    core::{
        cancel::CancelToken,
        error::HierarchyError,
        hierarchy::{ClickTarget, GraphBuilder, HierarchyNode, HierarchyOptions, NodeOrigin},
        kind::SymbolKind,
        process::ProcessOutput,
        query::IndexClient,
        range::TextRange,
        workspace::IndexContext,
    },
    infra::source::MemorySource,
};

mod util;
use util::Scripted;

const A_C: &str = "#include \"b.h\"
int main(void) {
    bar(); bar();
    helper();
    helper();
    helper();
    return bar();
}
";

fn b_c() -> String
{
    let mut text = "\n".repeat(9);
    text.push_str("void bar(void)\n{\n}\n");
    text
}

fn source() -> MemorySource
{
    MemorySource::default()
        .with_file("a.c", A_C)
        .with_file("b.c", b_c())
}

/// `bar` defined at b.c:10, called twice on a.c:3 and once on a.c:7
fn scenario() -> Scripted
{
    Scripted::default()
        .cscope(1, "bar", "b.c bar 10 void bar(void)\n")
        .cscope(1, "main", "a.c main 2 int main(void) {\n")
        .cscope(3, "bar", "a.c main 3 bar(); bar();\na.c main 3 bar(); bar();\na.c main 7 return bar();\n")
        .tags("bar", "bar b.c 10 f\n")
        .tags("main", "main a.c 2 f\n")
}

fn client(runner: Scripted) -> IndexClient<Scripted>
{
    IndexClient::with_runner(IndexContext::new("/ws"), runner)
}

fn call_site() -> HierarchyOptions
{
    HierarchyOptions { show_file_names: true, click_target: ClickTarget::CallSite }
}

#[test]
fn test_incoming_keeps_one_edge_per_line()
{
    let client = client(scenario());
    let src = source();
    let builder = GraphBuilder::new(&client, &src, HierarchyOptions::default());

    let bar = builder
        .prepare_symbol("bar")
        .unwrap()
        .expect("bar is defined");
    assert_eq!(bar.kind, SymbolKind::Function);
    assert_eq!(bar.file_path, PathBuf::from("b.c"));
    assert_eq!(bar.range, TextRange::on_line(9, 5, 8));
    assert_eq!(bar.detail, "b.c @ 10");

    let exp = builder.incoming(&bar, &CancelToken::new());

    assert!(exp.failure.is_none());
    assert!(!exp.cancelled);
    assert_eq!(exp.edges.len(), 2);

    // Call sites on the caller's lines
    assert_eq!(exp.edges[0].site_ranges, vec![TextRange::on_line(2, 4, 7)]);
    assert_eq!(exp.edges[1].site_ranges, vec![TextRange::on_line(6, 11, 14)]);

    // Caller nodes land on the called symbol's definition
    for edge in &exp.edges
    {
        assert_eq!(edge.to, bar);
        assert_eq!(edge.from.name, "main");
        assert_eq!(edge.from.kind, SymbolKind::Function);
        assert_eq!(edge.from.file_path, PathBuf::from("b.c"));
        assert_eq!(edge.from.range, TextRange::on_line(9, 5, 8));
        assert_eq!(edge.from.detail, "b.c @ 10");
    }
    assert!(
        !client
            .runner()
            .ran("-L1 main")
    );
}

#[test]
fn test_call_site_target_and_hidden_file_names()
{
    let client = client(scenario());
    let src = source();
    let options = HierarchyOptions { show_file_names: false, ..call_site() };
    let builder = GraphBuilder::new(&client, &src, options);

    let bar = builder
        .prepare_symbol("bar")
        .unwrap()
        .unwrap();
    let exp = builder.incoming(&bar, &CancelToken::new());

    let details: Vec<_> = exp
        .edges
        .iter()
        .map(|e| (e.from.detail.as_str(), e.from.range))
        .collect();
    assert_eq!(
        details,
        vec![("@ 3", TextRange::on_line(2, 4, 7)), ("@ 7", TextRange::on_line(6, 11, 14))]
    );

    // No definition lookups for callers in call-site mode
    assert!(
        !client
            .runner()
            .ran("-L1 main")
    );
}

#[test]
fn test_outgoing_uses_callee_names()
{
    let runner = Scripted::default()
        .cscope(2, "main", "a.c bar 3 bar(); bar();\na.c helper 4 helper();\n")
        .tags("helper", "helper c.c 1 p\n");
    let client = client(runner);
    let src = source();
    let builder = GraphBuilder::new(&client, &src, call_site());

    let main = HierarchyNode {
        kind: SymbolKind::Function,
        name: "main".into(),
        detail: "a.c @ 2".into(),
        file_path: "a.c".into(),
        range: TextRange::on_line(1, 4, 8),
        origin: NodeOrigin::Symbol,
    };
    let exp = builder.outgoing(&main, &CancelToken::new());

    let callees: Vec<_> = exp
        .edges
        .iter()
        .map(|e| (e.to.name.as_str(), e.to.kind, e.site_ranges[0]))
        .collect();
    assert_eq!(
        callees,
        vec![
            ("bar", SymbolKind::Unclassified, TextRange::on_line(2, 4, 7)),
            ("helper", SymbolKind::Function, TextRange::on_line(3, 4, 10)),
        ]
    );
    assert!(
        exp.edges
            .iter()
            .all(|e| e.from == main)
    );
}

#[test]
fn test_query_failure_empties_the_level()
{
    let runner = scenario().answer("-d -f cscope.out -L3 bar", ProcessOutput::failed("cscope: cannot open file cscope.out"));
    let client = client(runner);
    let src = source();
    let builder = GraphBuilder::new(&client, &src, HierarchyOptions::default());

    let bar = builder
        .prepare_symbol("bar")
        .unwrap()
        .unwrap();
    let exp = builder.incoming(&bar, &CancelToken::new());

    assert!(exp.edges.is_empty());
    let failure = exp
        .failure
        .expect("failure reported");
    assert!(failure.is_query_failure());
    assert!(
        failure
            .to_string()
            .contains("cannot open file")
    );
}

#[test]
fn test_tag_failure_empties_the_level()
{
    let runner = scenario().answer(
        &format!("-t ctags.out -F {} main", callscope::core::query::TAG_FORMAT),
        ProcessOutput::failed("readtags: no tags file"),
    );
    let client = client(runner);
    let src = source();
    let builder = GraphBuilder::new(&client, &src, call_site());

    let bar = HierarchyNode {
        kind: SymbolKind::Function,
        name: "bar".into(),
        detail: "b.c @ 10".into(),
        file_path: "b.c".into(),
        range: TextRange::on_line(9, 5, 8),
        origin: NodeOrigin::Symbol,
    };
    let exp = builder.incoming(&bar, &CancelToken::new());

    assert!(exp.edges.is_empty());
    assert!(matches!(exp.failure, Some(HierarchyError::QueryFailed { .. })));
}

#[test]
fn test_unreadable_and_mismatched_lines_degrade_ranges()
{
    let runner = Scripted::default().cscope(3, "bar", "gone.c helper 4 bar();\na.c main 4 helper();\n");
    let client = client(runner);
    let src = source();
    let builder = GraphBuilder::new(&client, &src, call_site());

    let bar = HierarchyNode {
        kind: SymbolKind::Function,
        name: "bar".into(),
        detail: "b.c @ 10".into(),
        file_path: "b.c".into(),
        range: TextRange::on_line(9, 5, 8),
        origin: NodeOrigin::Symbol,
    };
    let exp = builder.incoming(&bar, &CancelToken::new());

    assert!(exp.failure.is_none());
    assert_eq!(exp.edges.len(), 2);

    // Missing file: kept, zero-width range, warning recorded
    assert_eq!(exp.edges[0].site_ranges, vec![TextRange::line_start(3)]);
    assert_eq!(exp.warnings.len(), 1);
    assert!(matches!(exp.warnings[0], HierarchyError::FileNotFound { .. }));

    // Token absent from the line: kept, zero-width range, no warning
    assert_eq!(exp.edges[1].site_ranges, vec![TextRange::line_start(3)]);
}

#[test]
fn test_cancelled_before_start_runs_nothing()
{
    let client = client(scenario());
    let src = source();
    let builder = GraphBuilder::new(&client, &src, HierarchyOptions::default());
    let bar = builder
        .prepare_symbol("bar")
        .unwrap()
        .unwrap();

    let before = client
        .runner()
        .seen
        .borrow()
        .len();

    let cancel = CancelToken::new();
    cancel.cancel();
    let exp = builder.incoming(&bar, &cancel);

    assert_eq!(
        client
            .runner()
            .seen
            .borrow()
            .len(),
        before
    );
    assert!(exp.cancelled);
    assert!(exp.edges.is_empty());
    assert!(exp.failure.is_none());
}

#[test]
fn test_cancel_mid_level_keeps_resolved_edges()
{
    let cancel = CancelToken::new();
    let runner = scenario()
        .cscope(3, "bar", "a.c main 3 bar();\na.c init 7 return bar();\n")
        .cancel_when("-d -f cscope.out -L1 bar", &cancel);
    let client = client(runner);
    let src = source();
    let builder = GraphBuilder::new(&client, &src, HierarchyOptions::default());

    let bar = HierarchyNode {
        kind: SymbolKind::Function,
        name: "bar".into(),
        detail: "b.c @ 10".into(),
        file_path: "b.c".into(),
        range: TextRange::on_line(9, 5, 8),
        origin: NodeOrigin::Symbol,
    };
    let exp = builder.incoming(&bar, &cancel);

    assert!(exp.cancelled);
    assert_eq!(exp.edges.len(), 1);
    assert_eq!(exp.edges[0].from.name, "main");
}

#[test]
fn test_cancel_between_kind_and_definition_lookups()
{
    let cancel = CancelToken::new();
    let key = format!("-t ctags.out -F {} main", callscope::core::query::TAG_FORMAT);
    let runner = scenario().cancel_when(&key, &cancel);
    let client = client(runner);
    let src = source();
    let builder = GraphBuilder::new(&client, &src, HierarchyOptions::default());

    let bar = HierarchyNode {
        kind: SymbolKind::Function,
        name: "bar".into(),
        detail: "b.c @ 10".into(),
        file_path: "b.c".into(),
        range: TextRange::on_line(9, 5, 8),
        origin: NodeOrigin::Symbol,
    };
    let exp = builder.incoming(&bar, &cancel);

    assert!(exp.cancelled);
    assert!(exp.edges.is_empty());
    assert!(
        !client
            .runner()
            .ran("-L1 bar")
    );
}

#[test]
fn test_includers_of_a_header()
{
    let runner = Scripted::default()
        .cscope(7, "b.h", "inc/b.h <unknown> 1 <unknown>\n")
        .cscope(8, "b.h", "a.c <global> 1 #include \"b.h\"\n");
    let client = client(runner);
    let src = source();
    let builder = GraphBuilder::new(&client, &src, HierarchyOptions::default());

    let header = builder
        .prepare_header("b.h")
        .unwrap();
    assert!(header.is_include());
    assert_eq!(header.file_path, PathBuf::from("inc/b.h"));

    let exp = builder.incoming(&header, &CancelToken::new());

    assert_eq!(exp.edges.len(), 1);
    let from = &exp.edges[0].from;
    assert!(from.is_include());
    assert_eq!(from.kind, SymbolKind::File);
    assert_eq!(from.name, "a.c");
    assert_eq!(exp.edges[0].site_ranges, vec![TextRange::on_line(0, 10, 13)]);
}

#[test]
fn test_outgoing_includes_scan_text_without_queries()
{
    let client = client(Scripted::default());
    let src = source().with_file("b.h", "#pragma once\n");
    let builder = GraphBuilder::new(&client, &src, HierarchyOptions::default());

    let file = builder.prepare_file(Path::new("a.c"));
    let exp = builder.outgoing(&file, &CancelToken::new());

    assert_eq!(exp.edges.len(), 1);
    assert_eq!(exp.edges[0].to.name, "b.h");
    assert_eq!(exp.edges[0].to.file_path, PathBuf::from("b.h"));

    // The whole directive is the site
    assert_eq!(exp.edges[0].site_ranges, vec![TextRange::on_line(0, 0, 14)]);
    assert!(
        client
            .runner()
            .seen
            .borrow()
            .is_empty()
    );
}

#[test]
fn test_prepare_from_cursor()
{
    let runner = scenario().cscope(7, "b.h", "inc/b.h <unknown> 1 <unknown>\n");
    let client = client(runner);
    let src = source();
    let builder = GraphBuilder::new(&client, &src, HierarchyOptions::default());

    // Cursor on the second `bar` of line 3 resolves to the definition
    let node = builder
        .prepare(Path::new("a.c"), 2, 12)
        .unwrap()
        .unwrap();
    assert_eq!(node.name, "bar");
    assert_eq!(node.file_path, PathBuf::from("b.c"));

    // An include line yields an include node
    let node = builder
        .prepare(Path::new("a.c"), 0, 3)
        .unwrap()
        .unwrap();
    assert!(node.is_include());
    assert_eq!(node.name, "b.h");

    // Whitespace under the cursor
    assert!(
        builder
            .prepare(Path::new("a.c"), 2, 0)
            .unwrap()
            .is_none()
    );
}
