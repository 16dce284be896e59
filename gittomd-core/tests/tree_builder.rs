use gittomd_core::contract::TreeEntry;
use gittomd_core::tree::{build_tree, NodeKind, TreeError};

fn sample_entries() -> Vec<TreeEntry> {
    vec![
        TreeEntry::text("README.md"),
        TreeEntry::directory("src"),
        TreeEntry::text("src/index.ts"),
        TreeEntry::directory("src/util"),
        TreeEntry::text("src/util/strings.ts"),
        TreeEntry::text("docs/guide/intro.md"),
        TreeEntry::directory("empty"),
    ]
}

#[test]
fn test_leaf_paths_round_trip_to_input_paths() {
    let entries = sample_entries();
    let root = build_tree(&entries, "hello").expect("tree should build");

    let mut expected: Vec<String> = entries
        .iter()
        .filter(|e| e.kind == gittomd_core::contract::EntryKind::Text)
        .map(|e| e.path.clone())
        .collect();
    expected.sort();
    let mut actual = root.leaf_paths();
    actual.sort();

    assert_eq!(actual, expected);
    assert_eq!(root.name, "hello");
    assert_eq!(root.path, "");
}

#[test]
fn test_input_order_does_not_change_tree_shape() {
    let entries = sample_entries();
    let mut reversed = entries.clone();
    reversed.reverse();

    let forward = build_tree(&entries, "hello").expect("forward");
    let backward = build_tree(&reversed, "hello").expect("backward");
    assert_eq!(forward, backward);
}

#[test]
fn test_intermediate_segments_become_directories_with_joined_paths() {
    let root = build_tree(&[TreeEntry::text("docs/guide/intro.md")], "hello").expect("tree");

    let docs = root.find("docs").expect("docs exists");
    assert_eq!(docs.kind, NodeKind::Directory);
    assert_eq!(docs.path, "docs");

    let guide = root.find("docs/guide").expect("guide exists");
    assert_eq!(guide.kind, NodeKind::Directory);
    assert_eq!(guide.path, "docs/guide");

    let intro = root.find("docs/guide/intro.md").expect("intro exists");
    assert_eq!(intro.kind, NodeKind::Leaf);
    assert_eq!(intro.name, "intro.md");
}

#[test]
fn test_leaf_is_promoted_when_a_longer_path_runs_through_it() {
    let entries = vec![TreeEntry::text("a"), TreeEntry::text("a/b")];
    let root = build_tree(&entries, "repo").expect("tree");

    let a = root.find("a").expect("a exists");
    assert_eq!(a.kind, NodeKind::Directory, "a must be repaired to a directory");
    let b = root.find("a/b").expect("b exists");
    assert_eq!(b.kind, NodeKind::Leaf);
    assert_eq!(b.path, "a/b");
}

#[test]
fn test_same_path_as_file_and_ancestor_ends_as_directory() {
    let entries = vec![TreeEntry::text("lib/x.ts"), TreeEntry::text("lib")];
    let root = build_tree(&entries, "repo").expect("tree");
    assert_eq!(root.find("lib").expect("lib").kind, NodeKind::Directory);
    assert!(root.find("lib/x.ts").is_some());
}

#[test]
fn test_directory_is_never_demoted_to_leaf() {
    let entries = vec![TreeEntry::directory("lib"), TreeEntry::text("lib")];
    let root = build_tree(&entries, "repo").expect("tree");
    assert_eq!(root.find("lib").expect("lib").kind, NodeKind::Directory);
}

#[test]
fn test_empty_listing_yields_childless_root() {
    let root = build_tree(&[], "empty-repo").expect("tree");
    assert!(root.children.is_empty());
    assert_eq!(root.kind, NodeKind::Directory);
}

#[test]
fn test_duplicate_entries_are_idempotent() {
    let once = build_tree(&[TreeEntry::text("a/b.md")], "repo").expect("once");
    let twice = build_tree(
        &[TreeEntry::text("a/b.md"), TreeEntry::text("a/b.md")],
        "repo",
    )
    .expect("twice");
    assert_eq!(once, twice);
}

#[test]
fn test_malformed_paths_are_rejected() {
    for path in ["", "a//b", "./a", "a/../b", "a/"] {
        let err = build_tree(&[TreeEntry::text(path)], "repo").unwrap_err();
        assert!(
            matches!(err, TreeError::InvalidPath { .. }),
            "{path:?} should be rejected, got {err:?}"
        );
    }
}

mod diagnostics {
    use std::sync::{Arc, Mutex};

    use gittomd_core::contract::TreeEntry;
    use gittomd_core::tree::build_tree;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{layer::Context, Layer, Registry};

    struct EventCollector {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl<S> Layer<S> for EventCollector
    where
        S: tracing::Subscriber,
    {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.events.lock().unwrap().push(format!("{:?}", event));
            }
        }
    }

    #[test]
    fn test_conflict_repair_emits_one_warning() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriber = Registry::default().with(EventCollector {
            events: events.clone(),
        });
        let _guard = tracing::subscriber::set_default(subscriber);

        build_tree(&[TreeEntry::text("a"), TreeEntry::text("a/b")], "repo").expect("tree");
        build_tree(&[TreeEntry::directory("a"), TreeEntry::text("a/b")], "repo").expect("tree");

        let warnings = events.lock().unwrap();
        assert_eq!(warnings.len(), 1, "got: {warnings:?}");
        assert!(warnings[0].contains("promoting it to a directory"));
    }
}
