//! End-to-end sync scenarios against an in-memory remote and real git
//! working copies

use chrono::Utc;
use gs_core::config::{StrategyChoice, SyncConfig};
use gs_core::remote::InMemoryRemote;
use gs_core::types::{FileKind, RemoteFile, SyncDirection};
use std::path::Path;
use std::sync::Arc;
use sync::{Breadcrumb, SyncOptions, Syncer};
use tempfile::TempDir;

fn remote_file(name: &str, kind: FileKind, content: &str) -> RemoteFile {
    RemoteFile {
        name: name.to_string(),
        kind,
        content: content.to_string(),
        position: 0,
        update_time: Utc::now(),
    }
}

fn syncer(base: &Path, strategy: StrategyChoice) -> (Arc<InMemoryRemote>, Syncer) {
    let remote = Arc::new(InMemoryRemote::new());
    let config = SyncConfig {
        base_dir: base.to_path_buf(),
        strategy,
        ..Default::default()
    };
    let syncer = Syncer::new(remote.clone(), config);
    (remote, syncer)
}

fn options(direction: SyncDirection) -> SyncOptions {
    SyncOptions {
        direction,
        force_overwrite: false,
    }
}

#[tokio::test]
async fn pull_only_materializes_new_remote_file() {
    let base = TempDir::new().unwrap();
    let (remote, syncer) = syncer(base.path(), StrategyChoice::ThreeWay);
    remote.seed(
        "p",
        vec![remote_file("utils", FileKind::Code, "function f(){}")],
    );

    let report = syncer
        .sync_project("p", &options(SyncDirection::PullOnly))
        .await
        .unwrap();

    assert!(report.success());
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].files_pulled, 1);
    assert!(report.results[0].conflicts.is_empty());

    let local = std::fs::read_to_string(base.path().join("p/utils.js")).unwrap();
    assert_eq!(local, "function f(){}");

    // Pull-only never pushes
    assert_eq!(report.results[0].files_pushed, 0);
    assert_eq!(remote.snapshot("p").len(), 1);
}

#[tokio::test]
async fn pull_strips_module_boilerplate() {
    let base = TempDir::new().unwrap();
    let (remote, syncer) = syncer(base.path(), StrategyChoice::ThreeWay);

    let body = "function add(a, b) {\n  return a + b;\n}";
    let wrapped = transform::shim::wrap_module("math", body);
    remote.seed("p", vec![remote_file("math", FileKind::Code, &wrapped)]);

    syncer
        .sync_project("p", &options(SyncDirection::PullOnly))
        .await
        .unwrap();

    let local = std::fs::read_to_string(base.path().join("p/math.js")).unwrap();
    assert_eq!(local, body);
}

#[tokio::test]
async fn push_only_converts_local_readme() {
    let base = TempDir::new().unwrap();
    let (remote, syncer) = syncer(base.path(), StrategyChoice::ThreeWay);

    let workdir = base.path().join("p");
    std::fs::create_dir_all(&workdir).unwrap();
    std::fs::write(workdir.join("README.md"), "# Title").unwrap();

    let report = syncer
        .sync_project("p", &options(SyncDirection::PushOnly))
        .await
        .unwrap();
    assert!(report.success());

    let files = remote.snapshot("p");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "README");
    assert_eq!(files[0].kind, FileKind::Markup);
    assert_eq!(files[0].content, "<h1>Title</h1>");
}

#[tokio::test]
async fn unchanged_files_are_excluded_from_the_push_set() {
    let base = TempDir::new().unwrap();
    let (remote, syncer) = syncer(base.path(), StrategyChoice::ThreeWay);
    remote.seed("p", vec![remote_file("data", FileKind::Data, "{\"a\":1}")]);

    // First sync pulls the file and pushes nothing new
    let report = syncer
        .sync_project("p", &options(SyncDirection::Sync))
        .await
        .unwrap();
    assert!(report.success());
    assert_eq!(report.results[0].files_pushed, 0);

    // Second sync finds everything identical on both sides
    let report = syncer
        .sync_project("p", &options(SyncDirection::Sync))
        .await
        .unwrap();
    assert!(report.success());
    assert_eq!(report.results[0].files_pushed, 0);
}

#[tokio::test]
async fn overlapping_edits_conflict_and_block_the_push() {
    let base = TempDir::new().unwrap();
    let (remote, syncer) = syncer(base.path(), StrategyChoice::ThreeWay);
    remote.seed(
        "p",
        vec![remote_file("notes", FileKind::Data, "line1\nline2\n")],
    );

    // Establish a committed local baseline
    syncer
        .sync_project("p", &options(SyncDirection::PullOnly))
        .await
        .unwrap();

    // Both sides then edit the same line
    let local_path = base.path().join("p/notes.json");
    std::fs::write(&local_path, "LOCAL\nline2\n").unwrap();
    remote.seed(
        "p",
        vec![remote_file("notes", FileKind::Data, "REMOTE\nline2\n")],
    );

    let report = syncer
        .sync_project("p", &options(SyncDirection::Sync))
        .await
        .unwrap();

    assert!(!report.success());
    assert_eq!(report.conflict_paths(), vec!["notes.json".to_string()]);

    // Markers on disk, nothing pushed
    let on_disk = std::fs::read_to_string(&local_path).unwrap();
    assert!(on_disk.contains("<<<<<<<"));
    assert!(on_disk.contains("LOCAL"));
    assert!(on_disk.contains("REMOTE"));
    assert_eq!(remote.snapshot("p")[0].content, "REMOTE\nline2\n");

    // The error form names the conflicted path
    match report.into_result() {
        Err(gs_core::error::SyncError::Conflict { paths }) => {
            assert_eq!(paths, vec!["notes.json".to_string()]);
        }
        other => panic!("expected conflict error, got {other:?}"),
    }

    // Resolving in favor of the remote content converges on the next run
    std::fs::write(&local_path, "REMOTE\nline2\n").unwrap();
    let report = syncer
        .sync_project("p", &options(SyncDirection::Sync))
        .await
        .unwrap();
    assert!(report.success());
}

#[tokio::test]
async fn nested_subtrees_stay_isolated() -> anyhow::Result<()> {
    let base = TempDir::new().unwrap();
    let (remote, syncer) = syncer(base.path(), StrategyChoice::ThreeWay);

    let crumb = Breadcrumb::default().serialize();
    remote.seed(
        "p",
        vec![
            remote_file("main", FileKind::Data, "{}"),
            remote_file("vendor/.git/config", FileKind::Data, &crumb),
            remote_file("vendor/lib", FileKind::Code, "var v = 1;"),
        ],
    );

    let report = syncer
        .sync_project("p", &options(SyncDirection::PullOnly))
        .await?;

    assert!(report.success());
    assert_eq!(report.results.len(), 2);

    // Root unit holds only its own file
    let root_dir = base.path().join("p");
    assert!(root_dir.join("main.json").exists());
    assert!(!root_dir.join("vendor").exists());
    assert!(!root_dir.join("lib.js").exists());

    // The nested unit lives in its own working copy with its own mirror
    let vendor_dir = base.path().join("p__vendor");
    assert!(vendor_dir.join("lib.js").exists());
    assert!(vendor_dir.join(".git-gas/config").exists());
    assert!(vendor_dir.join(".git").exists());
    Ok(())
}

#[tokio::test]
async fn breadcrumb_is_rewritten_only_after_a_successful_push() {
    let base = TempDir::new().unwrap();
    let (remote, syncer) = syncer(base.path(), StrategyChoice::ThreeWay);

    let crumb = Breadcrumb {
        remote_url: Some("https://example.com/repo.git".to_string()),
        ..Default::default()
    };
    remote.seed(
        "p",
        vec![
            remote_file(".git/config", FileKind::Data, &crumb.serialize()),
            remote_file("utils", FileKind::Code, "function f(){}"),
        ],
    );

    // Pull-only leaves the breadcrumb untouched
    syncer
        .sync_project("p", &options(SyncDirection::PullOnly))
        .await
        .unwrap();
    let snapshot = remote.snapshot("p");
    let stored = snapshot.iter().find(|f| f.name == ".git/config").unwrap();
    assert!(!stored.content.contains("lastSync.timestamp"));

    // A full sync records lastSync remotely and mirrors it locally
    let report = syncer
        .sync_project("p", &options(SyncDirection::Sync))
        .await
        .unwrap();
    assert!(report.success());

    let snapshot = remote.snapshot("p");
    let stored = snapshot.iter().find(|f| f.name == ".git/config").unwrap();
    assert!(stored.content.contains("lastSync.timestamp"));
    assert!(stored.content.contains("lastSync.direction = sync"));

    let mirror =
        std::fs::read_to_string(base.path().join("p/.git-gas/config")).unwrap();
    assert!(mirror.contains("lastSync.timestamp"));

    // The mirror never leaks into the tracked tree
    let git = merge::Git::new(base.path().join("p"));
    assert!(!git.is_dirty().unwrap());
}

#[tokio::test]
async fn sync_path_without_breadcrumb_is_not_linked() {
    let base = TempDir::new().unwrap();
    let (remote, syncer) = syncer(base.path(), StrategyChoice::ThreeWay);
    remote.seed("p", vec![remote_file("utils", FileKind::Code, "x")]);

    let err = syncer
        .sync_path("p", "lib", &options(SyncDirection::Sync))
        .await;

    match err {
        Err(gs_core::error::SyncError::NotLinked { path }) => assert_eq!(path, "lib"),
        other => panic!("expected NotLinked, got {other:?}"),
    }
}

#[tokio::test]
async fn failing_subtree_does_not_abort_siblings() {
    let base = TempDir::new().unwrap();
    let (remote, syncer) = syncer(base.path(), StrategyChoice::ThreeWay);

    // The vendor breadcrumb pins its working copy to an unusable path so
    // that sub-tree fails to provision
    let bad_crumb = Breadcrumb {
        local_sync_path: Some("/dev/null/impossible".into()),
        ..Default::default()
    };
    remote.seed(
        "p",
        vec![
            remote_file("main", FileKind::Data, "{}"),
            remote_file("vendor/.git/config", FileKind::Data, &bad_crumb.serialize()),
        ],
    );

    let report = syncer
        .sync_project("p", &options(SyncDirection::PullOnly))
        .await
        .unwrap();

    assert!(!report.success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "vendor");

    // The root still completed
    assert_eq!(report.results.len(), 1);
    assert!(base.path().join("p/main.json").exists());
}

#[tokio::test]
async fn worktree_strategy_matches_three_way_on_clean_pull() {
    let base = TempDir::new().unwrap();
    let (remote, syncer) = syncer(base.path(), StrategyChoice::Worktree);
    remote.seed(
        "p",
        vec![
            remote_file("utils", FileKind::Code, "function f(){}"),
            remote_file("lib_nested_helper", FileKind::Code, "var h = 1;"),
        ],
    );

    let report = syncer
        .sync_project("p", &options(SyncDirection::PullOnly))
        .await
        .unwrap();

    assert!(report.success());
    let root = base.path().join("p");
    assert_eq!(
        std::fs::read_to_string(root.join("utils.js")).unwrap(),
        "function f(){}"
    );
    assert_eq!(
        std::fs::read_to_string(root.join("lib/nested/helper.js")).unwrap(),
        "var h = 1;"
    );
}

#[tokio::test]
async fn force_overwrite_discards_local_edits() {
    let base = TempDir::new().unwrap();
    let (remote, syncer) = syncer(base.path(), StrategyChoice::ThreeWay);
    remote.seed(
        "p",
        vec![remote_file("notes", FileKind::Data, "remote truth\n")],
    );

    syncer
        .sync_project("p", &options(SyncDirection::PullOnly))
        .await
        .unwrap();

    let local_path = base.path().join("p/notes.json");
    std::fs::write(&local_path, "local edit\n").unwrap();
    std::fs::write(base.path().join("p/stray.json"), "stray\n").unwrap();

    let report = syncer
        .sync_project(
            "p",
            &SyncOptions {
                direction: SyncDirection::PullOnly,
                force_overwrite: true,
            },
        )
        .await
        .unwrap();

    assert!(report.success());
    assert_eq!(
        std::fs::read_to_string(&local_path).unwrap(),
        "remote truth\n"
    );
    assert!(!base.path().join("p/stray.json").exists());
}
