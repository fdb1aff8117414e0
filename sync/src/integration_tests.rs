//! End-to-end push/pull scenarios against an in-memory transport

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::paths;
use crate::sync_engine::SyncEngine;
use crate::transport::{RemoteStat, Transport};

#[derive(Debug, Clone)]
enum MockNode {
    Dir,
    File { mtime: DateTime<Utc>, data: Vec<u8> },
}

/// In-memory remote tree recording every mutation in order
#[derive(Default)]
struct MockTransport {
    nodes: Mutex<BTreeMap<String, MockNode>>,
    events: Mutex<Vec<String>>,
    fail_puts: Mutex<BTreeSet<String>>,
}

impl MockTransport {
    fn new() -> Self {
        let mock = Self::default();
        mock.nodes
            .lock()
            .unwrap()
            .insert("/".to_string(), MockNode::Dir);
        mock
    }

    fn norm(path: &str) -> String {
        let trimmed = paths::normalize(path);
        let trimmed = trimmed.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }

    fn seed_dir(&self, path: &str) {
        let mut nodes = self.nodes.lock().unwrap();
        let mut current = Self::norm(path);
        loop {
            nodes.entry(current.clone()).or_insert(MockNode::Dir);
            match paths::parent(&current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
    }

    fn seed_file(&self, path: &str, mtime: DateTime<Utc>, data: &[u8]) {
        let path = Self::norm(path);
        if let Some(parent) = paths::parent(&path) {
            self.seed_dir(&parent);
        }
        self.nodes.lock().unwrap().insert(
            path,
            MockNode::File {
                mtime,
                data: data.to_vec(),
            },
        );
    }

    fn fail_put(&self, path: &str) {
        self.fail_puts.lock().unwrap().insert(Self::norm(path));
    }

    fn has_file(&self, path: &str) -> bool {
        matches!(
            self.nodes.lock().unwrap().get(&Self::norm(path)),
            Some(MockNode::File { .. })
        )
    }

    fn has_dir(&self, path: &str) -> bool {
        matches!(
            self.nodes.lock().unwrap().get(&Self::norm(path)),
            Some(MockNode::Dir)
        )
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn stat(&self, path: &str) -> Result<Option<RemoteStat>> {
        Ok(self
            .nodes
            .lock()
            .unwrap()
            .get(&Self::norm(path))
            .map(|node| match node {
                MockNode::Dir => RemoteStat {
                    mtime: None,
                    is_dir: true,
                },
                MockNode::File { mtime, .. } => RemoteStat {
                    mtime: Some(*mtime),
                    is_dir: false,
                },
            }))
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let path = Self::norm(path);
        let nodes = self.nodes.lock().unwrap();
        Ok(nodes
            .keys()
            .filter_map(|key| match paths::parent(key) {
                Some(parent) if parent == path => key.rsplit('/').next().map(str::to_string),
                _ => None,
            })
            .collect())
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        let path = Self::norm(path);
        self.events.lock().unwrap().push(format!("mkdir {path}"));
        self.nodes
            .lock()
            .unwrap()
            .entry(path)
            .or_insert(MockNode::Dir);
        Ok(())
    }

    async fn put_file(&self, local: &Path, remote: &str) -> Result<()> {
        let remote = Self::norm(remote);
        if self.fail_puts.lock().unwrap().contains(&remote) {
            return Err(SyncError::transfer_error(&remote, "injected put failure"));
        }
        let data = tokio::fs::read(local).await?;
        let mtime = DateTime::<Utc>::from(tokio::fs::metadata(local).await?.modified()?);
        self.events.lock().unwrap().push(format!("put {remote}"));
        self.nodes
            .lock()
            .unwrap()
            .insert(remote, MockNode::File { mtime, data });
        Ok(())
    }

    async fn get_file(&self, remote: &str, local: &Path) -> Result<()> {
        let remote = Self::norm(remote);
        let data = match self.nodes.lock().unwrap().get(&remote) {
            Some(MockNode::File { data, .. }) => data.clone(),
            _ => return Err(SyncError::transfer_error(&remote, "no such remote file")),
        };
        self.events.lock().unwrap().push(format!("get {remote}"));
        tokio::fs::write(local, data).await?;
        Ok(())
    }
}

fn config_for(local_base: &str, remote_base: &str, lazy: bool) -> SyncConfig {
    SyncConfig {
        host: "test".to_string(),
        port: 22,
        username: "user".to_string(),
        password: String::new(),
        lazy,
        local_base: local_base.to_string(),
        remote_base: remote_base.to_string(),
        upload: vec!["*".to_string()],
        no_upload: Vec::new(),
        download: vec!["*".to_string()],
        no_download: Vec::new(),
    }
}

fn local_tree(files: &[(&str, &[u8])]) -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    for (rel, data) in files {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, data).unwrap();
    }
    let base = paths::normalize(&dir.path().to_string_lossy());
    (dir, base)
}

#[test_log::test(tokio::test)]
async fn test_push_empty_remote_transfers_everything() {
    let (_dir, base) = local_tree(&[("x.txt", b"x"), ("sub/y.txt", b"y")]);
    let transport = Arc::new(MockTransport::new());
    let config = config_for(&base, "/srv/app", true);

    crate::push(&config, transport.clone()).await.unwrap();

    assert!(transport.has_file("/srv/app/x.txt"));
    assert!(transport.has_file("/srv/app/sub/y.txt"));
    assert!(transport.has_dir("/srv/app/sub"));

    // the directory chain must be in place before the file lands in it
    let events = transport.events();
    let mkdir = events
        .iter()
        .position(|e| e == "mkdir /srv/app/sub")
        .expect("sub was created");
    let put = events
        .iter()
        .position(|e| e == "put /srv/app/sub/y.txt")
        .expect("y.txt was uploaded");
    assert!(mkdir < put);
}

#[tokio::test]
async fn test_push_respects_exclusion_roots() {
    let (_dir, base) = local_tree(&[("x.txt", b"x"), ("sub/y.txt", b"y"), ("subs/z.txt", b"z")]);
    let transport = Arc::new(MockTransport::new());
    let mut config = config_for(&base, "/srv/app", true);
    config.no_upload = vec!["sub".to_string()];

    crate::push(&config, transport.clone()).await.unwrap();

    assert!(transport.has_file("/srv/app/x.txt"));
    assert!(!transport.has_file("/srv/app/sub/y.txt"));
    // exclusion is by ancestry, not prefix: "subs" is unrelated to "sub"
    assert!(transport.has_file("/srv/app/subs/z.txt"));
}

#[tokio::test]
async fn test_lazy_push_skips_strictly_newer_destination() {
    let (_dir, base) = local_tree(&[("x.txt", b"x")]);
    let transport = Arc::new(MockTransport::new());
    transport.seed_file(
        "/srv/app/x.txt",
        Utc::now() + Duration::hours(1),
        b"remote is newer",
    );
    let config = config_for(&base, "/srv/app", true);

    crate::push(&config, transport.clone()).await.unwrap();

    assert!(transport.events().iter().all(|e| !e.starts_with("put ")));
}

#[tokio::test]
async fn test_lazy_push_transfers_on_timestamp_tie() {
    let (dir, base) = local_tree(&[("x.txt", b"x")]);
    let local_mtime =
        DateTime::<Utc>::from(std::fs::metadata(dir.path().join("x.txt")).unwrap().modified().unwrap());
    let transport = Arc::new(MockTransport::new());
    transport.seed_file("/srv/app/x.txt", local_mtime, b"stale copy");
    let config = config_for(&base, "/srv/app", true);

    crate::push(&config, transport.clone()).await.unwrap();

    assert!(transport
        .events()
        .contains(&"put /srv/app/x.txt".to_string()));
}

#[tokio::test]
async fn test_non_lazy_push_always_transfers() {
    let (_dir, base) = local_tree(&[("x.txt", b"x")]);
    let transport = Arc::new(MockTransport::new());
    transport.seed_file("/srv/app/x.txt", Utc::now() + Duration::hours(1), b"newer");
    let config = config_for(&base, "/srv/app", false);

    crate::push(&config, transport.clone()).await.unwrap();

    assert!(transport
        .events()
        .contains(&"put /srv/app/x.txt".to_string()));
}

#[tokio::test]
async fn test_one_failed_put_does_not_abort_the_batch() {
    let (_dir, base) = local_tree(&[("b.txt", b"b"), ("c.txt", b"c")]);
    let transport = Arc::new(MockTransport::new());
    transport.fail_put("/srv/app/b.txt");
    let config = config_for(&base, "/srv/app", true);

    crate::push(&config, transport.clone()).await.unwrap();

    assert!(!transport.has_file("/srv/app/b.txt"));
    assert!(transport.has_file("/srv/app/c.txt"));
}

#[test_log::test(tokio::test)]
async fn test_pull_empty_local_transfers_everything() {
    let dir = tempfile::tempdir().unwrap();
    let base = paths::normalize(&dir.path().to_string_lossy());
    let transport = Arc::new(MockTransport::new());
    let old = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
    transport.seed_file("/srv/app/x.txt", old, b"remote x");
    transport.seed_file("/srv/app/sub/y.txt", old, b"remote y");
    let config = config_for(&base, "/srv/app", true);

    crate::pull(&config, transport.clone()).await.unwrap();

    assert_eq!(
        std::fs::read(dir.path().join("x.txt")).unwrap(),
        b"remote x"
    );
    assert_eq!(
        std::fs::read(dir.path().join("sub/y.txt")).unwrap(),
        b"remote y"
    );
}

#[tokio::test]
async fn test_lazy_pull_skips_newer_local_file() {
    let (_dir, base) = local_tree(&[("x.txt", b"fresh local")]);
    let transport = Arc::new(MockTransport::new());
    transport.seed_file(
        "/srv/app/x.txt",
        Utc.timestamp_opt(1_000_000, 0).unwrap(),
        b"ancient remote",
    );
    let config = config_for(&base, "/srv/app", true);

    crate::pull(&config, transport.clone()).await.unwrap();

    assert!(transport.events().iter().all(|e| !e.starts_with("get ")));
}

#[tokio::test]
async fn test_pull_respects_exclusion_roots() {
    let dir = tempfile::tempdir().unwrap();
    let base = paths::normalize(&dir.path().to_string_lossy());
    let transport = Arc::new(MockTransport::new());
    let old = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
    transport.seed_file("/srv/app/keep.txt", old, b"keep");
    transport.seed_file("/srv/app/logs/big.log", old, b"skip");
    let mut config = config_for(&base, "/srv/app", true);
    config.no_download = vec!["logs".to_string()];

    crate::pull(&config, transport.clone()).await.unwrap();

    assert!(dir.path().join("keep.txt").exists());
    assert!(!dir.path().join("logs").exists());
}

#[tokio::test]
async fn test_prepare_remote_is_idempotent() {
    let transport = Arc::new(MockTransport::new());
    let engine = SyncEngine::new(transport.clone(), "/local", "/srv/app", true);

    engine.prepare_remote("/srv/app/a/b/c").await.unwrap();
    engine.prepare_remote("/srv/app/a/b/c").await.unwrap();

    assert!(transport.has_dir("/srv/app/a/b/c"));
    // second call found everything in place and created nothing
    let mkdirs = transport
        .events()
        .iter()
        .filter(|e| e.starts_with("mkdir "))
        .count();
    assert_eq!(mkdirs, 5); // /srv, /srv/app, .../a, .../a/b, .../a/b/c
}

#[tokio::test]
async fn test_prepare_local_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let target = paths::normalize(&dir.path().join("a/b/c").to_string_lossy());
    let transport = Arc::new(MockTransport::new());
    let engine = SyncEngine::new(transport, "/local", "/srv/app", true);

    engine.prepare_local(&target).await.unwrap();
    engine.prepare_local(&target).await.unwrap();

    assert!(dir.path().join("a/b/c").is_dir());
}

#[tokio::test]
async fn test_remote_glob_expansion_over_listings() {
    let transport = MockTransport::new();
    let old = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
    transport.seed_file("/srv/app/a.txt", old, b"a");
    transport.seed_file("/srv/app/b.txt", old, b"b");
    transport.seed_file("/srv/app/c.log", old, b"c");
    transport.seed_dir("/srv/app/nested");

    let mut matches = transport.list_by_glob("/srv/app/*.txt").await.unwrap();
    matches.sort();
    assert_eq!(matches, vec!["/srv/app/a.txt", "/srv/app/b.txt"]);

    // literal components are existence-checked, not listed
    let exact = transport.list_by_glob("/srv/app/nested").await.unwrap();
    assert_eq!(exact, vec!["/srv/app/nested"]);

    let none = transport.list_by_glob("/srv/app/*.rs").await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_download_one_missing_source_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let base = paths::normalize(&dir.path().to_string_lossy());
    let transport = Arc::new(MockTransport::new());
    transport.seed_dir("/srv/app");
    let engine = SyncEngine::new(transport, &base, "/srv/app", true);

    let err = engine.download_one("ghost.txt").await.unwrap_err();
    assert!(matches!(err, SyncError::Transfer { .. }));
}
