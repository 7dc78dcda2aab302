//! End-to-end properties of the PVL source engine
//!
//! Exercises the full fetch–verify–cache pipeline against stub
//! collaborators and a real file-backed store.

use async_trait::async_trait;
use chrono::Utc;
use pvl_source::fetch::kit_digest;
use pvl_source::store::ACTIVE_KEY;
use pvl_source::{
    AnchorRoot, CacheRecord, FileStore, MemoryStore, MerkleAnchor, PersistentStore, PvlConfig,
    PvlResult, PvlSource, PvlSourceError, RemoteFetcher,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const KIT: &str = r#"{"kit_version": 1, "ctime": 1500000000, "tab": {"3": {"services": ["twitter"]}, "7": {"services": ["github"]}}}"#;

/// Route engine logs through `RUST_LOG` when debugging a failure.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

struct FixedAnchor {
    root: Option<AnchorRoot>,
}

impl FixedAnchor {
    fn fresh(hash: &str) -> Self {
        Self {
            root: Some(AnchorRoot {
                pvl_hash: hash.to_string(),
                fetched_at: Utc::now(),
                seqno: 7,
            }),
        }
    }

    fn none() -> Self {
        Self { root: None }
    }
}

#[async_trait]
impl MerkleAnchor for FixedAnchor {
    fn last_root(&self) -> Option<AnchorRoot> {
        self.root.clone()
    }

    async fn refresh(&self) -> PvlResult<()> {
        Ok(())
    }
}

struct CountingFetcher {
    payload: String,
    fetches: AtomicUsize,
}

impl CountingFetcher {
    fn serving(payload: &str) -> Self {
        Self {
            payload: payload.to_string(),
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RemoteFetcher for CountingFetcher {
    async fn fetch_kit(&self, _hash: &str) -> PvlResult<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        // Yield so racing callers would pile up here if the engine let them.
        tokio::task::yield_now().await;
        Ok(self.payload.clone())
    }
}

/// Poll the store until the detached write-back lands.
async fn wait_for_record(store: &dyn PersistentStore) -> CacheRecord {
    for _ in 0..100 {
        if let Ok(Some(record)) = store.get(ACTIVE_KEY).await {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("store write-back never arrived");
}

#[tokio::test]
async fn concurrent_cold_callers_fetch_once_and_converge() {
    init_tracing();
    let hash = kit_digest(KIT);
    let anchor = Arc::new(FixedAnchor::fresh(&hash));
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(CountingFetcher::serving(KIT));
    let source = Arc::new(PvlSource::new(
        &PvlConfig::default(),
        anchor,
        Arc::clone(&store) as Arc<dyn PersistentStore>,
        Arc::clone(&fetcher) as Arc<dyn RemoteFetcher>,
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let source = Arc::clone(&source);
        handles.push(tokio::spawn(async move { source.get_kit_string().await }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), KIT);
    }

    // The engine lock serializes callers, so the cold cache cost one fetch.
    assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);

    let record = wait_for_record(store.as_ref()).await;
    assert_eq!(record.hash, hash);
    assert_eq!(record.kit_json, KIT);
}

#[tokio::test]
async fn mismatched_payload_leaves_store_untouched() {
    init_tracing();
    let anchor = Arc::new(FixedAnchor::fresh(&kit_digest(KIT)));
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(CountingFetcher::serving(r#"{"kit_version": 666}"#));
    let source = PvlSource::new(
        &PvlConfig::default(),
        anchor,
        Arc::clone(&store) as Arc<dyn PersistentStore>,
        fetcher,
    );

    match source.get_kit_string().await {
        Err(PvlSourceError::HashMismatch { .. }) => {}
        other => panic!("expected HashMismatch, got {:?}", other),
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.get(ACTIVE_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn file_store_survives_engine_restart() {
    init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    let hash = kit_digest(KIT);

    {
        let source = PvlSource::new(
            &PvlConfig::default(),
            Arc::new(FixedAnchor::fresh(&hash)),
            Arc::new(FileStore::new(dir.path().to_path_buf())),
            Arc::new(CountingFetcher::serving(KIT)),
        );
        assert_eq!(source.get_kit_string().await.unwrap(), KIT);
        let store = FileStore::new(dir.path().to_path_buf());
        wait_for_record(&store).await;
    }

    // Fresh engine, same store directory: no fetch needed.
    let fetcher = Arc::new(CountingFetcher::serving(KIT));
    let source = PvlSource::new(
        &PvlConfig::default(),
        Arc::new(FixedAnchor::fresh(&hash)),
        Arc::new(FileStore::new(dir.path().to_path_buf())),
        Arc::clone(&fetcher) as Arc<dyn RemoteFetcher>,
    );
    assert_eq!(source.get_kit_string().await.unwrap(), KIT);
    assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn override_path_bypasses_everything() {
    init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    let kit_path = dir.path().join("kit.json");
    std::fs::write(&kit_path, "not even json, returned verbatim").unwrap();

    let mut config = PvlConfig::default();
    config.source.kit_override_path = Some(kit_path);

    // No anchor root at all: the override must still win.
    let source = PvlSource::new(
        &config,
        Arc::new(FixedAnchor::none()),
        Arc::new(MemoryStore::new()),
        Arc::new(CountingFetcher::serving(KIT)),
    );

    assert_eq!(
        source.get_kit_string().await.unwrap(),
        "not even json, returned verbatim"
    );
}

#[tokio::test]
async fn get_pvl_end_to_end() {
    init_tracing();
    let anchor = Arc::new(FixedAnchor::fresh(&kit_digest(KIT)));
    let source = PvlSource::new(
        &PvlConfig::default(),
        anchor,
        Arc::new(MemoryStore::new()),
        Arc::new(CountingFetcher::serving(KIT)),
    );

    let ruleset = source.get_pvl(3).await.unwrap();
    assert!(ruleset.contains("twitter"));

    match source.get_pvl(5).await {
        Err(PvlSourceError::MissingVersion(5)) => {}
        other => panic!("expected MissingVersion, got {:?}", other),
    }
}
