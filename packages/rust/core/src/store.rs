//! The live knowledge base shared by all request handlers.
//!
//! Readers take a cheap `Arc` clone of the current [`Snapshot`] and resolve
//! against it without holding any lock, so a single resolution sees exactly
//! one knowledge base. Reloads are serialized, build the replacement off to
//! the side, and install it with one pointer swap. A failed reload leaves the
//! previous snapshot in place.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use soilscope_shared::{LoadError, Result, SoilScopeError};
use tracing::{debug, info, instrument, warn};

use crate::knowledge::{self, KnowledgeBase};
use crate::resolver::{self, ReplySource};
use crate::source::RuleSource;

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Where the store is in its life.
///
/// `Uninitialized -> Loading -> Ready -> (Reloading -> Ready)* -> Shutdown`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Loading,
    Ready,
    Reloading,
    Shutdown,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Reloading => "reloading",
            Self::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Snapshot / results
// ---------------------------------------------------------------------------

/// One installed knowledge base. Generations start at 1 and increase by one
/// per successful install.
#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    knowledge: KnowledgeBase,
}

impl Snapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }
}

/// A resolved reply, tagged with the snapshot that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
    pub generation: u64,
}

/// Outcome of a successful reload.
#[derive(Debug, Clone)]
pub struct ReloadReport {
    pub generation: u64,
    pub rules: usize,
    pub origin: String,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// KnowledgeStore
// ---------------------------------------------------------------------------

/// Holds the current snapshot and the source it is reloaded from.
#[derive(Debug)]
pub struct KnowledgeStore {
    source: RuleSource,
    current: RwLock<Arc<Snapshot>>,
    lifecycle: Mutex<Lifecycle>,
    /// Held for the whole of a reload or shutdown.
    reload_gate: tokio::sync::Mutex<()>,
}

impl KnowledgeStore {
    /// Perform the initial load from `source` and return a ready store.
    ///
    /// If the first load fails no store is created, so nothing can ever
    /// observe a partially loaded knowledge base.
    #[instrument(skip_all, fields(source = %source))]
    pub async fn open(source: RuleSource) -> std::result::Result<Self, LoadError> {
        debug!(lifecycle = %Lifecycle::Loading, "fetching initial rules");
        let started = Instant::now();
        let knowledge = build(&source).await?;

        info!(
            rules = knowledge.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "knowledge base loaded"
        );
        Ok(Self {
            source,
            current: RwLock::new(Arc::new(Snapshot {
                generation: 1,
                knowledge,
            })),
            lifecycle: Mutex::new(Lifecycle::Ready),
            reload_gate: tokio::sync::Mutex::new(()),
        })
    }

    pub fn source(&self) -> &RuleSource {
        &self.source
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_lifecycle(&self, next: Lifecycle) {
        let mut state = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(from = state.as_str(), to = next.as_str(), "lifecycle transition");
        *state = next;
    }

    /// The snapshot currently installed. The lock is held only for the clone.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Resolve `message` against the current snapshot.
    pub fn resolve(&self, message: &str) -> Reply {
        let snapshot = self.snapshot();
        let resolution = resolver::resolve(message, snapshot.knowledge());
        Reply {
            text: resolution.reply.to_string(),
            source: resolution.source,
            generation: snapshot.generation,
        }
    }

    /// Re-read the source and install a new snapshot.
    ///
    /// Concurrent calls queue behind one another. On failure the installed
    /// snapshot is unchanged and the error is returned to the caller.
    #[instrument(skip_all, fields(source = %self.source))]
    pub async fn reload(&self) -> Result<ReloadReport> {
        let _gate = self.reload_gate.lock().await;
        if self.lifecycle() == Lifecycle::Shutdown {
            return Err(SoilScopeError::validation("knowledge store is shut down"));
        }

        let reloading = ReloadingGuard::enter(self);
        let started = Instant::now();
        let knowledge = match build(&self.source).await {
            Ok(knowledge) => knowledge,
            Err(e) => {
                drop(reloading);
                warn!(error = %e, rule = ?e.rule_index(), "reload rejected, keeping current rules");
                return Err(e.into());
            }
        };

        let rules = knowledge.len();
        let origin = knowledge.origin().to_string();
        let generation = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            let generation = current.generation + 1;
            *current = Arc::new(Snapshot {
                generation,
                knowledge,
            });
            generation
        };
        drop(reloading);

        let elapsed = started.elapsed();
        info!(
            generation,
            rules,
            elapsed_ms = elapsed.as_millis() as u64,
            "knowledge base reloaded"
        );

        Ok(ReloadReport {
            generation,
            rules,
            origin,
            elapsed,
        })
    }

    /// Stop accepting reloads. Waits for an in-flight reload to finish;
    /// resolution keeps serving the last snapshot.
    pub async fn shutdown(&self) {
        let _gate = self.reload_gate.lock().await;
        self.set_lifecycle(Lifecycle::Shutdown);
        info!(generation = self.snapshot().generation, "knowledge store shut down");
    }
}

/// Marks the store `Reloading` for its lifetime and puts it back to `Ready`
/// when dropped, including when the reload future is cancelled mid-fetch.
struct ReloadingGuard<'a> {
    store: &'a KnowledgeStore,
}

impl<'a> ReloadingGuard<'a> {
    fn enter(store: &'a KnowledgeStore) -> Self {
        store.set_lifecycle(Lifecycle::Reloading);
        Self { store }
    }
}

impl Drop for ReloadingGuard<'_> {
    fn drop(&mut self) {
        if self.store.lifecycle() == Lifecycle::Reloading {
            self.store.set_lifecycle(Lifecycle::Ready);
        }
    }
}

async fn build(source: &RuleSource) -> std::result::Result<KnowledgeBase, LoadError> {
    let descriptors = source.fetch().await?;
    knowledge::load(&descriptors, &source.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use soilscope_shared::RuleDescriptor;
    use uuid::Uuid;

    use crate::fallback::CATCH_ALL_REPLY;

    fn temp_kb() -> PathBuf {
        std::env::temp_dir().join(format!("soilscope_store_{}.json", Uuid::now_v7()))
    }

    fn write_kb(path: &Path, rules: &[RuleDescriptor]) {
        std::fs::write(path, serde_json::to_string(rules).unwrap()).unwrap();
    }

    async fn open_with(rules: &[RuleDescriptor]) -> (KnowledgeStore, PathBuf) {
        let path = temp_kb();
        write_kb(&path, rules);
        let store = KnowledgeStore::open(RuleSource::JsonFile(path.clone()))
            .await
            .expect("open");
        (store, path)
    }

    #[tokio::test]
    async fn open_installs_first_generation() {
        let (store, _path) = open_with(&[RuleDescriptor::new("compost", "Add compost.")]).await;
        assert_eq!(store.lifecycle(), Lifecycle::Ready);
        assert_eq!(store.snapshot().generation(), 1);

        let reply = store.resolve("Compost?");
        assert_eq!(reply.text, "Add compost.");
        assert_eq!(reply.source, ReplySource::Rule { index: 0 });
        assert_eq!(reply.generation, 1);
    }

    #[tokio::test]
    async fn open_fails_on_bad_rule() {
        let path = temp_kb();
        write_kb(
            &path,
            &[
                RuleDescriptor::new("wheat", "ok"),
                RuleDescriptor::new("(ph", "broken"),
            ],
        );
        let err = KnowledgeStore::open(RuleSource::JsonFile(path)).await.unwrap_err();
        assert_eq!(err.rule_index(), Some(1));
    }

    #[tokio::test]
    async fn reload_swaps_in_new_rules() {
        let (store, path) = open_with(&[RuleDescriptor::new("wheat", "old wheat")]).await;
        let before = store.snapshot();

        write_kb(&path, &[RuleDescriptor::new("wheat", "new wheat")]);
        let report = store.reload().await.expect("reload");
        assert_eq!(report.generation, 2);
        assert_eq!(report.rules, 1);

        assert_eq!(store.resolve("wheat").text, "new wheat");
        // A snapshot taken earlier is untouched by the swap.
        assert_eq!(before.generation(), 1);
        assert_eq!(before.knowledge().rules()[0].reply(), "old wheat");
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_snapshot() {
        let (store, path) = open_with(&[RuleDescriptor::new("corn", "corn reply")]).await;

        write_kb(
            &path,
            &[
                RuleDescriptor::new("corn", "replacement"),
                RuleDescriptor::new("[moisture", "broken"),
            ],
        );
        let err = store.reload().await.unwrap_err();
        assert!(matches!(err, SoilScopeError::Load(LoadError::Rule { index: 1, .. })));

        assert_eq!(store.lifecycle(), Lifecycle::Ready);
        assert_eq!(store.snapshot().generation(), 1);
        assert_eq!(store.resolve("corn").text, "corn reply");

        std::fs::remove_file(&path).unwrap();
        let err = store.reload().await.unwrap_err();
        assert!(matches!(err, SoilScopeError::Load(LoadError::Source { .. })));
        assert_eq!(store.resolve("corn").text, "corn reply");
    }

    #[tokio::test]
    async fn cancelled_reload_returns_to_ready() {
        use std::future::Future;
        use std::task::{Context, Poll, Waker};

        let (store, path) = open_with(&[RuleDescriptor::new("lime", "raises pH")]).await;
        write_kb(&path, &[RuleDescriptor::new("lime", "lime v2")]);

        let mut reload = Box::pin(store.reload());
        let mut cx = Context::from_waker(Waker::noop());
        // The file read runs on the blocking pool, so the first poll parks.
        assert!(matches!(reload.as_mut().poll(&mut cx), Poll::Pending));
        assert_eq!(store.lifecycle(), Lifecycle::Reloading);
        drop(reload);

        assert_eq!(store.lifecycle(), Lifecycle::Ready);
        assert_eq!(store.snapshot().generation(), 1);
        assert_eq!(store.resolve("lime").text, "raises pH");

        // The gate was released, so the next reload goes through.
        assert_eq!(store.reload().await.unwrap().generation, 2);
        assert_eq!(store.resolve("lime").text, "lime v2");
    }

    #[tokio::test]
    async fn shutdown_blocks_reload_but_keeps_serving() {
        let (store, _path) = open_with(&[RuleDescriptor::new("potato", "hill them")]).await;
        store.shutdown().await;
        assert_eq!(store.lifecycle(), Lifecycle::Shutdown);

        let err = store.reload().await.unwrap_err();
        assert!(matches!(err, SoilScopeError::Validation { .. }));
        assert_eq!(store.resolve("potato").text, "hill them");
        assert_eq!(store.resolve("xyz123").text, CATCH_ALL_REPLY);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn resolution_never_sees_a_mixed_snapshot() {
        // Every generation N carries two rules whose replies both say v{N-1};
        // a reader that ever sees two different versions across one
        // snapshot would observe a torn swap.
        fn rules(version: u64) -> Vec<RuleDescriptor> {
            vec![
                RuleDescriptor::new("ping", format!("ping v{version}")),
                RuleDescriptor::new("pong", format!("pong v{version}")),
            ]
        }

        let path = temp_kb();
        write_kb(&path, &rules(0));
        let store = Arc::new(
            KnowledgeStore::open(RuleSource::JsonFile(path.clone()))
                .await
                .unwrap(),
        );

        let mut readers = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            readers.push(tokio::spawn(async move {
                let mut last_generation = 0;
                for _ in 0..2_000 {
                    let snapshot = store.snapshot();
                    let version = snapshot.generation() - 1;
                    let kb = snapshot.knowledge();
                    assert_eq!(resolver::reply("ping", kb), format!("ping v{version}"));
                    assert_eq!(resolver::reply("pong", kb), format!("pong v{version}"));

                    let reply = store.resolve("ping");
                    assert_eq!(reply.text, format!("ping v{}", reply.generation - 1));
                    assert!(reply.generation >= last_generation);
                    last_generation = reply.generation;
                    tokio::task::yield_now().await;
                }
            }));
        }

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for version in 1..=20 {
                    write_kb(&path, &rules(version));
                    let report = store.reload().await.unwrap();
                    assert_eq!(report.generation, version + 1);
                }
            })
        };

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(store.snapshot().generation(), 21);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_reloads_are_serialized() {
        let (store, _path) = open_with(&[RuleDescriptor::new("npk", "10-10-10")]).await;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.reload().await.unwrap().generation })
            })
            .collect();

        let mut generations = Vec::new();
        for handle in handles {
            generations.push(handle.await.unwrap());
        }
        generations.sort_unstable();
        assert_eq!(generations, (2..=9).collect::<Vec<u64>>());
    }

    #[test]
    fn lifecycle_labels() {
        assert_eq!(Lifecycle::Ready.to_string(), "ready");
        assert_eq!(Lifecycle::Reloading.as_str(), "reloading");
    }
}
