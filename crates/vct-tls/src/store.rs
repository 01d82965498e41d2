//! # Concurrent Trust Store
//!
//! ## Concurrency Invariant
//!
//! The pool handed out by [`TrustStore::get`] is an immutable
//! `Arc<RootCertStore>`. A rebuild constructs a fresh pool and swaps the
//! `Arc` under the write lock, so holders of an older pool keep a consistent
//! snapshot and no reader observes a partially built one.
//!
//! `add` only appends to the accepted list and raises the dirty flag, both
//! under the write lock. A `get` that sees the flag takes the write lock and
//! clears it there, so exactly one caller rebuilds and every caller queued
//! behind it reads the rebuilt pool. A `get` that returns after an `add`
//! finished always includes that add's anchors.
//!
//! Platform roots are loaded once, at construction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustls::RootCertStore;

use crate::anchor::TrustAnchor;
use crate::error::TlsError;

struct Inner {
    pool: Arc<RootCertStore>,
    /// Platform roots, or empty. Every rebuild starts from a copy.
    base: RootCertStore,
    anchors: Vec<TrustAnchor>,
    by_subject: HashMap<Vec<u8>, Vec<usize>>,
}

/// Thread-safe, lazily rebuilt trust anchor pool.
pub struct TrustStore {
    inner: RwLock<Inner>,
    dirty: AtomicBool,
    use_system_roots: bool,
}

impl std::fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("TrustStore")
            .field("anchors", &inner.anchors.len())
            .field("pool_size", &inner.pool.len())
            .field("use_system_roots", &self.use_system_roots)
            .finish()
    }
}

impl TrustStore {
    /// Create a store, loading the platform roots when `use_system_roots` is set.
    pub fn new(use_system_roots: bool) -> Result<Self, TlsError> {
        let base = base_pool(use_system_roots)?;
        Ok(Self {
            inner: RwLock::new(Inner {
                pool: Arc::new(base.clone()),
                base,
                anchors: Vec::new(),
                by_subject: HashMap::new(),
            }),
            dirty: AtomicBool::new(false),
            use_system_roots,
        })
    }

    /// Queue anchors for the next [`get`](Self::get).
    ///
    /// Anchors already accepted (same subject, identical DER) and repeats
    /// within `anchors` are skipped. The store is marked dirty only when
    /// something new was accepted.
    pub fn add<I>(&self, anchors: I)
    where
        I: IntoIterator<Item = TrustAnchor>,
    {
        let candidates = self.filter(anchors);
        if candidates.is_empty() {
            return;
        }

        let mut inner = self.inner.write();
        let mut added = 0usize;
        for anchor in candidates {
            // Re-check: another add may have accepted it since `filter` released the lock.
            if contains(&inner, &anchor) {
                continue;
            }
            let index = inner.anchors.len();
            inner
                .by_subject
                .entry(anchor.subject().to_vec())
                .or_default()
                .push(index);
            inner.anchors.push(anchor);
            added += 1;
        }
        if added > 0 {
            self.dirty.store(true, Ordering::Release);
            tracing::debug!(added, total = inner.anchors.len(), "queued trust anchors");
        }
    }

    /// The current pool, rebuilt first if anchors were added since the last call.
    ///
    /// Callers that arrive while a rebuild runs wait for it. A failed rebuild
    /// leaves the store dirty so a later call retries.
    pub fn get(&self) -> Result<Arc<RootCertStore>, TlsError> {
        if !self.dirty.load(Ordering::Acquire) {
            return Ok(Arc::clone(&self.inner.read().pool));
        }

        let mut inner = self.inner.write();
        // Another caller may have rebuilt while this one waited for the lock.
        if self.dirty.swap(false, Ordering::AcqRel) {
            if let Err(e) = rebuild(&mut inner) {
                self.dirty.store(true, Ordering::Release);
                return Err(e);
            }
        }
        Ok(Arc::clone(&inner.pool))
    }

    /// Number of anchors accepted through [`add`](Self::add).
    pub fn len(&self) -> usize {
        self.inner.read().anchors.len()
    }

    /// Whether no anchors have been added.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn filter<I>(&self, anchors: I) -> Vec<TrustAnchor>
    where
        I: IntoIterator<Item = TrustAnchor>,
    {
        let inner = self.inner.read();
        let mut filtered: Vec<TrustAnchor> = Vec::new();
        for anchor in anchors {
            if contains(&inner, &anchor) || filtered.contains(&anchor) {
                continue;
            }
            filtered.push(anchor);
        }
        filtered
    }
}

fn rebuild(inner: &mut Inner) -> Result<(), TlsError> {
    let mut pool = inner.base.clone();
    for anchor in &inner.anchors {
        pool.add(anchor.der().clone())?;
    }
    inner.pool = Arc::new(pool);
    tracing::debug!(
        anchors = inner.anchors.len(),
        pool_size = inner.pool.len(),
        "rebuilt trust pool"
    );
    Ok(())
}

fn contains(inner: &Inner, anchor: &TrustAnchor) -> bool {
    inner
        .by_subject
        .get(anchor.subject())
        .is_some_and(|indices| indices.iter().any(|&i| inner.anchors[i] == *anchor))
}

fn base_pool(use_system_roots: bool) -> Result<RootCertStore, TlsError> {
    let mut pool = RootCertStore::empty();
    if !use_system_roots {
        return Ok(pool);
    }

    let native = rustls_native_certs::load_native_certs();
    if native.certs.is_empty() {
        if let Some(e) = native.errors.first() {
            return Err(TlsError::SystemRoots(e.to_string()));
        }
    }
    let (added, ignored) = pool.add_parsable_certificates(native.certs);
    tracing::debug!(size = added, ignored, "loaded system cert pool");
    Ok(pool)
}
