//! Trust store behaviour with real certificates.

use std::sync::{Arc, Barrier};

use vct_tls::{TlsError, TrustAnchor, TrustStore};

const ROOT_A: &[u8] = include_bytes!("testdata/log-root-a.pem");
const ROOT_A_REISSUED: &[u8] = include_bytes!("testdata/log-root-a-reissued.pem");
const ROOT_B: &[u8] = include_bytes!("testdata/log-root-b.pem");
const ROOT_C: &[u8] = include_bytes!("testdata/log-root-c.pem");
const BUNDLE: &[u8] = include_bytes!("testdata/bundle.pem");

fn anchor(pem: &[u8]) -> TrustAnchor {
    TrustAnchor::from_pem(pem).unwrap().remove(0)
}

fn pool_has(pool: &rustls::RootCertStore, anchor: &TrustAnchor) -> bool {
    pool.roots
        .iter()
        .any(|root| root.subject.as_ref() == anchor.subject())
}

#[test]
fn bundle_yields_every_certificate() {
    let anchors = TrustAnchor::from_pem(BUNDLE).unwrap();
    assert_eq!(anchors.len(), 2);
    assert_eq!(anchors[0], anchor(ROOT_A));
    assert_eq!(anchors[1], anchor(ROOT_B));
}

#[test]
fn added_anchor_is_present_after_get() {
    let store = TrustStore::new(false).unwrap();
    let before = store.get().unwrap();
    assert!(before.is_empty());

    let root = anchor(ROOT_A);
    store.add([root.clone()]);
    let after = store.get().unwrap();
    assert!(pool_has(&after, &root));
    assert!(!Arc::ptr_eq(&before, &after));

    // The earlier snapshot is untouched.
    assert!(before.is_empty());
}

#[test]
fn no_op_add_keeps_the_same_pool() {
    let store = TrustStore::new(false).unwrap();
    store.add([anchor(ROOT_A), anchor(ROOT_B)]);
    let first = store.get().unwrap();

    store.add([anchor(ROOT_B), anchor(ROOT_A)]);
    store.add(Vec::new());
    let second = store.get().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.len(), 2);
}

#[test]
fn same_subject_different_certificate_is_kept() {
    let original = anchor(ROOT_A);
    let reissued = anchor(ROOT_A_REISSUED);
    assert_eq!(original.subject(), reissued.subject());
    assert_ne!(original, reissued);

    let store = TrustStore::new(false).unwrap();
    store.add([original]);
    store.add([reissued]);
    assert_eq!(store.len(), 2);
    assert_eq!(store.get().unwrap().len(), 2);
}

#[test]
fn invalid_pem_block_is_reported() {
    let pem = b"-----BEGIN CERTIFICATE-----\nMAMBAQA=\n-----END CERTIFICATE-----\n";
    assert!(matches!(
        TrustAnchor::from_pem(pem),
        Err(TlsError::InvalidCertificate(_))
    ));
}

#[test]
fn concurrent_add_and_get() {
    let store = TrustStore::new(false).unwrap();
    let anchors = [
        anchor(ROOT_A),
        anchor(ROOT_B),
        anchor(ROOT_C),
        anchor(ROOT_A_REISSUED),
    ];

    std::thread::scope(|s| {
        for worker in 0..8 {
            let store = &store;
            let anchors = &anchors;
            s.spawn(move || {
                for round in 0..50 {
                    let pick = anchors[(worker + round) % anchors.len()].clone();
                    store.add([pick]);
                    let pool = store.get().unwrap();
                    assert!(pool.len() <= anchors.len());
                }
            });
        }
    });

    let pool = store.get().unwrap();
    assert_eq!(store.len(), 4);
    assert_eq!(pool.len(), 4);
    for a in &anchors {
        assert!(pool_has(&pool, a));
    }
}

#[test]
fn get_waits_for_a_rebuild_in_progress() {
    let anchors = [
        anchor(ROOT_A),
        anchor(ROOT_B),
        anchor(ROOT_C),
        anchor(ROOT_A_REISSUED),
    ];

    for _ in 0..25 {
        let store = TrustStore::new(false).unwrap();
        let barrier = Barrier::new(anchors.len());
        std::thread::scope(|s| {
            for own in &anchors {
                let store = &store;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    store.add([own.clone()]);
                    let pool = store.get().unwrap();
                    assert!(pool_has(&pool, own));
                });
            }
        });
    }
}
