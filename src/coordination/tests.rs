//! Coordination Store Tests
//!
//! Validates the in-process coordination store against the client contract.
//!
//! ## Test Scopes
//! - **Revisions**: Monotonic growth across puts and deletes.
//! - **Scans**: Prefix filtering and pagination.
//! - **Watches**: Ordered delivery and replay from a past revision.
//! - **Leases**: Keep-alive extension, expiry, and revocation semantics.

#[cfg(test)]
mod tests {
    use crate::coordination::client::*;
    use crate::coordination::memory::MemoryCoordination;
    use std::time::Duration;

    // ============================================================
    // REVISION TESTS
    // ============================================================

    #[tokio::test]
    async fn test_revisions_are_monotonic() {
        let store = MemoryCoordination::new();

        let r1 = store.put("/a", b"1".to_vec(), None).await.unwrap();
        let r2 = store.put("/b", b"2".to_vec(), None).await.unwrap();
        let r3 = store.put("/a", b"3".to_vec(), None).await.unwrap();

        assert!(r1 < r2, "Each put should advance the revision");
        assert!(r2 < r3, "Overwrites advance the revision too");
    }

    #[tokio::test]
    async fn test_mod_revision_tracks_last_write() {
        let store = MemoryCoordination::new();

        store.put("/k", b"old".to_vec(), None).await.unwrap();
        let r = store.put("/k", b"new".to_vec(), None).await.unwrap();

        let page = store.scan_prefix("/k", None, 0).await.unwrap();
        assert_eq!(page.kvs.len(), 1);
        assert_eq!(page.kvs[0].mod_revision, r);
        assert_eq!(page.kvs[0].value, b"new");
    }

    // ============================================================
    // SCAN TESTS
    // ============================================================

    #[tokio::test]
    async fn test_scan_filters_by_prefix() {
        let store = MemoryCoordination::new();

        store.put("/nodes/a", b"a".to_vec(), None).await.unwrap();
        store.put("/nodes/b", b"b".to_vec(), None).await.unwrap();
        store.put("/other/c", b"c".to_vec(), None).await.unwrap();

        let page = store.scan_prefix("/nodes/", None, 0).await.unwrap();
        assert_eq!(page.kvs.len(), 2);
        assert!(!page.more);
        assert!(page.kvs.iter().all(|kv| kv.key.starts_with("/nodes/")));
    }

    #[tokio::test]
    async fn test_scan_paginates() {
        let store = MemoryCoordination::new();

        for i in 0..5 {
            let key = format!("/nodes/{}", i);
            store.put(&key, vec![i], None).await.unwrap();
        }

        let first = store.scan_prefix("/nodes/", None, 2).await.unwrap();
        assert_eq!(first.kvs.len(), 2);
        assert!(first.more);

        let after = first.kvs.last().unwrap().key.clone();
        let second = store.scan_prefix("/nodes/", Some(&after), 2).await.unwrap();
        assert_eq!(second.kvs.len(), 2);
        assert!(second.more);

        let after = second.kvs.last().unwrap().key.clone();
        let third = store.scan_prefix("/nodes/", Some(&after), 2).await.unwrap();
        assert_eq!(third.kvs.len(), 1);
        assert!(!third.more, "Final page should report no more keys");
    }

    #[tokio::test]
    async fn test_scan_empty_prefix_range() {
        let store = MemoryCoordination::new();

        store.put("/other/x", b"x".to_vec(), None).await.unwrap();

        let page = store.scan_prefix("/nodes/", None, 0).await.unwrap();
        assert!(page.kvs.is_empty());
        assert!(!page.more);
    }

    // ============================================================
    // WATCH TESTS
    // ============================================================

    #[tokio::test]
    async fn test_watch_delivers_events_in_order() {
        let store = MemoryCoordination::new();
        let mut sub = store.watch_prefix("/nodes/", 0).await.unwrap();

        store.put("/nodes/a", b"a".to_vec(), None).await.unwrap();
        store.put("/nodes/b", b"b".to_vec(), None).await.unwrap();
        store.delete("/nodes/a").await.unwrap();

        let e1 = sub.next().await.unwrap();
        let e2 = sub.next().await.unwrap();
        let e3 = sub.next().await.unwrap();

        assert_eq!(e1.kind, EventKind::Put);
        assert_eq!(e1.key, "/nodes/a");
        assert_eq!(e2.kind, EventKind::Put);
        assert_eq!(e2.key, "/nodes/b");
        assert_eq!(e3.kind, EventKind::Delete);
        assert_eq!(e3.key, "/nodes/a");
        assert!(e1.revision < e2.revision && e2.revision < e3.revision);
    }

    #[tokio::test]
    async fn test_watch_ignores_foreign_prefixes() {
        let store = MemoryCoordination::new();
        let mut sub = store.watch_prefix("/nodes/", 0).await.unwrap();

        store.put("/other/x", b"x".to_vec(), None).await.unwrap();
        store.put("/nodes/y", b"y".to_vec(), None).await.unwrap();

        let event = sub.next().await.unwrap();
        assert_eq!(event.key, "/nodes/y", "Only watched prefix should arrive");
    }

    #[tokio::test]
    async fn test_watch_replays_from_revision() {
        let store = MemoryCoordination::new();

        store.put("/nodes/a", b"a".to_vec(), None).await.unwrap();
        let r2 = store.put("/nodes/b", b"b".to_vec(), None).await.unwrap();
        store.put("/nodes/c", b"c".to_vec(), None).await.unwrap();

        // Replay must include every event at or past the requested revision.
        let mut sub = store.watch_prefix("/nodes/", r2).await.unwrap();

        let e1 = sub.next().await.unwrap();
        let e2 = sub.next().await.unwrap();
        assert_eq!(e1.key, "/nodes/b");
        assert_eq!(e2.key, "/nodes/c");

        store.put("/nodes/d", b"d".to_vec(), None).await.unwrap();
        let live = sub.next().await.unwrap();
        assert_eq!(live.key, "/nodes/d", "Live events follow the replay");
    }

    // ============================================================
    // LEASE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_lease_expiry_deletes_bound_keys() {
        let store = MemoryCoordination::new();
        let mut sub = store.watch_prefix("/nodes/", 0).await.unwrap();

        let lease = store
            .lease_grant(Duration::from_millis(300))
            .await
            .unwrap();
        store
            .put("/nodes/a", b"a".to_vec(), Some(lease))
            .await
            .unwrap();

        let put = sub.next().await.unwrap();
        assert_eq!(put.kind, EventKind::Put);

        // No keep-alives: the sweeper should expire the lease and delete.
        let deleted = tokio::time::timeout(Duration::from_secs(2), sub.next())
            .await
            .expect("expiry DELETE should arrive")
            .unwrap();
        assert_eq!(deleted.kind, EventKind::Delete);
        assert_eq!(deleted.key, "/nodes/a");

        let page = store.scan_prefix("/nodes/", None, 0).await.unwrap();
        assert!(page.kvs.is_empty());
    }

    #[tokio::test]
    async fn test_keep_alive_extends_lease() {
        let store = MemoryCoordination::new();

        let lease = store
            .lease_grant(Duration::from_millis(400))
            .await
            .unwrap();
        store
            .put("/nodes/a", b"a".to_vec(), Some(lease))
            .await
            .unwrap();

        // Ping well past the original deadline.
        for _ in 0..6 {
            tokio::time::sleep(Duration::from_millis(150)).await;
            store.lease_keep_alive(lease).await.unwrap();
        }

        let page = store.scan_prefix("/nodes/", None, 0).await.unwrap();
        assert_eq!(page.kvs.len(), 1, "Kept-alive lease should retain its key");
    }

    #[tokio::test]
    async fn test_revoke_deletes_bound_keys() {
        let store = MemoryCoordination::new();
        let mut sub = store.watch_prefix("/nodes/", 0).await.unwrap();

        let lease = store.lease_grant(Duration::from_secs(60)).await.unwrap();
        store
            .put("/nodes/a", b"a".to_vec(), Some(lease))
            .await
            .unwrap();
        store
            .put("/nodes/b", b"b".to_vec(), None)
            .await
            .unwrap();

        store.lease_revoke(lease).await.unwrap();

        sub.next().await.unwrap(); // put a
        sub.next().await.unwrap(); // put b
        let deleted = sub.next().await.unwrap();
        assert_eq!(deleted.kind, EventKind::Delete);
        assert_eq!(deleted.key, "/nodes/a");

        let page = store.scan_prefix("/nodes/", None, 0).await.unwrap();
        assert_eq!(page.kvs.len(), 1);
        assert_eq!(page.kvs[0].key, "/nodes/b", "Unleased keys survive revoke");
    }

    #[tokio::test]
    async fn test_revoke_unknown_lease_errors() {
        let store = MemoryCoordination::new();

        let result = store.lease_revoke(LeaseId(999)).await;
        assert!(matches!(result, Err(CoordError::UnknownLease(_))));
    }

    #[tokio::test]
    async fn test_put_with_unknown_lease_errors() {
        let store = MemoryCoordination::new();

        let result = store.put("/nodes/a", b"a".to_vec(), Some(LeaseId(7))).await;
        assert!(matches!(result, Err(CoordError::UnknownLease(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_noop() {
        let store = MemoryCoordination::new();

        store.delete("/nodes/ghost").await.unwrap();

        let page = store.scan_prefix("/", None, 0).await.unwrap();
        assert!(page.kvs.is_empty());
    }
}
