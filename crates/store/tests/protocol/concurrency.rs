//! Same-document exclusivity and cross-document parallelism

use crate::common::{mem, TestStore};
use docver_core::{CompanyId, Context, DocumentId, MemFile, UserId, VersionTime};
use docver_store::{DocumentBackend, DocumentStore, NewVersion};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_concurrent_commits_on_one_document_serialize() {
    let test = Arc::new(TestStore::new());
    let id = DocumentId::new();
    let first = test
        .store
        .create_document(
            &Context::new(),
            CompanyId::new(),
            id,
            UserId::new(),
            "",
            vec![mem("counter.txt", "0")],
        )
        .unwrap();

    let inside = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let test = Arc::clone(&test);
            let inside = Arc::clone(&inside);
            let overlaps = Arc::clone(&overlaps);
            thread::spawn(move || {
                test.store
                    .add_document_version(&Context::new(), id, UserId::new(), "", &mut |ctx, prev, files| {
                        if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        thread::sleep(Duration::from_millis(10));
                        let count: u64 = String::from_utf8_lossy(&files.read_file("counter.txt")?)
                            .parse()
                            .unwrap();
                        inside.fetch_sub(1, Ordering::SeqCst);
                        Ok(NewVersion::new(VersionTime::next_after(ctx, prev.version))
                            .write(MemFile::new("counter.txt", (count + 1).to_string()))
                            .write(MemFile::new(format!("worker-{worker}.txt"), "done")))
                    })
                    .unwrap()
            })
        })
        .collect();
    let infos: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(infos.len(), 8);

    let ctx = Context::new();
    let versions = test.store.document_versions(&ctx, id).unwrap();
    assert_eq!(versions.len(), 9);
    assert_eq!(versions[0], first.version);
    // every version builds on the one before it
    for pair in versions.windows(2) {
        let info = test.store.document_version_info(&ctx, id, pair[1]).unwrap();
        assert_eq!(info.prev_version, pair[0]);
    }
    let latest = test.store.document_file_provider(&ctx, id).unwrap();
    assert_eq!(latest.read_file("counter.txt").unwrap(), b"8");
    assert_eq!(latest.list_files().unwrap().len(), 9);
}

#[test]
fn test_distinct_documents_commit_in_parallel() {
    let store = Arc::new(DocumentStore::in_memory());
    let ctx = Context::new();
    let ids = [DocumentId::new(), DocumentId::new()];
    for id in ids {
        store
            .create_document(&ctx, CompanyId::new(), id, UserId::new(), "", vec![mem("a", "1")])
            .unwrap();
    }

    // each commit function waits until both are running at the same time
    let inside = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let store = Arc::clone(&store);
            let inside = Arc::clone(&inside);
            thread::spawn(move || {
                let mut met = false;
                store
                    .add_document_version(&Context::new(), id, UserId::new(), "", &mut |ctx, prev, _| {
                        inside.fetch_add(1, Ordering::SeqCst);
                        let deadline = Instant::now() + Duration::from_secs(5);
                        while Instant::now() < deadline {
                            if inside.load(Ordering::SeqCst) == 2 {
                                met = true;
                                break;
                            }
                            thread::sleep(Duration::from_millis(1));
                        }
                        Ok(NewVersion::new(VersionTime::next_after(ctx, prev.version))
                            .write(MemFile::new("a", "2")))
                    })
                    .unwrap();
                met
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap(), "commits on distinct documents were serialized");
    }
}

#[test]
fn test_waiting_commit_gives_up_at_deadline() {
    let store = Arc::new(DocumentStore::in_memory());
    let id = DocumentId::new();
    store
        .create_document(&Context::new(), CompanyId::new(), id, UserId::new(), "", vec![
            mem("a", "1"),
        ])
        .unwrap();

    let started = Arc::new(AtomicUsize::new(0));
    let holder = {
        let store = Arc::clone(&store);
        let started = Arc::clone(&started);
        thread::spawn(move || {
            store
                .add_document_version(&Context::new(), id, UserId::new(), "", &mut |ctx, prev, _| {
                    started.store(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(300));
                    Ok(NewVersion::new(VersionTime::next_after(ctx, prev.version))
                        .write(MemFile::new("a", "2")))
                })
                .unwrap();
        })
    };
    while started.load(Ordering::SeqCst) == 0 {
        thread::sleep(Duration::from_millis(1));
    }

    let ctx = Context::new().with_timeout(Duration::from_millis(50));
    let err = store
        .add_document_version(&ctx, id, UserId::new(), "", &mut |_, _, _| {
            panic!("must not run while the document is locked")
        })
        .unwrap_err();
    assert!(err.is_cancelled());
    holder.join().unwrap();
    assert_eq!(store.document_versions(&Context::new(), id).unwrap().len(), 2);
}
