//! Checkout, external edits, check-in and cancel

use crate::common::{ctx_at, mem, TestStore};
use docver_core::{CompanyId, Context, DocumentId, Error, UserId};
use docver_store::DocumentBackend;
use std::fs;
use std::path::PathBuf;

fn create(test: &TestStore) -> DocumentId {
    let id = DocumentId::new();
    test.store
        .create_document(
            &ctx_at(1_000),
            CompanyId::new(),
            id,
            UserId::new(),
            "",
            vec![mem("a.txt", "alpha"), mem("b.txt", "beta"), mem("c.txt", "gamma")],
        )
        .unwrap();
    id
}

#[test]
fn test_second_checkout_fails_and_keeps_first() {
    let test = TestStore::new();
    let id = create(&test);
    let ctx = Context::new();
    let alice = UserId::new();
    let first = test
        .store
        .check_out_document(&ctx, id, alice, "quarterly update")
        .unwrap();

    let err = test
        .store
        .check_out_document(&ctx, id, UserId::new(), "hotfix")
        .unwrap_err();
    match err {
        Error::CheckedOut(holder) => {
            assert_eq!(holder.user_id, alice);
            assert_eq!(holder.reason, "quarterly update");
        }
        other => panic!("expected CheckedOut, got {other:?}"),
    }
    assert_eq!(test.store.check_out_status(&ctx, id).unwrap(), Some(first.clone()));
    assert_eq!(test.store.checked_out_documents(&ctx).unwrap(), vec![first]);
}

#[test]
fn test_external_edit_of_one_file() {
    let test = TestStore::new();
    let id = create(&test);
    let ctx = Context::new();
    let status = test
        .store
        .check_out_document(&ctx, id, UserId::new(), "edit")
        .unwrap();

    // edit the workspace directly on disk, like an external editor would
    let workspace = PathBuf::from(&status.workspace);
    assert_eq!(
        fs::read_to_string(workspace.join("b.txt")).unwrap(),
        "beta"
    );
    fs::write(workspace.join("b.txt"), "BETA").unwrap();

    let info = test.store.check_in_document(&ctx, id).unwrap();
    assert_eq!(info.modified_files, vec!["b.txt"]);
    assert!(info.added_files.is_empty());
    assert!(info.removed_files.is_empty());
    assert_eq!(info.prev_version, status.version);
    assert!(!workspace.exists());
    assert!(test.store.check_out_status(&ctx, id).unwrap().is_none());
    assert_eq!(
        test.store
            .read_document_version_file(&ctx, id, info.version, "b.txt")
            .unwrap(),
        b"BETA"
    );
}

#[test]
fn test_cancel_new_document_removes_it() {
    let test = TestStore::new();
    let ctx = Context::new();
    let id = DocumentId::new();
    let company = CompanyId::new();
    let before = test.snapshot();
    test.store
        .check_out_new_document(&ctx, company, id, UserId::new(), "draft")
        .unwrap();
    assert!(test.store.document_exists(&ctx, id).unwrap());
    assert!(test.store.document_versions(&ctx, id).unwrap().is_empty());

    test.store.cancel_check_out_document(&ctx, id).unwrap();
    assert!(!test.store.document_exists(&ctx, id).unwrap());
    assert_eq!(test.snapshot(), before);
    // idempotent
    test.store.cancel_check_out_document(&ctx, id).unwrap();
}

#[test]
fn test_cancel_keeps_versions() {
    let test = TestStore::new();
    let id = create(&test);
    let ctx = Context::new();
    let versions = test.store.document_versions(&ctx, id).unwrap();
    let status = test
        .store
        .check_out_document(&ctx, id, UserId::new(), "edit")
        .unwrap();
    fs::write(PathBuf::from(&status.workspace).join("new.txt"), "x").unwrap();

    test.store.cancel_check_out_document(&ctx, id).unwrap();
    assert_eq!(test.store.document_versions(&ctx, id).unwrap(), versions);
    assert!(!PathBuf::from(&status.workspace).exists());
    assert!(test.store.checked_out_documents(&ctx).unwrap().is_empty());
}

#[test]
fn test_new_document_round_trip() {
    let test = TestStore::new();
    let ctx = Context::new();
    let id = DocumentId::new();
    let user = UserId::new();
    let status = test
        .store
        .check_out_new_document(&ctx, CompanyId::new(), id, user, "scan")
        .unwrap();
    let workspace = PathBuf::from(&status.workspace);
    fs::write(workspace.join("page-1.png"), [0x89, b'P', b'N', b'G']).unwrap();
    fs::write(workspace.join("page-2.png"), [0x89, b'P', b'N', b'G', 2]).unwrap();

    let info = test.store.check_in_document(&ctx, id).unwrap();
    assert!(info.prev_version.is_null());
    assert_eq!(info.added_files, vec!["page-1.png", "page-2.png"]);
    assert_eq!(info.committed_by, user);
    assert_eq!(info.reason, "scan");
}

#[test]
fn test_workspace_helpers_without_filesystem_access() {
    let test = TestStore::new();
    let id = create(&test);
    let ctx = Context::new();
    test.store
        .check_out_document(&ctx, id, UserId::new(), "edit")
        .unwrap();

    test.store
        .write_checkout_file(&ctx, id, mem("d.txt", "delta").as_ref())
        .unwrap();
    test.store.remove_checkout_file(&ctx, id, "a.txt").unwrap();
    assert!(test
        .store
        .remove_checkout_file(&ctx, id, "a.txt")
        .unwrap_err()
        .is_not_found());
    let workspace = test.store.checkout_workspace_provider(&ctx, id).unwrap();
    assert_eq!(
        workspace.list_files().unwrap(),
        vec!["b.txt", "c.txt", "d.txt"]
    );

    let info = test.store.check_in_document(&ctx, id).unwrap();
    assert_eq!(info.added_files, vec!["d.txt"]);
    assert_eq!(info.removed_files, vec!["a.txt"]);
}

#[test]
fn test_subdirectory_in_workspace_fails_check_in() {
    let test = TestStore::new();
    let id = create(&test);
    let ctx = Context::new();
    let status = test
        .store
        .check_out_document(&ctx, id, UserId::new(), "scan pages")
        .unwrap();
    let workspace = PathBuf::from(&status.workspace);
    fs::create_dir(workspace.join("scans")).unwrap();
    fs::write(workspace.join("scans").join("page1.png"), [0x89, b'P', b'N', b'G']).unwrap();
    fs::write(workspace.join("a.txt"), "ALPHA").unwrap();

    let err = test.store.check_in_document(&ctx, id).unwrap_err();
    assert!(matches!(err.root(), Error::Invalid(_)), "{err}");
    assert!(err.to_string().contains("scans"));
    // nothing committed and the edits are still there
    assert_eq!(test.store.document_versions(&ctx, id).unwrap().len(), 1);
    assert!(test.store.check_out_status(&ctx, id).unwrap().is_some());
    assert!(workspace.join("scans").join("page1.png").exists());

    fs::remove_dir_all(workspace.join("scans")).unwrap();
    let info = test.store.check_in_document(&ctx, id).unwrap();
    assert_eq!(info.modified_files, vec!["a.txt"]);
}

#[cfg(unix)]
#[test]
fn test_symlink_in_workspace_fails_check_in() {
    let test = TestStore::new();
    let id = create(&test);
    let ctx = Context::new();
    let status = test
        .store
        .check_out_document(&ctx, id, UserId::new(), "edit")
        .unwrap();
    let workspace = PathBuf::from(&status.workspace);
    std::os::unix::fs::symlink(workspace.join("a.txt"), workspace.join("alias.txt")).unwrap();

    let err = test.store.check_in_document(&ctx, id).unwrap_err();
    assert!(err.to_string().contains("alias.txt"), "{err}");
    assert_eq!(test.store.document_versions(&ctx, id).unwrap().len(), 1);
    assert!(workspace.join("alias.txt").exists());
}
