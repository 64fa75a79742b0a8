//! Failed and no-op commits leave no trace

use crate::common::{ctx_at, mem, random_files, Step, TestStore};
use docver_core::{CompanyId, Context, DocumentId, Error, MemFile, UserId, VersionTime};
use docver_store::{DocumentBackend, NewVersion};
use std::fs;
use std::path::PathBuf;

const FILES: usize = 6;

fn create(test: &TestStore, id: DocumentId) {
    test.store
        .create_document(
            &ctx_at(1_000),
            CompanyId::new(),
            id,
            UserId::new(),
            "",
            random_files(1, FILES),
        )
        .unwrap();
}

#[test]
fn test_failed_create_at_every_copy_step() {
    for fail_at in 0..FILES as i64 {
        let test = TestStore::new();
        let before = test.snapshot();
        let id = DocumentId::new();
        let company = CompanyId::new();

        test.faults().fail_stage_after(fail_at);
        let err = test
            .store
            .create_document(&ctx_at(1_000), company, id, UserId::new(), "", random_files(1, FILES))
            .unwrap_err();
        assert!(matches!(err.root(), Error::Io { .. }), "fail_at {fail_at}: {err}");

        let ctx = Context::new();
        assert!(!test.store.document_exists(&ctx, id).unwrap());
        let mut in_company = Vec::new();
        test.store
            .enum_company_document_ids(&ctx, company, &mut |id| {
                in_company.push(id);
                Ok(())
            })
            .unwrap();
        assert!(in_company.is_empty());
        assert_eq!(test.snapshot(), before, "fail_at {fail_at}");
    }
}

#[test]
fn test_failed_create_at_metadata_step() {
    let test = TestStore::new();
    let before = test.snapshot();
    let id = DocumentId::new();
    test.faults().fail_commit();
    test.store
        .create_document(&ctx_at(1_000), CompanyId::new(), id, UserId::new(), "", vec![
            mem("a.txt", "x"),
        ])
        .unwrap_err();
    assert_eq!(test.faults().staged_count(), 1);
    assert_eq!(test.snapshot(), before);

    // the same ID is usable afterwards
    test.faults().heal();
    test.store
        .create_document(&ctx_at(1_000), CompanyId::new(), id, UserId::new(), "", vec![
            mem("a.txt", "x"),
        ])
        .unwrap();
}

#[test]
fn test_failed_add_version_at_every_copy_step() {
    // five files carried forward plus two written, one of them replacing
    for fail_at in 0..FILES as i64 {
        let test = TestStore::new();
        let id = DocumentId::new();
        create(&test, id);
        let before = test.snapshot();

        test.faults().fail_stage_after(fail_at);
        let err = test
            .store
            .add_document_version(&ctx_at(2_000), id, UserId::new(), "", &mut |ctx, _, _| {
                Ok(NewVersion::new(VersionTime::now(ctx))
                    .write(MemFile::new("file-00.bin", "changed"))
                    .write(MemFile::new("extra.txt", "new"))
                    .delete("file-01.bin"))
            })
            .unwrap_err();
        assert!(matches!(err.root(), Error::Io { .. }), "fail_at {fail_at}: {err}");
        assert_eq!(test.snapshot(), before, "fail_at {fail_at}");
        assert_eq!(
            test.store.document_versions(&Context::new(), id).unwrap(),
            vec![VersionTime::from_unix_millis(1_000)]
        );
    }
}

#[test]
fn test_failed_check_in_keeps_checkout() {
    let test = TestStore::new();
    let id = DocumentId::new();
    create(&test, id);
    let ctx = ctx_at(2_000);
    test.store
        .check_out_document(&ctx, id, UserId::new(), "edit")
        .unwrap();
    test.store
        .write_checkout_file(&ctx, id, &MemFile::new("file-03.bin", "edited"))
        .unwrap();
    let before = test.snapshot();

    test.faults().fail_stage_after(2);
    test.store.check_in_document(&ctx, id).unwrap_err();
    assert_eq!(test.snapshot(), before);
    assert!(test.store.check_out_status(&ctx, id).unwrap().is_some());

    test.faults().heal();
    let info = test.store.check_in_document(&ctx, id).unwrap();
    assert_eq!(info.modified_files, vec!["file-03.bin"]);
}

#[test]
fn test_missing_workspace_fails_check_in() {
    let test = TestStore::new();
    let id = DocumentId::new();
    create(&test, id);
    let ctx = ctx_at(2_000);
    let status = test
        .store
        .check_out_document(&ctx, id, UserId::new(), "edit")
        .unwrap();
    fs::remove_dir_all(&status.workspace).unwrap();

    // a lost workspace must not read as "every file deleted"
    let err = test.store.check_in_document(&ctx, id).unwrap_err();
    assert!(matches!(err.root(), Error::Io { .. }), "{err}");
    assert_eq!(
        test.store.document_versions(&ctx, id).unwrap(),
        vec![VersionTime::from_unix_millis(1_000)]
    );
    assert_eq!(test.store.check_out_status(&ctx, id).unwrap(), Some(status));

    test.store.cancel_check_out_document(&ctx, id).unwrap();
    assert!(test.store.check_out_status(&ctx, id).unwrap().is_none());
}

#[test]
fn test_workspace_cleanup_failure_keeps_check_in_commit() {
    let test = TestStore::new();
    let id = DocumentId::new();
    create(&test, id);
    let ctx = ctx_at(2_000);
    let status = test
        .store
        .check_out_document(&ctx, id, UserId::new(), "edit")
        .unwrap();
    fs::write(PathBuf::from(&status.workspace).join("file-00.bin"), "edited").unwrap();

    test.faults().fail(Step::RemoveWorkspace);
    let err = test.store.check_in_document(&ctx, id).unwrap_err();
    assert!(matches!(err.root(), Error::Io { .. }), "{err}");

    let versions = test.store.document_versions(&ctx, id).unwrap();
    assert_eq!(versions.len(), 2);
    let info = test
        .store
        .document_version_info(&ctx, id, versions[1])
        .unwrap();
    assert_eq!(info.modified_files, vec!["file-00.bin"]);
    // the marker went first, so only a stray workspace remains
    assert!(test.store.check_out_status(&ctx, id).unwrap().is_none());
    assert!(PathBuf::from(&status.workspace).exists());

    // the next checkout replaces it
    let next = test
        .store
        .check_out_document(&ctx, id, UserId::new(), "again")
        .unwrap();
    assert_eq!(next.version, versions[1]);
    assert_eq!(
        fs::read(PathBuf::from(&next.workspace).join("file-00.bin")).unwrap(),
        b"edited"
    );
}

#[test]
fn test_marker_cleanup_failure_keeps_check_in_commit() {
    let test = TestStore::new();
    let id = DocumentId::new();
    create(&test, id);
    let ctx = ctx_at(2_000);
    test.store
        .check_out_document(&ctx, id, UserId::new(), "edit")
        .unwrap();
    test.store.remove_checkout_file(&ctx, id, "file-05.bin").unwrap();

    test.faults().fail(Step::RemoveCheckout);
    test.store.check_in_document(&ctx, id).unwrap_err();
    assert_eq!(test.store.document_versions(&ctx, id).unwrap().len(), 2);
    assert!(test.store.check_out_status(&ctx, id).unwrap().is_some());

    test.store.cancel_check_out_document(&ctx, id).unwrap();
    assert!(test.store.check_out_status(&ctx, id).unwrap().is_none());
    assert_eq!(test.store.document_versions(&ctx, id).unwrap().len(), 2);
}

#[test]
fn test_failed_company_change_rolls_back_version() {
    let test = TestStore::new();
    let id = DocumentId::new();
    let (old, new) = (CompanyId::new(), CompanyId::new());
    test.store
        .create_document(&ctx_at(1_000), old, id, UserId::new(), "", vec![mem("a.txt", "a")])
        .unwrap();
    let before = test.snapshot();

    // the storage switches the owner, then reports a failure
    test.faults().fail(Step::SetCompany);
    let err = test
        .store
        .add_document_version(&ctx_at(2_000), id, UserId::new(), "", &mut |ctx, _, _| {
            Ok(NewVersion::new(VersionTime::now(ctx))
                .write(MemFile::new("b.txt", "b"))
                .company(new))
        })
        .unwrap_err();
    assert!(matches!(err.root(), Error::Io { .. }), "{err}");

    let ctx = Context::new();
    assert_eq!(test.store.document_company_id(&ctx, id).unwrap(), old);
    assert_eq!(
        test.store.document_versions(&ctx, id).unwrap(),
        vec![VersionTime::from_unix_millis(1_000)]
    );
    let mut in_new = Vec::new();
    test.store
        .enum_company_document_ids(&ctx, new, &mut |id| {
            in_new.push(id);
            Ok(())
        })
        .unwrap();
    assert!(in_new.is_empty());
    assert_eq!(test.snapshot(), before);
}

#[test]
fn test_failed_checkout_marker_removes_workspace() {
    let test = TestStore::new();
    let id = DocumentId::new();
    create(&test, id);
    let before = test.snapshot();

    test.faults().fail(Step::WriteCheckout);
    let ctx = Context::new();
    test.store
        .check_out_document(&ctx, id, UserId::new(), "edit")
        .unwrap_err();
    assert!(test.store.check_out_status(&ctx, id).unwrap().is_none());
    assert_eq!(test.snapshot(), before);
}

#[test]
fn test_delete_document_continues_after_failed_step() {
    let test = TestStore::new();
    let id = DocumentId::new();
    create(&test, id);

    // a file where the workspace directory belongs cannot be removed as one
    let workspace = test.root.join("workspaces").join(id.to_string());
    fs::write(&workspace, "stray").unwrap();

    let ctx = Context::new();
    let err = test.store.delete_document(&ctx, id).unwrap_err();
    assert!(matches!(err.root(), Error::Io { .. }), "{err}");
    assert!(!test.store.document_exists(&ctx, id).unwrap());
    assert!(!test.root.join("documents").join(id.to_string()).exists());
    let mut listed = Vec::new();
    test.store
        .enum_document_ids(&ctx, &mut |id| {
            listed.push(id);
            Ok(())
        })
        .unwrap();
    assert!(listed.is_empty());
}

#[test]
fn test_failed_delete_document_surfaces_error() {
    let test = TestStore::new();
    let id = DocumentId::new();
    create(&test, id);

    test.faults().fail(Step::RemoveDocument);
    let ctx = Context::new();
    assert!(test.store.delete_document(&ctx, id).is_err());
    assert!(test.store.document_exists(&ctx, id).unwrap());
    test.store.delete_document(&ctx, id).unwrap();
    assert!(!test.store.document_exists(&ctx, id).unwrap());
}

#[test]
fn test_failed_checkout_removes_workspace() {
    let test = TestStore::new();
    let id = DocumentId::new();
    create(&test, id);
    let before = test.snapshot();

    test.faults().fail_workspace_after(3);
    let ctx = Context::new();
    test.store
        .check_out_document(&ctx, id, UserId::new(), "edit")
        .unwrap_err();
    assert!(test.store.check_out_status(&ctx, id).unwrap().is_none());
    assert!(!test.root.join("workspaces").join(id.to_string()).exists());
    assert_eq!(test.snapshot(), before);
}

#[test]
fn test_identical_content_is_no_changes() {
    let test = TestStore::new();
    let id = DocumentId::new();
    create(&test, id);
    let before = test.snapshot();

    // write every file back unchanged
    let err = test
        .store
        .add_document_version(&ctx_at(2_000), id, UserId::new(), "", &mut |ctx, _, files| {
            let mut next = NewVersion::new(VersionTime::now(ctx));
            for name in files.list_files()? {
                let data = files.read_file(&name)?;
                next = next.write(MemFile::new(name, data));
            }
            Ok(next)
        })
        .unwrap_err();
    assert!(err.is_no_changes());
    let prev = VersionTime::from_unix_millis(1_000);
    assert!(matches!(err, Error::NoChanges { version, .. } if version == prev));
    assert_eq!(test.snapshot(), before);
}

#[test]
fn test_cancelled_commit_rolls_back() {
    let test = TestStore::new();
    let id = DocumentId::new();
    create(&test, id);
    let before = test.snapshot();

    let ctx = ctx_at(2_000);
    let err = test
        .store
        .add_document_version(&ctx, id, UserId::new(), "", &mut |ctx, _, _| {
            // the caller gives up while the version is being computed
            ctx.cancel();
            Ok(NewVersion::new(VersionTime::now(ctx)).write(MemFile::new("late.txt", "x")))
        })
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(test.snapshot(), before);
}

#[test]
fn test_cancelled_before_start_touches_nothing() {
    let test = TestStore::new();
    let before = test.snapshot();
    let ctx = Context::new();
    ctx.cancel();
    let err = test
        .store
        .create_document(&ctx, CompanyId::new(), DocumentId::new(), UserId::new(), "", vec![
            mem("a", "1"),
        ])
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(test.faults().staged_count(), 0);
    assert_eq!(test.snapshot(), before);
}
