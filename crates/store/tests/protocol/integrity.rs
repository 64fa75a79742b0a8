//! Read-back verification of committed versions

use crate::common::{ctx_at, random_files, TestStore};
use docver_core::{read_file_infos, CompanyId, Context, DocumentId, UserId};
use docver_store::{DocumentBackend, VersionStorage};
use std::fs;

#[test]
fn test_round_trip_reproduces_file_infos() {
    let test = TestStore::new();
    let ctx = Context::new();
    for seed in 0..5 {
        let id = DocumentId::new();
        let files = random_files(seed, 12);
        let info = test
            .store
            .create_document(&ctx_at(1_000), CompanyId::new(), id, UserId::new(), "", files.clone())
            .unwrap();

        assert_eq!(test.store.verify_document_version(&ctx, id, info.version).unwrap(), info);

        let stored = test.faults().inner().version_files(id, info.version).unwrap();
        assert_eq!(read_file_infos(&ctx, stored.as_ref()).unwrap(), info.files);

        let provider = test
            .store
            .document_version_file_provider(&ctx, id, info.version)
            .unwrap();
        for file in &files {
            assert_eq!(provider.read_file(file.name()).unwrap(), file.read().unwrap());
        }
    }
}

#[test]
fn test_tampered_file_is_corruption() {
    let test = TestStore::new();
    let ctx = Context::new();
    let id = DocumentId::new();
    let info = test
        .store
        .create_document(&ctx_at(1_000), CompanyId::new(), id, UserId::new(), "", random_files(9, 3))
        .unwrap();

    let version_dir = test
        .root
        .join("documents")
        .join(id.to_string())
        .join(info.version.to_string());
    let path = version_dir.join("file-01.bin");
    let mut data = fs::read(&path).unwrap();
    data.push(0);
    fs::write(&path, data).unwrap();

    assert!(test
        .store
        .verify_document_version(&ctx, id, info.version)
        .unwrap_err()
        .is_corruption());
    assert!(test
        .store
        .read_document_version_file(&ctx, id, info.version, "file-01.bin")
        .unwrap_err()
        .is_corruption());
    // untouched files still read fine
    test.store
        .read_document_version_file(&ctx, id, info.version, "file-00.bin")
        .unwrap();
}

#[test]
fn test_missing_and_unrecorded_files_are_corruption() {
    let test = TestStore::new();
    let ctx = Context::new();
    let id = DocumentId::new();
    let info = test
        .store
        .create_document(&ctx_at(1_000), CompanyId::new(), id, UserId::new(), "", random_files(3, 2))
        .unwrap();
    let version_dir = test
        .root
        .join("documents")
        .join(id.to_string())
        .join(info.version.to_string());

    fs::write(version_dir.join("stray.bin"), b"?").unwrap();
    assert!(test
        .store
        .verify_document_version(&ctx, id, info.version)
        .unwrap_err()
        .is_corruption());
    fs::remove_file(version_dir.join("stray.bin")).unwrap();

    fs::remove_file(version_dir.join("file-00.bin")).unwrap();
    assert!(test
        .store
        .verify_document_version(&ctx, id, info.version)
        .unwrap_err()
        .is_corruption());
    let err = test
        .store
        .read_document_version_file(&ctx, id, info.version, "file-00.bin")
        .unwrap_err();
    assert!(err.is_corruption(), "{err}");
}

#[test]
fn test_corrupt_previous_version_blocks_commit() {
    let test = TestStore::new();
    let id = DocumentId::new();
    let info = test
        .store
        .create_document(&ctx_at(1_000), CompanyId::new(), id, UserId::new(), "", random_files(4, 2))
        .unwrap();
    let path = test
        .root
        .join("documents")
        .join(id.to_string())
        .join(info.version.to_string())
        .join("file-00.bin");
    fs::write(&path, b"tampered").unwrap();

    let err = test
        .store
        .restore_document_version(&ctx_at(2_000), id, info.version, UserId::new(), "")
        .unwrap_err();
    assert!(err.is_corruption());
    assert_eq!(
        test.store.document_versions(&Context::new(), id).unwrap(),
        vec![info.version]
    );
}
