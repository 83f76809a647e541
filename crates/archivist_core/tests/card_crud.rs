use archivist_core::db::open_db_in_memory;
use archivist_core::{
    ArchiveRepository, ArchiveService, CardDraft, CardPatch, RepoError, ServiceError,
    SqliteArchiveRepository, UNKNOWN_AUTHOR,
};
use rusqlite::Connection;

fn draft(title: &str) -> CardDraft {
    CardDraft::new(
        title,
        "short description",
        "long body",
        &["Alpha".to_string(), "beta".to_string()],
        Some("rafa".to_string()),
    )
}

#[test]
fn create_and_get_roundtrip() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteArchiveRepository::try_new(&mut conn).unwrap();

    let created = repo.create_card(&draft("Q1 plan")).unwrap();
    assert!(created.id > 0);
    assert!(created.modified > 0);
    assert_eq!(created.modified_by, "rafa");
    assert_eq!(created.tags, vec!["alpha".to_string(), "beta".to_string()]);

    let loaded = repo.get_card(created.id).unwrap().unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn create_without_author_records_unknown() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteArchiveRepository::try_new(&mut conn).unwrap();

    let created = repo
        .create_card(&CardDraft::new("untitled author", "", "body", &[], None))
        .unwrap();
    assert_eq!(created.modified_by, UNKNOWN_AUTHOR);
}

#[test]
fn duplicate_title_fails_and_leaves_first_card_untouched() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteArchiveRepository::try_new(&mut conn).unwrap();

    let first = repo.create_card(&draft("unique title")).unwrap();
    let err = repo.create_card(&draft("unique title")).unwrap_err();
    assert!(matches!(err, RepoError::DuplicateTitle(title) if title == "unique title"));

    let survivor = repo.get_card(first.id).unwrap().unwrap();
    assert_eq!(survivor, first);
    assert_eq!(repo.list_cards().unwrap().len(), 1);
}

#[test]
fn update_applies_only_present_fields() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteArchiveRepository::try_new(&mut conn).unwrap();

    let created = repo.create_card(&draft("patch target")).unwrap();
    let patch = CardPatch {
        desc: Some("new description".to_string()),
        ..CardPatch::default()
    };
    let updated = repo.update_card(created.id, &patch, Some("editor")).unwrap();

    assert_eq!(updated.title, "patch target");
    assert_eq!(updated.desc, "new description");
    assert_eq!(updated.content, created.content);
    assert_eq!(updated.tags, created.tags);
    assert_eq!(updated.modified_by, "editor");
}

#[test]
fn update_with_explicit_empty_string_clears_the_field() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteArchiveRepository::try_new(&mut conn).unwrap();

    let created = repo.create_card(&draft("clear target")).unwrap();
    let patch = CardPatch {
        desc: Some(String::new()),
        content: Some(String::new()),
        tags: Some(Vec::new()),
        ..CardPatch::default()
    };
    let updated = repo.update_card(created.id, &patch, None).unwrap();

    assert_eq!(updated.desc, "");
    assert_eq!(updated.content, "");
    assert!(updated.tags.is_empty());
    assert_eq!(updated.modified_by, UNKNOWN_AUTHOR);
}

#[test]
fn update_title_collision_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteArchiveRepository::try_new(&mut conn).unwrap();

    repo.create_card(&draft("taken")).unwrap();
    let other = repo.create_card(&draft("renaming")).unwrap();

    let patch = CardPatch {
        title: Some("taken".to_string()),
        ..CardPatch::default()
    };
    let err = repo.update_card(other.id, &patch, None).unwrap_err();
    assert!(matches!(err, RepoError::DuplicateTitle(_)));

    // Re-asserting its own title is not a collision.
    let same = CardPatch {
        title: Some("renaming".to_string()),
        ..CardPatch::default()
    };
    repo.update_card(other.id, &same, None).unwrap();
}

#[test]
fn update_unknown_card_returns_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteArchiveRepository::try_new(&mut conn).unwrap();

    let patch = CardPatch {
        desc: Some("x".to_string()),
        ..CardPatch::default()
    };
    let err = repo.update_card(999, &patch, None).unwrap_err();
    assert!(matches!(err, RepoError::CardNotFound(999)));
}

#[test]
fn delete_reports_whether_a_row_was_removed() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteArchiveRepository::try_new(&mut conn).unwrap();

    let created = repo.create_card(&draft("to delete")).unwrap();
    assert!(repo.delete_card(created.id).unwrap());
    assert!(!repo.delete_card(created.id).unwrap());
    assert!(repo.get_card(created.id).unwrap().is_none());
}

#[test]
fn list_returns_cards_in_id_order() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteArchiveRepository::try_new(&mut conn).unwrap();

    let a = repo.create_card(&draft("first")).unwrap();
    let b = repo.create_card(&draft("second")).unwrap();
    let c = repo.create_card(&draft("third")).unwrap();

    let listed = repo.list_cards().unwrap();
    let ids: Vec<_> = listed.iter().map(|card| card.id).collect();
    assert_eq!(ids, vec![a.id, b.id, c.id]);
}

#[test]
fn service_rejects_blank_title_and_content_before_storage() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteArchiveRepository::try_new(&mut conn).unwrap();
    let mut service = ArchiveService::new(repo);

    let err = service.new_card("   ", "", "body", &[], None).unwrap_err();
    assert!(matches!(err, ServiceError::EmptyField("title")));

    let err = service.new_card("title", "", "  ", &[], None).unwrap_err();
    assert!(matches!(err, ServiceError::EmptyField("content")));

    assert!(service.cards().unwrap().is_empty());
}

#[test]
fn service_rejects_empty_patch() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteArchiveRepository::try_new(&mut conn).unwrap();
    let mut service = ArchiveService::new(repo);

    let card = service
        .new_card("patchless", "", "body", &[], None)
        .unwrap();
    let err = service
        .modify_card(card.id, &CardPatch::default(), None)
        .unwrap_err();
    assert!(matches!(err, ServiceError::EmptyPatch));

    let unchanged = service.get_card(card.id).unwrap().unwrap();
    assert_eq!(unchanged, card);
}

#[test]
fn service_batch_get_preserves_input_order() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteArchiveRepository::try_new(&mut conn).unwrap();
    let mut service = ArchiveService::new(repo);

    let a = service.new_card("batch a", "", "body", &[], None).unwrap();
    let b = service.new_card("batch b", "", "body", &[], None).unwrap();

    let found = service.get_cards(&[b.id, 999, a.id]).unwrap();
    assert_eq!(found.len(), 3);
    assert_eq!(found[0].as_ref().unwrap().id, b.id);
    assert!(found[1].is_none());
    assert_eq!(found[2].as_ref().unwrap().id, a.id);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let mut conn = Connection::open_in_memory().unwrap();

    match SqliteArchiveRepository::try_new(&mut conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}
