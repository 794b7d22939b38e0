use chrono::Duration;
use club_core::Role;
use club_core::model::{
    Email, PathwayDraft, PathwayId, ProgressMark, ProgressStatus, QueryDraft, ResourceDraft,
    ResourceId, User, UserId, PageRequest,
};
use club_core::time::fixed_now;
use storage::StorageError;
use storage::repository::{
    NewPathwayRecord, NewQueryRecord, NewResourceRecord, NewSessionRecord, NewUserRecord,
    PathwayRepository, ProgressRepository, QueryRepository, ResourceRepository,
    SessionRepository, UserRepository,
};
use storage::sqlite::SqliteRepository;

async fn memdb(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!(
        "sqlite:file:memdb_{name}?mode=memory&cache=shared"
    ))
    .await
    .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn add_user(repo: &SqliteRepository, email: &str, role: Role) -> User {
    repo.insert_user(NewUserRecord {
        name: "Member".into(),
        email: Email::parse(email).unwrap(),
        password_hash: "argon2-hash".into(),
        role,
        year: Some(2),
        created_at: fixed_now(),
    })
    .await
    .unwrap()
}

fn resource(title: &str) -> NewResourceRecord {
    let mut draft = ResourceDraft::titled(title).with_kind("video");
    draft.tags = vec!["python".into(), "basics".into()];
    draft.estimated_minutes = Some(30);
    NewResourceRecord {
        fields: draft.validate().unwrap(),
        created_at: fixed_now(),
    }
}

fn pathway(owner: UserId, ids: &[ResourceId]) -> NewPathwayRecord {
    NewPathwayRecord {
        fields: PathwayDraft {
            title: "Data Science Starter".into(),
            description: Some("first steps".into()),
            category: Some("DS".into()),
            resource_ids: ids.to_vec(),
        }
        .validate()
        .unwrap(),
        created_by: owner,
        created_at: fixed_now(),
    }
}

#[tokio::test]
async fn users_roundtrip_and_reject_duplicate_email() {
    let repo = memdb("users").await;
    let admin = add_user(&repo, "Admin@Club.io", Role::Admin).await;
    assert_eq!(admin.email.as_str(), "admin@club.io");

    let creds = repo
        .credentials_by_email(&Email::parse("admin@club.io").unwrap())
        .await
        .unwrap()
        .expect("credentials");
    assert_eq!(creds.user, admin);
    assert_eq!(creds.password_hash, "argon2-hash");

    let err = repo
        .insert_user(NewUserRecord {
            name: "Again".into(),
            email: Email::parse("admin@club.io").unwrap(),
            password_hash: "x".into(),
            role: Role::Public,
            year: None,
            created_at: fixed_now(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let promoted = repo.set_role(admin.id, Role::Junior).await.unwrap();
    assert_eq!(promoted.role, Role::Junior);
    assert!(matches!(
        repo.set_role(UserId::new(999), Role::Admin).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sessions_expire_and_purge() {
    let repo = memdb("sessions").await;
    let user = add_user(&repo, "a@club.io", Role::Junior).await;
    repo.insert_session(NewSessionRecord {
        token: "tok".into(),
        user_id: user.id,
        created_at: fixed_now(),
        expires_at: fixed_now() + Duration::hours(1),
    })
    .await
    .unwrap();

    assert_eq!(repo.session_user("tok", fixed_now()).await.unwrap(), Some(user.id));
    let later = fixed_now() + Duration::hours(2);
    assert_eq!(repo.session_user("tok", later).await.unwrap(), None);
    assert_eq!(repo.purge_expired(later).await.unwrap(), 1);
}

#[tokio::test]
async fn pathway_keeps_resource_order_and_appends_new_ones() {
    let repo = memdb("pathway_order").await;
    let admin = add_user(&repo, "admin@club.io", Role::Admin).await;
    let a = repo.insert_resource(resource("A")).await.unwrap();
    let b = repo.insert_resource(resource("B")).await.unwrap();
    assert_eq!(a.fields.tags, vec!["python".to_string(), "basics".to_string()]);

    let created = repo
        .insert_pathway(pathway(admin.id, &[b.id, a.id]), vec![resource("C")])
        .await
        .unwrap();
    let stored = repo.get_pathway(created.id).await.unwrap().unwrap();
    assert_eq!(stored, created);
    assert_eq!(stored.resource_ids().len(), 3);
    assert_eq!(&stored.resource_ids()[..2], &[b.id, a.id]);

    let mut fields = stored.fields.clone();
    fields.resource_ids = vec![a.id];
    let updated = repo.update_pathway(created.id, fields).await.unwrap();
    assert_eq!(updated.resource_ids(), &[a.id]);
    assert_eq!(repo.list_pathways().await.unwrap(), vec![updated]);
}

#[tokio::test]
async fn failed_pathway_insert_leaves_no_resources_behind() {
    let repo = memdb("pathway_atomic").await;
    let err = repo
        .insert_pathway(
            pathway(UserId::new(404), &[]),
            vec![resource("orphan 1"), resource("orphan 2")],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
    assert!(repo.list_resources().await.unwrap().is_empty());
    assert!(repo.list_pathways().await.unwrap().is_empty());
}

#[tokio::test]
async fn progress_upsert_keeps_one_row_and_first_completion() {
    let repo = memdb("progress_upsert").await;
    let user = add_user(&repo, "j@club.io", Role::Junior).await;
    let r = repo.insert_resource(resource("R")).await.unwrap();
    let p = repo.insert_pathway(pathway(user.id, &[r.id]), vec![]).await.unwrap();

    let t0 = fixed_now();
    let first = repo
        .upsert_progress(
            &ProgressMark::new(user.id, p.id, r.id, ProgressStatus::Completed)
                .with_notes(Some("done".into())),
            t0,
        )
        .await
        .unwrap();
    assert_eq!(first.completed_at, Some(t0));

    let again = repo
        .upsert_progress(
            &ProgressMark::new(user.id, p.id, r.id, ProgressStatus::Completed),
            t0 + Duration::days(1),
        )
        .await
        .unwrap();
    assert_eq!(again.id, first.id);
    assert_eq!(again.completed_at, Some(t0));
    assert_eq!(again.notes.as_deref(), Some("done"));

    let back = repo
        .upsert_progress(
            &ProgressMark::new(user.id, p.id, r.id, ProgressStatus::InProgress),
            t0 + Duration::days(2),
        )
        .await
        .unwrap();
    assert_eq!(back.completed_at, None);
    assert_eq!(repo.entries_for_user(user.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn progress_rejects_unknown_references() {
    let repo = memdb("progress_refs").await;
    let user = add_user(&repo, "j@club.io", Role::Junior).await;
    let r = repo.insert_resource(resource("R")).await.unwrap();
    let err = repo
        .upsert_progress(
            &ProgressMark::new(user.id, PathwayId::new(77), r.id, ProgressStatus::InProgress),
            fixed_now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn deleting_resource_cascades_to_pathways_and_progress() {
    let repo = memdb("resource_cascade").await;
    let user = add_user(&repo, "j@club.io", Role::Junior).await;
    let a = repo.insert_resource(resource("A")).await.unwrap();
    let b = repo.insert_resource(resource("B")).await.unwrap();
    let p = repo.insert_pathway(pathway(user.id, &[a.id, b.id]), vec![]).await.unwrap();
    repo.upsert_progress(
        &ProgressMark::new(user.id, p.id, a.id, ProgressStatus::Completed),
        fixed_now(),
    )
    .await
    .unwrap();

    repo.delete_resource(a.id).await.unwrap();

    let p = repo.get_pathway(p.id).await.unwrap().unwrap();
    assert_eq!(p.resource_ids(), &[b.id]);
    assert!(repo.entries_for_resources(&[a.id]).await.unwrap().is_empty());
    assert!(matches!(
        repo.delete_resource(a.id).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn deleting_pathway_moves_shared_progress_to_remaining_pathway() {
    let repo = memdb("pathway_delete_shared").await;
    let user = add_user(&repo, "j@club.io", Role::Junior).await;
    let shared = repo.insert_resource(resource("Shared")).await.unwrap();
    let own = repo.insert_resource(resource("Own")).await.unwrap();
    let keep = repo.insert_pathway(pathway(user.id, &[shared.id]), vec![]).await.unwrap();
    let doomed = repo
        .insert_pathway(pathway(user.id, &[shared.id, own.id]), vec![])
        .await
        .unwrap();
    for resource_id in [shared.id, own.id] {
        repo.upsert_progress(
            &ProgressMark::new(user.id, doomed.id, resource_id, ProgressStatus::Completed),
            fixed_now(),
        )
        .await
        .unwrap();
    }

    repo.delete_pathway(doomed.id).await.unwrap();

    let entries = repo.entries_for_user(user.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].resource_id, shared.id);
    assert_eq!(entries[0].pathway_id, keep.id);
    assert_eq!(entries[0].status, ProgressStatus::Completed);
    assert!(repo.get_pathway(doomed.id).await.unwrap().is_none());
    assert!(matches!(
        repo.delete_pathway(doomed.id).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn queries_page_newest_first() {
    let repo = memdb("queries").await;
    for n in 0..3 {
        repo.insert_query(NewQueryRecord {
            draft: QueryDraft::validate("Ada", "Lovelace", "ada@club.io", &format!("msg {n}"))
                .unwrap(),
            created_at: fixed_now() + Duration::minutes(n),
        })
        .await
        .unwrap();
    }
    let (page, total) = repo.list_queries(PageRequest::new(Some(1), Some(2))).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].message, "msg 2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_marks_converge_to_one_entry() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("club.sqlite3").display());
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");

    let user = add_user(&repo, "j@club.io", Role::Junior).await;
    let r = repo.insert_resource(resource("R")).await.unwrap();
    let p = repo.insert_pathway(pathway(user.id, &[r.id]), vec![]).await.unwrap();

    let mut handles = Vec::new();
    for n in 0..16 {
        let repo = repo.clone();
        let status = if n % 2 == 0 {
            ProgressStatus::Completed
        } else {
            ProgressStatus::InProgress
        };
        handles.push(tokio::spawn(async move {
            repo.upsert_progress(&ProgressMark::new(user.id, p.id, r.id, status), fixed_now())
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let entries = repo.entries_for_user(user.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.is_completed(), entry.completed_at.is_some());
}
