//! Repository-level tests for the database crate

use backstage_config::DatabaseConfig;
use backstage_database::{
    initialize_database, ActivityFilter, ActivityRepository, DatabaseError, InfoItemFilter,
    InfoItemKind, InfoItemRepository, InfoItemUpdate, NewActivity, NewInfoItem, NewNotification,
    NewPoll, NewUser, NotificationKind, NotificationRepository, Page, PollRepository,
    SessionRepository, User, UserRepository, UserRole, UserUpdate,
};
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn create_test_database() -> (SqlitePool, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}", temp_dir.path().join("repo.db").display()),
        max_connections: 2,
    };
    let pool = initialize_database(&config).await.unwrap();
    (pool, temp_dir)
}

fn new_user(username: &str, role: UserRole) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: Some(format!("{username}@station.test")),
        display_name: username.to_uppercase(),
        password_hash: "not-a-real-hash".to_string(),
        role,
        azuracast_streamer_id: None,
    }
}

async fn seed_user(pool: &SqlitePool, username: &str, role: UserRole) -> User {
    UserRepository::new(pool.clone())
        .create(&new_user(username, role))
        .await
        .unwrap()
}

#[tokio::test]
async fn user_crud_and_case_insensitive_lookup() {
    let (pool, _temp_dir) = create_test_database().await;
    let repo = UserRepository::new(pool);

    let created = repo.create(&new_user("maria", UserRole::Dj)).await.unwrap();
    assert!(created.id > 0);
    assert!(created.is_active);
    assert_eq!(created.role, UserRole::Dj);

    let found = repo.find_by_username("  MARIA ").await.unwrap().unwrap();
    assert_eq!(found.id, created.id);

    let by_public = repo
        .find_by_public_id(&created.public_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_public.username, "maria");

    let updated = repo
        .update(
            created.id,
            &UserUpdate {
                display_name: Some("Maria Night Shift".into()),
                azuracast_streamer_id: Some(Some(7)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.display_name, "Maria Night Shift");
    assert_eq!(updated.azuracast_streamer_id, Some(7));
    assert!(updated.can_manage_streamer(7));
    assert!(!updated.can_manage_streamer(8));

    let deactivated = repo
        .update(
            created.id,
            &UserUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!deactivated.is_active);
    assert!(repo.list(false).await.unwrap().is_empty());
    assert_eq!(repo.list(true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
    let (pool, _temp_dir) = create_test_database().await;
    let repo = UserRepository::new(pool);

    repo.create(&new_user("alex", UserRole::Staff)).await.unwrap();
    let mut duplicate = new_user("ALEX", UserRole::Staff);
    duplicate.email = None;

    let error = repo.create(&duplicate).await.unwrap_err();
    assert!(matches!(error, DatabaseError::Conflict(_)), "{error:?}");
}

#[tokio::test]
async fn update_of_missing_user_is_not_found() {
    let (pool, _temp_dir) = create_test_database().await;
    let repo = UserRepository::new(pool);

    let error = repo
        .update(
            999,
            &UserUpdate {
                display_name: Some("ghost".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(error, DatabaseError::NotFound("user")));
}

#[tokio::test]
async fn sessions_can_be_revoked_once() {
    let (pool, _temp_dir) = create_test_database().await;
    let user = seed_user(&pool, "sam", UserRole::Staff).await;
    let repo = SessionRepository::new(pool);

    let session = repo
        .create("sid-1", user.id, Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    assert!(session.is_valid_at(Utc::now()));

    repo.revoke("sid-1").await.unwrap();
    let stored = repo.find("sid-1").await.unwrap().unwrap();
    assert!(!stored.is_valid_at(Utc::now()));

    assert!(matches!(
        repo.revoke("sid-1").await.unwrap_err(),
        DatabaseError::NotFound(_)
    ));
}

#[tokio::test]
async fn expired_sessions_are_purged() {
    let (pool, _temp_dir) = create_test_database().await;
    let user = seed_user(&pool, "sam", UserRole::Staff).await;
    let repo = SessionRepository::new(pool);

    repo.create("old", user.id, Utc::now() - Duration::minutes(5))
        .await
        .unwrap();
    repo.create("fresh", user.id, Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(repo.purge_expired(Utc::now()).await.unwrap(), 1);
    assert!(repo.find("old").await.unwrap().is_none());
    assert!(repo.find("fresh").await.unwrap().is_some());
}

#[tokio::test]
async fn one_vote_per_user_per_poll() {
    let (pool, _temp_dir) = create_test_database().await;
    let admin = seed_user(&pool, "admin", UserRole::Admin).await;
    let voter = seed_user(&pool, "voter", UserRole::Staff).await;
    let repo = PollRepository::new(pool);

    let poll = repo
        .create(NewPoll {
            question: "Friday theme night?".into(),
            description: None,
            options: vec!["Disco".into(), "Synthwave".into()],
            expires_at: Some(Utc::now() + Duration::days(1)),
            created_by: admin.id,
        })
        .await
        .unwrap();

    let options = repo.options(poll.id).await.unwrap();
    assert_eq!(options.len(), 2);
    assert_eq!(options[0].label, "Disco");

    repo.cast_vote(&poll.public_id, &options[1].public_id, voter.id)
        .await
        .unwrap();

    let second = repo
        .cast_vote(&poll.public_id, &options[0].public_id, voter.id)
        .await
        .unwrap_err();
    assert!(matches!(second, DatabaseError::Conflict(_)));

    let summary = repo.summary(poll.clone(), voter.id).await.unwrap();
    assert_eq!(summary.total_votes, 1);
    assert_eq!(summary.my_vote.as_deref(), Some(options[1].public_id.as_str()));
    assert_eq!(summary.results[0].votes, 0);
    assert_eq!(summary.results[1].votes, 1);
}

#[tokio::test]
async fn votes_require_an_open_poll_and_a_matching_option() {
    let (pool, _temp_dir) = create_test_database().await;
    let admin = seed_user(&pool, "admin", UserRole::Admin).await;
    let repo = PollRepository::new(pool);

    let make = |question: &str| NewPoll {
        question: question.into(),
        description: None,
        options: vec!["Yes".into(), "No".into()],
        expires_at: None,
        created_by: admin.id,
    };

    let first = repo.create(make("First?")).await.unwrap();
    let second = repo.create(make("Second?")).await.unwrap();
    let foreign_option = repo.options(second.id).await.unwrap().remove(0);

    let error = repo
        .cast_vote(&first.public_id, &foreign_option.public_id, admin.id)
        .await
        .unwrap_err();
    assert!(matches!(error, DatabaseError::Validation(_)));

    repo.close(first.id).await.unwrap();
    let own_option = repo.options(first.id).await.unwrap().remove(0);
    let error = repo
        .cast_vote(&first.public_id, &own_option.public_id, admin.id)
        .await
        .unwrap_err();
    assert!(matches!(error, DatabaseError::Conflict(_)));

    let error = repo
        .cast_vote("missing", &own_option.public_id, admin.id)
        .await
        .unwrap_err();
    assert!(matches!(error, DatabaseError::NotFound("poll")));

    let open = repo.list(false).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].public_id, second.public_id);
    assert_eq!(repo.list(true).await.unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_polls_are_rejected_before_insert() {
    let (pool, _temp_dir) = create_test_database().await;
    let admin = seed_user(&pool, "admin", UserRole::Admin).await;
    let repo = PollRepository::new(pool);

    let error = repo
        .create(NewPoll {
            question: "Only one choice?".into(),
            description: None,
            options: vec!["Sure".into()],
            expires_at: None,
            created_by: admin.id,
        })
        .await
        .unwrap_err();
    assert!(matches!(error, DatabaseError::Validation(_)));
    assert!(repo.list(true).await.unwrap().is_empty());
}

#[tokio::test]
async fn notifications_fan_out_and_track_read_state() {
    let (pool, _temp_dir) = create_test_database().await;
    let admin = seed_user(&pool, "admin", UserRole::Admin).await;
    let dj = seed_user(&pool, "dj", UserRole::Dj).await;
    let staff = seed_user(&pool, "staff", UserRole::Staff).await;
    let repo = NotificationRepository::new(pool);

    let broadcast = NewNotification {
        kind: NotificationKind::Poll,
        title: "New poll".into(),
        body: "Vote on the Friday theme".into(),
        link: Some("/polls".into()),
    };
    let created = repo
        .create_for_all_active_users(&broadcast, Some(admin.id))
        .await
        .unwrap();
    assert_eq!(created, 2);
    assert_eq!(repo.unread_count(admin.id).await.unwrap(), 0);
    assert_eq!(repo.unread_count(dj.id).await.unwrap(), 1);

    let listed = repo.list(dj.id, true, Page::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].kind, NotificationKind::Poll);

    let error = repo
        .mark_read(staff.id, &listed[0].public_id)
        .await
        .unwrap_err();
    assert!(matches!(error, DatabaseError::NotFound(_)));

    repo.mark_read(dj.id, &listed[0].public_id).await.unwrap();
    assert_eq!(repo.unread_count(dj.id).await.unwrap(), 0);
    assert_eq!(repo.list(dj.id, false, Page::default()).await.unwrap().len(), 1);

    assert_eq!(repo.mark_all_read(staff.id).await.unwrap(), 1);
    assert_eq!(repo.unread_count(staff.id).await.unwrap(), 0);
}

#[tokio::test]
async fn vault_items_filter_and_update() {
    let (pool, _temp_dir) = create_test_database().await;
    let admin = seed_user(&pool, "admin", UserRole::Admin).await;
    let repo = InfoItemRepository::new(pool);

    let secret = repo
        .create(&NewInfoItem {
            kind: InfoItemKind::Secret,
            title: "Encoder password".into(),
            description: Some("Studio B streaming encoder".into()),
            content: "hunter2".into(),
            category: Some("Studio".into()),
            created_by: admin.id,
        })
        .await
        .unwrap();
    repo.create(&NewInfoItem {
        kind: InfoItemKind::Link,
        title: "Rota spreadsheet".into(),
        description: None,
        content: "https://docs.example.org/rota".into(),
        category: Some("Admin".into()),
        created_by: admin.id,
    })
    .await
    .unwrap();

    let secrets = repo
        .list(&InfoItemFilter {
            kind: Some(InfoItemKind::Secret),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(secrets.len(), 1);
    assert!(secrets[0].is_secret());

    let searched = repo
        .list(&InfoItemFilter {
            search: Some("studio b".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].public_id, secret.public_id);

    let updated = repo
        .update(
            secret.id,
            &InfoItemUpdate {
                content: Some("correct-horse".into()),
                category: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.content, "correct-horse");
    assert!(updated.category.is_none());

    repo.delete(secret.id).await.unwrap();
    assert!(repo
        .find_by_public_id(&secret.public_id)
        .await
        .unwrap()
        .is_none());
    assert!(matches!(
        repo.delete(secret.id).await.unwrap_err(),
        DatabaseError::NotFound(_)
    ));
}

#[tokio::test]
async fn activity_log_joins_user_and_filters() {
    let (pool, _temp_dir) = create_test_database().await;
    let admin = seed_user(&pool, "admin", UserRole::Admin).await;
    let repo = ActivityRepository::new(pool);

    repo.record(&NewActivity::new(Some(admin.id), "login", "session"))
        .await
        .unwrap();
    repo.record(
        &NewActivity::new(Some(admin.id), "poll.create", "poll")
            .entity("p1")
            .details(json!({ "question": "Friday theme night?" })),
    )
    .await
    .unwrap();
    repo.record(&NewActivity::new(None, "analytics.build", "report"))
        .await
        .unwrap();

    let all = repo
        .list(&ActivityFilter::default(), Page::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert!(all[0].user_id.is_none());

    let polls = repo
        .list(
            &ActivityFilter {
                action: Some("poll.create".into()),
                ..Default::default()
            },
            Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(polls.len(), 1);
    assert_eq!(polls[0].username.as_deref(), Some("admin"));
    assert_eq!(polls[0].user_id.as_deref(), Some(admin.public_id.as_str()));
    assert_eq!(polls[0].details.as_ref().unwrap()["question"], "Friday theme night?");

    let by_user = repo
        .list(
            &ActivityFilter {
                user_public_id: Some(admin.public_id.clone()),
                ..Default::default()
            },
            Page::new(Some(1), None),
        )
        .await
        .unwrap();
    assert_eq!(by_user.len(), 1);
}

#[tokio::test]
async fn last_active_admin_cannot_be_removed() {
    let (pool, _temp_dir) = create_test_database().await;
    let repo = UserRepository::new(pool.clone());
    let first = seed_user(&pool, "first_admin", UserRole::Admin).await;
    let second = seed_user(&pool, "second_admin", UserRole::Admin).await;

    let demote = UserUpdate {
        role: Some(UserRole::Staff),
        ..Default::default()
    };
    repo.update(first.id, &demote).await.unwrap();

    let err = repo.update(second.id, &demote).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Conflict(_)));

    let deactivate = UserUpdate {
        is_active: Some(false),
        ..Default::default()
    };
    let err = repo.update(second.id, &deactivate).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Conflict(_)));

    let err = repo.update(9_999, &deactivate).await.unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound("user")));

    // The guard only applies to active admins.
    repo.update(first.id, &deactivate).await.unwrap();
    assert_eq!(repo.count_active_admins().await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_admin_deactivations_leave_one_admin() {
    let (pool, _temp_dir) = create_test_database().await;
    let repo = UserRepository::new(pool.clone());
    let first = seed_user(&pool, "first_admin", UserRole::Admin).await;
    let second = seed_user(&pool, "second_admin", UserRole::Admin).await;

    let deactivate = UserUpdate {
        is_active: Some(false),
        ..Default::default()
    };
    let (a, b) = tokio::join!(
        repo.update(first.id, &deactivate),
        repo.update(second.id, &deactivate)
    );

    assert_eq!(
        [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(),
        1
    );
    assert_eq!(repo.count_active_admins().await.unwrap(), 1);
}
