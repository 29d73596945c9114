//! Integration tests for the PostgreSQL demo store.
//!
//! Exercises the repositories through `PgDemoStore` against a real database:
//! - Mode columns round-trip into `DemoSource`
//! - Unique constraints on slug and project surface as conflicts
//! - The mode CHECK constraint rejects mixed rows
//! - Grant upsert, legacy level mapping and access log cascade

use assert_matches::assert_matches;
use chrono::Utc;
use showcase_core::access::{AccessLevel, GrantAccess};
use showcase_core::demo::{BuildType, DemoSource, DemoStatus, NewDemoProject};
use showcase_core::demo_store::{
    DemoContent, DemoRecordStore, DemoStatusChange, NewAccessLogEntry, StoreError,
};
use showcase_db::models::project::CreateProject;
use showcase_db::models::user::CreateUser;
use showcase_db::repositories::{ProjectRepo, UserRepo};
use showcase_db::PgDemoStore;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, username: &str, role: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            role: role.to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

async fn seed_project(pool: &PgPool, name: &str, client_id: i64) -> i64 {
    ProjectRepo::create(
        pool,
        &CreateProject {
            name: name.to_string(),
            client_id,
        },
    )
    .await
    .unwrap()
    .id
}

fn integrated(project_id: i64, slug: &str, created_by: i64) -> NewDemoProject {
    NewDemoProject {
        project_id,
        demo_name: "Acme Site".into(),
        demo_slug: slug.into(),
        source: DemoSource::Integrated {
            demo_path: format!("{project_id}/{slug}"),
            build_type: BuildType::Static,
        },
        status: DemoStatus::Building,
        deployed_at: None,
        created_by,
    }
}

// ---------------------------------------------------------------------------
// Demo records
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_and_find_demo(pool: PgPool) {
    showcase_db::health_check(&pool).await.unwrap();
    let admin = seed_user(&pool, "admin", "admin").await;
    let client = seed_user(&pool, "client", "client").await;
    let project = seed_project(&pool, "Acme", client).await;
    let store = PgDemoStore::new(pool);

    let created = store.create_demo(&integrated(project, "acme-site", admin)).await.unwrap();
    assert_eq!(created.status, DemoStatus::Building);
    assert_eq!(created.demo_path(), Some(format!("{project}/acme-site").as_str()));

    let by_slug = store.find_demo_by_slug("acme-site").await.unwrap().unwrap();
    let by_project = store.find_demo_by_project(project).await.unwrap().unwrap();
    assert_eq!(by_slug.id, created.id);
    assert_eq!(by_project.id, created.id);
    assert_eq!(store.list_demos().await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_update_keeps_unset_fields(pool: PgPool) {
    let admin = seed_user(&pool, "admin", "admin").await;
    let project = seed_project(&pool, "Acme", admin).await;
    let store = PgDemoStore::new(pool);
    let demo = store.create_demo(&integrated(project, "acme", admin)).await.unwrap();

    let ready = store
        .update_demo_status(
            demo.id,
            DemoStatusChange {
                status: DemoStatus::Ready,
                file_size_mb: Some(1.5),
                deployed_at: Some(Utc::now()),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ready.file_size_mb, Some(1.5));
    assert!(ready.last_updated >= demo.last_updated);

    let archived = store
        .update_demo_status(demo.id, DemoStatusChange::status(DemoStatus::Archived))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(archived.status, DemoStatus::Archived);
    assert_eq!(archived.file_size_mb, Some(1.5));
    assert!(archived.deployed_at.is_some());

    assert!(store
        .update_demo_status(9999, DemoStatusChange::status(DemoStatus::Ready))
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_slug_and_project_conflict(pool: PgPool) {
    let admin = seed_user(&pool, "admin", "admin").await;
    let first = seed_project(&pool, "Acme", admin).await;
    let second = seed_project(&pool, "Globex", admin).await;
    let store = PgDemoStore::new(pool);
    store.create_demo(&integrated(first, "acme", admin)).await.unwrap();

    assert_matches!(
        store.create_demo(&integrated(second, "acme", admin)).await,
        Err(StoreError::Conflict(msg)) if msg.contains("uq_demo_projects_demo_slug")
    );
    assert_matches!(
        store.create_demo(&integrated(first, "acme-2", admin)).await,
        Err(StoreError::Conflict(msg)) if msg.contains("uq_demo_projects_project_id")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_mixed_mode_row_is_rejected_by_schema(pool: PgPool) {
    let admin = seed_user(&pool, "admin", "admin").await;
    let project = seed_project(&pool, "Acme", admin).await;

    let result = sqlx::query(
        "INSERT INTO demo_projects
            (project_id, demo_name, demo_slug, demo_type, demo_path, build_type, external_url, created_by)
         VALUES ($1, 'Acme', 'acme', 'integrated', '1/acme', 'static', 'https://acme.example', $2)",
    )
    .bind(project)
    .bind(admin)
    .execute(&pool)
    .await;

    assert!(result.is_err(), "mixed-mode row must violate ck_demo_projects_mode");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_content_update_cannot_switch_mode(pool: PgPool) {
    let admin = seed_user(&pool, "admin", "admin").await;
    let project = seed_project(&pool, "Acme", admin).await;
    let store = PgDemoStore::new(pool);
    let demo = store.create_demo(&integrated(project, "acme", admin)).await.unwrap();

    let switched = store
        .update_demo_content(
            demo.id,
            &DemoContent {
                demo_name: "Acme".into(),
                source: DemoSource::External {
                    external_url: "https://acme.example".into(),
                    external_description: None,
                },
            },
        )
        .await
        .unwrap();
    assert!(switched.is_none());

    let renamed = store
        .update_demo_content(
            demo.id,
            &DemoContent {
                demo_name: "Acme Relaunch".into(),
                source: demo.source.clone(),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.demo_name, "Acme Relaunch");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_project_link_and_delete(pool: PgPool) {
    let admin = seed_user(&pool, "admin", "admin").await;
    let project = seed_project(&pool, "Acme", admin).await;
    let store = PgDemoStore::new(pool.clone());
    let demo = store.create_demo(&integrated(project, "acme", admin)).await.unwrap();

    store.link_project_demo(project, Some(demo.id)).await.unwrap();
    assert_eq!(store.find_project(project).await.unwrap().unwrap().demo_id, Some(demo.id));

    store
        .log_access(&NewAccessLogEntry {
            demo_id: demo.id,
            user_id: admin,
            ip_address: Some("198.51.100.4".into()),
            user_agent: None,
        })
        .await
        .unwrap();

    assert!(store.delete_demo(demo.id).await.unwrap());
    assert!(!store.delete_demo(demo.id).await.unwrap());
    // Pointer is cleared by ON DELETE SET NULL, logs by cascade.
    assert_eq!(store.find_project(project).await.unwrap().unwrap().demo_id, None);
    let (logs,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM demo_access_logs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(logs, 0);
}

// ---------------------------------------------------------------------------
// Grants and logs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_grant_upsert_replaces_level(pool: PgPool) {
    let admin = seed_user(&pool, "admin", "admin").await;
    let client = seed_user(&pool, "client", "client").await;
    let guest = seed_user(&pool, "guest", "client").await;
    let project = seed_project(&pool, "Acme", client).await;
    let store = PgDemoStore::new(pool);

    store
        .upsert_grant(&GrantAccess::new(project, guest, AccessLevel::Viewer, None, admin))
        .await
        .unwrap();
    let grant = store
        .upsert_grant(&GrantAccess::new(project, guest, AccessLevel::Collaborator, None, admin))
        .await
        .unwrap();

    assert_eq!(grant.access_level, AccessLevel::Collaborator);
    assert!(grant.permissions.download);
    assert_eq!(store.list_grants(project).await.unwrap().len(), 1);

    assert!(store.delete_grant(project, guest).await.unwrap());
    assert!(store.find_grant(project, guest).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_legacy_level_rows_are_mapped(pool: PgPool) {
    let admin = seed_user(&pool, "admin", "admin").await;
    let guest = seed_user(&pool, "guest", "client").await;
    let project = seed_project(&pool, "Acme", admin).await;

    sqlx::query(
        "INSERT INTO project_access (project_id, user_id, access_level, granted_by)
         VALUES ($1, $2, 'editor', $3)",
    )
    .bind(project)
    .bind(guest)
    .bind(admin)
    .execute(&pool)
    .await
    .unwrap();

    let store = PgDemoStore::new(pool);
    let grant = store.find_grant(project, guest).await.unwrap().unwrap();
    assert_eq!(grant.access_level, AccessLevel::Collaborator);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_access_logs_most_recent_first(pool: PgPool) {
    let admin = seed_user(&pool, "admin", "admin").await;
    let project = seed_project(&pool, "Acme", admin).await;
    let store = PgDemoStore::new(pool);
    let demo = store.create_demo(&integrated(project, "acme", admin)).await.unwrap();

    for agent in ["first", "second"] {
        store
            .log_access(&NewAccessLogEntry {
                demo_id: demo.id,
                user_id: admin,
                ip_address: None,
                user_agent: Some(agent.into()),
            })
            .await
            .unwrap();
    }

    let logs = store.list_access_logs(demo.id).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].user_agent.as_deref(), Some("second"));
}
