//! What a demo viewer page needs to render a demo by slug.

use serde::Serialize;

use crate::access::{resolve_for_user, AccessResolution};
use crate::demo::{demo_embed_url, DemoStatus, DemoType};
use crate::demo_store::{DemoRecordStore, NewAccessLogEntry};
use crate::error::CoreError;
use crate::types::DbId;

/// The authenticated caller opening a demo.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub user_id: DbId,
    pub is_admin: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Viewer page payload.
///
/// Link fields are only populated when `can_access` is true and the demo is
/// `ready`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoView {
    pub demo_id: DbId,
    pub demo_name: String,
    pub status: DemoStatus,
    pub demo_type: DemoType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
    pub can_access: bool,
}

/// Resolve `slug` for `viewer`, recording the view when access is allowed and
/// the demo is live.
///
/// Admins bypass project grants. A failed access-log write is logged and does
/// not block the view.
pub async fn view_demo<S: DemoRecordStore>(
    store: &S,
    slug: &str,
    viewer: &Viewer,
) -> Result<DemoView, CoreError> {
    let demo = store
        .find_demo_by_slug(slug)
        .await?
        .ok_or_else(|| CoreError::NotFoundByKey {
            entity: "Demo",
            key: slug.to_string(),
        })?;

    let access = if viewer.is_admin {
        AccessResolution::admin()
    } else {
        resolve_for_user(store, viewer.user_id, demo.project_id).await?
    };
    let can_access = access.can_view_demo();
    let demo_type = demo.demo_type();

    if !can_access {
        tracing::info!(demo_id = demo.id, user_id = viewer.user_id, "Demo view denied");
        return Ok(DemoView {
            demo_id: demo.id,
            demo_name: demo.demo_name,
            status: demo.status,
            demo_type,
            external_url: None,
            embed_url: None,
            can_access,
        });
    }

    // Only a ready demo has anything to show; archived, failed and in-flight
    // demos report their status without links.
    if demo.status != DemoStatus::Ready {
        tracing::debug!(demo_id = demo.id, status = %demo.status, "Demo not live");
        return Ok(DemoView {
            demo_id: demo.id,
            demo_name: demo.demo_name,
            status: demo.status,
            demo_type,
            external_url: None,
            embed_url: None,
            can_access,
        });
    }

    let entry = NewAccessLogEntry {
        demo_id: demo.id,
        user_id: viewer.user_id,
        ip_address: viewer.ip_address.clone(),
        user_agent: viewer.user_agent.clone(),
    };
    if let Err(err) = store.log_access(&entry).await {
        tracing::warn!(demo_id = demo.id, user_id = viewer.user_id, error = %err, "Failed to record demo access");
    }

    let embed_url = demo
        .demo_path()
        .map(|_| demo_embed_url(demo.project_id, &demo.demo_slug));
    let external_url = demo.external_url().map(str::to_string);
    Ok(DemoView {
        demo_id: demo.id,
        demo_name: demo.demo_name,
        status: demo.status,
        demo_type,
        external_url,
        embed_url,
        can_access,
    })
}
