//! Organization mutations
//!
//! Creation and cleanup of organizations. Structural rules (slug shape,
//! brand/studio hierarchy) are checked locally before any network I/O;
//! only requests that pass local validation reach the backend.

use std::sync::Arc;

use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use validator::Validate;

use crate::models::organization::{CreateOrganizationRequest, OrgKind, Organization};
use crate::services::backend::BackendClient;
use crate::services::context::OrganizationContext;
use crate::services::session::SessionStore;
use crate::utils::error::{CoreError, CoreResult};
use crate::utils::validation::suggest_slug;

/// Organization mutation service
pub struct OrganizationService {
    backend: Arc<BackendClient>,
    context: Arc<OrganizationContext>,
    session: Arc<SessionStore>,
}

impl OrganizationService {
    pub fn new(
        backend: Arc<BackendClient>,
        context: Arc<OrganizationContext>,
        session: Arc<SessionStore>,
    ) -> Self {
        Self {
            backend,
            context,
            session,
        }
    }

    /// Create an organization.
    ///
    /// A studio may name a parent brand; the parent must be a brand the
    /// caller is a member of. Slug collisions come back as a conflict
    /// carrying a suggested alternative, which is never applied
    /// automatically. On success the caller's directory is refreshed and
    /// the new organization becomes the active, persisted selection.
    pub async fn create_organization(
        &self,
        request: CreateOrganizationRequest,
        cancel: &CancellationToken,
    ) -> CoreResult<Organization> {
        request.validate()?;
        self.check_hierarchy(&request).await?;

        let body = serde_json::to_value(&request)?;
        let created: Organization = self
            .backend
            .call(Method::POST, "/organizations", Some(body), cancel)
            .await
            .map_err(|e| match e {
                CoreError::Conflict { message, .. } => CoreError::Conflict {
                    message,
                    suggested_slug: Some(suggest_slug(&request.slug)),
                },
                other => other,
            })?;

        info!(org = %created.id, slug = %created.slug, "Organization created");

        match self.session.current_identity_id().await {
            Some(identity_id) => self.context.refresh_directory(identity_id).await,
            None => warn!("Organization created but no identity to refresh directory for"),
        }
        self.context.adopt_created(&created.id).await;

        Ok(created)
    }

    /// Remove backend-side leftovers from interrupted creations
    pub async fn cleanup(&self, cancel: &CancellationToken) -> CoreResult<()> {
        self.backend
            .call_unit(Method::DELETE, "/organizations/cleanup", None, cancel)
            .await
    }

    /// Brands are roots; a studio's parent must be a brand the caller
    /// belongs to
    async fn check_hierarchy(&self, request: &CreateOrganizationRequest) -> CoreResult<()> {
        let Some(ref parent_id) = request.parent_org_id else {
            return Ok(());
        };

        if request.kind == OrgKind::Brand {
            return Err(CoreError::Validation(
                "a brand cannot have a parent organization".to_string(),
            ));
        }

        let snapshot = self.context.organizations().await;
        match snapshot
            .iter()
            .find(|m| &m.organization.id == parent_id)
        {
            Some(member) if member.organization.kind == OrgKind::Brand => Ok(()),
            Some(_) => Err(CoreError::Validation(format!(
                "parent organization {} is not a brand",
                parent_id
            ))),
            None => Err(CoreError::Validation(format!(
                "parent organization {} is not in your directory",
                parent_id
            ))),
        }
    }
}
