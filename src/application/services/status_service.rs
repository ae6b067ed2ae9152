use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    application::models::account::{Account, AccountId},
    application::models::status::{Status, StatusId},
    error::AppError,
    transport::http_client::MastodonHttpClient,
};

/// Typed surface over the provider endpoints the cleanup run needs.
#[async_trait]
pub trait StatusService: Send + Sync {
    /// Resolves the account the access token acts for.
    async fn verify_credentials(&self) -> Result<Account, AppError>;

    /// One page of the account's statuses, newest first, strictly older
    /// than `max_id` when given.
    async fn account_statuses(
        &self,
        account: &AccountId,
        max_id: Option<StatusId>,
        limit: u32,
    ) -> Result<Vec<Status>, AppError>;

    /// Deletes a status; the provider echoes the removed status back.
    async fn delete_status(&self, id: StatusId) -> Result<Status, AppError>;
}

pub struct StatusServiceImpl {
    client: Arc<MastodonHttpClient>,
}

impl StatusServiceImpl {
    pub fn new(client: Arc<MastodonHttpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusService for StatusServiceImpl {
    async fn verify_credentials(&self) -> Result<Account, AppError> {
        debug!("Resolving acting account");

        let account: Account = self
            .client
            .get("/api/v1/accounts/verify_credentials")
            .await?;

        info!("Acting as {}", account.acct);
        Ok(account)
    }

    async fn account_statuses(
        &self,
        account: &AccountId,
        max_id: Option<StatusId>,
        limit: u32,
    ) -> Result<Vec<Status>, AppError> {
        let mut path = format!("/api/v1/accounts/{}/statuses?limit={}", account, limit);
        if let Some(max_id) = max_id {
            path.push_str(&format!("&max_id={}", max_id));
        }

        let statuses: Vec<Status> = self.client.get(&path).await?;

        debug!(
            "Fetched {} statuses (max_id {:?})",
            statuses.len(),
            max_id.map(|id| id.0)
        );
        Ok(statuses)
    }

    async fn delete_status(&self, id: StatusId) -> Result<Status, AppError> {
        info!("Deleting status {}", id);

        self.client
            .delete(&format!("/api/v1/statuses/{}", id))
            .await
    }
}
