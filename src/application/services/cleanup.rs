use tracing::info;

use crate::application::services::retention::{RetentionPolicy, RetentionScan};
use crate::application::services::status_service::StatusService;
use crate::error::AppError;

/// Deletes every status the retention scan yields, in arrival order, one
/// remote call per status. The first failed delete aborts the run; later
/// pages are never fetched. Returns the number of deleted statuses.
pub async fn cleanup_old_statuses<S: StatusService>(
    service: &S,
    policy: RetentionPolicy,
) -> Result<u64, AppError> {
    let mut scan = RetentionScan::begin(service, policy).await?;
    let mut deleted = 0u64;

    while let Some(status) = scan.next().await? {
        info!("Deleting status {} from {}", status.id, status.created_at);

        service
            .delete_status(status.id)
            .await
            .map_err(|source| AppError::Deletion {
                id: status.id,
                source: Box::new(source),
            })?;
        deleted += 1;
    }

    info!("Cleanup done, {} statuses deleted", deleted);
    Ok(deleted)
}
