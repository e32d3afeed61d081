//! UseCase: プレゼンスステータス更新

use std::sync::Arc;

use crate::domain::{PresenceRegistry, PresenceStatus, UserId};

use super::error::UpdateStatusError;

/// ステータス更新のユースケース
///
/// オンラインでないユーザーの場合も永続化は行われます。
pub struct UpdateStatusUseCase {
    registry: Arc<dyn PresenceRegistry>,
}

impl UpdateStatusUseCase {
    pub fn new(registry: Arc<dyn PresenceRegistry>) -> Self {
        Self { registry }
    }

    pub async fn execute(
        &self,
        user_id: UserId,
        raw_status: &str,
    ) -> Result<PresenceStatus, UpdateStatusError> {
        let status = PresenceStatus::try_from(raw_status)?;
        self.registry.update_status(user_id, status).await?;
        tracing::info!(%user_id, %status, "Presence status updated");
        Ok(status)
    }
}
