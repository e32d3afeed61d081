//! UseCase: ユーザー切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectUserUseCase::execute() メソッド
//! - Registry からの削除と user_left イベントの送出
//!
//! ### どのような状況を想定しているか
//! - 正常系：最後の接続の切断（user_left を送出）
//! - 正常系：他の接続が残っている（送出しない）
//! - エッジケース：既に削除済みの接続（ルーターや Sweeper が先に外した場合）

use std::sync::Arc;

use crate::domain::{
    AuthenticatedUser, ConnectionId, EventPublisher, OutboundEvent, PresenceRegistry,
};

/// ユーザー切断のユースケース
pub struct DisconnectUserUseCase {
    registry: Arc<dyn PresenceRegistry>,
    publisher: Arc<dyn EventPublisher>,
}

impl DisconnectUserUseCase {
    pub fn new(registry: Arc<dyn PresenceRegistry>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            registry,
            publisher,
        }
    }

    /// 接続を解除
    ///
    /// # Returns
    ///
    /// そのユーザーの最後の接続であれば true
    pub async fn execute(&self, user: &AuthenticatedUser, connection_id: ConnectionId) -> bool {
        let is_last = self.registry.deregister(user.user_id, connection_id).await;

        tracing::info!(
            user_id = %user.user_id,
            %connection_id,
            is_last,
            "Connection deregistered"
        );

        if is_last {
            let event = OutboundEvent::UserLeft {
                user_id: user.user_id,
                username: user.username.clone(),
            };
            if let Err(e) = self.publisher.submit_broadcast(event) {
                tracing::warn!(user_id = %user.user_id, error = %e, "Dropped user_left event");
            }
        }
        is_last
    }
}
