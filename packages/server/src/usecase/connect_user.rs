//! UseCase: ユーザー接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectUserUseCase::execute() メソッド
//! - Registry への登録と user_joined イベントの送出
//!
//! ### なぜこのテストが必要か
//! - 同一ユーザーの 2 本目以降の接続で user_joined が重複しないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：最初の接続（user_joined を送出）
//! - 正常系：2 本目の接続（送出しない）
//! - 異常系：ルーターのキューが満杯（登録は成功し、イベントは破棄）

use std::sync::Arc;

use crate::domain::{AuthenticatedUser, ConnectionHandle, EventPublisher, OutboundEvent, PresenceRegistry};

/// ユーザー接続のユースケース
pub struct ConnectUserUseCase {
    registry: Arc<dyn PresenceRegistry>,
    publisher: Arc<dyn EventPublisher>,
}

impl ConnectUserUseCase {
    pub fn new(registry: Arc<dyn PresenceRegistry>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            registry,
            publisher,
        }
    }

    /// 接続を登録
    ///
    /// # Returns
    ///
    /// そのユーザーの最初の接続であれば true
    pub async fn execute(&self, user: &AuthenticatedUser, connection: ConnectionHandle) -> bool {
        let connection_id = connection.id;
        let is_first = self
            .registry
            .register(user.user_id, user.username.clone(), connection)
            .await;

        tracing::info!(
            user_id = %user.user_id,
            %connection_id,
            is_first,
            "Connection registered"
        );

        if is_first {
            let event = OutboundEvent::UserJoined {
                user_id: user.user_id,
                username: user.username.clone(),
            };
            if let Err(e) = self.publisher.submit_broadcast(event) {
                tracing::warn!(user_id = %user.user_id, error = %e, "Dropped user_joined event");
            }
        }
        is_first
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionIdFactory, SubmitError, UserId, event::MockEventPublisher},
        infrastructure::repository::{InMemoryPresenceRegistry, InMemoryProfileStore},
    };
    use tokio::sync::mpsc;

    fn create_test_registry() -> Arc<InMemoryPresenceRegistry> {
        Arc::new(InMemoryPresenceRegistry::new(Arc::new(
            InMemoryProfileStore::new(),
        )))
    }

    fn alice() -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: UserId::new(1).unwrap(),
            username: "alice".to_string(),
        }
    }

    fn handle() -> (ConnectionHandle, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(ConnectionIdFactory::generate(), tx), rx)
    }

    #[tokio::test]
    async fn test_first_connection_submits_user_joined() {
        // テスト項目: 最初の接続で user_joined が 1 回だけ送出される
        // given (前提条件):
        let registry = create_test_registry();
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_submit_broadcast()
            .withf(|event| matches!(event, OutboundEvent::UserJoined { username, .. } if username == "alice"))
            .times(1)
            .returning(|_| Ok(()));
        let usecase = ConnectUserUseCase::new(registry.clone(), Arc::new(publisher));
        let (c1, _rx1) = handle();
        let (c2, _rx2) = handle();

        // when (操作):
        let first = usecase.execute(&alice(), c1).await;
        let second = usecase.execute(&alice(), c2).await;

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(
            registry
                .lookup(alice().user_id)
                .await
                .unwrap()
                .connection_count(),
            2
        );
    }

    #[tokio::test]
    async fn test_queue_full_still_registers() {
        // テスト項目: キュー満杯で user_joined を送れなくても登録は成功する
        // given (前提条件):
        let registry = create_test_registry();
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_submit_broadcast()
            .returning(|_| Err(SubmitError::QueueFull { capacity: 1 }));
        let usecase = ConnectUserUseCase::new(registry.clone(), Arc::new(publisher));
        let (conn, _rx) = handle();

        // when (操作):
        let first = usecase.execute(&alice(), conn).await;

        // then (期待する結果):
        assert!(first);
        assert!(registry.lookup(alice().user_id).await.is_some());
    }
}
