//! UseCase: メッセージルーター
//!
//! 有界キューからイベントを 1 件ずつ取り出し、宛先を解決して各接続へ配送します。
//! キューは 1 本だけなので、イベントは投入された順に処理されます。
//!
//! - キュー満杯時は新しいイベントを拒否します（`SubmitError::QueueFull`）
//! - メッセージの永続化は配送とは独立に非同期で行い、失敗してもログのみ
//! - 配送に失敗した接続は Registry から外し、最後の接続なら user_left を自分のキューへ投入
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - MessageRouter::dispatch() の宛先解決（全員・グループ・ダイレクト）
//! - 永続化失敗・グループ解決失敗時の挙動
//! - 配送失敗時の接続除去
//! - RouterHandle のキュー満杯時の拒否
//!
//! ### どのような状況を想定しているか
//! - 正常系：各宛先種別への配送
//! - 異常系：GroupDirectory / MessageStore のエラー
//! - エッジケース：受信側が既に閉じている接続

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{
    domain::{
        Audience, ChatMessage, ConnectionHandle, ConnectionId, EventPublisher, GroupDirectory,
        MessageStore, OutboundEvent, PresenceRegistry, ResolverError, SubmitError, TransportError,
        UserId,
    },
    infrastructure::dto::websocket::OutboundFrame,
};

/// ルーターキューへの投入口
///
/// クローンして各ユースケースで共有します。全てのハンドルが破棄されるとルーターは停止します。
#[derive(Clone)]
pub struct RouterHandle {
    sender: mpsc::Sender<OutboundEvent>,
    capacity: usize,
}

impl RouterHandle {
    /// イベントを投入。待たずに結果を返す
    pub fn submit(&self, event: OutboundEvent) -> Result<(), SubmitError> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => SubmitError::QueueFull {
                capacity: self.capacity,
            },
            TrySendError::Closed(_) => SubmitError::Closed,
        })
    }
}

impl EventPublisher for RouterHandle {
    fn submit_broadcast(&self, event: OutboundEvent) -> Result<(), SubmitError> {
        self.submit(event)
    }
}

/// メッセージルーター
pub struct MessageRouter {
    registry: Arc<dyn PresenceRegistry>,
    groups: Arc<dyn GroupDirectory>,
    store: Arc<dyn MessageStore>,
    receiver: mpsc::Receiver<OutboundEvent>,
    /// 自分自身のキュー。ルーター停止を妨げないよう弱参照で持つ
    loopback: mpsc::WeakSender<OutboundEvent>,
    capacity: usize,
}

impl MessageRouter {
    /// ルーターと投入口を作成
    ///
    /// `capacity` はキューに保持できるイベント数（1 以上）
    pub fn new(
        registry: Arc<dyn PresenceRegistry>,
        groups: Arc<dyn GroupDirectory>,
        store: Arc<dyn MessageStore>,
        capacity: usize,
    ) -> (Self, RouterHandle) {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let router = Self {
            registry,
            groups,
            store,
            receiver,
            loopback: sender.downgrade(),
            capacity,
        };
        (router, RouterHandle { sender, capacity })
    }

    /// 全ての RouterHandle が破棄されるまでイベントを処理
    pub async fn run(mut self) {
        tracing::info!(capacity = self.capacity, "Message router started");
        while let Some(event) = self.receiver.recv().await {
            self.dispatch(event).await;
        }
        tracing::info!("Message router stopped");
    }

    /// 1 件のイベントを配送
    ///
    /// # Returns
    ///
    /// 配送に成功した接続数
    pub async fn dispatch(&self, event: OutboundEvent) -> usize {
        if let OutboundEvent::Message(message) = &event {
            self.persist(message.clone());
        }

        let audience = event.audience();
        let recipients = match self.recipients(audience).await {
            Ok(recipients) => recipients,
            Err(e) => {
                tracing::warn!(kind = event.kind(), ?audience, error = %e, "Dropped event");
                return 0;
            }
        };

        let frame = OutboundFrame::from_event(&event, Utc::now());
        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(kind = event.kind(), error = %e, "Failed to encode frame");
                return 0;
            }
        };

        let mut delivered = 0;
        for (user_id, connection) in recipients {
            match connection.deliver(text.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => self.drop_connection(user_id, connection.id, e).await,
            }
        }

        tracing::debug!(kind = event.kind(), ?audience, delivered, "Event dispatched");
        delivered
    }

    async fn recipients(
        &self,
        audience: Audience,
    ) -> Result<Vec<(UserId, ConnectionHandle)>, ResolverError> {
        match audience {
            Audience::Everyone => Ok(self.registry.all_connections().await),
            Audience::Group(group_id) => {
                let members: Vec<UserId> =
                    self.groups.member_ids(group_id).await?.into_iter().collect();
                Ok(self.registry.connections_of(&members).await)
            }
            Audience::Direct { target, sender } => {
                Ok(self.registry.connections_of(&[target, sender]).await)
            }
        }
    }

    fn persist(&self, message: ChatMessage) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.write_message(&message).await {
                tracing::warn!(sender_id = %message.sender_id, error = %e, "Failed to persist message");
            }
        });
    }

    async fn drop_connection(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        error: TransportError,
    ) {
        tracing::warn!(%user_id, %connection_id, %error, "Delivery failed, removing connection");

        let username = self
            .registry
            .lookup(user_id)
            .await
            .map(|entry| entry.username)
            .unwrap_or_default();
        if !self.registry.deregister(user_id, connection_id).await {
            return;
        }

        let Some(sender) = self.loopback.upgrade() else {
            return;
        };
        if let Err(e) = sender.try_send(OutboundEvent::UserLeft { user_id, username }) {
            tracing::warn!(%user_id, error = %e, "Dropped user_left event");
        }
    }
}
