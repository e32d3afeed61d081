//! UseCase: メッセージ送信処理
//!
//! 受信したペイロードを ChatMessage に変換し、ルーターのキューへ投入します。
//! 送信者の ID と名前は常に認証済みユーザーのものを使います（ペイロードの値は無視）。

use std::sync::Arc;

use crate::{
    domain::{
        AuthenticatedUser, ChatMessage, EventPublisher, GroupId, OutboundEvent, SubmitError, UserId,
    },
    infrastructure::dto::websocket::InboundPayload,
};

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    publisher: Arc<dyn EventPublisher>,
}

impl SendMessageUseCase {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    /// メッセージを送信
    ///
    /// # Returns
    ///
    /// * `Ok(ChatMessage)` - キューに投入されたメッセージ
    /// * `Err(SubmitError)` - キュー満杯またはルーター停止（メッセージは破棄）
    pub fn execute(
        &self,
        sender: &AuthenticatedUser,
        payload: InboundPayload,
    ) -> Result<ChatMessage, SubmitError> {
        let message = ChatMessage {
            sender_id: sender.user_id,
            sender_name: sender.username.clone(),
            content: payload.content,
            message_type: payload.message_type,
            file_url: payload.file_url,
            file_name: payload.file_name,
            file_size: payload.file_size,
            target: UserId::from_wire(payload.target),
            group_id: GroupId::from_wire(payload.group_id),
            created_at: murmur_shared::time::now_utc(),
        };

        self.publisher
            .submit_broadcast(OutboundEvent::Message(message.clone()))?;
        Ok(message)
    }
}
