//! InMemory MessageStore 実装
//!
//! 永続化エンジンの代わりに、受け付けたメッセージを追記専用で保持します。

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ChatMessage, MessageStore, PersistenceError};

/// 永続化されたメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedMessage {
    /// 1 から始まる連番
    pub id: u64,
    pub message: ChatMessage,
}

/// インメモリ MessageStore 実装
#[derive(Default)]
pub struct InMemoryMessageStore {
    messages: Mutex<Vec<PersistedMessage>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存済みメッセージを古い順に取得
    pub async fn messages(&self) -> Vec<PersistedMessage> {
        self.messages.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.messages.lock().await.len()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn write_message(&self, message: &ChatMessage) -> Result<(), PersistenceError> {
        let mut messages = self.messages.lock().await;
        let id = messages.len() as u64 + 1;
        messages.push(PersistedMessage {
            id,
            message: message.clone(),
        });
        Ok(())
    }
}
