//! InMemory ProfileStore 実装
//!
//! アカウントサービスの代わりにプロフィールと永続化済みステータスを保持します。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{PersistenceError, PresenceStatus, ProfileStore, UserId, UserProfile};

/// 永続化されたユーザーレコード
#[derive(Debug, Clone, Default)]
struct StoredUser {
    profile: Option<UserProfile>,
    status: Option<PresenceStatus>,
    last_seen: Option<DateTime<Utc>>,
}

/// インメモリ ProfileStore 実装
#[derive(Default)]
pub struct InMemoryProfileStore {
    users: Mutex<HashMap<UserId, StoredUser>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// プロフィールを登録・更新
    pub async fn upsert_profile(&self, user_id: UserId, profile: UserProfile) {
        let mut users = self.users.lock().await;
        users.entry(user_id).or_default().profile = Some(profile);
    }

    /// 永続化済みステータスを取得
    pub async fn status_of(&self, user_id: UserId) -> Option<PresenceStatus> {
        let users = self.users.lock().await;
        users.get(&user_id).and_then(|u| u.status)
    }

    /// 永続化済みの最終確認時刻を取得
    pub async fn last_seen_of(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        let users = self.users.lock().await;
        users.get(&user_id).and_then(|u| u.last_seen)
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn fetch(&self, user_id: UserId) -> Result<Option<UserProfile>, PersistenceError> {
        let users = self.users.lock().await;
        Ok(users.get(&user_id).and_then(|u| u.profile.clone()))
    }

    async fn set_status(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let mut users = self.users.lock().await;
        let user = users.entry(user_id).or_default();
        user.status = Some(status);
        user.last_seen = Some(at);
        Ok(())
    }
}
