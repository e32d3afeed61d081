//! InMemory PresenceRegistry 実装
//!
//! ドメイン層が定義する PresenceRegistry trait の具体的な実装。
//! `RwLock<HashMap>` をプロセス内のオンラインユーザー表として使用します。
//!
//! ## ロック方針
//!
//! マップ全体を 1 つの RwLock で保護します（エントリ単位のロックは持たない）。
//! 「最初の接続か」「最後の接続か」の判定は書き込みロック内で行うため、
//! 同一ユーザーの並行 register / deregister でも更新は失われません。
//! プロフィール取得とステータス永続化はマップのロックの外で実行します。
//!
//! 状態遷移（判定と永続化）はユーザー単位の非同期 Mutex で直列化します。
//! 永続化されるステータスは最後の遷移と必ず一致します。
//! ロック順序は常に「ユーザー Mutex → マップ RwLock」です。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::domain::{
    ConnectionHandle, ConnectionId, PersistenceError, PresenceEntry, PresenceRegistry,
    PresenceStatus, ProfileStore, UserId, UserProfile,
};

/// インメモリ PresenceRegistry 実装
pub struct InMemoryPresenceRegistry {
    /// オンラインユーザー（接続が 1 つ以上あるユーザーのみ）
    users: RwLock<HashMap<UserId, PresenceEntry>>,
    /// ユーザー単位の遷移ロック。オフラインになったユーザーの分は解放時に取り除く
    transitions: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
    /// プロフィール取得・ステータス永続化の委譲先
    profiles: Arc<dyn ProfileStore>,
}

impl InMemoryPresenceRegistry {
    /// 新しい InMemoryPresenceRegistry を作成
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            transitions: Mutex::new(HashMap::new()),
            profiles,
        }
    }

    /// ユーザーの遷移ロックを取得
    async fn lock_user(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut transitions = self.transitions.lock().await;
            transitions.entry(user_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// 遷移ロックを解放し、誰も使っていないオフラインユーザーの分を取り除く
    async fn unlock_user(&self, user_id: UserId, guard: OwnedMutexGuard<()>) {
        drop(guard);
        let mut transitions = self.transitions.lock().await;
        let idle = transitions
            .get(&user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle && !self.users.read().await.contains_key(&user_id) {
            transitions.remove(&user_id);
        }
    }

    async fn fetch_profile(&self, user_id: UserId, username: &str) -> UserProfile {
        match self.profiles.fetch(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => UserProfile {
                username: username.to_string(),
                ..UserProfile::default()
            },
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Failed to fetch profile, using defaults");
                UserProfile {
                    username: username.to_string(),
                    ..UserProfile::default()
                }
            }
        }
    }

    async fn persist_status(&self, user_id: UserId, status: PresenceStatus, at: DateTime<Utc>) {
        if let Err(e) = self.profiles.set_status(user_id, status, at).await {
            tracing::warn!(%user_id, %status, error = %e, "Failed to persist presence status");
        }
    }

    async fn register_locked(
        &self,
        user_id: UserId,
        username: String,
        connection: ConnectionHandle,
    ) -> bool {
        let connection = {
            let mut users = self.users.write().await;
            match users.get_mut(&user_id) {
                Some(entry) => {
                    entry.attach(connection, Utc::now());
                    return false;
                }
                None => connection,
            }
        };

        let profile = self.fetch_profile(user_id, &username).await;

        let now = Utc::now();
        {
            let mut users = self.users.write().await;
            users.insert(
                user_id,
                PresenceEntry::new(user_id, username, profile, connection, now),
            );
        }
        self.persist_status(user_id, PresenceStatus::Online, now).await;
        true
    }

    async fn deregister_locked(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let now = Utc::now();
        {
            let mut users = self.users.write().await;
            let Some(entry) = users.get_mut(&user_id) else {
                return false;
            };
            if !entry.detach(&connection_id, now) || !entry.connections.is_empty() {
                return false;
            }
            users.remove(&user_id);
        }
        self.persist_status(user_id, PresenceStatus::Offline, now).await;
        true
    }
}

#[async_trait]
impl PresenceRegistry for InMemoryPresenceRegistry {
    async fn register(
        &self,
        user_id: UserId,
        username: String,
        connection: ConnectionHandle,
    ) -> bool {
        let guard = self.lock_user(user_id).await;
        let is_first = self.register_locked(user_id, username, connection).await;
        self.unlock_user(user_id, guard).await;
        is_first
    }

    async fn deregister(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let guard = self.lock_user(user_id).await;
        let is_last = self.deregister_locked(user_id, connection_id).await;
        self.unlock_user(user_id, guard).await;
        is_last
    }

    async fn lookup(&self, user_id: UserId) -> Option<PresenceEntry> {
        let users = self.users.read().await;
        users.get(&user_id).cloned()
    }

    async fn update_status(
        &self,
        user_id: UserId,
        status: PresenceStatus,
    ) -> Result<(), PersistenceError> {
        let guard = self.lock_user(user_id).await;
        {
            let mut users = self.users.write().await;
            if let Some(entry) = users.get_mut(&user_id) {
                entry.status = status;
            }
        }
        let result = self.profiles.set_status(user_id, status, Utc::now()).await;
        self.unlock_user(user_id, guard).await;
        result
    }

    async fn snapshot(&self) -> Vec<PresenceEntry> {
        let users = self.users.read().await;
        let mut entries: Vec<PresenceEntry> = users
            .values()
            .filter(|entry| !entry.connections.is_empty())
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.user_id);
        entries
    }

    async fn touch(&self, user_id: UserId) {
        let mut users = self.users.write().await;
        if let Some(entry) = users.get_mut(&user_id) {
            entry.last_seen = Utc::now();
        }
    }

    async fn all_connections(&self) -> Vec<(UserId, ConnectionHandle)> {
        let users = self.users.read().await;
        users
            .values()
            .flat_map(|entry| {
                entry
                    .connections
                    .values()
                    .map(|conn| (entry.user_id, conn.clone()))
            })
            .collect()
    }

    async fn connections_of(&self, user_ids: &[UserId]) -> Vec<(UserId, ConnectionHandle)> {
        let users = self.users.read().await;
        let mut seen = Vec::with_capacity(user_ids.len());
        let mut connections = Vec::new();
        for user_id in user_ids {
            if seen.contains(user_id) {
                continue;
            }
            seen.push(*user_id);
            if let Some(entry) = users.get(user_id) {
                connections.extend(
                    entry
                        .connections
                        .values()
                        .map(|conn| (entry.user_id, conn.clone())),
                );
            }
        }
        connections
    }

    async fn evict_stale(&self, threshold: Duration, now: DateTime<Utc>) -> Vec<UserId> {
        let candidates: Vec<UserId> = {
            let users = self.users.read().await;
            users
                .values()
                .filter(|entry| entry.is_stale(threshold, now))
                .map(|entry| entry.user_id)
                .collect()
        };

        let mut evicted = Vec::with_capacity(candidates.len());
        for user_id in candidates {
            let guard = self.lock_user(user_id).await;
            // Re-checked under the user lock: the entry may have been touched or removed since
            let removed = {
                let mut users = self.users.write().await;
                let stale = users
                    .get(&user_id)
                    .is_some_and(|entry| entry.is_stale(threshold, now));
                stale && users.remove(&user_id).is_some()
            };
            if removed {
                self.persist_status(user_id, PresenceStatus::Offline, now).await;
                evicted.push(user_id);
            }
            self.unlock_user(user_id, guard).await;
        }
        evicted
    }
}
