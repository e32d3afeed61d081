//! UseCase: 古いプレゼンスの掃除
//!
//! 一定間隔で Registry を走査し、閾値より長く活動のないユーザーを取り除きます。
//! 取り除いたユーザーは永続層に offline として記録されますが、user_left は送出しません。
//! 接続自体は閉じません。

use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{DateTime, Duration, Utc};
use tokio::time::MissedTickBehavior;

use crate::domain::{PresenceRegistry, UserId};

/// プレゼンス掃除タスク
pub struct PresenceSweeper {
    registry: Arc<dyn PresenceRegistry>,
    interval: StdDuration,
    threshold: Duration,
}

impl PresenceSweeper {
    pub fn new(registry: Arc<dyn PresenceRegistry>, interval: StdDuration, threshold: Duration) -> Self {
        Self {
            registry,
            interval,
            threshold,
        }
    }

    /// 1 回分の掃除
    ///
    /// # Returns
    ///
    /// 取り除いたユーザーの ID
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Vec<UserId> {
        let evicted = self.registry.evict_stale(self.threshold, now).await;
        if !evicted.is_empty() {
            tracing::info!(count = evicted.len(), ?evicted, "Evicted stale presence entries");
        }
        evicted
    }

    /// 永久に掃除を繰り返す。タスクを abort して止める
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            threshold_secs = self.threshold.num_seconds(),
            "Presence sweeper started"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 最初の tick は即時に完了するので読み捨てる
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.sweep_once(Utc::now()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionHandle, ConnectionIdFactory},
        infrastructure::repository::{InMemoryPresenceRegistry, InMemoryProfileStore},
    };
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_sweep_once_evicts_only_stale_users() {
        // テスト項目: 閾値を超えて活動のないユーザーだけが取り除かれる
        // given (前提条件):
        let profiles = Arc::new(InMemoryProfileStore::new());
        let registry = Arc::new(InMemoryPresenceRegistry::new(profiles.clone()));
        let (tx, _rx) = mpsc::unbounded_channel();
        let user_id = UserId::new(1).unwrap();
        registry
            .register(
                user_id,
                "alice".to_string(),
                ConnectionHandle::new(ConnectionIdFactory::generate(), tx),
            )
            .await;
        let sweeper = PresenceSweeper::new(
            registry.clone(),
            StdDuration::from_secs(60),
            Duration::minutes(10),
        );
        let now = Utc::now();

        // when (操作):
        let early = sweeper.sweep_once(now + Duration::minutes(5)).await;
        let late = sweeper.sweep_once(now + Duration::minutes(11)).await;

        // then (期待する結果):
        assert!(early.is_empty());
        assert_eq!(late, vec![user_id]);
        assert!(registry.lookup(user_id).await.is_none());
        assert_eq!(
            profiles.status_of(user_id).await,
            Some(crate::domain::PresenceStatus::Offline)
        );
    }

    #[tokio::test]
    async fn test_touch_keeps_user_alive() {
        // テスト項目: touch された時刻から閾値内であれば取り除かれない
        // given (前提条件):
        let registry = Arc::new(InMemoryPresenceRegistry::new(Arc::new(
            InMemoryProfileStore::new(),
        )));
        let (tx, _rx) = mpsc::unbounded_channel();
        let user_id = UserId::new(1).unwrap();
        registry
            .register(
                user_id,
                "alice".to_string(),
                ConnectionHandle::new(ConnectionIdFactory::generate(), tx),
            )
            .await;
        let sweeper = PresenceSweeper::new(
            registry.clone(),
            StdDuration::from_secs(60),
            Duration::minutes(10),
        );

        // when (操作):
        registry.touch(user_id).await;
        let evicted = sweeper.sweep_once(Utc::now() + Duration::minutes(9)).await;

        // then (期待する結果):
        assert!(evicted.is_empty());
        assert!(registry.lookup(user_id).await.is_some());
    }
}
