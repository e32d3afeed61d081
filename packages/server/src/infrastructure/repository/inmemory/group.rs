//! InMemory GroupDirectory 実装
//!
//! グループ管理サービスの代わりにメンバー集合を保持します。
//! ルーターからは読み取り専用で、追加・削除は組み込み側とテストから行います。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{GroupDirectory, GroupId, ResolverError, UserId};

/// インメモリ GroupDirectory 実装
#[derive(Default)]
pub struct InMemoryGroupDirectory {
    groups: RwLock<HashMap<GroupId, HashSet<UserId>>>,
}

impl InMemoryGroupDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// メンバーを追加。新規追加なら true
    pub async fn add_member(&self, group_id: GroupId, user_id: UserId) -> bool {
        let mut groups = self.groups.write().await;
        groups.entry(group_id).or_default().insert(user_id)
    }

    /// メンバーを削除。存在していれば true
    pub async fn remove_member(&self, group_id: GroupId, user_id: UserId) -> bool {
        let mut groups = self.groups.write().await;
        groups
            .get_mut(&group_id)
            .is_some_and(|members| members.remove(&user_id))
    }
}

#[async_trait]
impl GroupDirectory for InMemoryGroupDirectory {
    async fn member_ids(&self, group_id: GroupId) -> Result<HashSet<UserId>, ResolverError> {
        let groups = self.groups.read().await;
        Ok(groups.get(&group_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_remove_members() {
        // テスト項目: メンバーの追加・削除が member_ids に反映される
        // given (前提条件):
        let directory = InMemoryGroupDirectory::new();
        let group = GroupId::new(1).unwrap();
        let alice = UserId::new(1).unwrap();
        let bob = UserId::new(2).unwrap();

        // when (操作):
        assert!(directory.add_member(group, alice).await);
        assert!(directory.add_member(group, bob).await);
        assert!(!directory.add_member(group, bob).await);
        assert!(directory.remove_member(group, alice).await);

        // then (期待する結果):
        let members = directory.member_ids(group).await.unwrap();
        assert_eq!(members, HashSet::from([bob]));
    }

    #[tokio::test]
    async fn test_unknown_group_has_no_members() {
        // テスト項目: 存在しないグループは空集合を返す
        // given (前提条件):
        let directory = InMemoryGroupDirectory::new();

        // when (操作):
        let members = directory.member_ids(GroupId::new(9).unwrap()).await;

        // then (期待する結果):
        assert_eq!(members, Ok(HashSet::new()));
    }
}
