//! Events handed to the message router and the rule that picks their audience.

use super::{
    entity::ChatMessage,
    error::SubmitError,
    value_object::{GroupId, UserId},
};

/// An event queued for fan-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    Message(ChatMessage),
    UserJoined {
        user_id: UserId,
        username: String,
    },
    UserLeft {
        user_id: UserId,
        username: String,
    },
    GroupMemberJoined {
        user_id: UserId,
        username: String,
        group_id: Option<GroupId>,
    },
    GroupMemberLeft {
        user_id: UserId,
        username: String,
        group_id: Option<GroupId>,
    },
}

/// Who receives an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every registered connection
    Everyone,
    /// Online members of a group
    Group(GroupId),
    /// The recipient and the sender's own connections
    Direct { target: UserId, sender: UserId },
}

impl OutboundEvent {
    /// Routing table, first match wins:
    ///
    /// 1. user joined / left: everyone
    /// 2. group member joined / left with a group: that group
    /// 3. message with a group: that group
    /// 4. message with a target: target and sender
    /// 5. anything else: everyone
    pub fn audience(&self) -> Audience {
        match self {
            Self::UserJoined { .. } | Self::UserLeft { .. } => Audience::Everyone,
            Self::GroupMemberJoined {
                group_id: Some(group_id),
                ..
            }
            | Self::GroupMemberLeft {
                group_id: Some(group_id),
                ..
            } => Audience::Group(*group_id),
            Self::Message(ChatMessage {
                group_id: Some(group_id),
                ..
            }) => Audience::Group(*group_id),
            Self::Message(ChatMessage {
                target: Some(target),
                sender_id,
                ..
            }) => Audience::Direct {
                target: *target,
                sender: *sender_id,
            },
            _ => Audience::Everyone,
        }
    }

    /// Wire name of the event
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::UserJoined { .. } => "user_joined",
            Self::UserLeft { .. } => "user_left",
            Self::GroupMemberJoined { .. } => "group_member_joined",
            Self::GroupMemberLeft { .. } => "group_member_left",
        }
    }
}

/// Entry point into the router queue.
///
/// Also used by the group management layer to announce membership changes
/// without re-implementing routing.
#[cfg_attr(test, mockall::automock)]
pub trait EventPublisher: Send + Sync {
    /// Enqueue an event for fan-out. Never blocks.
    ///
    /// # Errors
    ///
    /// `SubmitError::QueueFull` when the queue is at capacity, `SubmitError::Closed`
    /// when the router has stopped.
    fn submit_broadcast(&self, event: OutboundEvent) -> Result<(), SubmitError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn uid(id: u64) -> UserId {
        UserId::new(id).unwrap()
    }

    fn message(target: u64, group_id: u64) -> OutboundEvent {
        let mut msg = ChatMessage::text(uid(1), "alice".to_string(), "hi".to_string(), Utc::now());
        msg.target = UserId::from_wire(target);
        msg.group_id = GroupId::from_wire(group_id);
        OutboundEvent::Message(msg)
    }

    #[test]
    fn test_join_and_leave_go_to_everyone() {
        // テスト項目: user_joined / user_left は全員に配送される
        // given (前提条件):
        let joined = OutboundEvent::UserJoined {
            user_id: uid(1),
            username: "alice".to_string(),
        };
        let left = OutboundEvent::UserLeft {
            user_id: uid(1),
            username: "alice".to_string(),
        };

        // then (期待する結果):
        assert_eq!(joined.audience(), Audience::Everyone);
        assert_eq!(left.audience(), Audience::Everyone);
    }

    #[test]
    fn test_group_member_events_route_to_group() {
        // テスト項目: group_id 付きのメンバー変更イベントはグループに配送される
        // given (前提条件):
        let event = OutboundEvent::GroupMemberJoined {
            user_id: uid(2),
            username: "bob".to_string(),
            group_id: GroupId::from_wire(9),
        };

        // then (期待する結果):
        assert_eq!(event.audience(), Audience::Group(GroupId::new(9).unwrap()));
    }

    #[test]
    fn test_group_member_event_without_group_falls_through_to_everyone() {
        // テスト項目: group_id が 0 のメンバー変更イベントは全員宛てにフォールバックする
        // given (前提条件):
        let event = OutboundEvent::GroupMemberLeft {
            user_id: uid(2),
            username: "bob".to_string(),
            group_id: None,
        };

        // then (期待する結果):
        assert_eq!(event.audience(), Audience::Everyone);
    }

    #[test]
    fn test_message_routing_precedence() {
        // テスト項目: group > target > global の優先順位で配送先が決まる
        // then (期待する結果):
        assert_eq!(
            message(2, 5).audience(),
            Audience::Group(GroupId::new(5).unwrap())
        );
        assert_eq!(
            message(2, 0).audience(),
            Audience::Direct {
                target: uid(2),
                sender: uid(1)
            }
        );
        assert_eq!(message(0, 0).audience(), Audience::Everyone);
    }

    #[test]
    fn test_kind_names() {
        // テスト項目: イベント種別のワイア名
        // then (期待する結果):
        assert_eq!(message(0, 0).kind(), "message");
        assert_eq!(
            OutboundEvent::UserLeft {
                user_id: uid(1),
                username: "alice".to_string()
            }
            .kind(),
            "user_left"
        );
    }
}
