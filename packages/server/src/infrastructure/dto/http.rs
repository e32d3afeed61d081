//! HTTP API request and response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::PresenceEntry;

/// One online user in the presence listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineUserDto {
    pub id: u64,
    pub username: String,
    pub avatar: String,
    pub bio: String,
    pub status: String,
}

impl From<&PresenceEntry> for OnlineUserDto {
    fn from(entry: &PresenceEntry) -> Self {
        Self {
            id: entry.user_id.value(),
            username: entry.username.clone(),
            avatar: entry.avatar.clone(),
            bio: entry.bio.clone(),
            status: entry.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineUsersResponse {
    pub success: bool,
    pub data: Vec<OnlineUserDto>,
}

/// Online member of a group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineMemberDto {
    pub id: u64,
    pub username: String,
    pub avatar: String,
    pub status: String,
}

impl From<&PresenceEntry> for OnlineMemberDto {
    fn from(entry: &PresenceEntry) -> Self {
        Self {
            id: entry.user_id.value(),
            username: entry.username.clone(),
            avatar: entry.avatar.clone(),
            status: entry.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineMembersResponse {
    #[serde(rename = "onlineMembers")]
    pub online_members: Vec<OnlineMemberDto>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusResponse {
    pub success: bool,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
