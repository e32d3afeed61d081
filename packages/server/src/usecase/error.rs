//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{AuthError, PersistenceError, ProtocolError, ValueObjectError};

/// ハンドシェイク失敗。Display がそのままクライアントへの拒否理由になる
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// ステータス更新の失敗
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpdateStatusError {
    #[error(transparent)]
    InvalidStatus(#[from] ValueObjectError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
