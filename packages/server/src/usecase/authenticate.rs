//! UseCase: ハンドシェイク認証
//!
//! 接続後最初のフレームを認証フレームとして解釈し、トークンを検証します。

use std::sync::Arc;

use crate::{
    domain::{AuthenticatedUser, TokenVerifier},
    infrastructure::dto::websocket::AuthFrame,
};

use super::error::HandshakeError;

/// ハンドシェイク認証のユースケース
pub struct AuthenticateUseCase {
    verifier: Arc<dyn TokenVerifier>,
}

impl AuthenticateUseCase {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// 認証フレームを検証
    ///
    /// # Returns
    ///
    /// * `Ok(AuthenticatedUser)` - トークンから取り出したユーザー
    /// * `Err(HandshakeError)` - フレーム不正またはトークン不正（接続は閉じられる）
    pub fn execute(&self, frame_text: &str) -> Result<AuthenticatedUser, HandshakeError> {
        let frame = AuthFrame::parse(frame_text)?;
        let user = self.verifier.validate(&frame.token)?;
        Ok(user)
    }
}
