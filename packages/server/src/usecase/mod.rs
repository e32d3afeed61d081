//! UseCase 層
//!
//! ドメインのポートを組み合わせてアプリケーションの操作を実装します。

pub mod authenticate;
pub mod connect_user;
pub mod disconnect_user;
pub mod error;
pub mod router;
pub mod send_message;
pub mod sweeper;
pub mod update_status;

pub use authenticate::AuthenticateUseCase;
pub use connect_user::ConnectUserUseCase;
pub use disconnect_user::DisconnectUserUseCase;
pub use error::{HandshakeError, UpdateStatusError};
pub use router::{MessageRouter, RouterHandle};
pub use send_message::SendMessageUseCase;
pub use sweeper::PresenceSweeper;
pub use update_status::UpdateStatusUseCase;
