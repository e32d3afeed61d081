//! インメモリ実装

pub mod group;
pub mod message;
pub mod presence;
pub mod profile;

pub use group::InMemoryGroupDirectory;
pub use message::{InMemoryMessageStore, PersistedMessage};
pub use presence::InMemoryPresenceRegistry;
pub use profile::InMemoryProfileStore;
