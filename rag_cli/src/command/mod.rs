//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate zero-sized strategy type implementing
//! `CommandStrategy`, so adding a command means adding a type rather than
//! a new match arm threading shared state everywhere.

mod info;
mod init;
mod memory;
mod rag;
mod version;
mod websession;

pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use memory::{MemoryInput, MemoryStrategy};
pub use rag::{RagInput, RagStrategy};
pub use version::VersionStrategy;
pub use websession::{WebSessionInput, WebSessionStrategy};

/// Core trait defining the contract for all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}
