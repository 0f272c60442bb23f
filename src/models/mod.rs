pub mod change;
pub mod discovery;
pub mod snapshot;

// Re-exports for convenience
pub use change::*;
pub use discovery::*;
pub use snapshot::*;
