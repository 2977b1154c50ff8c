/// Default cap on concurrently running delete commands.
pub const DEFAULT_DELETE_LIMIT: usize = 50;

/// Lifecycle of one streaming collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectPhase {
    Created,
    Started,
    Streaming,
    /// The process has exited, remaining output is still being read.
    Draining,
    Done,
    Failed,
}
