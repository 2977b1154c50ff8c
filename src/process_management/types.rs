use tokio::io::AsyncRead;

/// Standard output of a launched process. Dropping it closes the pipe.
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Lifecycle of a [`ProcessHandle`](super::ProcessHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Created,
    Started,
    Finished,
}
