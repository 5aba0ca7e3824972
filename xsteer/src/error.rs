//! Error types for xsteer operations.

use thiserror::Error;
use xsteer_common::BindError;

pub type Result<T> = std::result::Result<T, XsteerError>;

#[derive(Debug, Error)]
pub enum XsteerError {
    /// Failed to load the compiled eBPF object into the kernel
    #[error("failed to load eBPF object: {0}")]
    Load(#[from] aya::EbpfError),

    /// Program load/attach/detach failure
    #[error("eBPF program error: {0}")]
    Program(#[from] aya::programs::ProgramError),

    /// Kernel map access failure
    #[error("eBPF map error: {0}")]
    Map(#[from] aya::maps::MapError),

    /// Failed to pin the socket map to bpffs
    #[error("failed to pin map: {0}")]
    Pin(#[from] aya::pin::PinError),

    #[error("program '{0}' not found in the loaded eBPF object")]
    ProgramNotFound(&'static str),

    #[error("map '{0}' not found in the loaded eBPF object")]
    MapNotFound(&'static str),

    /// The socket table refused a control-plane binding
    #[error("socket table rejected binding for queue {queue}: {source}")]
    Bind {
        queue: u32,
        #[source]
        source: BindError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl XsteerError {
    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
