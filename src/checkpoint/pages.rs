//! Page buffer pool seam
//!
//! The buffer pool lives outside this crate. A checkpoint only needs it to
//! push every dirty page to persistent storage.

use std::io;

/// Something that can flush all dirty pages to persistent storage
pub trait PageFlush: Send + Sync {
    /// Write every dirty page and make it durable
    fn flush_all_dirty(&self) -> io::Result<()>;
}

/// Flusher for stores without a buffer pool
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDirtyPages;

impl PageFlush for NoDirtyPages {
    fn flush_all_dirty(&self) -> io::Result<()> {
        Ok(())
    }
}
