use std::io::IoSliceMut;

use nix::sys::uio::{process_vm_readv, RemoteIoVec};
use nix::unistd::Pid;
use thiserror::Error;

/// Reads raw bytes out of an address space
pub trait ReadMemory {
    /// Reads up to `len` bytes at `address`. The result may be shorter when the
    /// range runs into unmapped memory, but never empty on success.
    fn read(&self, address: u64, len: usize) -> Result<Vec<u8>, MemoryError>;
}

/// Memory of a live process, read with `process_vm_readv`.
///
/// Reading another process needs ptrace access to it (same user and a
/// permissive `kernel.yama.ptrace_scope`, or root).
#[derive(Debug, Clone, Copy)]
pub struct ProcessMemory {
    pid: u32,
}

impl ProcessMemory {
    pub fn new(pid: u32) -> Self {
        Self { pid }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl ReadMemory for ProcessMemory {
    fn read(&self, address: u64, len: usize) -> Result<Vec<u8>, MemoryError> {
        let mut buf = vec![0u8; len];
        let remote = [RemoteIoVec {
            base: address as usize,
            len,
        }];
        let read = process_vm_readv(
            Pid::from_raw(self.pid as i32),
            &mut [IoSliceMut::new(&mut buf)],
            &remote,
        )
        .map_err(|source| MemoryError::ReadError {
            process_id: self.pid,
            address,
            len,
            source,
        })?;

        if read == 0 {
            return Err(MemoryError::Unmapped {
                process_id: self.pid,
                address,
            });
        }

        buf.truncate(read);
        Ok(buf)
    }
}

/// Error type for reading process memory
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The kernel refused the read
    #[error("Failed to read {len} bytes at {address:#018x} in process {process_id}")]
    ReadError {
        /// Process ID
        process_id: u32,
        address: u64,
        len: usize,
        /// The original errno
        source: nix::Error,
    },
    /// Nothing is mapped at the address
    #[error("Address {address:#018x} is not mapped in process {process_id}")]
    Unmapped {
        /// Process ID
        process_id: u32,
        address: u64,
    },
}
