pub mod sample;

pub use sample::{RawFrame, SampleEvent};

/// First address of the kernel half of the address space
pub const KERNEL_ADDRESS_START: u64 = 0xFFFF_0000_0000_0000;

/// Sampled addresses closer than this to the start of a span are decoded together
pub const MAX_SPAN_GAP: u64 = 100;

/// Longest possible x86 instruction encoding
pub const LONGEST_INSTRUCTION: u64 = 15;

pub fn is_userspace(address: u64) -> bool {
    address < KERNEL_ADDRESS_START
}
