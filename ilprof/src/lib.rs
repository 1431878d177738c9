pub mod calltree;
pub mod collector;
pub mod config;
pub mod disasm;
pub mod preflight;
pub mod proc_mem;
pub mod profile;
pub mod report;
pub mod stack;
pub mod symbolication;
pub mod trace_source;
pub mod utils;

pub use crate::collector::Collector;
pub use crate::profile::ProfileData;
