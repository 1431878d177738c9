pub mod dump_elf;
pub mod elf;
pub mod handle;
pub mod module_cache;

pub use elf::ElfSymbolResolver;
pub use handle::{SymbolHandle, SymbolResolver};
