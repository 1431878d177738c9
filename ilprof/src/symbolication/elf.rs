use std::collections::BTreeMap;
use std::fs;

use anyhow::{bail, Context, Result};
use object::{Object, ObjectSection, ObjectSegment, ObjectSymbol};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use procfs::process::{MemoryMap, Process};
use symbolic::demangle::demangle;

use crate::utils::file_offset;

use super::{handle::SymbolResolver, module_cache::ModuleCache};

/// A loadable segment: `size` bytes at file offset `offset` are mapped at `vaddr`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSegment {
    pub offset: u64,
    pub size: u64,
    pub vaddr: u64,
}

/// `.text` symbols of one object file, keyed by virtual address
#[derive(Debug, Default)]
pub struct ElfSymbols {
    pub map: BTreeMap<u64, String>,
    pub segments: Vec<LoadSegment>,
}

impl ElfSymbols {
    pub fn from_path(path: &str) -> Result<Self> {
        let data = fs::read(path).with_context(|| format!("unable to read {path}"))?;
        Self::build(&data)
    }

    pub fn build(data: &[u8]) -> Result<Self> {
        let mut map = BTreeMap::new();
        let obj_file = object::File::parse(data).context("not an object file")?;

        for sym in obj_file.symbols().chain(obj_file.dynamic_symbols()) {
            let Some(idx) = sym.section_index() else { continue };
            let Ok(section) = obj_file.section_by_index(idx) else { continue };
            if section.name().unwrap_or("") != ".text" {
                continue;
            }
            if let Ok(name) = sym.name() {
                map.insert(sym.address(), demangle(name).to_string());
            }
        }

        if map.is_empty() {
            bail!("no .text symbols");
        }

        let segments = obj_file
            .segments()
            .map(|seg| {
                let (offset, size) = seg.file_range();
                LoadSegment {
                    offset,
                    size,
                    vaddr: seg.address(),
                }
            })
            .filter(|seg| seg.size > 0)
            .collect();

        Ok(Self { map, segments })
    }

    /// Virtual address the loader placed file offset `offset` at
    pub fn offset_to_vaddr(&self, offset: u64) -> Option<u64> {
        self.segments
            .iter()
            .find(|seg| offset >= seg.offset && offset - seg.offset < seg.size)
            .map(|seg| offset - seg.offset + seg.vaddr)
    }

    /// symbol covering file offset `offset`
    pub fn find_offset(&self, offset: u64) -> Option<&str> {
        self.find(self.offset_to_vaddr(offset)?)
    }

    pub fn find(&self, addr: u64) -> Option<&str> {
        self.map
            .range(..=addr)
            .next_back()
            .map(|(_, s)| s.as_str())
    }
}

pub fn proc_maps(pid: u32) -> Result<Vec<MemoryMap>> {
    let proc = Process::new(pid as i32).with_context(|| format!("Failed to get process {pid}"))?;
    let maps = proc.maps().with_context(|| format!("Failed to get maps for process {pid}"))?;
    Ok(maps.into_iter().collect())
}

/// Resolves addresses of a live process against the ELF files it has mapped
pub struct ElfSymbolResolver {
    pid: u32,
    maps: OnceCell<Vec<MemoryMap>>,
    modules: Mutex<ModuleCache>,
}

impl ElfSymbolResolver {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            maps: OnceCell::new(),
            modules: Mutex::new(ModuleCache::new()),
        }
    }

    fn maps(&self) -> Option<&[MemoryMap]> {
        match self.maps.get_or_try_init(|| proc_maps(self.pid)) {
            Ok(maps) => Some(maps.as_slice()),
            Err(e) => {
                tracing::warn!("{e:#}");
                None
            }
        }
    }
}

impl SymbolResolver for ElfSymbolResolver {
    fn resolve(&self, module: &str, address: u64) -> Option<String> {
        let offset = file_offset(self.maps()?, module, address)?;
        let symbols = self.modules.lock().resolve(module)?;
        symbols.find_offset(offset).map(str::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_preceding_symbol() {
        let mut symbols = ElfSymbols::default();
        symbols.map.insert(0x1000, "main".to_owned());
        symbols.map.insert(0x1200, "compute".to_owned());

        assert_eq!(symbols.find(0xfff), None);
        assert_eq!(symbols.find(0x1000), Some("main"));
        assert_eq!(symbols.find(0x11ff), Some("main"));
        assert_eq!(symbols.find(0x1234), Some("compute"));
    }

    #[test]
    fn test_build_rejects_garbage() {
        assert!(ElfSymbols::build(b"definitely not an elf file").is_err());
    }

    #[test]
    fn test_build_from_own_executable() {
        let exe = std::env::current_exe().unwrap();
        let symbols = ElfSymbols::from_path(exe.to_str().unwrap()).unwrap();
        assert!(!symbols.map.is_empty());
    }

    #[test]
    fn test_offset_to_vaddr() {
        let mut symbols = ElfSymbols::default();
        symbols.map.insert(0x40_1000, "main".to_owned());
        symbols.map.insert(0x40_2000, "compute".to_owned());
        symbols.segments = vec![
            LoadSegment { offset: 0, size: 0x1000, vaddr: 0x40_0000 },
            LoadSegment { offset: 0x1000, size: 0x2000, vaddr: 0x40_1000 },
        ];

        assert_eq!(symbols.offset_to_vaddr(0x1010), Some(0x40_1010));
        assert_eq!(symbols.offset_to_vaddr(0x3000), None);
        assert_eq!(symbols.find_offset(0x2004), Some("compute"));
        assert_eq!(symbols.find_offset(0x5000), None);
    }

    #[inline(never)]
    fn resolve_target(n: u64) -> u64 {
        std::hint::black_box(n.wrapping_mul(0x9e37_79b9))
    }

    #[test]
    fn test_resolves_own_function() {
        std::hint::black_box(resolve_target(3));
        let exe = std::env::current_exe().unwrap();
        let resolver = ElfSymbolResolver::new(std::process::id());

        let address = resolve_target as usize as u64;
        let name = resolver.resolve(exe.to_str().unwrap(), address + 1).unwrap();
        assert!(name.contains("resolve_target"), "{name}");
    }

    #[test]
    fn test_resolver_unknown_module() {
        let resolver = ElfSymbolResolver::new(std::process::id());
        assert_eq!(resolver.resolve("/nonexistent/module.so", 0x1000), None);
    }
}
