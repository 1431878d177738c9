use std::path::PathBuf;
use procfs::process::{MMapPath, MemoryMap};

pub trait MMapPathExt {
    fn path(&self) -> Option<&PathBuf>;
}

impl MMapPathExt for MMapPath {
    fn path(&self) -> Option<&PathBuf> {
        if let MMapPath::Path(p) = self {
            Some(p)
        }
        else {
            None
        }
    }
}

/// Finds the mapping of `module` containing `address` and returns the file offset
pub fn file_offset(maps: &[MemoryMap], module: &str, address: u64) -> Option<u64> {
    maps.iter()
        .filter(|m| address >= m.address.0 && address < m.address.1)
        .find(|m| m.pathname.path().map_or(false, |p| p.as_os_str() == module))
        .map(|m| address - m.address.0 + m.offset)
}

/// Parses `0x`-prefixed hex or plain decimal addresses
pub fn parse_address(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address `{s}`: {e}"))
}
