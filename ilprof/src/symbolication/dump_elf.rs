use std::{io::Write, path::Path};
use anyhow::Result;
use symbolic::{common::ByteView, debuginfo::elf::ElfObject, demangle::demangle};

pub fn dump_elf<P: AsRef<Path>, W: Write>(path: P, out: &mut W) -> Result<()> {
    let path = path.as_ref();
    let buffer = ByteView::open(path)?;
    let obj = ElfObject::parse(&buffer)?;

    writeln!(out, "{}", path.display())?;
    writeln!(out, "\tarch: {}", obj.arch())?;
    writeln!(out, "\tkind: {:?}", obj.kind())?;
    writeln!(out, "\tdebug_id: {}", obj.debug_id())?;
    writeln!(out, "\thas_syms: {}", obj.has_symbols())?;
    writeln!(out, "\tsymbols: ")?;
    for sym in obj.symbol_map() {
        let name = sym.name().map(demangle).unwrap_or_default();
        writeln!(out, "\t\t0x{:016x}\t{}", sym.address, name)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_own_executable() {
        let exe = std::env::current_exe().unwrap();
        let mut out = Vec::new();
        dump_elf(&exe, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("symbols:"));
    }
}
