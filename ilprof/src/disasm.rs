use iced_x86::{Decoder, DecoderOptions, Formatter, Instruction, NasmFormatter};
use ilprof_common::LONGEST_INSTRUCTION;
use thiserror::Error;

use crate::proc_mem::{MemoryError, ProcessMemory, ReadMemory};

/// Turns an address range into decoded instructions
pub trait Disassemble {
    /// Decodes forward from `first` and returns `(address, text)` for every
    /// instruction starting at or before `last`. Implementations may return a
    /// few instructions past `last`.
    fn instructions(&mut self, first: u64, last: u64) -> Result<Vec<(u64, String)>, DecodeError>;
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error("only {read} of {wanted} bytes readable at {address:#018x}")]
    ShortRead { address: u64, read: usize, wanted: u64 },
    #[error("invalid range {first:#018x}..={last:#018x}")]
    InvalidRange { first: u64, last: u64 },
}

/// Disassembles code straight out of a process's memory
pub struct ProcessDisassembler<M = ProcessMemory> {
    memory: M,
    bitness: u32,
    formatter: NasmFormatter,
}

impl ProcessDisassembler<ProcessMemory> {
    pub fn attach(pid: u32) -> Self {
        Self::new(ProcessMemory::new(pid))
    }
}

impl<M: ReadMemory> ProcessDisassembler<M> {
    pub fn new(memory: M) -> Self {
        Self::with_bitness(memory, host_bitness())
    }

    pub fn with_bitness(memory: M, bitness: u32) -> Self {
        let mut formatter = NasmFormatter::new();
        formatter.options_mut().set_hex_prefix("0x");
        formatter.options_mut().set_hex_suffix("");
        formatter.options_mut().set_uppercase_hex(false);

        Self {
            memory,
            bitness,
            formatter,
        }
    }

    fn decode(&mut self, code: &[u8], ip: u64) -> Vec<(u64, String)> {
        let mut decoder = Decoder::with_ip(self.bitness, code, ip, DecoderOptions::NONE);
        let mut instruction = Instruction::default();
        let mut output = String::new();
        let mut ret = Vec::new();

        while decoder.can_decode() {
            decoder.decode_out(&mut instruction);
            output.clear();
            self.formatter.format(&instruction, &mut output);
            ret.push((instruction.ip(), output.clone()));
        }

        ret
    }
}

impl<M: ReadMemory> Disassemble for ProcessDisassembler<M> {
    fn instructions(&mut self, first: u64, last: u64) -> Result<Vec<(u64, String)>, DecodeError> {
        if last < first {
            return Err(DecodeError::InvalidRange { first, last });
        }

        let needed = last - first + 1;
        let len = needed + LONGEST_INSTRUCTION;
        let code = self.memory.read(first, len as usize)?;
        if (code.len() as u64) < needed {
            return Err(DecodeError::ShortRead {
                address: first,
                read: code.len(),
                wanted: needed,
            });
        }

        Ok(self.decode(&code, first))
    }
}

pub fn host_bitness() -> u32 {
    if cfg!(target_pointer_width = "64") {
        64
    } else {
        32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves a fixed code buffer mapped at `base`
    struct CodeBuffer {
        base: u64,
        code: Vec<u8>,
    }

    impl ReadMemory for CodeBuffer {
        fn read(&self, address: u64, len: usize) -> Result<Vec<u8>, MemoryError> {
            let start = (address - self.base) as usize;
            if start >= self.code.len() {
                return Err(MemoryError::Unmapped { process_id: 0, address });
            }
            let end = (start + len).min(self.code.len());
            Ok(self.code[start..end].to_vec())
        }
    }

    // push rbp; mov rbp,rsp; xor eax,eax; pop rbp; ret
    const CODE: &[u8] = &[0x55, 0x48, 0x89, 0xe5, 0x31, 0xc0, 0x5d, 0xc3];

    fn padded() -> Vec<u8> {
        let mut code = CODE.to_vec();
        code.extend(std::iter::repeat(0x90).take(32));
        code
    }

    #[test]
    fn test_decode_range() {
        let mut disasm = ProcessDisassembler::with_bitness(CodeBuffer { base: 0x1000, code: padded() }, 64);
        let instrs = disasm.instructions(0x1000, 0x1006).unwrap();

        assert_eq!(instrs[0], (0x1000, "push rbp".to_owned()));
        assert_eq!(instrs[1], (0x1001, "mov rbp,rsp".to_owned()));
        assert_eq!(instrs[2], (0x1004, "xor eax,eax".to_owned()));
        assert_eq!(instrs[3], (0x1006, "pop rbp".to_owned()));
        // over-read decodes past the last sampled address
        assert!(instrs.iter().any(|(a, _)| *a > 0x1006));
    }

    #[test]
    fn test_hex_formatting() {
        // mov eax,0x1234
        let mut code = vec![0xb8, 0x34, 0x12, 0x00, 0x00];
        code.extend(std::iter::repeat(0x90).take(16));
        let mut disasm = ProcessDisassembler::with_bitness(CodeBuffer { base: 0x2000, code }, 64);
        let instrs = disasm.instructions(0x2000, 0x2000).unwrap();
        assert_eq!(instrs[0].1, "mov eax,0x1234");
    }

    #[test]
    fn test_short_read() {
        let mut disasm = ProcessDisassembler::with_bitness(CodeBuffer { base: 0x1000, code: CODE.to_vec() }, 64);
        assert!(matches!(
            disasm.instructions(0x1000, 0x1010),
            Err(DecodeError::ShortRead { read: 8, .. })
        ));
    }

    #[test]
    fn test_unmapped() {
        let mut disasm = ProcessDisassembler::with_bitness(CodeBuffer { base: 0x1000, code: padded() }, 64);
        assert!(matches!(
            disasm.instructions(0x9000, 0x9001),
            Err(DecodeError::Memory(MemoryError::Unmapped { .. }))
        ));
    }

    #[test]
    fn test_inverted_range() {
        let mut disasm = ProcessDisassembler::with_bitness(CodeBuffer { base: 0x1000, code: padded() }, 64);
        assert!(matches!(disasm.instructions(0x1004, 0x1000), Err(DecodeError::InvalidRange { .. })));
    }
}
