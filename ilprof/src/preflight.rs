use std::fmt::Display;
use std::fs;

use object::FileKind;
use procfs::process::Process;

use crate::disasm::host_bitness;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// the profiler cannot run at all
    pub is_critical: bool,
    pub message: String,
}

impl ValidationError {
    fn critical(message: impl Into<String>) -> Self {
        Self {
            is_critical: true,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            is_critical: false,
            message: message.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = if self.is_critical { "error" } else { "warning" };
        write!(f, "{level}: {}", self.message)
    }
}

/// Checks that process `pid` can be profiled from here
pub fn validate(pid: u32) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !cfg!(target_os = "linux") {
        errors.push(ValidationError::critical("ilprof is supported only on Linux"));
        return errors;
    }

    if !cfg!(any(target_arch = "x86_64", target_arch = "x86")) {
        errors.push(ValidationError::critical("instruction decoding supports only x86 and x86_64"));
    }

    let process = match Process::new(pid as i32) {
        Ok(p) => p,
        Err(e) => {
            errors.push(ValidationError::critical(format!("process {pid} not found: {e}")));
            return errors;
        }
    };

    let exe = match process.exe() {
        Ok(exe) => exe,
        Err(e) => {
            errors.push(ValidationError::warning(format!(
                "unable to inspect executable of process {pid}: {e}"
            )));
            return errors;
        }
    };

    match fs::read(&exe).map(|data| FileKind::parse(data.as_slice()).map(bitness)) {
        Ok(Ok(Some(bits))) if bits != host_bitness() => errors.push(ValidationError::critical(format!(
            "{} is {bits}-bit, ilprof decodes {}-bit code",
            exe.display(),
            host_bitness()
        ))),
        Ok(Ok(_)) => {}
        Ok(Err(e)) => errors.push(ValidationError::warning(format!("{}: {e}", exe.display()))),
        Err(e) => errors.push(ValidationError::warning(format!("unable to read {}: {e}", exe.display()))),
    }

    errors
}

fn bitness(kind: FileKind) -> Option<u32> {
    match kind {
        FileKind::Elf32 => Some(32),
        FileKind::Elf64 => Some(64),
        _ => None,
    }
}
