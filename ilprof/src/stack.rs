use std::sync::Arc;

use ilprof_common::RawFrame;

use crate::symbolication::{SymbolHandle, SymbolResolver};

/// One frame of a captured stack
#[derive(Clone, Debug)]
pub struct StackFrame {
    pub address: u64,
    pub method_name: String,
    pub symbol: SymbolHandle,
}

impl StackFrame {
    pub fn new(address: u64, method_name: &str) -> Self {
        Self {
            address,
            method_name: method_name.to_owned(),
            symbol: SymbolHandle::unresolved(address, method_name),
        }
    }

    pub fn from_raw(raw: &RawFrame, resolver: Option<&Arc<dyn SymbolResolver>>) -> Self {
        Self {
            address: raw.address,
            method_name: raw.name.clone(),
            symbol: SymbolHandle::new(
                raw.address,
                &raw.name,
                raw.module.as_deref(),
                resolver.cloned(),
            ),
        }
    }
}

/// Builds a stack ordered outermost caller first from frames delivered innermost first.
pub fn capture_stack(frames: &[RawFrame], resolver: Option<&Arc<dyn SymbolResolver>>) -> Vec<StackFrame> {
    let mut stack = frames
        .iter()
        .map(|raw| StackFrame::from_raw(raw, resolver))
        .collect::<Vec<_>>();
    stack.reverse();
    stack
}

/// Drops every frame above the first one belonging to `root_method`.
/// Empty when the stack never entered it.
pub fn trim_to_root<'a>(stack: &'a [StackFrame], root_method: &str) -> &'a [StackFrame] {
    let start = stack
        .iter()
        .position(|f| f.method_name.contains(root_method))
        .unwrap_or(stack.len());
    &stack[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(names: &[(u64, &str)]) -> Vec<StackFrame> {
        names.iter().map(|(a, n)| StackFrame::new(*a, n)).collect()
    }

    #[test]
    fn test_capture_reverses_caller_chain() {
        let frames = vec![
            RawFrame::new(0x30, "leaf"),
            RawFrame::new(0x20, "middle"),
            RawFrame::new(0x10, "main").with_module("/bin/app"),
        ];
        let stack = capture_stack(&frames, None);

        let addrs = stack.iter().map(|f| f.address).collect::<Vec<_>>();
        assert_eq!(addrs, vec![0x10, 0x20, 0x30]);
        assert_eq!(stack[0].symbol.module(), Some("/bin/app"));
        assert_eq!(stack[2].symbol.name(), "leaf");
    }

    #[test]
    fn test_capture_empty() {
        assert!(capture_stack(&[], None).is_empty());
    }

    #[test]
    fn test_trim_to_first_match() {
        let s = stack(&[
            (0x1, "ntdll!RtlUserThreadStart"),
            (0x2, "Harness.RunIteration"),
            (0x3, "Benchmarks.Sum"),
            (0x4, "Benchmarks.Sum"),
            (0x5, "Helpers.Add"),
        ]);
        let trimmed = trim_to_root(&s, "Benchmarks.Sum");
        assert_eq!(trimmed.len(), 3);
        assert_eq!(trimmed[0].address, 0x3);
    }

    #[test]
    fn test_trim_is_case_sensitive_substring() {
        let s = stack(&[(0x1, "main"), (0x2, "app::bench::sum_slice")]);
        assert_eq!(trim_to_root(&s, "bench::sum").len(), 1);
        assert!(trim_to_root(&s, "Bench::Sum").is_empty());
    }

    #[test]
    fn test_trim_without_match() {
        let s = stack(&[(0x1, "main"), (0x2, "other")]);
        assert!(trim_to_root(&s, "Benchmarks.Sum").is_empty());
    }
}
