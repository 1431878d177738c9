use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::{
    calltree::CallTree,
    disasm::Disassemble,
    report::{RenderError, Renderer},
    stack::{trim_to_root, StackFrame},
};

/// Samples collected for one root method during one measurement
#[derive(Debug)]
pub struct ProfileData {
    root_method: String,
    samples: AtomicU64,
    tree: Mutex<CallTree>,
}

impl ProfileData {
    pub fn new(root_method: &str) -> Self {
        Self {
            root_method: root_method.to_owned(),
            samples: AtomicU64::new(0),
            tree: Mutex::new(CallTree::new()),
        }
    }

    pub fn root_method(&self) -> &str {
        &self.root_method
    }

    /// number of stacks that reached the root method
    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    /// Adds a stack ordered outermost first. Returns false if it never entered the root method.
    pub fn add_stack(&self, stack: &[StackFrame]) -> bool {
        let stack = trim_to_root(stack, &self.root_method);
        if stack.is_empty() {
            return false;
        }

        self.samples.fetch_add(1, Ordering::Relaxed);
        self.tree.lock().ingest(stack);
        true
    }

    pub fn with_tree<R>(&self, f: impl FnOnce(&CallTree) -> R) -> R {
        f(&self.tree.lock())
    }

    /// Appends the annotated disassembly of the call tree to `out`
    pub fn build_report<D: Disassemble>(&self, out: &mut String, disasm: &mut D, max_depth: usize) -> Result<(), RenderError> {
        let tree = self.tree.lock();
        if tree.root().is_none() {
            let _ = writeln!(out, "No CPU samples hit method, {}", self.root_method);
            return Ok(());
        }

        Renderer::new(&tree, disasm, max_depth).render(out)
    }
}
