use std::fmt::Write;

use indextree::NodeId;
use thiserror::Error;

use crate::{
    calltree::{sample_spans, CallTree},
    disasm::{DecodeError, Disassemble},
};

pub mod export;

pub use export::Exporter;

/// Repeated once per call-tree level in front of every line
pub const INDENT_MARKER: char = '-';

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unable to disassemble {first:#018x}..={last:#018x}")]
    Decode {
        first: u64,
        last: u64,
        source: DecodeError,
    },
}

/// `100 * count / total` with at most two decimals and no trailing zeros
pub fn format_percent(count: u64, total: u64) -> String {
    if total == 0 {
        return "0".to_owned();
    }
    let pct = 100.0 * count as f64 / total as f64;
    let s = format!("{:.2}", (pct * 100.0).round() / 100.0);
    s.trim_end_matches('0').trim_end_matches('.').to_owned()
}

/// Walks a frozen call tree and writes the annotated disassembly
pub struct Renderer<'a, D> {
    tree: &'a CallTree,
    disasm: &'a mut D,
    max_depth: usize,
    spans: usize,
}

impl<'a, D: Disassemble> Renderer<'a, D> {
    pub fn new(tree: &'a CallTree, disasm: &'a mut D, max_depth: usize) -> Self {
        Self {
            tree,
            disasm,
            max_depth,
            spans: 0,
        }
    }

    /// Renders the whole tree. Writes nothing when the tree has no root.
    pub fn render(&mut self, out: &mut String) -> Result<(), RenderError> {
        if let Some(root) = self.tree.root() {
            let total = self.tree.get(root).total_samples;
            self.render_node(out, root, total, 0)?;
            tracing::debug!("rendered {} spans", self.spans);
        }
        Ok(())
    }

    fn render_node(&mut self, out: &mut String, id: NodeId, parent_total: u64, depth: usize) -> Result<(), RenderError> {
        let tree = self.tree;
        let node = tree.get(id);
        // calls only, nothing sampled at this level
        if node.address_counts.is_empty() {
            tracing::debug!(
                "skipping `{}` at depth {depth}: all {} samples are in callees",
                node.symbol.name(),
                node.total_samples
            );
            return Ok(());
        }

        let name = node.symbol.name();
        if !name.is_empty() {
            indent(out, depth);
            let _ = writeln!(
                out,
                "{} : {} samples ({}%)",
                name,
                node.total_samples,
                format_percent(node.total_samples, parent_total)
            );
        }

        if depth >= self.max_depth {
            indent(out, depth);
            let _ = writeln!(out, "Max recursion depth of {} reached.", self.max_depth);
            return Ok(());
        }

        for (first, last) in sample_spans(node.address_counts.keys().copied()) {
            self.spans += 1;
            let instructions = self
                .disasm
                .instructions(first, last)
                .map_err(|source| RenderError::Decode { first, last, source })?;

            for (address, text) in instructions {
                if address > last {
                    break;
                }

                if let Some(callee) = node.call(address) {
                    self.render_node(out, callee, node.total_samples, depth + 1)?;
                }

                let samples = node.count_at(address);
                indent(out, depth);
                let _ = writeln!(
                    out,
                    "{:016x} {} : {} samples ({}%)",
                    address,
                    text,
                    samples,
                    format_percent(samples, node.total_samples)
                );
            }
        }

        Ok(())
    }
}

fn indent(out: &mut String, depth: usize) {
    out.extend(std::iter::repeat(INDENT_MARKER).take(depth));
}
