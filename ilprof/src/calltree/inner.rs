use std::collections::BTreeMap;

use fxhash::FxHashMap;
use ilprof_common::is_userspace;
use indextree::{Arena, NodeId};

use crate::{stack::StackFrame, symbolication::SymbolHandle};

/// Samples attributed to one method in one call context
#[derive(Debug, Clone)]
pub struct MethodSamples {
    pub symbol: SymbolHandle,
    /// samples that passed through this method
    pub total_samples: u64,
    /// samples whose innermost frame at this level was the address
    pub address_counts: BTreeMap<u64, u64>,
    calls: FxHashMap<u64, NodeId>,
}

impl MethodSamples {
    pub fn new(symbol: SymbolHandle) -> Self {
        Self {
            symbol,
            total_samples: 0,
            address_counts: BTreeMap::new(),
            calls: FxHashMap::default(),
        }
    }

    pub fn count_at(&self, address: u64) -> u64 {
        self.address_counts.get(&address).copied().unwrap_or(0)
    }

    /// callee reached from the call site at `address`
    pub fn call(&self, address: u64) -> Option<NodeId> {
        self.calls.get(&address).copied()
    }

    pub fn call_sites(&self) -> impl Iterator<Item = (u64, NodeId)> + '_ {
        self.calls.iter().map(|(a, n)| (*a, *n))
    }
}

/// Call tree rooted at the measured method
#[derive(Debug, Default)]
pub struct CallTree {
    pub arena: Arena<MethodSamples>,
    root: Option<NodeId>,
}

impl CallTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> &MethodSamples {
        self.arena[id].get()
    }

    /// Returns the root, installing it with `symbol` if this is the first sample
    pub fn root_or_insert(&mut self, symbol: &SymbolHandle) -> NodeId {
        if let Some(root) = self.root {
            return root;
        }
        let root = self.arena.new_node(MethodSamples::new(symbol.clone()));
        self.root = Some(root);
        root
    }

    fn call_or_insert(&mut self, parent: NodeId, call_site: u64, symbol: &SymbolHandle) -> NodeId {
        if let Some(callee) = self.arena[parent].get().call(call_site) {
            return callee;
        }
        let callee = self.arena.new_node(MethodSamples::new(symbol.clone()));
        parent.append(callee, &mut self.arena);
        self.arena[parent].get_mut().calls.insert(call_site, callee);
        callee
    }

    /// add a stack that starts at the root method
    pub fn ingest(&mut self, stack: &[StackFrame]) {
        let Some(first) = stack.first() else { return };
        let mut node = self.root_or_insert(&first.symbol);
        let mut frames = stack;

        while let Some((current, rest)) = frames.split_first() {
            self.arena[node].get_mut().total_samples += 1;

            match rest.first() {
                Some(next) if is_userspace(next.address) => {
                    node = self.call_or_insert(node, current.address, &next.symbol);
                    frames = rest;
                }
                _ => {
                    *self.arena[node]
                        .get_mut()
                        .address_counts
                        .entry(current.address)
                        .or_insert(0) += 1;
                    break;
                }
            }
        }
    }
}
