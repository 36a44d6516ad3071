// ── Variable table ──
//
// Small client-assigned handles for things the user wants to refer to
// later: connections, loaded modules and factory-created proxies. Handles
// are allocated monotonically and never handed out twice.

use std::collections::BTreeMap;

use pwmirror_api::ProxyId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    /// A connection. Its slot id is the handle itself.
    Remote,
    /// A module loaded into the local context.
    Module { id: u32 },
    /// A proxy created or exported on connection `remote`.
    Proxy { remote: u32, proxy: ProxyId },
}

#[derive(Debug, Default)]
pub struct VarTable {
    next: u32,
    vars: BTreeMap<u32, Variable>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, var: Variable) -> u32 {
        let handle = self.next;
        self.next += 1;
        self.vars.insert(handle, var);
        handle
    }

    pub fn get(&self, handle: u32) -> Option<Variable> {
        self.vars.get(&handle).copied()
    }

    pub fn remove(&mut self, handle: u32) -> Option<Variable> {
        self.vars.remove(&handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Variable)> + '_ {
        self.vars.iter().map(|(h, v)| (*h, *v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_never_reused() {
        let mut vars = VarTable::new();
        let a = vars.insert(Variable::Remote);
        let b = vars.insert(Variable::Module { id: 3 });
        vars.remove(b);
        let c = vars.insert(Variable::Module { id: 4 });
        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(vars.get(b), None);
        assert_eq!(vars.get(c), Some(Variable::Module { id: 4 }));
    }

    #[test]
    fn iteration_is_in_handle_order() {
        let mut vars = VarTable::new();
        let remote = vars.insert(Variable::Remote);
        let proxy = vars.insert(Variable::Proxy { remote, proxy: 2 });
        let kinds: Vec<(u32, Variable)> = vars.iter().collect();
        assert_eq!(
            kinds,
            vec![
                (remote, Variable::Remote),
                (proxy, Variable::Proxy { remote, proxy: 2 })
            ]
        );
        assert_eq!(vars.len(), 2);
    }
}
