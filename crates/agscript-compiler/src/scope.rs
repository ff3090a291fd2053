//! Local scope management for function compilation.
//!
//! This module provides `LocalScope` for tracking local variables while a
//! function body is compiled. It handles:
//! - Variable declaration at stack offsets
//! - Nested block scopes (if/while/for bodies)
//! - Variable shadowing with proper restoration on scope exit
//! - The running distance between the stack pointer and the start of the
//!   local variable block, which every stack access is relative to

use rustc_hash::FxHashMap;

use crate::bytecode::STACK_CELL_SIZE;
use crate::types::VarType;

// ============================================================================
// Types
// ============================================================================

/// Information about a local variable or parameter.
#[derive(Debug, Clone)]
pub struct LocalVar {
    pub name: String,
    pub vartype: VarType,
    /// Position relative to the local variable block. Parameters lie below
    /// the block and have negative offsets.
    pub offset: i32,
    /// Scope depth where declared (1 = parameters)
    pub depth: u32,
    pub readonly: bool,
    pub is_param: bool,
}

impl LocalVar {
    /// Offset of parameter `index` (0-based): below the return address,
    /// first parameter nearest.
    pub fn param_offset(index: usize) -> i32 {
        -((STACK_CELL_SIZE as i32) * (index as i32 + 2))
    }
}

// ============================================================================
// LocalScope
// ============================================================================

/// Local variables of the function being compiled.
#[derive(Debug, Default)]
pub struct LocalScope {
    /// Variables by name in the current scope chain
    variables: FxHashMap<String, LocalVar>,

    /// All live variables in declaration order
    order: Vec<LocalVar>,

    /// Current scope depth (0 = outside any function)
    scope_depth: u32,

    /// Stack of shadowed variables (shadowing_depth, name, old_var)
    shadowed: Vec<(u32, String, LocalVar)>,

    /// Value of `offset_to_local_var_block` when each depth was entered
    depth_start: Vec<i32>,

    /// Bytes between the start of the local variable block and the stack
    /// pointer. Grows with every push, shrinks with every pop.
    offset_to_local_var_block: i32,
}

impl LocalScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything and start a new function.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // ==========================================================================
    // Scope Management
    // ==========================================================================

    /// Enter a new scope (block, if body, loop body, etc.).
    pub fn push_scope(&mut self) {
        self.scope_depth += 1;
        self.depth_start.push(self.offset_to_local_var_block);
    }

    /// Exit the current scope, removing variables declared in it.
    ///
    /// Returns those variables, latest first. The caller emits the code
    /// that releases them and moves the stack pointer back.
    pub fn pop_scope(&mut self) -> Vec<LocalVar> {
        let depth = self.scope_depth;
        self.variables.retain(|_, var| var.depth < depth);
        while let Some(&(shadowing_depth, _, _)) = self.shadowed.last() {
            if shadowing_depth != depth {
                break;
            }
            if let Some((_, name, var)) = self.shadowed.pop() {
                self.variables.insert(name, var);
            }
        }
        let keep = self.order.partition_point(|v| v.depth < depth);
        let mut removed = self.order.split_off(keep);
        removed.reverse();
        self.depth_start.pop();
        self.scope_depth = depth.saturating_sub(1);
        removed
    }

    /// Get current scope depth.
    pub fn depth(&self) -> u32 {
        self.scope_depth
    }

    // ==========================================================================
    // Stack offset
    // ==========================================================================

    pub fn offset(&self) -> i32 {
        self.offset_to_local_var_block
    }

    /// Account for a change of the stack pointer by `delta` bytes.
    pub fn adjust(&mut self, delta: i32) {
        self.offset_to_local_var_block += delta;
    }

    /// Bytes allocated since `depth` was entered.
    pub fn size_from_depth(&self, depth: u32) -> i32 {
        match depth.checked_sub(1).and_then(|i| self.depth_start.get(i as usize)) {
            Some(&start) => self.offset_to_local_var_block - start,
            None => self.offset_to_local_var_block,
        }
    }

    /// Distance from the stack pointer to `var`'s storage, as `LOADSPOFFS`
    /// expects it.
    pub fn sp_distance(&self, offset: i32) -> i32 {
        self.offset_to_local_var_block - offset
    }

    // ==========================================================================
    // Variable Declaration
    // ==========================================================================

    /// Declare a variable at the current depth.
    ///
    /// Returns the variable already declared at this depth if there is one.
    pub fn declare(&mut self, var: LocalVar) -> Result<(), LocalVar> {
        let mut var = var;
        var.depth = self.scope_depth;
        if let Some(existing) = self.variables.get(&var.name) {
            if existing.depth == self.scope_depth {
                return Err(existing.clone());
            }
            self.shadowed
                .push((self.scope_depth, var.name.clone(), existing.clone()));
        }
        self.order.push(var.clone());
        self.variables.insert(var.name.clone(), var);
        Ok(())
    }

    // ==========================================================================
    // Variable Lookup
    // ==========================================================================

    pub fn get(&self, name: &str) -> Option<&LocalVar> {
        self.variables.get(name)
    }

    /// Check if a name is declared in the current scope (not outer scopes).
    pub fn is_declared_in_current_scope(&self, name: &str) -> bool {
        self.variables
            .get(name)
            .is_some_and(|v| v.depth == self.scope_depth)
    }

    /// Live variables declared at `depth` or deeper, latest first.
    pub fn vars_from_depth(&self, depth: u32) -> impl Iterator<Item = &LocalVar> {
        self.order.iter().rev().take_while(move |v| v.depth >= depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, offset: i32) -> LocalVar {
        LocalVar {
            name: name.to_string(),
            vartype: VarType::int(),
            offset,
            depth: 0,
            readonly: false,
            is_param: false,
        }
    }

    #[test]
    fn parameters_lie_below_the_block() {
        assert_eq!(LocalVar::param_offset(0), -8);
        assert_eq!(LocalVar::param_offset(2), -16);
    }

    #[test]
    fn offsets_follow_pushes() {
        let mut scope = LocalScope::new();
        scope.push_scope();
        scope.declare(var("p", LocalVar::param_offset(0))).unwrap();
        // With no locals, the first parameter is 8 bytes below SP.
        assert_eq!(scope.sp_distance(scope.get("p").unwrap().offset), 8);

        scope.push_scope();
        scope.declare(var("a", scope.offset())).unwrap();
        scope.adjust(4);
        assert_eq!(scope.sp_distance(scope.get("a").unwrap().offset), 4);
        assert_eq!(scope.sp_distance(scope.get("p").unwrap().offset), 12);
        assert_eq!(scope.size_from_depth(2), 4);
    }

    #[test]
    fn redeclaration_in_same_scope_fails() {
        let mut scope = LocalScope::new();
        scope.push_scope();
        scope.declare(var("x", 0)).unwrap();
        assert!(scope.declare(var("x", 4)).is_err());
        assert!(scope.is_declared_in_current_scope("x"));
    }

    #[test]
    fn shadowing_is_undone_on_exit() {
        let mut scope = LocalScope::new();
        scope.push_scope();
        scope.declare(var("x", 0)).unwrap();
        scope.adjust(4);

        scope.push_scope();
        scope.declare(var("x", 4)).unwrap();
        scope.adjust(4);
        assert_eq!(scope.get("x").unwrap().offset, 4);
        assert_eq!(scope.vars_from_depth(2).count(), 1);

        let removed = scope.pop_scope();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].offset, 4);
        assert_eq!(scope.get("x").unwrap().offset, 0);
        assert_eq!(scope.depth(), 1);
    }

    #[test]
    fn vars_from_depth_are_latest_first() {
        let mut scope = LocalScope::new();
        scope.push_scope();
        scope.declare(var("a", 0)).unwrap();
        scope.push_scope();
        scope.declare(var("b", 4)).unwrap();
        scope.declare(var("c", 8)).unwrap();
        let names: Vec<_> = scope.vars_from_depth(1).map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }
}
