//! IR functions and their control-flow graph queries.

use std::{
    collections::{HashSet, VecDeque},
    fmt,
};

use crate::{
    ast::Symbol,
    ir::{
        block::BasicBlock,
        ops::IrOp,
        value::{BlockId, Operand, ValueId},
    },
};

/// A function in SSA form.
///
/// The function owns its blocks; block `0` is the entry. Parameters are the
/// first values allocated, so `params()[i]` is `ValueId::new(i)`. Every
/// function returns an `i32`.
#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    name: Symbol,
    params: Vec<ValueId>,
    blocks: Vec<BasicBlock>,
    next_value: usize,
}

impl IrFunction {
    /// Creates a function without blocks.
    ///
    /// # Arguments
    ///
    /// * `name` - The function name
    /// * `param_count` - Number of `i32` parameters
    #[must_use]
    pub fn new(name: Symbol, param_count: usize) -> Self {
        Self {
            name,
            params: (0..param_count).map(ValueId::new).collect(),
            blocks: Vec::new(),
            next_value: param_count,
        }
    }

    /// The function name.
    #[must_use]
    pub fn name(&self) -> &Symbol {
        &self.name
    }

    /// The parameter values, in call order.
    #[must_use]
    pub fn params(&self) -> &[ValueId] {
        &self.params
    }

    /// Number of parameters.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// The blocks of this function.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Mutable access to the blocks.
    ///
    /// Callers adding or removing blocks directly are responsible for keeping
    /// each block's `id` equal to its index.
    pub fn blocks_mut(&mut self) -> &mut Vec<BasicBlock> {
        &mut self.blocks
    }

    /// Returns a block by id.
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    /// Returns a block by id, mutably.
    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(id.index())
    }

    /// Number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Appends an empty block and returns its id.
    pub fn add_block(&mut self, label: &'static str) -> BlockId {
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(BasicBlock::new(id, label));
        id
    }

    /// Allocates a fresh SSA value.
    pub fn new_value(&mut self) -> ValueId {
        let id = ValueId::new(self.next_value);
        self.next_value += 1;
        id
    }

    /// Upper bound (exclusive) of the value indices allocated so far.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.next_value
    }

    /// Total number of instructions across all blocks.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(BasicBlock::len).sum()
    }

    /// Iterates over all instructions together with their block.
    pub fn instructions(&self) -> impl Iterator<Item = (BlockId, &IrOp)> {
        self.blocks
            .iter()
            .flat_map(|block| block.instructions.iter().map(move |op| (block.id, op)))
    }

    /// Counts the reads of `value` across the whole function.
    #[must_use]
    pub fn use_count(&self, value: ValueId) -> usize {
        self.instructions().map(|(_, op)| op.use_count(value)).sum()
    }

    /// Replaces every read of `value` with `replacement`.
    ///
    /// Returns the number of operands rewritten.
    pub fn replace_uses(&mut self, value: ValueId, replacement: Operand) -> usize {
        self.blocks
            .iter_mut()
            .flat_map(|block| block.instructions.iter_mut())
            .map(|op| op.replace_uses(value, replacement))
            .sum()
    }

    /// Removes the instructions at the given `(block, index)` positions.
    ///
    /// Positions refer to the function before any removal; victims are
    /// gathered first and erased in one sweep per block. Returns the number
    /// of instructions removed.
    pub fn remove_instructions(&mut self, victims: &HashSet<(BlockId, usize)>) -> usize {
        let mut removed = 0;
        for block in &mut self.blocks {
            let id = block.id;
            let mut index = 0;
            block.instructions.retain(|_| {
                let keep = !victims.contains(&(id, index));
                index += 1;
                if !keep {
                    removed += 1;
                }
                keep
            });
        }
        removed
    }

    /// Computes the predecessors of every block, without duplicates.
    #[must_use]
    pub fn predecessors(&self) -> Vec<Vec<BlockId>> {
        let mut preds = vec![Vec::new(); self.blocks.len()];
        for block in &self.blocks {
            for succ in block.successors() {
                if let Some(list) = preds.get_mut(succ.index()) {
                    if !list.contains(&block.id) {
                        list.push(block.id);
                    }
                }
            }
        }
        preds
    }

    /// Marks the blocks reachable from the entry.
    #[must_use]
    pub fn reachable_blocks(&self) -> Vec<bool> {
        let mut reachable = vec![false; self.blocks.len()];
        if self.blocks.is_empty() {
            return reachable;
        }

        let mut queue = VecDeque::from([BlockId::ENTRY]);
        reachable[0] = true;
        while let Some(id) = queue.pop_front() {
            for succ in self.blocks[id.index()].successors() {
                if succ.index() < reachable.len() && !reachable[succ.index()] {
                    reachable[succ.index()] = true;
                    queue.push_back(succ);
                }
            }
        }
        reachable
    }

    /// Removes every block whose `keep` flag is unset and renumbers the rest.
    ///
    /// Branch targets and phi predecessors are rewritten to the new indices;
    /// phi entries coming from removed blocks are dropped. Kept blocks must
    /// not branch to removed ones.
    ///
    /// # Returns
    ///
    /// The number of blocks removed.
    pub fn remove_blocks(&mut self, keep: &[bool]) -> usize {
        let mut remap = vec![None; self.blocks.len()];
        let mut next = 0;
        for (index, slot) in remap.iter_mut().enumerate() {
            if keep.get(index).copied().unwrap_or(true) {
                *slot = Some(BlockId::new(next));
                next += 1;
            }
        }

        let removed = self.blocks.len() - next;
        if removed == 0 {
            return 0;
        }

        let blocks = std::mem::take(&mut self.blocks);
        for mut block in blocks {
            let Some(new_id) = remap[block.id.index()] else {
                continue;
            };
            block.id = new_id;
            for op in &mut block.instructions {
                if let IrOp::Phi { incoming, .. } = op {
                    incoming.retain(|(pred, _)| remap[pred.index()].is_some());
                }
                op.remap_blocks(|old| remap[old.index()].unwrap_or(old));
            }
            self.blocks.push(block);
        }
        removed
    }

    /// Drops phi entries whose block is no longer a predecessor.
    ///
    /// Returns the number of entries removed.
    pub fn prune_phi_incoming(&mut self) -> usize {
        let preds = self.predecessors();
        let mut removed = 0;
        for block in &mut self.blocks {
            let block_preds = &preds[block.id.index()];
            for op in &mut block.instructions {
                if let IrOp::Phi { incoming, .. } = op {
                    let before = incoming.len();
                    incoming.retain(|(pred, _)| block_preds.contains(pred));
                    removed += before - incoming.len();
                }
            }
        }
        removed
    }

    /// Computes the immediate dominator of every reachable block.
    ///
    /// Uses the iterative algorithm of Cooper, Harvey and Kennedy over a
    /// reverse postorder. The entry is its own dominator; unreachable blocks
    /// map to `None`.
    #[must_use]
    pub fn dominators(&self) -> Vec<Option<BlockId>> {
        let count = self.blocks.len();
        let mut idom: Vec<Option<BlockId>> = vec![None; count];
        if count == 0 {
            return idom;
        }

        let order = self.reverse_postorder();
        let mut rpo_index = vec![usize::MAX; count];
        for (i, id) in order.iter().enumerate() {
            rpo_index[id.index()] = i;
        }
        let preds = self.predecessors();

        idom[0] = Some(BlockId::ENTRY);
        let mut changed = true;
        while changed {
            changed = false;
            for &block in order.iter().skip(1) {
                let mut new_idom: Option<BlockId> = None;
                for &pred in &preds[block.index()] {
                    if idom[pred.index()].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => Self::intersect(&idom, &rpo_index, pred, current),
                    });
                }
                if new_idom.is_some() && idom[block.index()] != new_idom {
                    idom[block.index()] = new_idom;
                    changed = true;
                }
            }
        }
        idom
    }

    fn intersect(
        idom: &[Option<BlockId>],
        rpo_index: &[usize],
        mut a: BlockId,
        mut b: BlockId,
    ) -> BlockId {
        while a != b {
            while rpo_index[a.index()] > rpo_index[b.index()] {
                a = idom[a.index()].unwrap_or(BlockId::ENTRY);
            }
            while rpo_index[b.index()] > rpo_index[a.index()] {
                b = idom[b.index()].unwrap_or(BlockId::ENTRY);
            }
        }
        a
    }

    /// Returns the reachable blocks in reverse postorder.
    #[must_use]
    pub fn reverse_postorder(&self) -> Vec<BlockId> {
        let count = self.blocks.len();
        let mut order = Vec::with_capacity(count);
        if count == 0 {
            return order;
        }

        let mut visited = vec![false; count];
        let mut stack = vec![(BlockId::ENTRY, 0usize)];
        visited[0] = true;
        while let Some((block, next_succ)) = stack.pop() {
            let succs = self.blocks[block.index()].successors();
            if let Some(&succ) = succs.get(next_succ) {
                stack.push((block, next_succ + 1));
                if succ.index() < count && !visited[succ.index()] {
                    visited[succ.index()] = true;
                    stack.push((succ, 0));
                }
            } else {
                order.push(block);
            }
        }
        order.reverse();
        order
    }
}

/// Returns `true` if block `a` dominates block `b` under the given idom tree.
#[must_use]
pub fn dominates(idom: &[Option<BlockId>], a: BlockId, b: BlockId) -> bool {
    let mut current = b;
    loop {
        if current == a {
            return true;
        }
        match idom.get(current.index()).copied().flatten() {
            Some(parent) if parent != current => current = parent,
            _ => return false,
        }
    }
}

impl fmt::Display for IrFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "define i32 @{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "i32 {param}")?;
        }
        writeln!(f, ") {{")?;
        for block in &self.blocks {
            write!(f, "{block}")?;
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// bb0 -> bb1 | bb2 -> bb3 (diamond), plus an orphan bb4.
    fn diamond() -> IrFunction {
        let mut f = IrFunction::new(Symbol::from("d"), 1);
        let entry = f.add_block("entry");
        let then = f.add_block("if.then");
        let other = f.add_block("if.else");
        let join = f.add_block("if.end");
        let orphan = f.add_block("orphan");
        let p = f.params()[0];
        let phi = f.new_value();

        f.block_mut(entry).unwrap().instructions.push(IrOp::Branch {
            condition: Operand::Value(p),
            true_target: then,
            false_target: other,
        });
        f.block_mut(then)
            .unwrap()
            .instructions
            .push(IrOp::Jump { target: join });
        f.block_mut(other)
            .unwrap()
            .instructions
            .push(IrOp::Jump { target: join });
        let join_block = f.block_mut(join).unwrap();
        join_block.instructions.push(IrOp::Phi {
            dest: phi,
            incoming: vec![(then, Operand::Imm(1)), (other, Operand::Imm(2))],
        });
        join_block.instructions.push(IrOp::Return {
            value: Operand::Value(phi),
        });
        f.block_mut(orphan)
            .unwrap()
            .instructions
            .push(IrOp::Jump { target: join });
        f
    }

    #[test]
    fn test_values_and_params() {
        let mut f = IrFunction::new(Symbol::from("f"), 2);
        assert_eq!(f.params(), &[ValueId::new(0), ValueId::new(1)]);
        assert_eq!(f.new_value(), ValueId::new(2));
        assert_eq!(f.value_count(), 3);
    }

    #[test]
    fn test_predecessors_and_reachability() {
        let f = diamond();
        let preds = f.predecessors();
        assert_eq!(preds[0], vec![]);
        assert_eq!(preds[3].len(), 3);
        assert_eq!(f.reachable_blocks(), vec![true, true, true, true, false]);
    }

    #[test]
    fn test_dominators() {
        let f = diamond();
        let idom = f.dominators();
        assert_eq!(idom[1], Some(BlockId::ENTRY));
        assert_eq!(idom[3], Some(BlockId::ENTRY));
        assert_eq!(idom[4], None);
        assert!(dominates(&idom, BlockId::ENTRY, BlockId::new(3)));
        assert!(!dominates(&idom, BlockId::new(1), BlockId::new(3)));
    }

    #[test]
    fn test_remove_blocks_renumbers() {
        let mut f = diamond();
        let keep = f.reachable_blocks();
        assert_eq!(f.remove_blocks(&keep), 1);
        assert_eq!(f.block_count(), 4);

        // Drop the else branch by rewriting the entry to jump straight to bb1.
        f.block_mut(BlockId::ENTRY).unwrap().instructions[0] = IrOp::Jump {
            target: BlockId::new(1),
        };
        let keep = f.reachable_blocks();
        assert_eq!(keep, vec![true, true, false, true]);
        assert_eq!(f.remove_blocks(&keep), 1);

        let join = f.block(BlockId::new(2)).unwrap();
        assert_eq!(join.id, BlockId::new(2));
        assert_eq!(
            join.instructions[0],
            IrOp::Phi {
                dest: ValueId::new(1),
                incoming: vec![(BlockId::new(1), Operand::Imm(1))],
            }
        );
        assert_eq!(
            f.block(BlockId::new(1)).unwrap().successors(),
            vec![BlockId::new(2)]
        );
    }

    #[test]
    fn test_replace_and_remove_instructions() {
        let mut f = diamond();
        let phi = ValueId::new(1);
        assert_eq!(f.use_count(phi), 1);
        assert_eq!(f.replace_uses(phi, Operand::Imm(9)), 1);
        assert_eq!(f.use_count(phi), 0);

        let victims = HashSet::from([(BlockId::new(3), 0)]);
        assert_eq!(f.remove_instructions(&victims), 1);
        assert_eq!(
            f.block(BlockId::new(3)).unwrap().instructions,
            vec![IrOp::Return {
                value: Operand::Imm(9)
            }]
        );
    }
}
