//! Structural verification of IR modules.
//!
//! The verifier runs after lowering, after optimization and again before
//! finalization. A failure always indicates a compiler defect: the code
//! generator or a pass produced malformed IR.
//!
//! # Checks
//!
//! Per function:
//! - at least one block, every block non-empty with its `id` equal to its index
//! - exactly one terminator per block, in last position
//! - phis only at the start of a block, with exactly one entry per predecessor
//! - branch targets in range
//! - every value defined once, every used value defined
//! - definitions dominate their uses (phi uses at the end of the incoming block)
//! - operand types: `ptr` addresses, `i1` conditions, `i32` arithmetic
//! - calls resolve to a function or import with matching arity and result usage
//!
//! Per module: unique function names and a zero-argument entry function.

use std::collections::{HashMap, HashSet};

use crate::{
    ir::{
        function::{dominates, IrFunction},
        module::{IrModule, ENTRY_POINT},
        ops::{Callee, IrOp},
        value::{BlockId, IrType, Operand, ValueId},
    },
    Result,
};

/// Where a value is defined: `None` index means "on entry" (parameters).
#[derive(Debug, Clone, Copy)]
struct Definition {
    block: BlockId,
    index: Option<usize>,
    ty: IrType,
}

/// Verifies a whole module.
///
/// # Errors
///
/// Returns [`crate::Error::IrVerification`] describing the first violation.
pub fn verify_module(module: &IrModule) -> Result<()> {
    let mut names = HashSet::new();
    for function in module.functions() {
        if !names.insert(function.name().as_str()) {
            return Err(verify_error!("duplicate function @{}", function.name()));
        }
    }

    match module.entry() {
        Some(entry) if entry.param_count() == 0 => {}
        Some(_) => return Err(verify_error!("entry @{} takes parameters", ENTRY_POINT)),
        None => return Err(verify_error!("missing entry function @{}", ENTRY_POINT)),
    }

    for function in module.functions() {
        verify_function(function, module)?;
    }
    Ok(())
}

/// Verifies one function in the context of its module.
///
/// # Errors
///
/// Returns [`crate::Error::IrVerification`] describing the first violation.
pub fn verify_function(function: &IrFunction, module: &IrModule) -> Result<()> {
    let name = function.name();
    if function.block_count() == 0 {
        return Err(verify_error!("@{}: function has no blocks", name));
    }

    let defs = collect_definitions(function)?;
    check_block_structure(function)?;

    let preds = function.predecessors();
    let idom = function.dominators();
    let reachable = function.reachable_blocks();

    for block in function.blocks() {
        let block_preds = &preds[block.id.index()];
        for (index, op) in block.instructions.iter().enumerate() {
            let at = format!("@{name}:{}#{index}", block.id);

            if let IrOp::Phi { incoming, .. } = op {
                let sources: Vec<BlockId> = incoming.iter().map(|(pred, _)| *pred).collect();
                let unique: HashSet<BlockId> = sources.iter().copied().collect();
                if unique.len() != sources.len() {
                    return Err(verify_error!("{}: duplicate phi predecessor", at));
                }
                if unique != block_preds.iter().copied().collect::<HashSet<_>>() {
                    return Err(verify_error!(
                        "{}: phi entries {:?} do not match predecessors {:?}",
                        at,
                        sources,
                        block_preds
                    ));
                }
            }

            for used in op.uses() {
                let Some(def) = defs.get(&used) else {
                    return Err(verify_error!("{}: use of undefined value {}", at, used));
                };
                if !reachable[block.id.index()] {
                    continue;
                }
                let dominated = match op {
                    IrOp::Phi { incoming, .. } => incoming
                        .iter()
                        .filter(|(_, operand)| operand.uses(used))
                        .all(|(pred, _)| dominates(&idom, def.block, *pred)),
                    _ if def.block == block.id => def.index.map_or(true, |d| d < index),
                    _ => dominates(&idom, def.block, block.id),
                };
                if !dominated {
                    return Err(verify_error!(
                        "{}: definition of {} does not dominate its use",
                        at,
                        used
                    ));
                }
            }

            check_types(op, &defs, module, &at)?;
        }
    }
    Ok(())
}

fn collect_definitions(function: &IrFunction) -> Result<HashMap<ValueId, Definition>> {
    let mut defs = HashMap::new();
    for &param in function.params() {
        defs.insert(
            param,
            Definition {
                block: BlockId::ENTRY,
                index: None,
                ty: IrType::I32,
            },
        );
    }

    for block in function.blocks() {
        for (index, op) in block.instructions.iter().enumerate() {
            let (Some(dest), Some(ty)) = (op.dest(), op.result_type()) else {
                continue;
            };
            let def = Definition {
                block: block.id,
                index: Some(index),
                ty,
            };
            if defs.insert(dest, def).is_some() {
                return Err(verify_error!(
                    "@{}: value {} defined more than once",
                    function.name(),
                    dest
                ));
            }
        }
    }
    Ok(defs)
}

fn check_block_structure(function: &IrFunction) -> Result<()> {
    let name = function.name();
    let count = function.block_count();

    for (position, block) in function.blocks().iter().enumerate() {
        if block.id.index() != position {
            return Err(verify_error!(
                "@{}: block at index {} is labelled {}",
                name,
                position,
                block.id
            ));
        }
        if !block.is_terminated() {
            return Err(verify_error!("@{}:{}: missing terminator", name, block.id));
        }

        let last = block.len() - 1;
        let mut in_phis = true;
        for (index, op) in block.instructions.iter().enumerate() {
            if op.is_terminator() && index != last {
                return Err(verify_error!(
                    "@{}:{}#{}: terminator in the middle of a block",
                    name,
                    block.id,
                    index
                ));
            }
            if op.is_phi() {
                if !in_phis {
                    return Err(verify_error!(
                        "@{}:{}#{}: phi after a non-phi instruction",
                        name,
                        block.id,
                        index
                    ));
                }
            } else {
                in_phis = false;
            }
            for target in op.successors() {
                if target.index() >= count {
                    return Err(verify_error!(
                        "@{}:{}: branch to missing block {}",
                        name,
                        block.id,
                        target
                    ));
                }
            }
        }
    }
    Ok(())
}

fn operand_type(
    operand: &Operand,
    defs: &HashMap<ValueId, Definition>,
    module: &IrModule,
    at: &str,
) -> Result<Option<IrType>> {
    match operand {
        Operand::Imm(_) => Ok(None),
        Operand::Value(id) => Ok(defs.get(id).map(|d| d.ty)),
        Operand::Global(id) => {
            if module.global(*id).is_none() {
                return Err(verify_error!("{}: reference to missing global {}", at, id));
            }
            Ok(Some(IrType::Ptr))
        }
    }
}

fn expect_type(
    operand: &Operand,
    expected: IrType,
    defs: &HashMap<ValueId, Definition>,
    module: &IrModule,
    at: &str,
) -> Result<()> {
    match operand_type(operand, defs, module, at)? {
        // Immediates are integers of any width.
        None if expected != IrType::Ptr => Ok(()),
        Some(actual) if actual == expected => Ok(()),
        actual => Err(verify_error!(
            "{}: operand {} has type {}, expected {}",
            at,
            operand,
            actual.map_or("imm", Into::into),
            expected
        )),
    }
}

fn check_types(
    op: &IrOp,
    defs: &HashMap<ValueId, Definition>,
    module: &IrModule,
    at: &str,
) -> Result<()> {
    match op {
        IrOp::Alloca { .. } | IrOp::Jump { .. } => Ok(()),
        IrOp::Load { addr, .. } => expect_type(addr, IrType::Ptr, defs, module, at),
        IrOp::Store { addr, value } => {
            expect_type(addr, IrType::Ptr, defs, module, at)?;
            expect_type(value, IrType::I32, defs, module, at)
        }
        IrOp::Binary { left, right, .. } | IrOp::Compare { left, right, .. } => {
            expect_type(left, IrType::I32, defs, module, at)?;
            expect_type(right, IrType::I32, defs, module, at)
        }
        IrOp::ZExt { operand, .. } => expect_type(operand, IrType::I1, defs, module, at),
        IrOp::Phi { incoming, .. } => incoming
            .iter()
            .try_for_each(|(_, value)| expect_type(value, IrType::I32, defs, module, at)),
        IrOp::Branch { condition, .. } => expect_type(condition, IrType::I1, defs, module, at),
        IrOp::Return { value } => expect_type(value, IrType::I32, defs, module, at),
        IrOp::Call { dest, callee, args } => {
            let (arity, returns_value) = match callee {
                Callee::Function(name) => match module.function(name.as_str()) {
                    Some(target) => (target.param_count(), true),
                    None => return Err(verify_error!("{}: call to unknown function @{}", at, name)),
                },
                Callee::Import(import) => (import.arity(), import.returns_value()),
            };
            if args.len() != arity {
                return Err(verify_error!(
                    "{}: {} expects {} arguments, got {}",
                    at,
                    callee,
                    arity,
                    args.len()
                ));
            }
            if dest.is_some() && !returns_value {
                return Err(verify_error!("{}: {} returns void", at, callee));
            }
            args.iter()
                .try_for_each(|arg| expect_type(arg, IrType::I32, defs, module, at))
        }
    }
}
