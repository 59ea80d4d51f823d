//! PatternRewriter: accumulates mutations from a pattern rewrite.
//!
//! Mutations are recorded while the pattern runs and applied as one
//! transaction after it returns, so a half-matched pattern never leaves the
//! graph in an intermediate state. Value replacement goes through
//! `IrContext::replace_all_uses`, which keeps the use-chain consistent.

use crate::context::IrContext;
use crate::dialect::core;
use crate::refs::{OpRef, TypeRef, ValueRef};
use crate::rewrite::type_converter::TypeConverter;
use crate::ops::DialectOp;

/// Accumulated mutations from a pattern rewrite.
pub(crate) struct Mutations {
    /// Operations to insert before the current op's position.
    pub(crate) prefix_ops: Vec<OpRef>,
    /// The replacement operation (if any).
    pub(crate) replacement: Option<OpRef>,
    /// If set, the op is erased and its results mapped to these values.
    pub(crate) erase_values: Option<Vec<ValueRef>>,
    /// Additional operations to erase, with their result replacements.
    pub(crate) extra_erased: Vec<(OpRef, Vec<ValueRef>)>,
}

/// Rewriter interface handed to conversion patterns.
pub struct PatternRewriter<'a> {
    type_converter: &'a TypeConverter,
    prefix_ops: Vec<OpRef>,
    replacement: Option<OpRef>,
    erase_values: Option<Vec<ValueRef>>,
    extra_erased: Vec<(OpRef, Vec<ValueRef>)>,
}

impl<'a> PatternRewriter<'a> {
    pub(crate) fn new(type_converter: &'a TypeConverter) -> Self {
        Self {
            type_converter,
            prefix_ops: Vec::new(),
            replacement: None,
            erase_values: None,
            extra_erased: Vec::new(),
        }
    }

    /// The type converter driving this conversion.
    pub fn type_converter(&self) -> &TypeConverter {
        self.type_converter
    }

    // === Mutations ===

    /// Insert an operation before the current operation.
    ///
    /// The op must already be created via `ctx.create_op()` but not yet
    /// attached to a block. Multiple calls accumulate operations in order.
    pub fn insert_op(&mut self, op: OpRef) {
        self.prefix_ops.push(op);
    }

    /// Replace the current operation with a new one.
    ///
    /// Old results are RAUW'd to the new op's results 1:1 by index, then
    /// the old op is removed from its block and destroyed.
    pub fn replace_op(&mut self, new_op: OpRef) {
        debug_assert!(
            self.replacement.is_none() && self.erase_values.is_none(),
            "replace_op called after replace_op or erase_op"
        );
        self.replacement = Some(new_op);
    }

    /// Erase the current operation, mapping its results to the given values.
    ///
    /// The replacement values must match the original result count.
    pub fn erase_op(&mut self, replacement_values: Vec<ValueRef>) {
        debug_assert!(
            self.replacement.is_none() && self.erase_values.is_none(),
            "erase_op called after replace_op or erase_op"
        );
        self.erase_values = Some(replacement_values);
    }

    /// Erase a second operation in the same transaction, mapping its
    /// results to the given values.
    ///
    /// Applied after the current op's own mutation, so a pattern may delete
    /// an operand-defining op it has just made redundant.
    pub fn erase_also(&mut self, op: OpRef, replacement_values: Vec<ValueRef>) {
        self.extra_erased.push((op, replacement_values));
    }

    /// Return `value` adapted to the `want` type.
    ///
    /// If the value already carries `want` it is returned unchanged;
    /// otherwise a pending `core.unrealized_conversion_cast` is created and
    /// scheduled for insertion, to be resolved by the driver through the
    /// converter's materializer. Only call on a committed match: the cast
    /// op is created eagerly.
    pub fn adapted(
        &mut self,
        ctx: &mut IrContext,
        location: crate::types::Location,
        value: ValueRef,
        want: TypeRef,
    ) -> ValueRef {
        if ctx.value_ty(value) == want {
            return value;
        }
        let cast = core::unrealized_conversion_cast(ctx, location, [value], want);
        self.prefix_ops.push(cast.op_ref());
        cast.result(ctx)
    }

    // === Query ===

    pub(crate) fn has_mutations(&self) -> bool {
        !self.prefix_ops.is_empty()
            || self.replacement.is_some()
            || self.erase_values.is_some()
            || !self.extra_erased.is_empty()
    }

    pub(crate) fn take_mutations(self) -> Mutations {
        Mutations {
            prefix_ops: self.prefix_ops,
            replacement: self.replacement,
            erase_values: self.erase_values,
            extra_erased: self.extra_erased,
        }
    }
}

/// Apply mutations to the IR context.
///
/// Called by the driver after a pattern returns `true`.
pub(crate) fn apply_mutations(ctx: &mut IrContext, original_op: OpRef, mutations: Mutations) {
    let parent_block = ctx.op(original_op).parent_block;

    // 1. Insert prefix ops before the original op
    if let Some(block) = parent_block {
        for prefix_op in &mutations.prefix_ops {
            ctx.insert_op_before(block, original_op, *prefix_op);
        }
    }

    // 2. Handle replacement or erasure of the matched op
    if let Some(new_op) = mutations.replacement {
        let old_results: Vec<ValueRef> = ctx.op_results(original_op).to_vec();
        let new_results: Vec<ValueRef> = ctx.op_results(new_op).to_vec();
        debug_assert_eq!(
            old_results.len(),
            new_results.len(),
            "replace_op: result count mismatch ({} vs {})",
            old_results.len(),
            new_results.len()
        );
        for (old_v, new_v) in old_results.iter().zip(new_results.iter()) {
            ctx.replace_all_uses(*old_v, *new_v);
        }

        // Put the new op where the old one was
        if let Some(block) = parent_block {
            let ops = ctx.block(block).ops.to_vec();
            let pos = ops.iter().position(|&o| o == original_op);
            ctx.remove_op_from_block(block, original_op);
            match pos {
                Some(pos) => {
                    let ops_after = ctx.block(block).ops.to_vec();
                    if pos < ops_after.len() {
                        ctx.insert_op_before(block, ops_after[pos], new_op);
                    } else {
                        ctx.push_op(block, new_op);
                    }
                }
                None => ctx.push_op(block, new_op),
            }
        }

        ctx.remove_op(original_op);
    } else if let Some(erase_values) = mutations.erase_values {
        let old_results: Vec<ValueRef> = ctx.op_results(original_op).to_vec();
        debug_assert_eq!(
            old_results.len(),
            erase_values.len(),
            "erase_op: replacement value count mismatch ({} vs {})",
            old_results.len(),
            erase_values.len()
        );
        for (old_v, new_v) in old_results.iter().zip(erase_values.iter()) {
            ctx.replace_all_uses(*old_v, *new_v);
        }

        if let Some(block) = parent_block {
            ctx.remove_op_from_block(block, original_op);
        }
        ctx.remove_op(original_op);
    }

    // 3. Extra erasures recorded by the pattern
    for (op, values) in mutations.extra_erased {
        let old_results: Vec<ValueRef> = ctx.op_results(op).to_vec();
        debug_assert_eq!(
            old_results.len(),
            values.len(),
            "erase_also: replacement value count mismatch ({} vs {})",
            old_results.len(),
            values.len()
        );
        for (old_v, new_v) in old_results.iter().zip(values.iter()) {
            ctx.replace_all_uses(*old_v, *new_v);
        }
        ctx.detach_op(op);
        ctx.remove_op(op);
    }
}
