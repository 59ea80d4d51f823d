//! Recursive operation traversal utilities.
//!
//! Provides `walk_*` functions for visiting nested operations through
//! `IrContext` + refs, with early exit via `ControlFlow`.

use std::ops::ControlFlow;

use crate::context::IrContext;
use crate::refs::{BlockRef, OpRef, RegionRef};

/// Controls whether to descend into children during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Continue walking and descend into nested regions.
    Advance,
    /// Skip the nested regions of the current operation.
    Skip,
}

/// Walk all operations in a region recursively.
pub fn walk_region<B>(
    ctx: &IrContext,
    region: RegionRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &block in &ctx.region(region).blocks {
        walk_block(ctx, block, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk all operations in a block recursively.
pub fn walk_block<B>(
    ctx: &IrContext,
    block: BlockRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &op in &ctx.block(block).ops {
        walk_op(ctx, op, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk an operation and its nested regions recursively.
pub fn walk_op<B>(
    ctx: &IrContext,
    op: OpRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match f(op) {
        ControlFlow::Break(b) => return ControlFlow::Break(b),
        ControlFlow::Continue(WalkAction::Skip) => return ControlFlow::Continue(()),
        ControlFlow::Continue(WalkAction::Advance) => {}
    }
    for &region in &ctx.op(op).regions {
        walk_region(ctx, region, f)?;
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BlockData, IrContext, OperationDataBuilder, RegionData};
    use crate::ir::Symbol;
    use crate::location::Span;
    use crate::types::{Location, TypeDataBuilder};
    use smallvec::smallvec;

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.silt".to_owned());
        let loc = Location::new(path, Span::new(0, 0));
        (ctx, loc)
    }

    #[test]
    fn walk_region_finds_nested_ops() {
        let (mut ctx, loc) = test_ctx();
        let f32_ty = ctx
            .types
            .intern(TypeDataBuilder::new(Symbol::new("core"), Symbol::new("f32")).build());

        // Inner op inside a nested region
        let inner_data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("const"))
            .result(f32_ty)
            .build(&mut ctx);
        let inner_op = ctx.create_op(inner_data);
        let inner_block = ctx.create_block(BlockData::with_args(loc, []));
        ctx.push_op(inner_block, inner_op);
        let inner_region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![inner_block],
            parent_op: None,
        });

        let outer_data = OperationDataBuilder::new(loc, Symbol::new("func"), Symbol::new("func"))
            .region(inner_region)
            .build(&mut ctx);
        let outer_op = ctx.create_op(outer_data);
        let outer_block = ctx.create_block(BlockData::with_args(loc, []));
        ctx.push_op(outer_block, outer_op);
        let outer_region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![outer_block],
            parent_op: None,
        });

        let mut count = 0;
        let _ = walk_region::<()>(&ctx, outer_region, &mut |_op| {
            count += 1;
            ControlFlow::Continue(WalkAction::Advance)
        });
        assert_eq!(count, 2);

        // Skipping the func op should not visit the inner const
        let mut found_const = false;
        let _ = walk_region::<()>(&ctx, outer_region, &mut |op| {
            let data = ctx.op(op);
            if data.dialect == Symbol::new("func") {
                ControlFlow::<(), _>::Continue(WalkAction::Skip)
            } else {
                found_const = true;
                ControlFlow::Continue(WalkAction::Advance)
            }
        });
        assert!(!found_const);
    }

    #[test]
    fn walk_with_early_exit() {
        let (mut ctx, loc) = test_ctx();
        let f32_ty = ctx
            .types
            .intern(TypeDataBuilder::new(Symbol::new("core"), Symbol::new("f32")).build());

        let block = ctx.create_block(BlockData::with_args(loc, []));
        for _ in 0..3 {
            let data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("const"))
                .result(f32_ty)
                .build(&mut ctx);
            let op = ctx.create_op(data);
            ctx.push_op(block, op);
        }
        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });

        let mut visited = 0;
        let result = walk_region::<()>(&ctx, region, &mut |_op| {
            visited += 1;
            ControlFlow::Break(())
        });

        assert!(result.is_break());
        assert_eq!(visited, 1);
    }
}
