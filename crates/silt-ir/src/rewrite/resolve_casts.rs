//! Resolution of pending `core.unrealized_conversion_cast` operations.
//!
//! Patterns leave these casts behind wherever a value crosses a type seam.
//! Each driver iteration sweeps them: identity casts fold away, and the
//! type converter's materializer turns the rest into real adapter
//! operations. A cast that cannot be resolved yet is left in place — its
//! operand may still be rewritten by a later iteration.

use std::ops::ControlFlow;

use crate::context::IrContext;
use crate::dialect::core;
use crate::ops::DialectOp;
use crate::refs::{OpRef, RegionRef};
use crate::rewrite::type_converter::TypeConverter;
use crate::walk;

/// Resolve casts under `region`. Returns the number resolved.
pub(crate) fn resolve_casts(
    ctx: &mut IrContext,
    converter: &TypeConverter,
    region: RegionRef,
) -> usize {
    let casts = collect_casts(ctx, region);
    let mut resolved = 0;

    for cast in casts {
        // Skip casts detached by an earlier resolution in this sweep
        let Some(block) = ctx.op(cast).parent_block else {
            continue;
        };

        let operands = ctx.op_operands(cast);
        if operands.len() != 1 {
            // Multi-input seams (argument decomposition) are folded by
            // patterns, not by the materializer.
            continue;
        }
        let operand = operands[0];
        let from_ty = ctx.value_ty(operand);
        let to_ty = ctx.op_result_types(cast)[0];
        let result = ctx.op_result(cast, 0);

        if from_ty == to_ty {
            ctx.replace_all_uses(result, operand);
            ctx.detach_op(cast);
            ctx.remove_op(cast);
            resolved += 1;
            continue;
        }

        let location = ctx.op(cast).location;
        if let Some(mat) = converter.materialize(ctx, location, operand, from_ty, to_ty) {
            for op in &mat.ops {
                ctx.insert_op_before(block, cast, *op);
            }
            ctx.replace_all_uses(result, mat.value);
            ctx.detach_op(cast);
            ctx.remove_op(cast);
            resolved += 1;
        } else {
            tracing::trace!(%cast, "cast not yet resolvable");
        }
    }

    resolved
}

/// Count casts still pending under `region`.
pub(crate) fn count_pending_casts(ctx: &IrContext, region: RegionRef) -> usize {
    collect_casts(ctx, region).len()
}

fn collect_casts(ctx: &IrContext, region: RegionRef) -> Vec<OpRef> {
    let mut casts = Vec::new();
    let _ = walk::walk_region::<()>(ctx, region, &mut |op| {
        if core::UnrealizedConversionCast::matches(ctx, op) {
            casts.push(op);
        }
        ControlFlow::Continue(walk::WalkAction::Advance)
    });
    casts
}
