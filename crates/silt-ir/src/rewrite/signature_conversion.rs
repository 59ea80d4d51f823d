//! Function signature conversion patterns.
//!
//! Converts `func.func` headers and every block argument in the body using
//! the driver's type converter, and rebuilds `func.call` result types to
//! match. Argument decomposition (one source type becoming zero or many
//! target types) rebuilds the block argument list and bridges the old value
//! through a pending cast, which later folds or is materialized.

use smallvec::SmallVec;

use crate::context::{BlockArgData, IrContext};
use crate::dialect::{core, func};
use crate::ops::DialectOp;
use crate::refs::{BlockRef, OpRef, TypeRef, ValueRef};
use crate::rewrite::pattern::{ConversionPattern, RewritePatternSet};
use crate::rewrite::rewriter::PatternRewriter;
use crate::rewrite::type_converter::TypeConverter;

/// Register the function-boundary conversion patterns.
pub fn populate_func_type_conversion_patterns(patterns: &mut RewritePatternSet) {
    patterns.add(func::DIALECT_NAME(), "func", FuncSignatureConversion);
    patterns.add(func::DIALECT_NAME(), "call", CallTypeConversion);
}

/// Convert one block's argument types. Returns whether anything changed.
///
/// 1:1 conversions retype the existing argument values in place. If any
/// argument converts to zero or several types, the whole argument list is
/// rebuilt: each decomposed argument's old value is reconstructed from the
/// new arguments through a `core.unrealized_conversion_cast` inserted at
/// the block front, and dropped arguments with remaining uses get an
/// input-less cast that must be resolved (or fails strict conversion).
pub fn convert_block_signature(
    ctx: &mut IrContext,
    block: BlockRef,
    converter: &TypeConverter,
) -> bool {
    let old_types: Vec<TypeRef> = ctx.block(block).args.iter().map(|a| a.ty).collect();
    let conversions: Vec<Option<SmallVec<[TypeRef; 1]>>> = old_types
        .iter()
        .map(|&ty| converter.convert_type(ctx, ty))
        .collect();

    let changed = conversions.iter().zip(&old_types).any(|(conv, &old)| {
        conv.as_ref()
            .is_some_and(|list| list.len() != 1 || list[0] != old)
    });
    if !changed {
        return false;
    }

    let one_to_one = conversions
        .iter()
        .all(|conv| conv.as_ref().is_none_or(|list| list.len() == 1));

    if one_to_one {
        for (index, conv) in conversions.iter().enumerate() {
            if let Some(list) = conv {
                ctx.set_block_arg_type(block, index as u32, list[0]);
            }
        }
        return true;
    }

    // Rebuild the argument list, bridging old values through casts.
    let old_values: Vec<ValueRef> = ctx.block_args(block).to_vec();
    let location = ctx.block(block).location;

    let mut new_args = Vec::new();
    let mut pieces: Vec<std::ops::Range<usize>> = Vec::with_capacity(old_types.len());
    for (conv, &old) in conversions.iter().zip(&old_types) {
        let start = new_args.len();
        match conv {
            Some(list) => new_args.extend(list.iter().map(|&ty| BlockArgData::of(ty))),
            None => new_args.push(BlockArgData::of(old)),
        }
        pieces.push(start..new_args.len());
    }

    let new_values = ctx.reset_block_args(block, new_args);
    let first_op = ctx.block(block).ops.first().copied();

    for ((old_value, piece), &old_ty) in old_values.iter().zip(pieces).zip(&old_types) {
        let replacement = &new_values[piece];
        if replacement.len() == 1 && ctx.value_ty(replacement[0]) == old_ty {
            ctx.replace_all_uses(*old_value, replacement[0]);
            continue;
        }
        if replacement.is_empty() && !ctx.has_uses(*old_value) {
            continue;
        }
        let cast =
            core::unrealized_conversion_cast(ctx, location, replacement.iter().copied(), old_ty);
        match first_op {
            Some(op) => ctx.insert_op_before(block, op, cast.op_ref()),
            None => ctx.push_op(block, cast.op_ref()),
        }
        ctx.replace_all_uses(*old_value, cast.result(ctx));
    }

    true
}

/// Pattern that converts `func.func` signatures.
///
/// Converts the header type and every block argument in the body, then
/// rebuilds the function so the driver observes the change. Declines when
/// neither header nor body needs conversion.
pub struct FuncSignatureConversion;

impl ConversionPattern for FuncSignatureConversion {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(func_op) = func::Func::from_op(ctx, op) else {
            return false;
        };
        let converter = rewriter.type_converter();

        let fn_ty = func_op.ty(ctx);
        let inputs = func::fn_inputs(ctx, fn_ty);
        let results = func::fn_results(ctx, fn_ty);
        let (new_inputs, inputs_changed) = converter.convert_signature(ctx, &inputs);
        let (new_results, results_changed) = converter.convert_signature(ctx, &results);

        let body = func_op.body(ctx);
        let blocks: Vec<BlockRef> = ctx.region(body).blocks.to_vec();
        let mut body_changed = false;
        for block in blocks {
            body_changed |= convert_block_signature(ctx, block, converter);
        }

        if !(inputs_changed || results_changed || body_changed) {
            return false;
        }

        let new_ty = func::fn_type(ctx, &new_inputs, &new_results);
        let location = ctx.op(op).location;
        let sym_name = func_op.sym_name(ctx);
        ctx.detach_region(body);
        let new_op = func::func(ctx, location, sym_name, new_ty, body);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "FuncSignatureConversion"
    }
}

/// Pattern that rebuilds `func.call` with converted operand/result types.
///
/// Call results must convert 1:1; decomposition at call sites is declined.
pub struct CallTypeConversion;

impl ConversionPattern for CallTypeConversion {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(call) = func::Call::from_op(ctx, op) else {
            return false;
        };
        let converter = rewriter.type_converter();
        let location = ctx.op(op).location;

        let mut changed = false;
        let mut new_result_tys = Vec::new();
        for &ty in ctx.op_result_types(op).to_vec().iter() {
            match converter.convert_type(ctx, ty) {
                Some(list) if list.len() == 1 => {
                    changed = changed || list[0] != ty;
                    new_result_tys.push(list[0]);
                }
                Some(_) => return false,
                None => new_result_tys.push(ty),
            }
        }

        let args: Vec<ValueRef> = call.args(ctx).to_vec();
        let mut new_args = Vec::with_capacity(args.len());
        for arg in args {
            let want = {
                let ty = ctx.value_ty(arg);
                rewriter.type_converter().convert_or_identity(ctx, ty)
            };
            let adapted = rewriter.adapted(ctx, location, arg, want);
            changed = changed || adapted != arg;
            new_args.push(adapted);
        }

        if !changed {
            return false;
        }

        let callee = call.callee(ctx);
        let new_op = func::call(ctx, location, callee, new_args, new_result_tys);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "CallTypeConversion"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BlockData, OperationDataBuilder, RegionData};
    use crate::ir::Symbol;
    use crate::location::Span;
    use crate::rewrite::conversion_target::ConversionTarget;
    use crate::rewrite::driver::apply_full_conversion;
    use crate::types::Location;
    use smallvec::smallvec;

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.silt".to_owned());
        let loc = Location::new(path, Span::new(0, 0));
        (ctx, loc)
    }

    fn make_module(ctx: &mut IrContext, loc: Location, ops: Vec<OpRef>) -> core::Module {
        let block = ctx.create_block(BlockData::with_args(loc, []));
        for op in ops {
            ctx.push_op(block, op);
        }
        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });
        core::module(ctx, loc, Symbol::new("test"), region)
    }

    fn i32_to_i1_converter(ctx: &mut IrContext) -> (TypeConverter, TypeRef, TypeRef) {
        let i32_ty = core::i32_type(ctx);
        let i1_ty = core::i1_type(ctx);
        let mut tc = TypeConverter::new();
        tc.add_conversion(
            move |_ctx, ty| ty == i32_ty,
            move |_ctx, _ty| smallvec![i1_ty],
        );
        (tc, i32_ty, i1_ty)
    }

    /// func.func is legal only when its signature and entry args avoid i32.
    fn func_target(i32_ty: TypeRef) -> ConversionTarget {
        let mut target = ConversionTarget::new();
        target.add_dynamically_legal_op("func", "func", move |ctx, op| {
            let f = func::Func::from_op(ctx, op).unwrap();
            let ty = f.ty(ctx);
            let all = func::fn_inputs(ctx, ty)
                .into_iter()
                .chain(func::fn_results(ctx, ty));
            let sig_ok = all.into_iter().all(|t| t != i32_ty);
            let body = f.body(ctx);
            let args_ok = ctx
                .region(body)
                .blocks
                .iter()
                .all(|&b| ctx.block(b).args.iter().all(|a| a.ty != i32_ty));
            sig_ok && args_ok
        });
        target
    }

    #[test]
    fn func_signature_converts_header_and_entry_args() {
        let (mut ctx, loc) = test_ctx();
        let (tc, i32_ty, i1_ty) = i32_to_i1_converter(&mut ctx);

        let fn_ty = func::fn_type(&mut ctx, &[i32_ty], &[i32_ty]);
        let entry = ctx.create_block(BlockData::with_args(loc, [i32_ty]));
        let arg = ctx.block_arg(entry, 0);
        let ret = func::r#return(&mut ctx, loc, [arg]);
        ctx.push_op(entry, ret.op_ref());
        let body = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![entry],
            parent_op: None,
        });
        let f = func::func(&mut ctx, loc, Symbol::new("id"), fn_ty, body);
        let module = make_module(&mut ctx, loc, vec![f.op_ref()]);

        let target = func_target(i32_ty);
        let mut patterns = RewritePatternSet::new();
        populate_func_type_conversion_patterns(&mut patterns);

        let report = apply_full_conversion(&mut ctx, module, &target, &tc, &patterns).unwrap();
        assert!(report.rewrites >= 1);

        let new_f = func::Func::from_op(&ctx, module.ops(&ctx)[0]).unwrap();
        let new_ty = new_f.ty(&ctx);
        assert_eq!(func::fn_inputs(&ctx, new_ty).as_slice(), &[i1_ty]);
        assert_eq!(func::fn_results(&ctx, new_ty).as_slice(), &[i1_ty]);

        // entry arg was retyped in place, so the return still uses it
        let entry = ctx.region(new_f.body(&ctx)).blocks[0];
        assert_eq!(ctx.value_ty(ctx.block_arg(entry, 0)), i1_ty);
        assert_eq!(ctx.value_ty(arg), i1_ty);
    }

    #[test]
    fn decomposed_block_arg_bridges_through_cast() {
        let (mut ctx, loc) = test_ctx();
        let i32_ty = core::i32_type(&mut ctx);
        let i1_ty = core::i1_type(&mut ctx);
        let index_ty = core::index_type(&mut ctx);

        // i32 decomposes into (i1, index)
        let mut tc = TypeConverter::new();
        tc.add_conversion(
            move |_ctx, ty| ty == i32_ty,
            move |_ctx, _ty| smallvec![i1_ty, index_ty],
        );

        let block = ctx.create_block(BlockData::with_args(loc, [i32_ty]));
        let old_arg = ctx.block_arg(block, 0);
        let sink = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("sink"))
            .operand(old_arg)
            .build(&mut ctx);
        let sink_op = ctx.create_op(sink);
        ctx.push_op(block, sink_op);

        let changed = convert_block_signature(&mut ctx, block, &tc);
        assert!(changed);

        // two fresh args of the decomposed types
        let args = ctx.block_args(block).to_vec();
        assert_eq!(args.len(), 2);
        assert_eq!(ctx.value_ty(args[0]), i1_ty);
        assert_eq!(ctx.value_ty(args[1]), index_ty);

        // the sink now reads the old type through a cast over both new args
        let ops = ctx.block(block).ops.to_vec();
        assert_eq!(ops.len(), 2);
        let cast = core::UnrealizedConversionCast::from_op(&ctx, ops[0]).unwrap();
        assert_eq!(cast.inputs(&ctx), args.as_slice());
        assert_eq!(ctx.value_ty(cast.result(&ctx)), i32_ty);
        assert_eq!(ctx.op_operands(sink_op)[0], cast.result(&ctx));
        assert!(!ctx.has_uses(old_arg));
    }

    #[test]
    fn unchanged_signature_declines() {
        let (mut ctx, loc) = test_ctx();
        let (tc, i32_ty, _i1_ty) = i32_to_i1_converter(&mut ctx);
        let f32_ty = core::f32_type(&mut ctx);

        let fn_ty = func::fn_type(&mut ctx, &[f32_ty], &[f32_ty]);
        let entry = ctx.create_block(BlockData::with_args(loc, [f32_ty]));
        let body = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![entry],
            parent_op: None,
        });
        let f = func::func(&mut ctx, loc, Symbol::new("noop"), fn_ty, body);
        let module = make_module(&mut ctx, loc, vec![f.op_ref()]);

        let target = func_target(i32_ty);
        let mut patterns = RewritePatternSet::new();
        populate_func_type_conversion_patterns(&mut patterns);

        let report = apply_full_conversion(&mut ctx, module, &target, &tc, &patterns).unwrap();
        assert_eq!(report.rewrites, 0);
    }

    #[test]
    fn call_results_and_args_convert() {
        let (mut ctx, loc) = test_ctx();
        let (tc, i32_ty, i1_ty) = i32_to_i1_converter(&mut ctx);

        let src = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("src"))
            .result(i1_ty)
            .build(&mut ctx);
        let src_op = ctx.create_op(src);
        let v = ctx.op_result(src_op, 0);

        let call = func::call(&mut ctx, loc, Symbol::new("callee"), [v], [i32_ty]);
        let module = make_module(&mut ctx, loc, vec![src_op, call.op_ref()]);

        let mut target = ConversionTarget::new();
        target.add_dynamically_legal_op("func", "call", move |ctx, op| {
            ctx.op_result_types(op).iter().all(|&t| t != i32_ty)
        });
        let mut patterns = RewritePatternSet::new();
        populate_func_type_conversion_patterns(&mut patterns);

        apply_full_conversion(&mut ctx, module, &target, &tc, &patterns).unwrap();

        let ops = module.ops(&ctx);
        let new_call = func::Call::from_op(&ctx, ops[1]).unwrap();
        assert_eq!(ctx.op_result_types(new_call.op_ref()), &[i1_ty]);
        assert_eq!(new_call.callee(&ctx), Symbol::new("callee"));
        assert_eq!(new_call.args(&ctx), &[v]);
    }
}
