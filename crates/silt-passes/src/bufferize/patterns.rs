//! Conversion patterns for bufferization.
//!
//! The population functions each contribute the patterns (and, for the
//! structural sets, the dynamic legality rules) for one concern; the two
//! custom patterns at the bottom are appended directly by the pass, after
//! everything the registry supplies.

use std::rc::Rc;

use silt_ir::context::{IrContext, OperationDataBuilder};
use silt_ir::dialect::{arith, bmath, buffer, func, math, scf, shape, tensor};
use silt_ir::ops::DialectOp;
use silt_ir::refs::{OpRef, TypeRef, ValueDef};
use silt_ir::rewrite::{
    ConversionPattern, ConversionTarget, PatternRewriter, RewritePatternSet, TypeConverter,
    populate_func_type_conversion_patterns,
};

use super::operand_types_legal;

// ============================================================================
// Population functions
// ============================================================================

/// Tensor-semantics compute becomes out-parameter compute over buffers.
pub fn populate_math_to_bmath_patterns(
    _converter: &Rc<TypeConverter>,
    _target: &mut ConversionTarget,
    patterns: &mut RewritePatternSet,
) {
    patterns.add(math::DIALECT_NAME(), math::ADD(), MathToBmath);
    patterns.add(math::DIALECT_NAME(), math::MUL(), MathToBmath);
}

/// Function signature and call-site conversion, from the framework.
pub fn populate_func_boundary_patterns(
    _converter: &Rc<TypeConverter>,
    _target: &mut ConversionTarget,
    patterns: &mut RewritePatternSet,
) {
    populate_func_type_conversion_patterns(patterns);
}

/// Standard-dialect bufferization: constants, selection, and the tensor
/// construction/inspection operations.
pub fn populate_std_bufferize_patterns(
    _converter: &Rc<TypeConverter>,
    _target: &mut ConversionTarget,
    patterns: &mut RewritePatternSet,
) {
    patterns.add(arith::DIALECT_NAME(), "const", ConstBufferize);
    patterns.add(arith::DIALECT_NAME(), "select", SelectBufferize);
    patterns.add(tensor::DIALECT_NAME(), "from_elements", FromElementsBufferize);
    patterns.add(tensor::DIALECT_NAME(), "extract", ExtractBufferize);
    patterns.add(tensor::DIALECT_NAME(), "cast", CastBufferize);
}

/// Folding of the `tensor.from_buffer` / `buffer.from_tensor` adapters.
pub fn populate_materialization_elim_patterns(
    _converter: &Rc<TypeConverter>,
    _target: &mut ConversionTarget,
    patterns: &mut RewritePatternSet,
) {
    patterns.add(tensor::DIALECT_NAME(), "from_buffer", AdapterFold);
    patterns.add(buffer::DIALECT_NAME(), "from_tensor", AdapterFold);
}

/// Structural conversion for `scf`: result/operand types follow the
/// converter, region structure is untouched.
pub fn populate_scf_structural_patterns(
    converter: &Rc<TypeConverter>,
    target: &mut ConversionTarget,
    patterns: &mut RewritePatternSet,
) {
    let tc = Rc::clone(converter);
    target.add_dynamically_legal_op(scf::DIALECT_NAME(), "if", move |ctx, op| {
        tc.all_legal(ctx, ctx.op_result_types(op).iter())
    });
    let tc = Rc::clone(converter);
    target.add_dynamically_legal_op(scf::DIALECT_NAME(), "yield", move |ctx, op| {
        operand_types_legal(ctx, &tc, op)
    });
    patterns.add(scf::DIALECT_NAME(), "if", ScfIfStructural);
    patterns.add(scf::DIALECT_NAME(), "yield", ScfYieldStructural);
}

/// Structural conversion for `shape`: the queries work over either value
/// category, so only their operands need adapting.
pub fn populate_shape_structural_patterns(
    converter: &Rc<TypeConverter>,
    target: &mut ConversionTarget,
    patterns: &mut RewritePatternSet,
) {
    let tc = Rc::clone(converter);
    target.add_dynamically_legal_op(shape::DIALECT_NAME(), "shape_of", move |ctx, op| {
        operand_types_legal(ctx, &tc, op)
    });
    let tc = Rc::clone(converter);
    target.add_dynamically_legal_op(shape::DIALECT_NAME(), "dim", move |ctx, op| {
        operand_types_legal(ctx, &tc, op)
    });
    patterns.add(shape::DIALECT_NAME(), "shape_of", ShapeStructural);
    patterns.add(shape::DIALECT_NAME(), "dim", ShapeStructural);
}

// ============================================================================
// math -> bmath
// ============================================================================

/// Rewrites `math.X(lhs, rhs) -> tensor` into an output-buffer allocation
/// plus `bmath.X(lhs, rhs, out)`; downstream uses take the allocation.
pub struct MathToBmath;

impl ConversionPattern for MathToBmath {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let (location, name) = {
            let data = ctx.op(op);
            (data.location, data.name)
        };
        if name != math::ADD() && name != math::MUL() {
            return false;
        }
        let result_ty = ctx.op_result_types(op)[0];
        let Some(out_ty) = rewriter.type_converter().convert_one(ctx, result_ty) else {
            return false;
        };

        let operands = ctx.op_operands(op).to_vec();
        let mut inputs = Vec::with_capacity(operands.len());
        for operand in operands {
            let want = {
                let ty = ctx.value_ty(operand);
                rewriter.type_converter().convert_or_identity(ctx, ty)
            };
            inputs.push(rewriter.adapted(ctx, location, operand, want));
        }

        let out = buffer::alloc(ctx, location, out_ty);
        rewriter.insert_op(out.op_ref());
        let out_val = out.result(ctx);
        let compute = if name == math::ADD() {
            bmath::add(ctx, location, inputs[0], inputs[1], out_val).op_ref()
        } else {
            bmath::mul(ctx, location, inputs[0], inputs[1], out_val).op_ref()
        };
        rewriter.insert_op(compute);
        rewriter.erase_op(vec![out_val]);
        true
    }

    fn name(&self) -> &'static str {
        "MathToBmath"
    }
}

// ============================================================================
// std bufferize
// ============================================================================

/// Rebuilds `arith.const` with its tensor result type converted.
pub struct ConstBufferize;

impl ConversionPattern for ConstBufferize {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(const_op) = arith::Const::from_op(ctx, op) else {
            return false;
        };
        let result_ty = ctx.op_result_types(op)[0];
        let Some(new_ty) = rewriter.type_converter().convert_one(ctx, result_ty) else {
            return false;
        };
        let location = ctx.op(op).location;
        let value = const_op.value(ctx).clone();
        let new_op = arith::r#const(ctx, location, new_ty, value);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "ConstBufferize"
    }
}

/// Rebuilds `arith.select` over buffer-typed arms.
pub struct SelectBufferize;

impl ConversionPattern for SelectBufferize {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(select) = arith::Select::from_op(ctx, op) else {
            return false;
        };
        let result_ty = ctx.op_result_types(op)[0];
        let Some(new_ty) = rewriter.type_converter().convert_one(ctx, result_ty) else {
            return false;
        };
        let location = ctx.op(op).location;
        let cond = select.cond(ctx);
        let on_true = select.on_true(ctx);
        let on_false = select.on_false(ctx);
        let on_true = rewriter.adapted(ctx, location, on_true, new_ty);
        let on_false = rewriter.adapted(ctx, location, on_false, new_ty);
        let new_op = arith::select(ctx, location, cond, on_true, on_false, new_ty);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "SelectBufferize"
    }
}

/// `tensor.from_elements` becomes an allocation plus one element store per
/// operand.
pub struct FromElementsBufferize;

impl ConversionPattern for FromElementsBufferize {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(from_elements) = tensor::FromElements::from_op(ctx, op) else {
            return false;
        };
        let result_ty = ctx.op_result_types(op)[0];
        let Some(buf_ty) = rewriter.type_converter().convert_one(ctx, result_ty) else {
            return false;
        };
        let location = ctx.op(op).location;
        let elements = from_elements.elements(ctx).to_vec();

        let out = buffer::alloc(ctx, location, buf_ty);
        rewriter.insert_op(out.op_ref());
        let out_val = out.result(ctx);
        for (index, element) in elements.into_iter().enumerate() {
            let store = buffer::store(ctx, location, element, out_val, &[index as u64]);
            rewriter.insert_op(store.op_ref());
        }
        rewriter.erase_op(vec![out_val]);
        true
    }

    fn name(&self) -> &'static str {
        "FromElementsBufferize"
    }
}

/// `tensor.extract` becomes `buffer.load` at the same indices.
pub struct ExtractBufferize;

impl ConversionPattern for ExtractBufferize {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(extract) = tensor::Extract::from_op(ctx, op) else {
            return false;
        };
        let location = ctx.op(op).location;
        let result_ty = ctx.op_result_types(op)[0];
        let indices = extract.indices(ctx);
        let source = extract.source(ctx);
        let want = {
            let ty = ctx.value_ty(source);
            rewriter.type_converter().convert_or_identity(ctx, ty)
        };
        let source = rewriter.adapted(ctx, location, source, want);
        let load = buffer::load(ctx, location, source, &indices, result_ty);
        rewriter.replace_op(load.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "ExtractBufferize"
    }
}

/// `tensor.cast` becomes `buffer.cast` over the converted types.
pub struct CastBufferize;

impl ConversionPattern for CastBufferize {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(cast) = tensor::Cast::from_op(ctx, op) else {
            return false;
        };
        let result_ty = ctx.op_result_types(op)[0];
        let Some(new_ty) = rewriter.type_converter().convert_one(ctx, result_ty) else {
            return false;
        };
        let location = ctx.op(op).location;
        let source = cast.source(ctx);
        let want = {
            let ty = ctx.value_ty(source);
            rewriter.type_converter().convert_or_identity(ctx, ty)
        };
        let source = rewriter.adapted(ctx, location, source, want);
        let new_op = buffer::cast(ctx, location, source, new_ty);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "CastBufferize"
    }
}

// ============================================================================
// Adapter folding
// ============================================================================

/// Folds the bufferize adapters: a dead adapter is erased, an identity
/// adapter yields its operand, and an adapter over the opposite adapter
/// cancels to the innermost value.
pub struct AdapterFold;

impl ConversionPattern for AdapterFold {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let operand = ctx.op_operands(op)[0];
        let result = ctx.op_result(op, 0);
        let result_ty = ctx.op_result_types(op)[0];

        if !ctx.has_uses(result) || ctx.value_ty(operand) == result_ty {
            rewriter.erase_op(vec![operand]);
            return true;
        }

        if let ValueDef::OpResult(inner_op, _) = ctx.value_def(operand) {
            let inner_is_adapter = tensor::FromBuffer::matches(ctx, inner_op)
                || buffer::FromTensor::matches(ctx, inner_op);
            if inner_is_adapter {
                let inner = ctx.op_operands(inner_op)[0];
                if ctx.value_ty(inner) == result_ty {
                    rewriter.erase_op(vec![inner]);
                    return true;
                }
            }
        }
        false
    }

    fn name(&self) -> &'static str {
        "AdapterFold"
    }
}

// ============================================================================
// scf structural
// ============================================================================

/// Rebuilds `scf.if` with converted result types, reusing both regions.
pub struct ScfIfStructural;

impl ConversionPattern for ScfIfStructural {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(if_op) = scf::If::from_op(ctx, op) else {
            return false;
        };
        let mut changed = false;
        let mut new_tys = Vec::new();
        for &ty in ctx.op_result_types(op).to_vec().iter() {
            match rewriter.type_converter().convert_type(ctx, ty) {
                Some(list) if list.len() == 1 => {
                    changed = changed || list[0] != ty;
                    new_tys.push(list[0]);
                }
                // result decomposition has no representation on scf.if
                Some(_) => return false,
                None => new_tys.push(ty),
            }
        }
        if !changed {
            return false;
        }

        let location = ctx.op(op).location;
        let cond = if_op.cond(ctx);
        let then_region = if_op.then_region(ctx);
        let else_region = if_op.else_region(ctx);
        ctx.detach_region(then_region);
        ctx.detach_region(else_region);
        let new_op = scf::r#if(ctx, location, cond, new_tys, then_region, else_region);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "ScfIfStructural"
    }
}

/// Rebuilds `scf.yield` over operands adapted to their converted types.
pub struct ScfYieldStructural;

impl ConversionPattern for ScfYieldStructural {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(yield_op) = scf::Yield::from_op(ctx, op) else {
            return false;
        };
        let values = yield_op.values(ctx).to_vec();
        let needs_adapting = values.iter().any(|&v| {
            let ty = ctx.value_ty(v);
            !rewriter.type_converter().is_legal(ctx, ty)
        });
        if !needs_adapting {
            return false;
        }

        let location = ctx.op(op).location;
        let mut new_values = Vec::with_capacity(values.len());
        for value in values {
            let want = {
                let ty = ctx.value_ty(value);
                rewriter.type_converter().convert_or_identity(ctx, ty)
            };
            new_values.push(rewriter.adapted(ctx, location, value, want));
        }
        let new_op = scf::r#yield(ctx, location, new_values);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "ScfYieldStructural"
    }
}

// ============================================================================
// shape structural
// ============================================================================

/// Rebuilds a shape query (`shape.shape_of`, `shape.dim`) with its operand
/// adapted; result types and attributes carry over unchanged.
pub struct ShapeStructural;

impl ConversionPattern for ShapeStructural {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let operands = ctx.op_operands(op).to_vec();
        let needs_adapting = operands.iter().any(|&v| {
            let ty = ctx.value_ty(v);
            !rewriter.type_converter().is_legal(ctx, ty)
        });
        if !needs_adapting {
            return false;
        }

        let (location, dialect, name, attributes) = {
            let data = ctx.op(op);
            (data.location, data.dialect, data.name, data.attributes.clone())
        };
        let result_tys = ctx.op_result_types(op).to_vec();

        let mut new_operands = Vec::with_capacity(operands.len());
        for operand in operands {
            let want = {
                let ty = ctx.value_ty(operand);
                rewriter.type_converter().convert_or_identity(ctx, ty)
            };
            new_operands.push(rewriter.adapted(ctx, location, operand, want));
        }

        let mut builder = OperationDataBuilder::new(location, dialect, name)
            .operands(new_operands)
            .results(result_tys);
        for (key, value) in attributes {
            builder = builder.attr(key, value);
        }
        let data = builder.build(ctx);
        let new_op = ctx.create_op(data);
        rewriter.replace_op(new_op);
        true
    }

    fn name(&self) -> &'static str {
        "ShapeStructural"
    }
}

// ============================================================================
// Custom patterns
// ============================================================================

/// Erases `tensor.store(unranked_value, dest)` together with the operation
/// defining `dest`, rewiring every remaining use of `dest` to the stored
/// value's converted form.
///
/// The destination is a synthetic placeholder for a not-yet-materialized
/// tensor and is assumed to have no other observable effect; that
/// precondition is not mechanically checked. The principled replacement for
/// this stop-gap is inserting an explicit copy and letting a later
/// copy-elimination pass remove it when safe.
pub struct UnrankedStoreElision;

impl ConversionPattern for UnrankedStoreElision {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(store) = tensor::Store::from_op(ctx, op) else {
            return false;
        };
        let value = store.value(ctx);
        let dest = store.dest(ctx);
        let value_ty = ctx.value_ty(value);
        if !tensor::is_unranked(ctx, value_ty) {
            return false;
        }
        let ValueDef::OpResult(placeholder, _) = ctx.value_def(dest) else {
            return false;
        };
        if ctx.op_results(placeholder).len() != 1 {
            return false;
        }

        let location = ctx.op(op).location;
        let has_other_uses = ctx.uses(dest).iter().any(|u| u.user != op);
        let replacement = if has_other_uses {
            let want = rewriter.type_converter().convert_or_identity(ctx, value_ty);
            rewriter.adapted(ctx, location, value, want)
        } else {
            value
        };
        rewriter.erase_op(vec![]);
        rewriter.erase_also(placeholder, vec![replacement]);
        true
    }

    fn name(&self) -> &'static str {
        "UnrankedStoreElision"
    }
}

/// Rebuilds `func.return` over operands adapted to the enclosing function's
/// converted result types, so the terminator's arity and types line up with
/// the signature; seams without a direct type match go through the
/// materialization machinery or fail the strict conversion.
pub struct ReturnTypeAlignment;

impl ConversionPattern for ReturnTypeAlignment {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(return_op) = func::Return::from_op(ctx, op) else {
            return false;
        };
        let Some(enclosing) = func::enclosing_func(ctx, op) else {
            return false;
        };
        let fn_ty = enclosing.ty(ctx);
        let result_tys = func::fn_results(ctx, fn_ty);
        let mut expected: Vec<TypeRef> = Vec::with_capacity(result_tys.len());
        for &ty in result_tys.iter() {
            expected.push(rewriter.type_converter().convert_or_identity(ctx, ty));
        }

        let values = return_op.values(ctx).to_vec();
        if values.len() != expected.len() {
            return false;
        }
        let needs_adapting = values
            .iter()
            .zip(&expected)
            .any(|(&v, &want)| ctx.value_ty(v) != want);
        if !needs_adapting {
            return false;
        }

        let location = ctx.op(op).location;
        let mut new_values = Vec::with_capacity(values.len());
        for (value, &want) in values.into_iter().zip(&expected) {
            new_values.push(rewriter.adapted(ctx, location, value, want));
        }
        let new_op = func::r#return(ctx, location, new_values);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "ReturnTypeAlignment"
    }
}
