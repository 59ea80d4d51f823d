//! The bufferize pass: tensor values become buffer values.
//!
//! Classifies every operation under one `core.module` as legal or illegal
//! in the buffer world, then drives the conversion framework until either
//! all illegal operations are rewritten (full mode) or a best-effort
//! mixture remains (partial mode). The pass decides *which* operations are
//! legal and *how* to rewrite the illegal ones; where buffers physically
//! live is a later pass's concern.

use std::rc::Rc;

use silt_ir::context::IrContext;
use silt_ir::dialect::{arith, bmath, buffer, core, func, math, scf, shape, tensor};
use silt_ir::ops::DialectOp;
use silt_ir::refs::{OpRef, RegionRef};
use silt_ir::rewrite::{
    ConversionError, ConversionReport, ConversionTarget, RewritePatternSet, TypeConverter,
    apply_full_conversion, apply_partial_conversion,
};

use crate::registry::{DialectRegistry, PatternRegistry};
use crate::type_converter::bufferize_type_converter;

pub mod patterns;


/// Failure of a strict bufferization run.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum BufferizeError {
    /// The conversion driver could not fully legalize the module.
    #[display("bufferization failed: {_0}")]
    Conversion(ConversionError),
}

/// Converts a module from tensor form to buffer form.
///
/// The single configuration knob is `allow_partial`: partial mode tolerates
/// residual tensor-typed operations (including the `tensor.from_buffer` /
/// `buffer.from_tensor` adapters), full mode requires every adapter to
/// cancel out and fails otherwise. Failure does not roll the module back.
pub struct BufferizePass {
    allow_partial: bool,
}

impl BufferizePass {
    pub fn new(allow_partial: bool) -> Self {
        Self { allow_partial }
    }

    /// Declare the dialects this pass may introduce.
    ///
    /// The pipeline driver consults the registry before scheduling the pass.
    pub fn register_dependent_dialects(registry: &mut DialectRegistry) {
        registry.insert(buffer::DIALECT_NAME());
        registry.insert(bmath::DIALECT_NAME());
        registry.insert(core::DIALECT_NAME());
    }

    /// The standard pattern sets for bufferization, in application order.
    ///
    /// The two custom patterns (unranked store elision and return-type
    /// alignment) are not part of the registry; `run` appends them last so
    /// registry-supplied patterns always get the first try on their kinds.
    pub fn default_pattern_registry() -> PatternRegistry {
        let mut registry = PatternRegistry::new();
        registry.register("math-to-bmath", patterns::populate_math_to_bmath_patterns);
        registry.register("func-boundary", patterns::populate_func_boundary_patterns);
        registry.register("std-bufferize", patterns::populate_std_bufferize_patterns);
        registry.register(
            "materialization-elim",
            patterns::populate_materialization_elim_patterns,
        );
        registry.register("scf-structural", patterns::populate_scf_structural_patterns);
        registry.register(
            "shape-structural",
            patterns::populate_shape_structural_patterns,
        );
        registry
    }

    /// Run bufferization over one module.
    #[tracing::instrument(skip_all, fields(allow_partial = self.allow_partial))]
    pub fn run(
        &self,
        ctx: &mut IrContext,
        module: core::Module,
        registry: &PatternRegistry,
    ) -> Result<ConversionReport, BufferizeError> {
        let converter = Rc::new(bufferize_type_converter());
        let mut target = self.build_target(&converter);

        let mut pattern_set = RewritePatternSet::new();
        registry.populate(&converter, &mut target, &mut pattern_set);
        pattern_set.add(
            tensor::DIALECT_NAME(),
            "store",
            patterns::UnrankedStoreElision,
        );
        pattern_set.add(func::DIALECT_NAME(), "return", patterns::ReturnTypeAlignment);

        if self.allow_partial {
            let report = apply_partial_conversion(ctx, module, &target, &converter, &pattern_set);
            tracing::debug!(
                rewrites = report.rewrites,
                fixpoint = report.reached_fixpoint,
                "partial bufferization done"
            );
            Ok(report)
        } else {
            let report = apply_full_conversion(ctx, module, &target, &converter, &pattern_set)?;
            tracing::debug!(rewrites = report.rewrites, "full bufferization done");
            Ok(report)
        }
    }

    fn build_target(&self, converter: &Rc<TypeConverter>) -> ConversionTarget {
        let mut target = ConversionTarget::new();

        target.add_legal_dialect(scf::DIALECT_NAME());
        target.add_legal_dialect(buffer::DIALECT_NAME());
        target.add_legal_dialect(bmath::DIALECT_NAME());
        target.add_legal_dialect(shape::DIALECT_NAME());
        target.add_legal_op(core::DIALECT_NAME(), core::MODULE());

        target.add_illegal_dialect(math::DIALECT_NAME());
        target.add_illegal_op(tensor::DIALECT_NAME(), "from_elements");
        target.add_illegal_op(tensor::DIALECT_NAME(), "extract");
        target.add_illegal_op(tensor::DIALECT_NAME(), "cast");

        // Strict mode forces every adapter pair to cancel out.
        if !self.allow_partial {
            target.add_illegal_op(tensor::DIALECT_NAME(), "from_buffer");
            target.add_illegal_op(buffer::DIALECT_NAME(), "from_tensor");
        }

        // Constants and selections are fine once their results stop
        // carrying tensors.
        let no_tensor_results = |ctx: &IrContext, op: OpRef| {
            !tensor::any_tensor(ctx, ctx.op_result_types(op).iter())
        };
        target.add_dynamically_legal_op(arith::DIALECT_NAME(), "const", no_tensor_results);
        target.add_dynamically_legal_op(arith::DIALECT_NAME(), "select", no_tensor_results);

        // Ranked whole-tensor stores survive on converted operands; only
        // the unranked case needs the elision pattern.
        target.add_dynamically_legal_op(tensor::DIALECT_NAME(), "store", |ctx, op| {
            let stored = ctx.op_operands(op)[0];
            !tensor::is_unranked(ctx, ctx.value_ty(stored))
        });

        // A function is accepted only once its whole body is: this is what
        // forces the driver to rewrite the body before the header counts
        // as converted.
        let tc = Rc::clone(converter);
        target.add_dynamically_legal_op(func::DIALECT_NAME(), "func", move |ctx, op| {
            let Ok(f) = func::Func::from_op(ctx, op) else {
                return false;
            };
            let fn_ty = f.ty(ctx);
            let inputs = func::fn_inputs(ctx, fn_ty);
            let results = func::fn_results(ctx, fn_ty);
            tc.all_legal(ctx, inputs.iter())
                && tc.all_legal(ctx, results.iter())
                && region_types_legal(ctx, &tc, f.body(ctx))
        });

        let tc = Rc::clone(converter);
        target.add_dynamically_legal_op(func::DIALECT_NAME(), "call", move |ctx, op| {
            op_types_legal(ctx, &tc, op)
        });
        let tc = Rc::clone(converter);
        target.add_dynamically_legal_op(func::DIALECT_NAME(), "return", move |ctx, op| {
            op_types_legal(ctx, &tc, op)
        });

        target
    }
}

/// Whether every operand and result type of an operation is legal.
pub(crate) fn op_types_legal(ctx: &IrContext, converter: &TypeConverter, op: OpRef) -> bool {
    operand_types_legal(ctx, converter, op)
        && converter.all_legal(ctx, ctx.op_result_types(op).iter())
}

/// Whether every operand type of an operation is legal.
pub(crate) fn operand_types_legal(ctx: &IrContext, converter: &TypeConverter, op: OpRef) -> bool {
    ctx.op_operands(op)
        .iter()
        .all(|&v| converter.is_legal(ctx, ctx.value_ty(v)))
}

/// Whether every block-argument type and terminator-operand type reachable
/// under a region is legal.
pub(crate) fn region_types_legal(
    ctx: &IrContext,
    converter: &TypeConverter,
    region: RegionRef,
) -> bool {
    for &block in &ctx.region(region).blocks {
        let args_ok = ctx
            .block(block)
            .args
            .iter()
            .all(|arg| converter.is_legal(ctx, arg.ty));
        if !args_ok {
            return false;
        }
        for &op in &ctx.block(block).ops {
            for &nested in &ctx.op(op).regions {
                if !region_types_legal(ctx, converter, nested) {
                    return false;
                }
            }
        }
        if let Some(&terminator) = ctx.block(block).ops.last()
            && !operand_types_legal(ctx, converter, terminator)
        {
            return false;
        }
    }
    true
}
