//! Core dialect: the module container, the pending type-adapter cast, and
//! scalar type helpers.

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::{DialectOp, declare_op};
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef, ValueRef};
use crate::symbols;
use crate::types::{Attribute, Location, TypeDataBuilder};

symbols! {
    DIALECT_NAME => "core",
    MODULE => "module",
    UNREALIZED_CONVERSION_CAST => "unrealized_conversion_cast",
    ATTR_SYM_NAME => "sym_name",
}

fn scalar(ctx: &mut IrContext, name: &'static str) -> TypeRef {
    ctx.types
        .intern(TypeDataBuilder::new(DIALECT_NAME(), name.into()).build())
}

pub fn index_type(ctx: &mut IrContext) -> TypeRef {
    scalar(ctx, "index")
}

pub fn i1_type(ctx: &mut IrContext) -> TypeRef {
    scalar(ctx, "i1")
}

pub fn i32_type(ctx: &mut IrContext) -> TypeRef {
    scalar(ctx, "i32")
}

pub fn f32_type(ctx: &mut IrContext) -> TypeRef {
    scalar(ctx, "f32")
}

pub fn f64_type(ctx: &mut IrContext) -> TypeRef {
    scalar(ctx, "f64")
}

declare_op! {
    /// Top-level module container: one body region, no operands or results.
    Module => "core", "module"
}

/// Create a `core.module` operation owning `body`.
pub fn module(
    ctx: &mut IrContext,
    location: Location,
    name: crate::Symbol,
    body: RegionRef,
) -> Module {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), MODULE())
        .attr(ATTR_SYM_NAME(), Attribute::Symbol(name))
        .region(body)
        .build(ctx);
    Module(ctx.create_op(data))
}

impl Module {
    /// The module's symbolic name.
    pub fn name(&self, ctx: &IrContext) -> Option<crate::Symbol> {
        match ctx.op(self.op_ref()).attributes.get(&ATTR_SYM_NAME()) {
            Some(Attribute::Symbol(s)) => Some(*s),
            _ => None,
        }
    }

    /// The module's body region.
    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.op_ref()).regions[0]
    }

    /// The first block of the module body.
    pub fn first_block(&self, ctx: &IrContext) -> Option<BlockRef> {
        ctx.region(self.body(ctx)).blocks.first().copied()
    }

    /// All top-level operations in the module's first block.
    pub fn ops(&self, ctx: &IrContext) -> Vec<OpRef> {
        match self.first_block(ctx) {
            Some(b) => ctx.block(b).ops.to_vec(),
            None => vec![],
        }
    }
}

declare_op! {
    /// Pending type adapter between two representations of the same value.
    ///
    /// Created by the rewriter at legal/illegal type seams and resolved by
    /// the driver through the type converter's materializer.
    UnrealizedConversionCast => "core", "unrealized_conversion_cast"
}

/// Create a `core.unrealized_conversion_cast` from `inputs` to `result_ty`.
pub fn unrealized_conversion_cast(
    ctx: &mut IrContext,
    location: Location,
    inputs: impl IntoIterator<Item = ValueRef>,
    result_ty: TypeRef,
) -> UnrealizedConversionCast {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), UNREALIZED_CONVERSION_CAST())
        .operands(inputs)
        .result(result_ty)
        .build(ctx);
    UnrealizedConversionCast(ctx.create_op(data))
}

impl UnrealizedConversionCast {
    pub fn inputs<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.op_ref())
    }
}
