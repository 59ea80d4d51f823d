//! Shape dialect: shape-carrying queries that work over either value
//! category (tensor or buffer).

use crate::context::{IrContext, OperationDataBuilder};
use crate::dialect::core;
use crate::ops::{DialectOp, declare_op};
use crate::refs::{TypeRef, ValueRef};
use crate::symbols;
use crate::types::{Attribute, Location, TypeDataBuilder};

symbols! {
    DIALECT_NAME => "shape",
    SHAPE => "shape",
    ATTR_INDEX => "index",
}

/// The runtime shape descriptor type.
pub fn shape_type(ctx: &mut IrContext) -> TypeRef {
    ctx.types
        .intern(TypeDataBuilder::new(DIALECT_NAME(), SHAPE()).build())
}

declare_op! {
    /// The runtime shape of a shaped value.
    ShapeOf => "shape", "shape_of"
}

pub fn shape_of(ctx: &mut IrContext, location: Location, value: ValueRef) -> ShapeOf {
    let shape_ty = shape_type(ctx);
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), ShapeOf::OP_NAME.into())
        .operand(value)
        .result(shape_ty)
        .build(ctx);
    ShapeOf(ctx.create_op(data))
}

impl ShapeOf {
    pub fn value(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[0]
    }
}

declare_op! {
    /// One dimension of a shaped value, as an index.
    Dim => "shape", "dim"
}

pub fn dim(ctx: &mut IrContext, location: Location, value: ValueRef, index: u64) -> Dim {
    let index_ty = core::index_type(ctx);
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Dim::OP_NAME.into())
        .operand(value)
        .attr(ATTR_INDEX(), Attribute::IntBits(index))
        .result(index_ty)
        .build(ctx);
    Dim(ctx.create_op(data))
}

impl Dim {
    pub fn value(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[0]
    }

    pub fn index(&self, ctx: &IrContext) -> u64 {
        match ctx.op(self.op_ref()).attributes.get(&ATTR_INDEX()) {
            Some(Attribute::IntBits(i)) => *i,
            _ => 0,
        }
    }
}
