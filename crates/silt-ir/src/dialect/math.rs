//! Math dialect: value-semantics elementwise compute over tensors.
//!
//! Every op here takes tensor operands and produces a fresh tensor result;
//! none of them survives bufferization.

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::{DialectOp, declare_op};
use crate::refs::{TypeRef, ValueRef};
use crate::symbols;
use crate::types::Location;

symbols! {
    DIALECT_NAME => "math",
    ADD => "add",
    MUL => "mul",
}

fn binary(
    ctx: &mut IrContext,
    location: Location,
    name: crate::Symbol,
    lhs: ValueRef,
    rhs: ValueRef,
    ty: TypeRef,
) -> crate::refs::OpRef {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), name)
        .operand(lhs)
        .operand(rhs)
        .result(ty)
        .build(ctx);
    ctx.create_op(data)
}

declare_op! {
    /// Elementwise addition.
    Add => "math", "add"
}

pub fn add(ctx: &mut IrContext, location: Location, lhs: ValueRef, rhs: ValueRef, ty: TypeRef) -> Add {
    Add(binary(ctx, location, ADD(), lhs, rhs, ty))
}

declare_op! {
    /// Elementwise multiplication.
    Mul => "math", "mul"
}

pub fn mul(ctx: &mut IrContext, location: Location, lhs: ValueRef, rhs: ValueRef, ty: TypeRef) -> Mul {
    Mul(binary(ctx, location, MUL(), lhs, rhs, ty))
}
