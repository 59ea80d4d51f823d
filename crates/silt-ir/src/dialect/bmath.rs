//! Bmath dialect: buffer-semantics elementwise compute.
//!
//! Each op reads its input buffers and writes into an explicit output
//! buffer operand; there are no results.

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::{DialectOp, declare_op};
use crate::refs::ValueRef;
use crate::symbols;
use crate::types::Location;

symbols! {
    DIALECT_NAME => "bmath",
    ADD => "add",
    MUL => "mul",
}

fn binary(
    ctx: &mut IrContext,
    location: Location,
    name: crate::Symbol,
    lhs: ValueRef,
    rhs: ValueRef,
    out: ValueRef,
) -> crate::refs::OpRef {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), name)
        .operand(lhs)
        .operand(rhs)
        .operand(out)
        .build(ctx);
    ctx.create_op(data)
}

declare_op! {
    /// Elementwise addition into `out`.
    Add => "bmath", "add"
}

pub fn add(ctx: &mut IrContext, location: Location, lhs: ValueRef, rhs: ValueRef, out: ValueRef) -> Add {
    Add(binary(ctx, location, ADD(), lhs, rhs, out))
}

declare_op! {
    /// Elementwise multiplication into `out`.
    Mul => "bmath", "mul"
}

pub fn mul(ctx: &mut IrContext, location: Location, lhs: ValueRef, rhs: ValueRef, out: ValueRef) -> Mul {
    Mul(binary(ctx, location, MUL(), lhs, rhs, out))
}

impl Add {
    pub fn out(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[2]
    }
}

impl Mul {
    pub fn out(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[2]
    }
}
