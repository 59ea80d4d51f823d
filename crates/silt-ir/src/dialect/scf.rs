//! Structured control flow dialect.

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::{DialectOp, declare_op};
use crate::refs::{RegionRef, TypeRef, ValueRef};
use crate::symbols;
use crate::types::Location;

symbols! {
    DIALECT_NAME => "scf",
}

declare_op! {
    /// Two-armed conditional; each region yields the op's results.
    If => "scf", "if"
}

pub fn r#if(
    ctx: &mut IrContext,
    location: Location,
    cond: ValueRef,
    result_tys: impl IntoIterator<Item = TypeRef>,
    then_region: RegionRef,
    else_region: RegionRef,
) -> If {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), If::OP_NAME.into())
        .operand(cond)
        .results(result_tys)
        .region(then_region)
        .region(else_region)
        .build(ctx);
    If(ctx.create_op(data))
}

impl If {
    pub fn cond(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[0]
    }

    pub fn then_region(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.op_ref()).regions[0]
    }

    pub fn else_region(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.op_ref()).regions[1]
    }
}

declare_op! {
    /// Region terminator forwarding values to the enclosing op's results.
    Yield => "scf", "yield"
}

pub fn r#yield(
    ctx: &mut IrContext,
    location: Location,
    values: impl IntoIterator<Item = ValueRef>,
) -> Yield {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Yield::OP_NAME.into())
        .operands(values)
        .build(ctx);
    Yield(ctx.create_op(data))
}

impl Yield {
    pub fn values<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.op_ref())
    }
}
