//! Arith dialect: constants and value selection.

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::{DialectOp, declare_op};
use crate::refs::{TypeRef, ValueRef};
use crate::symbols;
use crate::types::{Attribute, Location};

symbols! {
    DIALECT_NAME => "arith",
    ATTR_VALUE => "value",
}

declare_op! {
    /// Constant-producing operation; the payload lives in the `value` attr.
    Const => "arith", "const"
}

pub fn r#const(ctx: &mut IrContext, location: Location, ty: TypeRef, value: Attribute) -> Const {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Const::OP_NAME.into())
        .attr(ATTR_VALUE(), value)
        .result(ty)
        .build(ctx);
    Const(ctx.create_op(data))
}

impl Const {
    pub fn value<'a>(&self, ctx: &'a IrContext) -> &'a Attribute {
        ctx.op(self.op_ref())
            .attributes
            .get(&ATTR_VALUE())
            .expect("arith.const without value")
    }
}

declare_op! {
    /// Ternary selection between two values of the result type.
    Select => "arith", "select"
}

pub fn select(
    ctx: &mut IrContext,
    location: Location,
    cond: ValueRef,
    on_true: ValueRef,
    on_false: ValueRef,
    ty: TypeRef,
) -> Select {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Select::OP_NAME.into())
        .operand(cond)
        .operand(on_true)
        .operand(on_false)
        .result(ty)
        .build(ctx);
    Select(ctx.create_op(data))
}

impl Select {
    pub fn cond(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[0]
    }

    pub fn on_true(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[1]
    }

    pub fn on_false(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[2]
    }
}
