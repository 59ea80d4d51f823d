//! Func dialect: function definitions, calls, and returns.
//!
//! The `func.fn` type packs input types followed by result types into its
//! params, with an `inputs` count attribute, so functions may declare zero
//! or many results and signatures can decompose during conversion.

use smallvec::SmallVec;

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::{DialectOp, declare_op};
use crate::refs::{OpRef, RegionRef, TypeRef, ValueRef};
use crate::symbols;
use crate::types::{Attribute, Location, TypeDataBuilder};

symbols! {
    DIALECT_NAME => "func",
    FN => "fn",
    ATTR_SYM_NAME => "sym_name",
    ATTR_TYPE => "type",
    ATTR_CALLEE => "callee",
    ATTR_INPUTS => "inputs",
}

// ============================================================================
// Function type
// ============================================================================

/// Intern a `func.fn` type from input and result types.
pub fn fn_type(ctx: &mut IrContext, inputs: &[TypeRef], results: &[TypeRef]) -> TypeRef {
    ctx.types.intern(
        TypeDataBuilder::new(DIALECT_NAME(), FN())
            .params(inputs.iter().copied())
            .params(results.iter().copied())
            .attr(ATTR_INPUTS(), Attribute::IntBits(inputs.len() as u64))
            .build(),
    )
}

pub fn is_fn_type(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.is_dialect(ty, DIALECT_NAME(), FN())
}

fn input_count(ctx: &IrContext, ty: TypeRef) -> usize {
    match ctx.types.get(ty).attrs.get(&ATTR_INPUTS()) {
        Some(Attribute::IntBits(n)) => *n as usize,
        _ => 0,
    }
}

/// The input types of a `func.fn` type.
pub fn fn_inputs(ctx: &IrContext, ty: TypeRef) -> SmallVec<[TypeRef; 4]> {
    let n = input_count(ctx, ty);
    ctx.types.get(ty).params[..n].into()
}

/// The result types of a `func.fn` type.
pub fn fn_results(ctx: &IrContext, ty: TypeRef) -> SmallVec<[TypeRef; 4]> {
    let n = input_count(ctx, ty);
    ctx.types.get(ty).params[n..].into()
}

// ============================================================================
// Operations
// ============================================================================

declare_op! {
    /// Function definition: `sym_name` and `type` attrs, one body region.
    Func => "func", "func"
}

pub fn func(
    ctx: &mut IrContext,
    location: Location,
    sym_name: crate::Symbol,
    ty: TypeRef,
    body: RegionRef,
) -> Func {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Func::OP_NAME.into())
        .attr(ATTR_SYM_NAME(), Attribute::Symbol(sym_name))
        .attr(ATTR_TYPE(), Attribute::Type(ty))
        .region(body)
        .build(ctx);
    Func(ctx.create_op(data))
}

impl Func {
    pub fn sym_name(&self, ctx: &IrContext) -> crate::Symbol {
        match ctx.op(self.op_ref()).attributes.get(&ATTR_SYM_NAME()) {
            Some(Attribute::Symbol(s)) => *s,
            _ => unreachable!("func.func without sym_name"),
        }
    }

    pub fn ty(&self, ctx: &IrContext) -> TypeRef {
        match ctx.op(self.op_ref()).attributes.get(&ATTR_TYPE()) {
            Some(Attribute::Type(ty)) => *ty,
            _ => unreachable!("func.func without type"),
        }
    }

    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.op_ref()).regions[0]
    }
}

declare_op! {
    /// Direct call by callee symbol; variadic args, variadic results.
    Call => "func", "call"
}

pub fn call(
    ctx: &mut IrContext,
    location: Location,
    callee: crate::Symbol,
    args: impl IntoIterator<Item = ValueRef>,
    result_tys: impl IntoIterator<Item = TypeRef>,
) -> Call {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Call::OP_NAME.into())
        .attr(ATTR_CALLEE(), Attribute::Symbol(callee))
        .operands(args)
        .results(result_tys)
        .build(ctx);
    Call(ctx.create_op(data))
}

impl Call {
    pub fn callee(&self, ctx: &IrContext) -> crate::Symbol {
        match ctx.op(self.op_ref()).attributes.get(&ATTR_CALLEE()) {
            Some(Attribute::Symbol(s)) => *s,
            _ => unreachable!("func.call without callee"),
        }
    }

    pub fn args<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.op_ref())
    }

    pub fn results<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_results(self.op_ref())
    }
}

declare_op! {
    /// Function terminator; operand types must match the enclosing
    /// function's result types.
    Return => "func", "return"
}

pub fn r#return(
    ctx: &mut IrContext,
    location: Location,
    values: impl IntoIterator<Item = ValueRef>,
) -> Return {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Return::OP_NAME.into())
        .operands(values)
        .build(ctx);
    Return(ctx.create_op(data))
}

impl Return {
    pub fn values<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.op_ref())
    }
}

/// Find the nearest enclosing `func.func` of an operation, if any.
pub fn enclosing_func(ctx: &IrContext, op: OpRef) -> Option<Func> {
    let mut current = op;
    loop {
        let block = ctx.op(current).parent_block?;
        let region = ctx.block(block).parent_region?;
        let parent = ctx.region(region).parent_op?;
        if let Ok(f) = Func::from_op(ctx, parent) {
            return Some(f);
        }
        current = parent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BlockData, RegionData};
    use crate::dialect::core;
    use crate::location::Span;
    use smallvec::smallvec;

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.silt".to_owned());
        let loc = Location::new(path, Span::new(0, 0));
        (ctx, loc)
    }

    #[test]
    fn fn_type_round_trip() {
        let (mut ctx, _loc) = test_ctx();
        let f32_ty = core::f32_type(&mut ctx);
        let i32_ty = core::i32_type(&mut ctx);

        let ty = fn_type(&mut ctx, &[f32_ty, i32_ty], &[f32_ty]);
        assert!(is_fn_type(&ctx, ty));
        assert_eq!(fn_inputs(&ctx, ty).as_slice(), &[f32_ty, i32_ty]);
        assert_eq!(fn_results(&ctx, ty).as_slice(), &[f32_ty]);

        let no_result = fn_type(&mut ctx, &[f32_ty], &[]);
        assert!(fn_results(&ctx, no_result).is_empty());
    }

    #[test]
    fn func_and_return_round_trip() {
        let (mut ctx, loc) = test_ctx();
        let f32_ty = core::f32_type(&mut ctx);
        let fn_ty = fn_type(&mut ctx, &[f32_ty], &[f32_ty]);

        let entry = ctx.create_block(BlockData::with_args(loc, [f32_ty]));
        let arg = ctx.block_arg(entry, 0);
        let ret = r#return(&mut ctx, loc, [arg]);
        ctx.push_op(entry, ret.op_ref());
        let body = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![entry],
            parent_op: None,
        });

        let f = func(&mut ctx, loc, crate::Symbol::new("id"), fn_ty, body);
        assert_eq!(f.sym_name(&ctx), crate::Symbol::new("id"));
        assert_eq!(f.ty(&ctx), fn_ty);
        assert_eq!(f.body(&ctx), body);
        assert_eq!(ret.values(&ctx), &[arg]);

        // enclosing_func resolves through the region chain
        let found = enclosing_func(&ctx, ret.op_ref()).expect("return is inside func");
        assert_eq!(found.op_ref(), f.op_ref());
    }

    #[test]
    fn call_round_trip() {
        let (mut ctx, loc) = test_ctx();
        let f32_ty = core::f32_type(&mut ctx);

        let src = OperationDataBuilder::new(loc, crate::Symbol::new("test"), crate::Symbol::new("src"))
            .result(f32_ty)
            .build(&mut ctx);
        let src_op = ctx.create_op(src);
        let v = ctx.op_result(src_op, 0);

        let c = call(&mut ctx, loc, crate::Symbol::new("callee"), [v], [f32_ty]);
        assert_eq!(c.callee(&ctx), crate::Symbol::new("callee"));
        assert_eq!(c.args(&ctx), &[v]);
        assert_eq!(c.results(&ctx).len(), 1);
    }
}
