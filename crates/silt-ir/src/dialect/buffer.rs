//! Buffer dialect: concrete, aliasable, mutable memory regions.
//!
//! Buffer types mirror the tensor type encoding (`buffer.ranked` with a
//! static shape attr, `buffer.unranked` with an element param only), so a
//! tensor type converts to its buffer counterpart by re-interning under
//! this dialect.

use crate::context::{IrContext, OperationDataBuilder};
use crate::dialect::tensor;
use crate::ops::{DialectOp, declare_op};
use crate::refs::{TypeRef, ValueRef};
use crate::symbols;
use crate::types::{Attribute, Location, TypeData, TypeDataBuilder};

symbols! {
    DIALECT_NAME => "buffer",
    RANKED => "ranked",
    UNRANKED => "unranked",
    ATTR_INDICES => "indices",
}

// ============================================================================
// Types
// ============================================================================

/// Intern a ranked buffer type with a static shape.
pub fn ranked(ctx: &mut IrContext, shape: &[u64], elem: TypeRef) -> TypeRef {
    let dims = shape.iter().map(|&d| Attribute::IntBits(d)).collect();
    ctx.types.intern(
        TypeDataBuilder::new(DIALECT_NAME(), RANKED())
            .param(elem)
            .attr(tensor::ATTR_SHAPE(), Attribute::List(dims))
            .build(),
    )
}

/// Intern an unranked buffer type.
pub fn unranked(ctx: &mut IrContext, elem: TypeRef) -> TypeRef {
    ctx.types
        .intern(TypeDataBuilder::new(DIALECT_NAME(), UNRANKED()).param(elem).build())
}

/// Whether a type belongs to the buffer category (ranked or unranked).
pub fn is_buffer(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.get(ty).dialect == DIALECT_NAME()
}

pub fn is_ranked(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.is_dialect(ty, DIALECT_NAME(), RANKED())
}

pub fn is_unranked(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.is_dialect(ty, DIALECT_NAME(), UNRANKED())
}

/// The buffer counterpart of a tensor type (same rank, shape, element).
///
/// Returns `None` for non-tensor types.
pub fn from_tensor_type(ctx: &mut IrContext, ty: TypeRef) -> Option<TypeRef> {
    if !tensor::is_tensor(ctx, ty) {
        return None;
    }
    let data = ctx.types.get(ty).clone();
    Some(ctx.types.intern(TypeData {
        dialect: DIALECT_NAME(),
        name: data.name,
        params: data.params,
        attrs: data.attrs,
    }))
}

// ============================================================================
// Operations
// ============================================================================

declare_op! {
    /// Allocate a fresh buffer of a statically known type.
    Alloc => "buffer", "alloc"
}

pub fn alloc(ctx: &mut IrContext, location: Location, ty: TypeRef) -> Alloc {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Alloc::OP_NAME.into())
        .result(ty)
        .build(ctx);
    Alloc(ctx.create_op(data))
}

declare_op! {
    /// Read one element of a buffer at static indices.
    Load => "buffer", "load"
}

pub fn load(
    ctx: &mut IrContext,
    location: Location,
    source: ValueRef,
    indices: &[u64],
    ty: TypeRef,
) -> Load {
    let idx = indices.iter().map(|&i| Attribute::IntBits(i)).collect();
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Load::OP_NAME.into())
        .operand(source)
        .attr(ATTR_INDICES(), Attribute::List(idx))
        .result(ty)
        .build(ctx);
    Load(ctx.create_op(data))
}

impl Load {
    pub fn source(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[0]
    }
}

declare_op! {
    /// Write one element into a buffer at static indices. No results.
    Store => "buffer", "store"
}

pub fn store(
    ctx: &mut IrContext,
    location: Location,
    value: ValueRef,
    dest: ValueRef,
    indices: &[u64],
) -> Store {
    let idx = indices.iter().map(|&i| Attribute::IntBits(i)).collect();
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Store::OP_NAME.into())
        .operand(value)
        .operand(dest)
        .attr(ATTR_INDICES(), Attribute::List(idx))
        .build(ctx);
    Store(ctx.create_op(data))
}

impl Store {
    pub fn value(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[0]
    }

    pub fn dest(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[1]
    }
}

declare_op! {
    /// Shape-changing cast between buffer types.
    Cast => "buffer", "cast"
}

pub fn cast(ctx: &mut IrContext, location: Location, source: ValueRef, ty: TypeRef) -> Cast {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Cast::OP_NAME.into())
        .operand(source)
        .result(ty)
        .build(ctx);
    Cast(ctx.create_op(data))
}

declare_op! {
    /// Copy the contents of one buffer into another. No results.
    Copy => "buffer", "copy"
}

pub fn copy(ctx: &mut IrContext, location: Location, source: ValueRef, dest: ValueRef) -> Copy {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Copy::OP_NAME.into())
        .operand(source)
        .operand(dest)
        .build(ctx);
    Copy(ctx.create_op(data))
}

impl Copy {
    pub fn source(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[0]
    }

    pub fn dest(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[1]
    }
}

declare_op! {
    /// Adapter: view a tensor value as a buffer.
    FromTensor => "buffer", "from_tensor"
}

pub fn from_tensor(
    ctx: &mut IrContext,
    location: Location,
    tensor_value: ValueRef,
    ty: TypeRef,
) -> FromTensor {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), FromTensor::OP_NAME.into())
        .operand(tensor_value)
        .result(ty)
        .build(ctx);
    FromTensor(ctx.create_op(data))
}

impl FromTensor {
    pub fn tensor(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::core;
    use crate::location::Span;

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.silt".to_owned());
        let loc = Location::new(path, Span::new(0, 0));
        (ctx, loc)
    }

    #[test]
    fn tensor_to_buffer_type_mapping() {
        let (mut ctx, _loc) = test_ctx();
        let f32_ty = core::f32_type(&mut ctx);

        let t = tensor::ranked(&mut ctx, &[2, 3], f32_ty);
        let b = from_tensor_type(&mut ctx, t).unwrap();
        assert!(is_ranked(&ctx, b));
        assert_eq!(ctx.types.get(b).params[0], f32_ty);

        let tu = tensor::unranked(&mut ctx, f32_ty);
        let bu = from_tensor_type(&mut ctx, tu).unwrap();
        assert!(is_unranked(&ctx, bu));

        // idempotent shape: same tensor maps to same buffer type
        let b2 = from_tensor_type(&mut ctx, t).unwrap();
        assert_eq!(b, b2);

        // non-tensor types don't map
        assert_eq!(from_tensor_type(&mut ctx, f32_ty), None);
        assert_eq!(from_tensor_type(&mut ctx, b), None);
    }

    #[test]
    fn alloc_and_store() {
        let (mut ctx, loc) = test_ctx();
        let f32_ty = core::f32_type(&mut ctx);
        let b_ty = ranked(&mut ctx, &[2], f32_ty);

        let a = alloc(&mut ctx, loc, b_ty);
        assert_eq!(ctx.value_ty(a.result(&ctx)), b_ty);

        let c = OperationDataBuilder::new(loc, crate::Symbol::new("arith"), crate::Symbol::new("const"))
            .result(f32_ty)
            .build(&mut ctx);
        let c_op = ctx.create_op(c);
        let v = ctx.op_result(c_op, 0);

        let a_res = a.result(&ctx);
        let s = store(&mut ctx, loc, v, a_res, &[0]);
        assert_eq!(s.value(&ctx), v);
        assert_eq!(s.dest(&ctx), a.result(&ctx));
    }

    #[test]
    fn copy_accessors() {
        let (mut ctx, loc) = test_ctx();
        let f32_ty = core::f32_type(&mut ctx);
        let b_ty = ranked(&mut ctx, &[2], f32_ty);

        let src = alloc(&mut ctx, loc, b_ty);
        let dst = alloc(&mut ctx, loc, b_ty);
        let (sv, dv) = (src.result(&ctx), dst.result(&ctx));

        let c = copy(&mut ctx, loc, sv, dv);
        assert_eq!(c.source(&ctx), sv);
        assert_eq!(c.dest(&ctx), dv);
        assert!(ctx.op_results(c.op_ref()).is_empty());
    }
}
