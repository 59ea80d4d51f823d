//! Tensor dialect: abstract, storage-less shaped values and the glue
//! operations that cross into the buffer world.
//!
//! Types: `tensor.ranked` (static shape attr + element param) and
//! `tensor.unranked` (element param only; rank unknown until runtime).

use smallvec::SmallVec;

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::{DialectOp, declare_op};
use crate::refs::{TypeRef, ValueRef};
use crate::symbols;
use crate::types::{Attribute, Location, TypeDataBuilder};

symbols! {
    DIALECT_NAME => "tensor",
    RANKED => "ranked",
    UNRANKED => "unranked",
    ATTR_SHAPE => "shape",
    ATTR_INDICES => "indices",
}

// ============================================================================
// Types
// ============================================================================

/// Intern a ranked tensor type with a static shape.
pub fn ranked(ctx: &mut IrContext, shape: &[u64], elem: TypeRef) -> TypeRef {
    let dims = shape.iter().map(|&d| Attribute::IntBits(d)).collect();
    ctx.types.intern(
        TypeDataBuilder::new(DIALECT_NAME(), RANKED())
            .param(elem)
            .attr(ATTR_SHAPE(), Attribute::List(dims))
            .build(),
    )
}

/// Intern an unranked tensor type.
pub fn unranked(ctx: &mut IrContext, elem: TypeRef) -> TypeRef {
    ctx.types
        .intern(TypeDataBuilder::new(DIALECT_NAME(), UNRANKED()).param(elem).build())
}

/// Whether a type belongs to the tensor category (ranked or unranked).
pub fn is_tensor(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.get(ty).dialect == DIALECT_NAME()
}

pub fn is_ranked(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.is_dialect(ty, DIALECT_NAME(), RANKED())
}

pub fn is_unranked(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.is_dialect(ty, DIALECT_NAME(), UNRANKED())
}

/// The element type of a tensor type.
pub fn element_type(ctx: &IrContext, ty: TypeRef) -> TypeRef {
    ctx.types.get(ty).params[0]
}

/// The static shape of a ranked tensor type.
pub fn type_shape(ctx: &IrContext, ty: TypeRef) -> Option<SmallVec<[u64; 4]>> {
    if !is_ranked(ctx, ty) {
        return None;
    }
    match ctx.types.get(ty).attrs.get(&ATTR_SHAPE()) {
        Some(Attribute::List(dims)) => Some(
            dims.iter()
                .map(|a| match a {
                    Attribute::IntBits(d) => *d,
                    _ => 0,
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Whether any type in the sequence is a tensor type.
pub fn any_tensor<'a>(ctx: &IrContext, types: impl IntoIterator<Item = &'a TypeRef>) -> bool {
    types.into_iter().any(|&ty| is_tensor(ctx, ty))
}

// ============================================================================
// Operations
// ============================================================================

declare_op! {
    /// Materialize a rank-1 tensor from scalar elements.
    FromElements => "tensor", "from_elements"
}

pub fn from_elements(
    ctx: &mut IrContext,
    location: Location,
    elements: impl IntoIterator<Item = ValueRef>,
    ty: TypeRef,
) -> FromElements {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), FromElements::OP_NAME.into())
        .operands(elements)
        .result(ty)
        .build(ctx);
    FromElements(ctx.create_op(data))
}

impl FromElements {
    pub fn elements<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.op_ref())
    }
}

declare_op! {
    /// Read one element of a tensor at static indices.
    Extract => "tensor", "extract"
}

pub fn extract(
    ctx: &mut IrContext,
    location: Location,
    source: ValueRef,
    indices: &[u64],
    ty: TypeRef,
) -> Extract {
    let idx = indices.iter().map(|&i| Attribute::IntBits(i)).collect();
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Extract::OP_NAME.into())
        .operand(source)
        .attr(ATTR_INDICES(), Attribute::List(idx))
        .result(ty)
        .build(ctx);
    Extract(ctx.create_op(data))
}

impl Extract {
    pub fn source(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[0]
    }

    pub fn indices(&self, ctx: &IrContext) -> Vec<u64> {
        attr_indices(ctx, self.op_ref())
    }
}

declare_op! {
    /// Shape-changing cast between tensor types.
    Cast => "tensor", "cast"
}

pub fn cast(ctx: &mut IrContext, location: Location, source: ValueRef, ty: TypeRef) -> Cast {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Cast::OP_NAME.into())
        .operand(source)
        .result(ty)
        .build(ctx);
    Cast(ctx.create_op(data))
}

impl Cast {
    pub fn source(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[0]
    }
}

declare_op! {
    /// Adapter: read a buffer back into a tensor value.
    FromBuffer => "tensor", "from_buffer"
}

pub fn from_buffer(
    ctx: &mut IrContext,
    location: Location,
    buffer: ValueRef,
    ty: TypeRef,
) -> FromBuffer {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), FromBuffer::OP_NAME.into())
        .operand(buffer)
        .result(ty)
        .build(ctx);
    FromBuffer(ctx.create_op(data))
}

impl FromBuffer {
    pub fn buffer(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.op_ref())[0]
    }
}

declare_op! {
    /// Store a whole tensor value into a buffer destination. No results.
    Store => "tensor", "store"
}

pub fn store(ctx: &mut IrContext, location: Location, value: ValueRef, dest: ValueRef) -> Store {
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Store::OP_NAME.into())
        .operand(value)
        .operand(dest)
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

pub(crate) fn attr_indices(ctx: &IrContext, op: crate::refs::OpRef) -> Vec<u64> {
    match ctx.op(op).attributes.get(&ATTR_INDICES()) {
        Some(Attribute::List(items)) => items
            .iter()
            .map(|a| match a {
                Attribute::IntBits(i) => *i,
                _ => 0,
            })
            .collect(),
        _ => vec![],
    }
}
