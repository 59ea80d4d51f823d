//! Bufferize type converter.
//!
//! Maps tensor types to their buffer counterparts and materializes the
//! adapter operations (`buffer.from_tensor`, `tensor.from_buffer`,
//! `buffer.cast`) wherever a value crosses the tensor/buffer seam.
//!
//! ## Type Conversion Rules
//!
//! | Source Type       | Target Type       | Notes                        |
//! |-------------------|-------------------|------------------------------|
//! | `tensor.ranked`   | `buffer.ranked`   | Same shape and element type  |
//! | `tensor.unranked` | `buffer.unranked` | Same element type            |
//!
//! All other types are already legal and untouched.

use smallvec::smallvec;

use silt_ir::context::IrContext;
use silt_ir::dialect::{buffer, tensor};
use silt_ir::ops::DialectOp;
use silt_ir::rewrite::{MaterializeResult, TypeConverter};

/// Build the type converter used by the bufferize pass.
pub fn bufferize_type_converter() -> TypeConverter {
    let mut converter = TypeConverter::new();

    converter.add_conversion(
        |ctx, ty| tensor::is_tensor(ctx, ty),
        |ctx, ty| {
            let buf = buffer::from_tensor_type(ctx, ty)
                .expect("conversion rule only matches tensor types");
            smallvec![buf]
        },
    );

    converter.set_materializer(|ctx, location, value, from_ty, to_ty| {
        if tensor::is_tensor(ctx, from_ty) && buffer::is_buffer(ctx, to_ty) {
            let op = buffer::from_tensor(ctx, location, value, to_ty);
            return Some(MaterializeResult {
                value: op.result(ctx),
                ops: vec![op.op_ref()],
            });
        }
        if buffer::is_buffer(ctx, from_ty) && tensor::is_tensor(ctx, to_ty) {
            let op = tensor::from_buffer(ctx, location, value, to_ty);
            return Some(MaterializeResult {
                value: op.result(ctx),
                ops: vec![op.op_ref()],
            });
        }
        // rank-changing seams within the buffer category
        if buffer::is_buffer(ctx, from_ty) && buffer::is_buffer(ctx, to_ty) {
            let op = buffer::cast(ctx, location, value, to_ty);
            return Some(MaterializeResult {
                value: op.result(ctx),
                ops: vec![op.op_ref()],
            });
        }
        None
    });

    converter
}
