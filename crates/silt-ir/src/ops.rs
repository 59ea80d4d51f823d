//! Dialect operation utilities.
//!
//! Provides the `DialectOp` trait for typed wrappers over raw operations,
//! plus the `declare_op!` macro dialect modules use to define them.

use crate::context::IrContext;
use crate::ir::Symbol;
use crate::refs::{OpRef, ValueRef};

/// Error when wrapping a raw operation as a typed dialect op.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum OpMatchError {
    /// Operation name doesn't match the expected dialect.operation.
    #[display("expected {expected}, found {actual}")]
    WrongOperation {
        expected: &'static str,
        actual: String,
    },
    /// Missing required attribute.
    #[display("missing attribute: {_0}")]
    MissingAttribute(#[error(not(source))] &'static str),
    /// Attribute has wrong type.
    #[display("attribute has wrong type: {_0}")]
    WrongAttributeType(#[error(not(source))] &'static str),
}

/// Trait for typed dialect operation wrappers.
///
/// Wrappers are `Copy` handles around an `OpRef` whose dialect and name have
/// been checked once at construction.
pub trait DialectOp: Sized + Copy {
    const DIALECT_NAME: &'static str;
    const OP_NAME: &'static str;

    fn from_op(ctx: &IrContext, op: OpRef) -> Result<Self, OpMatchError>;
    fn op_ref(&self) -> OpRef;

    fn matches(ctx: &IrContext, op: OpRef) -> bool {
        let data = ctx.op(op);
        data.dialect == Symbol::new(Self::DIALECT_NAME) && data.name == Symbol::new(Self::OP_NAME)
    }

    /// The operation's first result value.
    ///
    /// Only meaningful for ops declared with at least one result.
    fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.op_ref(), 0)
    }
}

/// Declare a typed wrapper struct for one operation kind.
///
/// Constructors and attribute accessors are written by hand in the dialect
/// module; the macro covers the kind check and the `DialectOp` plumbing.
macro_rules! declare_op {
    ($(#[$meta:meta])* $Name:ident => $dialect:literal, $op:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct $Name($crate::refs::OpRef);

        impl $crate::ops::DialectOp for $Name {
            const DIALECT_NAME: &'static str = $dialect;
            const OP_NAME: &'static str = $op;

            fn from_op(
                ctx: &$crate::context::IrContext,
                op: $crate::refs::OpRef,
            ) -> Result<Self, $crate::ops::OpMatchError> {
                if Self::matches(ctx, op) {
                    Ok($Name(op))
                } else {
                    let data = ctx.op(op);
                    Err($crate::ops::OpMatchError::WrongOperation {
                        expected: concat!($dialect, ".", $op),
                        actual: format!("{}.{}", data.dialect, data.name),
                    })
                }
            }

            fn op_ref(&self) -> $crate::refs::OpRef {
                self.0
            }
        }
    };
}
pub(crate) use declare_op;
