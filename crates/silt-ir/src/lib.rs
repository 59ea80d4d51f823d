//! Silt IR crate.
//!
//! Arena-based multi-level dialect IR and the generic dialect conversion
//! framework built on top of it. Operations, values, blocks, and regions
//! live in `PrimaryMap` arenas addressed by stable refs; use-chains are
//! maintained transactionally so rewrites can never leave dangling operand
//! references behind.

// === Arena IR ===
pub mod context;
pub mod refs;
pub mod types;

// === Dialect modules ===
pub mod dialect;

// === IR infrastructure ===
pub mod ir;
pub mod location;
pub mod ops;
pub mod rewrite;
pub mod walk;

pub use context::{
    BlockArgData, BlockData, IrContext, OperationData, OperationDataBuilder, RegionData, Use,
    erase_op,
};
pub use ir::Symbol;
pub use location::Span;
pub use ops::{DialectOp, OpMatchError};
pub use refs::{BlockRef, OpRef, PathRef, RegionRef, TypeRef, ValueDef, ValueRef};
pub use types::{Attribute, Location, TypeData, TypeDataBuilder};
pub use walk::WalkAction;

// Re-export smallvec for use by dialect constructors in dependent crates
pub use smallvec;
