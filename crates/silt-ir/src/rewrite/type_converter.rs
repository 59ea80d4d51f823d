//! Type conversion infrastructure for dialect conversion.
//!
//! A `TypeConverter` maps source types to zero, one, or many target types
//! and knows how to materialize adapter operations for a value at a type
//! seam. Conversion rules are (test, build) pairs so that legality queries
//! can run against an immutable context while the build half is free to
//! intern new types.

use smallvec::SmallVec;

use crate::context::IrContext;
use crate::refs::{OpRef, TypeRef, ValueRef};
use crate::types::Location;

/// Converted types for one source type.
pub type TypeList = SmallVec<[TypeRef; 1]>;

/// Result of materializing a type conversion.
pub struct MaterializeResult {
    /// The converted value.
    pub value: ValueRef,
    /// Operations created during materialization (to be inserted).
    pub ops: Vec<OpRef>,
}

impl MaterializeResult {
    /// A no-op materialization: the value is usable as-is.
    pub fn noop(value: ValueRef) -> Self {
        Self { value, ops: vec![] }
    }
}

type TestFn = dyn Fn(&IrContext, TypeRef) -> bool;
type BuildFn = dyn Fn(&mut IrContext, TypeRef) -> TypeList;
type MaterializerFn =
    dyn Fn(&mut IrContext, Location, ValueRef, TypeRef, TypeRef) -> Option<MaterializeResult>;

struct ConversionRule {
    test: Box<TestFn>,
    build: Box<BuildFn>,
}

/// Maps types during dialect conversion.
///
/// Rules are tried in registration order; the first whose test matches
/// decides the conversion. A type no rule matches is already legal.
/// All queries are side-effect-free and may be repeated at any time.
pub struct TypeConverter {
    conversions: Vec<ConversionRule>,
    materializer: Option<Box<MaterializerFn>>,
}

impl TypeConverter {
    /// Create a new empty type converter (every type is legal).
    pub fn new() -> Self {
        Self {
            conversions: Vec::new(),
            materializer: None,
        }
    }

    /// Add a conversion rule: `test` decides whether the rule applies,
    /// `build` produces the replacement types (zero, one, or many).
    pub fn add_conversion(
        &mut self,
        test: impl Fn(&IrContext, TypeRef) -> bool + 'static,
        build: impl Fn(&mut IrContext, TypeRef) -> TypeList + 'static,
    ) {
        self.conversions.push(ConversionRule {
            test: Box::new(test),
            build: Box::new(build),
        });
    }

    /// Set the materialization function used to bridge value type seams.
    pub fn set_materializer(
        &mut self,
        f: impl Fn(&mut IrContext, Location, ValueRef, TypeRef, TypeRef) -> Option<MaterializeResult>
        + 'static,
    ) {
        self.materializer = Some(Box::new(f));
    }

    /// Whether a type is already in target form (no rule matches it).
    pub fn is_legal(&self, ctx: &IrContext, ty: TypeRef) -> bool {
        !self.conversions.iter().any(|rule| (rule.test)(ctx, ty))
    }

    /// Whether every type in the sequence is legal.
    pub fn all_legal<'a>(
        &self,
        ctx: &IrContext,
        types: impl IntoIterator<Item = &'a TypeRef>,
    ) -> bool {
        types.into_iter().all(|&ty| self.is_legal(ctx, ty))
    }

    /// Convert a type. `None` means no rule applies (the type is legal
    /// as-is); `Some` carries zero, one, or many replacement types.
    pub fn convert_type(&self, ctx: &mut IrContext, ty: TypeRef) -> Option<TypeList> {
        for rule in &self.conversions {
            if (rule.test)(ctx, ty) {
                return Some((rule.build)(ctx, ty));
            }
        }
        None
    }

    /// Convert a type expected to map 1:1. `None` if no rule applies or
    /// the rule decomposes/drops the type.
    pub fn convert_one(&self, ctx: &mut IrContext, ty: TypeRef) -> Option<TypeRef> {
        match self.convert_type(ctx, ty) {
            Some(list) if list.len() == 1 => Some(list[0]),
            _ => None,
        }
    }

    /// Convert a type, falling back to the original when no 1:1 rule applies.
    pub fn convert_or_identity(&self, ctx: &mut IrContext, ty: TypeRef) -> TypeRef {
        self.convert_one(ctx, ty).unwrap_or(ty)
    }

    /// Convert a type sequence element-wise (flat-mapping decompositions),
    /// as used to build replacement function and block signatures.
    ///
    /// Returns the converted list and whether anything changed.
    pub fn convert_signature(&self, ctx: &mut IrContext, types: &[TypeRef]) -> (Vec<TypeRef>, bool) {
        let mut out = Vec::with_capacity(types.len());
        let mut changed = false;
        for &ty in types {
            match self.convert_type(ctx, ty) {
                Some(list) => {
                    changed = changed || list.len() != 1 || list[0] != ty;
                    out.extend(list);
                }
                None => out.push(ty),
            }
        }
        (out, changed)
    }

    /// Materialize a conversion from one type to another by creating
    /// adapter ops. `None` if no materializer is set or it declines.
    pub fn materialize(
        &self,
        ctx: &mut IrContext,
        location: Location,
        value: ValueRef,
        from_ty: TypeRef,
        to_ty: TypeRef,
    ) -> Option<MaterializeResult> {
        self.materializer.as_ref()?(ctx, location, value, from_ty, to_ty)
    }
}

impl Default for TypeConverter {
    fn default() -> Self {
        Self::new()
    }
}
