//! Registries the pipeline driver hands to a pass.
//!
//! Both are explicit values constructed by the caller, not ambient global
//! state: the `PatternRegistry` is the pluggable rule-set seam (named
//! population functions contributing conversion patterns and legality rules
//! for one dialect or concern each), and the `DialectRegistry` records the
//! dialects a pass may introduce, so the driver can validate pass
//! composition before running anything.

use std::collections::BTreeSet;
use std::rc::Rc;

use silt_ir::Symbol;
use silt_ir::rewrite::{ConversionTarget, RewritePatternSet, TypeConverter};

/// A named population function: contributes patterns (and, for structural
/// concerns, dynamic legality rules) for one dialect or concern.
pub type PopulateFn = fn(&Rc<TypeConverter>, &mut ConversionTarget, &mut RewritePatternSet);

/// Ordered registry of named pattern population functions.
///
/// Registration order is pattern registration order, which in turn is the
/// order patterns are tried per operation kind.
#[derive(Default)]
pub struct PatternRegistry {
    entries: Vec<(&'static str, PopulateFn)>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a population function under a stable name.
    pub fn register(&mut self, name: &'static str, populate: PopulateFn) {
        self.entries.push((name, populate));
    }

    /// The registered names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(name, _)| *name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every population function, in registration order.
    pub fn populate(
        &self,
        converter: &Rc<TypeConverter>,
        target: &mut ConversionTarget,
        patterns: &mut RewritePatternSet,
    ) {
        for (name, populate) in &self.entries {
            populate(converter, target, patterns);
            tracing::debug!(set = name, total = patterns.len(), "populated pattern set");
        }
    }
}

/// The set of dialects a pass declares it may introduce.
///
/// Consulted by the pipeline driver to validate pass composition before the
/// pass runs.
#[derive(Default)]
pub struct DialectRegistry {
    dialects: BTreeSet<Symbol>,
}

impl DialectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dialect: impl Into<Symbol>) {
        self.dialects.insert(dialect.into());
    }

    pub fn contains(&self, dialect: impl Into<Symbol>) -> bool {
        self.dialects.contains(&dialect.into())
    }

    pub fn dialects(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.dialects.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populate_a(
        _converter: &Rc<TypeConverter>,
        _target: &mut ConversionTarget,
        patterns: &mut RewritePatternSet,
    ) {
        struct Never;
        impl silt_ir::rewrite::ConversionPattern for Never {
            fn match_and_rewrite(
                &self,
                _ctx: &mut silt_ir::IrContext,
                _op: silt_ir::OpRef,
                _rewriter: &mut silt_ir::rewrite::PatternRewriter<'_>,
            ) -> bool {
                false
            }
        }
        patterns.add("test", "a", Never);
    }

    #[test]
    fn populate_runs_in_registration_order() {
        let mut registry = PatternRegistry::new();
        registry.register("first", populate_a);
        registry.register("second", populate_a);
        assert_eq!(registry.names(), vec!["first", "second"]);
        assert_eq!(registry.len(), 2);

        let converter = Rc::new(TypeConverter::new());
        let mut target = ConversionTarget::new();
        let mut patterns = RewritePatternSet::new();
        registry.populate(&converter, &mut target, &mut patterns);
        assert_eq!(patterns.len(), 2);
    }

    #[test]
    fn dialect_registry_membership() {
        let mut registry = DialectRegistry::new();
        registry.insert("buffer");
        registry.insert("bmath");
        assert!(registry.contains("buffer"));
        assert!(!registry.contains("math"));
        assert_eq!(registry.dialects().count(), 2);
    }
}
