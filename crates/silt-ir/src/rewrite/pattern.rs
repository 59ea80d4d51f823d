//! Rewrite pattern trait and the op-kind dispatch table.

use std::collections::HashMap;

use crate::context::IrContext;
use crate::ir::Symbol;
use crate::refs::OpRef;
use crate::rewrite::rewriter::PatternRewriter;

/// A pattern that can match and transform one kind of operation.
///
/// Patterns receive the operation with its operands already rewritten by
/// earlier replacements (operand slots are updated in place by RAUW), so a
/// pattern sees converted operand values, possibly of converted types.
///
/// Return `true` if the pattern matched and recorded mutations via the
/// rewriter; `false` is a match failure and the driver tries the next
/// pattern registered for the kind.
pub trait ConversionPattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool;

    /// Human-readable name for debugging.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// An ordered collection of patterns, dispatched by operation kind.
///
/// Registration order is preserved per kind; the driver tries patterns in
/// that order and the first match wins.
#[derive(Default)]
pub struct RewritePatternSet {
    by_kind: HashMap<(Symbol, Symbol), Vec<Box<dyn ConversionPattern>>>,
}

impl RewritePatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pattern for the `dialect.name` operation kind.
    pub fn add(
        &mut self,
        dialect: impl Into<Symbol>,
        name: impl Into<Symbol>,
        pattern: impl ConversionPattern + 'static,
    ) {
        self.by_kind
            .entry((dialect.into(), name.into()))
            .or_default()
            .push(Box::new(pattern));
    }

    /// The patterns registered for an operation kind, in registration order.
    pub fn for_kind(&self, dialect: Symbol, name: Symbol) -> &[Box<dyn ConversionPattern>] {
        self.by_kind
            .get(&(dialect, name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of registered patterns.
    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl ConversionPattern for Named {
        fn match_and_rewrite(
            &self,
            _ctx: &mut IrContext,
            _op: OpRef,
            _rewriter: &mut PatternRewriter<'_>,
        ) -> bool {
            false
        }

        fn name(&self) -> &'static str {
            self.0
        }
    }

    #[test]
    fn dispatch_preserves_registration_order() {
        let mut set = RewritePatternSet::new();
        set.add("tensor", "store", Named("first"));
        set.add("tensor", "store", Named("second"));
        set.add("math", "add", Named("other"));

        let store_patterns = set.for_kind(Symbol::new("tensor"), Symbol::new("store"));
        assert_eq!(store_patterns.len(), 2);
        assert_eq!(store_patterns[0].name(), "first");
        assert_eq!(store_patterns[1].name(), "second");

        assert!(set.for_kind(Symbol::new("tensor"), Symbol::new("cast")).is_empty());
        assert_eq!(set.len(), 3);
    }
}
