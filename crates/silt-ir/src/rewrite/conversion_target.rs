//! Conversion target: legality rules for dialect conversion.
//!
//! Classifies every operation as Legal or Illegal. Dynamic predicates are
//! keyed per operation kind and re-evaluated on every query — a rewrite can
//! change an operation's operand or result types in place, so verdicts are
//! never cached.

use std::collections::{HashMap, HashSet};

use crate::context::IrContext;
use crate::ir::Symbol;
use crate::refs::{OpRef, RegionRef};
use crate::walk;

/// Result of a legality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegalityCheck {
    /// The operation is legal (no conversion needed).
    Legal,
    /// The operation is illegal (must be converted).
    Illegal,
}

/// Dynamic legality predicate: `true` means legal, as currently typed.
type DynamicPredicate = dyn Fn(&IrContext, OpRef) -> bool;

/// Defines which ops/dialects are legal or illegal.
///
/// Resolution order for `is_legal`:
/// 1. Dynamic predicate registered for the op kind (consulted instead of
///    any static flag for that kind)
/// 2. Specific op rules (legal_ops / illegal_ops)
/// 3. Dialect rules (legal_dialects / illegal_dialects)
/// 4. Default: Legal
pub struct ConversionTarget {
    legal_dialects: HashSet<Symbol>,
    illegal_dialects: HashSet<Symbol>,
    legal_ops: HashSet<(Symbol, Symbol)>,
    illegal_ops: HashSet<(Symbol, Symbol)>,
    dynamic: HashMap<(Symbol, Symbol), Box<DynamicPredicate>>,
}

impl ConversionTarget {
    /// Create a new empty conversion target (everything is legal by default).
    pub fn new() -> Self {
        Self {
            legal_dialects: HashSet::new(),
            illegal_dialects: HashSet::new(),
            legal_ops: HashSet::new(),
            illegal_ops: HashSet::new(),
            dynamic: HashMap::new(),
        }
    }

    /// Mark an entire dialect as legal.
    pub fn add_legal_dialect(&mut self, dialect: impl Into<Symbol>) {
        self.legal_dialects.insert(dialect.into());
    }

    /// Mark an entire dialect as illegal.
    pub fn add_illegal_dialect(&mut self, dialect: impl Into<Symbol>) {
        self.illegal_dialects.insert(dialect.into());
    }

    /// Mark a specific operation kind as legal.
    pub fn add_legal_op(&mut self, dialect: impl Into<Symbol>, name: impl Into<Symbol>) {
        self.legal_ops.insert((dialect.into(), name.into()));
    }

    /// Mark a specific operation kind as illegal.
    pub fn add_illegal_op(&mut self, dialect: impl Into<Symbol>, name: impl Into<Symbol>) {
        self.illegal_ops.insert((dialect.into(), name.into()));
    }

    /// Register a dynamic legality predicate for one operation kind.
    ///
    /// The predicate replaces any static flag for that kind and is
    /// re-evaluated every time the kind's legality is queried.
    pub fn add_dynamically_legal_op(
        &mut self,
        dialect: impl Into<Symbol>,
        name: impl Into<Symbol>,
        pred: impl Fn(&IrContext, OpRef) -> bool + 'static,
    ) {
        self.dynamic
            .insert((dialect.into(), name.into()), Box::new(pred));
    }

    /// Check whether a specific operation is legal, as currently typed.
    pub fn is_legal(&self, ctx: &IrContext, op: OpRef) -> LegalityCheck {
        let data = ctx.op(op);
        let key = (data.dialect, data.name);

        if let Some(pred) = self.dynamic.get(&key) {
            return if pred(ctx, op) {
                LegalityCheck::Legal
            } else {
                LegalityCheck::Illegal
            };
        }

        if self.legal_ops.contains(&key) {
            return LegalityCheck::Legal;
        }
        if self.illegal_ops.contains(&key) {
            return LegalityCheck::Illegal;
        }

        if self.legal_dialects.contains(&data.dialect) {
            return LegalityCheck::Legal;
        }
        if self.illegal_dialects.contains(&data.dialect) {
            return LegalityCheck::Illegal;
        }

        LegalityCheck::Legal
    }

    /// Verify that no illegal operations remain under a region.
    ///
    /// Returns every illegal operation found.
    pub fn verify(&self, ctx: &IrContext, region: RegionRef) -> Vec<IllegalOp> {
        let mut illegal = Vec::new();

        let _ = walk::walk_region::<()>(ctx, region, &mut |op| {
            if self.is_legal(ctx, op) == LegalityCheck::Illegal {
                let data = ctx.op(op);
                illegal.push(IllegalOp {
                    op,
                    dialect: data.dialect,
                    name: data.name,
                });
            }
            std::ops::ControlFlow::Continue(walk::WalkAction::Advance)
        });

        illegal
    }
}

impl Default for ConversionTarget {
    fn default() -> Self {
        Self::new()
    }
}

/// An illegal operation found during verification.
#[derive(Debug, Clone)]
pub struct IllegalOp {
    pub op: OpRef,
    pub dialect: Symbol,
    pub name: Symbol,
}

impl std::fmt::Display for IllegalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{} ({})", self.dialect, self.name, self.op)
    }
}
