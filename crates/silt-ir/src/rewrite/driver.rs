//! The conversion driver: legality-gated fixpoint rewriting.
//!
//! Each iteration walks every operation under the module (nested regions
//! first), asks the conversion target whether the op is acceptable as
//! currently typed, and applies the first matching pattern to each illegal
//! op. Pending type-adapter casts are resolved between sweeps. The loop
//! ends at fixpoint (an iteration with no changes) or at the iteration cap.
//!
//! Two modes:
//! - partial: best effort; illegal ops with no matching pattern are left
//!   in place and the driver still reports its counts.
//! - full: strict; residual illegality, unresolved adapters, or a missed
//!   fixpoint fail the whole unit. The mutated graph is not rolled back.

use crate::context::IrContext;
use crate::dialect::core;
use crate::refs::{BlockRef, RegionRef};
use crate::rewrite::conversion_target::{ConversionTarget, IllegalOp, LegalityCheck};
use crate::rewrite::pattern::RewritePatternSet;
use crate::rewrite::resolve_casts::{count_pending_casts, resolve_casts};
use crate::rewrite::rewriter::{self, PatternRewriter};
use crate::rewrite::type_converter::TypeConverter;

/// Outcome counters of a conversion run.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    /// Number of fixpoint iterations performed.
    pub iterations: usize,
    /// Number of pattern applications.
    pub rewrites: usize,
    /// Number of type-adapter casts resolved.
    pub resolved_casts: usize,
    /// Whether the fixpoint was reached within the iteration cap.
    pub reached_fixpoint: bool,
}

/// Failure of a strict (full) conversion.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ConversionError {
    /// Operations remained that the target classifies as illegal.
    #[display("conversion left {} illegal operation(s)", ops.len())]
    ResidualIllegal {
        #[error(not(source))]
        ops: Vec<IllegalOp>,
    },
    /// A type adapter could not be materialized at a legal/illegal seam.
    #[display("{count} type adapter(s) could not be materialized")]
    UnresolvedMaterialization { count: usize },
    /// The rewrite loop did not converge.
    #[display("conversion did not reach a fixpoint after {iterations} iteration(s)")]
    NoFixpoint { iterations: usize },
}

/// Ties target, converter, and patterns together over one module.
pub struct ConversionDriver<'a> {
    target: &'a ConversionTarget,
    converter: &'a TypeConverter,
    patterns: &'a RewritePatternSet,
    max_iterations: usize,
}

impl<'a> ConversionDriver<'a> {
    pub fn new(
        target: &'a ConversionTarget,
        converter: &'a TypeConverter,
        patterns: &'a RewritePatternSet,
    ) -> Self {
        Self {
            target,
            converter,
            patterns,
            max_iterations: 10,
        }
    }

    /// Set the maximum number of fixpoint iterations.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Best-effort conversion: apply what matches, tolerate the rest.
    pub fn apply_partial(&self, ctx: &mut IrContext, module: core::Module) -> ConversionReport {
        self.run(ctx, module)
    }

    /// Strict conversion: the result must contain no illegal operations
    /// and no unresolved type adapters.
    pub fn apply_full(
        &self,
        ctx: &mut IrContext,
        module: core::Module,
    ) -> Result<ConversionReport, ConversionError> {
        let report = self.run(ctx, module);
        if !report.reached_fixpoint {
            return Err(ConversionError::NoFixpoint {
                iterations: report.iterations,
            });
        }
        let body = module.body(ctx);
        let pending = count_pending_casts(ctx, body);
        if pending > 0 {
            return Err(ConversionError::UnresolvedMaterialization { count: pending });
        }
        let illegal = self.target.verify(ctx, body);
        if !illegal.is_empty() {
            return Err(ConversionError::ResidualIllegal { ops: illegal });
        }
        Ok(report)
    }

    fn run(&self, ctx: &mut IrContext, module: core::Module) -> ConversionReport {
        let mut rewrites = 0;
        let mut resolved_casts = 0;
        let mut iterations = 0;
        let mut reached_fixpoint = false;

        let body = module.body(ctx);
        for _ in 0..self.max_iterations {
            iterations += 1;
            let swept = self.sweep_region(ctx, body);
            let resolved = resolve_casts(ctx, self.converter, body);
            rewrites += swept;
            resolved_casts += resolved;
            tracing::debug!(iterations, swept, resolved, "conversion iteration");
            if swept + resolved == 0 {
                reached_fixpoint = true;
                break;
            }
        }

        ConversionReport {
            iterations,
            rewrites,
            resolved_casts,
            reached_fixpoint,
        }
    }

    fn sweep_region(&self, ctx: &mut IrContext, region: RegionRef) -> usize {
        let mut changes = 0;
        let blocks: Vec<BlockRef> = ctx.region(region).blocks.to_vec();
        for block in blocks {
            changes += self.sweep_block(ctx, block);
        }
        changes
    }

    fn sweep_block(&self, ctx: &mut IrContext, block: BlockRef) -> usize {
        let mut changes = 0;

        // Snapshot: rewrites may splice ops in and out of this block
        let ops = ctx.block(block).ops.to_vec();

        for op in ops {
            // Skip ops removed from the block by an earlier rewrite
            if ctx.op(op).parent_block != Some(block) {
                continue;
            }

            // Nested regions first, so inner rewrites happen before the
            // enclosing op's own legality is judged
            let regions: Vec<RegionRef> = ctx.op(op).regions.to_vec();
            for region in regions {
                changes += self.sweep_region(ctx, region);
            }

            if ctx.op(op).parent_block != Some(block) {
                continue;
            }

            // Legal ops are never rewritten
            if self.target.is_legal(ctx, op) == LegalityCheck::Legal {
                continue;
            }

            let (dialect, name) = {
                let data = ctx.op(op);
                (data.dialect, data.name)
            };
            for pattern in self.patterns.for_kind(dialect, name) {
                let mut rw = PatternRewriter::new(self.converter);
                let matched = pattern.match_and_rewrite(ctx, op, &mut rw);
                if matched && rw.has_mutations() {
                    tracing::trace!(pattern = pattern.name(), %op, "pattern applied");
                    rewriter::apply_mutations(ctx, op, rw.take_mutations());
                    changes += 1;
                    break; // first match wins
                }
            }
        }

        changes
    }
}

/// Best-effort conversion of one module.
pub fn apply_partial_conversion(
    ctx: &mut IrContext,
    module: core::Module,
    target: &ConversionTarget,
    converter: &TypeConverter,
    patterns: &RewritePatternSet,
) -> ConversionReport {
    ConversionDriver::new(target, converter, patterns).apply_partial(ctx, module)
}

/// Strict conversion of one module.
pub fn apply_full_conversion(
    ctx: &mut IrContext,
    module: core::Module,
    target: &ConversionTarget,
    converter: &TypeConverter,
    patterns: &RewritePatternSet,
) -> Result<ConversionReport, ConversionError> {
    ConversionDriver::new(target, converter, patterns).apply_full(ctx, module)
}
