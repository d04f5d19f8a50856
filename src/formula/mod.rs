//! 时序公式：库所上求值的状态公式与迁移上求值的迁移公式.
//!
//! 公式不持有网的引用，求值只依赖 (节点, [`PathSet`]).
//!
//! ```
//! use ids_route_verifier::formula::{StateFormula, TransitionFormula, TransitionPredicate};
//!
//! let reads = TransitionFormula::predicate(TransitionPredicate::reads("R1"));
//! let never_read = StateFormula::inv(!StateFormula::modal(reads));
//! assert_eq!(never_read.write_formula(), "(INV (NOT (MODAL (AF reads:R1))))");
//! ```
use serde::{Deserialize, Serialize};

use crate::analysis::PathSet;
use crate::net::NodeRef;

mod predicate;
mod state;
mod transition;

pub use predicate::{NodePredicate, PlacePredicate, TransitionPredicate};
pub use state::StateFormula;
pub use transition::TransitionFormula;

/// 公式在某节点上的求值结论.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub satisfied: bool,
    /// Facts of the leaves that decided the failure, present only when
    /// unsatisfied.
    pub message: Option<String>,
}

impl From<Evaluation<'_>> for Verdict {
    fn from(evaluation: Evaluation<'_>) -> Self {
        let message = (!evaluation.holds && !evaluation.facts.is_empty())
            .then(|| evaluation.facts.join("; "));
        Self {
            satisfied: evaluation.holds,
            message,
        }
    }
}

/// 求值结果及其依据：决定真值的叶子谓词事实，按出现顺序去重.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation<'a> {
    pub holds: bool,
    pub facts: Vec<&'a str>,
}

impl<'a> Evaluation<'a> {
    pub(crate) fn constant(holds: bool) -> Self {
        Self {
            holds,
            facts: Vec::new(),
        }
    }

    pub(crate) fn leaf(holds: bool, fact: &'a str) -> Self {
        Self {
            holds,
            facts: vec![fact],
        }
    }

    pub(crate) fn negate(mut self) -> Self {
        self.holds = !self.holds;
        self
    }

    fn absorb(&mut self, other: Evaluation<'a>) {
        for fact in other.facts {
            if !self.facts.contains(&fact) {
                self.facts.push(fact);
            }
        }
    }

    /// A false left operand decides alone; otherwise the right one decides,
    /// and when both hold both contribute.
    pub(crate) fn and(self, rhs: impl FnOnce() -> Evaluation<'a>) -> Self {
        if !self.holds {
            return self;
        }
        let rhs = rhs();
        if !rhs.holds {
            return rhs;
        }
        let mut both = self;
        both.absorb(rhs);
        both
    }

    pub(crate) fn or(self, rhs: impl FnOnce() -> Evaluation<'a>) -> Self {
        if self.holds {
            return self;
        }
        let rhs = rhs();
        if rhs.holds {
            return rhs;
        }
        let mut both = self;
        both.absorb(rhs);
        both
    }

    /// The first holding item, or every counterexample.
    pub(crate) fn any(items: impl IntoIterator<Item = Evaluation<'a>>) -> Self {
        let mut failed = Self::constant(false);
        for item in items {
            if item.holds {
                return item;
            }
            failed.absorb(item);
        }
        failed
    }

    /// The first failing item, or every witness.
    pub(crate) fn all(items: impl IntoIterator<Item = Evaluation<'a>>) -> Self {
        let mut held = Self::constant(true);
        for item in items {
            if !item.holds {
                return item;
            }
            held.absorb(item);
        }
        held
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quantifier {
    Exists,
    Forall,
}

/// Scans the paths starting at `start`. A path satisfies the scan when `reach`
/// holds at some position of `start`'s kind and `hold` holds at every such
/// position before it. A node no path starts at is its own single-node path.
pub(crate) fn until<'a>(
    paths: &PathSet,
    start: NodeRef,
    quantifier: Quantifier,
    hold: impl Fn(NodeRef) -> Evaluation<'a>,
    reach: impl Fn(NodeRef) -> Evaluation<'a>,
) -> Evaluation<'a> {
    let scan = |nodes: &[NodeRef]| {
        let mut missed = Evaluation::constant(false);
        for node in nodes.iter().copied().filter(|n| n.same_kind(start)) {
            let reached = reach(node);
            if reached.holds {
                return reached;
            }
            let held = hold(node);
            if !held.holds {
                return held;
            }
            missed.absorb(reached);
        }
        missed
    };

    let mut candidates = paths.starting_at(start).peekable();
    if candidates.peek().is_none() {
        return scan(&[start]);
    }
    match quantifier {
        Quantifier::Exists => Evaluation::any(candidates.map(|path| scan(path.nodes()))),
        Quantifier::Forall => Evaluation::all(candidates.map(|path| scan(path.nodes()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deciding_leaves_are_kept() {
        let read = || Evaluation::leaf(true, "read");
        let untagged = || Evaluation::leaf(false, "tag missing");

        let both = read().and(|| untagged().negate());
        assert!(both.holds);
        assert_eq!(both.facts, vec!["read", "tag missing"]);
        assert_eq!(untagged().and(read).facts, vec!["tag missing"]);
        assert_eq!(untagged().or(read).facts, vec!["read"]);

        let none = Evaluation::any([untagged(), untagged()]);
        assert!(!none.holds);
        assert_eq!(none.facts, vec!["tag missing"]);
        assert!(Evaluation::all(Vec::new()).holds);
    }

    #[test]
    fn verdict_joins_facts_only_on_failure() {
        let erased_then_read = Evaluation::leaf(true, "erased")
            .and(|| Evaluation::leaf(true, "read"))
            .negate();
        let failed = Verdict::from(erased_then_read);
        assert_eq!(failed.message.as_deref(), Some("erased; read"));
        assert_eq!(Verdict::from(Evaluation::leaf(true, "read")).message, None);
        assert_eq!(Verdict::from(Evaluation::constant(false)).message, None);
    }
}
