use log::debug;

use crate::formula::{StateFormula, TransitionFormula, TransitionPredicate};
use crate::net::PetriNet;
use crate::policy::{LeftOperand, PolicyError, PolicyPattern, Rule};

/// Deepest N_TIMES_USAGE bound turned into nested reads. Every unit of the
/// bound adds four formula levels that evaluation recurses through.
pub const MAX_NESTED_BOUND: u64 = 256;

/// Context tags that discharge the logging and notification duties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaTags {
    pub logging: String,
    pub notification: String,
}

impl Default for FormulaTags {
    fn default() -> Self {
        Self {
            logging: "logging".to_owned(),
            notification: "notification".to_owned(),
        }
    }
}

/// Instantiates the template of `pattern` for `target`. The result is meant
/// to be evaluated at the route's source place.
///
/// An N_TIMES_USAGE bound above [`MAX_NESTED_BOUND`] is rejected; use
/// [`build_formula_for`] when the net is known.
pub fn build_formula(
    pattern: PolicyPattern,
    rule: &Rule,
    target: &str,
    tags: &FormulaTags,
) -> Result<StateFormula, PolicyError> {
    instantiate(pattern, rule, target, tags, None)
}

/// Like [`build_formula`], with the N_TIMES_USAGE bound clamped to the number
/// of transitions in `net` that read `target`.
///
/// Along a cycle-free run each reader reads at most once, and a reader on a
/// cycle makes every nesting depth reachable, so the clamped formula has the
/// same truth value at every node of `net`.
pub fn build_formula_for(
    net: &PetriNet,
    pattern: PolicyPattern,
    rule: &Rule,
    target: &str,
    tags: &FormulaTags,
) -> Result<StateFormula, PolicyError> {
    let readers = net
        .transitions
        .iter()
        .filter(|t| t.context.as_ref().is_some_and(|c| c.reads(target)))
        .count() as u64;
    instantiate(pattern, rule, target, tags, Some(readers))
}

fn instantiate(
    pattern: PolicyPattern,
    rule: &Rule,
    target: &str,
    tags: &FormulaTags,
    readers: Option<u64>,
) -> Result<StateFormula, PolicyError> {
    let formula = match pattern {
        PolicyPattern::ProvideAccess => StateFormula::True,
        PolicyPattern::ProhibitAccess => never_reachable(reads(target)),
        PolicyPattern::NTimesUsage => {
            let bound = usage_bound(rule)?;
            let nested = readers.map_or(bound, |readers| bound.min(readers));
            if nested > MAX_NESTED_BOUND {
                return Err(PolicyError::BoundTooDeep {
                    rule: rule.id.clone(),
                    bound,
                    max: MAX_NESTED_BOUND,
                });
            }
            at_most(nested, target)
        }
        PolicyPattern::DurationUsage | PolicyPattern::UsageDuringInterval => {
            every_read_followed_by(target, erases(target))
        }
        PolicyPattern::UsageUntilDeletion => every_read_followed_by(target, erases(target))
            .and(never_reachable(
                erases(target).and(TransitionFormula::modal(StateFormula::pos(
                    StateFormula::modal(reads(target)),
                ))),
            )),
        PolicyPattern::UsageLogging => every_read_followed_by(target, tagged(&tags.logging)),
        PolicyPattern::UsageNotification => {
            every_read_followed_by(target, tagged(&tags.notification))
        }
        PolicyPattern::ConnectorRestrictedUsage => {
            let connector = rule
                .constraint_on(LeftOperand::System)
                .ok_or_else(|| PolicyError::MissingConstraint {
                    rule: rule.id.clone(),
                    operand: LeftOperand::System,
                })?;
            never_reachable(reads(target).and(!tagged(connector.right_operand.trim())))
        }
    };
    debug!("{} on {} for rule {}: {}", pattern, target, rule.id, formula);
    Ok(formula)
}

fn reads(target: &str) -> TransitionFormula {
    TransitionFormula::predicate(TransitionPredicate::reads(target))
}

fn erases(target: &str) -> TransitionFormula {
    TransitionFormula::predicate(TransitionPredicate::erases(target))
}

fn tagged(tag: &str) -> TransitionFormula {
    TransitionFormula::predicate(TransitionPredicate::tagged(tag))
}

/// No reachable place feeds a transition satisfying `step`.
fn never_reachable(step: TransitionFormula) -> StateFormula {
    StateFormula::inv(!StateFormula::modal(step))
}

/// Every reachable read of `target` is followed, on every path, by `then`.
fn every_read_followed_by(target: &str, then: TransitionFormula) -> StateFormula {
    never_reachable(reads(target).and(!TransitionFormula::ev(then)))
}

/// No path reads `target` more than `bound` times.
fn at_most(bound: u64, target: &str) -> StateFormula {
    let mut reads_again = StateFormula::pos(StateFormula::modal(reads(target)));
    for _ in 0..bound {
        reads_again = StateFormula::pos(StateFormula::modal(
            reads(target).and(TransitionFormula::modal(reads_again)),
        ));
    }
    !reads_again
}

fn usage_bound(rule: &Rule) -> Result<u64, PolicyError> {
    let constraint =
        rule.constraint_on(LeftOperand::Count)
            .ok_or_else(|| PolicyError::MissingConstraint {
                rule: rule.id.clone(),
                operand: LeftOperand::Count,
            })?;
    let value = constraint.right_operand.trim();
    value
        .parse::<u64>()
        .ok()
        .or_else(|| {
            value
                .parse::<f64>()
                .ok()
                .filter(|v| v.fract() == 0.0 && *v >= 0.0)
                .map(|v| v as u64)
        })
        .ok_or_else(|| PolicyError::InvalidBound {
            rule: rule.id.clone(),
            value: value.to_owned(),
        })
}
