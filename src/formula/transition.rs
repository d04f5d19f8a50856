use std::fmt;
use std::ops::Not;

use crate::analysis::PathSet;
use crate::formula::{Evaluation, Quantifier, StateFormula, TransitionPredicate, Verdict, until};
use crate::net::{NodeRef, PlaceId, TransitionId};

/// 在迁移上求值的公式，与 [`StateFormula`] 对称，节点类别互换.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionFormula {
    True,
    False,
    Predicate(TransitionPredicate),
    And(Box<TransitionFormula>, Box<TransitionFormula>),
    Or(Box<TransitionFormula>, Box<TransitionFormula>),
    Not(Box<TransitionFormula>),
    /// 某个输出库所满足操作数.
    Modal(Box<StateFormula>),
    ExistNext(Box<StateFormula>),
    ForallNext(Box<StateFormula>),
    /// Some output place satisfies the second operand and feeds a transition
    /// satisfying the first.
    ExistModal(Box<TransitionFormula>, Box<StateFormula>),
    ForallModal(Box<TransitionFormula>, Box<StateFormula>),
    ExistUntil(Box<TransitionFormula>, Box<TransitionFormula>),
    ForallUntil(Box<TransitionFormula>, Box<TransitionFormula>),
    Ev(Box<TransitionFormula>),
    Pos(Box<TransitionFormula>),
    Inv(Box<TransitionFormula>),
}

impl TransitionFormula {
    pub fn predicate(predicate: TransitionPredicate) -> Self {
        Self::Predicate(predicate)
    }

    pub fn and(self, other: TransitionFormula) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: TransitionFormula) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    pub fn modal(inner: StateFormula) -> Self {
        Self::Modal(Box::new(inner))
    }

    pub fn exist_next(inner: StateFormula) -> Self {
        Self::ExistNext(Box::new(inner))
    }

    pub fn forall_next(inner: StateFormula) -> Self {
        Self::ForallNext(Box::new(inner))
    }

    pub fn exist_modal(next: TransitionFormula, between: StateFormula) -> Self {
        Self::ExistModal(Box::new(next), Box::new(between))
    }

    pub fn forall_modal(next: TransitionFormula, between: StateFormula) -> Self {
        Self::ForallModal(Box::new(next), Box::new(between))
    }

    pub fn exist_until(hold: TransitionFormula, reach: TransitionFormula) -> Self {
        Self::ExistUntil(Box::new(hold), Box::new(reach))
    }

    pub fn forall_until(hold: TransitionFormula, reach: TransitionFormula) -> Self {
        Self::ForallUntil(Box::new(hold), Box::new(reach))
    }

    pub fn ev(inner: TransitionFormula) -> Self {
        Self::Ev(Box::new(inner))
    }

    pub fn pos(inner: TransitionFormula) -> Self {
        Self::Pos(Box::new(inner))
    }

    pub fn inv(inner: TransitionFormula) -> Self {
        Self::Inv(Box::new(inner))
    }

    pub fn evaluate(&self, transition: TransitionId, paths: &PathSet) -> bool {
        self.explain(transition, paths).holds
    }

    pub fn explain<'a>(&'a self, transition: TransitionId, paths: &PathSet) -> Evaluation<'a> {
        let start = NodeRef::Transition(transition);
        match self {
            Self::True => Evaluation::constant(true),
            Self::False => Evaluation::constant(false),
            Self::Predicate(predicate) => predicate.explain(paths.net().transition(transition)),
            Self::And(lhs, rhs) => lhs
                .explain(transition, paths)
                .and(|| rhs.explain(transition, paths)),
            Self::Or(lhs, rhs) => lhs
                .explain(transition, paths)
                .or(|| rhs.explain(transition, paths)),
            Self::Not(inner) => inner.explain(transition, paths).negate(),
            Self::Modal(inner) | Self::ExistNext(inner) => {
                Evaluation::any(next_places(transition, paths).map(|p| inner.explain(p, paths)))
            }
            Self::ForallNext(inner) => Evaluation::any(
                next_places(transition, paths).map(|p| inner.explain(p, paths).negate()),
            )
            .negate(),
            Self::ExistModal(next, between) => {
                Evaluation::any(next_places(transition, paths).map(|p| {
                    between.explain(p, paths).and(|| {
                        Evaluation::any(next_transitions(p, paths).map(|t| next.explain(t, paths)))
                    })
                }))
            }
            Self::ForallModal(next, between) => {
                Evaluation::all(next_places(transition, paths).map(|p| {
                    between.explain(p, paths).and(|| {
                        Evaluation::all(next_transitions(p, paths).map(|t| next.explain(t, paths)))
                    })
                }))
            }
            Self::ExistUntil(hold, reach) => {
                until(paths, start, Quantifier::Exists, at(hold, paths), at(reach, paths))
            }
            Self::ForallUntil(hold, reach) => {
                until(paths, start, Quantifier::Forall, at(hold, paths), at(reach, paths))
            }
            Self::Ev(inner) => until(paths, start, Quantifier::Forall, always, at(inner, paths)),
            Self::Pos(inner) => until(paths, start, Quantifier::Exists, always, at(inner, paths)),
            Self::Inv(inner) => until(paths, start, Quantifier::Exists, always, |node| {
                inner.explain_node(node, paths).negate()
            })
            .negate(),
        }
    }

    fn explain_node<'a>(&'a self, node: NodeRef, paths: &PathSet) -> Evaluation<'a> {
        match node.as_transition() {
            Some(transition) => self.explain(transition, paths),
            None => Evaluation::constant(false),
        }
    }

    pub fn verdict(&self, transition: TransitionId, paths: &PathSet) -> Verdict {
        self.explain(transition, paths).into()
    }

    pub fn write_formula(&self) -> String {
        self.to_string()
    }

    pub fn messages(&self) -> Vec<&str> {
        let mut messages = Vec::new();
        self.collect_messages(&mut messages);
        messages
    }

    pub(crate) fn collect_messages<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::True | Self::False => {}
            Self::Predicate(predicate) => out.push(predicate.message()),
            Self::Not(inner) | Self::Ev(inner) | Self::Pos(inner) | Self::Inv(inner) => {
                inner.collect_messages(out)
            }
            Self::Modal(inner) | Self::ExistNext(inner) | Self::ForallNext(inner) => {
                inner.collect_messages(out)
            }
            Self::And(lhs, rhs)
            | Self::Or(lhs, rhs)
            | Self::ExistUntil(lhs, rhs)
            | Self::ForallUntil(lhs, rhs) => {
                lhs.collect_messages(out);
                rhs.collect_messages(out);
            }
            Self::ExistModal(next, between) | Self::ForallModal(next, between) => {
                next.collect_messages(out);
                between.collect_messages(out);
            }
        }
    }
}

fn at<'a, 'p>(
    formula: &'a TransitionFormula,
    paths: &'p PathSet,
) -> impl Fn(NodeRef) -> Evaluation<'a> + use<'a, 'p> {
    move |node| formula.explain_node(node, paths)
}

fn always<'a>(_: NodeRef) -> Evaluation<'a> {
    Evaluation::constant(true)
}

fn next_places(transition: TransitionId, paths: &PathSet) -> impl Iterator<Item = PlaceId> + '_ {
    paths
        .successors(transition.into())
        .iter()
        .filter_map(|node| node.as_place())
}

fn next_transitions(place: PlaceId, paths: &PathSet) -> impl Iterator<Item = TransitionId> + '_ {
    paths
        .successors(place.into())
        .iter()
        .filter_map(|node| node.as_transition())
}

impl Not for TransitionFormula {
    type Output = TransitionFormula;

    fn not(self) -> Self::Output {
        TransitionFormula::Not(Box::new(self))
    }
}

impl fmt::Display for TransitionFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "TT"),
            Self::False => write!(f, "FF"),
            Self::Predicate(predicate) => write!(f, "(AF {})", predicate.name()),
            Self::And(lhs, rhs) => write!(f, "(AND {} {})", lhs, rhs),
            Self::Or(lhs, rhs) => write!(f, "(OR {} {})", lhs, rhs),
            Self::Not(inner) => write!(f, "(NOT {})", inner),
            Self::Modal(inner) => write!(f, "(MODAL {})", inner),
            Self::ExistNext(inner) => write!(f, "(EXIST_NEXT {})", inner),
            Self::ForallNext(inner) => write!(f, "(FORALL_NEXT {})", inner),
            Self::ExistModal(next, between) => write!(f, "(EXIST_MODAL {} {})", next, between),
            Self::ForallModal(next, between) => write!(f, "(FORALL_MODAL {} {})", next, between),
            Self::ExistUntil(hold, reach) => write!(f, "(EXIST_UNTIL {} {})", hold, reach),
            Self::ForallUntil(hold, reach) => write!(f, "(FORALL_UNTIL {} {})", hold, reach),
            Self::Ev(inner) => write!(f, "(EV {})", inner),
            Self::Pos(inner) => write!(f, "(POS {})", inner),
            Self::Inv(inner) => write!(f, "(INV {})", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StepGraph;
    use crate::route::{Endpoint, Route, RouteBuilder};

    /// a -> s1 -> b -> s2 -> c; `b` reads R1 and writes R2, `c` reads R2.
    fn chain() -> (crate::net::PetriNet, PathSet) {
        let route = Route::new("root")
            .step(
                Route::new("s1")
                    .start(Endpoint::app("a"))
                    .end(Endpoint::app("b"))
                    .output("R1"),
            )
            .step(
                Route::new("s2")
                    .start(Endpoint::app("b"))
                    .end(Endpoint::app("c").tag("logging"))
                    .output("R2"),
            );
        let built = RouteBuilder::build(&route).unwrap();
        let steps = StepGraph::build(&built.net).unwrap();
        let paths = PathSet::from_step_graph(&steps).unwrap();
        (built.net, paths)
    }

    fn pred(predicate: TransitionPredicate) -> TransitionFormula {
        TransitionFormula::predicate(predicate)
    }

    #[test]
    fn predicates_read_context() {
        let (net, paths) = chain();
        let b = net.transition_by_id("b").unwrap();

        assert!(pred(TransitionPredicate::reads("R1")).evaluate(b, &paths));
        assert!(pred(TransitionPredicate::erases("R1")).evaluate(b, &paths));
        assert!(pred(TransitionPredicate::writes("R2")).evaluate(b, &paths));
        assert!(!pred(TransitionPredicate::reads("R2")).evaluate(b, &paths));
        assert!((!pred(TransitionPredicate::reads("R2"))).evaluate(b, &paths));
    }

    #[test]
    fn eventually_and_possibly_follow_the_route() {
        let (net, paths) = chain();
        let a = net.transition_by_id("a").unwrap();
        let c = net.transition_by_id("c").unwrap();
        let logged = pred(TransitionPredicate::tagged("logging"));

        assert!(TransitionFormula::ev(logged.clone()).evaluate(a, &paths));
        assert!(TransitionFormula::pos(logged.clone()).evaluate(a, &paths));
        assert!(TransitionFormula::ev(logged.clone()).evaluate(c, &paths));
        assert!(!TransitionFormula::inv(logged.clone()).evaluate(a, &paths));
        assert!(TransitionFormula::inv(logged).evaluate(c, &paths));
        assert!(
            TransitionFormula::exist_until(
                !pred(TransitionPredicate::reads("R2")),
                pred(TransitionPredicate::reads("R2"))
            )
            .evaluate(a, &paths)
        );
    }

    #[test]
    fn next_quantifiers_over_output_places() {
        let (net, paths) = chain();
        let b = net.transition_by_id("b").unwrap();
        let c = net.transition_by_id("c").unwrap();
        let is_s2 = StateFormula::predicate(crate::formula::PlacePredicate::new(
            "s2",
            "at s2",
            |p: &crate::net::Place| p.id == "s2",
        ));

        assert!(TransitionFormula::modal(is_s2.clone()).evaluate(b, &paths));
        assert!(TransitionFormula::forall_next(is_s2.clone()).evaluate(b, &paths));
        assert!(!TransitionFormula::exist_next(is_s2.clone()).evaluate(c, &paths));
        assert!(
            TransitionFormula::exist_modal(
                pred(TransitionPredicate::reads("R2")),
                is_s2.clone()
            )
            .evaluate(b, &paths)
        );
        assert!(
            !TransitionFormula::forall_modal(pred(TransitionPredicate::reads("R1")), is_s2)
                .evaluate(b, &paths)
        );
    }

    #[test]
    fn rendering_nests_both_kinds() {
        let formula = TransitionFormula::ev(pred(TransitionPredicate::erases("R1")))
            .and(TransitionFormula::modal(StateFormula::True));
        assert_eq!(
            formula.write_formula(),
            "(AND (EV (AF erases:R1)) (MODAL TT))"
        );
        assert_eq!(formula.to_string(), formula.write_formula());
    }
}
