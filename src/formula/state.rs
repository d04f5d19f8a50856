use std::fmt;
use std::ops::Not;

use crate::analysis::PathSet;
use crate::formula::{Evaluation, PlacePredicate, Quantifier, TransitionFormula, Verdict, until};
use crate::net::{NodeRef, PlaceId, TransitionId};

/// 在库所上求值的公式.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateFormula {
    True,
    False,
    Predicate(PlacePredicate),
    And(Box<StateFormula>, Box<StateFormula>),
    Or(Box<StateFormula>, Box<StateFormula>),
    Not(Box<StateFormula>),
    /// Some successor transition satisfies the operand.
    Modal(Box<TransitionFormula>),
    ExistNext(Box<TransitionFormula>),
    /// `NOT(EXIST_NEXT(NOT φ))`, vacuously true without successors.
    ForallNext(Box<TransitionFormula>),
    /// Some successor transition satisfies the second operand and leads to a
    /// place satisfying the first.
    ExistModal(Box<StateFormula>, Box<TransitionFormula>),
    ForallModal(Box<StateFormula>, Box<TransitionFormula>),
    ExistUntil(Box<StateFormula>, Box<StateFormula>),
    ForallUntil(Box<StateFormula>, Box<StateFormula>),
    /// `FORALL_UNTIL(TT, φ)`
    Ev(Box<StateFormula>),
    /// `EXIST_UNTIL(TT, φ)`
    Pos(Box<StateFormula>),
    /// `NOT(POS(NOT φ))`
    Inv(Box<StateFormula>),
}

impl StateFormula {
    pub fn predicate(predicate: PlacePredicate) -> Self {
        Self::Predicate(predicate)
    }

    pub fn and(self, other: StateFormula) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: StateFormula) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    pub fn modal(inner: TransitionFormula) -> Self {
        Self::Modal(Box::new(inner))
    }

    pub fn exist_next(inner: TransitionFormula) -> Self {
        Self::ExistNext(Box::new(inner))
    }

    pub fn forall_next(inner: TransitionFormula) -> Self {
        Self::ForallNext(Box::new(inner))
    }

    pub fn exist_modal(next: StateFormula, between: TransitionFormula) -> Self {
        Self::ExistModal(Box::new(next), Box::new(between))
    }

    pub fn forall_modal(next: StateFormula, between: TransitionFormula) -> Self {
        Self::ForallModal(Box::new(next), Box::new(between))
    }

    pub fn exist_until(hold: StateFormula, reach: StateFormula) -> Self {
        Self::ExistUntil(Box::new(hold), Box::new(reach))
    }

    pub fn forall_until(hold: StateFormula, reach: StateFormula) -> Self {
        Self::ForallUntil(Box::new(hold), Box::new(reach))
    }

    pub fn ev(inner: StateFormula) -> Self {
        Self::Ev(Box::new(inner))
    }

    pub fn pos(inner: StateFormula) -> Self {
        Self::Pos(Box::new(inner))
    }

    pub fn inv(inner: StateFormula) -> Self {
        Self::Inv(Box::new(inner))
    }

    /// 在库所 `place` 上求值.
    ///
    /// Panics if `place` does not belong to the net `paths` was built from.
    pub fn evaluate(&self, place: PlaceId, paths: &PathSet) -> bool {
        self.explain(place, paths).holds
    }

    /// Evaluates and keeps the facts of the leaves that decided the result.
    pub fn explain<'a>(&'a self, place: PlaceId, paths: &PathSet) -> Evaluation<'a> {
        match self {
            Self::True => Evaluation::constant(true),
            Self::False => Evaluation::constant(false),
            Self::Predicate(predicate) => predicate.explain(paths.net().place(place)),
            Self::And(lhs, rhs) => lhs.explain(place, paths).and(|| rhs.explain(place, paths)),
            Self::Or(lhs, rhs) => lhs.explain(place, paths).or(|| rhs.explain(place, paths)),
            Self::Not(inner) => inner.explain(place, paths).negate(),
            Self::Modal(inner) | Self::ExistNext(inner) => {
                Evaluation::any(next_transitions(place, paths).map(|t| inner.explain(t, paths)))
            }
            Self::ForallNext(inner) => Evaluation::any(
                next_transitions(place, paths).map(|t| inner.explain(t, paths).negate()),
            )
            .negate(),
            Self::ExistModal(next, between) => {
                Evaluation::any(next_transitions(place, paths).map(|t| {
                    between.explain(t, paths).and(|| {
                        Evaluation::any(next_places(t, paths).map(|p| next.explain(p, paths)))
                    })
                }))
            }
            Self::ForallModal(next, between) => {
                Evaluation::all(next_transitions(place, paths).map(|t| {
                    between.explain(t, paths).and(|| {
                        Evaluation::all(next_places(t, paths).map(|p| next.explain(p, paths)))
                    })
                }))
            }
            Self::ExistUntil(hold, reach) => {
                until(paths, place.into(), Quantifier::Exists, at(hold, paths), at(reach, paths))
            }
            Self::ForallUntil(hold, reach) => {
                until(paths, place.into(), Quantifier::Forall, at(hold, paths), at(reach, paths))
            }
            Self::Ev(inner) => until(paths, place.into(), Quantifier::Forall, always, at(inner, paths)),
            Self::Pos(inner) => until(paths, place.into(), Quantifier::Exists, always, at(inner, paths)),
            Self::Inv(inner) => until(paths, place.into(), Quantifier::Exists, always, |node| {
                inner.explain_node(node, paths).negate()
            })
            .negate(),
        }
    }

    fn explain_node<'a>(&'a self, node: NodeRef, paths: &PathSet) -> Evaluation<'a> {
        match node.as_place() {
            Some(place) => self.explain(place, paths),
            None => Evaluation::constant(false),
        }
    }

    pub fn verdict(&self, place: PlaceId, paths: &PathSet) -> Verdict {
        self.explain(place, paths).into()
    }

    /// 规范的 S 表达式形式.
    pub fn write_formula(&self) -> String {
        self.to_string()
    }

    /// 叶子谓词的消息，深度优先.
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
    formula: &'a StateFormula,
    paths: &'p PathSet,
) -> impl Fn(NodeRef) -> Evaluation<'a> + use<'a, 'p> {
    move |node| formula.explain_node(node, paths)
}

fn always<'a>(_: NodeRef) -> Evaluation<'a> {
    Evaluation::constant(true)
}

fn next_transitions<'a>(place: PlaceId, paths: &'a PathSet) -> impl Iterator<Item = TransitionId> + 'a {
    paths
        .successors(place.into())
        .iter()
        .filter_map(|node| node.as_transition())
}

fn next_places<'a>(transition: TransitionId, paths: &'a PathSet) -> impl Iterator<Item = PlaceId> + 'a {
    paths
        .successors(transition.into())
        .iter()
        .filter_map(|node| node.as_place())
}

impl Not for StateFormula {
    type Output = StateFormula;

    fn not(self) -> Self::Output {
        StateFormula::Not(Box::new(self))
    }
}

impl fmt::Display for StateFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "TT"),
            Self::False => write!(f, "FF"),
            Self::Predicate(predicate) => write!(f, "(NF {})", predicate.name()),
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
