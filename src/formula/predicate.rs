use std::fmt;
use std::sync::Arc;

use crate::formula::Evaluation;
use crate::net::{Place, Transition};

/// Caller-supplied test on a single node, the leaf of every formula.
///
/// `name` appears in the canonical rendering. `message` states the fact when
/// the test holds and `negation` when it does not; whichever applies is
/// reported when the leaf decides a failed evaluation.
pub struct NodePredicate<N> {
    name: String,
    message: String,
    negation: String,
    check: Arc<dyn Fn(&N) -> bool + Send + Sync>,
}

pub type PlacePredicate = NodePredicate<Place>;
pub type TransitionPredicate = NodePredicate<Transition>;

impl<N> NodePredicate<N> {
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
        check: impl Fn(&N) -> bool + Send + Sync + 'static,
    ) -> Self {
        let message = message.into();
        Self {
            name: name.into(),
            negation: format!("not: {message}"),
            message,
            check: Arc::new(check),
        }
    }

    /// 替换谓词不成立时报告的事实.
    pub fn with_negation(mut self, negation: impl Into<String>) -> Self {
        self.negation = negation.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn negation(&self) -> &str {
        &self.negation
    }

    pub fn test(&self, node: &N) -> bool {
        (self.check)(node)
    }

    pub(crate) fn explain(&self, node: &N) -> Evaluation<'_> {
        if self.test(node) {
            Evaluation::leaf(true, &self.message)
        } else {
            Evaluation::leaf(false, &self.negation)
        }
    }
}

impl TransitionPredicate {
    pub fn reads(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        let negation = format!("resource {resource} is not read");
        Self::new(
            format!("reads:{resource}"),
            format!("resource {resource} is read"),
            move |t: &Transition| t.context.as_ref().is_some_and(|c| c.reads(&resource)),
        )
        .with_negation(negation)
    }

    pub fn writes(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        let negation = format!("resource {resource} is not written");
        Self::new(
            format!("writes:{resource}"),
            format!("resource {resource} is written"),
            move |t: &Transition| t.context.as_ref().is_some_and(|c| c.writes(&resource)),
        )
        .with_negation(negation)
    }

    pub fn erases(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        let negation = format!("resource {resource} is not erased");
        Self::new(
            format!("erases:{resource}"),
            format!("resource {resource} is erased"),
            move |t: &Transition| t.context.as_ref().is_some_and(|c| c.erases(&resource)),
        )
        .with_negation(negation)
    }

    pub fn tagged(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let negation = format!("tag {tag} is missing");
        Self::new(
            format!("tag:{tag}"),
            format!("transition carries tag {tag}"),
            move |t: &Transition| t.context.as_ref().is_some_and(|c| c.has_tag(&tag)),
        )
        .with_negation(negation)
    }
}

impl PlacePredicate {
    pub fn marked() -> Self {
        Self::new("marked", "place holds a marker", |p: &Place| p.markers > 0)
            .with_negation("place holds no marker")
    }
}

// Manual impls: derive would demand `N: Clone` / `N: Debug`.
impl<N> Clone for NodePredicate<N> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            message: self.message.clone(),
            negation: self.negation.clone(),
            check: Arc::clone(&self.check),
        }
    }
}

impl<N> fmt::Debug for NodePredicate<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodePredicate")
            .field("name", &self.name)
            .field("message", &self.message)
            .field("negation", &self.negation)
            .finish_non_exhaustive()
    }
}

/// Predicates compare by name and messages; the closure is opaque.
impl<N> PartialEq for NodePredicate<N> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.message == other.message && self.negation == other.negation
    }
}

impl<N> Eq for NodePredicate<N> {}
