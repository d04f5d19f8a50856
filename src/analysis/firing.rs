//! 发生规则：单迁移发生与全部可发生迁移的同步批量发生.
use log::{debug, warn};
use thiserror::Error;

use crate::net::{Idx, PetriNet, PlaceId, TransitionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FireError {
    #[error("transition {0:?} is not enabled under the current marking")]
    NotEnabled(TransitionId),
}

impl PetriNet {
    /// Every input place holds at least one marker. A transition without
    /// input places is always enabled.
    pub fn is_enabled(&self, transition: TransitionId) -> bool {
        self.preset(transition)
            .all(|place| self.place(place).markers > 0)
    }

    pub fn enabled_transitions(&self) -> Vec<TransitionId> {
        self.transitions
            .indices()
            .filter(|transition| self.is_enabled(*transition))
            .collect()
    }

    /// 在当前托肯上单独发生一个迁移.
    pub fn fire_transition(&mut self, transition: TransitionId) -> Result<(), FireError> {
        if !self.is_enabled(transition) {
            return Err(FireError::NotEnabled(transition));
        }
        let (inputs, outputs) = self.io_places(transition);
        for place in inputs {
            self.places[place].markers = self.places[place].markers.saturating_sub(1);
        }
        for place in outputs {
            self.places[place].markers += 1;
        }
        Ok(())
    }

    /// One synchronous step: all transitions enabled before the step fire as
    /// a batch. Returns the fired transitions.
    pub fn fire(&mut self) -> Vec<TransitionId> {
        let enabled = self.enabled_transitions();
        let mut delta = vec![0i64; self.places_len()];

        for transition in &enabled {
            let (inputs, outputs) = self.io_places(*transition);
            for place in inputs {
                delta[place.index()] -= 1;
            }
            for place in outputs {
                delta[place.index()] += 1;
            }
        }

        for (place, change) in self.places.iter_mut().zip(delta) {
            let after = place.markers as i64 + change;
            if after < 0 {
                warn!(
                    "place {} drained by {} competing transitions, clamped to zero",
                    place.id, -change
                );
            }
            place.markers = after.max(0) as u64;
        }
        debug!("batched step fired {} transitions", enabled.len());
        enabled
    }

    /// 输入与输出库所，每条弧一项.
    fn io_places(&self, transition: TransitionId) -> (Vec<PlaceId>, Vec<PlaceId>) {
        (
            self.preset(transition).collect(),
            self.postset(transition).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{Place, Transition};

    /// p0 feeds both t0 and t1; t0 -> p1, t1 -> p2.
    fn conflict() -> (PetriNet, [PlaceId; 3], [TransitionId; 2]) {
        let mut net = PetriNet::new("conflict");
        let p0 = net.add_place(Place::new("p0", 1));
        let p1 = net.add_place(Place::new("p1", 0));
        let p2 = net.add_place(Place::new("p2", 0));
        let t0 = net.add_transition(Transition::new("t0"));
        let t1 = net.add_transition(Transition::new("t1"));
        net.add_arc(p0, t0).unwrap();
        net.add_arc(p0, t1).unwrap();
        net.add_arc(t0, p1).unwrap();
        net.add_arc(t1, p2).unwrap();
        (net, [p0, p1, p2], [t0, t1])
    }

    #[test]
    fn enabling_requires_every_input_marked() {
        let (mut net, [p0, p1, _], [t0, _]) = conflict();
        let join = net.add_transition(Transition::new("join"));
        net.add_arc(p0, join).unwrap();
        net.add_arc(p1, join).unwrap();

        assert!(net.is_enabled(t0));
        assert!(!net.is_enabled(join));
        assert_eq!(net.enabled_transitions().len(), 2);
    }

    #[test]
    fn single_firing_moves_one_marker() {
        let (mut net, [p0, p1, p2], [t0, t1]) = conflict();
        net.fire_transition(t0).unwrap();

        assert_eq!(net.place(p0).markers, 0);
        assert_eq!(net.place(p1).markers, 1);
        assert_eq!(net.place(p2).markers, 0);
        assert_eq!(net.fire_transition(t1), Err(FireError::NotEnabled(t1)));
    }

    #[test]
    fn batched_step_fires_all_enabled_transitions() {
        let (mut net, [p0, p1, p2], _) = conflict();
        let fired = net.fire();

        assert_eq!(fired.len(), 2);
        assert_eq!(net.place(p0).markers, 0);
        assert_eq!(net.place(p1).markers, 1);
        assert_eq!(net.place(p2).markers, 1);
        assert!(net.fire().is_empty());
    }
}
