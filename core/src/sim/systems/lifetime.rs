//! Destroys temporary entities whose lifetime has run out

use crate::sim::SimulationState;

pub fn run(state: &mut SimulationState) {
    let mut expired = Vec::new();
    for id in state.lifetimes.sorted_ids() {
        let Some(ttl) = state.lifetimes.get_mut(id) else {
            continue;
        };
        if ttl.frames_remaining == 0 {
            expired.push(id);
        } else {
            ttl.frames_remaining -= 1;
        }
    }
    for id in expired {
        state.despawn(id);
    }
}
