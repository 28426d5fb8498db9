use crate::actor::ActorHandle;

/// The host-side primitive that performs actual attribute writes.
///
/// Every method must tolerate empty or stale handles as a silent no-op, and
/// is assumed to marshal the write onto the host's single main execution
/// context in call order (FIFO). The runtime funnels all mutation through
/// this trait and never touches the host directly.
pub trait AttributeMutator {
    /// Set the uniform scale of a named attachment node. 1.0 is identity.
    fn apply_scale(&mut self, actor: ActorHandle, node_key: &str, factor: f32);

    /// Add `delta` to a blendable morph value. Deltas accumulate; the host
    /// owns the absolute value (see `MorphLedger`).
    fn apply_morph_delta(&mut self, actor: ActorHandle, morph_name: &str, delta: f32);

    /// Show or hide a named attachment. `vis_key` may be an exact name or a
    /// group alias the host expands (see `VisGroups`).
    fn apply_visibility(&mut self, actor: ActorHandle, vis_key: &str, visible: bool);

    /// Drop every morph delta this system has accumulated for `actor`.
    fn reset_all_morphs(&mut self, actor: ActorHandle);
}

/// One recorded mutator call, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum MutatorCall {
    Scale { actor: ActorHandle, node_key: String, factor: f32 },
    MorphDelta { actor: ActorHandle, morph_name: String, delta: f32 },
    Visibility { actor: ActorHandle, vis_key: String, visible: bool },
    ResetAllMorphs { actor: ActorHandle },
}

/// Mutator that records every call instead of touching a host.
///
/// The ordered log doubles as a model of the host's FIFO main-thread queue:
/// asserting on call order is how the reset-overtakes-stale-work assumption
/// is checked.
#[derive(Debug, Default)]
pub struct RecordingMutator {
    calls: Vec<MutatorCall>,
}

impl RecordingMutator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[MutatorCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<MutatorCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn scale_calls(&self) -> impl Iterator<Item = (&ActorHandle, &str, f32)> {
        self.calls.iter().filter_map(|call| match call {
            MutatorCall::Scale { actor, node_key, factor } => Some((actor, node_key.as_str(), *factor)),
            _ => None,
        })
    }

    pub fn morph_delta_sum(&self, actor: ActorHandle, morph_name: &str) -> f32 {
        self.calls
            .iter()
            .filter_map(|call| match call {
                MutatorCall::MorphDelta { actor: a, morph_name: m, delta }
                    if *a == actor && m == morph_name =>
                {
                    Some(*delta)
                }
                _ => None,
            })
            .sum()
    }
}

impl AttributeMutator for RecordingMutator {
    fn apply_scale(&mut self, actor: ActorHandle, node_key: &str, factor: f32) {
        self.calls.push(MutatorCall::Scale { actor, node_key: node_key.to_string(), factor });
    }

    fn apply_morph_delta(&mut self, actor: ActorHandle, morph_name: &str, delta: f32) {
        self.calls.push(MutatorCall::MorphDelta {
            actor,
            morph_name: morph_name.to_string(),
            delta,
        });
    }

    fn apply_visibility(&mut self, actor: ActorHandle, vis_key: &str, visible: bool) {
        self.calls.push(MutatorCall::Visibility { actor, vis_key: vis_key.to_string(), visible });
    }

    fn reset_all_morphs(&mut self, actor: ActorHandle) {
        self.calls.push(MutatorCall::ResetAllMorphs { actor });
    }
}
