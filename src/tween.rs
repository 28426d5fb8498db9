use crate::actor::{ActorHandle, ActorId, Role};

/// An in-flight linear interpolation of one morph delta.
///
/// The runtime owns tweens and keys them by (entity, morph name); starting a
/// new tween for the same key replaces the old one. `applied_so_far` tracks
/// how much of the span has already been handed to the mutator so each tick
/// only issues the increment.
#[derive(Debug, Clone)]
pub(crate) struct Tween {
    /// Caster whose timeline registered this tween.
    pub owner: ActorId,
    /// Generation token captured at registration. Checked against the
    /// owner's current token before every advance.
    pub token: u64,
    pub entity: ActorHandle,
    pub role: Role,
    pub morph_name: String,
    pub from_value: f32,
    pub to_value: f32,
    pub elapsed_seconds: f32,
    pub duration_seconds: f32,
    pub applied_so_far: f32,
    /// Set once the first non-zero step has been issued; touched-marking
    /// waits for it so cancelled-before-visible tweens reset nothing.
    pub stepped: bool,
    /// Registered during the current tick; skips one advance so the first
    /// step lands on the following tick.
    pub fresh: bool,
    pub log_ops: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TweenStep {
    /// Incremental delta to hand to the mutator. May be zero.
    pub step: f32,
    /// True once the tween has reached its end value.
    pub finished: bool,
}

impl Tween {
    pub fn advance(&mut self, dt: f32) -> TweenStep {
        self.elapsed_seconds += dt;
        let alpha = if self.duration_seconds <= 0.0 {
            1.0
        } else {
            (self.elapsed_seconds / self.duration_seconds).clamp(0.0, 1.0)
        };
        let target = self.from_value + (self.to_value - self.from_value) * alpha;
        let step = target - self.applied_so_far;
        self.applied_so_far = target;
        TweenStep { step, finished: alpha >= 1.0 }
    }
}
