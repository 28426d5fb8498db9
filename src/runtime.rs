use crate::actor::{ActorHandle, ActorId, Role};
use crate::mutator::AttributeMutator;
use crate::timeline::{CommandKind, TimedCommand};
use crate::tween::Tween;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Ceiling applied to a single tick's delta. A loading hitch or pause must
/// not dump seconds of backlog into one tick and fire a whole timeline at
/// once with stale visual results.
pub const MAX_STEP_SECONDS: f32 = 0.25;

/// Identity value scale restores go back to.
const SCALE_IDENTITY: f32 = 1.0;

/// Attribute keys one actor side has written during the current run.
/// Keys are owned strings; nothing in here borrows from config storage.
#[derive(Debug, Default, Clone)]
pub struct TouchedSet {
    pub scale_nodes: HashSet<String>,
    pub morphs: HashSet<String>,
    pub vis_keys: HashSet<String>,
}

impl TouchedSet {
    pub fn is_empty(&self) -> bool {
        self.scale_nodes.is_empty() && self.morphs.is_empty() && self.vis_keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scale_nodes.len() + self.morphs.len() + self.vis_keys.len()
    }
}

/// Touched accounting for both sides of the pair.
#[derive(Debug, Default, Clone)]
pub struct PairTouched {
    pub caster: TouchedSet,
    pub target: TouchedSet,
}

impl PairTouched {
    pub fn side(&self, role: Role) -> &TouchedSet {
        match role {
            Role::Caster => &self.caster,
            Role::Target => &self.target,
        }
    }

    fn side_mut(&mut self, role: Role) -> &mut TouchedSet {
        match role {
            Role::Caster => &mut self.caster,
            Role::Target => &mut self.target,
        }
    }
}

/// Per-caster bookkeeping. Created on first use, reset (not destroyed) on
/// cancel, never shared across casters.
#[derive(Debug, Default)]
struct RuntimeState {
    /// Generation token. Bumped on every start and cancel; work captured
    /// under an older token is dropped at its next checkpoint.
    token: u64,
    last_target: ActorHandle,
    touched: PairTouched,
}

/// The currently running timeline of one caster.
#[derive(Debug)]
struct ActiveTimeline {
    caster: ActorHandle,
    target: ActorHandle,
    token: u64,
    commands: Vec<TimedCommand>,
    cursor: usize,
    elapsed_seconds: f32,
    log_ops: bool,
}

/// Tick-driven scheduler for timed attribute timelines.
///
/// Single-threaded by contract: `start_timeline`, `update` and
/// `cancel_and_reset` must all be invoked from the host's update context.
/// Callers elsewhere hand off through the host's task queue first. The
/// runtime never blocks and never spawns work of its own; everything
/// advances inside `update`.
#[derive(Default)]
pub struct TimelineRuntime {
    states: HashMap<ActorId, RuntimeState>,
    active: HashMap<ActorId, ActiveTimeline>,
    tweens: HashMap<(ActorHandle, String), Tween>,
}

impl TimelineRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `commands` as the caster's active timeline under a fresh
    /// token. Any previous run for the same caster is cancelled by the token
    /// bump, even if its commands are mid-flight.
    ///
    /// An empty caster handle is a no-op: starting a timeline for an actor
    /// that no longer exists has no observable effect.
    pub fn start_timeline(
        &mut self,
        caster: ActorHandle,
        caster_id: ActorId,
        target: ActorHandle,
        commands: Vec<TimedCommand>,
        log_ops: bool,
    ) {
        if caster.is_empty() {
            return;
        }

        let st = self.states.entry(caster_id).or_default();
        st.token += 1;
        st.touched = PairTouched::default();
        st.last_target = target;

        if log_ops {
            info!(
                caster = %caster_id,
                target = %target,
                commands = commands.len(),
                token = st.token,
                "timeline start"
            );
        }

        self.active.insert(
            caster_id,
            ActiveTimeline {
                caster,
                target,
                token: st.token,
                commands,
                cursor: 0,
                elapsed_seconds: 0.0,
                log_ops,
            },
        );
    }

    /// Advance all active timelines and tweens by `dt` seconds.
    ///
    /// Non-positive deltas are rejected; pathological deltas are clamped to
    /// [`MAX_STEP_SECONDS`]. Per caster, every due command executes in
    /// ascending time order before that caster's tweens advance. A tween
    /// registered during this tick takes its first step on the next one.
    pub fn update(&mut self, dt: f32, mutator: &mut dyn AttributeMutator) {
        if dt <= 0.0 {
            return;
        }
        let dt = dt.min(MAX_STEP_SECONDS);

        let Self { states, active, tweens } = self;

        // Stale timelines should not normally exist (start/cancel remove or
        // replace them on the same thread), but the token check is cheap.
        active.retain(|caster_id, tl| {
            states.get(caster_id).is_some_and(|st| st.token == tl.token)
        });

        for (&caster_id, tl) in active.iter_mut() {
            tl.elapsed_seconds += dt;
            while tl.cursor < tl.commands.len()
                && tl.commands[tl.cursor].time_seconds <= tl.elapsed_seconds
            {
                let cmd = tl.commands[tl.cursor].clone();
                tl.cursor += 1;
                let entity = match cmd.role {
                    Role::Caster => tl.caster,
                    Role::Target => tl.target,
                };
                execute_command(states, tweens, mutator, caster_id, tl.token, entity, &cmd, tl.log_ops);
            }
        }

        // A fully consumed timeline leaves the active set; its tweens keep
        // running until they finish or the token is bumped.
        active.retain(|_, tl| tl.cursor < tl.commands.len());

        tweens.retain(|_, tw| {
            let current = states.get(&tw.owner).map_or(0, |st| st.token);
            if tw.token != current {
                if tw.log_ops {
                    debug!(owner = %tw.owner, morph = %tw.morph_name, "dropping stale tween");
                }
                return false;
            }
            if tw.fresh {
                tw.fresh = false;
                return true;
            }
            let step = tw.advance(dt);
            if step.step != 0.0 {
                mutator.apply_morph_delta(tw.entity, &tw.morph_name, step.step);
                if !tw.stepped {
                    tw.stepped = true;
                    if let Some(st) = states.get_mut(&tw.owner) {
                        st.touched.side_mut(tw.role).morphs.insert(tw.morph_name.clone());
                    }
                }
            }
            !step.finished
        });
    }

    /// Cancel the caster's run and restore exactly the attributes it
    /// touched.
    ///
    /// The token bump invalidates in-flight work; the active timeline and
    /// this caster's tweens are removed immediately rather than waiting for
    /// the next tick. Touched scale nodes go back to 1.0 and touched vis
    /// keys back to visible; morphs are cleared through the host's bulk
    /// reset only when the matching flag is set and a morph was actually
    /// written. Bookkeeping is cleared even when the handles are empty, so
    /// state never leaks for despawned actors.
    pub fn cancel_and_reset(
        &mut self,
        caster: ActorHandle,
        caster_id: ActorId,
        log_ops: bool,
        reset_morphs_caster: bool,
        reset_morphs_target: bool,
        mutator: &mut dyn AttributeMutator,
    ) {
        let st = self.states.entry(caster_id).or_default();
        st.token += 1;
        let last_target = std::mem::take(&mut st.last_target);
        let touched = std::mem::take(&mut st.touched);

        self.active.remove(&caster_id);
        self.tweens.retain(|_, tw| tw.owner != caster_id);

        restore_side(mutator, caster, &touched.caster, reset_morphs_caster);
        restore_side(mutator, last_target, &touched.target, reset_morphs_target);

        if log_ops {
            info!(
                caster = %caster_id,
                caster_keys = touched.caster.len(),
                target_keys = touched.target.len(),
                "cancel and reset"
            );
        }
    }

    /// Current generation token for a caster (0 when never seen).
    pub fn token(&self, caster_id: ActorId) -> u64 {
        self.states.get(&caster_id).map_or(0, |st| st.token)
    }

    /// Target recorded by the caster's most recent start.
    pub fn last_target(&self, caster_id: ActorId) -> ActorHandle {
        self.states.get(&caster_id).map_or(ActorHandle::EMPTY, |st| st.last_target)
    }

    /// Touched accounting for the caster's current run, if any state exists.
    pub fn touched(&self, caster_id: ActorId) -> Option<&PairTouched> {
        self.states.get(&caster_id).map(|st| &st.touched)
    }

    pub fn has_active_timeline(&self, caster_id: ActorId) -> bool {
        self.active.contains_key(&caster_id)
    }

    pub fn tween_count(&self) -> usize {
        self.tweens.len()
    }
}

fn execute_command(
    states: &mut HashMap<ActorId, RuntimeState>,
    tweens: &mut HashMap<(ActorHandle, String), Tween>,
    mutator: &mut dyn AttributeMutator,
    caster_id: ActorId,
    token: u64,
    entity: ActorHandle,
    cmd: &TimedCommand,
    log_ops: bool,
) {
    // Actors can legitimately disappear mid-timeline; an empty side is
    // skipped, never an error.
    if entity.is_empty() {
        return;
    }

    match &cmd.kind {
        CommandKind::Scale { node_key, factor } => {
            mutator.apply_scale(entity, node_key, *factor);
            if let Some(set) = touched_side(states, caster_id, cmd.role) {
                set.scale_nodes.insert(node_key.clone());
            }
            if log_ops {
                debug!(%entity, node = %node_key, factor = f64::from(*factor), role = cmd.role.label(), "scale");
            }
        }
        CommandKind::Visibility { vis_key, visible } => {
            mutator.apply_visibility(entity, vis_key, *visible);
            if let Some(set) = touched_side(states, caster_id, cmd.role) {
                set.vis_keys.insert(vis_key.clone());
            }
            if log_ops {
                debug!(%entity, key = %vis_key, visible, role = cmd.role.label(), "visibility");
            }
        }
        CommandKind::Morph { morph_name, delta, tween_seconds, curve: _ } => {
            if *tween_seconds > 0.0 {
                // At most one tween per (entity, morph); replacement is
                // unconditional and restarts from a zero applied base.
                tweens.insert(
                    (entity, morph_name.clone()),
                    Tween {
                        owner: caster_id,
                        token,
                        entity,
                        role: cmd.role,
                        morph_name: morph_name.clone(),
                        from_value: 0.0,
                        to_value: *delta,
                        elapsed_seconds: 0.0,
                        duration_seconds: *tween_seconds,
                        applied_so_far: 0.0,
                        stepped: false,
                        fresh: true,
                        log_ops,
                    },
                );
                if log_ops {
                    debug!(
                        %entity,
                        morph = %morph_name,
                        delta = f64::from(*delta),
                        tween_seconds = f64::from(*tween_seconds),
                        "tween registered"
                    );
                }
            } else {
                mutator.apply_morph_delta(entity, morph_name, *delta);
                if let Some(set) = touched_side(states, caster_id, cmd.role) {
                    set.morphs.insert(morph_name.clone());
                }
                if log_ops {
                    debug!(%entity, morph = %morph_name, delta = f64::from(*delta), role = cmd.role.label(), "morph");
                }
            }
        }
    }
}

fn touched_side(
    states: &mut HashMap<ActorId, RuntimeState>,
    caster_id: ActorId,
    role: Role,
) -> Option<&mut TouchedSet> {
    states.get_mut(&caster_id).map(|st| st.touched.side_mut(role))
}

fn restore_side(
    mutator: &mut dyn AttributeMutator,
    entity: ActorHandle,
    touched: &TouchedSet,
    reset_morphs: bool,
) {
    if entity.is_empty() {
        return;
    }
    for node_key in &touched.scale_nodes {
        mutator.apply_scale(entity, node_key, SCALE_IDENTITY);
    }
    for vis_key in &touched.vis_keys {
        mutator.apply_visibility(entity, vis_key, true);
    }
    if reset_morphs && !touched.morphs.is_empty() {
        mutator.reset_all_morphs(entity);
    }
}
