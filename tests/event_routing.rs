use stagehand::{
    ActorHandle, ActorId, AttributeMutator, EventRouter, MorphLedger, MutatorCall, RecordingMutator,
    Role, StageConfig, TargetResolver, TimedCommand, TimelineRuntime, VisGroups,
};
use std::collections::HashMap;
use std::sync::Arc;

fn caster() -> ActorHandle {
    ActorHandle::new(0x30)
}

fn caster_id() -> ActorId {
    ActorId(0xBEEF)
}

fn partner() -> ActorHandle {
    ActorHandle::new(0x40)
}

/// Resolver that always finds the same partner, counting invocations.
#[derive(Default)]
struct FixedResolver {
    partner: ActorHandle,
    calls: std::cell::Cell<usize>,
}

impl FixedResolver {
    fn new(partner: ActorHandle) -> Self {
        Self { partner, calls: std::cell::Cell::new(0) }
    }
}

impl TargetResolver for FixedResolver {
    fn resolve(&self, _caster: ActorHandle) -> ActorHandle {
        self.calls.set(self.calls.get() + 1);
        self.partner
    }
}

fn config_with(
    events: &[(&str, &str)],
    timelines: &[(&str, Vec<TimedCommand>)],
) -> Arc<StageConfig> {
    let mut cfg = StageConfig::default();
    cfg.debug.log_ops = false;
    cfg.debug.log_config = false;
    cfg.debug.log_timeline_start = false;
    cfg.events =
        events.iter().map(|(tag, name)| (tag.to_string(), name.to_string())).collect();
    cfg.timelines =
        timelines.iter().map(|(name, cmds)| (name.to_string(), cmds.clone())).collect();
    Arc::new(cfg)
}

#[test]
fn mapped_tag_starts_its_timeline() {
    let config = config_with(
        &[("HugA", "hug")],
        &[("hug", vec![TimedCommand::scale(Role::Caster, 0.0, "Head", 0.5)])],
    );
    let router = EventRouter::new(config);
    let mut runtime = TimelineRuntime::new();
    let mut mutator = RecordingMutator::new();
    let resolver = FixedResolver::new(partner());

    // Hosts read resolver tuning straight off the routed config.
    assert_eq!(router.config().general.target_resolve_max_dist, 250.0);

    router.handle_event(&mut runtime, &mut mutator, &resolver, caster(), caster_id(), "HugA");
    assert!(runtime.has_active_timeline(caster_id()));

    runtime.update(0.1, &mut mutator);
    assert_eq!(mutator.scale_calls().count(), 1);
}

#[test]
fn unmapped_tags_do_nothing() {
    let config = config_with(
        &[("HugA", "hug")],
        &[("hug", vec![TimedCommand::scale(Role::Caster, 0.0, "Head", 0.5)])],
    );
    let router = EventRouter::new(config);
    let mut runtime = TimelineRuntime::new();
    let mut mutator = RecordingMutator::new();
    let resolver = FixedResolver::new(partner());

    router.handle_event(&mut runtime, &mut mutator, &resolver, caster(), caster_id(), "Footstep");
    assert!(!runtime.has_active_timeline(caster_id()));
    assert_eq!(runtime.token(caster_id()), 0);
}

#[test]
fn disabled_timelines_route_nothing() {
    let mut cfg = StageConfig::default();
    cfg.general.enable_timelines = false;
    cfg.events.insert("HugA".to_string(), "hug".to_string());
    cfg.timelines.insert(
        "hug".to_string(),
        vec![TimedCommand::scale(Role::Caster, 0.0, "Head", 0.5)],
    );
    let router = EventRouter::new(Arc::new(cfg));
    let mut runtime = TimelineRuntime::new();
    let mut mutator = RecordingMutator::new();
    let resolver = FixedResolver::new(partner());

    router.handle_event(&mut runtime, &mut mutator, &resolver, caster(), caster_id(), "HugA");
    assert!(!runtime.has_active_timeline(caster_id()));
}

#[test]
fn target_is_resolved_only_when_the_timeline_needs_one() {
    let config = config_with(
        &[("Paired", "paired"), ("Solo", "solo")],
        &[
            ("paired", vec![TimedCommand::scale(Role::Target, 0.0, "Head", 0.5)]),
            ("solo", vec![TimedCommand::scale(Role::Caster, 0.0, "Head", 0.5)]),
        ],
    );
    let router = EventRouter::new(config);
    let mut runtime = TimelineRuntime::new();
    let mut mutator = RecordingMutator::new();
    let resolver = FixedResolver::new(partner());

    router.handle_event(&mut runtime, &mut mutator, &resolver, caster(), caster_id(), "Solo");
    assert_eq!(resolver.calls.get(), 0, "caster-only timelines skip the spatial search");
    assert_eq!(runtime.last_target(caster_id()), ActorHandle::EMPTY);

    router.handle_event(&mut runtime, &mut mutator, &resolver, caster(), caster_id(), "Paired");
    assert_eq!(resolver.calls.get(), 1);
    assert_eq!(runtime.last_target(caster_id()), partner());

    // A later caster-only start keeps the previously resolved partner.
    router.handle_event(&mut runtime, &mut mutator, &resolver, caster(), caster_id(), "Solo");
    assert_eq!(resolver.calls.get(), 1);
    assert_eq!(runtime.last_target(caster_id()), partner());
}

#[test]
fn pair_end_cancels_and_resets_with_the_configured_flags() {
    let config = config_with(
        &[("HugA", "hug")],
        &[("hug", vec![
            TimedCommand::scale(Role::Caster, 0.0, "Head", 0.5),
            TimedCommand::morph(Role::Caster, 0.0, "Belly", 10.0, 0.0),
        ])],
    );
    let router = EventRouter::new(config);
    let mut runtime = TimelineRuntime::new();
    let mut mutator = RecordingMutator::new();
    let resolver = FixedResolver::new(partner());

    router.handle_event(&mut runtime, &mut mutator, &resolver, caster(), caster_id(), "HugA");
    runtime.update(0.1, &mut mutator);
    mutator.take_calls();

    router.handle_event(&mut runtime, &mut mutator, &resolver, caster(), caster_id(), "PairEnd");

    let calls = mutator.take_calls();
    assert!(calls.contains(&MutatorCall::Scale {
        actor: caster(),
        node_key: "Head".to_string(),
        factor: 1.0
    }));
    assert!(calls.contains(&MutatorCall::ResetAllMorphs { actor: caster() }));
    assert!(!runtime.has_active_timeline(caster_id()));
}

#[test]
fn morph_reset_respects_the_disabled_flag() {
    let mut cfg = StageConfig::default();
    cfg.debug.log_ops = false;
    cfg.debug.log_timeline_start = false;
    cfg.general.reset_morphs_on_pair_end = false;
    cfg.events.insert("HugA".to_string(), "hug".to_string());
    cfg.timelines.insert(
        "hug".to_string(),
        vec![TimedCommand::morph(Role::Caster, 0.0, "Belly", 10.0, 0.0)],
    );
    let router = EventRouter::new(Arc::new(cfg));
    let mut runtime = TimelineRuntime::new();
    let mut mutator = RecordingMutator::new();
    let resolver = FixedResolver::new(partner());

    router.handle_event(&mut runtime, &mut mutator, &resolver, caster(), caster_id(), "HugA");
    runtime.update(0.1, &mut mutator);
    router.handle_event(&mut runtime, &mut mutator, &resolver, caster(), caster_id(), "PairEnd");

    assert!(
        !mutator.calls().iter().any(|call| matches!(call, MutatorCall::ResetAllMorphs { .. })),
        "morph clearing is gated because it can be expensive and visible"
    );
}

#[test]
fn reload_swaps_the_event_map() {
    let before = config_with(
        &[("HugA", "hug")],
        &[("hug", vec![TimedCommand::scale(Role::Caster, 0.0, "Head", 0.5)])],
    );
    let after = config_with(
        &[("SqueezeB", "hug")],
        &[("hug", vec![TimedCommand::scale(Role::Caster, 0.0, "Head", 0.5)])],
    );
    let mut router = EventRouter::new(before);
    let mut runtime = TimelineRuntime::new();
    let mut mutator = RecordingMutator::new();
    let resolver = FixedResolver::new(partner());

    router.set_config(after);
    router.handle_event(&mut runtime, &mut mutator, &resolver, caster(), caster_id(), "HugA");
    assert!(!runtime.has_active_timeline(caster_id()), "old mapping must be gone");
    router.handle_event(&mut runtime, &mut mutator, &resolver, caster(), caster_id(), "SqueezeB");
    assert!(runtime.has_active_timeline(caster_id()));
}

/// Host-style mutator: routes morph deltas through a ledger and expands vis
/// keys through the group table, the way an engine binding would.
struct HarnessMutator {
    ledger: MorphLedger,
    vis_groups: VisGroups,
    visibility: HashMap<(ActorHandle, String), bool>,
    scales: HashMap<(ActorHandle, String), f32>,
}

impl HarnessMutator {
    fn new(vis_groups: VisGroups) -> Self {
        Self {
            ledger: MorphLedger::new(),
            vis_groups,
            visibility: HashMap::new(),
            scales: HashMap::new(),
        }
    }
}

impl AttributeMutator for HarnessMutator {
    fn apply_scale(&mut self, actor: ActorHandle, node_key: &str, factor: f32) {
        if actor.is_empty() {
            return;
        }
        self.scales.insert((actor, node_key.to_string()), factor);
    }

    fn apply_morph_delta(&mut self, actor: ActorHandle, morph_name: &str, delta: f32) {
        if actor.is_empty() {
            return;
        }
        self.ledger.apply_delta(actor, morph_name, delta);
    }

    fn apply_visibility(&mut self, actor: ActorHandle, vis_key: &str, visible: bool) {
        if actor.is_empty() {
            return;
        }
        let names: Vec<String> =
            self.vis_groups.resolve(vis_key).map(str::to_string).collect();
        for name in names {
            self.visibility.insert((actor, name), visible);
        }
    }

    fn reset_all_morphs(&mut self, actor: ActorHandle) {
        self.ledger.clear_actor(actor);
    }
}

#[test]
fn host_harness_sees_absolute_values_and_expanded_groups() {
    let mut vis_groups = VisGroups::new();
    vis_groups.insert("LeftLeg", ["LThigh".to_string(), "LCalf".to_string()]);

    let config = config_with(
        &[("Swallow", "swallow")],
        &[("swallow", vec![
            TimedCommand::visibility(Role::Caster, 0.0, "LeftLeg", false),
            TimedCommand::morph(Role::Caster, 0.0, "Belly", 20.0, 1.0),
            TimedCommand::morph(Role::Caster, 0.5, "Belly", 15.0, 0.0),
        ])],
    );
    let router = EventRouter::new(config);
    let mut runtime = TimelineRuntime::new();
    let mut host = HarnessMutator::new(vis_groups);
    let resolver = FixedResolver::new(partner());

    router.handle_event(&mut runtime, &mut host, &resolver, caster(), caster_id(), "Swallow");
    for _ in 0..8 {
        runtime.update(0.25, &mut host);
    }

    assert_eq!(host.visibility.get(&(caster(), "LThigh".to_string())), Some(&false));
    assert_eq!(host.visibility.get(&(caster(), "LCalf".to_string())), Some(&false));
    assert!(
        !host.visibility.contains_key(&(caster(), "LeftLeg".to_string())),
        "the alias itself is not an attachment"
    );
    // 20 tweened plus 15 instant, accumulated into one absolute slider value.
    assert_eq!(host.ledger.value(caster(), "Belly"), 35.0);

    router.handle_event(&mut runtime, &mut host, &resolver, caster(), caster_id(), "PairEnd");
    assert_eq!(host.ledger.value(caster(), "Belly"), 0.0, "bulk reset clears the ledger");
    assert_eq!(host.scales.len(), 0, "no scales were touched, none restored");
    assert_eq!(host.visibility.get(&(caster(), "LThigh".to_string())), Some(&true), "touched vis restores to visible");
}
