use crate::actor::{ActorHandle, ActorId, TargetResolver};
use crate::config::StageConfig;
use crate::mutator::AttributeMutator;
use crate::runtime::TimelineRuntime;
use crate::timeline::TimedCommand;
use std::sync::Arc;
use tracing::{info, warn};

/// Routes host animation-event tags into scheduler calls.
///
/// One router serves every caster; the config is shared and swapped whole on
/// hot reload so a reload never tears a half-read config.
pub struct EventRouter {
    config: Arc<StageConfig>,
}

impl EventRouter {
    pub fn new(config: Arc<StageConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: Arc<StageConfig>) {
        self.config = config;
    }

    /// React to one animation event raised by `caster`.
    ///
    /// A tag mapped in the event table starts its timeline. The pair-end and
    /// paired-stop tags then cancel and reset, when their flags are on. Start
    /// runs before reset so a tag that is both mapped and a reset tag ends up
    /// cancelled, matching a restart-then-stop reading of the event.
    pub fn handle_event(
        &self,
        runtime: &mut TimelineRuntime,
        mutator: &mut dyn AttributeMutator,
        resolver: &dyn TargetResolver,
        caster: ActorHandle,
        caster_id: ActorId,
        tag: &str,
    ) {
        let cfg = &self.config;
        if !cfg.general.enable_timelines {
            return;
        }

        if let Some(timeline_name) = cfg.events.get(tag) {
            match cfg.timeline(timeline_name) {
                Some(commands) => {
                    self.start_timeline(runtime, resolver, caster, caster_id, tag, timeline_name, commands.to_vec());
                }
                None => {
                    if cfg.debug.strict {
                        warn!(event = %tag, timeline = %timeline_name, "mapped timeline not found");
                    }
                }
            }
        }

        if cfg.general.reset_on_pair_end && tag == cfg.general.pair_end_event {
            runtime.cancel_and_reset(
                caster,
                caster_id,
                cfg.debug.log_ops,
                cfg.general.reset_morphs_on_pair_end,
                cfg.general.reset_morphs_on_pair_end,
                mutator,
            );
        }
        if cfg.general.reset_on_paired_stop && tag == cfg.general.paired_stop_event {
            runtime.cancel_and_reset(
                caster,
                caster_id,
                cfg.debug.log_ops,
                cfg.general.reset_morphs_on_paired_stop,
                cfg.general.reset_morphs_on_paired_stop,
                mutator,
            );
        }
    }

    fn start_timeline(
        &self,
        runtime: &mut TimelineRuntime,
        resolver: &dyn TargetResolver,
        caster: ActorHandle,
        caster_id: ActorId,
        tag: &str,
        timeline_name: &str,
        commands: Vec<TimedCommand>,
    ) {
        let cfg = &self.config;

        // Resolving a partner costs a spatial search; only pay for it when
        // the timeline actually addresses the target. Caster-only timelines
        // keep whatever target the previous run recorded.
        let target = if TimedCommand::any_target_role(&commands) {
            let resolved = resolver.resolve(caster);
            if cfg.debug.log_target_resolve {
                info!(%caster, target = %resolved, "target resolve");
            }
            resolved
        } else {
            runtime.last_target(caster_id)
        };

        if cfg.debug.log_timeline_start {
            info!(
                event = %tag,
                timeline = %timeline_name,
                caster = %caster_id,
                commands = commands.len(),
                "starting timeline"
            );
        }

        runtime.start_timeline(caster, caster_id, target, commands, cfg.debug.log_ops);
    }
}
