use crate::actor::Role;
use crate::timeline::{CommandKind, TimedCommand, TweenCurve};
use crate::vis::VisGroups;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Hard bounds applied to authored values at load time. The morph ledger
/// clamps accumulated values separately; these only keep single commands
/// sane.
const SCALE_FACTOR_MIN: f32 = 0.0;
const SCALE_FACTOR_MAX: f32 = 5.0;
const MORPH_DELTA_LIMIT: f32 = 1000.0;

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "GeneralConfig::default_enable_timelines")]
    pub enable_timelines: bool,
    #[serde(default = "GeneralConfig::default_reset_on_pair_end")]
    pub reset_on_pair_end: bool,
    #[serde(default = "GeneralConfig::default_reset_on_paired_stop")]
    pub reset_on_paired_stop: bool,
    #[serde(default = "GeneralConfig::default_reset_morphs_on_pair_end")]
    pub reset_morphs_on_pair_end: bool,
    #[serde(default = "GeneralConfig::default_reset_morphs_on_paired_stop")]
    pub reset_morphs_on_paired_stop: bool,
    #[serde(default = "GeneralConfig::default_pair_end_event")]
    pub pair_end_event: String,
    #[serde(default = "GeneralConfig::default_paired_stop_event")]
    pub paired_stop_event: String,
    /// Forwarded to the host's target resolver; the runtime itself never
    /// reads it.
    #[serde(default = "GeneralConfig::default_target_resolve_max_dist")]
    pub target_resolve_max_dist: f32,
}

impl GeneralConfig {
    const fn default_enable_timelines() -> bool {
        true
    }

    const fn default_reset_on_pair_end() -> bool {
        true
    }

    const fn default_reset_on_paired_stop() -> bool {
        true
    }

    const fn default_reset_morphs_on_pair_end() -> bool {
        true
    }

    const fn default_reset_morphs_on_paired_stop() -> bool {
        true
    }

    fn default_pair_end_event() -> String {
        "PairEnd".to_string()
    }

    fn default_paired_stop_event() -> String {
        "PairedStop".to_string()
    }

    const fn default_target_resolve_max_dist() -> f32 {
        250.0
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enable_timelines: Self::default_enable_timelines(),
            reset_on_pair_end: Self::default_reset_on_pair_end(),
            reset_on_paired_stop: Self::default_reset_on_paired_stop(),
            reset_morphs_on_pair_end: Self::default_reset_morphs_on_pair_end(),
            reset_morphs_on_paired_stop: Self::default_reset_morphs_on_paired_stop(),
            pair_end_event: Self::default_pair_end_event(),
            paired_stop_event: Self::default_paired_stop_event(),
            target_resolve_max_dist: Self::default_target_resolve_max_dist(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DebugConfig {
    /// Warn about malformed or unresolvable timeline entries while loading.
    #[serde(default = "DebugConfig::default_strict")]
    pub strict: bool,
    #[serde(default = "DebugConfig::default_log_ops")]
    pub log_ops: bool,
    #[serde(default = "DebugConfig::default_log_config")]
    pub log_config: bool,
    #[serde(default = "DebugConfig::default_log_timeline_start")]
    pub log_timeline_start: bool,
    #[serde(default)]
    pub log_target_resolve: bool,
}

impl DebugConfig {
    const fn default_strict() -> bool {
        true
    }

    const fn default_log_ops() -> bool {
        true
    }

    const fn default_log_config() -> bool {
        true
    }

    const fn default_log_timeline_start() -> bool {
        true
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            strict: Self::default_strict(),
            log_ops: Self::default_log_ops(),
            log_config: Self::default_log_config(),
            log_timeline_start: Self::default_log_timeline_start(),
            log_target_resolve: false,
        }
    }
}

/// Compiled configuration: flags plus ready-to-run timelines.
///
/// Timeline commands come out sorted ascending by offset with all authored
/// values clamped, so the runtime can take them as-is.
#[derive(Debug, Clone, Default)]
pub struct StageConfig {
    pub general: GeneralConfig,
    pub debug: DebugConfig,
    /// Animation event tag to timeline name.
    pub events: HashMap<String, String>,
    pub timelines: HashMap<String, Vec<TimedCommand>>,
    pub vis_groups: VisGroups,
}

impl StageConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read timeline config {}", path.display()))?;
        let raw: RawConfig = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse timeline config {}", path.display()))?;
        let cfg = compile(raw);
        if cfg.debug.log_config {
            info!(
                path = %path.display(),
                events = cfg.events.len(),
                timelines = cfg.timelines.len(),
                vis_groups = cfg.vis_groups.len(),
                "timeline config loaded"
            );
        }
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!(error = ?err, "timeline config load failed, using defaults");
                Self::default()
            }
        }
    }

    pub fn timeline(&self, name: &str) -> Option<&[TimedCommand]> {
        self.timelines.get(name).map(Vec::as_slice)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    general: GeneralConfig,
    #[serde(default)]
    debug: DebugConfig,
    #[serde(default)]
    events: HashMap<String, String>,
    /// Author key to canonical attachment-node name. Scale entries must use
    /// a known author key.
    #[serde(default)]
    node_keys: HashMap<String, String>,
    #[serde(default)]
    vis_groups: HashMap<String, Vec<String>>,
    /// Author key to real morph name, for morph names that contain spaces or
    /// other characters awkward to author.
    #[serde(default)]
    morph_aliases: HashMap<String, String>,
    #[serde(default)]
    timelines: HashMap<String, Vec<CommandSpec>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum RoleSpec {
    #[default]
    Caster,
    Target,
}

impl From<RoleSpec> for Role {
    fn from(spec: RoleSpec) -> Self {
        match spec {
            RoleSpec::Caster => Role::Caster,
            RoleSpec::Target => Role::Target,
        }
    }
}

/// Curve names accepted by the parser. Only `linear` survives validation;
/// the rest are reserved and their entries are dropped with a warning.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum CurveSpec {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

#[derive(Debug, Clone, Deserialize)]
struct ScaleSpec {
    node: String,
    factor: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct MorphSpec {
    name: String,
    delta: f32,
    #[serde(default)]
    tween: f32,
    #[serde(default)]
    curve: CurveSpec,
}

#[derive(Debug, Clone, Deserialize)]
struct VisSpec {
    key: String,
    visible: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct CommandSpec {
    at: f32,
    #[serde(default)]
    role: RoleSpec,
    #[serde(default)]
    scale: Option<ScaleSpec>,
    #[serde(default)]
    morph: Option<MorphSpec>,
    #[serde(default)]
    visibility: Option<VisSpec>,
}

fn compile(raw: RawConfig) -> StageConfig {
    let RawConfig { general, debug, events, node_keys, vis_groups, morph_aliases, timelines } = raw;
    let strict = debug.strict;

    let mut compiled: HashMap<String, Vec<TimedCommand>> = HashMap::new();
    for (name, specs) in timelines {
        let mut commands: Vec<TimedCommand> = specs
            .into_iter()
            .filter_map(|spec| compile_command(&name, spec, &node_keys, &morph_aliases, strict))
            .collect();
        commands.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));
        compiled.insert(name, commands);
    }

    if strict {
        for (tag, timeline_name) in &events {
            if !compiled.contains_key(timeline_name) {
                warn!(event = %tag, timeline = %timeline_name, "event maps to a timeline that does not exist");
            }
        }
    }

    StageConfig {
        general,
        debug,
        events,
        timelines: compiled,
        vis_groups: VisGroups::from_map(vis_groups),
    }
}

fn compile_command(
    timeline: &str,
    spec: CommandSpec,
    node_keys: &HashMap<String, String>,
    morph_aliases: &HashMap<String, String>,
    strict: bool,
) -> Option<TimedCommand> {
    let CommandSpec { at, role, scale, morph, visibility } = spec;
    let actions =
        usize::from(scale.is_some()) + usize::from(morph.is_some()) + usize::from(visibility.is_some());
    if actions != 1 {
        if strict {
            warn!(timeline, at = f64::from(at), actions, "timeline entry must carry exactly one action");
        }
        return None;
    }

    let time_seconds = at.max(0.0);
    let role = Role::from(role);

    if let Some(scale) = scale {
        let Some(node_key) = node_keys.get(&scale.node) else {
            if strict {
                warn!(timeline, node = %scale.node, "unknown node key in scale entry");
            }
            return None;
        };
        return Some(TimedCommand {
            role,
            time_seconds,
            kind: CommandKind::Scale {
                node_key: node_key.clone(),
                factor: scale.factor.clamp(SCALE_FACTOR_MIN, SCALE_FACTOR_MAX),
            },
        });
    }

    if let Some(morph) = morph {
        if morph.curve != CurveSpec::Linear {
            warn!(timeline, morph = %morph.name, curve = ?morph.curve, "non-linear tween curves are reserved, entry dropped");
            return None;
        }
        let morph_name = morph_aliases.get(&morph.name).cloned().unwrap_or(morph.name);
        return Some(TimedCommand {
            role,
            time_seconds,
            kind: CommandKind::Morph {
                morph_name,
                delta: morph.delta.clamp(-MORPH_DELTA_LIMIT, MORPH_DELTA_LIMIT),
                tween_seconds: morph.tween.max(0.0),
                curve: TweenCurve::Linear,
            },
        });
    }

    visibility.map(|vis| TimedCommand {
        role,
        time_seconds,
        kind: CommandKind::Visibility { vis_key: vis.key, visible: vis.visible },
    })
}
