use crate::actor::Role;

/// Interpolation curve for tweened morph commands. Linear is the only curve
/// the runtime executes; config validation rejects everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TweenCurve {
    #[default]
    Linear,
}

/// Payload of a timed command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// Scale a named attachment node by `factor` (1.0 is identity).
    Scale { node_key: String, factor: f32 },
    /// Add `delta` to a blendable morph value. `tween_seconds == 0.0` applies
    /// the whole delta at once; otherwise the delta is distributed over the
    /// tween duration.
    Morph { morph_name: String, delta: f32, tween_seconds: f32, curve: TweenCurve },
    /// Show or hide a named attachment, or a whole group via its alias.
    Visibility { vis_key: String, visible: bool },
}

/// One command inside a timeline. Immutable once scheduled.
///
/// `time_seconds` is the offset from timeline start. Timelines are sorted
/// ascending by offset and clamped at load time (see `config`), so the
/// runtime can drain them with a single cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedCommand {
    pub role: Role,
    pub time_seconds: f32,
    pub kind: CommandKind,
}

impl TimedCommand {
    pub fn scale(role: Role, time_seconds: f32, node_key: impl Into<String>, factor: f32) -> Self {
        Self { role, time_seconds, kind: CommandKind::Scale { node_key: node_key.into(), factor } }
    }

    pub fn morph(
        role: Role,
        time_seconds: f32,
        morph_name: impl Into<String>,
        delta: f32,
        tween_seconds: f32,
    ) -> Self {
        Self {
            role,
            time_seconds,
            kind: CommandKind::Morph {
                morph_name: morph_name.into(),
                delta,
                tween_seconds,
                curve: TweenCurve::Linear,
            },
        }
    }

    pub fn visibility(role: Role, time_seconds: f32, vis_key: impl Into<String>, visible: bool) -> Self {
        Self { role, time_seconds, kind: CommandKind::Visibility { vis_key: vis_key.into(), visible } }
    }

    /// True when any command in `commands` addresses the target actor.
    /// The router uses this to decide whether a target must be resolved
    /// before the timeline starts.
    pub fn any_target_role(commands: &[TimedCommand]) -> bool {
        commands.iter().any(|cmd| cmd.role == Role::Target)
    }
}
