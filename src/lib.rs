pub mod actor;
pub mod config;
pub mod events;
pub mod morph;
pub mod mutator;
pub mod runtime;
pub mod timeline;
pub(crate) mod tween;
pub mod vis;
pub mod watch;

pub use actor::{ActorHandle, ActorId, Role, TargetResolver};
pub use config::{DebugConfig, GeneralConfig, StageConfig};
pub use events::EventRouter;
pub use morph::MorphLedger;
pub use mutator::{AttributeMutator, MutatorCall, RecordingMutator};
pub use runtime::{PairTouched, TimelineRuntime, TouchedSet, MAX_STEP_SECONDS};
pub use timeline::{CommandKind, TimedCommand, TweenCurve};
pub use vis::VisGroups;
pub use watch::ConfigWatcher;
