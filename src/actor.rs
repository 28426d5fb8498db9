use std::fmt;

/// Stable identity for a caster. Hosts typically map their persistent
/// entity/form id onto this; it never expires while the process lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// Opaque handle to a live actor in the host engine.
///
/// A handle may be empty (no actor) or may silently go stale when the host
/// unloads the actor. Staleness is the host's concern; the runtime only ever
/// tests emptiness and forwards handles back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorHandle(u64);

impl ActorHandle {
    pub const EMPTY: Self = Self(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for ActorHandle {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for ActorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "<empty>")
        } else {
            write!(f, "{:012X}", self.0)
        }
    }
}

/// Which actor of the pair a command applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Caster,
    Target,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Caster => "caster",
            Role::Target => "target",
        }
    }
}

/// Finds the actor paired with a caster, e.g. by spatial search. Invoked by
/// the event router before a timeline starts, never by the runtime itself.
pub trait TargetResolver {
    /// Returns the paired actor, or [`ActorHandle::EMPTY`] when none is found.
    fn resolve(&self, caster: ActorHandle) -> ActorHandle;
}
