use smallvec::SmallVec;
use std::collections::HashMap;

type Members = SmallVec<[String; 4]>;

/// Visibility group table: alias to the exact attachment names it covers.
///
/// Host-side mutator implementations expand a vis key through this table so
/// timelines can flip a whole limb with one command.
#[derive(Debug, Clone, Default)]
pub struct VisGroups {
    groups: HashMap<String, Members>,
}

impl VisGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: HashMap<String, Vec<String>>) -> Self {
        let mut groups = Self::new();
        for (alias, members) in map {
            groups.insert(alias, members);
        }
        groups
    }

    pub fn insert(&mut self, alias: impl Into<String>, members: impl IntoIterator<Item = String>) {
        self.groups.insert(alias.into(), members.into_iter().collect());
    }

    pub fn is_group(&self, key: &str) -> bool {
        self.groups.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Attachment names a vis key stands for: the group members when the key
    /// is an alias, otherwise the key itself.
    pub fn resolve<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        let members = self.groups.get(key);
        let passthrough = members.is_none().then_some(key);
        members
            .into_iter()
            .flat_map(|names| names.iter().map(String::as_str))
            .chain(passthrough)
    }
}
