//! Composite keys for timing handlers.

use std::fmt;
use std::sync::Arc;

/// Group used when a measurement has no owning plugin.
pub const DEFAULT_GROUP: &str = "Minecraft";

/// Immutable key identifying one measurement point.
///
/// Two identifiers are equal when group, name, parent and protection all
/// match. The parent is a non-owning display link: it nests a handler under
/// another in reports but has no effect on measurement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimingIdentifier {
    group: String,
    name: String,
    parent: Option<Arc<TimingIdentifier>>,
    protect: bool,
}

impl TimingIdentifier {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        parent: Option<Arc<TimingIdentifier>>,
        protect: bool,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            parent,
            protect,
        }
    }

    /// Identifier in the default group with no parent.
    pub fn ungrouped(name: impl Into<String>, protect: bool) -> Self {
        Self::new(DEFAULT_GROUP, name, None, protect)
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<TimingIdentifier>> {
        self.parent.as_ref()
    }

    /// Whether handlers for this identifier must tolerate access from any thread.
    pub fn is_protected(&self) -> bool {
        self.protect
    }
}

impl fmt::Display for TimingIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.group, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_covers_every_field() {
        let parent = Arc::new(TimingIdentifier::ungrouped("Plugins", false));
        let a = TimingIdentifier::new("core", "tick", Some(parent.clone()), true);

        assert_eq!(a, TimingIdentifier::new("core", "tick", Some(parent.clone()), true));
        assert_ne!(a, TimingIdentifier::new("core", "tick", Some(parent.clone()), false));
        assert_ne!(a, TimingIdentifier::new("core", "tick", None, true));
        assert_ne!(a, TimingIdentifier::new("other", "tick", Some(parent.clone()), true));
        assert_ne!(a, TimingIdentifier::new("core", "tock", Some(parent), true));
    }

    #[test]
    fn parents_compare_by_value() {
        let p1 = Arc::new(TimingIdentifier::ungrouped("Plugins", false));
        let p2 = Arc::new(TimingIdentifier::ungrouped("Plugins", false));
        let a = TimingIdentifier::new("core", "tick", Some(p1), true);
        let b = TimingIdentifier::new("core", "tick", Some(p2), true);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn ungrouped_uses_default_group() {
        let id = TimingIdentifier::ungrouped("Entity Tick", false);
        assert_eq!(id.group(), DEFAULT_GROUP);
        assert!(id.parent().is_none());
        assert!(!id.is_protected());
        assert_eq!(id.to_string(), "Minecraft::Entity Tick");
    }
}
