//! Protocol actions: the events that label transitions of a protocol LTS.
//!
//! An [`Action`] describes one observable protocol event: its [`ActionKind`]
//! (send, receive, sync, or close) together with the sender and receiver
//! [`Role`]s. Actions are plain values compared and hashed by content, so two
//! independently constructed descriptions of the same event are
//! interchangeable everywhere in the engine.
//!
//! On the query side (formula atoms, traversal filters), a role parameter may
//! be a wildcard; this is expressed by [`RolePattern`].

use std::fmt;

/// A named protocol participant.
///
/// Roles are opaque identifiers: the engine never interprets the name, it
/// only compares roles for equality.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Role(String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Role(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Role::new(name)
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        Role(name)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A query-side role parameter: a concrete role or a wildcard.
///
/// `Any` matches every role. Concrete patterns match exactly one role.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum RolePattern {
    Any,
    Is(Role),
}

impl RolePattern {
    pub fn matches(&self, role: &Role) -> bool {
        match self {
            RolePattern::Any => true,
            RolePattern::Is(r) => r == role,
        }
    }
}

impl From<Role> for RolePattern {
    fn from(role: Role) -> Self {
        RolePattern::Is(role)
    }
}

impl From<&str> for RolePattern {
    fn from(name: &str) -> Self {
        RolePattern::Is(Role::new(name))
    }
}

impl fmt::Display for RolePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RolePattern::Any => write!(f, "*"),
            RolePattern::Is(r) => write!(f, "{}", r),
        }
    }
}

/// The four kinds of protocol events.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ActionKind {
    Send,
    Receive,
    Sync,
    Close,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Send => "send",
            ActionKind::Receive => "receive",
            ActionKind::Sync => "sync",
            ActionKind::Close => "close",
        };
        write!(f, "{}", s)
    }
}

/// An immutable protocol event: kind plus sender and receiver roles.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Action {
    pub kind: ActionKind,
    pub sender: Role,
    pub receiver: Role,
}

impl Action {
    pub fn new(kind: ActionKind, sender: impl Into<Role>, receiver: impl Into<Role>) -> Self {
        Action {
            kind,
            sender: sender.into(),
            receiver: receiver.into(),
        }
    }

    pub fn send(sender: impl Into<Role>, receiver: impl Into<Role>) -> Self {
        Action::new(ActionKind::Send, sender, receiver)
    }

    pub fn receive(sender: impl Into<Role>, receiver: impl Into<Role>) -> Self {
        Action::new(ActionKind::Receive, sender, receiver)
    }

    pub fn sync(sender: impl Into<Role>, receiver: impl Into<Role>) -> Self {
        Action::new(ActionKind::Sync, sender, receiver)
    }

    pub fn close(sender: impl Into<Role>, receiver: impl Into<Role>) -> Self {
        Action::new(ActionKind::Close, sender, receiver)
    }

    /// True iff sender and receiver are the same role.
    pub fn is_self_directed(&self) -> bool {
        self.sender == self.receiver
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.kind, self.sender, self.receiver)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_action_value_equality() {
        let a = Action::send("a", "b");
        let b = Action::send("a", "b");
        assert_eq!(a, b);
        assert_ne!(a, Action::receive("a", "b"));
        assert_ne!(a, Action::send("b", "a"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Action::send("a", "b").to_string(), "send(a,b)");
        assert_eq!(Action::close("x", "y").to_string(), "close(x,y)");
    }

    #[test]
    fn test_role_pattern() {
        let a = Role::new("a");
        let b = Role::new("b");
        assert!(RolePattern::Any.matches(&a));
        assert!(RolePattern::Any.matches(&b));
        let is_a = RolePattern::from("a");
        assert!(is_a.matches(&a));
        assert!(!is_a.matches(&b));
    }

    #[test]
    fn test_self_directed() {
        assert!(Action::sync("a", "a").is_self_directed());
        assert!(!Action::sync("a", "b").is_self_directed());
    }
}
