//! Temporal-logic formulas over protocol actions.
//!
//! Formulas are expression trees of boolean and CTL operators (future and
//! past) over atomic predicates on a state's producing [`Action`]. The
//! [`Formulas`] manager owns an interned arena of nodes: structurally
//! identical formulas — even built independently in different places — share
//! one [`FormulaId`] handle, so the labeling engine's memoization reduces to a
//! handle comparison and shared sub-formulas are evaluated once.
//!
//! The operator basis is `EX/AX`, `EY/AY`, `EU/AU`, and `ES/AS`. Everything
//! else is derived at construction time:
//!
//! ```text
//! EF φ = EU(true, φ)        AF φ = AU(true, φ)
//! EG φ = ¬AF ¬φ             AG φ = ¬EF ¬φ
//! EP φ = ES(true, φ)        AP φ = AS(true, φ)
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use crate::action::{Action, ActionKind, Role, RolePattern};

/// Handle to an interned formula node.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FormulaId(u32);

impl FormulaId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FormulaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// An atomic predicate over a state's producing action.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Atom {
    /// The designated first state: a state with no producing action.
    First,
    /// The producing action has this role as both sender and receiver.
    SelfComm(Role),
    /// The producing action has exactly this kind, with wildcard-capable
    /// sender and receiver patterns.
    Act {
        kind: ActionKind,
        sender: RolePattern,
        receiver: RolePattern,
    },
}

impl Atom {
    /// Evaluates the predicate against a state's producing action
    /// (`None` for an initial pseudo-state).
    pub fn holds(&self, action: Option<&Action>) -> bool {
        match self {
            Atom::First => action.is_none(),
            Atom::SelfComm(role) => {
                action.is_some_and(|a| a.sender == *role && a.receiver == *role)
            }
            Atom::Act {
                kind,
                sender,
                receiver,
            } => action.is_some_and(|a| {
                a.kind == *kind && sender.matches(&a.sender) && receiver.matches(&a.receiver)
            }),
        }
    }

    /// Renders the atom in mCRL2 concrete syntax.
    ///
    /// Structural bracket characters in role names are sanitized to
    /// parentheses. Serialization only; evaluation never consults this.
    pub fn to_mcrl2(&self) -> String {
        fn sanitize(s: String) -> String {
            s.replace('[', "(").replace(']', ")")
        }
        match self {
            Atom::First => "first".to_string(),
            Atom::SelfComm(role) => format!("self({})", sanitize(role.to_string())),
            Atom::Act {
                kind,
                sender,
                receiver,
            } => format!(
                "{}({},{})",
                kind,
                sanitize(sender.to_string()),
                sanitize(receiver.to_string())
            ),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::First => write!(f, "first"),
            Atom::SelfComm(role) => write!(f, "self({})", role),
            Atom::Act {
                kind,
                sender,
                receiver,
            } => write!(f, "{}({},{})", kind, sender, receiver),
        }
    }
}

/// One interned formula node. Operands are handles into the same arena.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Formula {
    True,
    Atom(Atom),
    Not(FormulaId),
    And(Vec<FormulaId>),
    Or(Vec<FormulaId>),
    Implies(FormulaId, FormulaId),
    /// Some successor satisfies the operand.
    EX(FormulaId),
    /// At least one successor exists and all satisfy the operand.
    AX(FormulaId),
    /// Some predecessor satisfies the operand.
    EY(FormulaId),
    /// At least one predecessor exists and all satisfy the operand.
    AY(FormulaId),
    /// On some path, the first operand holds until the second does.
    EU(FormulaId, FormulaId),
    /// On every path, the first operand holds until the second does.
    AU(FormulaId, FormulaId),
    /// On some backward path, the first operand has held since the second.
    ES(FormulaId, FormulaId),
    /// On every backward path, the first operand has held since the second.
    AS(FormulaId, FormulaId),
}

impl Formula {
    /// Direct operands of this node.
    pub fn operands(&self) -> Vec<FormulaId> {
        match self {
            Formula::True | Formula::Atom(_) => Vec::new(),
            Formula::Not(a) | Formula::EX(a) | Formula::AX(a) | Formula::EY(a) | Formula::AY(a) => {
                vec![*a]
            }
            Formula::And(args) | Formula::Or(args) => args.clone(),
            Formula::Implies(l, r)
            | Formula::EU(l, r)
            | Formula::AU(l, r)
            | Formula::ES(l, r)
            | Formula::AS(l, r) => vec![*l, *r],
        }
    }
}

/// The formula manager: an interned arena of [`Formula`] nodes.
///
/// Structural equality is the interning key, so building the same formula
/// twice yields the same handle. All construction goes through the manager.
pub struct Formulas {
    nodes: RefCell<Vec<Formula>>,
    index: RefCell<HashMap<Formula, FormulaId>>,
}

impl Formulas {
    pub fn new() -> Self {
        Formulas {
            nodes: RefCell::new(Vec::new()),
            index: RefCell::new(HashMap::new()),
        }
    }

    /// Number of distinct nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Interns a node, returning the canonical handle for its structure.
    pub fn intern(&self, node: Formula) -> FormulaId {
        if let Some(&id) = self.index.borrow().get(&node) {
            return id;
        }
        let mut nodes = self.nodes.borrow_mut();
        let id = FormulaId(nodes.len() as u32);
        nodes.push(node.clone());
        self.index.borrow_mut().insert(node, id);
        id
    }

    /// The node behind a handle.
    ///
    /// # Panics
    ///
    /// Panics if `f` was not issued by this arena.
    pub fn node(&self, f: FormulaId) -> Formula {
        let nodes = self.nodes.borrow();
        assert!(
            f.index() < nodes.len(),
            "Formula {} is not interned in this arena",
            f
        );
        nodes[f.index()].clone()
    }

    //
    // Atoms
    //

    pub fn tt(&self) -> FormulaId {
        self.intern(Formula::True)
    }

    pub fn first(&self) -> FormulaId {
        self.intern(Formula::Atom(Atom::First))
    }

    pub fn self_comm(&self, role: impl Into<Role>) -> FormulaId {
        self.intern(Formula::Atom(Atom::SelfComm(role.into())))
    }

    pub fn act(
        &self,
        kind: ActionKind,
        sender: impl Into<RolePattern>,
        receiver: impl Into<RolePattern>,
    ) -> FormulaId {
        self.intern(Formula::Atom(Atom::Act {
            kind,
            sender: sender.into(),
            receiver: receiver.into(),
        }))
    }

    pub fn send(
        &self,
        sender: impl Into<RolePattern>,
        receiver: impl Into<RolePattern>,
    ) -> FormulaId {
        self.act(ActionKind::Send, sender, receiver)
    }

    pub fn receive(
        &self,
        sender: impl Into<RolePattern>,
        receiver: impl Into<RolePattern>,
    ) -> FormulaId {
        self.act(ActionKind::Receive, sender, receiver)
    }

    pub fn sync(
        &self,
        sender: impl Into<RolePattern>,
        receiver: impl Into<RolePattern>,
    ) -> FormulaId {
        self.act(ActionKind::Sync, sender, receiver)
    }

    pub fn close(
        &self,
        sender: impl Into<RolePattern>,
        receiver: impl Into<RolePattern>,
    ) -> FormulaId {
        self.act(ActionKind::Close, sender, receiver)
    }

    //
    // Boolean connectives
    //

    pub fn not(&self, arg: FormulaId) -> FormulaId {
        self.intern(Formula::Not(arg))
    }

    pub fn and(&self, args: &[FormulaId]) -> FormulaId {
        self.intern(Formula::And(args.to_vec()))
    }

    pub fn or(&self, args: &[FormulaId]) -> FormulaId {
        self.intern(Formula::Or(args.to_vec()))
    }

    pub fn implies(&self, lhs: FormulaId, rhs: FormulaId) -> FormulaId {
        self.intern(Formula::Implies(lhs, rhs))
    }

    //
    // Temporal primitives
    //

    pub fn ex(&self, arg: FormulaId) -> FormulaId {
        self.intern(Formula::EX(arg))
    }

    pub fn ax(&self, arg: FormulaId) -> FormulaId {
        self.intern(Formula::AX(arg))
    }

    pub fn ey(&self, arg: FormulaId) -> FormulaId {
        self.intern(Formula::EY(arg))
    }

    pub fn ay(&self, arg: FormulaId) -> FormulaId {
        self.intern(Formula::AY(arg))
    }

    pub fn eu(&self, lhs: FormulaId, rhs: FormulaId) -> FormulaId {
        self.intern(Formula::EU(lhs, rhs))
    }

    pub fn au(&self, lhs: FormulaId, rhs: FormulaId) -> FormulaId {
        self.intern(Formula::AU(lhs, rhs))
    }

    pub fn es(&self, lhs: FormulaId, rhs: FormulaId) -> FormulaId {
        self.intern(Formula::ES(lhs, rhs))
    }

    /// `AS` — the past dual of [`Formulas::au`]. Named with a trailing
    /// underscore because `as` is a keyword.
    pub fn as_(&self, lhs: FormulaId, rhs: FormulaId) -> FormulaId {
        self.intern(Formula::AS(lhs, rhs))
    }

    //
    // Derived operators
    //

    /// `EF φ = EU(true, φ)`.
    pub fn ef(&self, arg: FormulaId) -> FormulaId {
        self.eu(self.tt(), arg)
    }

    /// `AF φ = AU(true, φ)`.
    pub fn af(&self, arg: FormulaId) -> FormulaId {
        self.au(self.tt(), arg)
    }

    /// `EG φ = ¬AF ¬φ`.
    pub fn eg(&self, arg: FormulaId) -> FormulaId {
        self.not(self.af(self.not(arg)))
    }

    /// `AG φ = ¬EF ¬φ`.
    pub fn ag(&self, arg: FormulaId) -> FormulaId {
        self.not(self.ef(self.not(arg)))
    }

    /// `EP φ = ES(true, φ)` — somewhere in the past, on some path.
    pub fn ep(&self, arg: FormulaId) -> FormulaId {
        self.es(self.tt(), arg)
    }

    /// `AP φ = AS(true, φ)` — somewhere in the past, on every path.
    pub fn ap(&self, arg: FormulaId) -> FormulaId {
        self.as_(self.tt(), arg)
    }

    /// Renders a formula as text.
    pub fn pretty(&self, f: FormulaId) -> String {
        let mut out = String::new();
        self.fmt_into(f, &mut out);
        out
    }

    fn fmt_into(&self, f: FormulaId, out: &mut String) {
        let join = |out: &mut String, args: &[FormulaId], sep: &str| {
            for (i, &arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(sep);
                }
                self.fmt_into(arg, out);
            }
        };
        match self.node(f) {
            Formula::True => out.push_str("true"),
            Formula::Atom(atom) => out.push_str(&atom.to_string()),
            Formula::Not(a) => {
                out.push_str("not(");
                self.fmt_into(a, out);
                out.push(')');
            }
            Formula::And(args) => {
                out.push('(');
                join(out, &args, " and ");
                out.push(')');
            }
            Formula::Or(args) => {
                out.push('(');
                join(out, &args, " or ");
                out.push(')');
            }
            Formula::Implies(l, r) => {
                out.push('(');
                self.fmt_into(l, out);
                out.push_str(" --> ");
                self.fmt_into(r, out);
                out.push(')');
            }
            Formula::EX(a) => self.fmt_unary("EX", a, out),
            Formula::AX(a) => self.fmt_unary("AX", a, out),
            Formula::EY(a) => self.fmt_unary("EY", a, out),
            Formula::AY(a) => self.fmt_unary("AY", a, out),
            Formula::EU(l, r) => self.fmt_binary("EU", l, r, out),
            Formula::AU(l, r) => self.fmt_binary("AU", l, r, out),
            Formula::ES(l, r) => self.fmt_binary("ES", l, r, out),
            Formula::AS(l, r) => self.fmt_binary("AS", l, r, out),
        }
    }

    fn fmt_unary(&self, name: &str, a: FormulaId, out: &mut String) {
        out.push_str(name);
        out.push('(');
        self.fmt_into(a, out);
        out.push(')');
    }

    fn fmt_binary(&self, name: &str, l: FormulaId, r: FormulaId, out: &mut String) {
        out.push_str(name);
        out.push('(');
        self.fmt_into(l, out);
        out.push(',');
        self.fmt_into(r, out);
        out.push(')');
    }
}

impl Default for Formulas {
    fn default() -> Self {
        Formulas::new()
    }
}

impl fmt::Debug for Formulas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formulas").field("nodes", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_interning_dedups_structurally() {
        let formulas = Formulas::new();
        let a = formulas.send("a", "b");
        let b = formulas.send("a", "b");
        assert_eq!(a, b);

        let f1 = formulas.ax(formulas.not(a));
        let f2 = formulas.ax(formulas.not(b));
        assert_eq!(f1, f2);

        let g = formulas.send("b", "a");
        assert_ne!(a, g);
        assert_eq!(formulas.len(), 4); // send(a,b), not, AX, send(b,a)
    }

    #[test]
    fn test_derived_operators_share_structure() {
        let formulas = Formulas::new();
        let p = formulas.close("a", "b");
        let ag = formulas.ag(p);
        // AG φ = not(EU(true, not(φ)))
        let expected = formulas.not(formulas.eu(formulas.tt(), formulas.not(p)));
        assert_eq!(ag, expected);

        let ap = formulas.ap(p);
        let expected = formulas.as_(formulas.tt(), p);
        assert_eq!(ap, expected);
    }

    #[test]
    fn test_atom_holds() {
        let send_ab = Action::send("a", "b");
        let close_aa = Action::close("a", "a");

        let atom = Atom::Act {
            kind: ActionKind::Send,
            sender: RolePattern::from("a"),
            receiver: RolePattern::Any,
        };
        assert!(atom.holds(Some(&send_ab)));
        assert!(!atom.holds(Some(&close_aa)));
        assert!(!atom.holds(None));

        assert!(Atom::First.holds(None));
        assert!(!Atom::First.holds(Some(&send_ab)));

        let self_a = Atom::SelfComm(Role::new("a"));
        assert!(self_a.holds(Some(&close_aa)));
        assert!(!self_a.holds(Some(&send_ab)));
    }

    #[test]
    fn test_pretty() {
        let formulas = Formulas::new();
        let f = formulas.implies(
            formulas.send("a", "b"),
            formulas.af(formulas.close("a", "b")),
        );
        assert_eq!(formulas.pretty(f), "(send(a,b) --> AU(true,close(a,b)))");
    }

    #[test]
    fn test_mcrl2_rendering_sanitizes_brackets() {
        let atom = Atom::Act {
            kind: ActionKind::Receive,
            sender: RolePattern::from("worker[1]"),
            receiver: RolePattern::from("master"),
        };
        assert_eq!(atom.to_mcrl2(), "receive(worker(1),master)");
        assert_eq!(
            Atom::SelfComm(Role::new("r[0]")).to_mcrl2(),
            "self(r(0))"
        );
    }

    #[test]
    #[should_panic(expected = "not interned")]
    fn test_foreign_handle_panics() {
        let formulas = Formulas::new();
        let other = Formulas::new();
        let f = other.tt();
        let _ = formulas.node(f);
    }
}
