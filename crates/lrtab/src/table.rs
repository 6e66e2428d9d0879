//! Calculation of the ACTION/GOTO tables.

use crate::{
    first_follow::{FirstSets, FollowSets},
    grammar::{Grammar, NonterminalID, ProductionID, TerminalID},
    lr0::{Automaton, StateID},
    types::Map,
    util::{display_fn, write_columns},
};
use lrtab_runtime::definition::ParseAction;
use std::fmt;

/// The policy used to place reduce actions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Method {
    /// Reduce on every terminal symbol.
    LR0,
    /// Reduce only on the terminal symbols in FOLLOW of the left-hand side.
    #[default]
    SLR,
}
impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LR0 => f.write_str("LR(0)"),
            Self::SLR => f.write_str("SLR(1)"),
        }
    }
}

/// The action that the LR automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production rule.
    Reduce(ProductionID),

    Accept,

    /// Reject the lookahead symbol.
    Error,
}
impl Action {
    fn is_reduce(&self) -> bool {
        matches!(self, Self::Reduce(..) | Self::Accept)
    }
}
impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(next) => write!(f, "s{}", next),
            Self::Reduce(p) => write!(f, "r{}", p),
            Self::Accept => f.write_str("acc"),
            Self::Error => Ok(()),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}
impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShiftReduce => f.write_str("shift/reduce"),
            Self::ReduceReduce => f.write_str("reduce/reduce"),
        }
    }
}

/// A write into an occupied ACTION cell. `incoming` is the action left in the table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TableConflict {
    pub state: StateID,
    pub terminal: TerminalID,
    /// The left-hand side of the completed item that caused the conflict.
    pub lhs: NonterminalID,
    pub existing: Action,
    pub incoming: Action,
}

impl TableConflict {
    pub fn kind(&self) -> ConflictKind {
        if self.existing.is_reduce() && self.incoming.is_reduce() {
            ConflictKind::ReduceReduce
        } else {
            ConflictKind::ShiftReduce
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(
                f,
                "{} conflict in state {} on `{}' (reducing to {}): {} is replaced by {}",
                self.kind(),
                self.state,
                g.terminal_name(self.terminal),
                g.nonterminal_name(self.lhs),
                self.existing,
                self.incoming,
            )
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("the {} parse table has {} conflict(s)", method, conflicts.len())]
pub struct ConflictError {
    pub method: Method,
    pub conflicts: Vec<TableConflict>,
}

#[derive(Debug, Default, Clone)]
#[non_exhaustive]
pub struct ParseTableRow {
    pub actions: Map<TerminalID, Action>,
    pub gotos: Map<NonterminalID, StateID>,
}

/// The ACTION/GOTO tables derived from an LR(0) automaton.
#[derive(Debug, Clone)]
pub struct ParseTable {
    pub method: Method,
    pub states: Map<StateID, ParseTableRow>,
    conflicts: Vec<TableConflict>,
    // the left-hand side and the length of each production, used when reducing.
    reductions: Map<ProductionID, (NonterminalID, usize)>,
}

impl ParseTable {
    /// Build the LR(0) table: completed items reduce on every terminal symbol.
    pub fn lr0(g: &Grammar, automaton: &Automaton) -> Self {
        Self::build(g, automaton, Method::LR0, None)
    }

    /// Build the SLR(1) table: completed items reduce on FOLLOW of their left-hand side.
    pub fn slr(g: &Grammar, automaton: &Automaton, follow: &FollowSets) -> Self {
        Self::build(g, automaton, Method::SLR, Some(follow))
    }

    fn build(
        g: &Grammar,
        automaton: &Automaton,
        method: Method,
        follow: Option<&FollowSets>,
    ) -> Self {
        let _span = tracing::debug_span!("table", %method).entered();

        let mut table = Self {
            method,
            states: Map::default(),
            conflicts: vec![],
            reductions: g
                .productions
                .iter()
                .map(|(id, p)| (*id, (p.left, p.right.len())))
                .collect(),
        };

        for (&id, state) in &automaton.states {
            let mut row = ParseTableRow::default();
            for (&t, &next) in &state.shifts {
                table.set_action(&mut row, id, t, NonterminalID::START, Action::Shift(next));
            }
            for (&n, &next) in &state.gotos {
                row.gotos.insert(n, next);
            }

            for item in state.completed(g) {
                let production = g.production(item.production);
                if item.production == ProductionID::ACCEPT {
                    table.set_action(&mut row, id, TerminalID::EOI, production.left, Action::Accept);
                    continue;
                }

                let action = Action::Reduce(item.production);
                match follow {
                    None => {
                        for &t in g.terminals.keys() {
                            table.set_action(&mut row, id, t, production.left, action);
                        }
                    }
                    Some(follow) => {
                        let Some(lookaheads) = follow.get(production.left) else {
                            continue;
                        };
                        for t in lookaheads.iter() {
                            table.set_action(&mut row, id, t, production.left, action);
                        }
                    }
                }
            }

            table.states.insert(id, row);
        }

        tracing::debug!(
            num_states = table.states.len(),
            num_conflicts = table.conflicts.len(),
            "parse table"
        );

        table
    }

    // The last write wins; overwriting a different action is recorded.
    fn set_action(
        &mut self,
        row: &mut ParseTableRow,
        state: StateID,
        terminal: TerminalID,
        lhs: NonterminalID,
        incoming: Action,
    ) {
        if let Some(existing) = row.actions.insert(terminal, incoming) {
            if existing != incoming {
                let conflict = TableConflict {
                    state,
                    terminal,
                    lhs,
                    existing,
                    incoming,
                };
                tracing::debug!(?state, ?terminal, %existing, %incoming, "conflict");
                self.conflicts.push(conflict);
            }
        }
    }

    /// Return the action for the specified cell. Empty cells are `Action::Error`.
    pub fn action(&self, state: StateID, terminal: TerminalID) -> Action {
        self.states
            .get(&state)
            .and_then(|row| row.actions.get(&terminal))
            .copied()
            .unwrap_or(Action::Error)
    }

    pub fn goto(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.states
            .get(&state)
            .and_then(|row| row.gotos.get(&symbol))
            .copied()
    }

    /// The overwritten cells, in the order they were detected.
    pub fn conflicts(&self) -> &[TableConflict] {
        &self.conflicts[..]
    }

    pub fn is_deterministic(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Return this table only if it has no conflicts.
    pub fn deny_conflicts(self) -> Result<Self, ConflictError> {
        if self.conflicts.is_empty() {
            Ok(self)
        } else {
            Err(ConflictError {
                method: self.method,
                conflicts: self.conflicts,
            })
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let terminals: Vec<TerminalID> = g
                .terminals
                .keys()
                .copied()
                .filter(|t| *t != TerminalID::EOI)
                .chain(Some(TerminalID::EOI))
                .collect();
            let nonterminals: Vec<NonterminalID> = g
                .nonterminals
                .keys()
                .copied()
                .filter(|n| *n != NonterminalID::START)
                .collect();

            let mut rows = Vec::with_capacity(self.states.len() + 1);
            let mut header = vec!["State".to_owned()];
            header.extend(terminals.iter().map(|t| g.terminal_name(*t).to_owned()));
            header.extend(nonterminals.iter().map(|n| g.nonterminal_name(*n).to_owned()));
            rows.push(header);

            for (id, row) in &self.states {
                let mut cells = vec![id.to_string()];
                cells.extend(terminals.iter().map(|t| self.action(*id, *t).to_string()));
                cells.extend(
                    nonterminals
                        .iter()
                        .map(|n| row.gotos.get(n).map_or_else(String::new, |s| s.to_string())),
                );
                rows.push(cells);
            }

            writeln!(f, "#### {} parse table", self.method)?;
            write_columns(f, &rows)?;

            if !self.conflicts.is_empty() {
                writeln!(f, "## conflicts:")?;
                for conflict in &self.conflicts {
                    writeln!(f, "- {}", conflict.display(g))?;
                }
            }
            Ok(())
        })
    }
}

impl lrtab_runtime::definition::ParseTable for ParseTable {
    type State = StateID;
    type Terminal = TerminalID;
    type Nonterminal = NonterminalID;
    type Reduce = ProductionID;

    fn initial_state(&self) -> StateID {
        StateID::START
    }

    fn action(
        &self,
        current: StateID,
        lookahead: Option<TerminalID>,
    ) -> ParseAction<StateID, NonterminalID, ProductionID> {
        match ParseTable::action(self, current, lookahead.unwrap_or(TerminalID::EOI)) {
            Action::Shift(next) => ParseAction::Shift(next),
            Action::Reduce(p) => match self.reductions.get(&p) {
                Some(&(left, len)) => ParseAction::Reduce(p, left, len),
                None => ParseAction::Error,
            },
            Action::Accept => ParseAction::Accept,
            Action::Error => ParseAction::Error,
        }
    }

    fn goto(&self, current: StateID, symbol: NonterminalID) -> Option<StateID> {
        ParseTable::goto(self, current, symbol)
    }
}

/// The configuration of the table generator.
#[derive(Debug, Default, Clone)]
pub struct Config {
    method: Method,
}

impl Config {
    /// Create a configuration producing SLR(1) tables.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_lr0(mut self) -> Self {
        self.method = Method::LR0;
        self
    }

    pub fn use_slr(mut self) -> Self {
        self.method = Method::SLR;
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Build the canonical collection of `g` and derive its parse table.
    pub fn generate(&self, g: &Grammar) -> ParseTable {
        let automaton = Automaton::build(g);
        match self.method {
            Method::LR0 => ParseTable::lr0(g, &automaton),
            Method::SLR => {
                let first = FirstSets::new(g);
                let follow = FollowSets::new(g, &first);
                ParseTable::slr(g, &automaton, &follow)
            }
        }
    }
}
