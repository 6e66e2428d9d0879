//! The canonical collection of LR(0) item sets.

use crate::{
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID},
    item::{closure, goto, Item, ItemSet},
    types::Map,
    util::display_fn,
};
use std::{collections::VecDeque, fmt};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u32);
impl StateID {
    /// The state containing the item `S' -> . S`.
    pub const START: Self = Self(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u32 {
        self.0
    }
}
impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}
impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone)]
pub struct State {
    pub items: ItemSet,
    pub shifts: Map<TerminalID, StateID>,
    pub gotos: Map<NonterminalID, StateID>,
}

impl State {
    /// Iterate the completed items, in item order.
    pub fn completed<'g>(&'g self, g: &'g Grammar) -> impl Iterator<Item = &'g Item> + 'g {
        self.items.iter().filter(move |item| item.is_complete(g))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            writeln!(f, "## items:")?;
            for item in &self.items {
                writeln!(f, "- {}", item.display(g))?;
            }
            if !self.shifts.is_empty() {
                writeln!(f, "## shifts:")?;
                for (t, to) in &self.shifts {
                    writeln!(f, "- {} => {}", g.terminal_name(*t), to)?;
                }
            }
            if !self.gotos.is_empty() {
                writeln!(f, "## gotos:")?;
                for (n, to) in &self.gotos {
                    writeln!(f, "- {} => {}", g.nonterminal_name(*n), to)?;
                }
            }
            Ok(())
        })
    }
}

/// The canonical LR(0) automaton.
#[derive(Debug, Clone)]
pub struct Automaton {
    pub states: Map<StateID, State>,
}

impl Automaton {
    /// Calculate the canonical collection of the specified grammar.
    ///
    /// States are numbered in the order they are discovered by a breadth-first
    /// walk from `closure({S' -> . S})`, and the transitions of each state in
    /// the order of the symbols after the dots.
    pub fn build(g: &Grammar) -> Self {
        let _span = tracing::debug_span!("lr0").entered();

        let mut next_id = 0u32;
        let mut state_id = move || {
            let id = StateID(next_id);
            next_id = next_id
                .checked_add(1)
                .unwrap_or_else(|| panic!("too many LR(0) states"));
            id
        };

        let start = closure(
            g,
            &Some(Item::new(ProductionID::ACCEPT)).into_iter().collect(),
        );
        let start_id = state_id();
        let mut index = Map::<Vec<Item>, StateID>::default();
        index.insert(start.key(), start_id);

        let mut pending = VecDeque::<(StateID, ItemSet)>::new();
        pending.push_back((start_id, start));

        let mut states = Map::<StateID, State>::default();
        while let Some((current, items)) = pending.pop_front() {
            let mut shifts = Map::default();
            let mut gotos = Map::default();
            for symbol in items.next_symbols(g) {
                let target = goto(g, &items, symbol);
                let key = target.key();
                let next = match index.get(&key) {
                    Some(id) => *id,
                    None => {
                        let id = state_id();
                        tracing::trace!(?current, ?symbol, next = ?id, "discovered a new state");
                        index.insert(key, id);
                        pending.push_back((id, target));
                        id
                    }
                };
                match symbol {
                    SymbolID::T(t) => {
                        shifts.insert(t, next);
                    }
                    SymbolID::N(n) => {
                        gotos.insert(n, next);
                    }
                }
            }
            states.insert(
                current,
                State {
                    items,
                    shifts,
                    gotos,
                },
            );
        }

        // BFS pops states in id order.
        states.sort_keys();
        tracing::debug!(num_states = states.len(), "canonical collection");

        Self { states }
    }

    pub fn state(&self, id: StateID) -> Option<&State> {
        self.states.get(&id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (id, state) in &self.states {
                writeln!(f, "#### State {}", id)?;
                write!(f, "{}", state.display(g))?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Set;

    fn cc() -> Grammar {
        Grammar::from_rules(
            "S",
            &[],
            &[
                ("S", vec![vec!["C", "C"]]),
                ("C", vec![vec!["c", "C"], vec!["d"]]),
            ],
        )
        .unwrap()
    }

    fn items(g: &Grammar, state: &State) -> Vec<String> {
        state.items.iter().map(|i| i.display(g).to_string()).collect()
    }

    #[test]
    fn cc_collection() {
        let g = cc();
        let a = Automaton::build(&g);
        assert_eq!(a.len(), 7);

        let expected: Vec<Vec<&str>> = vec![
            vec!["S' -> . S", "S -> . C C", "C -> . c C", "C -> . d"],
            vec!["S' -> S ."],
            vec!["S -> C . C", "C -> . c C", "C -> . d"],
            vec!["C -> c . C", "C -> . c C", "C -> . d"],
            vec!["C -> d ."],
            vec!["S -> C C ."],
            vec!["C -> c C ."],
        ];
        for (i, expected) in expected.iter().enumerate() {
            let state = a.state(StateID::from_raw(i as u32)).unwrap();
            assert_eq!(items(&g, state), *expected, "state {}", i);
        }

        let c = g.terminal("c").unwrap();
        let d = g.terminal("d").unwrap();
        let cc = g.nonterminal("C").unwrap();
        let s0 = a.state(StateID::START).unwrap();
        assert_eq!(s0.shifts[&c], StateID::from_raw(3));
        assert_eq!(s0.shifts[&d], StateID::from_raw(4));
        assert_eq!(s0.gotos[&cc], StateID::from_raw(2));
        let s3 = a.state(StateID::from_raw(3)).unwrap();
        assert_eq!(s3.shifts[&c], StateID::from_raw(3));
        assert_eq!(s3.gotos[&cc], StateID::from_raw(6));
    }

    #[test]
    fn states_are_unique() {
        let g = cc();
        let a = Automaton::build(&g);
        let keys: Set<Vec<Item>> = a.states.values().map(|s| s.items.key()).collect();
        assert_eq!(keys.len(), a.len());
    }

    #[test]
    fn states_are_closed() {
        let g = cc();
        let a = Automaton::build(&g);
        for state in a.states.values() {
            assert_eq!(closure(&g, &state.items), state.items);
        }
    }

    #[test]
    fn construction_is_deterministic() {
        let g = cc();
        let first = Automaton::build(&g).display(&g).to_string();
        let second = Automaton::build(&g).display(&g).to_string();
        assert_eq!(first, second);
    }
}
