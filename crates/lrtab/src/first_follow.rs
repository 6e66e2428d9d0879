//! Calculation of FIRST and FOLLOW sets.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID, TerminalSet},
    types::Map,
};

/// FIRST set of a nonterminal symbol or a sentential form.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FirstSet {
    pub terminals: TerminalSet,
    /// Whether the empty string is derivable.
    pub nullable: bool,
}

impl FirstSet {
    fn union_with(&mut self, other: &Self) -> bool {
        let mut changed = self.terminals.union_with(&other.terminals);
        if other.nullable && !self.nullable {
            self.nullable = true;
            changed = true;
        }
        changed
    }

    pub fn is_superset(&self, other: &Self) -> bool {
        self.terminals.is_superset(&other.terminals) && (self.nullable || !other.nullable)
    }
}

#[derive(Debug, Clone)]
pub struct FirstSets {
    sets: Map<NonterminalID, FirstSet>,
}

impl FirstSets {
    /// Calculate the FIRST sets of all nonterminal symbols in the grammar.
    pub fn new(g: &Grammar) -> Self {
        let _span = tracing::debug_span!("first_sets").entered();

        let mut first = Self::empty(g);
        // Every productive round adds at least one terminal or a nullable flag.
        let max_rounds = g.nonterminals.len() * (g.terminals.len() + 1) + 1;
        let mut rounds = 0;
        while first.round(g) {
            rounds += 1;
            assert!(
                rounds <= max_rounds,
                "FIRST sets did not converge within {} rounds",
                max_rounds
            );
        }
        tracing::trace!(rounds, "FIRST sets converged");
        first
    }

    fn empty(g: &Grammar) -> Self {
        Self {
            sets: g
                .nonterminals
                .keys()
                .map(|n| (*n, FirstSet::default()))
                .collect(),
        }
    }

    // Applies every production once against the current sets.
    fn round(&mut self, g: &Grammar) -> bool {
        let mut changed = false;
        for production in g.productions.values() {
            let first = self.first_of(&production.right);
            if let Some(set) = self.sets.get_mut(&production.left) {
                changed |= set.union_with(&first);
            }
        }
        changed
    }

    pub fn get(&self, n: NonterminalID) -> Option<&FirstSet> {
        self.sets.get(&n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NonterminalID, &FirstSet)> + '_ {
        self.sets.iter().map(|(n, set)| (*n, set))
    }

    /// Calculate FIRST of the sentential form `symbols`.
    ///
    /// The result is nullable if and only if every symbol is nullable,
    /// in particular when `symbols` is empty.
    pub fn first_of(&self, symbols: &[SymbolID]) -> FirstSet {
        let mut first = FirstSet::default();
        for symbol in symbols {
            match symbol {
                SymbolID::T(t) => {
                    first.terminals.insert(*t);
                    return first;
                }
                SymbolID::N(n) => {
                    let Some(set) = self.sets.get(n) else {
                        return first;
                    };
                    first.terminals.union_with(&set.terminals);
                    if !set.nullable {
                        return first;
                    }
                }
            }
        }
        first.nullable = true;
        first
    }
}

#[derive(Debug, Clone)]
pub struct FollowSets {
    sets: Map<NonterminalID, TerminalSet>,
}

impl FollowSets {
    /// Calculate the FOLLOW sets of all nonterminal symbols in the grammar.
    pub fn new(g: &Grammar, first: &FirstSets) -> Self {
        let _span = tracing::debug_span!("follow_sets").entered();

        let mut follow = Self::empty(g);
        let max_rounds = g.nonterminals.len() * g.terminals.len() + 1;
        let mut rounds = 0;
        while follow.round(g, first) {
            rounds += 1;
            assert!(
                rounds <= max_rounds,
                "FOLLOW sets did not converge within {} rounds",
                max_rounds
            );
        }
        tracing::trace!(rounds, "FOLLOW sets converged");
        follow
    }

    fn empty(g: &Grammar) -> Self {
        let mut sets: Map<NonterminalID, TerminalSet> = g
            .nonterminals
            .keys()
            .map(|n| (*n, TerminalSet::default()))
            .collect();
        for n in [NonterminalID::START, g.start_symbol] {
            if let Some(set) = sets.get_mut(&n) {
                set.insert(TerminalID::EOI);
            }
        }
        Self { sets }
    }

    fn round(&mut self, g: &Grammar, first: &FirstSets) -> bool {
        let mut changed = false;
        for production in g.productions.values() {
            for (i, symbol) in production.right.iter().enumerate() {
                let SymbolID::N(x) = symbol else {
                    continue;
                };
                let rest = first.first_of(&production.right[i + 1..]);
                let mut added = rest.terminals;
                if rest.nullable {
                    if let Some(left) = self.sets.get(&production.left) {
                        added.union_with(left);
                    }
                }
                if let Some(set) = self.sets.get_mut(x) {
                    changed |= set.union_with(&added);
                }
            }
        }
        changed
    }

    pub fn get(&self, n: NonterminalID) -> Option<&TerminalSet> {
        self.sets.get(&n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NonterminalID, &TerminalSet)> + '_ {
        self.sets.iter().map(|(n, set)| (*n, set))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    // E -> T E' ; E' -> + T E' | ε ; T -> F T' ; T' -> * F T' | ε ; F -> ( E ) | id
    fn expr() -> Grammar {
        Grammar::from_rules(
            "E",
            &[],
            &[
                ("E", vec![vec!["T", "Ep"]]),
                ("Ep", vec![vec!["+", "T", "Ep"], vec![]]),
                ("T", vec![vec!["F", "Tp"]]),
                ("Tp", vec![vec!["*", "F", "Tp"], vec![]]),
                ("F", vec![vec!["(", "E", ")"], vec!["id"]]),
            ],
        )
        .unwrap()
    }

    fn names(g: &Grammar, set: &TerminalSet) -> Vec<String> {
        set.iter().map(|t| g.terminal_name(t).to_owned()).collect()
    }

    fn first_names(g: &Grammar, first: &FirstSets, n: &str) -> (Vec<String>, bool) {
        let set = first.get(g.nonterminal(n).unwrap()).unwrap();
        (names(g, &set.terminals), set.nullable)
    }

    fn follow_names(g: &Grammar, follow: &FollowSets, n: &str) -> Vec<String> {
        names(g, follow.get(g.nonterminal(n).unwrap()).unwrap())
    }

    #[test]
    fn cc_sets() {
        let g = cc();
        let first = FirstSets::new(&g);
        let follow = FollowSets::new(&g, &first);
        assert_eq!(first_names(&g, &first, "C"), (vec!["c".into(), "d".into()], false));
        assert_eq!(first_names(&g, &first, "S"), (vec!["c".into(), "d".into()], false));
        assert_eq!(follow_names(&g, &follow, "S"), vec!["$"]);
        assert_eq!(follow_names(&g, &follow, "C"), vec!["$", "c", "d"]);
    }

    #[test]
    fn nullable_sets() {
        let g = expr();
        let first = FirstSets::new(&g);
        let follow = FollowSets::new(&g, &first);

        assert_eq!(first_names(&g, &first, "E"), (vec!["(".into(), "id".into()], false));
        assert_eq!(first_names(&g, &first, "Ep"), (vec!["+".into()], true));
        assert_eq!(first_names(&g, &first, "Tp"), (vec!["*".into()], true));

        // terminals are numbered by first appearance: +, *, (, ), id
        assert_eq!(follow_names(&g, &follow, "E"), vec!["$", ")"]);
        assert_eq!(follow_names(&g, &follow, "Ep"), vec!["$", ")"]);
        assert_eq!(follow_names(&g, &follow, "T"), vec!["$", "+", ")"]);
        assert_eq!(follow_names(&g, &follow, "Tp"), vec!["$", "+", ")"]);
        assert_eq!(follow_names(&g, &follow, "F"), vec!["$", "+", "*", ")"]);
    }

    #[test]
    fn first_of_sentential_forms() {
        let g = expr();
        let first = FirstSets::new(&g);
        let tp = g.nonterminal("Tp").unwrap();
        let ep = g.nonterminal("Ep").unwrap();
        let rparen = g.terminal(")").unwrap();

        let form = first.first_of(&[SymbolID::N(tp), SymbolID::N(ep)]);
        assert_eq!(names(&g, &form.terminals), vec!["+", "*"]);
        assert!(form.nullable);

        let form = first.first_of(&[SymbolID::N(tp), SymbolID::T(rparen)]);
        assert_eq!(names(&g, &form.terminals), vec!["*", ")"]);
        assert!(!form.nullable);

        assert!(first.first_of(&[]).nullable);
    }

    #[test]
    fn rounds_are_monotonic_and_reach_a_fixpoint() {
        let g = expr();

        let mut first = FirstSets::empty(&g);
        loop {
            let before = first.clone();
            let changed = first.round(&g);
            for (n, set) in before.iter() {
                assert!(first.get(n).unwrap().is_superset(set));
            }
            if !changed {
                break;
            }
        }
        assert_eq!(first.sets, FirstSets::new(&g).sets);
        assert!(!first.round(&g));

        let mut follow = FollowSets::empty(&g);
        loop {
            let before = follow.clone();
            let changed = follow.round(&g, &first);
            for (n, set) in before.iter() {
                assert!(follow.get(n).unwrap().is_superset(set));
            }
            if !changed {
                break;
            }
        }
        assert!(!follow.round(&g, &first));
    }

    #[test]
    fn end_marker_follows_start_symbols() {
        let g = cc();
        let first = FirstSets::new(&g);
        let follow = FollowSets::new(&g, &first);
        assert!(follow.get(NonterminalID::START).unwrap().contains(TerminalID::EOI));
        assert!(follow.get(g.start_symbol).unwrap().contains(TerminalID::EOI));
    }
}
