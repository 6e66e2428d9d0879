//! Grammar types.

use crate::{types::Map, util::display_fn};
use std::{fmt, fs, io, path::Path};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminalID(u16);
impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self(0);
    const OFFSET: u16 = 1;

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}
impl fmt::Debug for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::EOI => write!(f, "T#End"),
            _ => write!(f, "T#{:03}", self.0),
        }
    }
}

/// A set of terminal symbols.
#[derive(Debug, Default, Clone)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}
impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.0.into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.0.into())
    }
    /// Add all elements of `other`, returning whether this set has grown.
    pub fn union_with(&mut self, other: &Self) -> bool {
        let before = self.inner.len();
        self.inner.union_with(&other.inner);
        self.inner.len() != before
    }
    pub fn is_superset(&self, other: &Self) -> bool {
        self.inner.is_superset(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    /// Iterate the elements in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner.iter().map(|raw| {
            // only IDs converted from `u16` are ever inserted.
            TerminalID(raw as u16)
        })
    }
}
impl PartialEq for TerminalSet {
    fn eq(&self, other: &Self) -> bool {
        self.inner.iter().eq(other.inner.iter())
    }
}
impl Eq for TerminalSet {}
impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| usize::from(t.0)).collect(),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonterminalID(u16);
impl NonterminalID {
    /// Reserved symbol used as the left-hand side of the augmented production.
    pub const START: Self = Self(0);
    const OFFSET: u16 = 1;

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}
impl fmt::Debug for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::START => write!(f, "N#Start"),
            _ => write!(f, "N#{:03}", self.0),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}
impl fmt::Debug for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T(t) => write!(f, "{:?}", t),
            Self::N(n) => write!(f, "{:?}", n),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Terminal,
    Nonterminal,
    EndMarker,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductionID(u16);
impl ProductionID {
    /// The augmented production `S' -> S`.
    pub const ACCEPT: Self = Self(0);
    const OFFSET: u16 = 1;

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}
impl fmt::Debug for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::ACCEPT => write!(f, "P#Accept"),
            _ => write!(f, "P#{:03}", self.0),
        }
    }
}
impl fmt::Display for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub left: NonterminalID,
    pub right: Vec<SymbolID>,
}
impl Production {
    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} -> ", g.nonterminal_name(self.left))?;
            if self.right.is_empty() {
                return f.write_str("ε");
            }
            for (i, symbol) in self.right.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                f.write_str(g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The grammar definition used to derive the parser tables.
///
/// Always contains the augmented production [`ProductionID::ACCEPT`]
/// (`S' -> S`) as its first production.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, String>,
    pub nonterminals: Map<NonterminalID, String>,
    pub productions: Map<ProductionID, Production>,
    pub start_symbol: NonterminalID,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#### terminals: ")?;
        for (i, name) in self.terminals.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
        }
        write!(f, "\n#### nonterminals: ")?;
        for (i, (&id, name)) in self.nonterminals.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
            if id == self.start_symbol {
                f.write_str(" (start)")?;
            }
        }
        writeln!(f, "\n#### productions:")?;
        for (id, p) in &self.productions {
            writeln!(f, "- ({}) {}", id, p.display(self))?;
        }
        Ok(())
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarError> {
        let source = fs::read_to_string(path).map_err(GrammarError::IO)?;
        Self::from_str(&source)
    }

    /// Read a grammar written in the textual grammar syntax.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(source: &str) -> Result<Grammar, GrammarError> {
        let grammar = crate::syntax::parse(source)?;
        crate::syntax::define(grammar)
    }

    /// Build a grammar from a list of `(lhs, alternatives)` pairs.
    ///
    /// Every symbol on a right-hand side that is neither in `nonterminals` nor
    /// the left-hand side of some rule is treated as a terminal symbol.
    pub fn from_rules(
        start: &str,
        nonterminals: &[&str],
        rules: &[(&str, Vec<Vec<&str>>)],
    ) -> Result<Grammar, GrammarError> {
        if rules.iter().all(|(_, alternatives)| alternatives.is_empty()) {
            return Err(GrammarError::EmptyGrammar);
        }

        Grammar::define(|g| {
            let mut symbols = Map::<&str, SymbolID>::default();
            for &name in nonterminals.iter().chain(rules.iter().map(|(left, _)| left)) {
                if !symbols.contains_key(name) {
                    symbols.insert(name, SymbolID::N(g.nonterminal(name)?));
                }
            }

            for (left, alternatives) in rules {
                let left = match symbols.get(left) {
                    Some(SymbolID::N(n)) => *n,
                    _ => {
                        return Err(GrammarError::SymbolKindMismatch {
                            name: (*left).to_owned(),
                        })
                    }
                };
                for alternative in alternatives {
                    let mut right = Vec::with_capacity(alternative.len());
                    for &name in alternative {
                        let symbol = match symbols.get(name) {
                            Some(symbol) => *symbol,
                            None => {
                                let symbol = SymbolID::T(g.terminal(name)?);
                                symbols.insert(name, symbol);
                                symbol
                            }
                        };
                        right.push(symbol);
                    }
                    g.rule(left, right)?;
                }
            }

            match symbols.get(start) {
                Some(SymbolID::N(n)) => g.start_symbol(*n),
                _ => Err(GrammarError::UnknownStartSymbol {
                    name: start.to_owned(),
                }),
            }
        })
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            productions: Map::default(),
            start: None,
            next_terminal: TerminalID::OFFSET,
            next_nonterminal: NonterminalID::OFFSET,
            next_production: ProductionID::OFFSET,
        };

        def.terminals.insert(TerminalID::EOI, END_MARKER.into());
        // renamed in `end()`, once the start symbol is known.
        def.nonterminals.insert(NonterminalID::START, "<start>".into());

        f(&mut def)?;

        def.end()
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[&id]
    }

    /// Iterate the productions whose left-hand side is `n`, in declaration order.
    pub fn productions_of(
        &self,
        n: NonterminalID,
    ) -> impl Iterator<Item = (ProductionID, &Production)> + '_ {
        self.productions
            .iter()
            .filter(move |(_, p)| p.left == n)
            .map(|(id, p)| (*id, p))
    }

    pub fn terminal_name(&self, t: TerminalID) -> &str {
        self.terminals.get(&t).map_or("<unknown>", String::as_str)
    }

    pub fn nonterminal_name(&self, n: NonterminalID) -> &str {
        self.nonterminals.get(&n).map_or("<unknown>", String::as_str)
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminal_name(t),
            SymbolID::N(n) => self.nonterminal_name(n),
        }
    }

    /// Look up a terminal symbol by name. The end-marker `$` is included.
    pub fn terminal(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(id, _)| *id)
    }

    /// Look up a nonterminal symbol by name. The augmented start symbol is included.
    pub fn nonterminal(&self, name: &str) -> Option<NonterminalID> {
        self.nonterminals
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(id, _)| *id)
    }

    /// Return the kind of the symbol with the specified name.
    pub fn classify(&self, name: &str) -> Option<SymbolKind> {
        match self.terminal(name) {
            Some(TerminalID::EOI) => Some(SymbolKind::EndMarker),
            Some(_) => Some(SymbolKind::Terminal),
            None => self.nonterminal(name).map(|_| SymbolKind::Nonterminal),
        }
    }

    /// Return the nonterminal symbols that never appear as a left-hand side.
    pub fn nonterminals_without_productions(&self) -> impl Iterator<Item = NonterminalID> + '_ {
        self.nonterminals
            .keys()
            .copied()
            .filter(|&n| self.productions.values().all(|p| p.left != n))
    }
}

/// The name of the end-marker.
pub const END_MARKER: &str = "$";

/// The contextual values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, String>,
    nonterminals: Map<NonterminalID, String>,
    productions: Map<ProductionID, Production>,
    start: Option<NonterminalID>,
    next_terminal: u16,
    next_nonterminal: u16,
    next_production: u16,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarError> {
        self.verify_new_name(name)?;
        let id = TerminalID(self.next_terminal);
        self.next_terminal = self
            .next_terminal
            .checked_add(1)
            .ok_or(GrammarError::TooMany("terminal symbols"))?;
        self.terminals.insert(id, name.to_owned());
        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarError> {
        self.verify_new_name(name)?;
        let id = NonterminalID(self.next_nonterminal);
        self.next_nonterminal = self
            .next_nonterminal
            .checked_add(1)
            .ok_or(GrammarError::TooMany("nonterminal symbols"))?;
        self.nonterminals.insert(id, name.to_owned());
        Ok(id)
    }

    /// Add a production rule to this grammar.
    ///
    /// An empty `right` is an epsilon production.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<ProductionID, GrammarError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let right: Vec<_> = right.into_iter().collect();
        for symbol in Some(SymbolID::N(left)).iter().chain(&right) {
            match *symbol {
                SymbolID::N(NonterminalID::START) | SymbolID::T(TerminalID::EOI) => {
                    return Err(GrammarError::ReservedSymbol {
                        name: self.name_of(*symbol).to_owned(),
                    });
                }
                SymbolID::N(n) if !self.nonterminals.contains_key(&n) => {
                    return Err(GrammarError::UnknownSymbol(*symbol));
                }
                SymbolID::T(t) if !self.terminals.contains_key(&t) => {
                    return Err(GrammarError::UnknownSymbol(*symbol));
                }
                _ => (),
            }
        }

        let production = Production { left, right };
        if self.productions.values().any(|p| *p == production) {
            let mut rule = self.name_of(SymbolID::N(left)).to_owned();
            rule.push_str(" ->");
            for symbol in &production.right {
                rule.push(' ');
                rule.push_str(self.name_of(*symbol));
            }
            return Err(GrammarError::DuplicateProduction { rule });
        }

        let id = ProductionID(self.next_production);
        self.next_production = self
            .next_production
            .checked_add(1)
            .ok_or(GrammarError::TooMany("production rules"))?;
        self.productions.insert(id, production);
        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarError> {
        if symbol == NonterminalID::START {
            return Err(GrammarError::ReservedSymbol {
                name: "<start>".into(),
            });
        }
        if !self.nonterminals.contains_key(&symbol) {
            return Err(GrammarError::UnknownSymbol(SymbolID::N(symbol)));
        }
        self.start.replace(symbol);
        Ok(())
    }

    fn name_of(&self, symbol: SymbolID) -> &str {
        let name = match symbol {
            SymbolID::T(t) => self.terminals.get(&t),
            SymbolID::N(n) => self.nonterminals.get(&n),
        };
        name.map_or("<unknown>", String::as_str)
    }

    fn verify_new_name(&self, name: &str) -> Result<(), GrammarError> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(GrammarError::InvalidName { name: name.into() });
        }
        if name == END_MARKER {
            return Err(GrammarError::ReservedSymbol { name: name.into() });
        }
        if self.terminals.values().chain(self.nonterminals.values()).any(|n| n == name) {
            return Err(GrammarError::DuplicateSymbol { name: name.into() });
        }
        Ok(())
    }

    // Performs the grammar augmentation.
    fn end(self) -> Result<Grammar, GrammarError> {
        if self.productions.is_empty() {
            return Err(GrammarError::EmptyGrammar);
        }

        // The start symbol defaults to the left-hand side of the first rule.
        let start = match self.start {
            Some(start) => start,
            None => match self.productions.values().next() {
                Some(p) => p.left,
                None => return Err(GrammarError::EmptyGrammar),
            },
        };

        let mut augmented = format!("{}'", self.name_of(SymbolID::N(start)));
        while self.nonterminals.values().any(|n| *n == augmented) {
            augmented.push('\'');
        }
        let mut nonterminals = self.nonterminals;
        nonterminals.insert(NonterminalID::START, augmented);

        let mut productions = Map::default();
        productions.insert(
            ProductionID::ACCEPT,
            Production {
                left: NonterminalID::START,
                right: vec![SymbolID::N(start)],
            },
        );
        productions.extend(self.productions);

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals,
            productions,
            start_symbol: start,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("syntax error at line {}: {}", line, msg)]
    Syntax { line: usize, msg: String },

    #[error("the grammar has no production rules")]
    EmptyGrammar,

    #[error("the symbol `{}' has already been declared", name)]
    DuplicateSymbol { name: String },

    #[error("duplicate production rule: `{}'", rule)]
    DuplicateProduction { rule: String },

    #[error("`{}' is reserved and cannot be used here", name)]
    ReservedSymbol { name: String },

    #[error("incorrect symbol name: `{}'", name)]
    InvalidName { name: String },

    #[error("`{}' is used both as a terminal and as a nonterminal symbol", name)]
    SymbolKindMismatch { name: String },

    #[error("unknown start symbol: `{}'", name)]
    UnknownStartSymbol { name: String },

    #[error("the symbol {:?} is not declared in this grammar", _0)]
    UnknownSymbol(SymbolID),

    #[error("too many {}", _0)]
    TooMany(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use SymbolID::*;

    fn cc() -> Grammar {
        Grammar::define(|g| {
            let c = g.terminal("c")?;
            let d = g.terminal("d")?;
            let s = g.nonterminal("S")?;
            let cc = g.nonterminal("C")?;
            g.start_symbol(s)?;
            g.rule(s, [N(cc), N(cc)])?;
            g.rule(cc, [T(c), N(cc)])?;
            g.rule(cc, [T(d)])?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn augmented_production_comes_first() {
        let g = cc();
        let (id, accept) = g.productions.first().unwrap();
        assert_eq!(*id, ProductionID::ACCEPT);
        assert_eq!(accept.left, NonterminalID::START);
        assert_eq!(accept.right, vec![N(g.start_symbol)]);
        assert_eq!(g.nonterminal_name(NonterminalID::START), "S'");
        assert_eq!(g.productions.len(), 4);
    }

    #[test]
    fn augmented_name_avoids_collisions() {
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let e = g.nonterminal("E")?;
            let e2 = g.nonterminal("E'")?;
            g.rule(e, [N(e2)])?;
            g.rule(e2, [T(a)])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(g.nonterminal_name(NonterminalID::START), "E''");
    }

    #[test]
    fn classify_symbols() {
        let g = cc();
        assert_eq!(g.classify("c"), Some(SymbolKind::Terminal));
        assert_eq!(g.classify("C"), Some(SymbolKind::Nonterminal));
        assert_eq!(g.classify("$"), Some(SymbolKind::EndMarker));
        assert_eq!(g.classify("x"), None);
    }

    #[test]
    fn empty_grammar() {
        let err = Grammar::define(|g| {
            g.nonterminal("S")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::EmptyGrammar));
    }

    #[test]
    fn duplicated_symbols_and_rules() {
        let err = Grammar::define(|g| {
            g.terminal("x")?;
            g.nonterminal("x")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::DuplicateSymbol { name } if name == "x"));

        let err = Grammar::define(|g| {
            let x = g.terminal("x")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(x)])?;
            g.rule(s, [T(x)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::DuplicateProduction { rule } if rule == "S -> x"));
    }

    #[test]
    fn reserved_symbols() {
        let err = Grammar::define(|g| {
            g.terminal("$")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::ReservedSymbol { .. }));

        let err = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            g.rule(s, [N(NonterminalID::START)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::ReservedSymbol { .. }));
    }

    #[test]
    fn from_rules_treats_undeclared_symbols_as_terminals() {
        let g = Grammar::from_rules(
            "E",
            &["E", "T"],
            &[
                ("E", vec![vec!["E", "+", "T"], vec!["T"]]),
                ("T", vec![vec!["id"]]),
            ],
        )
        .unwrap();
        assert_eq!(g.classify("id"), Some(SymbolKind::Terminal));
        assert_eq!(g.classify("+"), Some(SymbolKind::Terminal));
        assert_eq!(g.classify("T"), Some(SymbolKind::Nonterminal));
        assert_eq!(g.nonterminal_name(g.start_symbol), "E");
    }

    #[test]
    fn from_rules_unknown_start() {
        let err = Grammar::from_rules("X", &[], &[("S", vec![vec!["a"]])]).unwrap_err();
        assert!(matches!(err, GrammarError::UnknownStartSymbol { name } if name == "X"));
    }

    #[test]
    fn epsilon_production_display() {
        let g = Grammar::from_rules("A", &[], &[("A", vec![vec![], vec!["a", "A"]])]).unwrap();
        let rendered: Vec<_> = g
            .productions
            .values()
            .map(|p| p.display(&g).to_string())
            .collect();
        assert_eq!(rendered, vec!["A' -> A", "A -> ε", "A -> a A"]);
    }

    #[test]
    fn from_rules_left_sides_are_nonterminals_before_use() {
        // `B` is used before its rule and is never declared up front.
        let g = Grammar::from_rules(
            "A",
            &[],
            &[("A", vec![vec!["B", "b"]]), ("B", vec![vec!["b"]])],
        )
        .unwrap();
        assert_eq!(g.classify("B"), Some(SymbolKind::Nonterminal));
        assert_eq!(g.classify("b"), Some(SymbolKind::Terminal));
        let b = g.nonterminal("B").unwrap();
        assert_eq!(g.productions_of(b).count(), 1);
    }
}
