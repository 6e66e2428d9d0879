//! Abstract syntax of grammar files.

#[derive(Debug, Default, PartialEq)]
pub struct Grammar {
    pub descs: Vec<Desc>,
}

#[derive(Debug, PartialEq)]
pub enum Desc {
    Terminal(Vec<String>),
    Nonterminal(Vec<String>),
    Start(String),
    Rule {
        left: String,
        productions: Vec<Production>,
    },
}

/// An alternative of a rule. `@empty` is an empty `elems`.
#[derive(Debug, Default, PartialEq)]
pub struct Production {
    pub elems: Vec<Elem>,
}

#[derive(Debug, PartialEq)]
pub enum Elem {
    Ident(String),
    /// A quoted name, always a terminal symbol.
    Literal(String),
}
