//! Printable reports that combine several analyses.

use crate::{
    first_follow::{FirstSets, FollowSets},
    grammar::{Grammar, NonterminalID, TerminalSet},
    util::display_fn,
};
use std::fmt;

/// `FIRST(X) = { ... }` and `FOLLOW(X) = { ... }` lines for every nonterminal
/// symbol except the augmented start symbol. `ε` marks a nullable symbol.
pub fn first_follow<'g>(
    g: &'g Grammar,
    first: &'g FirstSets,
    follow: &'g FollowSets,
) -> impl fmt::Display + 'g {
    display_fn(move |f| {
        writeln!(f, "#### FIRST sets:")?;
        for (n, set) in first.iter().filter(|(n, _)| *n != NonterminalID::START) {
            write!(f, "FIRST({}) = {{", g.nonterminal_name(n))?;
            write_terminals(f, g, &set.terminals, set.nullable)?;
            writeln!(f, " }}")?;
        }
        writeln!(f, "#### FOLLOW sets:")?;
        for (n, set) in follow.iter().filter(|(n, _)| *n != NonterminalID::START) {
            write!(f, "FOLLOW({}) = {{", g.nonterminal_name(n))?;
            write_terminals(f, g, set, false)?;
            writeln!(f, " }}")?;
        }
        Ok(())
    })
}

fn write_terminals(
    f: &mut fmt::Formatter<'_>,
    g: &Grammar,
    set: &TerminalSet,
    epsilon: bool,
) -> fmt::Result {
    let names = set
        .iter()
        .map(|t| g.terminal_name(t))
        .chain(epsilon.then_some("ε"));
    for (i, name) in names.enumerate() {
        f.write_str(if i > 0 { ", " } else { " " })?;
        f.write_str(name)?;
    }
    Ok(())
}
