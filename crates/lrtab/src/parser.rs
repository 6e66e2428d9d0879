//! Running the shift-reduce driver over a sequence of terminal names.

use crate::{
    grammar::{Grammar, NonterminalID, ProductionID, TerminalID, END_MARKER},
    lr0::StateID,
    table::ParseTable,
    util::{display_fn, write_columns},
};
use lrtab_runtime::parser::{ParseItem, Parser, Rejection, Status, Step, Token, Trace};
use std::fmt;

/// An input token, identified by the name of a terminal symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputToken {
    pub name: String,
    /// `None` if the name is not a terminal symbol of the grammar.
    pub terminal: Option<TerminalID>,
}

impl InputToken {
    pub fn new(g: &Grammar, name: &str) -> Self {
        Self {
            name: name.to_owned(),
            terminal: g.terminal(name).filter(|t| *t != TerminalID::EOI),
        }
    }
}

impl Token<TerminalID> for InputToken {
    fn as_symbol(&self) -> Option<TerminalID> {
        self.terminal
    }
}

pub type ParseTrace = Trace<StateID, NonterminalID, ProductionID, InputToken>;

/// The reason why an input was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected {} in state {}", display_lookahead(lookahead), state)]
    UnexpectedToken {
        state: StateID,
        /// `None` at the end of input.
        lookahead: Option<String>,
    },

    #[error("unknown token `{}' in state {}", token, state)]
    UnknownToken { state: StateID, token: String },
}

fn display_lookahead(lookahead: &Option<String>) -> String {
    match lookahead {
        Some(name) => format!("token `{}'", name),
        None => "end of input".into(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(ParseError),
}

/// The trace of a parser run and its verdict.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub trace: ParseTrace,
    pub verdict: Verdict,
}

impl ParseOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self.verdict, Verdict::Accepted)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let mut rows = Vec::with_capacity(self.trace.entries.len() + 1);
            rows.push(vec!["Stack".to_owned(), "Input".to_owned(), "Action".to_owned()]);
            for entry in &self.trace.entries {
                let mut stack = String::new();
                for (i, state) in entry.states.iter().enumerate() {
                    if i > 0 {
                        stack.push(' ');
                        match entry.items.get(i - 1) {
                            Some(ParseItem::T(token)) => stack.push_str(&token.name),
                            Some(ParseItem::N(n)) => stack.push_str(g.nonterminal_name(*n)),
                            None => stack.push('?'),
                        }
                        stack.push(' ');
                    }
                    stack.push_str(&state.to_string());
                }

                let mut input: Vec<&str> = entry.remaining.iter().map(|t| t.name.as_str()).collect();
                input.push(END_MARKER);

                let action = match &entry.step {
                    Step::Shift { next, .. } => format!("shift {}", next),
                    Step::Reduce { reduce, .. } => {
                        format!("reduce {}", g.production(*reduce).display(g))
                    }
                    Step::Accept => "accept".to_owned(),
                    Step::Reject(..) => "error".to_owned(),
                };

                rows.push(vec![stack, input.join(" "), action]);
            }
            write_columns(f, &rows)?;

            match &self.verdict {
                Verdict::Accepted => writeln!(f, "accepted"),
                Verdict::Rejected(err) => writeln!(f, "rejected: {}", err),
            }
        })
    }
}

/// Parse the sequence of terminal names using the specified table.
///
/// The end-marker is implicit; a single trailing `$` is ignored. Errors are
/// returned only for defects of the table itself, a rejected input is
/// reported through [`Verdict::Rejected`].
pub fn parse<I>(
    g: &Grammar,
    table: &ParseTable,
    input: I,
) -> Result<ParseOutcome, lrtab_runtime::parser::ParseError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut tokens: Vec<InputToken> = input
        .into_iter()
        .map(|name| InputToken::new(g, name.as_ref()))
        .collect();
    if tokens.last().map_or(false, |t| t.name == END_MARKER) {
        tokens.pop();
    }
    let num_tokens = tokens.len();

    let mut parser = Parser::new(table, tokens);
    if !table.is_deterministic() {
        // conflicted tables may keep reducing without consuming input.
        let limit = 16 * (num_tokens + 1) * (table.states.len() + 1);
        parser.set_step_limit(limit);
    }

    let trace = parser.run()?;
    let verdict = match &trace.status {
        Status::Accepted => Verdict::Accepted,
        Status::Rejected(Rejection::NoAction { state, lookahead }) => {
            Verdict::Rejected(ParseError::UnexpectedToken {
                state: *state,
                lookahead: lookahead.as_ref().map(|t| t.name.clone()),
            })
        }
        Status::Rejected(Rejection::UnknownToken { state, token }) => {
            Verdict::Rejected(ParseError::UnknownToken {
                state: *state,
                token: token.name.clone(),
            })
        }
        Status::Running => unreachable!("the parser stops only after accepting or rejecting"),
    };

    tracing::trace!(steps = trace.entries.len(), ?verdict, "parsed");

    Ok(ParseOutcome { trace, verdict })
}
