//! Parser.

use crate::definition::{ParseAction, ParseTable};
use std::fmt;

/// A trait for abstracting token symbols.
pub trait Token<TSym> {
    /// Return the terminal symbol of this token.
    ///
    /// A `None` means the token is not a terminal symbol known to the parse table.
    fn as_symbol(&self) -> Option<TSym>;
}

/// The shift-reduce parser driven based on the parse table.
pub struct Parser<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token<TDef::Terminal>,
{
    definition: TDef,
    state_stack: Vec<TDef::State>,
    item_stack: Vec<ParseItem<TTok, TDef::Nonterminal>>,
    input: Vec<TTok>,
    cursor: usize,
    status: Status<TDef::State, TTok>,
    step_limit: Option<usize>,
    num_steps: usize,
}

impl<TDef, TTok> fmt::Debug for Parser<TDef, TTok>
where
    TDef: ParseTable + fmt::Debug,
    TDef::State: fmt::Debug,
    TDef::Nonterminal: fmt::Debug,
    TTok: Token<TDef::Terminal> + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("definition", &self.definition)
            .field("state_stack", &self.state_stack)
            .field("item_stack", &self.item_stack)
            .field("remaining", &&self.input[self.cursor..])
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// The step record of a parser, with the associated types of `TDef` spelled out.
pub type ParseStep<TDef, TTok> = Step<
    <TDef as ParseTable>::State,
    <TDef as ParseTable>::Nonterminal,
    <TDef as ParseTable>::Reduce,
    TTok,
>;

/// The trace of a parser run, with the associated types of `TDef` spelled out.
pub type ParseTrace<TDef, TTok> = Trace<
    <TDef as ParseTable>::State,
    <TDef as ParseTable>::Nonterminal,
    <TDef as ParseTable>::Reduce,
    TTok,
>;

impl<TDef, TTok> Parser<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token<TDef::Terminal> + Clone,
{
    /// Create an instance of `Parser` over the specified tokens.
    ///
    /// The end of input is implicit: once `input` is exhausted the parse table
    /// is consulted with a `None` lookahead.
    pub fn new<I>(definition: TDef, input: I) -> Self
    where
        I: IntoIterator<Item = TTok>,
    {
        let initial_state = definition.initial_state();
        Self {
            definition,
            state_stack: vec![initial_state],
            item_stack: vec![],
            input: input.into_iter().collect(),
            cursor: 0,
            status: Status::Running,
            step_limit: None,
            num_steps: 0,
        }
    }

    /// Bound the number of steps taken by this parser.
    ///
    /// Tables built from conflicting grammars may reduce forever without
    /// consuming input; exceeding the limit is reported as
    /// [`ParseError::StepLimitExceeded`].
    pub fn set_step_limit(&mut self, limit: usize) -> &mut Self {
        self.step_limit.replace(limit);
        self
    }

    pub fn status(&self) -> &Status<TDef::State, TTok> {
        &self.status
    }

    pub fn states(&self) -> &[TDef::State] {
        &self.state_stack[..]
    }

    pub fn items(&self) -> &[ParseItem<TTok, TDef::Nonterminal>] {
        &self.item_stack[..]
    }

    /// Return the tokens that have not been shifted yet.
    pub fn remaining(&self) -> &[TTok] {
        &self.input[self.cursor..]
    }

    /// Perform exactly one transition of the automaton.
    pub fn step(&mut self) -> Result<ParseStep<TDef, TTok>, ParseError> {
        if !matches!(self.status, Status::Running) {
            return Err(ParseError::AlreadyFinished);
        }
        if let Some(limit) = self.step_limit {
            if self.num_steps >= limit {
                return Err(ParseError::StepLimitExceeded(limit));
            }
        }
        self.num_steps += 1;

        let current = self
            .state_stack
            .last()
            .copied()
            .ok_or(ParseError::EmptyStateStack)?;

        let lookahead = self.input.get(self.cursor);
        let symbol = match lookahead {
            Some(token) => match token.as_symbol() {
                Some(symbol) => Some(symbol),
                None => {
                    let rejection = Rejection::UnknownToken {
                        state: current,
                        token: token.clone(),
                    };
                    return Ok(self.reject(rejection));
                }
            },
            None => None,
        };

        match self.definition.action(current, symbol) {
            ParseAction::Shift(next) => {
                let token = lookahead.cloned().ok_or(ParseError::ShiftAtEndOfInput)?;
                self.item_stack.push(ParseItem::T(token.clone()));
                self.state_stack.push(next);
                self.cursor += 1;
                Ok(Step::Shift { token, next })
            }

            ParseAction::Reduce(reduce, lhs, n) => {
                if n > self.item_stack.len() || n >= self.state_stack.len() {
                    return Err(ParseError::StackUnderflow(n));
                }
                self.state_stack.truncate(self.state_stack.len() - n);
                self.item_stack.truncate(self.item_stack.len() - n);

                let top = self
                    .state_stack
                    .last()
                    .copied()
                    .ok_or(ParseError::EmptyStateStack)?;
                let next = self
                    .definition
                    .goto(top, lhs)
                    .ok_or(ParseError::MissingGoto)?;
                self.item_stack.push(ParseItem::N(lhs));
                self.state_stack.push(next);

                Ok(Step::Reduce {
                    reduce,
                    lhs,
                    len: n,
                    next,
                })
            }

            ParseAction::Accept => {
                self.status = Status::Accepted;
                Ok(Step::Accept)
            }

            ParseAction::Error => {
                let rejection = Rejection::NoAction {
                    state: current,
                    lookahead: lookahead.cloned(),
                };
                Ok(self.reject(rejection))
            }
        }
    }

    fn reject(&mut self, rejection: Rejection<TDef::State, TTok>) -> ParseStep<TDef, TTok> {
        self.status = Status::Rejected(rejection.clone());
        Step::Reject(rejection)
    }

    /// Drive the automaton until the input is accepted or rejected, recording
    /// the configuration before every step.
    pub fn run(mut self) -> Result<ParseTrace<TDef, TTok>, ParseError> {
        let mut entries = vec![];
        while matches!(self.status, Status::Running) {
            let states = self.state_stack.clone();
            let items = self.item_stack.clone();
            let remaining = self.remaining().to_vec();
            let step = self.step()?;
            entries.push(TraceEntry {
                states,
                items,
                remaining,
                step,
            });
        }
        Ok(Trace {
            entries,
            status: self.status,
        })
    }
}

/// An element of the symbol stack.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseItem<TTok, TSym> {
    T(TTok),
    N(TSym),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status<TState, TTok> {
    Running,
    Accepted,
    Rejected(Rejection<TState, TTok>),
}

/// The reason why the input was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection<TState, TTok> {
    /// The table has no action for the lookahead (`None` at the end of input).
    NoAction {
        state: TState,
        lookahead: Option<TTok>,
    },

    /// The lookahead token is not a terminal symbol of the table.
    UnknownToken { state: TState, token: TTok },
}

/// The transition performed by a single [`Parser::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum Step<TState, TSym, TReduce, TTok> {
    Shift {
        token: TTok,
        next: TState,
    },
    Reduce {
        reduce: TReduce,
        lhs: TSym,
        len: usize,
        next: TState,
    },
    Accept,
    Reject(Rejection<TState, TTok>),
}

/// The parser configuration observed just before a step, and the step itself.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry<TState, TSym, TReduce, TTok> {
    pub states: Vec<TState>,
    pub items: Vec<ParseItem<TTok, TSym>>,
    pub remaining: Vec<TTok>,
    pub step: Step<TState, TSym, TReduce, TTok>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trace<TState, TSym, TReduce, TTok> {
    pub entries: Vec<TraceEntry<TState, TSym, TReduce, TTok>>,
    pub status: Status<TState, TTok>,
}

impl<TState, TSym, TReduce, TTok> Trace<TState, TSym, TReduce, TTok> {
    pub fn is_accepted(&self) -> bool {
        matches!(self.status, Status::Accepted)
    }
}

/// Errors caused by an inconsistent parse table rather than by the input.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("the parser has already accepted or rejected the input")]
    AlreadyFinished,

    #[error("empty state stack")]
    EmptyStateStack,

    #[error("cannot pop {} symbols from the stack", _0)]
    StackUnderflow(usize),

    #[error("no goto entry for the reduced symbol")]
    MissingGoto,

    #[error("shift action on the end of input")]
    ShiftAtEndOfInput,

    #[error("the parser exceeded the step limit ({})", _0)]
    StepLimitExceeded(usize),
}
