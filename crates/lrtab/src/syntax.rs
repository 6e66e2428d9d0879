//! The textual grammar format.
//!
//! ```text
//! @terminal c, d;
//! @nonterminal S, C;
//! @start S;
//! @rule S := C C;
//! @rule C := c C | d;
//! @rule E := @empty | '+' E;
//! ```
//!
//! Grammar files are parsed with an SLR(1) table generated by this crate.

pub mod ast;
pub mod lexer;

use self::lexer::{Lexeme, Token};
use crate::{
    grammar::{Grammar, GrammarDef, GrammarError, NonterminalID, ProductionID, SymbolID, TerminalID},
    table::{Config, ParseTable},
    types::Map,
};
use lrtab_runtime::parser::{Parser, Rejection, Status, Step};

/// The productions of the grammar file syntax.
#[derive(Debug, Copy, Clone)]
enum Rule {
    Grammar,
    DescsEmpty,
    DescsPush,
    Terminal,
    Nonterminal,
    Start,
    Rule,
    IdentsOne,
    IdentsPush,
    ProductionsOne,
    ProductionsPush,
    ProductionEmpty,
    ProductionElems,
    ElemsOne,
    ElemsPush,
    ElemIdent,
    ElemLiteral,
}

/// The grammar of grammar files, and its parse table.
struct Syntax {
    grammar: Grammar,
    table: ParseTable,
    terminals: Map<&'static str, TerminalID>,
    rules: Map<ProductionID, Rule>,
}

impl Syntax {
    fn new() -> Result<Self, GrammarError> {
        let mut terminals = Map::default();
        let mut rules = Map::default();
        let grammar = Grammar::define(|g| {
            for name in [
                "@terminal", "@nonterminal", "@start", "@rule", "@empty", ":=", "|", ";", ",",
                "IDENT", "LITERAL",
            ] {
                terminals.insert(name, g.terminal(name)?);
            }
            let t = |name: &str| SymbolID::T(terminals[name]);

            let grammar = g.nonterminal("Grammar")?;
            let descs = g.nonterminal("Descs")?;
            let desc = g.nonterminal("Desc")?;
            let idents = g.nonterminal("Idents")?;
            let productions = g.nonterminal("Productions")?;
            let production = g.nonterminal("Production")?;
            let elems = g.nonterminal("Elems")?;
            let elem = g.nonterminal("Elem")?;
            use SymbolID::N;

            let mut rule = |g: &mut GrammarDef,
                            left: NonterminalID,
                            right: Vec<SymbolID>,
                            r: Rule|
             -> Result<(), GrammarError> {
                rules.insert(g.rule(left, right)?, r);
                Ok(())
            };
            rule(g, grammar, vec![N(descs)], Rule::Grammar)?;
            rule(g, descs, vec![], Rule::DescsEmpty)?;
            rule(g, descs, vec![N(descs), N(desc), t(";")], Rule::DescsPush)?;
            rule(g, desc, vec![t("@terminal"), N(idents)], Rule::Terminal)?;
            rule(g, desc, vec![t("@nonterminal"), N(idents)], Rule::Nonterminal)?;
            rule(g, desc, vec![t("@start"), t("IDENT")], Rule::Start)?;
            rule(
                g,
                desc,
                vec![t("@rule"), t("IDENT"), t(":="), N(productions)],
                Rule::Rule,
            )?;
            rule(g, idents, vec![t("IDENT")], Rule::IdentsOne)?;
            rule(g, idents, vec![N(idents), t(","), t("IDENT")], Rule::IdentsPush)?;
            rule(g, productions, vec![N(production)], Rule::ProductionsOne)?;
            rule(
                g,
                productions,
                vec![N(productions), t("|"), N(production)],
                Rule::ProductionsPush,
            )?;
            rule(g, production, vec![t("@empty")], Rule::ProductionEmpty)?;
            rule(g, production, vec![N(elems)], Rule::ProductionElems)?;
            rule(g, elems, vec![N(elem)], Rule::ElemsOne)?;
            rule(g, elems, vec![N(elems), N(elem)], Rule::ElemsPush)?;
            rule(g, elem, vec![t("IDENT")], Rule::ElemIdent)?;
            rule(g, elem, vec![t("LITERAL")], Rule::ElemLiteral)?;

            g.start_symbol(grammar)
        })?;
        let table = Config::new().generate(&grammar);

        Ok(Self {
            grammar,
            table,
            terminals,
            rules,
        })
    }

    fn terminal(&self, token: &Token<'_>) -> Option<TerminalID> {
        let name = match token {
            Token::KwTerminal => "@terminal",
            Token::KwNonterminal => "@nonterminal",
            Token::KwStart => "@start",
            Token::KwRule => "@rule",
            Token::KwEmpty => "@empty",
            Token::ColonEq => ":=",
            Token::VertBar => "|",
            Token::Semicolon => ";",
            Token::Comma => ",",
            Token::Ident(..) => "IDENT",
            Token::Literal(..) => "LITERAL",
        };
        self.terminals.get(name).copied()
    }
}

#[derive(Debug, Clone)]
struct Input<'source> {
    lexeme: Lexeme<'source>,
    terminal: Option<TerminalID>,
}
impl lrtab_runtime::parser::Token<TerminalID> for Input<'_> {
    fn as_symbol(&self) -> Option<TerminalID> {
        self.terminal
    }
}

enum StackItem {
    Token(String),
    Grammar(ast::Grammar),
    Descs(Vec<ast::Desc>),
    Desc(ast::Desc),
    Idents(Vec<String>),
    Productions(Vec<ast::Production>),
    Production(ast::Production),
    Elems(Vec<ast::Elem>),
    Elem(ast::Elem),
}

/// Parse the grammar file syntax.
pub fn parse(source: &str) -> Result<ast::Grammar, GrammarError> {
    let _span = tracing::trace_span!("parse").entered();

    let syntax = Syntax::new()?;
    let lexemes = lexer::tokenize(source).map_err(|line| GrammarError::Syntax {
        line,
        msg: "unrecognized character".into(),
    })?;
    let last_line = lexemes.last().map_or(1, |lexeme| lexeme.line);
    let input = lexemes.into_iter().map(|lexeme| Input {
        terminal: syntax.terminal(&lexeme.token),
        lexeme,
    });

    let mut parser = Parser::new(&syntax.table, input);
    let mut stack: Vec<StackItem> = vec![];
    macro_rules! internal_error {
        ($msg:expr) => {
            GrammarError::Syntax {
                line: last_line,
                msg: format!("internal error: {}", $msg),
            }
        };
    }
    macro_rules! pop_stack {
        ($Variant:ident) => {
            match stack.pop() {
                Some(StackItem::$Variant(item)) => item,
                _ => {
                    return Err(internal_error!(concat!(
                        "unexpected stack item, expecting ",
                        stringify!($Variant)
                    )))
                }
            }
        };
    }

    loop {
        let step = parser
            .step()
            .map_err(|err| internal_error!(err.to_string()))?;
        match step {
            Step::Shift { token, .. } => {
                tracing::trace!("shifting: {:?}", token.lexeme.token);
                let value = match token.lexeme.token {
                    Token::Ident(s) | Token::Literal(s) => s.to_owned(),
                    _ => String::new(),
                };
                stack.push(StackItem::Token(value));
            }

            Step::Reduce { reduce, .. } => {
                let rule = syntax
                    .rules
                    .get(&reduce)
                    .copied()
                    .ok_or_else(|| internal_error!("unknown production"))?;
                tracing::trace!("reducing: {:?}", rule);
                let item = match rule {
                    Rule::Grammar => {
                        let descs = pop_stack!(Descs);
                        StackItem::Grammar(ast::Grammar { descs })
                    }
                    Rule::DescsEmpty => StackItem::Descs(vec![]),
                    Rule::DescsPush => {
                        let _semicolon = pop_stack!(Token);
                        let desc = pop_stack!(Desc);
                        let mut descs = pop_stack!(Descs);
                        descs.push(desc);
                        StackItem::Descs(descs)
                    }
                    Rule::Terminal => {
                        let idents = pop_stack!(Idents);
                        let _keyword = pop_stack!(Token);
                        StackItem::Desc(ast::Desc::Terminal(idents))
                    }
                    Rule::Nonterminal => {
                        let idents = pop_stack!(Idents);
                        let _keyword = pop_stack!(Token);
                        StackItem::Desc(ast::Desc::Nonterminal(idents))
                    }
                    Rule::Start => {
                        let ident = pop_stack!(Token);
                        let _keyword = pop_stack!(Token);
                        StackItem::Desc(ast::Desc::Start(ident))
                    }
                    Rule::Rule => {
                        let productions = pop_stack!(Productions);
                        let _coloneq = pop_stack!(Token);
                        let left = pop_stack!(Token);
                        let _keyword = pop_stack!(Token);
                        StackItem::Desc(ast::Desc::Rule { left, productions })
                    }
                    Rule::IdentsOne => StackItem::Idents(vec![pop_stack!(Token)]),
                    Rule::IdentsPush => {
                        let ident = pop_stack!(Token);
                        let _comma = pop_stack!(Token);
                        let mut idents = pop_stack!(Idents);
                        idents.push(ident);
                        StackItem::Idents(idents)
                    }
                    Rule::ProductionsOne => StackItem::Productions(vec![pop_stack!(Production)]),
                    Rule::ProductionsPush => {
                        let production = pop_stack!(Production);
                        let _vert_bar = pop_stack!(Token);
                        let mut productions = pop_stack!(Productions);
                        productions.push(production);
                        StackItem::Productions(productions)
                    }
                    Rule::ProductionEmpty => {
                        let _keyword = pop_stack!(Token);
                        StackItem::Production(ast::Production::default())
                    }
                    Rule::ProductionElems => {
                        let elems = pop_stack!(Elems);
                        StackItem::Production(ast::Production { elems })
                    }
                    Rule::ElemsOne => StackItem::Elems(vec![pop_stack!(Elem)]),
                    Rule::ElemsPush => {
                        let elem = pop_stack!(Elem);
                        let mut elems = pop_stack!(Elems);
                        elems.push(elem);
                        StackItem::Elems(elems)
                    }
                    Rule::ElemIdent => StackItem::Elem(ast::Elem::Ident(pop_stack!(Token))),
                    Rule::ElemLiteral => StackItem::Elem(ast::Elem::Literal(pop_stack!(Token))),
                };
                stack.push(item);
            }

            Step::Accept => {
                return Ok(pop_stack!(Grammar));
            }

            Step::Reject(rejection) => {
                let (line, found) = match &rejection {
                    Rejection::NoAction {
                        lookahead: Some(input),
                        ..
                    }
                    | Rejection::UnknownToken { token: input, .. } => {
                        (input.lexeme.line, format!("{:?}", input.lexeme.token))
                    }
                    Rejection::NoAction {
                        lookahead: None, ..
                    } => (last_line, "end of input".to_owned()),
                };
                let expected: Vec<&str> = match parser.status() {
                    Status::Rejected(Rejection::NoAction { state, .. }) => syntax
                        .table
                        .states
                        .get(state)
                        .map(|row| {
                            row.actions
                                .keys()
                                .map(|t| syntax.grammar.terminal_name(*t))
                                .collect()
                        })
                        .unwrap_or_default(),
                    _ => vec![],
                };
                let mut msg = format!("unexpected {}", found);
                if !expected.is_empty() {
                    msg.push_str(&format!(", expected one of: {}", expected.join(" ")));
                }
                return Err(GrammarError::Syntax { line, msg });
            }
        }
    }
}

/// Build a grammar from its abstract syntax.
///
/// Nonterminal symbols are the declared ones and the left-hand sides of the
/// rules. Any other identifier is a terminal symbol.
pub fn define(ast: ast::Grammar) -> Result<Grammar, GrammarError> {
    let mut terminals: Vec<&str> = vec![];
    let mut nonterminals: Vec<&str> = vec![];
    let mut start: Option<&str> = None;
    for desc in &ast.descs {
        match desc {
            ast::Desc::Terminal(names) => terminals.extend(names.iter().map(String::as_str)),
            ast::Desc::Nonterminal(names) => {
                for name in names {
                    if !nonterminals.contains(&name.as_str()) {
                        nonterminals.push(name);
                    }
                }
            }
            ast::Desc::Rule { left, .. } => {
                if !nonterminals.contains(&left.as_str()) {
                    nonterminals.push(left);
                }
            }
            ast::Desc::Start(name) => {
                start.replace(name);
            }
        }
    }
    if let Some(name) = terminals.iter().find(|name| nonterminals.contains(*name)) {
        return Err(GrammarError::SymbolKindMismatch {
            name: (*name).to_owned(),
        });
    }

    Grammar::define(|g| {
        let mut symbols = Map::<&str, SymbolID>::default();
        for name in terminals {
            symbols.insert(name, SymbolID::T(g.terminal(name)?));
        }
        for name in nonterminals {
            symbols.insert(name, SymbolID::N(g.nonterminal(name)?));
        }

        for desc in &ast.descs {
            let ast::Desc::Rule { left, productions } = desc else {
                continue;
            };
            let left = match symbols.get(left.as_str()) {
                Some(SymbolID::N(n)) => *n,
                _ => {
                    return Err(GrammarError::SymbolKindMismatch {
                        name: left.clone(),
                    })
                }
            };
            for production in productions {
                let mut right = Vec::with_capacity(production.elems.len());
                for elem in &production.elems {
                    let symbol = match elem {
                        ast::Elem::Ident(name) => match symbols.get(name.as_str()) {
                            Some(symbol) => *symbol,
                            None => {
                                let symbol = SymbolID::T(g.terminal(name)?);
                                symbols.insert(name, symbol);
                                symbol
                            }
                        },
                        ast::Elem::Literal(name) => match symbols.get(name.as_str()) {
                            Some(SymbolID::T(t)) => SymbolID::T(*t),
                            Some(SymbolID::N(..)) => {
                                return Err(GrammarError::SymbolKindMismatch {
                                    name: name.clone(),
                                })
                            }
                            None => {
                                let symbol = SymbolID::T(g.terminal(name)?);
                                symbols.insert(name, symbol);
                                symbol
                            }
                        },
                    };
                    right.push(symbol);
                }
                g.rule(left, right)?;
            }
        }

        if let Some(start) = start {
            match symbols.get(start) {
                Some(SymbolID::N(n)) => g.start_symbol(*n)?,
                _ => {
                    return Err(GrammarError::UnknownStartSymbol {
                        name: start.to_owned(),
                    })
                }
            }
        }

        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn syntax_table_is_deterministic() {
        let syntax = Syntax::new().unwrap();
        assert!(syntax.table.is_deterministic());
    }

    #[test]
    fn parse_descs() {
        let grammar = parse(
            "@terminal c, d;\n\
             @start S;\n\
             @rule S := C C;\n\
             @rule C := c C | '+' | @empty;",
        )
        .unwrap();
        assert_eq!(
            grammar,
            ast::Grammar {
                descs: vec![
                    ast::Desc::Terminal(vec!["c".into(), "d".into()]),
                    ast::Desc::Start("S".into()),
                    ast::Desc::Rule {
                        left: "S".into(),
                        productions: vec![ast::Production {
                            elems: vec![ast::Elem::Ident("C".into()), ast::Elem::Ident("C".into())],
                        }],
                    },
                    ast::Desc::Rule {
                        left: "C".into(),
                        productions: vec![
                            ast::Production {
                                elems: vec![
                                    ast::Elem::Ident("c".into()),
                                    ast::Elem::Ident("C".into())
                                ],
                            },
                            ast::Production {
                                elems: vec![ast::Elem::Literal("+".into())],
                            },
                            ast::Production::default(),
                        ],
                    },
                ],
            }
        );
    }

    #[test]
    fn empty_source() {
        assert_eq!(parse("// nothing\n").unwrap(), ast::Grammar::default());
        assert!(matches!(
            Grammar::from_str("// nothing\n"),
            Err(GrammarError::EmptyGrammar)
        ));
    }

    #[test]
    fn syntax_errors() {
        let err = parse("@rule S := a;\n@rule := b;").unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 2, .. }), "{:?}", err);

        let err = parse("@rule S := a").unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 1, ref msg } if msg.contains("end of input")));
    }

    #[test]
    fn classification() {
        let g = Grammar::from_str(
            "@nonterminal X;\n\
             @rule S := X 'x' y;\n\
             @rule X := x;",
        )
        .unwrap();
        assert_eq!(g.classify("X"), Some(SymbolKind::Nonterminal));
        assert_eq!(g.classify("S"), Some(SymbolKind::Nonterminal));
        assert_eq!(g.classify("x"), Some(SymbolKind::Terminal));
        assert_eq!(g.classify("y"), Some(SymbolKind::Terminal));
        assert_eq!(g.nonterminal_name(g.start_symbol), "S");
    }

    #[test]
    fn nonterminal_declared_after_its_rule() {
        let before = Grammar::from_str("@nonterminal S;\n@rule S := a;").unwrap();
        let after = Grammar::from_str("@rule S := a;\n@nonterminal S;").unwrap();
        for g in [&before, &after] {
            assert_eq!(g.classify("S"), Some(SymbolKind::Nonterminal));
            assert_eq!(g.classify("a"), Some(SymbolKind::Terminal));
            assert_eq!(g.nonterminal_name(g.start_symbol), "S");
            assert_eq!(g.productions.len(), before.productions.len());
        }
    }

    #[test]
    fn kind_mismatch() {
        let err = Grammar::from_str("@terminal A;\n@rule A := a;").unwrap_err();
        assert!(matches!(err, GrammarError::SymbolKindMismatch { ref name } if name == "A"));

        let err = Grammar::from_str("@rule S := 'S';").unwrap_err();
        assert!(matches!(err, GrammarError::SymbolKindMismatch { ref name } if name == "S"));
    }

    #[test]
    fn explicit_start_symbol() {
        let g = Grammar::from_str("@start T;\n@rule S := a;\n@rule T := S b;").unwrap();
        assert_eq!(g.nonterminal_name(g.start_symbol), "T");

        let err = Grammar::from_str("@start a;\n@rule S := a;").unwrap_err();
        assert!(matches!(err, GrammarError::UnknownStartSymbol { .. }));
    }
}
