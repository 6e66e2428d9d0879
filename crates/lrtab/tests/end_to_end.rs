use lrtab::{
    first_follow::{FirstSets, FollowSets},
    grammar::{Grammar, GrammarError, TerminalID},
    lr0::{Automaton, StateID},
    parser::{parse, InputToken, ParseError, Verdict},
    table::{Action, ConflictKind, Config, Method, ParseTable},
};
use lrtab_runtime::parser::Parser;
use pretty_assertions::assert_eq;
use std::{env, path::PathBuf, sync::Arc, thread};

fn load(name: &str) -> Grammar {
    let path = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap())
        .join(format!("tests/{}.lll", name));
    Grammar::from_file(path).unwrap()
}

fn accepts(g: &Grammar, table: &ParseTable, input: &str) -> bool {
    parse(g, table, input.split_whitespace()).unwrap().is_accepted()
}

#[test]
fn cc_language() {
    let g = load("cc");
    let table = Config::new().generate(&g).deny_conflicts().unwrap();

    assert!(accepts(&g, &table, "c c d d"));
    assert!(accepts(&g, &table, "d d"));
    assert!(accepts(&g, &table, "c c d d $"));
    assert!(!accepts(&g, &table, "c d"));
    assert!(!accepts(&g, &table, "c"));
    assert!(!accepts(&g, &table, ""));

    let outcome = parse(&g, &table, ["c", "d"]).unwrap();
    assert_eq!(
        outcome.verdict,
        Verdict::Rejected(ParseError::UnexpectedToken {
            state: StateID::from_raw(2),
            lookahead: None,
        })
    );
}

#[test]
fn empty_grammar() {
    let err = Grammar::from_str("@terminal a;\n@nonterminal S;").unwrap_err();
    assert!(matches!(err, GrammarError::EmptyGrammar));
    let err = Grammar::from_rules("S", &["S"], &[]).unwrap_err();
    assert!(matches!(err, GrammarError::EmptyGrammar));
    let err = Grammar::from_rules("S", &[], &[]).unwrap_err();
    assert!(matches!(err, GrammarError::EmptyGrammar));
    let err = Grammar::from_rules("S", &[], &[("S", vec![])]).unwrap_err();
    assert!(matches!(err, GrammarError::EmptyGrammar));
}

#[test]
fn dangling_else_conflict() {
    let g = load("dangling_else");
    let table = Config::new().generate(&g);

    let e = g.terminal("e").unwrap();
    let conflicts = table.conflicts();
    assert_eq!(conflicts.len(), 1);
    let conflict = &conflicts[0];
    assert_eq!(conflict.kind(), ConflictKind::ShiftReduce);
    assert_eq!(conflict.state, StateID::from_raw(4));
    assert_eq!(conflict.terminal, e);
    assert_eq!(g.nonterminal_name(conflict.lhs), "S");
    assert_eq!(conflict.existing, Action::Shift(StateID::from_raw(5)));
    assert!(matches!(conflict.incoming, Action::Reduce(..)));
    assert_eq!(table.action(conflict.state, e), conflict.incoming);

    let err = table.deny_conflicts().unwrap_err();
    assert_eq!(err.method, Method::SLR);
    assert_eq!(err.conflicts.len(), 1);
}

#[test]
fn slr_resolves_lr0_conflicts() {
    let g = load("arithmetic");

    let lr0 = Config::new().use_lr0().generate(&g);
    let star = g.terminal("*").unwrap();
    assert_eq!(lr0.conflicts().len(), 2);
    for conflict in lr0.conflicts() {
        assert_eq!(conflict.kind(), ConflictKind::ShiftReduce);
        assert_eq!(conflict.terminal, star);
    }

    let slr = Config::new().generate(&g).deny_conflicts().unwrap();
    assert!(accepts(&g, &slr, "id + id * id"));
    assert!(accepts(&g, &slr, "( id + id ) * id"));
    assert!(!accepts(&g, &slr, "id + * id"));
    assert!(!accepts(&g, &slr, "( id"));

    let outcome = parse(&g, &slr, ["id", "-", "id"]).unwrap();
    assert!(matches!(
        outcome.verdict,
        Verdict::Rejected(ParseError::UnknownToken { ref token, .. }) if token == "-"
    ));
}

#[test]
fn nullable_grammar() {
    let g = load("nullable");
    let table = Config::new().generate(&g).deny_conflicts().unwrap();
    assert!(accepts(&g, &table, "id"));
    assert!(accepts(&g, &table, "id * ( id + id )"));
    assert!(!accepts(&g, &table, "id +"));
}

#[test]
fn tables_are_total_and_deterministic() {
    for name in ["cc", "arithmetic", "nullable"] {
        let g = load(name);
        let automaton = Automaton::build(&g);
        let first = FirstSets::new(&g);
        let follow = FollowSets::new(&g, &first);
        let table = ParseTable::slr(&g, &automaton, &follow);
        assert!(table.is_deterministic(), "{}", name);
        assert_eq!(table.states.len(), automaton.len());

        for (id, state) in &automaton.states {
            for t in g.terminals.keys() {
                let action = table.action(*id, *t);
                if let Some(next) = state.shifts.get(t) {
                    assert_eq!(action, Action::Shift(*next));
                }
            }
            for (n, next) in &state.gotos {
                assert_eq!(table.goto(*id, *n), Some(*next));
            }
        }

        let accepting = automaton
            .states
            .keys()
            .filter(|id| table.action(**id, TerminalID::EOI) == Action::Accept)
            .count();
        assert_eq!(accepting, 1, "{}", name);
    }
}

#[test]
fn tables_are_shared_across_threads() {
    let g = Arc::new(load("arithmetic"));
    let table = Arc::new(Config::new().generate(&g));

    let handles: Vec<_> = ["id", "id + id", "id * ( id )", "id +"]
        .into_iter()
        .map(|input| {
            let g = Arc::clone(&g);
            let table = Arc::clone(&table);
            thread::spawn(move || {
                let tokens: Vec<_> = input
                    .split_whitespace()
                    .map(|name| InputToken::new(&g, name))
                    .collect();
                Parser::new(table, tokens).run().unwrap().is_accepted()
            })
        })
        .collect();

    let verdicts: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(verdicts, vec![true, true, true, false]);
}
