//! End-to-end behaviour of grammar compilation, pass 1 and pass 2.

use twopass_core::{
    ActionTable, CompileError, Compiler, CompilerOptions, TokenId, TokenizeError,
};

const HELLO: TokenId = TokenId(10);
const PRINT: TokenId = TokenId(20);
const SET: TokenId = TokenId(21);
const X: TokenId = TokenId(30);
const Y: TokenId = TokenId(31);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn compiler(lexemes: &[(&str, TokenId)], grammar: &str) -> Compiler {
    init_logging();
    let mut compiler = Compiler::new(CompilerOptions::default().with_grammar_name("test"));
    for (lexeme, id) in lexemes {
        compiler
            .add_lexeme_token(lexeme, *id, true)
            .expect("register lexeme");
    }
    compiler.set_grammar(grammar).expect("compile grammar");
    compiler
}

#[test]
fn numeric_value_reaches_the_action() {
    let mut compiler = compiler(&[("hello", HELLO)], "<g> ::= 'hello' <#v>");

    let queue = compiler.tokenize("hello 42").expect("tokenize");
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.get(1).map(|i| i.token), Some(TokenId::NUMERIC));
    assert_eq!(queue.number(1), Some(42.0));

    let mut actions: ActionTable<Option<f64>> = ActionTable::new();
    actions.on(HELLO, |pass2, value| {
        *value = Some(pass2.next_token_value()?);
        Ok(())
    });
    let mut value = None;
    compiler
        .compile("hello 42", &mut actions, &mut value)
        .expect("compile");
    assert_eq!(value, Some(42.0));
}

#[test]
fn character_run_becomes_one_label() {
    let mut compiler = compiler(&[], "<label> ::= <char> {<char>}\n<char> ::= (abcdefg)");
    let queue = compiler.tokenize("bad").expect("tokenize");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.get(0).map(|i| i.token), Some(TokenId::CHARACTER));
    assert_eq!(queue.label(0), Some("bad"));
}

#[test]
fn first_alternative_short_circuits() {
    let mut compiler = compiler(&[("x", X), ("y", Y)], "<a> ::= 'x' | 'y'");
    let mut actions: ActionTable<Vec<TokenId>> = ActionTable::new();
    actions
        .on(X, |_, seen| {
            seen.push(X);
            Ok(())
        })
        .on(Y, |_, seen| {
            seen.push(Y);
            Ok(())
        });
    let mut seen = Vec::new();
    compiler.compile("x", &mut actions, &mut seen).expect("x");
    assert_eq!(seen, [X]);

    seen.clear();
    compiler.compile("y", &mut actions, &mut seen).expect("y");
    assert_eq!(seen, [Y]);
}

#[test]
fn optional_term_may_be_absent() {
    let mut compiler = compiler(&[], "<o> ::= 'a' ['b'] 'c'");
    assert_eq!(compiler.tokenize("ac").expect("ac").len(), 2);
    assert_eq!(compiler.tokenize("abc").expect("abc").len(), 3);

    let err = compiler.tokenize("aXc").unwrap_err();
    assert!(matches!(
        err,
        CompileError::Tokenize(TokenizeError::UnknownToken { line: 1, column: 2, .. })
    ));
}

#[test]
fn trailing_text_fails() {
    let mut compiler = compiler(&[("hello", HELLO)], "<g> ::= 'hello'");
    let err = compiler.tokenize("hello there").unwrap_err();
    let CompileError::Tokenize(TokenizeError::UnknownToken { line, column, near }) = err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!((line, column), (1, 7));
    assert_eq!(near, "there");
}

#[test]
fn actions_follow_source_order() {
    let grammar = "\
        <program> ::= {<statement>}\n\
        <statement> ::= 'print' <#value> | 'set' <name> <#value>\n\
        <name> ::= (abcdefghijklmnopqrstuvwxyz) {(abcdefghijklmnopqrstuvwxyz)}\n";
    let mut compiler = compiler(&[("print", PRINT), ("set", SET)], grammar);

    #[derive(Default)]
    struct Machine {
        trace: Vec<String>,
    }

    let mut actions: ActionTable<Machine> = ActionTable::new();
    actions
        .on(PRINT, |pass2, machine| {
            let value = pass2.next_token_value()?;
            machine.trace.push(format!("print {value}"));
            Ok(())
        })
        .on(SET, |pass2, machine| {
            let name = pass2.next_token_label()?;
            let value = pass2.next_token_value()?;
            machine.trace.push(format!("set {name} {value}"));
            Ok(())
        });

    let source = "set x 1\nprint 2 ; comment\nset yy 3.5";
    let mut machine = Machine::default();
    compiler
        .compile(source, &mut actions, &mut machine)
        .expect("compile");
    assert_eq!(machine.trace, ["set x 1", "print 2", "set yy 3.5"]);

    let queue = compiler.instructions().expect("queue");
    let action_tokens: Vec<TokenId> = queue
        .iter()
        .filter(|i| compiler.grammar().is_some_and(|g| g.has_action(i.token)))
        .map(|i| i.token)
        .collect();
    assert_eq!(action_tokens, [SET, PRINT, SET]);
    assert_eq!(queue.get(3).map(|i| i.line), Some(2));
}

#[test]
fn silent_terminals_stay_out_of_the_queue() {
    let mut compiler = compiler(
        &[],
        "<call> ::= <name> -'(' <#arg> -')'\n<name> ::= (abcdefghijklmnopqrstuvwxyz) {(abcdefghijklmnopqrstuvwxyz)}",
    );
    let queue = compiler.tokenize("sum(3)").expect("tokenize");
    let tokens: Vec<TokenId> = queue.iter().map(|i| i.token).collect();
    assert_eq!(tokens, [TokenId::CHARACTER, TokenId::NUMERIC]);
    assert_eq!(queue.label(0), Some("sum"));
    assert_eq!(queue.number(1), Some(3.0));
}

#[test]
fn not_test_rejects_reserved_words() {
    let mut compiler = compiler(
        &[],
        "<word> ::= (?!'end') <name>\n<name> ::= (abcdefghijklmnopqrstuvwxyz) {(abcdefghijklmnopqrstuvwxyz)}",
    );
    assert_eq!(
        compiler.tokenize("begin").expect("begin").label(0),
        Some("begin")
    );
    assert!(compiler.tokenize("end").is_err());
}

#[test]
fn action_errors_abort_the_compile() {
    let mut compiler = compiler(&[("hello", HELLO)], "<g> ::= {'hello'}");
    let mut actions: ActionTable<usize> = ActionTable::new();
    actions.on(HELLO, |pass2, calls| {
        *calls += 1;
        // nothing follows a bare hello, so there is no value to read
        pass2.next_token_value()?;
        Ok(())
    });
    let mut calls = 0;
    let err = compiler
        .compile("hello hello", &mut actions, &mut calls)
        .unwrap_err();
    assert!(matches!(err, CompileError::Access(_)));
    assert_eq!(calls, 1);
}
