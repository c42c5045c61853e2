//! Pass 1 always terminates, and a single repeat never runs more passes
//! than there are characters in the source.

use std::collections::HashMap;

use proptest::prelude::*;
use twopass_core::{
    CompilerOptions, GrammarTable, LexemeDef, Operation, TokenizeError, compile_grammar, tokenize,
};

const GRAMMARS: &[&str] = &[
    "<s> ::= {<item>}\n<item> ::= 'a' | 'b' [<#n>]",
    // the repeated rule can pass without consuming anything
    "<s> ::= {<maybe>}\n<maybe> ::= [<w>]\n<w> ::= (ab) {(ab)}",
    "<s> ::= {<w>} {<#n>}\n<w> ::= (ab01) {(ab01)} [<#n>]",
    "<s> ::= {<x>}\n<x> ::= (?!'b') <w> | 'b' {'-'}\n<w> ::= (a0123456789.) {(a0123456789.)}",
];

#[derive(Debug, Clone)]
enum Atom {
    Terminal(&'static str),
    Set,
    Number,
    /// Reference to a rule further down; past the last rule it becomes `'b'`.
    Rule(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Wrap {
    Plain,
    Optional,
    Repeat,
    Not,
    Or,
}

fn atom() -> impl Strategy<Value = Atom> {
    prop_oneof![
        prop::sample::select(vec!["a", "b", "ab"]).prop_map(Atom::Terminal),
        Just(Atom::Set),
        Just(Atom::Number),
        (0usize..4).prop_map(Atom::Rule),
    ]
}

fn wrap() -> impl Strategy<Value = Wrap> {
    prop::sample::select(vec![Wrap::Plain, Wrap::Optional, Wrap::Repeat, Wrap::Not, Wrap::Or])
}

/// Renders an acyclic grammar: rule `r{i}` only refers to rules after it.
/// With `hollow` set, every term of `r0` is optional, so the root repeats a
/// rule that can pass without consuming anything.
fn render(rules: &[Vec<(Wrap, Atom)>], hollow: bool) -> String {
    let mut text = String::from("<s> ::= {<r0>}\n");
    for (index, terms) in rules.iter().enumerate() {
        text.push_str(&format!("<r{index}> ::="));
        for (position, (wrap, atom)) in terms.iter().enumerate() {
            let atom = match atom {
                Atom::Terminal(lexeme) => format!("'{lexeme}'"),
                Atom::Set => "(ab)".to_string(),
                Atom::Number => "<#n>".to_string(),
                Atom::Rule(offset) if index + 1 + offset < rules.len() => {
                    format!("<r{}>", index + 1 + offset)
                }
                Atom::Rule(_) => "'b'".to_string(),
            };
            let wrap = match (*wrap, position) {
                _ if hollow && index == 0 => Wrap::Optional,
                (Wrap::Or, 0) => Wrap::Plain,
                (wrap, _) => wrap,
            };
            let term = match wrap {
                Wrap::Plain => atom,
                Wrap::Optional => format!("[{atom}]"),
                Wrap::Repeat => format!("{{{atom}}}"),
                Wrap::Not => format!("(?!{atom})"),
                Wrap::Or => format!("| {atom}"),
            };
            text.push(' ');
            text.push_str(&term);
        }
        text.push('\n');
    }
    text
}

/// Most rule evaluations one evaluation of the rule at `index` can cause.
/// Every step runs once per walk except a repeat, which runs at most once
/// per source byte plus the pass that stops it.
fn evaluation_bound(
    grammar: &GrammarTable,
    index: usize,
    source_len: u128,
    memo: &mut HashMap<usize, u128>,
) -> u128 {
    if let Some(&bound) = memo.get(&index) {
        return bound;
    }
    let mut total: u128 = 1;
    for step in &grammar.rule_path()[index + 1..] {
        if step.operation == Operation::End {
            break;
        }
        if step.operation == Operation::Data {
            continue;
        }
        let Some(callee) = grammar.token(step.token).and_then(|token| token.rule) else {
            continue;
        };
        let times = if step.operation == Operation::Repeat {
            source_len + 1
        } else {
            1
        };
        let inner = evaluation_bound(grammar, callee, source_len, memo);
        total = total.saturating_add(times.saturating_mul(inner));
    }
    memo.insert(index, total);
    total
}

proptest! {
    #[test]
    fn random_grammars_terminate_within_bound(
        rules in prop::collection::vec(prop::collection::vec((wrap(), atom()), 1..4), 1..5),
        hollow in any::<bool>(),
        source in "[ab0-9 ]{0,16}",
    ) {
        let text = render(&rules, hollow);
        let options = CompilerOptions::default();
        let grammar = compile_grammar(&text, &[], &options)
            .map_err(|err| TestCaseError::fail(format!("{err}\n{text}")))?;

        let stats = match tokenize(&grammar, &source, &options) {
            Ok(queue) => queue.stats(),
            Err(failure) => {
                prop_assert!(
                    !matches!(failure.error, TokenizeError::RecursionLimit { .. }),
                    "{text}"
                );
                failure.partial.stats()
            }
        };
        let bound = evaluation_bound(&grammar, 0, source.len() as u128, &mut HashMap::new());
        prop_assert!(
            stats.rule_evaluations as u128 <= bound,
            "{} > {bound}\n{text}",
            stats.rule_evaluations
        );
        prop_assert!(stats.max_repeat_iterations <= source.len());
    }

    #[test]
    fn repeats_are_bounded_by_source_length(
        which in 0..GRAMMARS.len(),
        source in "[ab0-9 .\\-\n]{0,40}",
    ) {
        let options = CompilerOptions::default();
        let grammar = compile_grammar(GRAMMARS[which], &[], &options)
            .expect("sample grammars compile");

        let stats = match tokenize(&grammar, &source, &options) {
            Ok(queue) => queue.stats(),
            Err(failure) => failure.partial.stats(),
        };
        prop_assert!(stats.max_repeat_iterations <= source.chars().count());
        prop_assert!(stats.deepest_nesting <= options.max_rule_depth);
    }

    #[test]
    fn client_lexemes_keep_their_ids(id in 4usize..64) {
        let defs = [LexemeDef::new("a", twopass_core::TokenId(id), true)];
        let grammar = compile_grammar(GRAMMARS[0], &defs, &CompilerOptions::default())
            .expect("grammar");
        prop_assert_eq!(grammar.lookup("a"), Some(twopass_core::TokenId(id)));
    }
}
