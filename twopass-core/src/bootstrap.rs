//! The grammar of grammars.
//!
//! Grammar text is tokenized by the same interpreter that handles client
//! sources, using the table below. It is built once per process and never
//! changes afterwards.
//!
//! ```text
//! <syntax>               ::= {<rule>}
//! <rule>                 ::= <identifier> '::=' <expression>
//! <expression>           ::= <and_term> {<or_term>}
//! <or_term>              ::= '|' <and_term>
//! <and_term>             ::= <term> {<term>}
//! <term>                 ::= <not_test> | <term_id> | <repeat_expression> | <optional_expression>
//! <term_id>              ::= <constant> | <identifier_right> | <terminal_symbol> | <silent_symbol> | <set>
//! <repeat_expression>    ::= '{' <term_id> '}'
//! <optional_expression>  ::= '[' <term_id> ']'
//! <not_test>             ::= '(?!' <term_id> ')'
//! <identifier_right>     ::= <identifier> (?!'::=')
//! <identifier>           ::= '<' <letter> {<identifier_character>} '>'
//! <constant>             ::= '<#' {<identifier_character>} '>'
//! <terminal_symbol>      ::= ''' @ {<terminal_character>} '''
//! <silent_symbol>        ::= '-'' @ {<terminal_character>} '''
//! <set>                  ::= '(' @ {<set_character>} ')'
//! <letter>               ::= (a-z A-Z)
//! <identifier_character> ::= (a-z A-Z 0-9 _ - $ .)
//! <terminal_character>   ::= any character except ' and line breaks
//! <set_character>        ::= any character except ) and line breaks
//! ```
//!
//! `@` is the no-space-skip marker: the first character of the body is taken
//! as is, even when it is blank.

use once_cell::sync::Lazy;

use crate::grammar::GrammarTable;
use crate::token::{Operation, Token, TokenId, TokenKind};

// non-terminals
pub(crate) const SYNTAX: TokenId = TokenId(4);
pub(crate) const RULE: TokenId = TokenId(5);
pub(crate) const EXPRESSION: TokenId = TokenId(6);
pub(crate) const OR_TERM: TokenId = TokenId(7);
pub(crate) const AND_TERM: TokenId = TokenId(8);
pub(crate) const TERM: TokenId = TokenId(9);
pub(crate) const TERM_ID: TokenId = TokenId(10);
pub(crate) const REPEAT_EXPRESSION: TokenId = TokenId(11);
pub(crate) const OPTIONAL_EXPRESSION: TokenId = TokenId(12);
pub(crate) const NOT_TEST: TokenId = TokenId(13);
pub(crate) const IDENTIFIER_RIGHT: TokenId = TokenId(14);
pub(crate) const IDENTIFIER: TokenId = TokenId(15);
pub(crate) const CONSTANT: TokenId = TokenId(16);
pub(crate) const TERMINAL_SYMBOL: TokenId = TokenId(17);
pub(crate) const SILENT_SYMBOL: TokenId = TokenId(18);
pub(crate) const SET: TokenId = TokenId(19);
pub(crate) const LETTER: TokenId = TokenId(20);
pub(crate) const IDENTIFIER_CHARACTER: TokenId = TokenId(21);
pub(crate) const TERMINAL_CHARACTER: TokenId = TokenId(22);
pub(crate) const SET_CHARACTER: TokenId = TokenId(23);

// terminals
pub(crate) const ID_BEGIN: TokenId = TokenId(24);
pub(crate) const CONSTANT_BEGIN: TokenId = TokenId(25);
pub(crate) const ID_END: TokenId = TokenId(26);
pub(crate) const SET_RULE: TokenId = TokenId(27);
pub(crate) const OR: TokenId = TokenId(28);
pub(crate) const REPEAT_BEGIN: TokenId = TokenId(29);
pub(crate) const REPEAT_END: TokenId = TokenId(30);
pub(crate) const OPTIONAL_BEGIN: TokenId = TokenId(31);
pub(crate) const OPTIONAL_END: TokenId = TokenId(32);
pub(crate) const NOT_TEST_BEGIN: TokenId = TokenId(33);
pub(crate) const GROUP_END: TokenId = TokenId(34);
pub(crate) const QUOTE: TokenId = TokenId(35);
pub(crate) const SILENT_QUOTE: TokenId = TokenId(36);
pub(crate) const QUOTE_END: TokenId = TokenId(37);
pub(crate) const SET_BEGIN: TokenId = TokenId(38);

// character sets
const LETTER_SET: TokenId = TokenId(39);
const IDENTIFIER_SET: TokenId = TokenId(40);
const TERMINAL_EXCLUDED: TokenId = TokenId(41);
const SET_EXCLUDED: TokenId = TokenId(42);

const LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

static BOOTSTRAP: Lazy<GrammarTable> = Lazy::new(build);

/// The shared meta-grammar table.
pub fn grammar() -> &'static GrammarTable {
    &BOOTSTRAP
}

struct MetaBuilder {
    table: GrammarTable,
}

impl MetaBuilder {
    fn non_terminal(&mut self, id: TokenId, name: &str) {
        self.table
            .define(Token::new(id, format!("<{name}>"), TokenKind::NonTerminal));
    }

    fn terminal(&mut self, id: TokenId, lexeme: &str, has_action: bool) {
        let mut token = Token::new(id, lexeme, TokenKind::Terminal);
        token.has_action = has_action;
        self.table.define(token);
    }

    fn set(&mut self, id: TokenId, chars: &str, kind: TokenKind) {
        self.table.define(Token::new(id, chars, kind));
    }

    fn rule(&mut self, id: TokenId) -> &mut Self {
        self.step(Operation::Rule, id)
    }

    fn is(&mut self, id: TokenId) -> &mut Self {
        self.step(Operation::And, id)
    }

    fn and(&mut self, id: TokenId) -> &mut Self {
        self.step(Operation::And, id)
    }

    fn or(&mut self, id: TokenId) -> &mut Self {
        self.step(Operation::Or, id)
    }

    fn repeat(&mut self, id: TokenId) -> &mut Self {
        self.step(Operation::Repeat, id)
    }

    fn not(&mut self, id: TokenId) -> &mut Self {
        self.step(Operation::NotTest, id)
    }

    fn data(&mut self, id: TokenId) -> &mut Self {
        self.step(Operation::Data, id)
    }

    fn end(&mut self) {
        self.step(Operation::End, TokenId::UNKNOWN);
    }

    fn step(&mut self, operation: Operation, id: TokenId) -> &mut Self {
        self.table.push_step(operation, id);
        self
    }
}

fn build() -> GrammarTable {
    let mut b = MetaBuilder {
        table: GrammarTable::new("bnf"),
    };

    b.non_terminal(SYNTAX, "syntax");
    b.non_terminal(RULE, "rule");
    b.non_terminal(EXPRESSION, "expression");
    b.non_terminal(OR_TERM, "or_term");
    b.non_terminal(AND_TERM, "and_term");
    b.non_terminal(TERM, "term");
    b.non_terminal(TERM_ID, "term_id");
    b.non_terminal(REPEAT_EXPRESSION, "repeat_expression");
    b.non_terminal(OPTIONAL_EXPRESSION, "optional_expression");
    b.non_terminal(NOT_TEST, "not_test");
    b.non_terminal(IDENTIFIER_RIGHT, "identifier_right");
    b.non_terminal(IDENTIFIER, "identifier");
    b.non_terminal(CONSTANT, "constant");
    b.non_terminal(TERMINAL_SYMBOL, "terminal_symbol");
    b.non_terminal(SILENT_SYMBOL, "silent_symbol");
    b.non_terminal(SET, "set");
    b.non_terminal(LETTER, "letter");
    b.non_terminal(IDENTIFIER_CHARACTER, "identifier_character");
    b.non_terminal(TERMINAL_CHARACTER, "terminal_character");
    b.non_terminal(SET_CHARACTER, "set_character");

    // only the openers carry actions; closers are consumed by them
    b.terminal(ID_BEGIN, "<", true);
    b.terminal(CONSTANT_BEGIN, "<#", true);
    b.terminal(ID_END, ">", false);
    b.terminal(SET_RULE, "::=", false);
    b.terminal(OR, "|", true);
    b.terminal(REPEAT_BEGIN, "{", true);
    b.terminal(REPEAT_END, "}", false);
    b.terminal(OPTIONAL_BEGIN, "[", true);
    b.terminal(OPTIONAL_END, "]", false);
    b.terminal(NOT_TEST_BEGIN, "(?!", true);
    b.terminal(GROUP_END, ")", false);
    b.terminal(QUOTE, "'", true);
    b.terminal(SILENT_QUOTE, "-'", true);
    b.terminal(QUOTE_END, "'", false);
    b.terminal(SET_BEGIN, "(", true);

    b.set(LETTER_SET, LETTERS, TokenKind::CharSet);
    b.set(
        IDENTIFIER_SET,
        &format!("{LETTERS}0123456789_-$."),
        TokenKind::CharSet,
    );
    b.set(TERMINAL_EXCLUDED, "'\r\n", TokenKind::ExcludedSet);
    b.set(SET_EXCLUDED, ")\r\n", TokenKind::ExcludedSet);

    b.rule(SYNTAX).repeat(RULE).end();

    b.rule(RULE).is(IDENTIFIER).and(SET_RULE).and(EXPRESSION).end();

    b.rule(EXPRESSION).is(AND_TERM).repeat(OR_TERM).end();

    b.rule(OR_TERM).is(OR).and(AND_TERM).end();

    b.rule(AND_TERM).is(TERM).repeat(TERM).end();

    b.rule(TERM)
        .is(NOT_TEST)
        .or(TERM_ID)
        .or(REPEAT_EXPRESSION)
        .or(OPTIONAL_EXPRESSION)
        .end();

    b.rule(TERM_ID)
        .is(CONSTANT)
        .or(IDENTIFIER_RIGHT)
        .or(TERMINAL_SYMBOL)
        .or(SILENT_SYMBOL)
        .or(SET)
        .end();

    b.rule(REPEAT_EXPRESSION)
        .is(REPEAT_BEGIN)
        .and(TERM_ID)
        .and(REPEAT_END)
        .end();

    b.rule(OPTIONAL_EXPRESSION)
        .is(OPTIONAL_BEGIN)
        .and(TERM_ID)
        .and(OPTIONAL_END)
        .end();

    b.rule(NOT_TEST)
        .is(NOT_TEST_BEGIN)
        .and(TERM_ID)
        .and(GROUP_END)
        .end();

    b.rule(IDENTIFIER_RIGHT).is(IDENTIFIER).not(SET_RULE).end();

    b.rule(IDENTIFIER)
        .is(ID_BEGIN)
        .and(LETTER)
        .repeat(IDENTIFIER_CHARACTER)
        .and(ID_END)
        .end();

    b.rule(CONSTANT)
        .is(CONSTANT_BEGIN)
        .repeat(IDENTIFIER_CHARACTER)
        .and(ID_END)
        .end();

    b.rule(TERMINAL_SYMBOL)
        .is(QUOTE)
        .and(TokenId::NO_SPACE_SKIP)
        .repeat(TERMINAL_CHARACTER)
        .and(QUOTE_END)
        .end();

    b.rule(SILENT_SYMBOL)
        .is(SILENT_QUOTE)
        .and(TokenId::NO_SPACE_SKIP)
        .repeat(TERMINAL_CHARACTER)
        .and(QUOTE_END)
        .end();

    b.rule(SET)
        .is(SET_BEGIN)
        .and(TokenId::NO_SPACE_SKIP)
        .repeat(SET_CHARACTER)
        .and(GROUP_END)
        .end();

    b.rule(LETTER).is(TokenId::CHARACTER).data(LETTER_SET).end();

    b.rule(IDENTIFIER_CHARACTER)
        .is(TokenId::CHARACTER)
        .data(IDENTIFIER_SET)
        .end();

    b.rule(TERMINAL_CHARACTER)
        .is(TokenId::CHARACTER)
        .data(TERMINAL_EXCLUDED)
        .end();

    b.rule(SET_CHARACTER)
        .is(TokenId::CHARACTER)
        .data(SET_EXCLUDED)
        .end();

    b.table.assign_rule_links();
    b.table
}
