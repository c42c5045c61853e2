//! Turns grammar text into a client [`GrammarTable`].
//!
//! The text is tokenized with the bootstrap grammar, then a fixed set of
//! actions walks the resulting queue and assembles rules one term at a
//! time. A pending operation remembers what the last `|`, `{`, `[` or `(?!`
//! asked for so that the next term is added with it.

use log::debug;

use crate::bootstrap::{
    self, CONSTANT_BEGIN, GROUP_END, ID_BEGIN, ID_END, NOT_TEST_BEGIN, OPTIONAL_BEGIN, OR, QUOTE,
    QUOTE_END, REPEAT_BEGIN, SET_BEGIN, SET_RULE, SILENT_QUOTE,
};
use crate::dispatch::{ActionTable, Pass2};
use crate::error::GrammarError;
use crate::grammar::GrammarTable;
use crate::interpreter;
use crate::options::CompilerOptions;
use crate::token::{Operation, RuleStep, TokenId};

/// A lexeme the client wants under a fixed token id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexemeDef {
    pub lexeme: String,
    pub id: TokenId,
    pub has_action: bool,
    pub case_sensitive: bool,
}

impl LexemeDef {
    pub fn new(lexeme: impl Into<String>, id: TokenId, has_action: bool) -> Self {
        Self {
            lexeme: lexeme.into(),
            id,
            has_action,
            case_sensitive: true,
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }
}

/// Compiles `text` into a grammar table that already holds `definitions`.
pub fn compile_grammar(
    text: &str,
    definitions: &[LexemeDef],
    options: &CompilerOptions,
) -> Result<GrammarTable, GrammarError> {
    let mut table = GrammarTable::new(options.grammar_name.clone());
    for def in definitions {
        table.add_token(&def.lexeme, def.id, def.has_action, def.case_sensitive)?;
    }

    // client comment markers apply to sources only
    let meta_options = CompilerOptions {
        comment_markers: CompilerOptions::default().comment_markers,
        ..options.clone()
    };
    let meta = bootstrap::grammar();
    let queue = interpreter::tokenize(meta, text, &meta_options).map_err(|failure| {
        debug!("{}: grammar text rejected", options.grammar_name);
        GrammarError::from(failure.error)
    })?;

    let mut builder = RuleBuilder::new(table);
    builder_actions().dispatch(meta, &queue, &mut builder)?;
    let table = builder.finish()?;

    debug!(
        "{}: compiled {} rules over {} tokens",
        table.name(),
        table.rule_count(),
        table.tokens().len()
    );
    Ok(table)
}

fn builder_actions() -> ActionTable<RuleBuilder, GrammarError> {
    let mut actions: ActionTable<RuleBuilder, GrammarError> = ActionTable::new();
    actions
        .on(ID_BEGIN, identifier)
        .on(CONSTANT_BEGIN, constant)
        .on(OR, |_, b: &mut RuleBuilder| {
            b.pend(Operation::Or);
            Ok(())
        })
        .on(REPEAT_BEGIN, |_, b: &mut RuleBuilder| {
            b.pend(Operation::Repeat);
            Ok(())
        })
        .on(OPTIONAL_BEGIN, |_, b: &mut RuleBuilder| {
            b.pend(Operation::Optional);
            Ok(())
        })
        .on(NOT_TEST_BEGIN, |_, b: &mut RuleBuilder| {
            b.pend(Operation::NotTest);
            Ok(())
        })
        .on(QUOTE, |p, b| terminal(p, b, false))
        .on(SILENT_QUOTE, |p, b| terminal(p, b, true))
        .on(SET_BEGIN, set);
    actions
}

/// `<name>` either opens a rule (when followed by `::=`) or refers to one.
fn identifier(p: &mut Pass2<'_>, b: &mut RuleBuilder) -> Result<(), GrammarError> {
    let name = p.next_token_label()?;
    p.expect_next_token(ID_END)?;
    if p.next_token_is(SET_RULE) {
        p.next_token()?;
        b.begin_rule(name)
    } else {
        let id = b.table.non_terminal_id(name);
        b.add_term(id, None)
    }
}

/// `<#name>`: the name only documents the value.
fn constant(p: &mut Pass2<'_>, b: &mut RuleBuilder) -> Result<(), GrammarError> {
    if p.next_token_is(TokenId::CHARACTER) {
        p.next_token_label()?;
    }
    p.expect_next_token(ID_END)?;
    b.add_term(TokenId::NUMERIC, None)
}

fn terminal(p: &mut Pass2<'_>, b: &mut RuleBuilder, silent: bool) -> Result<(), GrammarError> {
    let at = *p.current_token()?;
    let text = if p.next_token_is(TokenId::CHARACTER) {
        p.next_token_label()?
    } else {
        ""
    };
    p.expect_next_token(QUOTE_END)?;
    if text.is_empty() {
        return Err(GrammarError::EmptyTerminal {
            line: at.line,
            column: at.column,
        });
    }
    let id = if silent {
        b.table.silent_id(text)
    } else {
        b.table.terminal_id(text)
    };
    b.add_term(id, None)
}

fn set(p: &mut Pass2<'_>, b: &mut RuleBuilder) -> Result<(), GrammarError> {
    let at = *p.current_token()?;
    let chars = if p.next_token_is(TokenId::CHARACTER) {
        p.next_token_label()?
    } else {
        ""
    };
    p.expect_next_token(GROUP_END)?;
    if chars.is_empty() {
        return Err(GrammarError::EmptySet {
            line: at.line,
            column: at.column,
        });
    }
    let id = b.table.set_id(chars);
    b.add_term(TokenId::CHARACTER, Some(id))
}

struct RuleDraft {
    name: TokenId,
    steps: Vec<RuleStep>,
}

struct RuleBuilder {
    table: GrammarTable,
    drafts: Vec<RuleDraft>,
    current: Option<usize>,
    pending: Operation,
    /// Optional, repeat or not-test that follows a `|`.
    wrapped: Option<Operation>,
    synthetic: usize,
}

impl RuleBuilder {
    fn new(table: GrammarTable) -> Self {
        Self {
            table,
            drafts: Vec::new(),
            current: None,
            pending: Operation::And,
            wrapped: None,
            synthetic: 0,
        }
    }

    fn pend(&mut self, operation: Operation) {
        if self.pending == Operation::Or && operation != Operation::Or {
            self.wrapped = Some(operation);
        } else {
            self.pending = operation;
        }
    }

    fn begin_rule(&mut self, name: &str) -> Result<(), GrammarError> {
        let id = self.table.non_terminal_id(name);
        if self.drafts.iter().any(|draft| draft.name == id) {
            return Err(GrammarError::DuplicateRule {
                name: format!("<{name}>"),
            });
        }
        self.drafts.push(RuleDraft {
            name: id,
            steps: Vec::new(),
        });
        self.current = Some(self.drafts.len() - 1);
        self.pending = Operation::And;
        self.wrapped = None;
        Ok(())
    }

    fn add_term(&mut self, token: TokenId, data: Option<TokenId>) -> Result<(), GrammarError> {
        let current = self
            .current
            .ok_or_else(|| GrammarError::Malformed("term outside of a rule".to_string()))?;
        let pending = std::mem::replace(&mut self.pending, Operation::And);

        let steps = match self.wrapped.take() {
            // `| [x]` cannot be expressed with one step, so `[x]` becomes a
            // rule of its own and the alternative refers to it
            Some(inner) => {
                let helper = self.synthetic_rule(current, inner, token, data);
                vec![RuleStep::new(Operation::Or, helper)]
            }
            None => {
                let mut steps = vec![RuleStep::new(pending, token)];
                if let Some(data) = data {
                    steps.push(RuleStep::new(Operation::Data, data));
                }
                steps
            }
        };
        self.drafts[current].steps.extend(steps);
        Ok(())
    }

    fn synthetic_rule(
        &mut self,
        parent: usize,
        operation: Operation,
        token: TokenId,
        data: Option<TokenId>,
    ) -> TokenId {
        self.synthetic += 1;
        let parent_name = self
            .table
            .token(self.drafts[parent].name)
            .map(|t| t.lexeme.trim_matches(|c| c == '<' || c == '>').to_string())
            .unwrap_or_default();
        let id = self
            .table
            .non_terminal_id(&format!("{parent_name}~{}", self.synthetic));

        let mut steps = vec![RuleStep::new(operation, token)];
        if let Some(data) = data {
            steps.push(RuleStep::new(Operation::Data, data));
        }
        self.drafts.push(RuleDraft { name: id, steps });
        id
    }

    fn finish(self) -> Result<GrammarTable, GrammarError> {
        let mut table = self.table;
        for draft in &self.drafts {
            table.push_step(Operation::Rule, draft.name);
            for step in &draft.steps {
                table.push_step(step.operation, step.token);
            }
            table.push_step(Operation::End, TokenId::UNKNOWN);
        }
        table.link_rules()?;
        Ok(table)
    }
}
