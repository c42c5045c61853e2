//! Client-facing entry point tying the two passes together.

use log::debug;

use crate::dispatch::ActionTable;
use crate::error::{CompileError, GrammarError};
use crate::grammar::GrammarTable;
use crate::grammar_compiler::{LexemeDef, compile_grammar};
use crate::interpreter;
use crate::options::CompilerOptions;
use crate::queue::InstructionQueue;
use crate::token::TokenId;

/// Holds the client lexemes, the compiled grammar and the queue of the
/// last tokenized source.
///
/// ```
/// use twopass_core::{ActionTable, Compiler, TokenId};
///
/// const HELLO: TokenId = TokenId(10);
///
/// let mut compiler = Compiler::default();
/// compiler.add_lexeme_token("hello", HELLO, true).unwrap();
/// compiler.set_grammar("<g> ::= 'hello' <#count>").unwrap();
///
/// let mut actions: ActionTable<Vec<f64>> = ActionTable::new();
/// actions.on(HELLO, |pass2, seen| {
///     seen.push(pass2.next_token_value()?);
///     Ok(())
/// });
/// let mut seen = Vec::new();
/// compiler.compile("hello 42", &mut actions, &mut seen).unwrap();
/// assert_eq!(seen, [42.0]);
/// ```
#[derive(Debug, Default)]
pub struct Compiler {
    options: CompilerOptions,
    definitions: Vec<LexemeDef>,
    grammar_text: Option<String>,
    grammar: Option<GrammarTable>,
    last: Option<InstructionQueue>,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn add_lexeme_token(
        &mut self,
        lexeme: &str,
        id: TokenId,
        has_action: bool,
    ) -> Result<(), GrammarError> {
        self.add_lexeme_token_with_case(lexeme, id, has_action, true)
    }

    /// Registers a client lexeme. When a grammar is already set it is
    /// compiled again so the new lexeme takes effect; on failure the lexeme
    /// is dropped and the previous grammar stays.
    pub fn add_lexeme_token_with_case(
        &mut self,
        lexeme: &str,
        id: TokenId,
        has_action: bool,
        case_sensitive: bool,
    ) -> Result<(), GrammarError> {
        let mut def = LexemeDef::new(lexeme, id, has_action);
        def.case_sensitive = case_sensitive;
        self.definitions.push(def);

        let result = match self.grammar_text.as_deref() {
            Some(text) => compile_grammar(text, &self.definitions, &self.options).map(Some),
            None => self.check_definitions().map(|()| None),
        };
        match result {
            Ok(Some(table)) => {
                self.grammar = Some(table);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => {
                self.definitions.pop();
                Err(err)
            }
        }
    }

    fn check_definitions(&self) -> Result<(), GrammarError> {
        let mut table = GrammarTable::new(self.options.grammar_name.clone());
        for def in &self.definitions {
            table.add_token(&def.lexeme, def.id, def.has_action, def.case_sensitive)?;
        }
        Ok(())
    }

    /// Compiles `text` as the client grammar. A failed compile leaves no
    /// grammar set.
    pub fn set_grammar(&mut self, text: &str) -> Result<&GrammarTable, GrammarError> {
        self.grammar = None;
        self.grammar_text = None;
        self.last = None;

        let table = compile_grammar(text, &self.definitions, &self.options)?;
        self.grammar_text = Some(text.to_string());
        Ok(self.grammar.insert(table))
    }

    pub fn grammar(&self) -> Option<&GrammarTable> {
        self.grammar.as_ref()
    }

    /// Queue of the last tokenized source. After a failure this is the
    /// partial queue, ending with the unfound instance.
    pub fn instructions(&self) -> Option<&InstructionQueue> {
        self.last.as_ref()
    }

    /// Runs Pass 1 only.
    pub fn tokenize(&mut self, source: &str) -> Result<&InstructionQueue, CompileError> {
        self.pass1(source)?;
        self.last
            .as_ref()
            .ok_or(CompileError::Grammar(GrammarError::NoGrammar))
    }

    fn pass1(&mut self, source: &str) -> Result<(), CompileError> {
        self.last = None;
        let grammar = self.grammar.as_ref().ok_or(GrammarError::NoGrammar)?;
        match interpreter::tokenize(grammar, source, &self.options) {
            Ok(queue) => {
                self.last = Some(queue);
                Ok(())
            }
            Err(failure) => {
                debug!(
                    "{}: pass 1 stopped after {} instructions",
                    grammar.name(),
                    failure.partial.len()
                );
                self.last = Some(failure.partial);
                Err(failure.error.into())
            }
        }
    }

    /// Runs both passes over `source`, calling `actions` with `context`.
    pub fn compile<C>(
        &mut self,
        source: &str,
        actions: &mut ActionTable<C>,
        context: &mut C,
    ) -> Result<(), CompileError> {
        self.pass1(source)?;
        let (Some(grammar), Some(queue)) = (self.grammar.as_ref(), self.last.as_ref()) else {
            return Err(GrammarError::NoGrammar.into());
        };
        actions.dispatch(grammar, queue, context)
    }
}
