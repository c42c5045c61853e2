use thiserror::Error;

use crate::token::TokenId;

/// Failures while turning grammar text into a [`crate::GrammarTable`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GrammarError {
    #[error("grammar syntax error at line {line}, column {column}, near {near:?}")]
    Syntax {
        line: usize,
        column: usize,
        near: String,
    },
    #[error("grammar could not be read: {0}")]
    Interpreter(TokenizeError),
    #[error("non-terminal {name} is used but never defined")]
    UndefinedRule { name: String },
    #[error("non-terminal {name} is defined more than once")]
    DuplicateRule { name: String },
    #[error("token id {id} is reserved for the engine")]
    ReservedTokenId { id: TokenId },
    #[error("token id {id} is already assigned to {lexeme:?}")]
    DuplicateTokenId { id: TokenId, lexeme: String },
    #[error("lexeme {lexeme:?} is already registered")]
    DuplicateLexeme { lexeme: String },
    #[error("empty terminal at line {line}, column {column}")]
    EmptyTerminal { line: usize, column: usize },
    #[error("empty character set at line {line}, column {column}")]
    EmptySet { line: usize, column: usize },
    #[error("malformed grammar: {0}")]
    Malformed(String),
    #[error("malformed grammar instruction stream: {0}")]
    Access(#[from] AccessError),
    #[error("no grammar has been set")]
    NoGrammar,
}

impl From<TokenizeError> for GrammarError {
    fn from(err: TokenizeError) -> Self {
        match err {
            TokenizeError::UnknownToken { line, column, near } => {
                GrammarError::Syntax { line, column, near }
            }
            other => GrammarError::Interpreter(other),
        }
    }
}

/// Pass 1 failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("unknown token at line {line}, column {column}, near {near:?}")]
    UnknownToken {
        line: usize,
        column: usize,
        near: String,
    },
    #[error("rule nesting exceeded {limit} levels at line {line}, column {column}")]
    RecursionLimit {
        limit: usize,
        line: usize,
        column: usize,
    },
    #[error("grammar has no rules")]
    EmptyGrammar,
    #[error("rule path is broken at step {index}")]
    BrokenRule { index: usize },
    #[error("token id {id} is not defined by the grammar")]
    TokenIdOutOfRange { id: TokenId },
}

/// Pass 2 accessor failures. These never stop the cursor from advancing;
/// the action decides whether to propagate them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("no more instructions at position {position}")]
    EndOfQueue { position: usize },
    #[error("unknown token at line {line}, column {column}")]
    UnknownToken { line: usize, column: usize },
    #[error("instruction {position} carries no numeric value")]
    MissingValue { position: usize },
    #[error("instruction {position} carries no label")]
    MissingLabel { position: usize },
    #[error("expected token {expected} at position {position}, found {found}")]
    UnexpectedToken {
        expected: TokenId,
        found: TokenId,
        position: usize,
    },
}

/// Everything that can stop [`crate::Compiler::compile`].
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("action for token {token} failed: {message}")]
    Action { token: TokenId, message: String },
}

impl CompileError {
    pub fn action(token: TokenId, message: impl Into<String>) -> Self {
        CompileError::Action {
            token,
            message: message.into(),
        }
    }
}
