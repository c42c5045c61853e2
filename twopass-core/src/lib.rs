//! Grammar-driven two-pass tokenizer and compiler.
//!
//! A client registers its lexemes under fixed token ids, hands over a BNF
//! grammar and then compiles sources against it:
//!
//!   grammar text
//!     -> bootstrap grammar + grammar compiler (client GrammarTable)
//!   source text
//!     -> rule interpreter, pass 1   (instruction queue + side tables)
//!     -> dispatcher, pass 2          (client actions keyed by token id)
//!
//! Tools such as the command-line checker should go through [`Compiler`]
//! rather than driving the passes by hand.

// ---------------------------------------------------------------------
// Error handling and configuration
// ---------------------------------------------------------------------

pub mod error;
pub mod options;

// ---------------------------------------------------------------------
// Grammar model: tokens, rule path, bootstrap grammar
// ---------------------------------------------------------------------

pub mod token;
pub mod grammar;
pub mod bootstrap;
pub mod grammar_compiler;

// ---------------------------------------------------------------------
// Pass 1: scanning and rule interpretation
// ---------------------------------------------------------------------

mod scanner;
pub mod queue;
pub mod interpreter;

// ---------------------------------------------------------------------
// Pass 2 and orchestration
// ---------------------------------------------------------------------

pub mod dispatch;
pub mod compiler;
pub mod sources;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::Compiler;
pub use dispatch::{Action, ActionTable, Pass2};
pub use error::{AccessError, CompileError, GrammarError, TokenizeError};
pub use grammar::GrammarTable;
pub use grammar_compiler::{LexemeDef, compile_grammar};
pub use interpreter::{TokenizeFailure, tokenize};
pub use options::CompilerOptions;
pub use queue::{InstructionQueue, Pass1Stats};
pub use token::{Operation, RuleStep, Token, TokenId, TokenInstance, TokenKind};
