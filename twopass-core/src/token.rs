//! Token definitions, rule steps and the instances Pass 1 emits.

use std::fmt;

/// Identifier of a lexeme or non-terminal inside one grammar table.
///
/// Ids below [`TokenId::FIRST_CLIENT`] belong to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub usize);

impl TokenId {
    /// Placeholder for instructions that did not match anything.
    pub const UNKNOWN: TokenId = TokenId(0);
    /// Floating point literal; the value lands in the numeric side table.
    pub const NUMERIC: TokenId = TokenId(1);
    /// Single character out of a set; runs of these form a label.
    pub const CHARACTER: TokenId = TokenId(2);
    /// Zero-width marker: the next character test does not skip blanks.
    pub const NO_SPACE_SKIP: TokenId = TokenId(3);
    /// First id available to clients.
    pub const FIRST_CLIENT: usize = 4;

    pub fn is_reserved(self) -> bool {
        self.0 < Self::FIRST_CLIENT
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a token stands for when it appears in a rule step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Engine sentinel (unknown, numeric, character, no-space-skip).
    System,
    /// Literal text compared against the source.
    Terminal,
    /// Literal text that is matched but never enters the instruction queue.
    Silent,
    /// Characters accepted by a character test (payload of a `Data` step).
    CharSet,
    /// Characters rejected by a character test.
    ExcludedSet,
    /// Defined by a rule.
    NonTerminal,
    /// Id slot nobody registered.
    Unassigned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub id: TokenId,
    pub lexeme: String,
    pub kind: TokenKind,
    pub has_action: bool,
    pub case_sensitive: bool,
    /// Index of the defining `Rule` step, for non-terminals.
    pub rule: Option<usize>,
}

impl Token {
    pub fn new(id: TokenId, lexeme: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            id,
            lexeme: lexeme.into(),
            kind,
            has_action: false,
            case_sensitive: true,
            rule: None,
        }
    }

    pub(crate) fn unassigned(id: TokenId) -> Self {
        Self::new(id, "", TokenKind::Unassigned)
    }

    pub fn is_non_terminal(&self) -> bool {
        self.kind == TokenKind::NonTerminal
    }

    /// Whether a character test with this token as payload accepts `ch`.
    pub fn accepts(&self, ch: char) -> bool {
        match self.kind {
            TokenKind::CharSet => self.lexeme.contains(ch),
            TokenKind::ExcludedSet => !self.lexeme.contains(ch),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Start of a rule; the token is the non-terminal being defined.
    Rule,
    And,
    Or,
    Optional,
    Repeat,
    /// Negative lookahead: passes when the token does not match here.
    NotTest,
    /// Payload for the preceding step, never evaluated on its own.
    Data,
    End,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleStep {
    pub operation: Operation,
    pub token: TokenId,
}

impl RuleStep {
    pub fn new(operation: Operation, token: TokenId) -> Self {
        Self { operation, token }
    }
}

/// One entry of the instruction queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInstance {
    /// Non-terminal whose rule produced this instance.
    pub owner: TokenId,
    pub token: TokenId,
    /// 1-based.
    pub line: usize,
    /// 1-based, counted in characters.
    pub column: usize,
    /// Byte offset into the source.
    pub offset: usize,
    pub found: bool,
}
