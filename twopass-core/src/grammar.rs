//! Compiled grammar: a flat rule path plus the token definitions it refers to.

use std::collections::HashMap;

use crate::error::GrammarError;
use crate::token::{Operation, RuleStep, Token, TokenId, TokenKind};

/// Rule path and token table for one grammar.
///
/// Every rule is a contiguous run of steps that starts with a single
/// `Rule` step and ends with a single `End` step. The first rule is the
/// root that Pass 1 evaluates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarTable {
    name: String,
    rule_path: Vec<RuleStep>,
    tokens: Vec<Token>,
    lexemes: HashMap<String, TokenId>,
    non_terminals: HashMap<String, TokenId>,
    silent: HashMap<String, TokenId>,
    sets: HashMap<String, TokenId>,
}

impl GrammarTable {
    /// An empty table holding only the engine's reserved tokens.
    pub fn new(name: impl Into<String>) -> Self {
        let tokens = vec![
            Token::new(TokenId::UNKNOWN, "<unknown>", TokenKind::System),
            Token::new(TokenId::NUMERIC, "<#>", TokenKind::System),
            Token::new(TokenId::CHARACTER, "<character>", TokenKind::System),
            Token::new(TokenId::NO_SPACE_SKIP, "@", TokenKind::System),
        ];
        Self {
            name: name.into(),
            rule_path: Vec::new(),
            tokens,
            lexemes: HashMap::new(),
            non_terminals: HashMap::new(),
            silent: HashMap::new(),
            sets: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule_path(&self) -> &[RuleStep] {
        &self.rule_path
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id.0)
    }

    pub fn has_action(&self, id: TokenId) -> bool {
        self.token(id).is_some_and(|token| token.has_action)
    }

    /// Looks up a terminal by its text, or a non-terminal by `<name>`.
    pub fn lookup(&self, lexeme: &str) -> Option<TokenId> {
        self.terminal_lookup(lexeme)
            .or_else(|| self.non_terminals.get(lexeme).copied())
    }

    fn terminal_lookup(&self, text: &str) -> Option<TokenId> {
        if let Some(id) = self.lexemes.get(text) {
            return Some(*id);
        }
        self.lexemes
            .get(&text.to_ascii_lowercase())
            .copied()
            .filter(|id| self.token(*id).is_some_and(|token| !token.case_sensitive))
    }

    /// Index of the root rule.
    pub fn root(&self) -> Option<usize> {
        self.rule_path
            .iter()
            .position(|step| step.operation == Operation::Rule)
    }

    /// Start indices of every rule, in definition order.
    pub fn rule_starts(&self) -> impl Iterator<Item = usize> + '_ {
        self.rule_path
            .iter()
            .enumerate()
            .filter(|(_, step)| step.operation == Operation::Rule)
            .map(|(index, _)| index)
    }

    pub fn rule_count(&self) -> usize {
        self.rule_starts().count()
    }

    /// Registers a client lexeme under a fixed id.
    pub fn add_token(
        &mut self,
        lexeme: &str,
        id: TokenId,
        has_action: bool,
        case_sensitive: bool,
    ) -> Result<(), GrammarError> {
        if id.is_reserved() {
            return Err(GrammarError::ReservedTokenId { id });
        }
        if let Some(existing) = self.token(id).filter(|t| t.kind != TokenKind::Unassigned) {
            return Err(GrammarError::DuplicateTokenId {
                id,
                lexeme: existing.lexeme.clone(),
            });
        }
        let lexeme = if case_sensitive {
            lexeme.to_string()
        } else {
            lexeme.to_ascii_lowercase()
        };
        if self.lexemes.contains_key(&lexeme) {
            return Err(GrammarError::DuplicateLexeme { lexeme });
        }

        let mut token = Token::new(id, lexeme.clone(), TokenKind::Terminal);
        token.has_action = has_action;
        token.case_sensitive = case_sensitive;
        self.define(token);
        self.lexemes.insert(lexeme, id);
        Ok(())
    }

    /// Places `token` at its id, growing the table as needed.
    pub(crate) fn define(&mut self, token: Token) {
        let index = token.id.0;
        while self.tokens.len() <= index {
            let id = TokenId(self.tokens.len());
            self.tokens.push(Token::unassigned(id));
        }
        self.tokens[index] = token;
    }

    fn next_id(&self) -> TokenId {
        TokenId(self.tokens.len())
    }

    /// Id of the terminal `text`, creating an action-less one if needed.
    pub(crate) fn terminal_id(&mut self, text: &str) -> TokenId {
        if let Some(id) = self.terminal_lookup(text) {
            return id;
        }
        let id = self.next_id();
        self.define(Token::new(id, text, TokenKind::Terminal));
        self.lexemes.insert(text.to_string(), id);
        id
    }

    pub(crate) fn silent_id(&mut self, text: &str) -> TokenId {
        if let Some(id) = self.silent.get(text) {
            return *id;
        }
        let id = self.next_id();
        self.define(Token::new(id, text, TokenKind::Silent));
        self.silent.insert(text.to_string(), id);
        id
    }

    pub(crate) fn set_id(&mut self, chars: &str) -> TokenId {
        if let Some(id) = self.sets.get(chars) {
            return *id;
        }
        let id = self.next_id();
        self.define(Token::new(id, chars, TokenKind::CharSet));
        self.sets.insert(chars.to_string(), id);
        id
    }

    /// Id of the non-terminal `<name>`, creating it if needed.
    pub(crate) fn non_terminal_id(&mut self, name: &str) -> TokenId {
        let lexeme = format!("<{name}>");
        if let Some(id) = self.non_terminals.get(&lexeme) {
            return *id;
        }
        let id = self.next_id();
        self.define(Token::new(id, lexeme.clone(), TokenKind::NonTerminal));
        self.non_terminals.insert(lexeme, id);
        id
    }

    pub(crate) fn push_step(&mut self, operation: Operation, token: TokenId) {
        self.rule_path.push(RuleStep::new(operation, token));
    }

    /// Points every non-terminal at its defining `Rule` step.
    pub(crate) fn assign_rule_links(&mut self) {
        for index in 0..self.rule_path.len() {
            let step = self.rule_path[index];
            if step.operation != Operation::Rule {
                continue;
            }
            if let Some(token) = self.tokens.get_mut(step.token.0) {
                token.rule = Some(index);
                token.kind = TokenKind::NonTerminal;
            }
        }
    }

    /// Links rules to their non-terminals and checks that the rule path
    /// only refers to defined tokens and rules.
    pub fn link_rules(&mut self) -> Result<(), GrammarError> {
        if self.root().is_none() {
            return Err(GrammarError::Malformed(format!(
                "grammar {} defines no rules",
                self.name
            )));
        }
        if let Some(step) = self.rule_path.iter().find(|s| s.token.0 >= self.tokens.len()) {
            return Err(GrammarError::Malformed(format!(
                "rule step refers to undefined token {}",
                step.token
            )));
        }
        self.assign_rule_links();

        let undefined: Vec<&str> = self
            .tokens
            .iter()
            .filter(|token| token.is_non_terminal() && token.rule.is_none())
            .map(|token| token.lexeme.as_str())
            .collect();
        if let Some(first) = undefined.first() {
            for name in &undefined {
                log::debug!("{}: non-terminal {name} has no rule", self.name);
            }
            return Err(GrammarError::UndefinedRule {
                name: first.to_string(),
            });
        }
        Ok(())
    }

    /// BNF text of the rule starting at `index`.
    pub fn rule_text(&self, index: usize) -> String {
        let mut text = String::new();
        let mut pc = index;
        while let Some(step) = self.rule_path.get(pc) {
            match step.operation {
                Operation::Rule => {
                    text.push_str(&self.lexeme_text(step.token));
                    text.push_str(" ::=");
                }
                Operation::End => break,
                _ => text.push_str(&self.step_text(pc)),
            }
            pc += 1;
        }
        text
    }

    /// Text of the single step at `index`, with a leading space.
    pub fn step_text(&self, index: usize) -> String {
        let Some(step) = self.rule_path.get(index) else {
            return String::new();
        };
        let term = if step.token == TokenId::CHARACTER {
            let set = self
                .rule_path
                .get(index + 1)
                .filter(|next| next.operation == Operation::Data)
                .map(|next| self.lexeme_text(next.token))
                .unwrap_or_default();
            format!("({set})")
        } else {
            self.lexeme_text(step.token)
        };
        match step.operation {
            Operation::And => format!(" {term}"),
            Operation::Or => format!(" | {term}"),
            Operation::Optional => format!(" [{term}]"),
            Operation::Repeat => format!(" {{{term}}}"),
            Operation::NotTest => format!(" (?!{term})"),
            Operation::Rule | Operation::Data | Operation::End | Operation::Unknown => String::new(),
        }
    }

    fn lexeme_text(&self, id: TokenId) -> String {
        match self.token(id) {
            Some(token) => match token.kind {
                TokenKind::Terminal => format!("'{}'", token.lexeme),
                TokenKind::Silent => format!("-'{}'", token.lexeme),
                TokenKind::ExcludedSet => format!("^{}", token.lexeme.escape_debug()),
                _ => token.lexeme.clone(),
            },
            None => format!("<{id}?>"),
        }
    }

    /// The whole grammar as BNF text, one rule per line.
    pub fn to_bnf(&self) -> String {
        self.rule_starts()
            .map(|index| self.rule_text(index))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
