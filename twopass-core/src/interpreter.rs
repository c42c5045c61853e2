//! Pass 1: walk the rule path against the source and build the
//! instruction queue.
//!
//! Evaluation is a recursive descent over the flat rule path. Each rule
//! records a rollback marker on entry; a rule that fails puts the queue,
//! cursor and label state back where they were.
//!
//! Labels are runs of character matches. The first character of a run
//! emits one `CHARACTER` instance and the whole run is stored in the label
//! side table under that instance's position. A run ends when any
//! non-character terminal is tried, or when the cursor reaches a blank:
//! a required character test there starts a new label past the blank, while
//! one inside an optional or repeated step fails. Runs started under the
//! no-space-skip marker keep their blanks.

use log::{debug, trace};

use crate::error::TokenizeError;
use crate::grammar::GrammarTable;
use crate::options::CompilerOptions;
use crate::queue::InstructionQueue;
use crate::scanner::{Cursor, Scanner};
use crate::token::{Operation, TokenId, TokenInstance, TokenKind};

/// A failed Pass 1 run. The partial queue ends with an unfound instance at
/// the furthest position the interpreter reached.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizeFailure {
    pub error: TokenizeError,
    pub partial: InstructionQueue,
}

impl From<TokenizeFailure> for TokenizeError {
    fn from(failure: TokenizeFailure) -> Self {
        failure.error
    }
}

/// Runs Pass 1 of `source` against `grammar`.
pub fn tokenize(
    grammar: &GrammarTable,
    source: &str,
    options: &CompilerOptions,
) -> Result<InstructionQueue, TokenizeFailure> {
    let Some(root) = grammar.root() else {
        return Err(TokenizeFailure {
            error: TokenizeError::EmptyGrammar,
            partial: InstructionQueue::new(),
        });
    };

    let mut state = ParseState::new(grammar, source, options);
    let outcome = state.eval_rule(root).and_then(|passed| {
        // a prefix is not enough: the whole source has to be consumed
        if passed && state.scanner.skip_blanks() {
            state.note_attempt();
            Ok(false)
        } else {
            Ok(passed)
        }
    });

    match outcome {
        Ok(true) => {
            trace!(
                "{}: pass 1 produced {} instructions",
                grammar.name(),
                state.queue.len()
            );
            Ok(state.queue)
        }
        Ok(false) => {
            let owner = grammar.rule_path()[root].token;
            let error = state.unknown_token(owner);
            Err(TokenizeFailure {
                error,
                partial: state.queue,
            })
        }
        Err(error) => Err(TokenizeFailure {
            error,
            partial: state.queue,
        }),
    }
}

#[derive(Debug, Clone, Copy)]
struct Marker {
    queue_len: usize,
    cursor: Cursor,
    label: Option<usize>,
    label_len: usize,
    no_skip: bool,
}

struct ParseState<'g, 's> {
    grammar: &'g GrammarTable,
    scanner: Scanner<'s>,
    queue: InstructionQueue,
    /// Queue position of the label being extended, if any.
    label: Option<usize>,
    no_skip: bool,
    depth: usize,
    max_depth: usize,
    furthest: Cursor,
    /// Blank a character test inside an optional or repeated step may not
    /// cross, because a label stopped there.
    fence: Option<usize>,
}

impl<'g, 's> ParseState<'g, 's> {
    fn new(grammar: &'g GrammarTable, source: &'s str, options: &'s CompilerOptions) -> Self {
        Self {
            grammar,
            scanner: Scanner::new(source, &options.comment_markers),
            queue: InstructionQueue::new(),
            label: None,
            no_skip: false,
            depth: 0,
            max_depth: options.max_rule_depth,
            furthest: Cursor::default(),
            fence: None,
        }
    }

    fn mark(&self) -> Marker {
        Marker {
            queue_len: self.queue.len(),
            cursor: self.scanner.cursor(),
            label: self.label,
            label_len: self.label.map_or(0, |at| self.queue.label_len(at)),
            no_skip: self.no_skip,
        }
    }

    fn restore(&mut self, marker: &Marker) {
        self.queue.truncate(marker.queue_len);
        self.scanner.set_cursor(marker.cursor);
        self.label = marker.label;
        if let Some(at) = marker.label {
            self.queue.truncate_label(at, marker.label_len);
        }
        self.no_skip = marker.no_skip;
    }

    fn close_label(&mut self) {
        self.label = None;
        self.no_skip = false;
    }

    /// A running label ends at a blank, unless it was started after `@`.
    fn label_meets_blank(&self) -> bool {
        self.label.is_some() && !self.no_skip && self.scanner.at_blank_or_end()
    }

    /// Remembers the furthest point a terminal test was made at.
    fn note_attempt(&mut self) {
        let cursor = self.scanner.cursor();
        if cursor.offset > self.furthest.offset {
            self.furthest = cursor;
        }
    }

    fn unknown_token(&mut self, owner: TokenId) -> TokenizeError {
        let at = self.furthest;
        let column = self.scanner.column_at(at);
        let near = self.scanner.hint_at(at);
        self.queue.push(TokenInstance {
            owner,
            token: TokenId::UNKNOWN,
            line: at.line,
            column,
            offset: at.offset,
            found: false,
        });
        debug!(
            "{}: parsing failed at line {}, column {}: {near:?}",
            self.grammar.name(),
            at.line,
            column
        );
        TokenizeError::UnknownToken {
            line: at.line,
            column,
            near,
        }
    }

    fn eval_rule(&mut self, index: usize) -> Result<bool, TokenizeError> {
        if self.depth >= self.max_depth {
            return Err(TokenizeError::RecursionLimit {
                limit: self.max_depth,
                line: self.scanner.cursor().line,
                column: self.scanner.column(),
            });
        }
        self.depth += 1;
        let stats = self.queue.stats_mut();
        stats.rule_evaluations += 1;
        stats.deepest_nesting = stats.deepest_nesting.max(self.depth);

        let result = self.walk_rule(index);
        self.depth -= 1;
        result
    }

    fn walk_rule(&mut self, index: usize) -> Result<bool, TokenizeError> {
        let grammar = self.grammar;
        let path = grammar.rule_path();
        let owner = match path.get(index) {
            Some(step) if step.operation == Operation::Rule => step.token,
            _ => return Err(TokenizeError::BrokenRule { index }),
        };

        let marker = self.mark();
        let mut passed = true;
        let mut matched_any = false;
        let mut reported = false;
        let mut pc = index + 1;

        loop {
            let Some(step) = path.get(pc) else {
                return Err(TokenizeError::BrokenRule { index: pc });
            };
            match step.operation {
                Operation::And => {
                    if passed {
                        passed = self.eval_step(pc, owner)?;
                        if !passed && matched_any && !reported {
                            reported = true;
                            debug!(
                                "{}: in {} was expecting{} near {:?}",
                                grammar.name(),
                                grammar.rule_text(index),
                                grammar.step_text(pc),
                                self.scanner.hint_at(self.scanner.cursor())
                            );
                        }
                    }
                }
                Operation::Or => {
                    if passed {
                        return Ok(true);
                    }
                    self.restore(&marker);
                    matched_any = false;
                    reported = false;
                    passed = self.eval_step(pc, owner)?;
                }
                Operation::Optional => {
                    if passed {
                        self.fenced_step(pc, owner)?;
                    }
                }
                Operation::Repeat => {
                    if passed {
                        self.repeat(pc, owner)?;
                    }
                }
                Operation::NotTest => {
                    if passed {
                        let lookahead = self.mark();
                        let found = self.eval_step(pc, owner)?;
                        self.restore(&lookahead);
                        passed = !found;
                    }
                }
                Operation::Data => {}
                Operation::End => {
                    if !passed {
                        self.restore(&marker);
                    }
                    return Ok(passed);
                }
                Operation::Rule | Operation::Unknown => {
                    return Err(TokenizeError::BrokenRule { index: pc });
                }
            }
            if passed {
                matched_any = true;
            }
            pc += 1;
        }
    }

    fn repeat(&mut self, pc: usize, owner: TokenId) -> Result<(), TokenizeError> {
        let mut last = self.scanner.offset();
        let mut iterations = 0;
        while self.fenced_step(pc, owner)? {
            let now = self.scanner.offset();
            // a pass that consumed nothing would pass forever
            if now <= last {
                break;
            }
            last = now;
            iterations += 1;
        }
        let stats = self.queue.stats_mut();
        stats.max_repeat_iterations = stats.max_repeat_iterations.max(iterations);
        Ok(())
    }

    /// Evaluates an optional or repeated step without letting it start a
    /// new label across the blank that ends the running one.
    fn fenced_step(&mut self, pc: usize, owner: TokenId) -> Result<bool, TokenizeError> {
        let outer = self.fence;
        if self.label_meets_blank() {
            self.fence = Some(self.scanner.offset());
        }
        let result = self.eval_step(pc, owner);
        self.fence = outer;
        result
    }

    fn eval_step(&mut self, pc: usize, owner: TokenId) -> Result<bool, TokenizeError> {
        let grammar = self.grammar;
        let step = grammar.rule_path()[pc];
        let token = grammar
            .token(step.token)
            .ok_or(TokenizeError::TokenIdOutOfRange { id: step.token })?;
        if token.kind == TokenKind::NonTerminal {
            let rule = token
                .rule
                .ok_or(TokenizeError::TokenIdOutOfRange { id: step.token })?;
            return self.eval_rule(rule);
        }
        Ok(self.match_terminal(pc, owner))
    }

    fn match_terminal(&mut self, pc: usize, owner: TokenId) -> bool {
        let id = self.grammar.rule_path()[pc].token;
        if id != TokenId::CHARACTER {
            self.close_label();
        } else if self.label_meets_blank() {
            if self.fence == Some(self.scanner.offset()) {
                return false;
            }
            self.close_label();
        }
        if id == TokenId::NO_SPACE_SKIP {
            self.no_skip = true;
            return true;
        }

        let start = self.scanner.cursor();
        let continuing = id == TokenId::CHARACTER && self.label.is_some();
        if !continuing && !self.no_skip && !self.scanner.skip_blanks() {
            self.note_attempt();
            self.scanner.set_cursor(start);
            return false;
        }
        self.note_attempt();

        let matched = match id {
            TokenId::NUMERIC => self.match_number(owner),
            TokenId::CHARACTER => self.match_character(pc, owner),
            _ => self.match_lexeme(id, owner),
        };
        if !matched {
            self.scanner.set_cursor(start);
        }
        matched
    }

    fn instance(&self, owner: TokenId, token: TokenId) -> TokenInstance {
        let cursor = self.scanner.cursor();
        TokenInstance {
            owner,
            token,
            line: cursor.line,
            column: self.scanner.column(),
            offset: cursor.offset,
            found: true,
        }
    }

    fn match_number(&mut self, owner: TokenId) -> bool {
        let Some((value, len)) = self.scanner.scan_number() else {
            return false;
        };
        let at = self.queue.push(self.instance(owner, TokenId::NUMERIC));
        self.queue.set_number(at, value);
        self.scanner.advance(len);
        true
    }

    fn match_character(&mut self, pc: usize, owner: TokenId) -> bool {
        let grammar = self.grammar;
        let set = grammar
            .rule_path()
            .get(pc + 1)
            .filter(|next| next.operation == Operation::Data)
            .and_then(|next| grammar.token(next.token));
        let Some(set) = set else {
            return false;
        };
        let Some(ch) = self.scanner.peek_char() else {
            return false;
        };
        if !set.accepts(ch) {
            return false;
        }

        let at = match self.label {
            Some(at) => at,
            None => {
                let at = self.queue.push(self.instance(owner, TokenId::CHARACTER));
                self.queue.start_label(at);
                self.label = Some(at);
                at
            }
        };
        self.queue.push_label_char(at, ch);
        self.scanner.consume_char();
        true
    }

    fn match_lexeme(&mut self, id: TokenId, owner: TokenId) -> bool {
        let grammar = self.grammar;
        let Some(token) = grammar.token(id) else {
            return false;
        };
        if !matches!(token.kind, TokenKind::Terminal | TokenKind::Silent) {
            return false;
        }
        let instance = self.instance(owner, id);
        if !self.scanner.eat_lexeme(&token.lexeme, token.case_sensitive) {
            return false;
        }
        if token.kind == TokenKind::Terminal {
            self.queue.push(instance);
        }
        true
    }
}
