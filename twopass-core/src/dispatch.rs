//! Pass 2: hand the instruction queue to client actions.

use std::collections::HashMap;

use log::{trace, warn};

use crate::error::{AccessError, CompileError};
use crate::grammar::GrammarTable;
use crate::queue::InstructionQueue;
use crate::token::{TokenId, TokenInstance};

/// Cursor over the instruction queue, handed to every action.
///
/// The position starts on the action's own instruction; the `next_*`
/// accessors advance it before reading.
pub struct Pass2<'q> {
    grammar: &'q GrammarTable,
    queue: &'q InstructionQueue,
    position: usize,
}

impl<'q> Pass2<'q> {
    pub fn new(grammar: &'q GrammarTable, queue: &'q InstructionQueue, position: usize) -> Self {
        Self {
            grammar,
            queue,
            position,
        }
    }

    pub fn grammar(&self) -> &'q GrammarTable {
        self.grammar
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Instruction at the cursor.
    pub fn current_token(&self) -> Result<&'q TokenInstance, AccessError> {
        self.queue.get(self.position).ok_or(AccessError::EndOfQueue {
            position: self.position,
        })
    }

    /// Instruction after the cursor, without consuming it.
    pub fn peek_token(&self) -> Option<&'q TokenInstance> {
        self.queue.get(self.position + 1)
    }

    /// Advances to the next instruction and returns it. An unfound
    /// instruction is still stepped over.
    pub fn next_token(&mut self) -> Result<&'q TokenInstance, AccessError> {
        let next = self.position + 1;
        let Some(instance) = self.queue.get(next) else {
            return Err(AccessError::EndOfQueue { position: next });
        };
        self.position = next;
        if !instance.found {
            return Err(AccessError::UnknownToken {
                line: instance.line,
                column: instance.column,
            });
        }
        Ok(instance)
    }

    /// Like [`Pass2::next_token`], but fails if the instruction is not `id`.
    pub fn expect_next_token(&mut self, id: TokenId) -> Result<&'q TokenInstance, AccessError> {
        let instance = self.next_token()?;
        if instance.token != id {
            return Err(AccessError::UnexpectedToken {
                expected: id,
                found: instance.token,
                position: self.position,
            });
        }
        Ok(instance)
    }

    pub fn next_token_is(&self, id: TokenId) -> bool {
        self.peek_token().is_some_and(|instance| instance.token == id)
    }

    /// Consumes a numeric instruction and returns its value.
    pub fn next_token_value(&mut self) -> Result<f64, AccessError> {
        let instance = self.next_token()?;
        let position = self.position;
        if instance.token != TokenId::NUMERIC {
            return Err(AccessError::MissingValue { position });
        }
        self.queue
            .number(position)
            .ok_or(AccessError::MissingValue { position })
    }

    /// Consumes a label instruction and returns its text.
    pub fn next_token_label(&mut self) -> Result<&'q str, AccessError> {
        let instance = self.next_token()?;
        let position = self.position;
        if instance.token != TokenId::CHARACTER {
            return Err(AccessError::MissingLabel { position });
        }
        self.queue
            .label(position)
            .ok_or(AccessError::MissingLabel { position })
    }

    /// Unconsumed instructions before the next action-bearing one.
    pub fn token_queue_count(&self) -> usize {
        self.queue.instructions()[(self.position + 1).min(self.queue.len())..]
            .iter()
            .take_while(|instance| !self.grammar.has_action(instance.token))
            .count()
    }

    /// Unconsumed instructions left in the whole queue.
    pub fn remaining_tokens_for_action(&self) -> usize {
        self.queue.len().saturating_sub(self.position + 1)
    }

    /// Steps the cursor back so the last consumed instruction is read again.
    pub fn replace_token(&mut self) {
        self.position = self.position.saturating_sub(1);
    }
}

pub type Action<C, E> = Box<dyn FnMut(&mut Pass2<'_>, &mut C) -> Result<(), E>>;

/// Client actions keyed by the token id that triggers them.
pub struct ActionTable<C, E = CompileError> {
    actions: HashMap<TokenId, Action<C, E>>,
}

impl<C, E> Default for ActionTable<C, E> {
    fn default() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }
}

impl<C, E> ActionTable<C, E>
where
    E: From<AccessError>,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `action` for `id`, replacing any earlier one.
    pub fn on<F>(&mut self, id: TokenId, action: F) -> &mut Self
    where
        F: FnMut(&mut Pass2<'_>, &mut C) -> Result<(), E> + 'static,
    {
        self.actions.insert(id, Box::new(action));
        self
    }

    pub fn contains(&self, id: TokenId) -> bool {
        self.actions.contains_key(&id)
    }

    /// Walks `queue` and runs the action of every action-bearing instruction.
    ///
    /// Instructions an action consumes are not visited again. The first
    /// error an action returns stops the walk.
    pub fn dispatch(
        &mut self,
        grammar: &GrammarTable,
        queue: &InstructionQueue,
        context: &mut C,
    ) -> Result<(), E> {
        let mut index = 0;
        while let Some(instance) = queue.get(index) {
            if !grammar.has_action(instance.token) {
                index += 1;
                continue;
            }
            let Some(action) = self.actions.get_mut(&instance.token) else {
                warn!(
                    "{}: no action registered for token {} at line {}",
                    grammar.name(),
                    instance.token,
                    instance.line
                );
                index += 1;
                continue;
            };
            trace!("{}: action {} at {index}", grammar.name(), instance.token);
            let mut pass2 = Pass2::new(grammar, queue, index);
            action(&mut pass2, context)?;
            index = pass2.position.max(index) + 1;
        }
        Ok(())
    }
}
