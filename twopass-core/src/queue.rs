use std::collections::BTreeMap;

use crate::token::TokenInstance;

/// Counters gathered while Pass 1 runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pass1Stats {
    pub rule_evaluations: usize,
    pub deepest_nesting: usize,
    /// Most successful iterations any single repeat step performed.
    pub max_repeat_iterations: usize,
}

/// Ordered output of Pass 1 plus the side tables for numeric values and
/// labels. Both side tables are keyed by queue position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructionQueue {
    instructions: Vec<TokenInstance>,
    numbers: BTreeMap<usize, f64>,
    labels: BTreeMap<usize, String>,
    stats: Pass1Stats,
}

impl InstructionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TokenInstance> {
        self.instructions.get(index)
    }

    pub fn instructions(&self) -> &[TokenInstance] {
        &self.instructions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TokenInstance> {
        self.instructions.iter()
    }

    pub fn number(&self, index: usize) -> Option<f64> {
        self.numbers.get(&index).copied()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(&index).map(String::as_str)
    }

    pub fn stats(&self) -> Pass1Stats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut Pass1Stats {
        &mut self.stats
    }

    /// Appends an instance and returns its position.
    pub(crate) fn push(&mut self, instance: TokenInstance) -> usize {
        self.instructions.push(instance);
        self.instructions.len() - 1
    }

    pub(crate) fn set_number(&mut self, index: usize, value: f64) {
        self.numbers.insert(index, value);
    }

    pub(crate) fn start_label(&mut self, index: usize) {
        self.labels.insert(index, String::new());
    }

    pub(crate) fn push_label_char(&mut self, index: usize, ch: char) {
        self.labels.entry(index).or_default().push(ch);
    }

    pub(crate) fn label_len(&self, index: usize) -> usize {
        self.labels.get(&index).map_or(0, String::len)
    }

    pub(crate) fn truncate_label(&mut self, index: usize, len: usize) {
        if let Some(label) = self.labels.get_mut(&index) {
            label.truncate(len);
        }
    }

    /// Drops every instruction at or after `len` together with its side
    /// table entries.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.instructions.truncate(len);
        self.numbers.split_off(&len);
        self.labels.split_off(&len);
    }
}

impl<'a> IntoIterator for &'a InstructionQueue {
    type Item = &'a TokenInstance;
    type IntoIter = std::slice::Iter<'a, TokenInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}
