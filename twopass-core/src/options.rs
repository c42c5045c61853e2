/// Knobs shared by grammar compilation and tokenization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Name used in diagnostics.
    pub grammar_name: String,
    /// Markers that start a comment running to the end of the line in
    /// source text. Grammar text always uses the default markers.
    pub comment_markers: Vec<String>,
    /// Maximum nesting of rule evaluations before Pass 1 gives up.
    ///
    /// A right-recursive rule such as `<list> ::= <item> [<list>]` nests once
    /// per matched item, so a source with more items than this limit fails
    /// with `RecursionLimit`. Write long lists as `{<item>}` repeats, which
    /// do not nest, or raise the limit with [`Self::with_max_rule_depth`].
    pub max_rule_depth: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            grammar_name: "client".to_string(),
            comment_markers: vec!["//".to_string(), ";".to_string(), "#".to_string()],
            max_rule_depth: 512,
        }
    }
}

impl CompilerOptions {
    pub fn with_grammar_name(mut self, name: impl Into<String>) -> Self {
        self.grammar_name = name.into();
        self
    }

    pub fn with_comment_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.comment_markers = markers
            .into_iter()
            .map(Into::into)
            .filter(|marker: &String| !marker.is_empty())
            .collect();
        self
    }

    pub fn with_max_rule_depth(mut self, depth: usize) -> Self {
        self.max_rule_depth = depth;
        self
    }
}
