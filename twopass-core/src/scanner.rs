//! Source cursor used by Pass 1.
//!
//! The scanner only knows about characters, blanks and comments. Deciding
//! what a lexeme means is left to the rule interpreter.

/// Position in the source. Cheap to copy, so rollback is a plain assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Byte offset.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// Byte offset where the current line starts.
    pub line_start: usize,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            offset: 0,
            line: 1,
            line_start: 0,
        }
    }
}

pub(crate) struct Scanner<'src> {
    source: &'src str,
    comment_markers: &'src [String],
    cursor: Cursor,
}

impl<'src> Scanner<'src> {
    pub(crate) fn new(source: &'src str, comment_markers: &'src [String]) -> Self {
        Self {
            source,
            comment_markers,
            cursor: Cursor::default(),
        }
    }

    pub(crate) fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub(crate) fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    pub(crate) fn offset(&self) -> usize {
        self.cursor.offset
    }

    /// 1-based column of the cursor, in characters.
    pub(crate) fn column(&self) -> usize {
        self.column_at(self.cursor)
    }

    pub(crate) fn column_at(&self, cursor: Cursor) -> usize {
        self.source[cursor.line_start..cursor.offset].chars().count() + 1
    }

    pub(crate) fn rest(&self) -> &'src str {
        &self.source[self.cursor.offset..]
    }

    pub(crate) fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub(crate) fn at_blank_or_end(&self) -> bool {
        self.peek_char().is_none_or(char::is_whitespace)
    }

    pub(crate) fn consume_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.cursor.offset += ch.len_utf8();
        match ch {
            '\n' => self.start_line(),
            // a lone CR ends a line; CR LF is counted once, on the LF
            '\r' if self.peek_char() != Some('\n') => self.start_line(),
            _ => {}
        }
        Some(ch)
    }

    fn start_line(&mut self) {
        self.cursor.line += 1;
        self.cursor.line_start = self.cursor.offset;
    }

    /// Moves past whitespace, line terminators and line comments.
    /// Returns `true` when a lexeme remains.
    pub(crate) fn skip_blanks(&mut self) -> bool {
        loop {
            match self.peek_char() {
                None => return false,
                Some(ch) if ch.is_whitespace() => {
                    self.consume_char();
                }
                Some(_) if self.at_comment() => self.skip_to_eol(),
                Some(_) => return true,
            }
        }
    }

    fn at_comment(&self) -> bool {
        let rest = self.rest();
        self.comment_markers
            .iter()
            .any(|marker| rest.starts_with(marker.as_str()))
    }

    fn skip_to_eol(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            self.consume_char();
        }
    }

    /// Consumes `lexeme` if the source continues with it.
    pub(crate) fn eat_lexeme(&mut self, lexeme: &str, case_sensitive: bool) -> bool {
        if lexeme.is_empty() {
            return false;
        }
        let rest = self.rest();
        let Some(candidate) = rest.get(..lexeme.len()) else {
            return false;
        };
        let matched = if case_sensitive {
            candidate == lexeme
        } else {
            candidate.eq_ignore_ascii_case(lexeme)
        };
        if matched {
            for _ in lexeme.chars() {
                self.consume_char();
            }
        }
        matched
    }

    /// Reads a floating point literal at the cursor without moving it.
    /// Returns the value and its length in bytes.
    pub(crate) fn scan_number(&self) -> Option<(f64, usize)> {
        let len = float_prefix_len(self.rest().as_bytes())?;
        let value = self.rest()[..len].parse::<f64>().ok()?;
        Some((value, len))
    }

    /// Advances over ASCII text of `len` bytes that holds no line break.
    pub(crate) fn advance(&mut self, len: usize) {
        self.cursor.offset += len;
    }

    /// Up to twenty characters of source at `cursor`, stopping at the line end.
    pub(crate) fn hint_at(&self, cursor: Cursor) -> String {
        self.source[cursor.offset..]
            .chars()
            .take_while(|ch| *ch != '\n' && *ch != '\r')
            .take(20)
            .collect()
    }
}

// [+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?
fn float_prefix_len(bytes: &[u8]) -> Option<usize> {
    let digits_from = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_end = digits_from(i);
    let mut end = int_end;
    let mut has_digits = int_end > i;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if has_digits || frac_end > end + 1 {
            has_digits = true;
            end = frac_end;
        }
    }
    if !has_digits {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut j = end + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_end = digits_from(j);
        if exp_end > j {
            end = exp_end;
        }
    }
    Some(end)
}
