//! Character scanner over source text.
use std::str::CharIndices;

use itertools::{multipeek, MultiPeek};

/// Wrapper for source code that keeps a cursor position.
///
/// Allows forward lookup via peeking.
pub(crate) struct Cursor<'a> {
    /// Keep reference to the source so the lexer can
    /// slice fragments from it.
    original: &'a str,

    /// Iterator over UTF-8 encoded source code.
    ///
    /// The `MultiPeek` wrapper allows for arbitrary lookahead by consuming
    /// the iterator internally and buffering the result. Peeking advances
    /// the internal peek cursor by 1, so every lookup here resets it first.
    chars: MultiPeek<CharIndices<'a>>,

    /// Line of the next character, starting at 1.
    line: u32,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            original: source,
            chars: multipeek(source.char_indices()),
            line: 1,
        }
    }

    /// Line number of the next character.
    pub(crate) fn line(&self) -> u32 {
        self.line
    }

    /// Byte position of the next character, or the source length at the end.
    pub(crate) fn offset(&mut self) -> usize {
        self.chars.reset_peek();
        let offset = self.chars.peek().map(|(index, _)| *index);
        self.chars.reset_peek();
        offset.unwrap_or(self.original.len())
    }

    /// Peeks the next character without consuming it.
    pub(crate) fn peek(&mut self) -> Option<char> {
        self.chars.reset_peek();
        let c = self.chars.peek().map(|(_, c)| *c);
        self.chars.reset_peek();
        c
    }

    /// Two character lookahead.
    pub(crate) fn peek2(&mut self) -> (Option<char>, Option<char>) {
        self.chars.reset_peek();
        let pair = (
            self.chars.peek().map(|(_, c)| *c),
            self.chars.peek().map(|(_, c)| *c),
        );
        self.chars.reset_peek();
        pair
    }

    /// Advance the cursor and return the consumed character.
    pub(crate) fn next_char(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Consume characters while the predicate holds.
    pub(crate) fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.next_char();
        }
    }

    pub(crate) fn skip_whitespace(&mut self) {
        self.eat_while(char::is_whitespace)
    }

    pub(crate) fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }

    pub(crate) fn fragment(&self, start: usize, end: usize) -> &'a str {
        &self.original[start..end]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cursor_lines_and_offsets() {
        let mut cursor = Cursor::new("ab\ncd");
        assert_eq!(cursor.peek2(), (Some('a'), Some('b')));
        cursor.eat_while(|c| c != '\n');
        assert_eq!(cursor.offset(), 2);
        assert_eq!(cursor.line(), 1);

        cursor.skip_whitespace();
        assert_eq!(cursor.line(), 2);
        assert_eq!(cursor.next_char(), Some('c'));
        assert_eq!(cursor.next_char(), Some('d'));
        assert!(cursor.at_end());
        assert_eq!(cursor.offset(), 5);
    }
}
