//! Comment trivia removal.
//!
//! The tokenizer has no notion of comments. Source text goes through
//! [`strip_comments`] first, which blanks out:
//!
//! - `// ...` up to the end of the line
//! - `/* ... */` and `/** ... */`, possibly spanning lines
//!
//! Comments are replaced by a space and the newlines they contain are kept,
//! so tokens report the same line numbers as in the original file.
use crate::cursor::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriviaKind {
    LineComment,
    BlockComment,
}

pub fn strip_comments(source: &str) -> String {
    let mut cursor = Cursor::new(source);
    let mut out = String::with_capacity(source.len());

    while let Some(c) = cursor.peek() {
        match (c, cursor.peek2().1) {
            ('/', Some('/')) => erase(&mut cursor, &mut out, TriviaKind::LineComment),
            ('/', Some('*')) => erase(&mut cursor, &mut out, TriviaKind::BlockComment),
            ('"', _) => copy_string(&mut cursor, &mut out),
            _ => {
                cursor.next_char();
                out.push(c);
            }
        }
    }

    out
}

/// Consume one comment, writing only its line breaks.
fn erase(cursor: &mut Cursor, out: &mut String, kind: TriviaKind) {
    // Separates tokens on both sides of the comment.
    out.push(' ');

    // Opening `//` or `/*`
    cursor.next_char();
    cursor.next_char();

    match kind {
        TriviaKind::LineComment => cursor.eat_while(|c| c != '\n'),
        TriviaKind::BlockComment => {
            // Unterminated block comments run to the end of the source.
            while let Some(c) = cursor.next_char() {
                if c == '\n' {
                    out.push('\n');
                } else if c == '*' && cursor.peek() == Some('/') {
                    cursor.next_char();
                    break;
                }
            }
        }
    }
}

/// String constants may contain comment markers.
fn copy_string(cursor: &mut Cursor, out: &mut String) {
    if let Some(quote) = cursor.next_char() {
        out.push(quote);
    }

    while let Some(c) = cursor.next_char() {
        out.push(c);
        if c == '"' || c == '\n' {
            break;
        }
    }
}
