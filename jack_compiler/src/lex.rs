//! Lexical analysis (tokenizer)
use std::io::Write;

use smol_str::SmolStr;

use crate::{
    cursor::Cursor,
    error::{CompileError, CompileResult},
    tokens::{is_symbol, Keyword, Span, Token, TokenKind},
};

/// Largest value an integer constant may hold.
pub const MAX_INT_CONST: u16 = 32767;

/// Write the token stream as XML, one element per token.
pub fn write_tokens_xml<W: Write>(tokenizer: Tokenizer, out: &mut W) -> CompileResult<()> {
    writeln!(out, "<tokens>")?;
    for result in tokenizer {
        let token = result?;
        let tag = token.kind.tag();
        writeln!(out, "<{tag}> {} </{tag}>", escape_xml(&token.lexeme))?;
    }
    writeln!(out, "</tokens>")?;
    Ok(())
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Lexical analyzer.
///
/// Tokens are produced lazily, one per [`Tokenizer::advance`] call. The
/// accessors expose the current token according to its classification.
///
/// Comments must be removed beforehand, see [`crate::trivia::strip_comments`].
pub struct Tokenizer<'a> {
    cursor: Cursor<'a>,
    current: Option<Token>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source_code: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source_code),
            current: None,
        }
    }

    /// Indicates whether another token remains in the source.
    ///
    /// Trailing whitespace does not count as a token.
    pub fn has_more_tokens(&mut self) -> bool {
        self.cursor.skip_whitespace();
        !self.cursor.at_end()
    }

    /// Scan the source characters and make the next token current.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::NoMoreTokens`] when the source is exhausted.
    pub fn advance(&mut self) -> CompileResult<()> {
        self.cursor.skip_whitespace();

        let start = self.cursor.offset();
        let line = self.cursor.line();

        let (kind, lexeme) = match self.cursor.peek() {
            None => return Err(CompileError::NoMoreTokens),
            Some(c) if is_symbol(c) => {
                self.cursor.next_char();
                (TokenKind::Symbol, SmolStr::from(self.fragment_from(start)))
            }
            Some('"') => self.consume_string(line)?,
            Some('0'..='9') => self.consume_int(start, line)?,
            Some(_) => self.consume_word(start),
        };

        let size = self.cursor.offset() - start;
        self.current = Some(Token {
            kind,
            lexeme,
            span: Span::new(start as u32, size as u32, line),
        });

        Ok(())
    }

    pub fn token_kind(&self) -> Option<TokenKind> {
        self.current.as_ref().map(|token| token.kind)
    }

    pub fn keyword(&self) -> Option<Keyword> {
        self.current.as_ref().and_then(Token::keyword)
    }

    pub fn symbol(&self) -> Option<char> {
        self.current.as_ref().and_then(Token::symbol)
    }

    pub fn identifier(&self) -> Option<&str> {
        self.lexeme_of(TokenKind::Ident)
    }

    pub fn int_val(&self) -> Option<u16> {
        self.lexeme_of(TokenKind::IntConst)
            .and_then(|lexeme| lexeme.parse().ok())
    }

    pub fn string_val(&self) -> Option<&str> {
        self.lexeme_of(TokenKind::StringConst)
    }

    /// Move the current token out of the tokenizer.
    pub fn take_token(&mut self) -> Option<Token> {
        self.current.take()
    }

    fn lexeme_of(&self, kind: TokenKind) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|token| token.kind == kind)
            .map(|token| token.lexeme.as_str())
    }

    fn fragment_from(&mut self, start: usize) -> &'a str {
        let end = self.cursor.offset();
        self.cursor.fragment(start, end)
    }
}

/// Specialised tokens.
impl<'a> Tokenizer<'a> {
    /// Body of a string constant, everything up to the closing quote.
    ///
    /// There are no escape sequences.
    fn consume_string(&mut self, line: u32) -> CompileResult<(TokenKind, SmolStr)> {
        debug_assert_eq!(self.cursor.peek(), Some('"'));
        self.cursor.next_char();

        let body_start = self.cursor.offset();
        self.cursor.eat_while(|c| c != '"' && c != '\n');
        let body = self.fragment_from(body_start);

        if self.cursor.next_char() != Some('"') {
            return Err(CompileError::Lexical {
                line,
                message: "unterminated string constant".to_owned(),
            });
        }

        // Each character is pushed as an integer constant.
        match body.chars().find(|c| *c as u32 > MAX_INT_CONST as u32) {
            Some(c) => Err(CompileError::Lexical {
                line,
                message: format!("character {c:?} in string constant is out of range 0..={MAX_INT_CONST}"),
            }),
            None => Ok((TokenKind::StringConst, SmolStr::from(body))),
        }
    }

    fn consume_int(&mut self, start: usize, line: u32) -> CompileResult<(TokenKind, SmolStr)> {
        self.cursor.eat_while(|c| c.is_ascii_digit());
        let digits = self.fragment_from(start);

        match digits.parse::<u32>() {
            Ok(value) if value <= MAX_INT_CONST as u32 => Ok((TokenKind::IntConst, SmolStr::from(digits))),
            _ => Err(CompileError::Lexical {
                line,
                message: format!("integer constant {digits} is out of range 0..={MAX_INT_CONST}"),
            }),
        }
    }

    /// Keyword or identifier.
    fn consume_word(&mut self, start: usize) -> (TokenKind, SmolStr) {
        self.cursor.eat_while(|c| !c.is_whitespace() && !is_symbol(c));
        let word = self.fragment_from(start);

        let kind = match Keyword::parse(word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident,
        };

        (kind, SmolStr::from(word))
    }
}

/// Implement `Tokenizer` as an iterator for consuming
/// tokens lazily.
impl<'a> Iterator for Tokenizer<'a> {
    type Item = CompileResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_more_tokens() {
            return None;
        }
        Some(
            self.advance()
                .and_then(|_| self.current.clone().ok_or(CompileError::NoMoreTokens)),
        )
    }
}
