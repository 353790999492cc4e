//! Token cursor with one token of lookahead.
use smol_str::SmolStr;

use crate::{
    error::{CompileError, CompileResult},
    lex::Tokenizer,
    tokens::{Keyword, Token, TokenKind},
};

/// Stream of tokens where only the current token can be inspected.
///
/// Tokens are lazily lexed. Consuming the current token triggers the
/// internal tokenizer to scan the next one.
pub struct TokenStream<'a> {
    tokenizer: Tokenizer<'a>,
    current: Option<Token>,
    /// Line of the most recently consumed token, used to
    /// report errors at the end of the source.
    last_line: u32,
}

impl<'a> TokenStream<'a> {
    /// Prime the stream with the first token.
    pub fn new(mut tokenizer: Tokenizer<'a>) -> CompileResult<Self> {
        let current = if tokenizer.has_more_tokens() {
            tokenizer.advance()?;
            tokenizer.take_token()
        } else {
            None
        };

        Ok(Self {
            tokenizer,
            current,
            last_line: 1,
        })
    }

    /// Return the current token without advancing the cursor.
    ///
    /// Returns `None` when the tokens are exhausted.
    #[inline]
    pub fn peek(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    #[inline]
    pub fn peek_kind(&self) -> Option<TokenKind> {
        self.current.as_ref().map(|token| token.kind)
    }

    #[inline]
    pub fn peek_keyword(&self) -> Option<Keyword> {
        self.current.as_ref().and_then(Token::keyword)
    }

    #[inline]
    pub fn peek_symbol(&self) -> Option<char> {
        self.current.as_ref().and_then(Token::symbol)
    }

    #[inline]
    pub fn is_symbol(&self, symbol: char) -> bool {
        self.peek_symbol() == Some(symbol)
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.current.is_none()
    }

    /// Line of the current token, or the last line seen at the end.
    pub fn line(&self) -> u32 {
        self.current
            .as_ref()
            .map(|token| token.span.line)
            .unwrap_or(self.last_line)
    }

    /// Consumes the current token regardless of kind.
    pub fn next_token(&mut self, expected: &str) -> CompileResult<Token> {
        let token = match self.current.take() {
            Some(token) => token,
            None => return Err(self.error(expected)),
        };
        self.last_line = token.span.line;

        if self.tokenizer.has_more_tokens() {
            self.tokenizer.advance()?;
            self.current = self.tokenizer.take_token();
        }

        Ok(token)
    }

    /// Consumes the current token if it is the given symbol.
    ///
    /// Returns true when matched.
    pub fn match_symbol(&mut self, symbol: char) -> CompileResult<bool> {
        if self.is_symbol(symbol) {
            self.next_token("symbol")?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consume the required symbol.
    ///
    /// # Errors
    ///
    /// Returns a syntax error naming the symbol if the current token is
    /// anything else. The cursor is not advanced in that case.
    pub fn consume_symbol(&mut self, symbol: char) -> CompileResult<Token> {
        if self.is_symbol(symbol) {
            self.next_token("symbol")
        } else {
            Err(self.error(format!("'{symbol}'")))
        }
    }

    pub fn consume_keyword(&mut self, keyword: Keyword) -> CompileResult<Token> {
        if self.peek_keyword() == Some(keyword) {
            self.next_token("keyword")
        } else {
            Err(self.error(format!("'{keyword}'")))
        }
    }

    /// Consume one of the given keywords and return which one it was.
    pub fn consume_any_keyword(&mut self, keywords: &[Keyword]) -> CompileResult<Keyword> {
        match self.peek_keyword() {
            Some(keyword) if keywords.contains(&keyword) => {
                self.next_token("keyword")?;
                Ok(keyword)
            }
            _ => {
                let names = keywords
                    .iter()
                    .map(|keyword| format!("'{keyword}'"))
                    .collect::<Vec<_>>();
                Err(self.error(format!("one of {}", names.join(", "))))
            }
        }
    }

    /// Consume an identifier and return its name.
    pub fn consume_ident(&mut self, what: &str) -> CompileResult<SmolStr> {
        match self.peek_kind() {
            Some(TokenKind::Ident) => self.next_token(what).map(|token| token.lexeme),
            _ => Err(self.error(what)),
        }
    }

    /// Build a syntax error for the current token.
    #[inline(never)]
    #[cold]
    pub fn error(&self, expected: impl ToString) -> CompileError {
        let found = match &self.current {
            Some(token) => token.to_string(),
            None => "end of input".to_owned(),
        };
        CompileError::syntax(self.line(), expected, found)
    }
}
