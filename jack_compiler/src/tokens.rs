//! Tokens
use std::fmt;

use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal text of the token.
    ///
    /// String constants store their body without the enclosing quotes.
    pub lexeme: SmolStr,
    pub span: Span,
}

impl Token {
    /// The single character of a symbol token.
    pub fn symbol(&self) -> Option<char> {
        match self.kind {
            TokenKind::Symbol => self.lexeme.chars().next(),
            _ => None,
        }
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(keyword) => Some(keyword),
            _ => None,
        }
    }
}

/// Shown in syntax errors as the token that was found.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            TokenKind::StringConst => write!(f, "{} \"{}\"", self.kind, self.lexeme),
            _ => write!(f, "{} '{}'", self.kind, self.lexeme),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier in the set of reserved words.
    Keyword(Keyword),
    /// One of the structural characters, see [`SYMBOLS`].
    Symbol,
    /// Integer literal
    IntConst,
    /// String literal
    StringConst,
    Ident,
}

impl TokenKind {
    /// Element name used by the token XML dump.
    #[rustfmt::skip]
    pub fn tag(&self) -> &'static str {
        match self {
            TokenKind::Keyword(_)  => "keyword",
            TokenKind::Symbol      => "symbol",
            TokenKind::IntConst    => "integerConstant",
            TokenKind::StringConst => "stringConstant",
            TokenKind::Ident       => "identifier",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Structural characters. Each one is a token on its own.
pub const SYMBOLS: &[char] = &[
    '{', '}', '(', ')', '[', ']', '.', ',', ';', '+', '-', '*', '/', '&', '|', '<', '>', '=', '~',
];

#[inline]
pub fn is_symbol(c: char) -> bool {
    SYMBOLS.contains(&c)
}

/// Binary operators of an expression.
#[inline]
pub fn is_operator(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '&' | '|' | '<' | '>' | '=')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,
    Int,
    Char,
    Boolean,
    Void,
    True,
    False,
    Null,
    This,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

impl Keyword {
    #[rustfmt::skip]
    pub fn parse(text: impl AsRef<str>) -> Option<Self> {
        use Keyword as K;
        match text.as_ref() {
            "class"       => Some(K::Class),
            "constructor" => Some(K::Constructor),
            "function"    => Some(K::Function),
            "method"      => Some(K::Method),
            "field"       => Some(K::Field),
            "static"      => Some(K::Static),
            "var"         => Some(K::Var),
            "int"         => Some(K::Int),
            "char"        => Some(K::Char),
            "boolean"     => Some(K::Boolean),
            "void"        => Some(K::Void),
            "true"        => Some(K::True),
            "false"       => Some(K::False),
            "null"        => Some(K::Null),
            "this"        => Some(K::This),
            "let"         => Some(K::Let),
            "do"          => Some(K::Do),
            "if"          => Some(K::If),
            "else"        => Some(K::Else),
            "while"       => Some(K::While),
            "return"      => Some(K::Return),
            _             => None,
        }
    }

    #[rustfmt::skip]
    pub fn as_str(&self) -> &'static str {
        use Keyword as K;
        match self {
            K::Class       => "class",
            K::Constructor => "constructor",
            K::Function    => "function",
            K::Method      => "method",
            K::Field       => "field",
            K::Static      => "static",
            K::Var         => "var",
            K::Int         => "int",
            K::Char        => "char",
            K::Boolean     => "boolean",
            K::Void        => "void",
            K::True        => "true",
            K::False       => "false",
            K::Null        => "null",
            K::This        => "this",
            K::Let         => "let",
            K::Do          => "do",
            K::If          => "if",
            K::Else        => "else",
            K::While       => "while",
            K::Return      => "return",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chunk of source code, encoded as a starting byte position and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub index: u32,
    pub size: u32,
    /// Line number, starting at 1.
    pub line: u32,
}

impl Span {
    pub fn new(index: u32, size: u32, line: u32) -> Self {
        Self { index, size, line }
    }
}
