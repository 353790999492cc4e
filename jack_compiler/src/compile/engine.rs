//! Single pass compiler from class source to VM code.
//!
//! Parsing and code generation are fused. Each grammar rule consumes its
//! tokens from the [`TokenStream`], records declarations in the
//! [`SymbolTable`] and writes instructions through the [`VmWriter`] as soon
//! as they are known. No syntax tree is built.
use std::io::Write;

use log::{debug, warn};
use smol_str::SmolStr;

use super::{
    symbol::{SymbolKind, SymbolTable},
    vm_writer::{Segment, VmWriter},
};
use crate::{
    error::{CompileError, CompileResult},
    token_stream::TokenStream,
    tokens::{is_operator, Keyword, TokenKind},
};

/// Kind of subroutine declaration, which decides the prologue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

impl SubroutineKind {
    fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::Constructor => Some(Self::Constructor),
            Keyword::Function => Some(Self::Function),
            Keyword::Method => Some(Self::Method),
            _ => None,
        }
    }
}

/// Statement production selected by its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statement {
    Let,
    If,
    While,
    Do,
    Return,
}

impl Statement {
    fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::Let => Some(Self::Let),
            Keyword::If => Some(Self::If),
            Keyword::While => Some(Self::While),
            Keyword::Do => Some(Self::Do),
            Keyword::Return => Some(Self::Return),
            _ => None,
        }
    }
}

/// Subroutine currently being compiled.
struct Subroutine {
    kind: SubroutineKind,
    name: SmolStr,
    is_void: bool,
}

pub struct CompilationEngine<'a, W: Write> {
    input: TokenStream<'a>,
    symbols: SymbolTable,
    writer: VmWriter<W>,
    /// Name declared by the `class` header.
    class_name: SmolStr,
    /// Next free number for `IF_` labels.
    if_counter: usize,
    /// Next free number for `WHILE_` labels.
    while_counter: usize,
}

impl<'a, W: Write> CompilationEngine<'a, W> {
    pub fn new(input: TokenStream<'a>, writer: VmWriter<W>) -> Self {
        Self {
            input,
            symbols: SymbolTable::new(),
            writer,
            class_name: SmolStr::default(),
            if_counter: 0,
            while_counter: 0,
        }
    }

    /// Compile the one class in the token stream.
    ///
    /// Returns the class name and the flushed output sink.
    pub fn compile(mut self) -> CompileResult<(SmolStr, W)> {
        self.compile_class()?;

        if !self.input.at_end() {
            return Err(self.input.error("end of input after class"));
        }

        let out = self.writer.finish()?;
        Ok((self.class_name, out))
    }

    fn qualified(&self, subroutine: &str) -> String {
        format!("{}.{}", self.class_name, subroutine)
    }

    fn next_if_labels(&mut self) -> (String, String) {
        let labels = (
            format!("IF_{}", self.if_counter),
            format!("IF_{}", self.if_counter + 1),
        );
        self.if_counter += 2;
        labels
    }

    fn next_while_labels(&mut self) -> (String, String) {
        let labels = (
            format!("WHILE_{}", self.while_counter),
            format!("WHILE_{}", self.while_counter + 1),
        );
        self.while_counter += 2;
        labels
    }

    /// Resolve a name that must be a variable, found on the given line.
    fn resolve(&self, name: &str, line: u32) -> CompileResult<(Segment, usize)> {
        self.symbols
            .lookup(name)
            .map(|symbol| (symbol.kind.segment(), symbol.index))
            .ok_or_else(|| CompileError::UndefinedSymbol {
                line,
                name: SmolStr::from(name),
            })
    }

    /// `int`, `char`, `boolean` or a class name.
    fn compile_type(&mut self) -> CompileResult<SmolStr> {
        match self.input.peek_kind() {
            Some(TokenKind::Keyword(Keyword::Int | Keyword::Char | Keyword::Boolean)) | Some(TokenKind::Ident) => {
                self.input.next_token("type").map(|token| token.lexeme)
            }
            _ => Err(self.input.error("type")),
        }
    }
}

/// Program structure
impl<'a, W: Write> CompilationEngine<'a, W> {
    fn compile_class(&mut self) -> CompileResult<()> {
        self.input.consume_keyword(Keyword::Class)?;
        self.class_name = self.input.consume_ident("class name")?;
        self.input.consume_symbol('{')?;
        debug!("compiling class {}", self.class_name);

        while matches!(self.input.peek_keyword(), Some(Keyword::Static | Keyword::Field)) {
            self.compile_class_var_dec()?;
        }

        while let Some(kind) = self.input.peek_keyword().and_then(SubroutineKind::from_keyword) {
            self.compile_subroutine_dec(kind)?;
        }

        self.input.consume_symbol('}')?;
        Ok(())
    }

    fn compile_class_var_dec(&mut self) -> CompileResult<()> {
        let kind = match self.input.consume_any_keyword(&[Keyword::Static, Keyword::Field])? {
            Keyword::Static => SymbolKind::Static,
            _ => SymbolKind::Field,
        };
        self.compile_var_names(kind)
    }

    /// `type varName (',' varName)* ';'`
    fn compile_var_names(&mut self, kind: SymbolKind) -> CompileResult<()> {
        let ty = self.compile_type()?;

        loop {
            let name = self.input.consume_ident("variable name")?;
            self.symbols.define(name, ty.clone(), kind);

            if !self.input.match_symbol(',')? {
                break;
            }
        }

        self.input.consume_symbol(';')?;
        Ok(())
    }

    fn compile_subroutine_dec(&mut self, kind: SubroutineKind) -> CompileResult<()> {
        self.input.next_token("subroutine kind")?;
        self.symbols.start_subroutine();

        let is_void = self.input.peek_keyword() == Some(Keyword::Void);
        if is_void {
            self.input.next_token("return type")?;
        } else {
            self.compile_type()?;
        }

        let name = self.input.consume_ident("subroutine name")?;

        // The receiver is the hidden first argument of a method.
        if kind == SubroutineKind::Method {
            self.symbols.define("this", self.class_name.clone(), SymbolKind::Argument);
        }

        self.input.consume_symbol('(')?;
        self.compile_parameter_list()?;
        self.input.consume_symbol(')')?;

        let subroutine = Subroutine { kind, name, is_void };
        debug!("compiling {:?} {}", kind, self.qualified(&subroutine.name));
        self.compile_subroutine_body(&subroutine)
    }

    fn compile_parameter_list(&mut self) -> CompileResult<()> {
        if self.input.is_symbol(')') {
            return Ok(());
        }

        loop {
            let ty = self.compile_type()?;
            let name = self.input.consume_ident("parameter name")?;
            self.symbols.define(name, ty, SymbolKind::Argument);

            if !self.input.match_symbol(',')? {
                return Ok(());
            }
        }
    }

    fn compile_subroutine_body(&mut self, subroutine: &Subroutine) -> CompileResult<()> {
        self.input.consume_symbol('{')?;

        while self.input.peek_keyword() == Some(Keyword::Var) {
            self.input.next_token("var")?;
            self.compile_var_names(SymbolKind::Local)?;
        }

        self.compile_prologue(subroutine)?;
        let last = self.compile_statements(subroutine)?;

        if last != Some(Statement::Return) && !self.writer.returned() {
            if subroutine.is_void {
                warn!(
                    "{} does not end with a return statement, returning implicitly",
                    self.qualified(&subroutine.name)
                );
                self.writer.push(Segment::Constant, 0)?;
                self.writer.return_()?;
            } else {
                warn!("{} does not end with a return statement", self.qualified(&subroutine.name));
            }
        }

        self.input.consume_symbol('}')?;
        Ok(())
    }

    /// Function header, plus binding `this` for methods and constructors.
    fn compile_prologue(&mut self, subroutine: &Subroutine) -> CompileResult<()> {
        let name = self.qualified(&subroutine.name);
        let n_locals = self.symbols.var_count(SymbolKind::Local);
        self.writer.function(&name, n_locals)?;

        match subroutine.kind {
            SubroutineKind::Function => {}
            SubroutineKind::Method => {
                self.writer.push(Segment::Argument, 0)?;
                self.writer.pop(Segment::Pointer, 0)?;
            }
            SubroutineKind::Constructor => {
                let n_fields = self.symbols.var_count(SymbolKind::Field);
                self.writer.push(Segment::Constant, n_fields)?;
                self.writer.call("Memory.alloc", 1)?;
                self.writer.pop(Segment::Pointer, 0)?;
            }
        }

        Ok(())
    }
}

/// Statements
impl<'a, W: Write> CompilationEngine<'a, W> {
    /// Returns the kind of the last statement compiled, if any.
    fn compile_statements(&mut self, subroutine: &Subroutine) -> CompileResult<Option<Statement>> {
        let mut last = None;

        while let Some(statement) = self.input.peek_keyword().and_then(Statement::from_keyword) {
            match statement {
                Statement::Let => self.compile_let()?,
                Statement::If => self.compile_if(subroutine)?,
                Statement::While => self.compile_while(subroutine)?,
                Statement::Do => self.compile_do()?,
                Statement::Return => self.compile_return(subroutine)?,
            }
            last = Some(statement);
        }

        Ok(last)
    }

    /// Compile a `{ statements }` block.
    fn compile_block(&mut self, subroutine: &Subroutine) -> CompileResult<()> {
        self.input.consume_symbol('{')?;
        self.compile_statements(subroutine)?;
        self.input.consume_symbol('}')?;
        Ok(())
    }

    fn compile_let(&mut self) -> CompileResult<()> {
        self.input.consume_keyword(Keyword::Let)?;
        let line = self.input.line();
        let name = self.input.consume_ident("variable name")?;
        let (segment, index) = self.resolve(&name, line)?;

        // The element address is computed before the right-hand side, but only
        // written through `pointer 1` after it, because the right-hand side may
        // use `pointer 1` for its own array accesses.
        let is_array = self.input.match_symbol('[')?;
        if is_array {
            self.compile_expression()?;
            self.writer.push(segment, index)?;
            self.writer.arithmetic('+', false)?;
            self.input.consume_symbol(']')?;
        }

        self.input.consume_symbol('=')?;
        self.compile_expression()?;
        self.input.consume_symbol(';')?;

        if is_array {
            self.writer.pop(Segment::Temp, 0)?;
            self.writer.pop(Segment::Pointer, 1)?;
            self.writer.push(Segment::Temp, 0)?;
            self.writer.pop(Segment::That, 0)?;
        } else {
            self.writer.pop(segment, index)?;
        }

        Ok(())
    }

    fn compile_if(&mut self, subroutine: &Subroutine) -> CompileResult<()> {
        self.input.consume_keyword(Keyword::If)?;
        let (else_label, end_label) = self.next_if_labels();

        self.compile_condition()?;
        self.writer.if_goto(&else_label)?;

        self.compile_block(subroutine)?;
        self.writer.goto(&end_label)?;

        self.writer.label(&else_label)?;
        if self.input.peek_keyword() == Some(Keyword::Else) {
            self.input.next_token("else")?;
            self.compile_block(subroutine)?;
        }
        self.writer.label(&end_label)?;

        Ok(())
    }

    fn compile_while(&mut self, subroutine: &Subroutine) -> CompileResult<()> {
        self.input.consume_keyword(Keyword::While)?;
        let (top_label, end_label) = self.next_while_labels();

        self.writer.label(&top_label)?;
        self.compile_condition()?;
        self.writer.if_goto(&end_label)?;

        self.compile_block(subroutine)?;
        self.writer.goto(&top_label)?;
        self.writer.label(&end_label)?;

        Ok(())
    }

    /// `'(' expression ')'`, negated so a jump skips the guarded block.
    fn compile_condition(&mut self) -> CompileResult<()> {
        self.input.consume_symbol('(')?;
        self.compile_expression()?;
        self.input.consume_symbol(')')?;
        self.writer.arithmetic('~', true)
    }

    fn compile_do(&mut self) -> CompileResult<()> {
        self.input.consume_keyword(Keyword::Do)?;
        let name = self.input.consume_ident("subroutine name")?;
        self.compile_subroutine_call(&name)?;
        self.input.consume_symbol(';')?;

        // Discard the return value.
        self.writer.pop(Segment::Temp, 0)
    }

    fn compile_return(&mut self, subroutine: &Subroutine) -> CompileResult<()> {
        self.input.consume_keyword(Keyword::Return)?;

        if !self.input.is_symbol(';') {
            self.compile_expression()?;
        }
        self.input.consume_symbol(';')?;

        // The caller always receives exactly one value.
        if subroutine.is_void {
            self.writer.push(Segment::Constant, 0)?;
        }
        self.writer.return_()
    }
}

/// Expressions
impl<'a, W: Write> CompilationEngine<'a, W> {
    /// Operators apply strictly left to right without precedence,
    /// so `1 + 2 * 3` is `(1 + 2) * 3`.
    fn compile_expression(&mut self) -> CompileResult<()> {
        self.compile_term()?;

        while let Some(op) = self.input.peek_symbol().filter(|c| is_operator(*c)) {
            self.input.next_token("operator")?;
            self.compile_term()?;
            self.writer.arithmetic(op, false)?;
        }

        Ok(())
    }

    fn compile_term(&mut self) -> CompileResult<()> {
        let token = match self.input.peek() {
            Some(token) => token.clone(),
            None => return Err(self.input.error("term")),
        };

        match token.kind {
            TokenKind::IntConst => {
                self.input.next_token("integer constant")?;
                let value = token
                    .lexeme
                    .parse::<usize>()
                    .map_err(|_| self.input.error("integer constant"))?;
                self.writer.push(Segment::Constant, value)
            }
            TokenKind::StringConst => {
                self.input.next_token("string constant")?;
                self.compile_string(&token.lexeme)
            }
            TokenKind::Keyword(keyword) => self.compile_keyword_constant(keyword),
            TokenKind::Symbol => match token.symbol() {
                Some('(') => {
                    self.input.next_token("'('")?;
                    self.compile_expression()?;
                    self.input.consume_symbol(')')?;
                    Ok(())
                }
                Some(op @ ('-' | '~')) => {
                    self.input.next_token("unary operator")?;
                    self.compile_term()?;
                    self.writer.arithmetic(op, true)
                }
                _ => Err(self.input.error("term")),
            },
            TokenKind::Ident => {
                self.input.next_token("identifier")?;

                match self.input.peek_symbol() {
                    Some('(' | '.') => self.compile_subroutine_call(&token.lexeme),
                    Some('[') => {
                        let (segment, index) = self.resolve(&token.lexeme, token.span.line)?;
                        self.input.next_token("'['")?;
                        self.writer.push(segment, index)?;
                        self.compile_expression()?;
                        self.input.consume_symbol(']')?;

                        self.writer.arithmetic('+', false)?;
                        self.writer.pop(Segment::Pointer, 1)?;
                        self.writer.push(Segment::That, 0)
                    }
                    _ => {
                        let (segment, index) = self.resolve(&token.lexeme, token.span.line)?;
                        self.writer.push(segment, index)
                    }
                }
            }
        }
    }

    fn compile_keyword_constant(&mut self, keyword: Keyword) -> CompileResult<()> {
        match keyword {
            Keyword::True => {
                self.writer.push(Segment::Constant, 1)?;
                self.writer.arithmetic('-', true)?;
            }
            Keyword::False | Keyword::Null => self.writer.push(Segment::Constant, 0)?,
            Keyword::This => self.writer.push(Segment::Pointer, 0)?,
            _ => return Err(self.input.error("term")),
        }
        self.input.next_token("keyword constant")?;
        Ok(())
    }

    /// Build the string at runtime one character at a time.
    ///
    /// `String.appendChar` returns the string, so it stays on top of the stack.
    fn compile_string(&mut self, text: &str) -> CompileResult<()> {
        self.writer.push(Segment::Constant, text.chars().count())?;
        self.writer.call("String.new", 1)?;

        for c in text.chars() {
            self.writer.push(Segment::Constant, c as usize)?;
            self.writer.call("String.appendChar", 2)?;
        }

        Ok(())
    }

    /// Compile a call whose first identifier has already been consumed.
    ///
    /// - `name(...)` calls a method of the current class on `this`.
    /// - `var.name(...)` calls a method on the object stored in a variable.
    /// - `Class.name(...)` calls a function or constructor. Any prefix that is
    ///   not a variable is taken to be a class name.
    fn compile_subroutine_call(&mut self, first: &str) -> CompileResult<()> {
        if self.input.match_symbol('(')? {
            self.writer.push(Segment::Pointer, 0)?;
            let n_args = self.compile_expression_list()?;
            self.input.consume_symbol(')')?;

            let name = self.qualified(first);
            return self.writer.call(&name, n_args + 1);
        }

        self.input.consume_symbol('.')?;
        let subroutine = self.input.consume_ident("subroutine name")?;
        self.input.consume_symbol('(')?;

        let receiver = self
            .symbols
            .lookup(first)
            .map(|symbol| (symbol.kind.segment(), symbol.index, symbol.ty.clone()));

        let (name, hidden_args) = match receiver {
            Some((segment, index, ty)) => {
                self.writer.push(segment, index)?;
                (format!("{}.{}", ty, subroutine), 1)
            }
            None => (format!("{}.{}", first, subroutine), 0),
        };

        let n_args = self.compile_expression_list()?;
        self.input.consume_symbol(')')?;

        self.writer.call(&name, n_args + hidden_args)
    }

    /// Returns the number of expressions compiled.
    fn compile_expression_list(&mut self) -> CompileResult<usize> {
        if self.input.is_symbol(')') {
            return Ok(0);
        }

        let mut count = 0;
        loop {
            self.compile_expression()?;
            count += 1;

            if !self.input.match_symbol(',')? {
                return Ok(count);
            }
        }
    }
}
