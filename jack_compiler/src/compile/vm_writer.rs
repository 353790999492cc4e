//! VM instruction emitter.
use std::{fmt, io::Write};

use log::trace;

use crate::error::{CompileError, CompileResult};

/// Named memory region addressed by `push` and `pop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Local,
    Argument,
    This,
    That,
    Pointer,
    Temp,
    Static,
}

impl fmt::Display for Segment {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Segment::Constant => write!(f, "constant"),
            Segment::Local    => write!(f, "local"),
            Segment::Argument => write!(f, "argument"),
            Segment::This     => write!(f, "this"),
            Segment::That     => write!(f, "that"),
            Segment::Pointer  => write!(f, "pointer"),
            Segment::Temp     => write!(f, "temp"),
            Segment::Static   => write!(f, "static"),
        }
    }
}

/// Stack arithmetic and logic commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl fmt::Display for ArithOp {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArithOp::Add => write!(f, "add"),
            ArithOp::Sub => write!(f, "sub"),
            ArithOp::Neg => write!(f, "neg"),
            ArithOp::Eq  => write!(f, "eq"),
            ArithOp::Gt  => write!(f, "gt"),
            ArithOp::Lt  => write!(f, "lt"),
            ArithOp::And => write!(f, "and"),
            ArithOp::Or  => write!(f, "or"),
            ArithOp::Not => write!(f, "not"),
        }
    }
}

/// One VM instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Push(Segment, usize),
    Pop(Segment, usize),
    Arithmetic(ArithOp),
    Label(&'a str),
    Goto(&'a str),
    IfGoto(&'a str),
    /// Function name and number of arguments.
    Call(&'a str, usize),
    /// Function name and number of locals.
    Function(&'a str, usize),
    Return,
}

/// Outputs the instruction as VM code.
impl<'a> fmt::Display for Command<'a> {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Command::Push(segment, index)  => write!(f, "push {} {}", segment, index),
            Command::Pop(segment, index)   => write!(f, "pop {} {}", segment, index),
            Command::Arithmetic(op)        => write!(f, "{}", op),
            Command::Label(label)          => write!(f, "label {}", label),
            Command::Goto(label)           => write!(f, "goto {}", label),
            Command::IfGoto(label)         => write!(f, "if-goto {}", label),
            Command::Call(name, n_args)    => write!(f, "call {} {}", name, n_args),
            Command::Function(name, n_locals) => write!(f, "function {} {}", name, n_locals),
            Command::Return                => write!(f, "return"),
        }
    }
}

/// Writes VM instructions, one per line, to the output sink.
///
/// Lines are written in call order and never revisited.
pub struct VmWriter<W: Write> {
    out: W,
    /// Number of instructions written so far.
    count: usize,
    /// Whether the most recent instruction was a `return`.
    returned: bool,
}

impl<W: Write> VmWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            count: 0,
            returned: false,
        }
    }

    pub fn emit(&mut self, command: Command) -> CompileResult<()> {
        trace!("{:>5} {}", self.count, command);
        writeln!(self.out, "{}", command)?;
        self.count += 1;
        self.returned = command == Command::Return;
        Ok(())
    }

    #[inline]
    pub fn push(&mut self, segment: Segment, index: usize) -> CompileResult<()> {
        self.emit(Command::Push(segment, index))
    }

    #[inline]
    pub fn pop(&mut self, segment: Segment, index: usize) -> CompileResult<()> {
        self.emit(Command::Pop(segment, index))
    }

    /// Emit the command for a source operator.
    ///
    /// Only `-` distinguishes between its unary and binary form. Multiplication
    /// and division have no VM command and call into the `Math` library.
    #[rustfmt::skip]
    pub fn arithmetic(&mut self, operator: char, is_unary: bool) -> CompileResult<()> {
        let op = match (operator, is_unary) {
            ('+', _)     => ArithOp::Add,
            ('-', false) => ArithOp::Sub,
            ('-', true)  => ArithOp::Neg,
            ('~', _)     => ArithOp::Not,
            ('<', _)     => ArithOp::Lt,
            ('>', _)     => ArithOp::Gt,
            ('&', _)     => ArithOp::And,
            ('|', _)     => ArithOp::Or,
            ('=', _)     => ArithOp::Eq,
            ('/', _)     => return self.call("Math.divide", 2),
            ('*', _)     => return self.call("Math.multiply", 2),
            _            => return Err(CompileError::UnknownOperator(operator)),
        };
        self.emit(Command::Arithmetic(op))
    }

    #[inline]
    pub fn label(&mut self, name: &str) -> CompileResult<()> {
        self.emit(Command::Label(name))
    }

    #[inline]
    pub fn goto(&mut self, name: &str) -> CompileResult<()> {
        self.emit(Command::Goto(name))
    }

    #[inline]
    pub fn if_goto(&mut self, name: &str) -> CompileResult<()> {
        self.emit(Command::IfGoto(name))
    }

    #[inline]
    pub fn call(&mut self, name: &str, n_args: usize) -> CompileResult<()> {
        self.emit(Command::Call(name, n_args))
    }

    #[inline]
    pub fn function(&mut self, name: &str, n_locals: usize) -> CompileResult<()> {
        self.emit(Command::Function(name, n_locals))
    }

    #[inline]
    pub fn return_(&mut self) -> CompileResult<()> {
        self.emit(Command::Return)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether the last written instruction was a `return`.
    pub fn returned(&self) -> bool {
        self.returned
    }

    /// Flush the sink and hand it back.
    pub fn finish(mut self) -> CompileResult<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
