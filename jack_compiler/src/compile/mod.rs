mod engine;
mod symbol;
mod vm_writer;

pub use engine::{CompilationEngine, SubroutineKind};
pub use symbol::{Symbol, SymbolKind, SymbolTable};
pub use vm_writer::{ArithOp, Command, Segment, VmWriter};
