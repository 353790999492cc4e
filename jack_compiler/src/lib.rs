pub mod batch;
pub mod compile;
mod cursor;
pub mod error;
pub mod lex;
pub mod token_stream;
pub mod tokens;
pub mod trivia;

use std::io::Write;

pub use error::{CompileError, CompileResult, FileError};
use smol_str::SmolStr;

/// Compile one class from source text into VM code.
pub fn compile_str(source: &str) -> CompileResult<String> {
    let mut out = Vec::with_capacity(source.len());
    compile_to(source, &mut out)?;

    // Output is assembled from `&str` lexemes, so it is always valid UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Compile one class, streaming VM code into the given sink.
///
/// Returns the name declared by the class.
pub fn compile_to<W: Write>(source: &str, out: W) -> CompileResult<SmolStr> {
    // Trivia
    let stripped = trivia::strip_comments(source);

    // Lexical analysis
    let tokenizer = lex::Tokenizer::new(&stripped);
    let stream = token_stream::TokenStream::new(tokenizer)?;

    // Syntactic analysis and code generation
    let engine = compile::CompilationEngine::new(stream, compile::VmWriter::new(out));
    let (class_name, _) = engine.compile()?;

    Ok(class_name)
}

/// Token listing of a source file as XML.
pub fn tokens_xml(source: &str) -> CompileResult<String> {
    let stripped = trivia::strip_comments(source);
    let mut out = Vec::new();
    lex::write_tokens_xml(lex::Tokenizer::new(&stripped), &mut out)?;

    Ok(String::from_utf8_lossy(&out).into_owned())
}
