use tracing::{debug, trace};

use crate::chunk::Chunk;
use crate::common::{CompileError, CompileResult};
use crate::lexer::Lexer;
use crate::parser::Parser;

/// Translates one class into stack machine code.
///
/// On error nothing is returned: output of an aborted unit is never exposed.
pub fn compile(source: &[u8]) -> CompileResult<Chunk> {
    translate(source, false).map(|(chunk, _)| chunk)
}

/// Like [`compile`], also returning the parenthesized grammar trace.
pub fn compile_traced(source: &[u8]) -> CompileResult<(Chunk, String)> {
    translate(source, true).map(|(chunk, trace)| (chunk, trace.unwrap_or_default()))
}

fn translate(source: &[u8], traced: bool) -> CompileResult<(Chunk, Option<String>)> {
    let source = std::str::from_utf8(source).map_err(|_| CompileError::Encoding)?;
    let lexer = Lexer::new(source);
    let mut parser = if traced {
        Parser::with_trace(lexer)
    } else {
        Parser::new(lexer)
    };
    parser.advance()?;
    parser.class()?;

    let class_name = parser.class_name().to_string();
    let (chunk, trace) = parser.finish();
    debug!(class = %class_name, instructions = chunk.len(), "compiled class");
    trace!("\n{}", chunk.disassemble(&class_name));
    Ok((chunk, trace))
}
