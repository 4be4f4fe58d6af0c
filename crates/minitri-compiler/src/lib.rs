// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Unified entry point for the Mini Triangle compilation pipeline.
//!
//! Consolidates scanning, parsing, code generation, and module emission into
//! a single API: source text in, module bytes out. The pipeline is
//! synchronous and fail-fast — the first error of any stage aborts the
//! compilation and no partial module is produced.

use std::path::PathBuf;

use tracing::debug;

use minitri_ast::{SourceMap, Span};
use minitri_bytecode::EmitError;
use minitri_codegen::CodegenError;

/// A compilation error from any stage of the pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// The scanner hit a character sequence outside the token grammar.
    #[error("{message}")]
    Scan { message: String, span: Span },

    /// The parser hit its first grammar violation.
    #[error("{message}")]
    Parse { message: String, span: Span },

    /// The code generator rejected the program (or tripped one of its own
    /// invariants).
    #[error("{0}")]
    Codegen(#[from] CodegenError),

    /// The emitter found an unresolved label or malformed operand. Always a
    /// compiler bug, never a source error.
    #[error("{0}")]
    Emit(#[from] EmitError),
}

impl CompileError {
    /// Source location of the error, when one exists.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Scan { span, .. } | CompileError::Parse { span, .. } => Some(*span),
            CompileError::Codegen(err) => err.span(),
            CompileError::Emit(_) => None,
        }
    }

    /// True for compiler bugs (stack imbalance, unresolved labels), as
    /// opposed to errors in the source program.
    pub fn is_internal(&self) -> bool {
        match self {
            CompileError::Codegen(err) => err.is_internal(),
            CompileError::Emit(_) => true,
            _ => false,
        }
    }
}

/// A compile error rendered against its source: what the CLI prints.
///
/// User errors render as `path:line:col: error: message`; internal
/// consistency failures render with a distinct `internal error:` prefix so
/// they are never mistaken for a source mistake.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{rendered}")]
pub struct Diagnostic {
    /// The underlying stage error.
    pub error: CompileError,
    /// Pre-rendered message with source position.
    pub rendered: String,
}

impl Diagnostic {
    fn new(error: CompileError, sources: &SourceMap) -> Self {
        let rendered = if error.is_internal() {
            format!("internal error: {}", error)
        } else {
            match error.span() {
                Some(span) => {
                    let (line, col) = sources.line_col(&span);
                    format!(
                        "{}:{}:{}: error: {}",
                        sources.file_path(&span).display(),
                        line,
                        col,
                        error
                    )
                }
                None => format!("error: {}", error),
            }
        };
        Self { error, rendered }
    }
}

/// Compile one source text into module bytes.
///
/// `path` is used for diagnostics only; reading the file is the caller's
/// job. Compiling the same source twice yields byte-identical output.
pub fn compile(path: impl Into<PathBuf>, source: &str) -> Result<Vec<u8>, Diagnostic> {
    let mut sources = SourceMap::new();
    let file_id = sources.add_file(path.into(), source.to_string());

    let run = || -> Result<Vec<u8>, CompileError> {
        let tokens = minitri_lexer::scan(source).map_err(|err| CompileError::Scan {
            message: err.to_string(),
            span: Span::from_range(file_id, err.span),
        })?;
        debug!(tokens = tokens.len(), "scanned");

        let program = minitri_parser::parse(&tokens, file_id).map_err(|err| {
            CompileError::Parse {
                message: err.message.clone(),
                span: err.span,
            }
        })?;
        debug!("parsed");

        let module = minitri_codegen::generate(&program)?;
        debug!(
            blocks = module.program.len(),
            constants = module.pool.len(),
            "generated"
        );

        let bytes = minitri_bytecode::emit(&module)?;
        debug!(bytes = bytes.len(), "emitted");
        Ok(bytes)
    };

    run().map_err(|error| Diagnostic::new(error, &sources))
}
