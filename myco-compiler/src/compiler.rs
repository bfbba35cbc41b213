use anyhow::{bail, Result};
use tracing::debug;

use crate::ast::{Block, SourceSpan};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::inference::InferenceResult;
use crate::lexer::Lexer;
use crate::parser::{ParseErrorRecord, Parser, ParserOptions, DEFAULT_MAX_DEPTH};
use crate::source::SourceFile;
use crate::typechecker::TypeChecker;

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub dump_tokens: bool,
    pub type_check: bool,
    pub max_depth: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dump_tokens: false,
            type_check: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

pub struct Compilation {
    pub program: Block,
    pub parse_errors: ParseErrorRecord,
    /// Empty when type checking was disabled.
    pub inference: Vec<InferenceResult>,
    pub type_checked: bool,
}

pub struct Compiler {
    diagnostics: Diagnostics,
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            diagnostics: Diagnostics::new(),
            options,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    /// Lexes, parses and (unless disabled) type checks `source`. Syntax and
    /// type errors land in [`Compiler::diagnostics`]; only a lexing failure
    /// aborts the pipeline.
    pub fn compile(&mut self, source: &SourceFile) -> Result<Compilation> {
        let tokens = match Lexer::new(source).tokenize() {
            Ok(tokens) => tokens,
            Err(err) => {
                self.diagnostics.push_error_with_span(
                    DiagnosticKind::Internal,
                    err.to_string(),
                    Some(SourceSpan::single_point(err.line(), err.column())),
                );
                bail!("Lexing failed");
            }
        };

        if self.options.dump_tokens {
            for token in &tokens {
                println!("{token:?}");
            }
        }

        let mut parser = Parser::with_options(
            source,
            tokens,
            ParserOptions {
                max_depth: self.options.max_depth,
            },
        );
        let program = parser.parse_program();
        let parse_errors = parser.error_record().clone();
        self.diagnostics.extend(parser.into_diagnostics());

        if !self.options.type_check {
            debug!("type checking disabled");
            return Ok(Compilation {
                program,
                parse_errors,
                inference: Vec::new(),
                type_checked: false,
            });
        }

        let mut checker = TypeChecker::new();
        let passed = checker.type_check(&program);
        let (diagnostics, inference) = checker.into_parts();
        self.diagnostics.extend(diagnostics);
        debug!(
            path = %source.path.display(),
            syntax_errors = parse_errors.count,
            type_check_passed = passed,
            "compiled source"
        );

        Ok(Compilation {
            program,
            parse_errors,
            inference: inference.into_results(),
            type_checked: true,
        })
    }
}
