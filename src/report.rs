//! Error sinks and the compiler front door that feeds them.

use crate::config::CompilerConfig;
use crate::parser::Parser;
use crate::resolver::{ResolvedConfig, Resolver};
use crate::source::Diagnostic;
use crate::Error;

/// Receives the diagnostic of a unit that failed to compile.
pub trait Reporter {
    fn report(&mut self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, diagnostic: &Diagnostic) {
        tracing::error!(
            line = diagnostic.line,
            column = diagnostic.column,
            source = diagnostic.source_name.as_deref().unwrap_or("<input>"),
            "{diagnostic}"
        );
    }
}

/// Collects diagnostics in memory.
impl Reporter for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.push(diagnostic.clone());
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn report(&mut self, diagnostic: &Diagnostic) {
        (**self).report(diagnostic);
    }
}

/// Runs the whole pipeline on one source string.
///
/// A failed unit is reported to the injected [`Reporter`] and also
/// returned as an [`Error`]; nothing else happens to the process.
#[derive(Debug, Clone, Default)]
pub struct Compiler<R = TracingReporter> {
    config: CompilerConfig,
    reporter: R,
}

impl Compiler<TracingReporter> {
    #[must_use]
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            reporter: TracingReporter,
        }
    }
}

impl<R: Reporter> Compiler<R> {
    /// Swap the error sink.
    #[must_use]
    pub fn with_reporter<T: Reporter>(self, reporter: T) -> Compiler<T> {
        Compiler {
            config: self.config,
            reporter,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &CompilerConfig {
        &self.config
    }

    #[must_use]
    pub const fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Compile `source` into its resolved per-domain map.
    ///
    /// # Errors
    ///
    /// Returns the first lexical, syntax, or nesting error after handing
    /// its diagnostic to the reporter.
    pub fn compile(&mut self, source: &str) -> Result<ResolvedConfig, Error> {
        let unit = match Parser::new(source).parse_unit() {
            Ok(unit) => unit,
            Err(err) => {
                let err = match &self.config.source_name {
                    Some(name) => err.with_source_name(name.clone()),
                    None => err,
                };
                self.reporter.report(err.diagnostic());
                return Err(err);
            }
        };

        let resolved = Resolver::new(self.config.clone()).resolve(&unit);
        tracing::debug!(domains = resolved.len(), "compiled unit");
        Ok(resolved)
    }
}
