/// Directive name used for the target of a `source => target` rule.
pub const DEFAULT_PASSTHROUGH_DIRECTIVE: &str = "proxy_pass";

/// Options for one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Shown in diagnostics, usually the file path.
    pub source_name: Option<String>,
    /// Variable key that receives a base rule's target.
    pub passthrough_directive: String,
}

impl CompilerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            source_name: None,
            passthrough_directive: DEFAULT_PASSTHROUGH_DIRECTIVE.to_string(),
        }
    }

    /// Set the name shown in diagnostics.
    #[must_use]
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Set the directive base rules expand into.
    #[must_use]
    pub fn with_passthrough_directive(mut self, directive: impl Into<String>) -> Self {
        self.passthrough_directive = directive.into();
        self
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::new()
    }
}
