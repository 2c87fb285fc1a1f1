/// Resource limits enforced while parsing source text
///
/// Both limits guard against pathological input rather than legitimate use;
/// the defaults are far above anything a rules file needs.
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    /// Maximum size of a source string in bytes
    pub max_source_bytes: usize,
    /// Maximum parenthesis nesting depth of a source string
    pub max_expression_depth: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_source_bytes: 4 * 1024 * 1024,
            max_expression_depth: 64,
        }
    }
}
