//! Which pattern engine the detector looks for.

/// Names that identify the pattern engine in analyzed code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Metadata name of the engine type, e.g. `System.Text.RegularExpressions.Regex`.
    pub engine_type: String,
    /// Simple name of the options flag type.
    pub options_type: String,
    /// Name the pattern parameter must have, compared ordinally.
    pub pattern_parameter: String,
    /// Language word of directive comments (`language=<word>`).
    pub language: String,
}

impl EngineConfig {
    /// The engine type's simple name: the last `.` or `+` separated segment.
    pub fn engine_simple_name(&self) -> &str {
        self.engine_type
            .rsplit(['.', '+'])
            .next()
            .unwrap_or(&self.engine_type)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_type: "System.Text.RegularExpressions.Regex".to_string(),
            options_type: "RegexOptions".to_string(),
            pattern_parameter: "pattern".to_string(),
            language: "pattern".to_string(),
        }
    }
}
