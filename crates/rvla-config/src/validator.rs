//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_agent(config, &mut result);
        Self::validate_context(config, &mut result);
        Self::validate_visual(config, &mut result);
        Self::validate_history(config, &mut result);
        Self::validate_workspace(config, &mut result);
        Self::validate_oracle(config, &mut result);

        Ok(result)
    }

    /// Validate and convert the first error into a `ConfigError`.
    pub fn ensure_valid(config: &Config) -> Result<ValidationResult, ConfigError> {
        let result = Self::validate(config)?;
        if let Some(first) = result.errors.first() {
            return Err(ConfigError::InvalidValue {
                field: first.path.clone(),
                message: first.message.clone(),
            });
        }
        Ok(result)
    }

    fn validate_agent(config: &Config, result: &mut ValidationResult) {
        if config.agent.max_iterations == 0 {
            result.add_error(ValidationError::new(
                "agent.max_iterations",
                "max_iterations must be greater than 0",
            ));
        }

        if config.agent.max_iterations > 1000 {
            result.add_warning(ValidationWarning::new(
                "agent.max_iterations",
                "max_iterations is very high (>1000), this may lead to long-running agents",
            ));
        }

        if config.agent.max_depth > 20 {
            result.add_warning(ValidationWarning::new(
                "agent.max_depth",
                "max_depth is very high (>20), nested subcalls multiply oracle calls",
            ));
        }

        if config.agent.subcall_step_budget == 0 {
            result.add_error(ValidationError::new(
                "agent.subcall_step_budget",
                "subcall_step_budget must be greater than 0",
            ));
        }
    }

    fn validate_context(config: &Config, result: &mut ValidationResult) {
        let context = &config.context;

        if context.chunk_size == 0 {
            result.add_error(ValidationError::new(
                "context.chunk_size",
                "chunk_size must be greater than 0",
            ));
        }

        if context.overlap >= context.chunk_size {
            result.add_error(ValidationError::new(
                "context.overlap",
                format!(
                    "overlap ({}) must be smaller than chunk_size ({})",
                    context.overlap, context.chunk_size
                ),
            ));
        }

        if context.top_k == 0 {
            result.add_error(ValidationError::new(
                "context.top_k",
                "top_k must be greater than 0",
            ));
        }

        if context.recent_window == 0 {
            result.add_warning(ValidationWarning::new(
                "context.recent_window",
                "recent_window is 0, examined history will carry no raw events",
            ));
        }
    }

    fn validate_visual(config: &Config, result: &mut ValidationResult) {
        let visual = &config.visual;

        if visual.grid_rows == 0 || visual.grid_cols == 0 {
            result.add_error(ValidationError::new(
                "visual.grid",
                "grid_rows and grid_cols must be greater than 0",
            ));
        }

        if visual.top_k == 0 {
            result.add_error(ValidationError::new(
                "visual.top_k",
                "top_k must be greater than 0",
            ));
        }
    }

    fn validate_history(config: &Config, result: &mut ValidationResult) {
        let recursion = &config.recursion;
        if recursion.keep_recent >= recursion.compression_threshold {
            result.add_error(ValidationError::new(
                "recursion.keep_recent",
                "keep_recent must be smaller than compression_threshold",
            ));
        }

        let compaction = &config.compaction;
        if compaction.enabled && compaction.keep_recent >= compaction.threshold {
            result.add_error(ValidationError::new(
                "compaction.keep_recent",
                "keep_recent must be smaller than threshold",
            ));
        }
    }

    fn validate_workspace(config: &Config, result: &mut ValidationResult) {
        let valid_backends = ["memory", "sqlite"];
        if !valid_backends.contains(&config.workspace.backend.as_str()) {
            result.add_error(ValidationError::new(
                "workspace.backend",
                format!(
                    "Unknown workspace backend '{}', valid values: {:?}",
                    config.workspace.backend, valid_backends
                ),
            ));
        }

        if config.workspace.namespace.is_empty() {
            result.add_error(ValidationError::new(
                "workspace.namespace",
                "namespace cannot be empty",
            ));
        }
    }

    fn validate_oracle(config: &Config, result: &mut ValidationResult) {
        let oracle = &config.oracle;

        if oracle.api_key.is_none() {
            result.add_warning(ValidationWarning::new(
                "oracle.api_key",
                "API key is not set, may need to be set via environment variable",
            ));
        }

        if !oracle.base_url.starts_with("http://") && !oracle.base_url.starts_with("https://") {
            result.add_error(ValidationError::new(
                "oracle.base_url",
                "base_url must start with http:// or https://",
            ));
        }

        if !(0.0..=2.0).contains(&oracle.temperature) {
            result.add_warning(ValidationWarning::new(
                "oracle.temperature",
                "temperature outside 0.0..=2.0 will likely be rejected by the API",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
