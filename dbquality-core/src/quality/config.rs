//! Quality check configuration.
//!
//! This module provides configuration for a quality-check run: which stages
//! execute, how outliers are detected, and the thresholds that turn results
//! into a pass or fail.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::outliers::{DEFAULT_IQR_FACTOR, OutlierMethod};

/// Distinct-value count below which a non-numeric column is categorical.
pub const DEFAULT_CATEGORICAL_LIMIT: usize = 20;

/// Success rate a validation run must reach to pass.
pub const DEFAULT_PASS_THRESHOLD: f64 = 0.9;

/// Numeric columns with at most this many distinct values are skipped by the
/// outlier stage.
pub const DEFAULT_BINARY_DISTINCT_MAX: usize = 2;

/// Stages of a quality-check run.
///
/// Selecting no stage at all means every stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageSelection {
    /// HTML profile report
    pub profile: bool,
    /// Outlier detection on numeric columns
    pub outliers: bool,
    /// Expectation inference and validation
    pub validate: bool,
}

impl StageSelection {
    /// Every stage enabled.
    pub fn all() -> Self {
        Self {
            profile: true,
            outliers: true,
            validate: true,
        }
    }

    /// Returns true when no stage was explicitly selected.
    pub fn is_empty(&self) -> bool {
        !(self.profile || self.outliers || self.validate)
    }

    /// Resolves the "none selected means all" rule.
    pub fn resolve(self) -> Self {
        if self.is_empty() { Self::all() } else { self }
    }
}

/// Expectation inference settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Columns with fewer distinct values get a set-membership rule
    pub categorical_limit: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            categorical_limit: DEFAULT_CATEGORICAL_LIMIT,
        }
    }
}

impl InferenceConfig {
    /// Builder method to set the categorical cardinality limit.
    pub fn with_categorical_limit(mut self, limit: usize) -> Self {
        self.categorical_limit = limit;
        self
    }
}

/// Quality-check run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityCheckConfig {
    /// Stages requested by the caller (unresolved)
    pub stages: StageSelection,
    /// Maximum rows loaded per table
    pub row_limit: Option<u32>,
    /// Outlier detection method for the outlier stage
    pub outlier_method: OutlierMethod,
    /// Explicit outlier factor; IQR falls back to 1.5
    pub outlier_factor: Option<f64>,
    /// Distinct-value ceiling for skipping binary numeric columns
    pub binary_distinct_max: usize,
    /// Minimum success rate for a passing validation (0.0-1.0)
    pub pass_threshold: f64,
    /// Expectation inference settings
    pub inference: InferenceConfig,
}

/// Validation errors for quality-check configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    /// Pass threshold outside `[0, 1]`
    #[error("pass_threshold must be between 0.0 and 1.0, got {0}")]
    InvalidPassThreshold(f64),
    /// Negative or non-finite outlier factor
    #[error("outlier factor must be a finite, non-negative number, got {0}")]
    InvalidFactor(f64),
    /// Z-score selected without a threshold
    #[error("the zscore method requires an explicit factor")]
    MissingZScoreFactor,
    /// Categorical limit of zero
    #[error("categorical_limit must be at least 1")]
    InvalidCategoricalLimit,
    /// Row limit of zero
    #[error("row limit must be at least 1")]
    InvalidRowLimit,
}

impl Default for QualityCheckConfig {
    fn default() -> Self {
        Self {
            stages: StageSelection::default(),
            row_limit: None,
            outlier_method: OutlierMethod::Iqr,
            outlier_factor: None,
            binary_distinct_max: DEFAULT_BINARY_DISTINCT_MAX,
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            inference: InferenceConfig::default(),
        }
    }
}

impl QualityCheckConfig {
    /// Creates a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to select stages.
    pub fn with_stages(mut self, stages: StageSelection) -> Self {
        self.stages = stages;
        self
    }

    /// Builder method to cap rows loaded per table.
    pub fn with_row_limit(mut self, limit: Option<u32>) -> Self {
        self.row_limit = limit;
        self
    }

    /// Builder method to set the outlier method and optional factor.
    pub fn with_outlier_method(mut self, method: OutlierMethod, factor: Option<f64>) -> Self {
        self.outlier_method = method;
        self.outlier_factor = factor;
        self
    }

    /// Builder method to set the binary column ceiling.
    pub fn with_binary_distinct_max(mut self, max: usize) -> Self {
        self.binary_distinct_max = max;
        self
    }

    /// Builder method to set the pass threshold.
    pub fn with_pass_threshold(mut self, threshold: f64) -> Self {
        if !(0.0..=1.0).contains(&threshold) {
            tracing::warn!(
                "pass_threshold {} clamped to valid range [0.0, 1.0]",
                threshold
            );
        }
        self.pass_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Builder method to set inference settings.
    pub fn with_inference(mut self, inference: InferenceConfig) -> Self {
        self.inference = inference;
        self
    }

    /// Stages that will actually run.
    pub fn effective_stages(&self) -> StageSelection {
        self.stages.resolve()
    }

    /// Factor used by the outlier stage.
    pub fn effective_factor(&self) -> Result<f64, ConfigValidationError> {
        match (self.outlier_method, self.outlier_factor) {
            (_, Some(factor)) => Ok(factor),
            (OutlierMethod::Iqr, None) => Ok(DEFAULT_IQR_FACTOR),
            (OutlierMethod::ZScore, None) => Err(ConfigValidationError::MissingZScoreFactor),
        }
    }

    /// Validates the configuration.
    ///
    /// Returns an error if a threshold is out of range or the outlier
    /// settings are incomplete.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.pass_threshold) {
            return Err(ConfigValidationError::InvalidPassThreshold(
                self.pass_threshold,
            ));
        }
        let factor = self.effective_factor()?;
        if !factor.is_finite() || factor < 0.0 {
            return Err(ConfigValidationError::InvalidFactor(factor));
        }
        if self.inference.categorical_limit == 0 {
            return Err(ConfigValidationError::InvalidCategoricalLimit);
        }
        if self.row_limit == Some(0) {
            return Err(ConfigValidationError::InvalidRowLimit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_selection_resolve() {
        assert_eq!(StageSelection::default().resolve(), StageSelection::all());

        let only_profile = StageSelection {
            profile: true,
            ..Default::default()
        };
        assert_eq!(only_profile.resolve(), only_profile);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = QualityCheckConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.effective_factor(), Ok(1.5));
        assert_eq!(config.pass_threshold, 0.9);
        assert_eq!(config.inference.categorical_limit, 20);
        assert_eq!(config.effective_stages(), StageSelection::all());
    }

    #[test]
    fn test_zscore_requires_factor() {
        let config = QualityCheckConfig::new().with_outlier_method(OutlierMethod::ZScore, None);
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::MissingZScoreFactor)
        );

        let config =
            QualityCheckConfig::new().with_outlier_method(OutlierMethod::ZScore, Some(3.0));
        assert!(config.validate().is_ok());
        assert_eq!(config.effective_factor(), Ok(3.0));
    }

    #[test]
    fn test_invalid_factor_rejected() {
        for factor in [f64::NAN, f64::INFINITY, -1.0] {
            let config =
                QualityCheckConfig::new().with_outlier_method(OutlierMethod::Iqr, Some(factor));
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigValidationError::InvalidFactor(_))
                ),
                "factor {} should be rejected",
                factor
            );
        }
    }

    #[test]
    fn test_pass_threshold_clamped() {
        let config = QualityCheckConfig::new().with_pass_threshold(1.5);
        assert_eq!(config.pass_threshold, 1.0);

        // Direct field assignment bypasses clamping and is caught by validate
        let mut config = QualityCheckConfig::new();
        config.pass_threshold = -0.1;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvalidPassThreshold(-0.1))
        );
    }

    #[test]
    fn test_zero_limits_rejected() {
        let config = QualityCheckConfig::new()
            .with_inference(InferenceConfig::default().with_categorical_limit(0));
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvalidCategoricalLimit)
        );

        let config = QualityCheckConfig::new().with_row_limit(Some(0));
        assert_eq!(config.validate(), Err(ConfigValidationError::InvalidRowLimit));
    }
}
