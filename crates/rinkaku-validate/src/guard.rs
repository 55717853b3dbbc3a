//! Realtime validation guard — run the validator after data operations.

use std::sync::atomic::{AtomicBool, Ordering};

use rinkaku_project::{DocumentProvider, ProjectManager};

use crate::legacy::LegacyProject;
use crate::validator::{DataValidator, ProjectValidationResult, ValidationOptions};
use crate::ValidateError;

/// Guard behavior. Log-only by default; strict mode turns the first
/// detected divergence into an error, which is what test and CI harnesses
/// want.
#[derive(Clone, Copy, Debug)]
pub struct GuardConfig {
    pub enabled: bool,
    pub strict: bool,
    pub log_details: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strict: false,
            log_details: true,
        }
    }
}

impl GuardConfig {
    /// Strict configuration for harnesses verifying migration correctness.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Default::default()
        }
    }

    /// Disabled configuration.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Runs the cross-representation validator after data operations.
///
/// Constructor-injected wherever it is needed; the re-entrancy flag only
/// prevents a validation pass from triggering another one through its own
/// page connections.
pub struct ValidationGuard {
    config: GuardConfig,
    validating: AtomicBool,
}

impl ValidationGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            validating: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Validate after `operation`. Returns the result for inspection, or
    /// `None` when disabled or already mid-validation. In strict mode a
    /// divergence comes back as [`ValidateError::Mismatch`].
    pub async fn validate_after_operation<P: DocumentProvider>(
        &self,
        operation: &str,
        legacy: &LegacyProject,
        manager: &ProjectManager<P>,
    ) -> Result<Option<ProjectValidationResult>, ValidateError> {
        if !self.config.enabled {
            return Ok(None);
        }
        if self.validating.swap(true, Ordering::SeqCst) {
            tracing::debug!(operation, "validation already in progress, skipping");
            return Ok(None);
        }

        let result =
            DataValidator::validate_project(legacy, manager, &ValidationOptions::default()).await;
        self.validating.store(false, Ordering::SeqCst);

        if self.config.log_details {
            DataValidator::log_validation_result(&result);
        }

        if result.is_valid {
            tracing::debug!(operation, "data consistency verified");
            return Ok(Some(result));
        }

        tracing::warn!(
            operation,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "data divergence detected"
        );
        if self.config.strict {
            return Err(ValidateError::Mismatch {
                operation: operation.to_string(),
                details: result.errors.join("; "),
            });
        }
        Ok(Some(result))
    }
}
