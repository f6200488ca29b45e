//! Order validation strategies.
//!
//! The ingestion pipeline only depends on [`OrderValidator`], so a different
//! rule set can be swapped in without touching pipeline code. Plain closures
//! qualify as validators as well.

use thiserror::Error;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::models::Order;

/// Every constraint an order violated, as `field.path: message` strings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .violations.join("; "))]
pub struct OrderValidationError {
    violations: Vec<String>,
}

impl OrderValidationError {
    pub fn new(mut violations: Vec<String>) -> Self {
        violations.sort();
        Self { violations }
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }
}

impl From<ValidationErrors> for OrderValidationError {
    fn from(errors: ValidationErrors) -> Self {
        let mut violations = Vec::new();
        collect_violations("", &errors, &mut violations);
        Self::new(violations)
    }
}

fn collect_violations(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let reason = error.message.as_deref().unwrap_or(&*error.code);
                    out.push(format!("{}: {}", path, reason));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_violations(&path, nested, out),
            ValidationErrorsKind::List(entries) => {
                for (index, nested) in entries {
                    collect_violations(&format!("{}[{}]", path, index), nested, out);
                }
            }
        }
    }
}

/// Business rules applied to a decoded order before it is persisted
pub trait OrderValidator: Send + Sync {
    fn validate(&self, order: &Order) -> Result<(), OrderValidationError>;
}

impl<F> OrderValidator for F
where
    F: Fn(&Order) -> Result<(), OrderValidationError> + Send + Sync,
{
    fn validate(&self, order: &Order) -> Result<(), OrderValidationError> {
        self(order)
    }
}

/// Default rule set, driven by the `#[validate]` attributes on the order model
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleValidator;

impl OrderValidator for RuleValidator {
    fn validate(&self, order: &Order) -> Result<(), OrderValidationError> {
        Validate::validate(order).map_err(OrderValidationError::from)
    }
}
