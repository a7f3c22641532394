use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors surfaced by the engine's public operations. Failures are scoped to
/// one member/operation; callers never abort other members' events over
/// them.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for EngineError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    let message = e
                        .message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_default();
                    format!("{}: {}", field, message)
                })
            })
            .collect();

        EngineError::Validation(details.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(range(min = 1, message = "must be positive"))]
        value: i32,
    }

    #[test]
    fn test_validation_errors_are_flattened() {
        let probe = Probe { value: 0 };
        let error: EngineError = probe.validate().unwrap_err().into();
        match error {
            EngineError::Validation(message) => {
                assert!(message.contains("value"));
                assert!(message.contains("must be positive"));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_not_found_display() {
        let error = EngineError::NotFound("member 42".to_string());
        assert_eq!(format!("{}", error), "Not found: member 42");
    }
}
