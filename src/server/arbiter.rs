//! Binding arbiter: token validation and the claim-or-verify protocol.
//!
//! The arbiter owns every decision about a token's device binding and is the
//! only caller of [`Database::bind_device`]. It keeps no mutable state of its
//! own; concurrent requests only meet in the store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::errors::{TokenError, TokenResult};
use crate::server::database::Database;
use crate::server::logging::{log_binding_event, log_token_event, TokenEvent};
use crate::server::validation::{
    matches_token_format, validate_device_id, validate_not_empty, validate_optional_length,
    MAX_DEVICE_FIELD_LEN,
};
use crate::token::{ClaimResult, Device, ValidationResult};

/// Decides validation and claim requests against an explicitly supplied store.
#[derive(Debug, Clone)]
pub struct BindingArbiter {
    db: Arc<Database>,
    operation_timeout: Duration,
}

impl BindingArbiter {
    pub fn new(db: Arc<Database>, operation_timeout: Duration) -> Self {
        Self {
            db,
            operation_timeout,
        }
    }

    /// Check that a token exists and is active.
    ///
    /// Unknown and inactive tokens both produce [`ValidationResult::NotFound`].
    pub async fn validate(&self, token_id: &str) -> TokenResult<ValidationResult> {
        validate_not_empty(token_id, "token")?;
        note_unusual_format(token_id);

        let token = self.bounded(self.db.get_token(token_id)).await?;

        let result = match token {
            Some(token) if token.active => {
                log_token_event(TokenEvent::Validated, token_id, None);
                ValidationResult::Valid(token.summary())
            }
            Some(_) => {
                log_token_event(TokenEvent::ValidationFailed, token_id, Some("inactive"));
                ValidationResult::NotFound
            }
            None => {
                log_token_event(TokenEvent::ValidationFailed, token_id, Some("unknown"));
                ValidationResult::NotFound
            }
        };

        Ok(result)
    }

    /// Bind `device` to an unbound token, or check it against the existing binding.
    ///
    /// # Behavior
    /// - Unknown token: `TokenNotFound`
    /// - Unbound token: bound to `device`, `Registered`
    /// - Bound to the same device id: `Verified`, nothing written
    /// - Bound to another device id: `Rejected`, nothing written
    ///
    /// The decision is made by a single conditional write in the store, so
    /// racing claims for one unbound token produce exactly one `Registered`.
    pub async fn claim_or_verify(&self, token_id: &str, device: &Device) -> TokenResult<ClaimResult> {
        validate_not_empty(token_id, "token")?;
        validate_device_id(&device.device_id, "deviceId")?;
        validate_optional_length(
            device.device_name.as_deref(),
            MAX_DEVICE_FIELD_LEN,
            "deviceName",
        )?;
        validate_optional_length(
            device.device_type.as_deref(),
            MAX_DEVICE_FIELD_LEN,
            "deviceType",
        )?;
        note_unusual_format(token_id);

        let outcome = self.bounded(self.db.bind_device(token_id, device)).await?;
        let result = ClaimResult::from(outcome);

        let event = match result {
            ClaimResult::Registered => TokenEvent::Registered,
            ClaimResult::Verified => TokenEvent::Verified,
            ClaimResult::Rejected => TokenEvent::Rejected,
            ClaimResult::TokenNotFound => TokenEvent::ClaimFailed,
        };
        log_binding_event(
            event,
            token_id,
            &device.device_id,
            device.device_name.as_deref(),
        );

        Ok(result)
    }

    /// Run a store operation under the per-operation timeout. No retry.
    async fn bounded<T, F>(&self, operation: F) -> TokenResult<T>
    where
        F: Future<Output = TokenResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, operation).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Store operation exceeded {}ms",
                    self.operation_timeout.as_millis()
                );
                Err(TokenError::Timeout(self.operation_timeout))
            }
        }
    }
}

fn note_unusual_format(token_id: &str) {
    if !matches_token_format(token_id) {
        debug!(token_id = %token_id, "Token id does not match NNNN-NNNN-NNNN-NNNN");
    }
}
