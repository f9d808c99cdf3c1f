//! Domain model for license tokens and their device binding.
//!
//! A token moves through exactly two binding states: `Unbound` and
//! `Bound(device_id)`. The first successful claim binds it; afterwards every
//! claim either confirms the same device or is rejected.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Device descriptor a token is (or will be) bound to.
///
/// Only `device_id` takes part in ownership checks; name and type are
/// descriptive metadata recorded alongside the binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
}

impl Device {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: None,
            device_type: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    pub fn with_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }
}

/// A registered license token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub id: String,
    pub registered_at: NaiveDateTime,
    pub active: bool,
    /// `None` while the token is unbound.
    pub device: Option<Device>,
    /// When the current binding was made.
    pub bound_at: Option<NaiveDateTime>,
}

impl Token {
    pub fn is_bound(&self) -> bool {
        self.device.is_some()
    }

    pub fn bound_device_id(&self) -> Option<&str> {
        self.device.as_ref().map(|d| d.device_id.as_str())
    }

    /// The caller-visible part of a token returned by a successful validation.
    pub fn summary(&self) -> TokenSummary {
        TokenSummary {
            id: self.id.clone(),
            registered_at: self.registered_at,
            active: self.active,
        }
    }
}

/// Payload of a successful validation.
///
/// Field names on the wire match the column names of the token table so
/// existing clients keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSummary {
    #[serde(rename = "token_number")]
    pub id: String,
    #[serde(rename = "register_date")]
    pub registered_at: NaiveDateTime,
    #[serde(rename = "status_active")]
    pub active: bool,
}

/// Outcome of validating a token.
///
/// Unknown and inactive tokens both yield `NotFound` so callers cannot probe
/// which identifiers exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid(TokenSummary),
    NotFound,
}

/// Outcome of the store's conditional bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// The binding was absent and is now set to the requested device.
    Bound,
    /// Already bound to the requested device id; nothing written.
    AlreadyBoundSame,
    /// Already bound to another device id; nothing written.
    AlreadyBoundDifferent,
    NotFound,
}

/// Outcome of a claim-or-verify request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimResult {
    /// First claim: the token is now bound to the requesting device.
    Registered,
    /// The requesting device already owns the token.
    Verified,
    /// The token belongs to a different device.
    Rejected,
    TokenNotFound,
}

impl From<BindOutcome> for ClaimResult {
    fn from(outcome: BindOutcome) -> Self {
        match outcome {
            BindOutcome::Bound => ClaimResult::Registered,
            BindOutcome::AlreadyBoundSame => ClaimResult::Verified,
            BindOutcome::AlreadyBoundDifferent => ClaimResult::Rejected,
            BindOutcome::NotFound => ClaimResult::TokenNotFound,
        }
    }
}

impl ClaimResult {
    pub fn is_success(self) -> bool {
        matches!(self, ClaimResult::Registered | ClaimResult::Verified)
    }
}
