//! Core claims-based identity types.
//!
//! An identity is an ordered list of typed claims plus an authentication type
//! label. The label records which mechanism produced the identity and is not a
//! claim itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value type attached to every string claim.
pub const XML_SCHEMA_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// The claim types produced by the identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    NameIdentifier,
    /// Display name of the subject. This is the default name claim.
    Name,
    Email,
    GivenName,
    Surname,
}

impl ClaimType {
    /// The well-known claim type URI.
    pub fn uri(&self) -> &'static str {
        match self {
            ClaimType::NameIdentifier => {
                "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier"
            }
            ClaimType::Name => "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name",
            ClaimType::Email => "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress",
            ClaimType::GivenName => {
                "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/givenname"
            }
            ClaimType::Surname => "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/surname",
        }
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_type: ClaimType,
    pub value: String,
    pub value_type: String,
    pub issuer: String,
}

impl Claim {
    /// Create a string-valued claim issued by `issuer`.
    pub fn new(claim_type: ClaimType, value: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            claim_type,
            value: value.into(),
            value_type: XML_SCHEMA_STRING.to_string(),
            issuer: issuer.into(),
        }
    }
}

/// An identity made of claims, labelled with the authentication type that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsIdentity {
    authentication_type: String,
    claims: Vec<Claim>,
}

impl ClaimsIdentity {
    pub fn new(authentication_type: impl Into<String>) -> Self {
        Self {
            authentication_type: authentication_type.into(),
            claims: Vec::new(),
        }
    }

    pub fn authentication_type(&self) -> &str {
        &self.authentication_type
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    pub fn add_claim(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    /// Remove every claim of the given type, returning how many were removed.
    pub fn remove_claims(&mut self, claim_type: ClaimType) -> usize {
        let before = self.claims.len();
        self.claims.retain(|claim| claim.claim_type != claim_type);
        before - self.claims.len()
    }

    pub fn find_first(&self, claim_type: ClaimType) -> Option<&Claim> {
        self.claims
            .iter()
            .find(|claim| claim.claim_type == claim_type)
    }

    /// Value of the first claim of the given type.
    pub fn value_of(&self, claim_type: ClaimType) -> Option<&str> {
        self.find_first(claim_type).map(|claim| claim.value.as_str())
    }

    /// The display name, read from the default name claim.
    pub fn name(&self) -> Option<&str> {
        self.value_of(ClaimType::Name)
    }

    /// Rebuild the identity under another authentication type, keeping the
    /// claims in order.
    pub fn relabel(self, authentication_type: impl Into<String>) -> Self {
        Self {
            authentication_type: authentication_type.into(),
            claims: self.claims,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}
