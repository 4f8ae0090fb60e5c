//! Verified user claims.
//!
//! `UserClaims` is the user record derived from a verified provider token.
//! It exists only for the lifetime of a session; there is no user database
//! behind it.

use serde::{Deserialize, Serialize};

/// Claims extracted from a verified access token.
///
/// Only `subject` is guaranteed; every other claim is provider-optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    /// The subject claim — the provider's unique identifier for the user.
    pub subject: String,
    /// Display name, if asserted.
    pub name: Option<String>,
    /// Email address, if asserted.
    pub email: Option<String>,
    /// Given (first) name, if asserted.
    pub given_name: Option<String>,
    /// Family (last) name, if asserted.
    pub family_name: Option<String>,
    /// Role names asserted by the provider.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Department, if asserted.
    pub department: Option<String>,
    /// Organization, if asserted.
    pub organization: Option<String>,
}

impl UserClaims {
    /// Creates claims with only the required subject set.
    #[must_use]
    pub fn new(subject: String) -> Self {
        Self {
            subject,
            name: None,
            email: None,
            given_name: None,
            family_name: None,
            roles: Vec::new(),
            department: None,
            organization: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    /// Sets the given name.
    #[must_use]
    pub fn with_given_name(mut self, given_name: Option<String>) -> Self {
        self.given_name = given_name;
        self
    }

    /// Sets the family name.
    #[must_use]
    pub fn with_family_name(mut self, family_name: Option<String>) -> Self {
        self.family_name = family_name;
        self
    }

    /// Sets the role list.
    #[must_use]
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// Sets the department.
    #[must_use]
    pub fn with_department(mut self, department: Option<String>) -> Self {
        self.department = department;
        self
    }

    /// Sets the organization.
    #[must_use]
    pub fn with_organization(mut self, organization: Option<String>) -> Self {
        self.organization = organization;
        self
    }

    /// Returns true if the user carries the given role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_claims_have_only_subject() {
        let claims = UserClaims::new("sub_123".to_string());

        assert_eq!(claims.subject, "sub_123");
        assert!(claims.name.is_none());
        assert!(claims.email.is_none());
        assert!(claims.roles.is_empty());
    }

    #[test]
    fn builder_sets_optional_fields() {
        let claims = UserClaims::new("sub_123".to_string())
            .with_name(Some("Alice Example".to_string()))
            .with_email(Some("alice@example.com".to_string()))
            .with_given_name(Some("Alice".to_string()))
            .with_family_name(Some("Example".to_string()))
            .with_roles(vec!["reader".to_string(), "editor".to_string()])
            .with_department(Some("Engineering".to_string()))
            .with_organization(Some("Example Corp".to_string()));

        assert_eq!(claims.name.as_deref(), Some("Alice Example"));
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
        assert_eq!(claims.given_name.as_deref(), Some("Alice"));
        assert_eq!(claims.family_name.as_deref(), Some("Example"));
        assert!(claims.has_role("reader"));
        assert!(claims.has_role("editor"));
        assert!(!claims.has_role("admin"));
        assert_eq!(claims.department.as_deref(), Some("Engineering"));
        assert_eq!(claims.organization.as_deref(), Some("Example Corp"));
    }

    #[test]
    fn claims_serialization_roundtrip() {
        let claims = UserClaims::new("sub_456".to_string())
            .with_email(Some("bob@example.com".to_string()))
            .with_roles(vec!["auditor".to_string()]);

        let json = serde_json::to_string(&claims).expect("serialize");
        let parsed: UserClaims = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(claims, parsed);
    }

    #[test]
    fn claims_deserialize_without_roles() {
        let json = r#"{"subject": "sub_789"}"#;
        let claims: UserClaims = serde_json::from_str(json).expect("deserialize");
        assert_eq!(claims.subject, "sub_789");
        assert!(claims.roles.is_empty());
    }
}
