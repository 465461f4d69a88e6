//! Sign-in email addresses.

use serde::{Deserialize, Serialize};

/// Why an address was refused before reaching the identity service.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email is required")]
    Empty,
    #[error("email is longer than {max} characters")]
    TooLong { max: usize },
    /// Not `local@domain` with exactly one `@`, or contains whitespace.
    #[error("not an email address: {0}")]
    Malformed(String),
}

/// An email address as the identity service stores it: trimmed and
/// lower-cased.
///
/// Sign-in and sign-up both normalize through [`Email::parse`], so an account
/// created as `Ventas@Bluefitt.cl` signs in as ` ventas@bluefitt.cl `.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Longest address accepted (RFC 5321 path limit).
    pub const MAX_LENGTH: usize = 254;

    /// Normalize and check a form value.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError`] for blank, overlong or malformed input.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let address = input.trim().to_lowercase();
        if address.is_empty() {
            return Err(EmailError::Empty);
        }
        if address.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let well_formed = address.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        }) && !address.chars().any(char::is_whitespace);
        if !well_formed {
            return Err(EmailError::Malformed(address));
        }

        Ok(Self(address))
    }

    /// The normalized address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_address_is_trimmed_and_lowercased() {
        let email = Email::parse("  Ventas@Bluefitt.CL\n").unwrap();
        assert_eq!(email.as_str(), "ventas@bluefitt.cl");
        assert_eq!(email, Email::parse("ventas@bluefitt.cl").unwrap());
    }

    #[test]
    fn test_distributor_addresses_accepted() {
        for input in [
            "riego.sur+pedidos@agricola-maule.cl",
            "compras@bluefitt.com.pe",
            "j@b.cl",
        ] {
            assert_eq!(Email::parse(input).unwrap().into_inner(), input);
        }
    }

    #[test]
    fn test_blank_form_value() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
    }

    #[test]
    fn test_overlong_address() {
        let long = format!("{}@bluefitt.cl", "a".repeat(250));
        assert_eq!(
            Email::parse(&long),
            Err(EmailError::TooLong { max: Email::MAX_LENGTH })
        );
    }

    #[test]
    fn test_malformed_addresses() {
        for input in [
            "ventas.bluefitt.cl",
            "@bluefitt.cl",
            "ventas@",
            "ventas@@bluefitt.cl",
            "ventas@blue fitt.cl",
        ] {
            assert!(
                matches!(Email::parse(input), Err(EmailError::Malformed(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let email = Email::parse("Jefa@Bluefitt.cl").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"jefa@bluefitt.cl\"");
    }
}
