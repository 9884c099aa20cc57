//! Password schemes for file authorization
//!
//! A [`PasswordScheme`] turns the password supplied at upload into a [`Credential`]
//! and later checks a candidate password against it. One scheme is active per
//! deployment; verification dispatches on the stored credential so records sealed
//! under an earlier scheme keep working after a switch.
//!
//! The salted scheme hashes `salt + "$" + password` with Argon2id. Salts come from
//! the operating system CSPRNG.

use crate::models::Credential;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Errors raised while sealing a password.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Failed to hash password: {0}")]
    Hashing(String),
}

/// Capability for producing and checking authorization material.
pub trait PasswordScheme: Send + Sync {
    /// Short identifier used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Derive fresh authorization material for `password`.
    fn seal(&self, password: &str) -> Result<Credential, CredentialError>;

    /// Check `candidate` against stored material. Pure: no state is touched.
    fn verify(&self, credential: &Credential, candidate: &str) -> bool {
        verify_credential(credential, candidate)
    }
}

/// Check `candidate` against `credential`, whichever scheme produced it.
pub fn verify_credential(credential: &Credential, candidate: &str) -> bool {
    match credential {
        Credential::Plaintext { password } => secure_compare(password, candidate),
        Credential::SaltedHash { salt, hash } => {
            let parsed = match PasswordHash::new(hash) {
                Ok(parsed) => parsed,
                Err(_) => return false,
            };
            Argon2::default()
                .verify_password(salted(salt, candidate).as_bytes(), &parsed)
                .is_ok()
        }
    }
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn salted(salt: &str, password: &str) -> String {
    format!("{}${}", salt, password)
}

/// Stores the password verbatim. Only for compatibility with old deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextScheme;

impl PasswordScheme for PlaintextScheme {
    fn name(&self) -> &'static str {
        "plaintext"
    }

    fn seal(&self, password: &str) -> Result<Credential, CredentialError> {
        Ok(Credential::Plaintext {
            password: password.to_string(),
        })
    }
}

/// Salted Argon2id hashing. The default scheme.
#[derive(Clone, Default)]
pub struct Argon2Scheme {
    argon2: Argon2<'static>,
}

impl Argon2Scheme {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordScheme for Argon2Scheme {
    fn name(&self) -> &'static str {
        "argon2"
    }

    fn seal(&self, password: &str) -> Result<Credential, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(salted(salt.as_str(), password).as_bytes(), &salt)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?
            .to_string();

        Ok(Credential::SaltedHash {
            salt: salt.as_str().to_string(),
            hash,
        })
    }
}

/// Scheme selection, parsed from `PASSWORD_SCHEME`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemeKind {
    Plaintext,
    #[default]
    Argon2,
}

impl SchemeKind {
    pub fn build(self) -> Arc<dyn PasswordScheme> {
        match self {
            SchemeKind::Plaintext => Arc::new(PlaintextScheme),
            SchemeKind::Argon2 => Arc::new(Argon2Scheme::new()),
        }
    }
}

impl FromStr for SchemeKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plaintext" => Ok(SchemeKind::Plaintext),
            "argon2" => Ok(SchemeKind::Argon2),
            _ => Err(anyhow::anyhow!("Invalid password scheme: {}", s)),
        }
    }
}

impl Display for SchemeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SchemeKind::Plaintext => write!(f, "plaintext"),
            SchemeKind::Argon2 => write!(f, "argon2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argon2_seal_and_verify() {
        let scheme = Argon2Scheme::new();
        let credential = scheme.seal("pass").unwrap();

        assert!(matches!(credential, Credential::SaltedHash { .. }));
        assert!(scheme.verify(&credential, "pass"));
        assert!(!scheme.verify(&credential, "pa"));
        assert!(!scheme.verify(&credential, "pass "));
    }

    #[test]
    fn test_argon2_empty_password_is_verifiable() {
        let scheme = Argon2Scheme::new();
        let credential = scheme.seal("").unwrap();

        assert!(scheme.verify(&credential, ""));
        assert!(!scheme.verify(&credential, "x"));
    }

    #[test]
    fn test_argon2_uses_fresh_salt_per_seal() {
        let scheme = Argon2Scheme::new();
        let first = scheme.seal("same").unwrap();
        let second = scheme.seal("same").unwrap();

        match (&first, &second) {
            (
                Credential::SaltedHash { salt: s1, hash: h1 },
                Credential::SaltedHash { salt: s2, hash: h2 },
            ) => {
                assert_ne!(s1, s2);
                assert_ne!(h1, h2);
            }
            _ => panic!("expected salted credentials"),
        }
    }

    #[test]
    fn test_hash_is_bound_to_stored_salt() {
        let scheme = Argon2Scheme::new();
        let credential = scheme.seal("pass").unwrap();
        let tampered = match credential {
            Credential::SaltedHash { hash, .. } => Credential::SaltedHash {
                salt: "another-salt".to_string(),
                hash,
            },
            other => other,
        };

        assert!(!verify_credential(&tampered, "pass"));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let credential = Credential::SaltedHash {
            salt: "salt".to_string(),
            hash: "not-a-phc-string".to_string(),
        };
        assert!(!verify_credential(&credential, ""));
        assert!(!verify_credential(&credential, "not-a-phc-string"));
    }

    #[test]
    fn test_plaintext_scheme_exact_match() {
        let scheme = PlaintextScheme;
        let credential = scheme.seal("pass").unwrap();

        assert_eq!(
            credential,
            Credential::Plaintext {
                password: "pass".to_string()
            }
        );
        assert!(scheme.verify(&credential, "pass"));
        assert!(!scheme.verify(&credential, "Pass"));
        assert!(!scheme.verify(&credential, "pa"));
    }

    #[test]
    fn test_secure_compare() {
        assert!(secure_compare("", ""));
        assert!(secure_compare("pass", "pass"));
        assert!(!secure_compare("pass", "pasS"));
        assert!(!secure_compare("pass", "passw"));
        assert!(!secure_compare("pass", ""));
        assert!(!secure_compare("\u{e9}", "e\u{301}"));
    }

    #[test]
    fn test_switching_scheme_keeps_old_records_verifiable() {
        let old = PlaintextScheme.seal("legacy").unwrap();
        let new_scheme = Argon2Scheme::new();
        assert!(new_scheme.verify(&old, "legacy"));

        let hashed = new_scheme.seal("modern").unwrap();
        assert!(PlaintextScheme.verify(&hashed, "modern"));
    }

    #[test]
    fn test_scheme_kind_parse_and_build() {
        assert_eq!("ARGON2".parse::<SchemeKind>().unwrap(), SchemeKind::Argon2);
        assert_eq!(
            "plaintext".parse::<SchemeKind>().unwrap(),
            SchemeKind::Plaintext
        );
        assert!("sha1".parse::<SchemeKind>().is_err());
        assert_eq!(SchemeKind::default(), SchemeKind::Argon2);
        assert_eq!(SchemeKind::Argon2.build().name(), "argon2");
        assert_eq!(SchemeKind::Plaintext.build().name(), "plaintext");
    }
}
