//! API-key validation. Fails closed: any missing, blank, or unrecognized
//! credential is rejected before rate limiting or upstream work.

use std::collections::HashSet;
use std::fmt::{Display, Formatter, Write as _};

use sha2::{Digest, Sha256};

use crate::error::BridgeError;

/// Stable caller handle derived from the presented key.
///
/// A short digest rather than the key itself, so identities are safe to log
/// and to use as rate-limit keys without ever exposing the credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    fn from_key(key: &str) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        let mut hex = String::with_capacity(12);
        for byte in digest.iter().take(6) {
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CallerIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The set of credentials the bridge recognizes.
///
/// Provisioning and storage of keys is out of scope; this type only
/// validates what it was constructed with.
#[derive(Debug, Clone)]
pub struct ApiKeySet {
    keys: HashSet<String>,
}

impl ApiKeySet {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(Into::into)
                .filter(|key: &String| !key.trim().is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn authenticate(&self, credential: Option<&str>) -> Result<CallerIdentity, BridgeError> {
        let presented = match credential {
            Some(value) if !value.trim().is_empty() => value,
            _ => return Err(BridgeError::auth("missing api key")),
        };
        if self.keys.contains(presented) {
            Ok(CallerIdentity::from_key(presented))
        } else {
            Err(BridgeError::auth("unrecognized api key"))
        }
    }
}
