//! Document, company and user identifiers

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Fails with `Invalid` for the nil UUID
            pub fn validate(&self) -> Result<()> {
                if self.0.is_nil() {
                    return Err(Error::invalid(concat!($what, ": nil UUID")));
                }
                Ok(())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let uuid = Uuid::parse_str(s.trim())
                    .map_err(|e| Error::invalid(format!(concat!($what, " {:?}: {}"), s, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

uuid_id!(
    /// Globally unique document ID
    DocumentId,
    "document ID"
);

uuid_id!(
    /// ID of the company owning a document
    CompanyId,
    "company ID"
);

uuid_id!(
    /// ID of the user committing or checking out
    UserId,
    "user ID"
);

/// Check that a name can be stored as a document file
///
/// Names are flat: no path separators, no `.`/`..`, no control characters.
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid("file name: empty"));
    }
    if name == "." || name == ".." {
        return Err(Error::invalid(format!("file name {name:?}")));
    }
    if name.contains(['/', '\\']) {
        return Err(Error::invalid(format!("file name {name:?}: contains a path separator")));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::invalid(format!("file name {name:?}: contains a control character")));
    }
    Ok(())
}
