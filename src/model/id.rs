//! Strongly typed identifiers used across tenants, directories, and users.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

/// Character rule an identifier kind is held to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Charset {
	/// Locally assigned; anything but whitespace.
	Local,
	/// Interpolated into provider URL paths and OData filters unescaped.
	Provider,
}
impl Charset {
	fn admits(self, c: char) -> bool {
		match self {
			Self::Local => !c.is_whitespace(),
			Self::Provider => c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '@'),
		}
	}
}

macro_rules! def_id {
	($name:ident, $kind:literal, $charset:expr, $doc:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates `value` and wraps it.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				let value = value.into();

				check($kind, $charset, &value)?;

				Ok(Self(value))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

const MAX_LEN: usize = 128;

/// Identifier validation failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// Empty input.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Identifier kind (tenant, directory, user).
		kind: &'static str,
	},
	/// Input carries a character the identifier kind does not admit.
	#[error("{kind} identifier contains the disallowed character {found:?}.")]
	DisallowedCharacter {
		/// Identifier kind (tenant, directory, user).
		kind: &'static str,
		/// First offending character.
		found: char,
	},
	/// Input longer than the permitted length.
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Identifier kind (tenant, directory, user).
		kind: &'static str,
		/// Maximum permitted length in bytes.
		max: usize,
	},
}

def_id! { TenantId, "Tenant", Charset::Local, "Local identifier of a tenant managed by the console." }
def_id! {
	DirectoryTenantId,
	"Directory",
	Charset::Provider,
	"Provider-assigned identifier of a customer directory (GUID or verified domain)."
}
def_id! { UserId, "User", Charset::Provider, "Stable provider-assigned identifier of a directory user." }

fn check(kind: &'static str, charset: Charset, value: &str) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if value.len() > MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: MAX_LEN });
	}
	if let Some(found) = value.chars().find(|c| !charset.admits(*c)) {
		return Err(IdentifierError::DisallowedCharacter { kind, found });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_whitespace_and_empty_values() {
		assert!(TenantId::new(" tenant-123").is_err(), "Leading whitespace must be rejected.");
		assert!(UserId::new("").is_err());
		assert!(DirectoryTenantId::new("contoso tenant").is_err());
		assert!(TenantId::new("acme/emea").is_ok());

		let user = UserId::new("8f2a1c7e-0000-4b1d-9c3e-5d0f00c0ffee")
			.expect("GUID-shaped user identifiers should be valid.");

		assert_eq!(user.as_ref(), "8f2a1c7e-0000-4b1d-9c3e-5d0f00c0ffee");
		assert_eq!(format!("{user:?}"), "User(8f2a1c7e-0000-4b1d-9c3e-5d0f00c0ffee)");
	}

	#[test]
	fn provider_identifiers_reject_url_and_filter_metacharacters() {
		for raw in ["user/1", "user?x=1", "o'brien", "a#b", "50%"] {
			assert!(
				matches!(UserId::new(raw), Err(IdentifierError::DisallowedCharacter { kind: "User", .. })),
				"{raw} should be rejected."
			);
		}

		assert_eq!(
			DirectoryTenantId::new("contoso.onmicrosoft.com/../x"),
			Err(IdentifierError::DisallowedCharacter { kind: "Directory", found: '/' })
		);
		assert!(UserId::new("ada.lovelace_admin@contoso.example").is_ok());
	}

	#[test]
	fn serde_enforces_validation() {
		let tenant: TenantId =
			serde_json::from_str("\"tenant-42\"").expect("Tenant should deserialize successfully.");

		assert_eq!(tenant.as_ref(), "tenant-42");
		assert!(serde_json::from_str::<TenantId>("\"with space\"").is_err());

		let too_long = format!("\"{}\"", "a".repeat(MAX_LEN + 1));

		assert!(serde_json::from_str::<UserId>(&too_long).is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<UserId, u8> = HashMap::from_iter([(
			UserId::new("user-123").expect("User used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("user-123"), Some(&7));
	}
}
