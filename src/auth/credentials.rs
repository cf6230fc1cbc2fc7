//! Resource-owner credentials supplied per call for the password grant.

// self
use crate::{_prelude::*, auth::Secret};

/// Username/password pair for the resource-owner password grant.
///
/// The pair is borrowed for a single acquisition and never persisted: the type intentionally
/// implements neither `Serialize` nor `Deserialize`.
#[derive(Clone, PartialEq, Eq)]
pub struct ResourceOwnerCredentials {
	/// Resource-owner username.
	pub username: String,
	/// Resource-owner password.
	pub password: Secret,
}
impl ResourceOwnerCredentials {
	/// Creates a credential pair.
	pub fn new(username: impl Into<String>, password: impl Into<Secret>) -> Self {
		Self { username: username.into(), password: password.into() }
	}

	/// Returns `true` when either half is empty; such pairs are treated as absent.
	pub fn is_blank(&self) -> bool {
		self.username.is_empty() || self.password.is_empty()
	}
}
impl Debug for ResourceOwnerCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResourceOwnerCredentials")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn debug_hides_password_and_blank_pairs_are_detected() {
		let creds = ResourceOwnerCredentials::new("ops", "hunter2");

		assert!(!format!("{creds:?}").contains("hunter2"));
		assert!(!creds.is_blank());
		assert!(ResourceOwnerCredentials::new("ops", "").is_blank());
		assert!(ResourceOwnerCredentials::new("", "hunter2").is_blank());
	}
}
