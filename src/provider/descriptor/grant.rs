// self
use crate::_prelude::*;

/// OAuth 2.0 grant types a configured client can use.
///
/// Configuration documents name the resource-owner grant `resource_owner` (or `password`); on
/// the wire it is always sent as `grant_type=password`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GrantType {
	/// Authorization Code grant with a browser redirect and CSRF-protected callback.
	#[serde(rename = "authorization_code")]
	AuthorizationCode,
	/// Client Credentials grant for app-only tokens.
	#[serde(rename = "client_credentials")]
	ClientCredentials,
	/// Refresh Token grant for renewing a previously issued token.
	#[serde(rename = "refresh_token")]
	RefreshToken,
	/// Resource Owner Password Credentials grant.
	#[serde(rename = "resource_owner", alias = "password")]
	ResourceOwnerPassword,
}
impl GrantType {
	/// Every grant, in dispatch order.
	pub const ALL: [GrantType; 4] = [
		GrantType::AuthorizationCode,
		GrantType::ClientCredentials,
		GrantType::RefreshToken,
		GrantType::ResourceOwnerPassword,
	];

	/// Returns the RFC 6749 `grant_type` value.
	pub fn as_str(self) -> &'static str {
		match self {
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::ClientCredentials => "client_credentials",
			GrantType::RefreshToken => "refresh_token",
			GrantType::ResourceOwnerPassword => "password",
		}
	}

	/// Returns the label used in configuration documents.
	pub fn config_label(self) -> &'static str {
		match self {
			GrantType::ResourceOwnerPassword => "resource_owner",
			other => other.as_str(),
		}
	}

	/// Whether tokens from this grant are normally renewed with a refresh token.
	pub fn refreshes_first(self) -> bool {
		matches!(
			self,
			GrantType::AuthorizationCode
				| GrantType::RefreshToken
				| GrantType::ResourceOwnerPassword
		)
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn config_labels_accept_the_password_alias() {
		let parsed: GrantType =
			serde_json::from_str("\"password\"").expect("Alias should deserialize.");

		assert_eq!(parsed, GrantType::ResourceOwnerPassword);
		assert_eq!(
			serde_json::to_string(&parsed).expect("Grant should serialize."),
			"\"resource_owner\""
		);
		assert_eq!(parsed.as_str(), "password");
		assert_eq!(parsed.config_label(), "resource_owner");
		assert!(!GrantType::ClientCredentials.refreshes_first());
	}
}
