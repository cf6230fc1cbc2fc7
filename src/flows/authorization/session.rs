//! Pending authorization state and the PKCE material it carries.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, Secret},
};

pub(crate) const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// Public half of a PKCE pair, sent with the authorization URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PkceChallenge {
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkceChallenge {
	/// Derives the S256 challenge of `verifier`.
	pub fn s256(verifier: &str) -> Self {
		Self { challenge: compute_pkce_challenge(verifier), method: PkceCodeChallengeMethod::S256 }
	}

	/// Encoded code challenge.
	pub fn challenge(&self) -> &str {
		&self.challenge
	}

	/// Challenge method.
	pub fn method(&self) -> PkceCodeChallengeMethod {
		self.method
	}
}

/// Freshly generated PKCE verifier and its challenge.
#[derive(Clone, Debug)]
pub struct PkcePair {
	verifier: Secret,
	challenge: PkceChallenge,
}
impl PkcePair {
	/// Generates a random verifier and derives its S256 challenge.
	pub fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = PkceChallenge::s256(&verifier);

		Self { verifier: Secret::new(verifier), challenge }
	}

	/// Secret verifier kept with the pending state.
	pub fn verifier(&self) -> &Secret {
		&self.verifier
	}

	/// Challenge sent with the authorization URL.
	pub fn challenge(&self) -> &PkceChallenge {
		&self.challenge
	}

	pub(crate) fn into_verifier(self) -> Secret {
		self.verifier
	}
}

/// Authorization issued to a client and awaiting its callback.
///
/// Stored under the client's id; at most one exists per client, and it is deleted once the
/// callback's `state` matches.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthorizationState {
	/// Client the authorization was started for.
	pub client_id: ClientId,
	/// CSRF nonce that must round-trip through the redirect.
	pub state_token: String,
	/// Creation instant, used by stores that expire pending states.
	pub created_at: OffsetDateTime,
	/// PKCE verifier, when the authorization used PKCE.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pkce_verifier: Option<Secret>,
}
impl PendingAuthorizationState {
	/// Creates a pending state stamped with the current instant.
	pub fn new(
		client_id: ClientId,
		state_token: impl Into<String>,
		pkce_verifier: Option<Secret>,
	) -> Self {
		Self {
			client_id,
			state_token: state_token.into(),
			created_at: OffsetDateTime::now_utc(),
			pkce_verifier,
		}
	}
}
impl Debug for PendingAuthorizationState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PendingAuthorizationState")
			.field("client_id", &self.client_id)
			.field("state_token", &"<redacted>")
			.field("created_at", &self.created_at)
			.field("pkce", &self.pkce_verifier.is_some())
			.finish()
	}
}

/// Where the resource owner must be sent to authorize a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationRedirect {
	/// Client the authorization was started for.
	pub client_id: ClientId,
	/// Fully-formed authorization URL.
	pub authorize_url: Url,
	/// CSRF state embedded in the URL.
	pub state: String,
}

pub(crate) fn random_state() -> String {
	random_string(STATE_LEN)
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let digest = Sha256::digest(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn state_tokens_are_alphanumeric_and_unique() {
		let first = random_state();
		let second = random_state();

		assert_eq!(first.len(), STATE_LEN);
		assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
		assert_ne!(first, second);
	}

	#[test]
	fn pkce_challenge_matches_rfc_7636_vector() {
		let challenge = PkceChallenge::s256("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");

		assert_eq!(challenge.challenge(), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
		assert_eq!(challenge.method().as_str(), "S256");

		let pair = PkcePair::generate();

		assert_eq!(pair.verifier().expose().len(), 64);
		assert_eq!(pair.challenge(), &PkceChallenge::s256(pair.verifier().expose()));
	}

	#[test]
	fn pending_state_round_trips_and_hides_secrets_in_debug() {
		let state = PendingAuthorizationState::new(
			ClientId::new("crm").expect("Client fixture should be valid."),
			"csrf-nonce-value",
			Some(Secret::new("verifier-secret")),
		);
		let json = serde_json::to_string(&state).expect("Pending state should serialize.");
		let back: PendingAuthorizationState =
			serde_json::from_str(&json).expect("Pending state should deserialize.");

		assert_eq!(back, state);

		let rendered = format!("{state:?}");

		assert!(!rendered.contains("verifier-secret"));
		assert!(!rendered.contains("csrf-nonce-value"));
		assert!(rendered.contains("<redacted>"));
	}
}
