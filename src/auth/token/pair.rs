//! Access/refresh credential pair and the server payloads that mint it.

// self
use crate::{
	_prelude::*,
	auth::{UserId, token::secret::TokenSecret},
};

/// Access and refresh credentials that are always stored, rotated, and cleared together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
	/// Short-lived credential attached to every authenticated call.
	pub access_token: TokenSecret,
	/// Longer-lived credential used solely to mint a new access credential.
	pub refresh_token: TokenSecret,
}
impl CredentialPair {
	/// Builds a pair from raw token strings.
	pub fn new(access_token: impl Into<TokenSecret>, refresh_token: impl Into<TokenSecret>) -> Self {
		Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
	}
}

/// `data` payload returned by `/auth/login` and `/auth/register`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
	/// Newly minted access credential.
	pub access_token: TokenSecret,
	/// Newly minted refresh credential.
	pub refresh_token: TokenSecret,
	/// Account identifier, when the server reports it.
	#[serde(default)]
	pub user_id: Option<UserId>,
}
impl AuthTokens {
	/// Extracts the credential pair to persist.
	pub fn credentials(&self) -> CredentialPair {
		CredentialPair {
			access_token: self.access_token.clone(),
			refresh_token: self.refresh_token.clone(),
		}
	}
}

/// `data` payload returned by `/auth/refresh`; refresh rotation is optional.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshGrant {
	/// Replacement access credential.
	pub access_token: TokenSecret,
	/// Replacement refresh credential when the server rotates it.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
}
impl RefreshGrant {
	/// Applies the grant on top of the current pair, keeping the old refresh credential when the
	/// server did not rotate it.
	pub fn apply_to(&self, current: &CredentialPair) -> CredentialPair {
		CredentialPair {
			access_token: self.access_token.clone(),
			refresh_token: self
				.refresh_token
				.clone()
				.unwrap_or_else(|| current.refresh_token.clone()),
		}
	}
}

/// `data` payload returned by `/auth/session`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
	/// Whether the server accepts the current access credential.
	pub authenticated: bool,
	/// Account identifier when authenticated.
	#[serde(default)]
	pub user_id: Option<UserId>,
}
impl SessionStatus {
	/// Status reported when no usable session exists.
	pub fn unauthenticated() -> Self {
		Self::default()
	}
}
