//! Outbound request model and the `{ success, message, data }` response envelope.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, DecodeError},
	http::{HttpResponse, Method},
};

/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "authorization";

/// Request as issued by a caller, before the dispatcher resolves it against the base URL.
///
/// The value is kept intact across a refresh so it can be replayed verbatim with the new
/// access credential.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the API base URL.
	pub path: String,
	/// Extra headers; names are lower-cased on insert.
	pub headers: BTreeMap<String, String>,
	/// JSON body, if any.
	pub body: Option<serde_json::Value>,
	retried: bool,
	refreshable: bool,
}
impl ApiRequest {
	/// Creates a request with no body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: BTreeMap::new(),
			body: None,
			retried: false,
			refreshable: true,
		}
	}

	/// `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Serializes `body` as the JSON payload.
	pub fn json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_value(body)?);

		Ok(self)
	}

	/// Adds a header.
	pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
		self.headers.insert(name.to_ascii_lowercase(), value.into());

		self
	}

	/// Opts out of the refresh-and-replay cycle; a 401 is reported as-is.
	pub fn without_refresh(mut self) -> Self {
		self.refreshable = false;

		self
	}

	/// Whether the request has already been replayed after a refresh.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	/// Whether a 401 may trigger a refresh for this request.
	pub fn is_refreshable(&self) -> bool {
		self.refreshable
	}

	/// Marks the request as replayed and stamps the fresh access credential on it.
	pub(crate) fn into_replay(mut self, access_token: &TokenSecret) -> Self {
		self.retried = true;
		self.headers.insert(AUTHORIZATION.into(), access_token.bearer());

		self
	}
}

/// Envelope wrapping every API response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
	/// Whether the server considers the call successful.
	pub success: bool,
	/// Human-readable server message.
	#[serde(default)]
	pub message: Option<String>,
	/// Payload.
	pub data: T,
}

/// Envelope fields that are readable on any status, used to extract error messages.
#[derive(Debug, Default, Deserialize)]
struct EnvelopeMessage {
	#[serde(default)]
	message: Option<String>,
}

/// Decodes an envelope, reporting the failing JSON path on error.
pub(crate) fn decode_envelope<T>(path: &str, response: &HttpResponse) -> Result<ApiEnvelope<T>>
where
	T: DeserializeOwned,
{
	let body: &[u8] = if response.body.is_empty() { b"{}" } else { &response.body };
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de).map_err(|source| {
		DecodeError::Envelope { path: path.to_owned(), status: response.status, source }.into()
	})
}

/// Extracts the server `message` from a body, tolerating non-envelope payloads.
pub(crate) fn server_message(response: &HttpResponse) -> Option<String> {
	serde_json::from_slice::<EnvelopeMessage>(&response.body)
		.ok()
		.and_then(|envelope| envelope.message)
		.map(|message| message.trim().to_owned())
		.filter(|message| !message.is_empty())
}
