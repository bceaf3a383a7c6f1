//! Registration input and its local validation.

// self
use crate::{_prelude::*, auth::Email, error::ValidationError};

/// Sign-up input as collected from the user, before any local checks.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistrationForm {
	/// Email address to register.
	pub email: String,
	/// Chosen password.
	pub password: String,
	/// Password typed a second time.
	pub confirm_password: String,
	/// Optional display name.
	pub full_name: Option<String>,
}
impl RegistrationForm {
	/// Creates a form whose confirmation matches the password.
	pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
		let password = password.into();

		Self { email: email.into(), confirm_password: password.clone(), password, full_name: None }
	}

	/// Overrides the password confirmation.
	pub fn confirm_password(mut self, confirm_password: impl Into<String>) -> Self {
		self.confirm_password = confirm_password.into();

		self
	}

	/// Sets the display name.
	pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
		self.full_name = Some(full_name.into());

		self
	}

	/// Checks the form locally and produces the payload sent to the register endpoint.
	pub fn validate(&self) -> Result<Registration, ValidationError> {
		let email = Email::new(self.email.trim())?;

		if self.password.is_empty() {
			return Err(ValidationError::EmptyPassword);
		}
		if self.password != self.confirm_password {
			return Err(ValidationError::PasswordMismatch);
		}

		let full_name = self
			.full_name
			.as_deref()
			.map(str::trim)
			.filter(|name| !name.is_empty())
			.map(str::to_owned);

		Ok(Registration { email, password: self.password.clone(), full_name })
	}
}
impl Debug for RegistrationForm {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RegistrationForm")
			.field("email", &self.email)
			.field("full_name", &self.full_name)
			.finish_non_exhaustive()
	}
}

/// Validated `/auth/register` body.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
	/// Email address.
	pub email: Email,
	password: String,
	/// Trimmed display name, omitted when blank.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub full_name: Option<String>,
}
impl Debug for Registration {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Registration")
			.field("email", &self.email)
			.field("full_name", &self.full_name)
			.finish_non_exhaustive()
	}
}
