//! Form payloads and field-level validation.
//!
//! Invalid submissions re-render the originating page with per-field
//! messages; nothing here touches the database.

use serde::Deserialize;

#[derive(Debug, Default)]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, msg)| msg.as_str())
    }
}

const MSG_REQUIRED: &str = "Må fylles ut";
const MSG_BAD_EMAIL: &str = "Ugyldig e-postadresse";
const MSG_BAD_USERNAME: &str = "Brukernavnet må ha mellom 3 og 32 tegn";
const MSG_SHORT_PASSWORD: &str = "Passordet må ha minst 6 tegn";

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.trim().is_empty() {
        errors.push("email", MSG_REQUIRED);
    } else if !is_plausible_email(email) {
        errors.push("email", MSG_BAD_EMAIL);
    }
}

fn check_required(errors: &mut FieldErrors, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(field, MSG_REQUIRED);
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        check_required(&mut errors, "username", &self.username);
        check_required(&mut errors, "password", &self.password);
        errors
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub phone: String,

    #[serde(default)]
    pub address: String,
}

impl RegistrationForm {
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();

        let username = self.username.trim();
        if username.is_empty() {
            errors.push("username", MSG_REQUIRED);
        } else if username.chars().count() < 3 || username.chars().count() > 32 {
            errors.push("username", MSG_BAD_USERNAME);
        }

        check_email(&mut errors, &self.email);

        if self.password.is_empty() {
            errors.push("password", MSG_REQUIRED);
        } else if self.password.chars().count() < 6 {
            errors.push("password", MSG_SHORT_PASSWORD);
        }

        check_required(&mut errors, "phone", &self.phone);
        check_required(&mut errors, "address", &self.address);

        errors
    }
}

/// Profile edits carry no username or password.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub phone: String,

    #[serde(default)]
    pub address: String,
}

impl ProfileForm {
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        check_email(&mut errors, &self.email);
        check_required(&mut errors, "phone", &self.phone);
        check_required(&mut errors, "address", &self.address);
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_accepts_a_complete_form() {
        let form = RegistrationForm {
            username: "alice".to_string(),
            email: "alice@example.no".to_string(),
            password: "Secr3t!".to_string(),
            phone: "12345678".to_string(),
            address: "Storgata 1".to_string(),
        };
        assert!(form.validate().is_empty());
    }

    #[test]
    fn registration_flags_each_missing_field() {
        let errors = RegistrationForm::default().validate();
        for field in ["username", "email", "password", "phone", "address"] {
            assert!(errors.for_field(field).is_some(), "missing error for {field}");
        }
    }

    #[test]
    fn registration_rejects_bad_email_and_short_password() {
        let form = RegistrationForm {
            username: "alice".to_string(),
            email: "not-an-email".to_string(),
            password: "abc".to_string(),
            phone: "12345678".to_string(),
            address: "Storgata 1".to_string(),
        };
        let errors = form.validate();
        assert_eq!(errors.for_field("email"), Some(MSG_BAD_EMAIL));
        assert_eq!(errors.for_field("password"), Some(MSG_SHORT_PASSWORD));
    }

    #[test]
    fn login_requires_both_fields() {
        let errors = LoginForm::default().validate();
        assert!(errors.for_field("username").is_some());
        assert!(errors.for_field("password").is_some());

        let form = LoginForm {
            username: "alice".to_string(),
            password: "pw".to_string(),
        };
        assert!(form.validate().is_empty());
    }

    #[test]
    fn profile_form_validates_email_only_loosely() {
        let form = ProfileForm {
            email: "alice@example.no".to_string(),
            phone: "12345678".to_string(),
            address: "Storgata 1".to_string(),
        };
        assert!(form.validate().is_empty());
        assert!(is_plausible_email("a@b.no"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("@b.no"));
    }
}
