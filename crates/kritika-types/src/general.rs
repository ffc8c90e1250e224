use std::str::FromStr;

use garde::Validate;
use serde::{Deserialize, Serialize};

pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_SLUG_LENGTH: usize = 50;

/// Reserved as the "own profile" path segment on the users resource.
pub const RESERVED_USERNAME: &str = "me";

#[derive(Debug, Clone, PartialEq, Eq, Validate, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[garde(transparent)]
pub struct ValidEmail(#[garde(email, length(max = 254))] String);

impl FromStr for ValidEmail {
    type Err = garde::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let email = ValidEmail(s.to_string());
        email.validate()?;
        Ok(email)
    }
}

impl AsRef<str> for ValidEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn username_chars(value: &str, _ctx: &()) -> garde::Result {
    if value.is_empty() {
        return Err(garde::Error::new("username must not be empty"));
    }
    if value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        Ok(())
    } else {
        Err(garde::Error::new(
            "username may contain only letters, digits and @/./+/-/_ characters",
        ))
    }
}

fn username_not_reserved(value: &str, _ctx: &()) -> garde::Result {
    if value.eq_ignore_ascii_case(RESERVED_USERNAME) {
        Err(garde::Error::new("username 'me' is reserved"))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Validate, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[garde(transparent)]
pub struct ValidUsername(
    #[garde(
        length(max = 150),
        custom(username_chars),
        custom(username_not_reserved)
    )]
    String,
);

impl FromStr for ValidUsername {
    type Err = garde::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let username = ValidUsername(s.to_string());
        username.validate()?;
        Ok(username)
    }
}

impl AsRef<str> for ValidUsername {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn slug_chars(value: &str, _ctx: &()) -> garde::Result {
    if value.is_empty() {
        return Err(garde::Error::new("slug must not be empty"));
    }
    if value.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(garde::Error::new(
            "slug may contain only alphanumeric characters",
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Validate, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[garde(transparent)]
pub struct ValidSlug(#[garde(length(max = 50), custom(slug_chars))] String);

impl FromStr for ValidSlug {
    type Err = garde::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let slug = ValidSlug(s.to_string());
        slug.validate()?;
        Ok(slug)
    }
}

impl AsRef<str> for ValidSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
