//! Validated identity newtypes.
//!
//! External identifiers enter the service as strings; these wrappers make
//! "was validated" a type-level fact. Both deserialize through their `parse`
//! constructors, so a handler holding a [`UserId`] or [`Email`] never needs
//! to re-check it.

use serde::{Deserialize, Serialize};

/// Error returned when a user identifier fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserIdError {
    #[error("user id must not be empty")]
    Empty,
    #[error("user id exceeds {max} characters")]
    TooLong { max: usize },
    #[error("user id contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Opaque identifier for a subject, issued by the identity provider.
///
/// Contents are not interpreted beyond basic hygiene: non-empty, bounded
/// length, no whitespace or control characters.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String")]
pub struct UserId(String);

impl UserId {
    pub const MAX_LENGTH: usize = 128;

    pub fn parse(value: impl Into<String>) -> Result<Self, UserIdError> {
        let value = value.into();
        if value.is_empty() {
            return Err(UserIdError::Empty);
        }
        if value.len() > Self::MAX_LENGTH {
            return Err(UserIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if let Some(c) = value
            .chars()
            .find(|c| c.is_whitespace() || c.is_control())
        {
            return Err(UserIdError::InvalidCharacter(c));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = UserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for UserId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for UserId {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <String as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Self::parse(raw).map_err(Into::into)
    }
}

#[cfg(feature = "postgres")]
impl<'q> sqlx::Encode<'q, sqlx::Postgres> for UserId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// Error returned when an email address fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmailError {
    #[error("email must not be empty")]
    Empty,
    #[error("email exceeds {max} characters")]
    TooLong { max: usize },
    #[error("email is missing an @ symbol")]
    MissingAtSymbol,
    #[error("email has an empty local part")]
    EmptyLocalPart,
    #[error("email has an empty domain")]
    EmptyDomain,
}

/// A normalized email address.
///
/// Normalization trims surrounding whitespace and lowercases, so equality
/// checks and unique indexes behave case-insensitively.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String")]
pub struct Email(String);

impl Email {
    pub const MAX_LENGTH: usize = 254;

    pub fn parse(value: impl Into<String>) -> Result<Self, EmailError> {
        let value = value.into().trim().to_lowercase();
        if value.is_empty() {
            return Err(EmailError::Empty);
        }
        if value.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        let (local, domain) = value.split_once('@').ok_or(EmailError::MissingAtSymbol)?;
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.is_empty() {
            return Err(EmailError::EmptyDomain);
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Email {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Email {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <String as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Self::parse(raw).map_err(Into::into)
    }
}

#[cfg(feature = "postgres")]
impl<'q> sqlx::Encode<'q, sqlx::Postgres> for Email {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_accepts_provider_formats() {
        assert!(UserId::parse("usr_123").is_ok());
        assert!(UserId::parse("auth0|64f0c3").is_ok());
        assert!(UserId::parse("b52bd4c2-0b6c-43bc-a934-c08efc392b8a").is_ok());
    }

    #[test]
    fn test_user_id_rejects_empty() {
        assert_eq!(UserId::parse(""), Err(UserIdError::Empty));
    }

    #[test]
    fn test_user_id_rejects_overlong() {
        let long = "a".repeat(UserId::MAX_LENGTH + 1);
        assert_eq!(
            UserId::parse(long),
            Err(UserIdError::TooLong {
                max: UserId::MAX_LENGTH
            })
        );
    }

    #[test]
    fn test_user_id_rejects_whitespace_and_control() {
        assert_eq!(
            UserId::parse("usr 123"),
            Err(UserIdError::InvalidCharacter(' '))
        );
        assert_eq!(
            UserId::parse("usr\n123"),
            Err(UserIdError::InvalidCharacter('\n'))
        );
        assert_eq!(
            UserId::parse("usr\u{0}123"),
            Err(UserIdError::InvalidCharacter('\u{0}'))
        );
    }

    #[test]
    fn test_user_id_serde_validates_on_deserialize() {
        let ok: UserId = serde_json::from_str("\"usr_9\"").unwrap();
        assert_eq!(ok.as_str(), "usr_9");
        assert!(serde_json::from_str::<UserId>("\"has space\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"usr_9\"");
    }

    #[test]
    fn test_email_parses_and_normalizes() {
        let email = Email::parse("  Ada.Lovelace@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "ada.lovelace@example.com");
    }

    #[test]
    fn test_email_rejects_malformed() {
        assert_eq!(Email::parse(""), Err(EmailError::Empty));
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("nobody"), Err(EmailError::MissingAtSymbol));
        assert_eq!(Email::parse("@example.com"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("ada@"), Err(EmailError::EmptyDomain));
    }

    #[test]
    fn test_email_rejects_overlong() {
        let long = format!("{}@example.com", "a".repeat(Email::MAX_LENGTH));
        assert_eq!(
            Email::parse(long),
            Err(EmailError::TooLong {
                max: Email::MAX_LENGTH
            })
        );
    }

    #[test]
    fn test_email_serde_validates_on_deserialize() {
        let ok: Email = serde_json::from_str("\"Ada@Example.com\"").unwrap();
        assert_eq!(ok.as_str(), "ada@example.com");
        assert!(serde_json::from_str::<Email>("\"not-an-email\"").is_err());
    }
}
