//! Identity record handed to the chat shell.

use chatai_auth::{AuthSettings, LocalUser};
use serde::Serialize;

/// Chat SDK user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatIdentity {
    /// Provider user id.
    pub id: String,
    /// Display name: full name, else email.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Avatar: account avatar, else the placeholder for the email.
    pub image: String,
}

impl ChatIdentity {
    /// Map a local user to the chat identity.
    #[must_use]
    pub fn from_user(user: &LocalUser, settings: &AuthSettings) -> Self {
        let name = user
            .full_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| user.email.clone());
        let image = user
            .avatar_url
            .clone()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| settings.placeholder_avatar(&user.email));

        Self {
            id: user.id.clone(),
            name,
            email: user.email.clone(),
            image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(full_name: Option<&str>, avatar_url: Option<&str>) -> LocalUser {
        LocalUser {
            id: "u1".into(),
            email: "a@b.com".into(),
            full_name: full_name.map(Into::into),
            avatar_url: avatar_url.map(Into::into),
        }
    }

    #[test]
    fn test_name_falls_back_to_email() {
        let settings = AuthSettings::default();
        assert_eq!(ChatIdentity::from_user(&user(Some(""), None), &settings).name, "a@b.com");
        assert_eq!(ChatIdentity::from_user(&user(None, None), &settings).name, "a@b.com");
        assert_eq!(ChatIdentity::from_user(&user(Some("Ada"), None), &settings).name, "Ada");
    }

    #[test]
    fn test_image_falls_back_to_placeholder() {
        let settings = AuthSettings::default();
        let identity = ChatIdentity::from_user(&user(None, None), &settings);
        assert_eq!(identity.image, settings.placeholder_avatar("a@b.com"));

        let identity = ChatIdentity::from_user(&user(None, Some("https://img/x.png")), &settings);
        assert_eq!(identity.image, "https://img/x.png");
    }
}
