use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use log::{info, warn};

use crate::{
    auth::Authenticator,
    errors::{AuthError, SocialError, SocialResult, ValidationError, ValidationIssue},
    models::{PublicProfile, UserProfile},
    query::SortOrder,
    repository::{Repo, patch},
    store::DataStore,
    validators::{is_valid_email, is_valid_url, non_blank, normalize_email},
};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar_url: Option<String>,
}

/// Editable profile fields. Blank optional values clear the column.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

/// Registration and profile lookups.
pub struct UserDirectory<'s, S> {
    users: Repo<'s, S, UserProfile>,
    public: Repo<'s, S, PublicProfile>,
}

fn check_avatar(avatar_url: Option<&str>, issues: &mut Vec<ValidationIssue>) {
    if let Some(url) = avatar_url
        && !is_valid_url(url)
    {
        issues.push(ValidationIssue::new("avatar_url", "invalid_url", "avatar must be a valid URL"));
    }
}

impl<'s, S: DataStore> UserDirectory<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            users: Repo::new(store),
            public: Repo::new(store),
        }
    }

    /// Create credentials and a profile sharing the same id.
    ///
    /// The caller is left signed in as the new user.
    pub async fn register(&self, auth: &Authenticator<'_, S>, new_user: NewUser) -> SocialResult<UserProfile> {
        let name = non_blank(Some(&new_user.name));
        let email = normalize_email(&new_user.email);
        let avatar_url = non_blank(new_user.avatar_url.as_deref());

        let mut issues = Vec::new();
        if name.is_none() {
            issues.push(ValidationIssue::new("name", "required", "name is required"));
        }
        if email.is_empty() {
            issues.push(ValidationIssue::new("email", "required", "email is required"));
        } else if !is_valid_email(&email) {
            issues.push(ValidationIssue::new("email", "invalid_email", "email is not valid"));
        }
        if new_user.password.trim().is_empty() {
            issues.push(ValidationIssue::new("password", "required", "password is required"));
        }
        check_avatar(avatar_url.as_deref(), &mut issues);
        ValidationError::new(issues).into_result()?;

        let session = auth.sign_up(&email, new_user.password.trim()).await?;
        let profile = UserProfile {
            id: session.id.clone(),
            name: name.unwrap_or_default(),
            email: session.email.clone(),
            avatar_url,
            bio: None,
            created_at: Utc::now(),
        };

        match self.users.insert(&profile).await {
            Ok(stored) => {
                info!("registered user {} ({})", stored.id, stored.email);
                Ok(stored)
            }
            Err(err) => {
                // Without a profile the credential is unusable; take it back.
                warn!("profile insert for {} failed, removing credential: {err}", session.email);
                auth.forget(&session.id).await?;
                if err.is_unique_violation() {
                    Err(AuthError::EmailTaken { email: session.email }.into())
                } else {
                    Err(err.into())
                }
            }
        }
    }

    pub async fn profile(&self, user_id: &str) -> SocialResult<UserProfile> {
        self.users
            .get(user_id)
            .await?
            .ok_or_else(|| SocialError::not_found("user", user_id))
    }

    pub async fn exists(&self, user_id: &str) -> SocialResult<bool> {
        Ok(self.users.exists(user_id).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> SocialResult<Option<PublicProfile>> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Ok(None);
        }
        Ok(self.public.fetch_optional(self.public.query().eq("email", email)).await?)
    }

    /// Update the acting user's own profile.
    pub async fn update_profile(&self, acting_user_id: &str, update: ProfileUpdate) -> SocialResult<UserProfile> {
        let name = non_blank(Some(&update.name));
        let avatar_url = non_blank(update.avatar_url.as_deref());
        let bio = non_blank(update.bio.as_deref());

        let mut issues = Vec::new();
        if name.is_none() {
            issues.push(ValidationIssue::new("name", "required", "name is required"));
        }
        check_avatar(avatar_url.as_deref(), &mut issues);
        ValidationError::new(issues).into_result()?;

        let changes = patch([
            ("name", name.map(serde_json::Value::from).unwrap_or_default()),
            ("avatar_url", avatar_url.map(serde_json::Value::from).unwrap_or_default()),
            ("bio", bio.map(serde_json::Value::from).unwrap_or_default()),
        ]);
        let mut updated = self
            .users
            .update_where(self.users.query().eq("id", acting_user_id), changes)
            .await?;
        updated.pop().ok_or_else(|| SocialError::not_found("user", acting_user_id))
    }

    /// Every profile, newest first.
    pub async fn list_users(&self) -> SocialResult<Vec<UserProfile>> {
        Ok(self
            .users
            .fetch_all(self.users.query().order_by("created_at", SortOrder::Desc))
            .await?)
    }

    /// Public profiles for `ids`, keyed by id. Unknown ids are simply absent.
    pub async fn public_profiles<'a, I>(&self, ids: I) -> SocialResult<HashMap<String, PublicProfile>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let ids: BTreeSet<&str> = ids.into_iter().collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let profiles = self.public.fetch_all(self.public.query().in_("id", ids)).await?;
        Ok(profiles.into_iter().map(|profile| (profile.id.clone(), profile)).collect())
    }

    pub async fn delete(&self, user_id: &str) -> SocialResult<u64> {
        Ok(self.users.delete_where(self.users.query().eq("id", user_id)).await?)
    }
}
