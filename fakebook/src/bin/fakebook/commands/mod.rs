pub mod admin;
pub mod demo;
pub mod friend;
pub mod post;
pub mod user;

use anyhow::{Context, Result};
use fakebook::{Authenticator, SessionUser, config::FakebookConfig, social::UserDirectory};

use crate::{
    context::{AppStore, require_actor},
    output::OutputManager,
};

/// Everything a command handler needs.
pub struct Session<'s> {
    pub store: &'s AppStore,
    pub auth: &'s Authenticator<'s, AppStore>,
    pub config: &'s FakebookConfig,
    pub user: Option<SessionUser>,
    pub output: &'s OutputManager,
}

impl Session<'_> {
    pub fn actor(&self) -> Result<&SessionUser> {
        require_actor(self.user.as_ref())
    }

    pub fn viewer_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.id.as_str())
    }

    /// A user id from either an id or an email address.
    pub async fn resolve_user(&self, target: &str) -> Result<String> {
        if !target.contains('@') {
            return Ok(target.to_string());
        }
        let profile = UserDirectory::new(self.store)
            .find_by_email(target)
            .await?
            .with_context(|| format!("No user with email {target}"))?;
        Ok(profile.id)
    }
}
