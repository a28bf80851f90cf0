use anyhow::Result;
use clap::Subcommand;
use fakebook::social::AdminPanel;

use super::Session;
use crate::examples::ExampleGroup;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Moderation (the --as account must be listed in social.admin_emails)",
    commands: &[
        "fakebook --as root@example.com --password s3cret admin users",
        "fakebook --as root@example.com --password s3cret admin posts",
        "fakebook --as root@example.com --password s3cret admin delete-post <post-id>",
        "fakebook --as root@example.com --password s3cret admin delete-user <user-id>",
    ],
}];

#[derive(Subcommand)]
pub enum AdminCommands {
    /// List every user
    #[command(name = "users")]
    Users,

    /// List every post with its author
    #[command(name = "posts")]
    Posts,

    /// Delete a user with their posts, likes, comments and relationships
    #[command(name = "delete-user")]
    DeleteUser {
        /// User id or email
        user: String,
    },

    /// Delete a post with its likes and comments
    #[command(name = "delete-post")]
    DeletePost { post_id: String },
}

pub async fn handle_admin_commands(command: AdminCommands, session: &Session<'_>) -> Result<()> {
    let panel = AdminPanel::new(session.store, session.auth, &session.config.social);
    let output = session.output;

    match command {
        AdminCommands::Users => {
            let users = panel.list_users().await?;
            output.heading(&format!("{} users", users.len()));
            output.display(&users)?;
        }
        AdminCommands::Posts => {
            let posts = panel.list_posts().await?;
            output.heading(&format!("{} posts", posts.len()));
            output.display(&posts)?;
        }
        AdminCommands::DeleteUser { user } => {
            let user_id = session.resolve_user(&user).await?;
            panel.delete_user(&user_id).await?;
            output.success(&format!("Deleted user {user_id}"));
        }
        AdminCommands::DeletePost { post_id } => {
            panel.delete_post(&post_id).await?;
            output.success(&format!("Deleted post {post_id}"));
        }
    }

    Ok(())
}
