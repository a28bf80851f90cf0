use anyhow::Result;
use clap::Subcommand;
use fakebook::social::{NewUser, ProfileUpdate, UserDirectory};

use super::Session;
use crate::examples::ExampleGroup;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Accounts",
        commands: &[
            "fakebook user register --name Ana --email ana@example.com --password s3cret",
            "fakebook user list",
            "fakebook user show ana@example.com",
        ],
    },
    ExampleGroup {
        title: "Profile",
        commands: &["fakebook --as ana@example.com --password s3cret user update --name 'Ana B' --bio 'hi'"],
    },
];

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create an account and its profile
    #[command(name = "register")]
    Register {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        avatar_url: Option<String>,
    },

    /// List every user, newest first
    #[command(name = "list")]
    List,

    /// Show one user's profile
    #[command(name = "show")]
    Show {
        /// User id or email
        user: String,
    },

    /// Update the acting user's profile
    #[command(name = "update")]
    Update {
        #[arg(long)]
        name: String,

        /// Empty to clear
        #[arg(long)]
        avatar_url: Option<String>,

        /// Empty to clear
        #[arg(long)]
        bio: Option<String>,
    },
}

pub async fn handle_user_commands(command: UserCommands, session: &Session<'_>) -> Result<()> {
    let users = UserDirectory::new(session.store);
    let output = session.output;

    match command {
        UserCommands::Register {
            name,
            email,
            password,
            avatar_url,
        } => {
            let profile = users
                .register(
                    session.auth,
                    NewUser {
                        name,
                        email,
                        password,
                        avatar_url,
                    },
                )
                .await?;
            output.success(&format!("Registered {} ({})", profile.name, profile.email));
            output.display(&vec![profile])?;
        }
        UserCommands::List => {
            let all = users.list_users().await?;
            output.heading(&format!("{} users", all.len()));
            output.display(&all)?;
        }
        UserCommands::Show { user } => {
            let user_id = session.resolve_user(&user).await?;
            let profile = users.profile(&user_id).await?;
            output.display(&vec![profile])?;
        }
        UserCommands::Update { name, avatar_url, bio } => {
            let actor = session.actor()?;
            let profile = users
                .update_profile(&actor.id, ProfileUpdate { name, avatar_url, bio })
                .await?;
            output.success("Profile updated");
            output.display(&vec![profile])?;
        }
    }

    Ok(())
}
