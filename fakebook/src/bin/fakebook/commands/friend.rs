use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use fakebook::{DuplicateReason, SocialError, social::FriendshipManager};

use super::Session;
use crate::examples::ExampleGroup;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Requests",
        commands: &[
            "fakebook --as ana@example.com --password s3cret friend request ben@example.com",
            "fakebook --as ben@example.com --password s3cret friend list --kind incoming",
            "fakebook --as ben@example.com --password s3cret friend accept <relationship-id>",
        ],
    },
    ExampleGroup {
        title: "Friends",
        commands: &[
            "fakebook --as ana@example.com --password s3cret friend list",
            "fakebook --as ana@example.com --password s3cret friend unfriend <relationship-id>",
        ],
    },
];

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ListKind {
    #[default]
    Friends,
    Incoming,
    Outgoing,
}

#[derive(Subcommand)]
pub enum FriendCommands {
    /// Send a friend request
    #[command(name = "request")]
    Request {
        /// Recipient id or email
        user: String,
    },

    /// Accept a request sent to you
    #[command(name = "accept")]
    Accept { relationship_id: String },

    /// Reject a pending request
    #[command(name = "reject")]
    Reject { relationship_id: String },

    /// Withdraw a request you sent
    #[command(name = "cancel")]
    Cancel { relationship_id: String },

    /// End a friendship
    #[command(name = "unfriend")]
    Unfriend { relationship_id: String },

    /// List friends or pending requests
    #[command(name = "list")]
    List {
        #[arg(long, value_enum, default_value = "friends")]
        kind: ListKind,
    },
}

pub async fn handle_friend_commands(command: FriendCommands, session: &Session<'_>) -> Result<()> {
    let friendships = FriendshipManager::new(session.store);
    let output = session.output;
    let actor = session.actor()?;

    match command {
        FriendCommands::Request { user } => {
            let sent = if user.contains('@') {
                friendships.send_request_by_email(&actor.id, &user).await
            } else {
                friendships.send_request(&actor.id, &user).await
            };
            match sent {
                Ok(relationship) => {
                    output.success(&format!("Friend request sent ({})", relationship.id));
                    output.display(&vec![relationship])?;
                }
                Err(SocialError::DuplicateRelationship { reason, existing }) => {
                    let message = match reason {
                        DuplicateReason::Pending => "A request between you is already pending",
                        DuplicateReason::Accepted => "You are already friends",
                        DuplicateReason::DbDuplicate => "Another request was recorded at the same time",
                    };
                    output.warning(message);
                    if let Some(existing) = existing {
                        output.display(&vec![*existing])?;
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
        FriendCommands::Accept { relationship_id } => {
            let relationship = friendships.accept(&relationship_id, &actor.id).await?;
            output.success("Request accepted");
            output.display(&vec![relationship])?;
        }
        FriendCommands::Reject { relationship_id } => {
            let relationship = friendships.reject(&relationship_id, &actor.id).await?;
            output.success("Request rejected");
            output.display(&vec![relationship])?;
        }
        FriendCommands::Cancel { relationship_id } => {
            friendships.cancel(&relationship_id, &actor.id).await?;
            output.success("Request cancelled");
        }
        FriendCommands::Unfriend { relationship_id } => {
            friendships.unfriend(&relationship_id, &actor.id).await?;
            output.success("Friendship ended");
        }
        FriendCommands::List { kind } => {
            let entries: Vec<_> = match kind {
                ListKind::Friends => friendships.list_friends(&actor.id).await?.collect(),
                ListKind::Incoming => friendships.list_incoming(&actor.id).await?.collect(),
                ListKind::Outgoing => friendships.list_outgoing(&actor.id).await?.collect(),
            };
            output.heading(&format!("{kind:?} ({})", entries.len()));
            output.display(&entries)?;
        }
    }

    Ok(())
}
