use anyhow::Result;
use clap::Subcommand;
use fakebook::{
    models::Visibility,
    social::{Engagement, LikeState, NewPost, PostService},
};

use super::Session;
use crate::{examples::ExampleGroup, views::relation_label};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Posting",
        commands: &[
            "fakebook --as ana@example.com --password s3cret post create --content 'hello' --visibility friends",
            "fakebook --as ana@example.com --password s3cret post create --image-url https://img.example.com/a.png",
        ],
    },
    ExampleGroup {
        title: "Reading",
        commands: &[
            "fakebook post feed                          # public posts only",
            "fakebook --as ben@example.com --password s3cret post feed",
            "fakebook --as ben@example.com --password s3cret post profile ana@example.com",
        ],
    },
    ExampleGroup {
        title: "Engagement",
        commands: &[
            "fakebook --as ben@example.com --password s3cret post like <post-id>",
            "fakebook --as ben@example.com --password s3cret post comment <post-id> 'nice!'",
        ],
    },
];

#[derive(Subcommand)]
pub enum PostCommands {
    /// Publish a post as the acting user
    #[command(name = "create")]
    Create {
        #[arg(long)]
        content: Option<String>,

        #[arg(long)]
        image_url: Option<String>,

        /// public, friends or private
        #[arg(long, default_value = "public")]
        visibility: Visibility,
    },

    /// Show the posts the acting user (or an anonymous visitor) may see
    #[command(name = "feed")]
    Feed,

    /// Show a user's profile and the posts visible on it
    #[command(name = "profile")]
    Profile {
        /// User id or email
        user: String,
    },

    /// Like a post, or remove your like
    #[command(name = "like")]
    Like { post_id: String },

    /// Comment on a post
    #[command(name = "comment")]
    Comment { post_id: String, content: String },
}

pub async fn handle_post_commands(command: PostCommands, session: &Session<'_>) -> Result<()> {
    let posts = PostService::new(session.store).with_feed_limit(session.config.social.feed_limit);
    let output = session.output;

    match command {
        PostCommands::Create {
            content,
            image_url,
            visibility,
        } => {
            let actor = session.actor()?;
            let post = posts
                .create_post(
                    &actor.id,
                    NewPost {
                        content,
                        image_url,
                        visibility,
                    },
                )
                .await?;
            output.success(&format!("Posted {} ({})", post.id, post.visibility));
            output.display(&vec![post])?;
        }
        PostCommands::Feed => {
            if session.user.is_none() {
                output.info("Not signed in: showing public posts only");
            }
            let feed = posts.feed(session.viewer_id()).await?;
            output.heading(&format!("Feed ({} posts)", feed.len()));
            output.display(&feed)?;
        }
        PostCommands::Profile { user } => {
            let owner_id = session.resolve_user(&user).await?;
            let page = posts.profile_view(session.viewer_id(), &owner_id).await?;
            output.verbose(&format!("relation: {}", relation_label(&page.relation)));
            output.display(&page)?;
        }
        PostCommands::Like { post_id } => {
            let actor = session.actor()?;
            match Engagement::new(session.store).toggle_like(&post_id, &actor.id).await? {
                LikeState::Liked => output.success("Liked"),
                LikeState::Unliked => output.success("Like removed"),
            }
        }
        PostCommands::Comment { post_id, content } => {
            let actor = session.actor()?;
            let comment = Engagement::new(session.store)
                .add_comment(&post_id, &actor.id, &content)
                .await?;
            output.success("Comment added");
            output.display(&vec![comment])?;
        }
    }

    Ok(())
}
