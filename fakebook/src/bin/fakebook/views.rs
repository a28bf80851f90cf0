use comfy_table::Table;
use fakebook::{
    models::{Comment, Post, Relationship, UserProfile},
    social::{FeedPost, ProfilePage, RelationView, RelationshipEntry},
};

use crate::output::{GlobalOptions, TableDisplay, TableRow, themed_table};

fn short_time(at: &chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

fn excerpt(text: Option<&str>, max: usize) -> String {
    let text = text.unwrap_or("");
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

impl TableRow for UserProfile {
    const HEADERS: &'static [&'static str] = &["ID", "Name", "Email", "Bio", "Joined"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.email.clone(),
            excerpt(self.bio.as_deref(), 40),
            short_time(&self.created_at),
        ]
    }

    fn compact(&self) -> String {
        format!("{} {} <{}>", self.id, self.name, self.email)
    }
}

impl TableRow for Relationship {
    const HEADERS: &'static [&'static str] = &["ID", "Requester", "Recipient", "Status", "Updated"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.requester.clone(),
            self.recipient.clone(),
            self.status.to_string(),
            short_time(&self.updated_at),
        ]
    }
}

impl TableRow for RelationshipEntry {
    const HEADERS: &'static [&'static str] = &["ID", "With", "Email", "Status", "Since"];

    fn cells(&self) -> Vec<String> {
        let (name, email) = match &self.counterpart {
            Some(profile) => (profile.name.clone(), profile.email.clone()),
            None => ("(deleted user)".to_string(), String::new()),
        };
        vec![
            self.relationship.id.clone(),
            name,
            email,
            self.relationship.status.to_string(),
            short_time(&self.relationship.updated_at),
        ]
    }
}

impl TableRow for Post {
    const HEADERS: &'static [&'static str] = &["ID", "Author", "Visibility", "Content", "Posted"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.author_id.clone(),
            self.visibility.to_string(),
            excerpt(self.content.as_deref().or(self.image_url.as_deref()), 60),
            short_time(&self.created_at),
        ]
    }
}

impl TableRow for Comment {
    const HEADERS: &'static [&'static str] = &["ID", "Post", "Author", "Comment", "Posted"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.post_id.clone(),
            self.author_id.clone(),
            excerpt(Some(&self.content), 60),
            short_time(&self.created_at),
        ]
    }
}

impl TableRow for FeedPost {
    const HEADERS: &'static [&'static str] = &["ID", "Author", "Visibility", "Content", "Likes", "Comments", "Posted"];

    fn cells(&self) -> Vec<String> {
        let author = self
            .author
            .as_ref()
            .map_or_else(|| self.post.author_id.clone(), |profile| profile.name.clone());
        let mut content = excerpt(self.post.content.as_deref(), 60);
        if let Some(image) = &self.post.image_url {
            if !content.is_empty() {
                content.push('\n');
            }
            content.push_str(image);
        }
        vec![
            self.post.id.clone(),
            author,
            self.post.visibility.to_string(),
            content,
            self.likes.len().to_string(),
            self.comments.len().to_string(),
            short_time(&self.post.created_at),
        ]
    }

    fn compact(&self) -> String {
        format!(
            "{} [{}] {} ({} likes, {} comments)",
            self.post.id,
            self.post.visibility,
            excerpt(self.post.content.as_deref(), 60),
            self.likes.len(),
            self.comments.len()
        )
    }
}

pub fn relation_label(relation: &RelationView) -> &'static str {
    match relation {
        RelationView::Anonymous => "not signed in",
        RelationView::Own => "this is you",
        RelationView::Friends { .. } => "friends",
        RelationView::RequestSent { .. } => "request sent",
        RelationView::RequestReceived { .. } => "request received",
        RelationView::Rejected { .. } => "request rejected",
        RelationView::Strangers => "not friends",
    }
}

impl TableDisplay for ProfilePage {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options, &["Field", "Value"]);
        table.add_row(vec!["Name".to_string(), self.profile.name.clone()]);
        table.add_row(vec!["Email".to_string(), self.profile.email.clone()]);
        if let Some(bio) = &self.profile.bio {
            table.add_row(vec!["Bio".to_string(), bio.clone()]);
        }
        table.add_row(vec!["Relation".to_string(), relation_label(&self.relation).to_string()]);
        table.add_row(vec!["Posts".to_string(), self.posts.to_table(options).to_string()]);
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "{} <{}> {} posts, {}",
            self.profile.name,
            self.profile.email,
            self.posts.len(),
            relation_label(&self.relation)
        )
    }
}
