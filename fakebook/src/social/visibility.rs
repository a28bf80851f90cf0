use crate::models::{Post, Visibility};

/// Whether `viewer_id` may see `post`.
///
/// `are_friends` is only consulted for friends-visibility posts seen by
/// someone other than the author, so callers can pass a lazily computed answer
/// or `false` when no friendship lookup was made. Anonymous viewers see public
/// posts only.
pub fn can_view_post(viewer_id: Option<&str>, post: &Post, are_friends: bool) -> bool {
    if viewer_id == Some(post.author_id.as_str()) {
        return true;
    }
    match post.visibility {
        Visibility::Public => true,
        Visibility::Friends => viewer_id.is_some() && are_friends,
        Visibility::Private => false,
    }
}

/// True when `can_view_post` needs a friendship answer for this viewer.
pub(crate) fn needs_friendship(viewer_id: Option<&str>, post: &Post) -> bool {
    post.visibility == Visibility::Friends && viewer_id.is_some_and(|viewer| viewer != post.author_id)
}
