use std::collections::{HashMap, HashSet};

use super::{UserId, VideoId};

/// Watch history per user, kept in load order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPreferences {
    /// Users in first-seen order
    users: Vec<UserId>,
    watched: HashMap<UserId, History>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct History {
    order: Vec<VideoId>,
    seen: HashSet<VideoId>,
}

impl History {
    fn push(&mut self, video_id: VideoId) {
        if self.seen.insert(video_id.clone()) {
            self.order.push(video_id);
        }
    }
}

impl UserPreferences {
    /// Creates empty preferences
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a user watched a video
    ///
    /// Repeat views keep the position of the first one.
    pub fn add_watched(&mut self, user_id: UserId, video_id: VideoId) {
        if !self.watched.contains_key(&user_id) {
            self.users.push(user_id.clone());
        }
        self.watched.entry(user_id).or_default().push(video_id);
    }

    /// Watched videos for a user, if the user is known
    pub fn watched(&self, user_id: &UserId) -> Option<&[VideoId]> {
        self.watched.get(user_id).map(|history| history.order.as_slice())
    }

    pub fn contains_user(&self, user_id: &UserId) -> bool {
        self.watched.contains_key(user_id)
    }

    /// Users in first-seen order
    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
