//! Users we are waiting on for a team name.

use std::sync::Arc;

use dashmap::DashSet;

/// Users whose next text message should be treated as a team name.
///
/// Set by the "register team" button and cleared once a registration
/// succeeds. Cheap to clone; clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct PendingRegistrations {
    users: Arc<DashSet<i64>>,
}

impl PendingRegistrations {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect a team name from this user.
    pub fn request(&self, user_id: i64) {
        self.users.insert(user_id);
    }

    /// Returns `true` if the next message from this user is a team name.
    pub fn is_pending(&self, user_id: i64) -> bool {
        self.users.contains(&user_id)
    }

    /// Stop waiting for this user.
    pub fn clear(&self, user_id: i64) {
        self.users.remove(&user_id);
    }
}
