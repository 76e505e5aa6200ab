use crate::mock;
use crate::models::{Notification, NotificationDraft, NotificationQuery};
use crate::{Error, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// In-process notification state for the mock and local paths
///
/// Per-user lists behind one Mutex, seeded lazily from the built-in data the
/// first time a user shows up. Everything that touches read-state runs under
/// the same lock, which is what makes mark_all_read atomic with respect to
/// the unread count: no caller ever observes a half-flipped list.
pub struct NotificationManager {
    users: Mutex<HashMap<String, Vec<Notification>>>,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<Notification>>>> {
        self.users
            .lock()
            .map_err(|_| Error::Store("notification mutex poisoned".into()))
    }

    /// Newest first; unread filter applies before the limit/offset window
    pub fn list(&self, user_id: &str, query: &NotificationQuery) -> Result<Vec<Notification>> {
        let mut users = self.lock()?;
        let list = users
            .entry(user_id.to_string())
            .or_insert_with(|| mock::mock_notifications(user_id));

        let mut out: Vec<Notification> = list
            .iter()
            .filter(|n| !query.unread_only || !n.read)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if let Some(offset) = query.offset {
            out = out.into_iter().skip(offset).collect();
        }
        if let Some(limit) = query.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    pub fn count_unread(&self, user_id: &str) -> Result<usize> {
        let mut users = self.lock()?;
        let list = users
            .entry(user_id.to_string())
            .or_insert_with(|| mock::mock_notifications(user_id));
        Ok(list.iter().filter(|n| !n.read).count())
    }

    /// One-way transition; returns whether anything actually flipped.
    /// Marking an already-read notification is a no-op and leaves read_at
    /// exactly as it was.
    pub fn mark_read(&self, notification_id: &str) -> Result<bool> {
        let mut users = self.lock()?;
        for list in users.values_mut() {
            if let Some(n) = list.iter_mut().find(|n| n.id == notification_id) {
                if n.read {
                    return Ok(false);
                }
                n.read = true;
                n.read_at = Some(Utc::now());
                debug!("Marked notification {} read", notification_id);
                return Ok(true);
            }
        }
        Err(Error::NotFound(format!("notification {}", notification_id)))
    }

    /// Flip every unread notification for a user in one step. Returns how
    /// many flipped.
    pub fn mark_all_read(&self, user_id: &str) -> Result<usize> {
        let mut users = self.lock()?;
        let list = users
            .entry(user_id.to_string())
            .or_insert_with(|| mock::mock_notifications(user_id));

        let now = Utc::now();
        let mut flipped = 0;
        for n in list.iter_mut().filter(|n| !n.read) {
            n.read = true;
            n.read_at = Some(now);
            flipped += 1;
        }
        debug!("Marked {} notifications read for {}", flipped, user_id);
        Ok(flipped)
    }

    /// Store a new notification at the head of the user's list
    pub fn create(&self, draft: NotificationDraft) -> Result<Notification> {
        draft.validate()?;

        let now = Utc::now();
        let frag = uuid::Uuid::new_v4().simple().to_string();
        let notification = Notification {
            id: format!("ntf-{}-{}", now.timestamp_millis(), &frag[..8]),
            user_id: draft.user_id.clone(),
            kind: draft.kind,
            priority: draft.priority,
            title: draft.title,
            body: draft.body,
            read: false,
            read_at: None,
            related: draft.related,
            created_at: now,
        };

        let mut users = self.lock()?;
        users
            .entry(draft.user_id)
            .or_default()
            .insert(0, notification.clone());
        Ok(notification)
    }
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NotificationKind, Priority};

    fn draft(user: &str, title: &str) -> NotificationDraft {
        NotificationDraft {
            user_id: user.to_string(),
            kind: NotificationKind::System,
            priority: Priority::Low,
            title: title.to_string(),
            body: String::new(),
            related: None,
        }
    }

    #[test]
    fn seeds_lazily_and_lists_newest_first() {
        let m = NotificationManager::new();
        let list = m.list("u1", &NotificationQuery::new()).unwrap();
        assert!(!list.is_empty());
        for pair in list.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[test]
    fn count_matches_unread_list_length() {
        let m = NotificationManager::new();
        let check = |m: &NotificationManager| {
            let unread = m
                .list("u1", &NotificationQuery::new().unread_only())
                .unwrap();
            assert_eq!(m.count_unread("u1").unwrap(), unread.len());
        };

        check(&m);
        let unread = m
            .list("u1", &NotificationQuery::new().unread_only())
            .unwrap();
        m.mark_read(&unread[0].id).unwrap();
        check(&m);
        m.create(draft("u1", "Another")).unwrap();
        check(&m);
        m.mark_all_read("u1").unwrap();
        check(&m);
    }

    #[test]
    fn mark_read_is_idempotent_and_pins_read_at() {
        let m = NotificationManager::new();
        let before = m.count_unread("u1").unwrap();
        assert_eq!(before, 3);

        let unread = m
            .list("u1", &NotificationQuery::new().unread_only())
            .unwrap();
        let id = unread[0].id.clone();

        assert!(m.mark_read(&id).unwrap());
        assert_eq!(m.count_unread("u1").unwrap(), 2);

        let read_at = m
            .list("u1", &NotificationQuery::new())
            .unwrap()
            .into_iter()
            .find(|n| n.id == id)
            .unwrap()
            .read_at;
        assert!(read_at.is_some());

        // Second call: no-op, count unchanged, read_at untouched
        assert!(!m.mark_read(&id).unwrap());
        assert_eq!(m.count_unread("u1").unwrap(), 2);
        let read_at_after = m
            .list("u1", &NotificationQuery::new())
            .unwrap()
            .into_iter()
            .find(|n| n.id == id)
            .unwrap()
            .read_at;
        assert_eq!(read_at, read_at_after);
    }

    #[test]
    fn mark_all_read_zeroes_the_count() {
        let m = NotificationManager::new();
        m.create(draft("u2", "One")).unwrap();
        m.create(draft("u2", "Two")).unwrap();
        assert!(m.count_unread("u2").unwrap() >= 2);

        m.mark_all_read("u2").unwrap();
        assert_eq!(m.count_unread("u2").unwrap(), 0);

        // Running it again is harmless
        assert_eq!(m.mark_all_read("u2").unwrap(), 0);
    }

    #[test]
    fn unread_filter_applies_before_the_window() {
        let m = NotificationManager::new();
        for i in 0..5 {
            m.create(draft("u3", &format!("n{}", i))).unwrap();
        }
        m.mark_all_read("u3").unwrap();
        for i in 5..8 {
            m.create(draft("u3", &format!("n{}", i))).unwrap();
        }

        let page = m
            .list("u3", &NotificationQuery::new().unread_only().limit(2).offset(1))
            .unwrap();
        assert_eq!(page.len(), 2);
        assert!(page.iter().all(|n| !n.read));
        // Window over the filtered set: newest unread is n7, offset 1 starts at n6
        assert_eq!(page[0].title, "n6");
        assert_eq!(page[1].title, "n5");
    }

    #[test]
    fn create_assigns_distinct_ids() {
        let m = NotificationManager::new();
        let a = m.create(draft("u4", "A")).unwrap();
        let b = m.create(draft("u4", "B")).unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("ntf-"));
        assert!(!a.read);
        assert!(a.read_at.is_none());
    }

    #[test]
    fn unknown_user_mark_read_is_not_found() {
        let m = NotificationManager::new();
        assert!(m.mark_read("ntf-does-not-exist").is_err());
    }
}
