use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;

use crate::conftool::{Paper, PaperLookup, Result, User};

/// Memoizes paper lists and user details per user id. Entries live until [`clear`].
///
/// [`clear`]: CachedLookup::clear
pub struct CachedLookup<L> {
    inner: L,
    papers: Mutex<HashMap<i64, Vec<Paper>>>,
    users: Mutex<HashMap<i64, User>>,
}

impl<L: PaperLookup> CachedLookup<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            papers: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn clear(&self) {
        self.papers.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.users.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl<L: PaperLookup> PaperLookup for CachedLookup<L> {
    fn papers(&self, user: &User) -> Result<Vec<Paper>> {
        if let Some(hit) = self
            .papers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&user.user_id)
        {
            return Ok(hit.clone());
        }
        let fetched = self.inner.papers(user)?;
        debug!("cached {} paper(s) for user {}", fetched.len(), user.user_id);
        self.papers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user.user_id, fetched.clone());
        Ok(fetched)
    }

    fn detailed_user(&self, user: &User) -> Result<User> {
        if let Some(hit) = self
            .users
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&user.user_id)
        {
            return Ok(hit.clone());
        }
        let fetched = self.inner.detailed_user(user)?;
        self.users
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user.user_id, fetched.clone());
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::conftool::LookupError;

    struct Counting {
        calls: Cell<usize>,
    }

    impl PaperLookup for Counting {
        fn papers(&self, user: &User) -> Result<Vec<Paper>> {
            self.calls.set(self.calls.get() + 1);
            if user.user_id == 0 {
                return Err(LookupError::Response("unknown user".to_string()));
            }
            Ok(vec![Paper {
                paper_id: user.user_id * 10,
                title: format!("Paper of {}", user.username),
                authors_and_affiliations: vec![user.username.clone()],
            }])
        }

        fn detailed_user(&self, user: &User) -> Result<User> {
            self.calls.set(self.calls.get() + 1);
            let mut u = user.clone();
            u.first_name = Some("First".to_string());
            Ok(u)
        }
    }

    #[test]
    fn repeated_lookups_hit_the_cache() {
        let cache = CachedLookup::new(Counting { calls: Cell::new(0) });
        let a = User::new(1, "a");
        let b = User::new(2, "b");

        assert_eq!(cache.paper(&a, 10).expect("paper").title, "Paper of a");
        assert_eq!(cache.papers(&a).expect("papers").len(), 1);
        assert!(matches!(cache.paper(&a, 11), Err(LookupError::PaperNotFound(11))));
        assert_eq!(cache.inner().calls.get(), 1);

        cache.paper(&b, 20).expect("paper");
        cache.detailed_user(&b).expect("user");
        cache.detailed_user(&b).expect("user");
        assert_eq!(cache.inner().calls.get(), 3);

        cache.clear();
        cache.papers(&a).expect("papers");
        assert_eq!(cache.inner().calls.get(), 4);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = CachedLookup::new(Counting { calls: Cell::new(0) });
        let nobody = User::new(0, "nobody");
        assert!(cache.papers(&nobody).is_err());
        assert!(cache.papers(&nobody).is_err());
        assert_eq!(cache.inner().calls.get(), 2);
    }
}
