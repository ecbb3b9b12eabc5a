use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Short-lived per-commit claims that stop two deliveries for the same
/// commit, handled by this process close together, from both triggering.
///
/// Only covers this process; another instance behind the same webhook can
/// still race.
pub struct CommitClaims {
    /// claim time per (project id, commit sha)
    claims: HashMap<(u64, String), Instant>,
    window: Duration,
}

impl CommitClaims {
    pub fn new(window: Duration) -> Self {
        Self {
            claims: HashMap::new(),
            window,
        }
    }

    /// Claims the commit for triggering.
    /// Returns `true` if it was free, `false` if claimed within the window.
    pub fn try_claim(&mut self, project_id: u64, sha: &str) -> bool {
        self.try_claim_at(project_id, sha, Instant::now())
    }

    fn try_claim_at(&mut self, project_id: u64, sha: &str, now: Instant) -> bool {
        if self.window.is_zero() {
            return true;
        }

        let window = self.window;
        self.claims
            .retain(|_, claimed_at| now.duration_since(*claimed_at) < window);

        let key = (project_id, sha.to_string());
        if self.claims.contains_key(&key) {
            false
        } else {
            self.claims.insert(key, now);
            true
        }
    }

    /// Drops a claim so a redelivery of the same event can try again.
    pub fn release(&mut self, project_id: u64, sha: &str) {
        self.claims.remove(&(project_id, sha.to_string()));
    }
}

/// `CommitClaims` shared between concurrently handled deliveries.
#[derive(Clone)]
pub struct SharedClaims {
    inner: Arc<Mutex<CommitClaims>>,
}

impl SharedClaims {
    pub fn new(window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CommitClaims::new(window))),
        }
    }

    /// Claims the commit, or returns `None` if it is already claimed.
    ///
    /// The claim is released when the returned guard drops, including when
    /// the owning request future is cancelled, unless it was committed.
    pub fn claim(&self, project_id: u64, sha: &str) -> Option<ClaimGuard> {
        let claimed = match self.inner.lock() {
            Ok(mut claims) => claims.try_claim(project_id, sha),
            Err(poisoned) => poisoned.into_inner().try_claim(project_id, sha),
        };
        claimed.then(|| ClaimGuard {
            claims: Arc::clone(&self.inner),
            project_id,
            sha: sha.to_string(),
            committed: false,
        })
    }
}

pub struct ClaimGuard {
    claims: Arc<Mutex<CommitClaims>>,
    project_id: u64,
    sha: String,
    committed: bool,
}

impl ClaimGuard {
    /// Keep the claim for the rest of its window: the pipeline was started.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match self.claims.lock() {
            Ok(mut claims) => claims.release(self.project_id, &self.sha),
            Err(poisoned) => poisoned.into_inner().release(self.project_id, &self.sha),
        }
    }
}
