use serde::{Deserialize, Serialize};

use super::Repository;

/// One unit of crawl work: a repository plus the number of attempts that
/// have already failed for it.
///
/// A job is owned by exactly one holder at a time: the queue while pending,
/// a single worker while in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    repository: Repository,
    attempt: u32,
}

impl Job {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            attempt: 0,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn key(&self) -> String {
        self.repository.key()
    }

    /// Attempts that have failed so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// 1-based number of the attempt a worker is about to run
    pub fn current_attempt(&self) -> u32 {
        self.attempt + 1
    }

    /// Record a failed attempt and return the updated count
    pub fn record_failure(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }
}

impl From<Repository> for Job {
    fn from(repository: Repository) -> Self {
        Self::new(repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_counter() {
        let mut job = Job::new(Repository::new("alice", "foo", "u", 1));
        assert_eq!(job.attempt(), 0);
        assert_eq!(job.current_attempt(), 1);
        assert_eq!(job.record_failure(), 1);
        assert_eq!(job.current_attempt(), 2);
        assert_eq!(job.key(), "alice:foo");
    }
}
