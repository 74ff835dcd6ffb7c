/// Store keys of one job, all under the job namespace
///
/// The namespace is `<prefix><job-name>`; every key is `<namespace>:<name>`,
/// so a prefix delete of `<namespace>:` removes the whole run state without
/// touching a job whose name merely starts with the same characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobKeys {
    namespace: String,
    pub queue: String,
    pub error_queue: String,
    pub requesting: String,
    pub retry_count: String,
    pub total: String,
    pub overplus: String,
    pub sets: String,
}

impl JobKeys {
    pub fn new(prefix: &str, job_name: &str) -> Self {
        let namespace = format!("{prefix}{job_name}");
        let key = |name: &str| format!("{namespace}:{name}");

        Self {
            queue: key("queue"),
            error_queue: key("queue:error"),
            requesting: key("requesting"),
            retry_count: key("retry_count"),
            total: key("total"),
            overplus: key("overplus"),
            sets: key("sets"),
            namespace,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Prefix matching every key of this job and nothing else
    pub fn wildcard(&self) -> String {
        format!("{}:", self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let keys = JobKeys::new("crawlbox.", "news");
        assert_eq!(keys.namespace(), "crawlbox.news");
        assert_eq!(keys.queue, "crawlbox.news:queue");
        assert_eq!(keys.error_queue, "crawlbox.news:queue:error");
        assert_eq!(keys.requesting, "crawlbox.news:requesting");
        assert_eq!(keys.retry_count, "crawlbox.news:retry_count");
        assert_eq!(keys.total, "crawlbox.news:total");
        assert_eq!(keys.overplus, "crawlbox.news:overplus");
        assert_eq!(keys.sets, "crawlbox.news:sets");
        assert_eq!(keys.wildcard(), "crawlbox.news:");
    }

    #[test]
    fn test_wildcard_does_not_cover_longer_job_names() {
        let keys = JobKeys::new("crawlbox.", "news");
        let other = JobKeys::new("crawlbox.", "newsroom");
        assert!(!other.queue.starts_with(&keys.wildcard()));
    }
}
