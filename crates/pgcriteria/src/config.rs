use std::time::Duration;
use tracing::Level;

/// Execution settings for [`crate::exec`].
///
/// By default there is no timeout, statements are logged at DEBUG with SQL
/// truncated to 200 bytes, and nothing counts as slow.
#[derive(Debug, Clone)]
pub struct ExecConfig {
    /// Query timeout duration. `None` means no timeout (default).
    pub query_timeout: Option<Duration>,
    /// Statements at least this slow are logged at WARN.
    pub slow_query_threshold: Option<Duration>,
    /// Level of the per-statement event.
    pub log_level: Level,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            query_timeout: None,
            slow_query_threshold: None,
            log_level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl ExecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the query timeout duration.
    ///
    /// Statements exceeding it are cancelled server-side and return
    /// [`crate::SqlError::Timeout`].
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Log full SQL text.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate_sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => {
                let mut end = max;
                while end > 0 && !sql.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}...", &sql[..end]).into()
            }
            _ => sql.into(),
        }
    }

    pub(crate) fn is_slow(&self, elapsed: Duration) -> bool {
        self.slow_query_threshold.is_some_and(|t| elapsed >= t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExecConfig::new();
        assert!(c.query_timeout.is_none());
        assert_eq!(c.log_level, Level::DEBUG);
        assert_eq!(c.max_sql_length, Some(200));
        assert!(!c.is_slow(Duration::from_secs(60)));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let c = ExecConfig::new().with_max_sql_length(4);
        assert_eq!(c.truncate_sql("SELECT 1"), "SELE...");
        assert_eq!(c.truncate_sql("abcé"), "abc...");
        assert_eq!(c.truncate_sql("abc"), "abc");
        assert_eq!(ExecConfig::new().no_truncate().truncate_sql("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn slow_threshold() {
        let c = ExecConfig::new().with_slow_query_threshold(Duration::from_millis(100));
        assert!(c.is_slow(Duration::from_millis(100)));
        assert!(!c.is_slow(Duration::from_millis(99)));
    }
}
