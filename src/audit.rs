//! Audit trail for executed commands

/// Sink for per-turn audit entries
pub trait AuditSink {
    fn log_command(&self, user_id: u64, text: &str, category: &str, success: bool);
}

/// Default sink: structured log lines via tracing
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn log_command(&self, user_id: u64, text: &str, category: &str, success: bool) {
        let status = if success { "SUCCESS" } else { "FAILED" };
        tracing::info!(
            user_id,
            category,
            status,
            "[{}] user {}: {}",
            status,
            user_id,
            text
        );
    }
}

/// Sink that drops everything; for tests and one-shot invocations
pub struct NullAudit;

impl AuditSink for NullAudit {
    fn log_command(&self, _user_id: u64, _text: &str, _category: &str, _success: bool) {}
}
