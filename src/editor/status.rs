use time::OffsetDateTime;

/// Observable save state of one editing session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveStatus {
    /// A remote save is in flight.
    pub saving: bool,
    /// The server has not seen the latest edit.
    pub dirty: bool,
    /// Persistent, non-blocking remote sync problem shown to the user.
    pub sync_issue: Option<String>,
    /// Last local persistence failure; the edit is still held in memory.
    pub local_error: Option<String>,
    pub last_local_save: Option<OffsetDateTime>,
    pub last_remote_save: Option<OffsetDateTime>,
    pub consecutive_failures: u32,
}

impl SaveStatus {
    pub fn is_clean(&self) -> bool {
        !self.dirty && !self.saving && self.sync_issue.is_none()
    }
}
