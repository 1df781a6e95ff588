/// One append-only warn audit record.
#[derive(Clone, Debug)]
pub struct WarnLogEntry {
    pub user_id: u64,
    pub reason: String,
    /// "system" for heuristic enforcement, otherwise a moderator tag.
    pub issued_by: String,
    pub created_at: u64,
}
