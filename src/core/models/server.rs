/// One active billable Hetzner server instance.
///
/// Fetched fresh each run, never persisted.
#[derive(Debug, Clone)]
pub struct ServerRecord {
    pub id: u64,
    pub name: String,
    pub server_type: String,
    pub location: String,
    pub vcpus: u32,
    pub ram_gb: f64,
}
