//! Cage construction options

/// Construction options for a [`crate::Cage`].
///
/// Every field is explicit and structurally typed, so an unrecognized option
/// is a compile error rather than a silently-ignored key in a loose config
/// map.
#[derive(Debug, Clone)]
pub struct CageConfig {
    /// This peer's index among `peer_count` peers.
    pub peer_id: usize,
    /// The total number of peers in the network.
    pub peer_count: usize,
    /// The substrate-level address this peer listens on, if applicable to
    /// the communication policy in use (e.g. a socket URI). Mock policies
    /// ignore it.
    pub endpoint_uri: Option<String>,
    /// The address of a coordinating peer used for bootstrap, if the
    /// communication policy needs one.
    pub master_uri: Option<String>,
    /// When set, a directory miss aborts the process instead of returning
    /// [`overlay_core::OverlayError::DirectoryMiss`], for callers that
    /// expect a hard failure rather than a recoverable error.
    pub abort_on_directory_miss: bool,
}

impl CageConfig {
    pub fn new(peer_id: usize, peer_count: usize) -> Self {
        Self {
            peer_id,
            peer_count,
            endpoint_uri: None,
            master_uri: None,
            abort_on_directory_miss: false,
        }
    }
}
