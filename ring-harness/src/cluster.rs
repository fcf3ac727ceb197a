//! Node lifecycle management.
//!
//! Spawns and kills storage-node processes, one per ring identity, each
//! bound to a private working directory under a per-run root. Process
//! handles are captured at spawn time and kills go through them; a node is
//! never addressed by matching its command line.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::debug;

use ring_types::NodeId;

use crate::config::HarnessConfig;

/// Errors that can occur during node lifecycle operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Directory creation or process launch failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A process is already live under this identity.
    #[error("node {0} is already live")]
    AlreadyLive(NodeId),
}

/// Cluster configuration.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Node launcher executable; the node's private directory is its sole
    /// positional argument.
    pub launcher: PathBuf,
    /// Root under which each identity gets a private subdirectory.
    pub work_root: PathBuf,
    /// Environment overrides applied to every node (maintenance cadences).
    pub env: Vec<(String, String)>,
}

impl ClusterConfig {
    /// Build a cluster configuration from harness configuration, deriving a
    /// unique per-run work root when none is configured.
    pub fn from_harness(config: &HarnessConfig) -> Self {
        let work_root = config.work_root.clone().unwrap_or_else(|| {
            std::env::temp_dir().join(format!("ringtest-{}", uuid::Uuid::new_v4().as_simple()))
        });
        Self {
            launcher: config.launcher.clone(),
            work_root,
            env: config.node_env(),
        }
    }
}

/// Manages the node processes of one harness run.
///
/// Holds the run-local identity counter and a map of live process handles.
/// All allocation happens on the orchestrating task; the counter is plain
/// state on purpose.
pub struct Cluster {
    config: ClusterConfig,
    next_node: u64,
    live: HashMap<NodeId, Child>,
    zombies: Vec<Child>,
}

impl Cluster {
    /// Create a new, empty cluster.
    pub fn new(config: ClusterConfig) -> Self {
        Self {
            config,
            next_node: 0,
            live: HashMap::new(),
            zombies: Vec::new(),
        }
    }

    /// The working-directory root shared by this run's nodes.
    pub fn work_root(&self) -> &Path {
        &self.config.work_root
    }

    /// The private working directory of an identity.
    pub fn node_dir(&self, id: &NodeId) -> PathBuf {
        self.config.work_root.join(id.to_string())
    }

    /// Currently live identities, in ring order.
    pub fn live(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.live.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Derive the next run-unique identity.
    pub fn derive_identity(&mut self) -> NodeId {
        let id = NodeId::derive(self.next_node);
        self.next_node += 1;
        id
    }

    /// Spawn a node under a freshly derived identity.
    pub async fn spawn(&mut self) -> Result<NodeId, ClusterError> {
        let id = self.derive_identity();
        self.spawn_as(id).await?;
        Ok(id)
    }

    /// Spawn a node under an explicit identity.
    ///
    /// Spawning an identity that was killed earlier reincarnates the node:
    /// a new process over the same identity and residual on-disk state.
    pub async fn spawn_as(&mut self, id: NodeId) -> Result<(), ClusterError> {
        if self.live.contains_key(&id) {
            return Err(ClusterError::AlreadyLive(id));
        }
        let dir = self.node_dir(&id);
        tokio::fs::create_dir_all(&dir).await?;

        let mut command = Command::new(&self.config.launcher);
        command
            .arg(&dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        for (key, value) in &self.config.env {
            command.env(key, value);
        }
        let child = command.spawn()?;
        debug!(node = %id, dir = %dir.display(), "node spawned");
        self.live.insert(id, child);
        Ok(())
    }

    /// Request termination of a node. Best-effort and asynchronous: return
    /// does not guarantee the process is gone, callers observe the effect
    /// through the monitoring gateway. Residual on-disk state is kept.
    pub fn kill(&mut self, id: &NodeId) {
        if let Some(mut child) = self.live.remove(id) {
            let _ = child.start_kill();
            self.zombies.push(child);
            debug!(node = %id, "kill requested");
        }
    }

    /// Kill every live node.
    pub fn kill_all(&mut self) {
        for id in self.live() {
            self.kill(&id);
        }
    }

    /// Await every killed process, releasing its OS resources.
    pub async fn reap(&mut self) {
        for mut zombie in self.zombies.drain(..) {
            let _ = zombie.wait().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(work_root: &Path) -> ClusterConfig {
        ClusterConfig {
            // exits immediately, but spawning still succeeds
            launcher: PathBuf::from("true"),
            work_root: work_root.to_path_buf(),
            env: vec![("RING_RESYNC_INTERVAL".into(), "5".into())],
        }
    }

    #[test]
    fn identities_are_unique_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut cluster = Cluster::new(test_config(dir.path()));
        let a = cluster.derive_identity();
        let b = cluster.derive_identity();
        assert_ne!(a, b);
    }

    #[test]
    fn node_dir_is_keyed_by_identity() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = Cluster::new(test_config(dir.path()));
        let id = NodeId::derive(0);
        assert_eq!(cluster.node_dir(&id), dir.path().join(id.to_string()));
    }

    #[tokio::test]
    async fn spawn_tracks_the_identity_and_creates_its_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut cluster = Cluster::new(test_config(dir.path()));

        let id = cluster.spawn().await.unwrap();
        assert_eq!(cluster.live(), vec![id]);
        assert!(cluster.node_dir(&id).is_dir());

        cluster.kill_all();
        cluster.reap().await;
        assert!(cluster.live().is_empty());
    }

    #[tokio::test]
    async fn double_spawn_of_one_identity_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut cluster = Cluster::new(test_config(dir.path()));

        let id = cluster.spawn().await.unwrap();
        let err = cluster.spawn_as(id).await.unwrap_err();
        assert!(matches!(err, ClusterError::AlreadyLive(other) if other == id));

        cluster.kill_all();
        cluster.reap().await;
    }

    #[tokio::test]
    async fn killed_identity_can_reincarnate() {
        let dir = tempfile::tempdir().unwrap();
        let mut cluster = Cluster::new(test_config(dir.path()));

        let id = cluster.spawn().await.unwrap();
        cluster.kill(&id);
        assert!(cluster.live().is_empty());

        cluster.spawn_as(id).await.unwrap();
        assert_eq!(cluster.live(), vec![id]);

        cluster.kill_all();
        cluster.reap().await;
    }

    #[tokio::test]
    async fn missing_launcher_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.launcher = PathBuf::from("/nonexistent/start-ring-node");
        let mut cluster = Cluster::new(config);

        let err = cluster.spawn().await.unwrap_err();
        assert!(matches!(err, ClusterError::Io(_)));
        assert!(cluster.live().is_empty());
    }
}
