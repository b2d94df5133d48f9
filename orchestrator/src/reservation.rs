use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::error;

/// Compute grant the run is submitted under. The grant is held by the
/// host scheduler for the run's whole duration and released by the
/// host at completion or timeout, never by the orchestrator.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ResourceReservation {
    #[serde(default = "default_node_count")]
    pub node_count: u32,
    #[serde(default = "default_cores_per_node")]
    pub cores_per_node: u32,
    #[serde(default = "default_wall_clock_secs")]
    pub wall_clock_secs: u64,
    #[serde(default = "default_cluster_partition")]
    pub cluster_partition: String,
}

impl Default for ResourceReservation {
    fn default() -> Self {
        Self {
            node_count: default_node_count(),
            cores_per_node: default_cores_per_node(),
            wall_clock_secs: default_wall_clock_secs(),
            cluster_partition: default_cluster_partition(),
        }
    }
}

impl ResourceReservation {
    pub fn wall_clock(&self) -> Duration {
        Duration::from_secs(self.wall_clock_secs)
    }

    /// Host batch directives describing the grant. These are attached
    /// to the submission log as declaration only, the scheduler is the
    /// one that interprets and enforces them.
    pub fn directives(&self) -> Vec<String> {
        vec![
            format!("#SBATCH --nodes={}", self.node_count),
            format!("#SBATCH --ntasks-per-node={}", self.cores_per_node),
            format!("#SBATCH --time={}", format_wall_clock(self.wall_clock_secs)),
            format!("#SBATCH --partition={}", self.cluster_partition),
        ]
    }

    pub fn preflight_checks(&self) -> bool {
        let mut contains_error = false;

        if self.node_count == 0 {
            error!("reservation.node_count cannot be 0");
            contains_error = true;
        }

        if self.cores_per_node == 0 {
            error!("reservation.cores_per_node cannot be 0");
            contains_error = true;
        }

        if self.wall_clock_secs == 0 {
            error!("reservation.wall_clock_secs cannot be 0, the host would kill the run on arrival");
            contains_error = true;
        }

        if self.cluster_partition.is_empty() {
            error!("reservation.cluster_partition cannot be empty");
            contains_error = true;
        }

        contains_error
    }
}

/// render seconds as the scheduler's HH:MM:SS wall-clock format
fn format_wall_clock(secs: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

fn default_node_count() -> u32 {
    1
}

fn default_cores_per_node() -> u32 {
    36
}

fn default_wall_clock_secs() -> u64 {
    // 72 hours, the longest queue the calibration partition offers
    72 * 3600
}

fn default_cluster_partition() -> String {
    String::from("batch")
}
