use crate::reservation::ResourceReservation;
use std::time::Duration;

#[test]
pub fn default_policy_renders_directives() {
    let reservation = ResourceReservation::default();

    assert_eq!(
        reservation.directives(),
        vec![
            "#SBATCH --nodes=1",
            "#SBATCH --ntasks-per-node=36",
            "#SBATCH --time=72:00:00",
            "#SBATCH --partition=batch",
        ]
    );
}

#[test]
pub fn wall_clock_is_a_duration() {
    let reservation = ResourceReservation {
        wall_clock_secs: 3661,
        ..ResourceReservation::default()
    };

    assert_eq!(reservation.wall_clock(), Duration::from_secs(3661));
    assert!(reservation
        .directives()
        .contains(&"#SBATCH --time=01:01:01".to_owned()));
}

#[test]
pub fn default_policy_passes_preflight() {
    assert!(!ResourceReservation::default().preflight_checks());
}

#[test]
pub fn zero_grants_fail_preflight() {
    let no_nodes = ResourceReservation {
        node_count: 0,
        ..ResourceReservation::default()
    };
    let no_cores = ResourceReservation {
        cores_per_node: 0,
        ..ResourceReservation::default()
    };
    let no_time = ResourceReservation {
        wall_clock_secs: 0,
        ..ResourceReservation::default()
    };

    assert!(no_nodes.preflight_checks());
    assert!(no_cores.preflight_checks());
    assert!(no_time.preflight_checks());
}
