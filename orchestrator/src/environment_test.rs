use crate::config::EnvironmentConfig;
use crate::environment::{EnvironmentError, ExecutionContext, ToolchainEnvironment};
use std::{env, fs, path::PathBuf};

/// envs root with a single activatable environment under it, removed
/// again by the caller
fn stage_envs_root(test: &str, name: &str) -> PathBuf {
    let root = env::temp_dir().join(format!("wavecal-{test}-{}", std::process::id()));
    fs::create_dir_all(root.join(name).join("bin")).unwrap();

    root
}

#[test]
pub fn acquire_fails_for_missing_toolchain() {
    let mut context = ToolchainEnvironment::new(&EnvironmentConfig {
        name: "covid19model".to_owned(),
        envs_root: PathBuf::from("/nonexistent/envs"),
    });

    let error = context.acquire().unwrap_err();

    assert!(matches!(error, EnvironmentError::Unavailable(name, _) if name == "covid19model"));
    assert!(context.vars().is_empty());
}

#[test]
pub fn acquire_exposes_activation_vars() {
    let root = stage_envs_root("acquire", "calib");
    let mut context = ToolchainEnvironment::new(&EnvironmentConfig {
        name: "calib".to_owned(),
        envs_root: root.clone(),
    });

    context.acquire().unwrap();
    let vars = context.vars();

    let path = vars.iter().find(|(key, _)| key == "PATH").unwrap();
    let prefix = root.join("calib");
    assert!(path.1.starts_with(&format!("{}/bin", prefix.display())));
    assert!(vars.contains(&("CONDA_DEFAULT_ENV".to_owned(), "calib".to_owned())));
    assert!(vars.contains(&("CONDA_PREFIX".to_owned(), prefix.display().to_string())));

    fs::remove_dir_all(root).unwrap();
}

#[test]
pub fn release_is_idempotent() {
    let root = stage_envs_root("release", "calib");
    let mut context = ToolchainEnvironment::new(&EnvironmentConfig {
        name: "calib".to_owned(),
        envs_root: root.clone(),
    });

    // releasing before anything was acquired is a no-op
    context.release();

    context.acquire().unwrap();
    context.release();
    context.release();

    assert!(context.vars().is_empty());
    // the context can be acquired again after release
    context.acquire().unwrap();
    assert!(!context.vars().is_empty());

    fs::remove_dir_all(root).unwrap();
}
