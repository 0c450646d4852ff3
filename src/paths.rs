use std::path::PathBuf;

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "yadaw", "yadaw-timeline")
}

/// Location of the editor configuration file, if the platform has a config dir.
pub fn config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("timeline.json"))
}

