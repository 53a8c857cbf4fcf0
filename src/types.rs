use serde::Deserialize;

/// How the installer treats a destination file that already exists.
///
/// - `IfChanged`: hash the bundled asset and the installed file and only copy
///   when they differ (default).
/// - `Always`: copy unconditionally, truncating whatever is there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallMode {
    IfChanged,
    Always,
}

impl Default for InstallMode {
    fn default() -> Self {
        InstallMode::IfChanged
    }
}

/// Where the child's standard error ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StderrMode {
    /// Stderr shares the stdout pipe; lines arrive as `RelayEvent::Line`.
    Combined,
    /// Stderr has its own pipe; lines arrive as `RelayEvent::ErrorLine`.
    Separate,
}

impl Default for StderrMode {
    fn default() -> Self {
        StderrMode::Combined
    }
}

impl StderrMode {
    pub fn from_combine_flag(combine: bool) -> Self {
        if combine {
            StderrMode::Combined
        } else {
            StderrMode::Separate
        }
    }
}
