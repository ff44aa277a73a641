//! Shell launch configuration.
//!
//! [`resolve_launch_config`] turns a "new terminal" request into the
//! immutable [`LaunchConfig`] a session keeps for its whole life. Resolution is
//! pure: the platform, settings, bridge variables and overrides are all
//! inputs, and the only code that reads the process environment is
//! [`EnvOverrides::from_process_env`].
//!
//! # Environment
//!
//! Child environments are described by an [`EnvironmentPolicy`]. Terminals are
//! always launched `Additive`: the inherited environment plus the bridge's
//! variables. On Linux, an application bundle launcher may have rewritten
//! `PATH` and `LD_LIBRARY_PATH` for the editor itself, stashing the user's
//! values in `ONI2_ORIG_PATH` and `ONI2_ORIG_LD_LIBRARY_PATH`. When both are
//! present they are restored for the shell ahead of the bridge variables.
//!
//! ```
//! use oni_terminal::config::{PlatformFamily, TerminalSettings};
//! use oni_terminal::launch::{resolve_launch_config, BridgeEnvironment, EnvOverrides};
//!
//! let config = resolve_launch_config(
//!     PlatformFamily::Linux,
//!     &TerminalSettings::default(),
//!     Some("bash"),
//!     &BridgeEnvironment::default(),
//!     &EnvOverrides::default(),
//! );
//! assert_eq!(config.executable, "bash");
//! assert!(config.arguments.is_empty());
//! ```

use crate::config::{PlatformFamily, TerminalSettings};
use std::collections::BTreeMap;

/// Name given to every terminal launch.
pub const LAUNCH_NAME: &str = "Terminal";

pub const ORIG_PATH_VAR: &str = "ONI2_ORIG_PATH";
pub const ORIG_LD_LIBRARY_PATH_VAR: &str = "ONI2_ORIG_LD_LIBRARY_PATH";
pub const BUILD_VERSION_VAR: &str = "ONI2_BUILD_VERSION";
pub const PARENT_PIPE_VAR: &str = "ONI2_PARENT_PIPE";

/// How a child's environment is derived from the editor's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentPolicy {
    /// Inherit the editor's environment and set these variables on top.
    Additive(BTreeMap<String, String>),

    /// Start from an empty environment containing only these variables.
    Replace(BTreeMap<String, String>),
}

impl EnvironmentPolicy {
    /// The variables the policy sets.
    pub fn variables(&self) -> &BTreeMap<String, String> {
        match self {
            EnvironmentPolicy::Additive(vars) | EnvironmentPolicy::Replace(vars) => vars,
        }
    }
}

/// Everything needed to start a shell, fixed at session creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub name: String,
    pub executable: String,
    pub arguments: Vec<String>,
    pub env: EnvironmentPolicy,
}

/// Variables the bridge always passes to its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeEnvironment {
    /// Editor build version.
    pub build_version: String,

    /// Descriptor of the channel back to the editor process, if any.
    pub parent_pipe: Option<String>,

    /// Extra variables set by the host.
    pub extra: BTreeMap<String, String>,
}

impl Default for BridgeEnvironment {
    fn default() -> Self {
        Self {
            build_version: env!("CARGO_PKG_VERSION").to_string(),
            parent_pipe: None,
            extra: BTreeMap::new(),
        }
    }
}

impl BridgeEnvironment {
    /// The bridge's default variable map.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut vars = self.extra.clone();
        vars.insert(BUILD_VERSION_VAR.to_string(), self.build_version.clone());
        if let Some(pipe) = &self.parent_pipe {
            vars.insert(PARENT_PIPE_VAR.to_string(), pipe.clone());
        }
        vars
    }
}

/// The user's original search paths, stashed by the Linux bundle launcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub orig_path: Option<String>,
    pub orig_ld_library_path: Option<String>,
}

impl EnvOverrides {
    /// Reads the two override variables from the current process.
    pub fn from_process_env() -> Self {
        Self {
            orig_path: std::env::var(ORIG_PATH_VAR).ok(),
            orig_ld_library_path: std::env::var(ORIG_LD_LIBRARY_PATH_VAR).ok(),
        }
    }

    /// `PATH`/`LD_LIBRARY_PATH` to restore, only when both were stashed.
    fn sanitized(&self) -> Option<BTreeMap<String, String>> {
        let path = self.orig_path.as_ref()?;
        let ld_library_path = self.orig_ld_library_path.as_ref()?;
        Some(BTreeMap::from([
            ("PATH".to_string(), path.clone()),
            ("LD_LIBRARY_PATH".to_string(), ld_library_path.clone()),
        ]))
    }
}

/// Merges ordered variable maps; the first source that defines a key wins.
///
/// ```
/// use std::collections::BTreeMap;
/// use oni_terminal::launch::merge_first_wins;
///
/// let first = BTreeMap::from([("PATH".to_string(), "/usr/bin".to_string())]);
/// let second = BTreeMap::from([
///     ("PATH".to_string(), "/opt/bin".to_string()),
///     ("HOME".to_string(), "/root".to_string()),
/// ]);
/// let merged = merge_first_wins([&first, &second]);
/// assert_eq!(merged["PATH"], "/usr/bin");
/// assert_eq!(merged["HOME"], "/root");
/// ```
pub fn merge_first_wins<'a>(
    sources: impl IntoIterator<Item = &'a BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    for source in sources {
        for (key, value) in source {
            merged
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
    merged
}

/// Environment policy for a terminal launched on `platform`.
pub fn resolve_environment(
    platform: PlatformFamily,
    bridge_env: &BridgeEnvironment,
    overrides: &EnvOverrides,
) -> EnvironmentPolicy {
    let defaults = bridge_env.to_map();
    let sanitized = match platform {
        PlatformFamily::Linux => overrides.sanitized(),
        PlatformFamily::Windows | PlatformFamily::MacOs | PlatformFamily::Other => None,
    };
    let vars = match sanitized {
        Some(sanitized) => merge_first_wins([&sanitized, &defaults]),
        None => defaults,
    };
    EnvironmentPolicy::Additive(vars)
}

/// Resolves the executable, arguments and environment for a new terminal.
///
/// An explicit `command` is used verbatim; otherwise the per-platform shell
/// setting applies. Arguments always come from the per-platform setting.
pub fn resolve_launch_config(
    platform: PlatformFamily,
    settings: &TerminalSettings,
    command: Option<&str>,
    bridge_env: &BridgeEnvironment,
    overrides: &EnvOverrides,
) -> LaunchConfig {
    let executable = command
        .unwrap_or_else(|| settings.shell_for(platform))
        .to_string();

    LaunchConfig {
        name: LAUNCH_NAME.to_string(),
        executable,
        arguments: settings.shell_args_for(platform).to_vec(),
        env: resolve_environment(platform, bridge_env, overrides),
    }
}

/// Inputs shared by every session creation.
#[derive(Debug, Clone)]
pub struct LaunchContext {
    pub platform: PlatformFamily,
    pub settings: TerminalSettings,
    pub bridge_env: BridgeEnvironment,
    pub overrides: EnvOverrides,
}

impl LaunchContext {
    /// Context for the running process: current platform, overrides read
    /// from the environment.
    pub fn for_current_process(settings: TerminalSettings, bridge_env: BridgeEnvironment) -> Self {
        Self {
            platform: PlatformFamily::current(),
            settings,
            bridge_env,
            overrides: EnvOverrides::from_process_env(),
        }
    }

    /// Resolves the launch configuration for an optional explicit command.
    pub fn resolve(&self, command: Option<&str>) -> LaunchConfig {
        resolve_launch_config(
            self.platform,
            &self.settings,
            command,
            &self.bridge_env,
            &self.overrides,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(path: Option<&str>, ld: Option<&str>) -> EnvOverrides {
        EnvOverrides {
            orig_path: path.map(str::to_string),
            orig_ld_library_path: ld.map(str::to_string),
        }
    }

    fn bridge_with_paths() -> BridgeEnvironment {
        BridgeEnvironment {
            build_version: "1.2.3".to_string(),
            parent_pipe: Some("/tmp/oni.sock".to_string()),
            extra: BTreeMap::from([
                ("PATH".to_string(), "/bundle/bin".to_string()),
                ("LD_LIBRARY_PATH".to_string(), "/bundle/lib".to_string()),
            ]),
        }
    }

    #[test]
    fn test_explicit_command_is_verbatim() {
        let config = resolve_launch_config(
            PlatformFamily::MacOs,
            &TerminalSettings::default(),
            Some("/usr/local/bin/fish -i"),
            &BridgeEnvironment::default(),
            &EnvOverrides::default(),
        );
        assert_eq!(config.executable, "/usr/local/bin/fish -i");
        assert_eq!(config.arguments, vec!["-l".to_string()]);
        assert_eq!(config.name, LAUNCH_NAME);
    }

    #[test]
    fn test_shell_comes_from_platform_setting() {
        let mut settings = TerminalSettings::default();
        settings.shell.linux = "/bin/zsh".to_string();
        settings.fallback_shell = "/bin/sh".to_string();

        let linux = resolve_launch_config(
            PlatformFamily::Linux,
            &settings,
            None,
            &BridgeEnvironment::default(),
            &EnvOverrides::default(),
        );
        assert_eq!(linux.executable, "/bin/zsh");

        let other = resolve_launch_config(
            PlatformFamily::Other,
            &settings,
            None,
            &BridgeEnvironment::default(),
            &EnvOverrides::default(),
        );
        assert_eq!(other.executable, "/bin/sh");
        assert!(other.arguments.is_empty());
    }

    #[test]
    fn test_bridge_map_contains_version_and_pipe() {
        let vars = bridge_with_paths().to_map();
        assert_eq!(vars[BUILD_VERSION_VAR], "1.2.3");
        assert_eq!(vars[PARENT_PIPE_VAR], "/tmp/oni.sock");
    }

    #[test]
    fn test_linux_restores_original_paths() {
        let policy = resolve_environment(
            PlatformFamily::Linux,
            &bridge_with_paths(),
            &overrides(Some("/usr/bin"), Some("/usr/lib")),
        );
        let EnvironmentPolicy::Additive(vars) = policy else {
            panic!("expected additive policy");
        };
        assert_eq!(vars["PATH"], "/usr/bin");
        assert_eq!(vars["LD_LIBRARY_PATH"], "/usr/lib");
        assert_eq!(vars[BUILD_VERSION_VAR], "1.2.3");
        assert_eq!(vars[PARENT_PIPE_VAR], "/tmp/oni.sock");
    }

    #[test]
    fn test_linux_needs_both_overrides() {
        let policy = resolve_environment(
            PlatformFamily::Linux,
            &bridge_with_paths(),
            &overrides(Some("/usr/bin"), None),
        );
        assert_eq!(policy.variables()["PATH"], "/bundle/bin");
    }

    #[test]
    fn test_overrides_ignored_off_linux() {
        for platform in [
            PlatformFamily::MacOs,
            PlatformFamily::Windows,
            PlatformFamily::Other,
        ] {
            let policy = resolve_environment(
                platform,
                &bridge_with_paths(),
                &overrides(Some("/usr/bin"), Some("/usr/lib")),
            );
            assert_eq!(policy.variables()["PATH"], "/bundle/bin");
            assert!(matches!(policy, EnvironmentPolicy::Additive(_)));
        }
    }

    #[test]
    fn test_merge_keeps_first_definition() {
        let a = BTreeMap::from([("A".to_string(), "1".to_string())]);
        let b = BTreeMap::from([
            ("A".to_string(), "2".to_string()),
            ("B".to_string(), "3".to_string()),
        ]);
        let merged = merge_first_wins([&a, &b]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["A"], "1");
        assert_eq!(merged["B"], "3");
    }
}
