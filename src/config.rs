//! Terminal settings.
//!
//! [`TerminalSettings`] is the editor-facing configuration surface: the shell
//! to launch and its arguments for each platform family, plus font settings a
//! renderer consumes. Settings are read from a JSON object using the editor's
//! flat dotted keys:
//!
//! ```
//! use oni_terminal::config::{PlatformFamily, TerminalSettings};
//!
//! let settings = TerminalSettings::from_json(r#"{
//!     "terminal.integrated.shell.linux": "/usr/bin/fish",
//!     "terminal.integrated.shellArgs.linux": ["--login"],
//!     "terminal.integrated.fontSize": 13
//! }"#).unwrap();
//!
//! assert_eq!(settings.shell_for(PlatformFamily::Linux), "/usr/bin/fish");
//! assert_eq!(settings.shell_args_for(PlatformFamily::Linux), ["--login"]);
//! assert_eq!(settings.font.size, 13.0);
//! ```
//!
//! Keys that are absent keep their defaults. The macOS default for shell
//! arguments is `["-l"]`: terminal applications there are expected to start
//! login shells, otherwise the user's profile files are never sourced.

use crate::error::ConfigError;
use serde::Deserialize;

/// Operating-system family a shell is launched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformFamily {
    Windows,
    MacOs,
    Linux,
    /// Any platform without its own settings entry.
    Other,
}

impl PlatformFamily {
    /// The family of the platform this crate was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            PlatformFamily::Windows
        } else if cfg!(target_os = "macos") {
            PlatformFamily::MacOs
        } else if cfg!(target_os = "linux") {
            PlatformFamily::Linux
        } else {
            PlatformFamily::Other
        }
    }
}

const WINDOWS_SHELL: &str = "C:\\Windows\\System32\\cmd.exe";

/// Shell used when no setting applies.
///
/// - On Windows: `cmd.exe` from the system directory.
/// - Elsewhere: the `SHELL` environment variable, falling back to `/bin/sh`.
pub fn default_shell() -> String {
    if cfg!(windows) {
        WINDOWS_SHELL.to_string()
    } else {
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
    }
}

/// One value per platform family that has its own setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerPlatform<T> {
    pub windows: T,
    pub osx: T,
    pub linux: T,
}

impl<T> PerPlatform<T> {
    /// Returns the entry for `platform`, or `None` for [`PlatformFamily::Other`].
    pub fn get(&self, platform: PlatformFamily) -> Option<&T> {
        match platform {
            PlatformFamily::Windows => Some(&self.windows),
            PlatformFamily::MacOs => Some(&self.osx),
            PlatformFamily::Linux => Some(&self.linux),
            PlatformFamily::Other => None,
        }
    }
}

/// Font settings. The terminal core never reads these; they are parsed here
/// so the renderer and the core share one settings value.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSettings {
    /// `None` means use the editor font.
    pub family: Option<String>,
    pub size: f32,
    pub weight: FontWeight,
    pub ligatures: bool,
    pub smoothing: FontSmoothing,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            family: None,
            size: 12.0,
            weight: FontWeight::Normal,
            ligatures: true,
            smoothing: FontSmoothing::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Thin,
    Light,
    Normal,
    Medium,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontSmoothing {
    Default,
    None,
    Antialiased,
    SubpixelAntialiased,
}

/// Terminal settings for every platform family.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalSettings {
    /// Shell executable per platform.
    pub shell: PerPlatform<String>,

    /// Shell arguments per platform.
    pub shell_args: PerPlatform<Vec<String>>,

    /// Shell used on [`PlatformFamily::Other`].
    pub fallback_shell: String,

    pub font: FontSettings,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        let shell = default_shell();
        Self {
            shell: PerPlatform {
                windows: WINDOWS_SHELL.to_string(),
                osx: shell.clone(),
                linux: shell.clone(),
            },
            shell_args: PerPlatform {
                windows: Vec::new(),
                osx: vec!["-l".to_string()],
                linux: Vec::new(),
            },
            fallback_shell: shell,
            font: FontSettings::default(),
        }
    }
}

/// Wire form of the settings: every key optional, flat dotted names.
#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(rename = "terminal.integrated.shell.windows")]
    shell_windows: Option<String>,
    #[serde(rename = "terminal.integrated.shell.osx")]
    shell_osx: Option<String>,
    #[serde(rename = "terminal.integrated.shell.linux")]
    shell_linux: Option<String>,
    #[serde(rename = "terminal.integrated.shellArgs.windows")]
    shell_args_windows: Option<Vec<String>>,
    #[serde(rename = "terminal.integrated.shellArgs.osx")]
    shell_args_osx: Option<Vec<String>>,
    #[serde(rename = "terminal.integrated.shellArgs.linux")]
    shell_args_linux: Option<Vec<String>>,
    #[serde(rename = "terminal.integrated.fontFamily")]
    font_family: Option<String>,
    #[serde(rename = "terminal.integrated.fontSize")]
    font_size: Option<f32>,
    #[serde(rename = "terminal.integrated.fontWeight")]
    font_weight: Option<FontWeight>,
    #[serde(rename = "terminal.integrated.fontLigatures")]
    font_ligatures: Option<bool>,
    #[serde(rename = "terminal.integrated.fontSmoothing")]
    font_smoothing: Option<FontSmoothing>,
}

impl TerminalSettings {
    /// Parses settings from a JSON object, filling absent keys with defaults.
    /// Unrelated keys are ignored.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawSettings = serde_json::from_str(json)?;
        Self::default().merged(raw)
    }

    /// Same as [`from_json`](Self::from_json) for an already-parsed value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let raw: RawSettings = serde_json::from_value(value)?;
        Self::default().merged(raw)
    }

    fn merged(mut self, raw: RawSettings) -> Result<Self, ConfigError> {
        if let Some(size) = raw.font_size {
            if !(size.is_finite() && size > 0.0) {
                return Err(ConfigError::Validation(format!(
                    "terminal.integrated.fontSize must be positive, got {size}"
                )));
            }
            self.font.size = size;
        }

        let shells = [
            (raw.shell_windows, &mut self.shell.windows),
            (raw.shell_osx, &mut self.shell.osx),
            (raw.shell_linux, &mut self.shell.linux),
        ];
        for (value, slot) in shells {
            match value {
                Some(shell) if shell.trim().is_empty() => {
                    return Err(ConfigError::Validation(
                        "terminal.integrated.shell.* must not be empty".to_string(),
                    ));
                }
                Some(shell) => *slot = shell,
                None => {}
            }
        }

        if let Some(args) = raw.shell_args_windows {
            self.shell_args.windows = args;
        }
        if let Some(args) = raw.shell_args_osx {
            self.shell_args.osx = args;
        }
        if let Some(args) = raw.shell_args_linux {
            self.shell_args.linux = args;
        }

        if raw.font_family.is_some() {
            self.font.family = raw.font_family;
        }
        if let Some(weight) = raw.font_weight {
            self.font.weight = weight;
        }
        if let Some(ligatures) = raw.font_ligatures {
            self.font.ligatures = ligatures;
        }
        if let Some(smoothing) = raw.font_smoothing {
            self.font.smoothing = smoothing;
        }

        Ok(self)
    }

    /// Shell executable for `platform`.
    pub fn shell_for(&self, platform: PlatformFamily) -> &str {
        self.shell
            .get(platform)
            .map(String::as_str)
            .unwrap_or(self.fallback_shell.as_str())
    }

    /// Shell arguments for `platform`. [`PlatformFamily::Other`] gets none.
    pub fn shell_args_for(&self, platform: PlatformFamily) -> &[String] {
        self.shell_args
            .get(platform)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_per_platform() {
        let settings = TerminalSettings::default();
        assert_eq!(settings.shell_for(PlatformFamily::Windows), WINDOWS_SHELL);
        assert_eq!(settings.shell_args_for(PlatformFamily::MacOs), ["-l"]);
        assert!(settings.shell_args_for(PlatformFamily::Linux).is_empty());
        assert!(settings.shell_args_for(PlatformFamily::Windows).is_empty());
    }

    #[test]
    fn test_other_platform_uses_fallback() {
        let mut settings = TerminalSettings::default();
        settings.fallback_shell = "/bin/ksh".to_string();
        assert_eq!(settings.shell_for(PlatformFamily::Other), "/bin/ksh");
        assert!(settings.shell_args_for(PlatformFamily::Other).is_empty());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = TerminalSettings::from_json(
            r#"{ "terminal.integrated.shell.osx": "/bin/zsh", "editor.fontSize": 20 }"#,
        )
        .unwrap();
        assert_eq!(settings.shell_for(PlatformFamily::MacOs), "/bin/zsh");
        assert_eq!(settings.shell_args_for(PlatformFamily::MacOs), ["-l"]);
        assert_eq!(settings.font, FontSettings::default());
    }

    #[test]
    fn test_font_settings_from_json() {
        let settings = TerminalSettings::from_json(
            r#"{
                "terminal.integrated.fontFamily": "JetBrains Mono",
                "terminal.integrated.fontWeight": "bold",
                "terminal.integrated.fontLigatures": false,
                "terminal.integrated.fontSmoothing": "subpixel-antialiased"
            }"#,
        )
        .unwrap();
        assert_eq!(settings.font.family.as_deref(), Some("JetBrains Mono"));
        assert_eq!(settings.font.weight, FontWeight::Bold);
        assert!(!settings.font.ligatures);
        assert_eq!(settings.font.smoothing, FontSmoothing::SubpixelAntialiased);
    }

    #[test]
    fn test_rejects_bad_font_size() {
        let err = TerminalSettings::from_json(r#"{ "terminal.integrated.fontSize": 0 }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_rejects_empty_shell() {
        let err = TerminalSettings::from_json(r#"{ "terminal.integrated.shell.linux": " " }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = TerminalSettings::from_json("[1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_value() {
        let value = serde_json::json!({ "terminal.integrated.shellArgs.windows": ["/k"] });
        let settings = TerminalSettings::from_value(value).unwrap();
        assert_eq!(settings.shell_args_for(PlatformFamily::Windows), ["/k"]);
    }

    #[test]
    fn test_current_platform_is_consistent() {
        let platform = PlatformFamily::current();
        if cfg!(target_os = "linux") {
            assert_eq!(platform, PlatformFamily::Linux);
        }
    }
}
