use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pasajes_client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_EXPORT_PATH: &str = "reporte_pasajes.csv";

/// Application configuration file
///
/// Every key is optional; missing keys fall back to the built-in defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub export_path: PathBuf,
    pub keybindings: KeyBindingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            export_path: PathBuf::from(DEFAULT_EXPORT_PATH),
            keybindings: KeyBindingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load the configuration from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e)
        })?;

        let config: AppConfig = serde_yaml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse config YAML {}: {}", path.display(), e)
        })?;

        config.keybindings.validate().map_err(|e| {
            anyhow::anyhow!("Invalid key binding in {}: {}", path.display(), e)
        })?;

        Ok(config)
    }

    /// Explicit path if given, else `~/.config/pasajes/config.yaml` when it
    /// exists, else defaults
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub fn default_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        let mut path = PathBuf::from(home);
        path.push(".config");
        path.push("pasajes");
        path
    })
}

pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|dir| dir.join("config.yaml"))
}

/// User key bindings; checked before the built-in ones
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyBindingConfig {
    #[serde(default)]
    pub bindings: Vec<KeyBinding>,
}

/// A single key binding entry
#[derive(Debug, Clone, Deserialize)]
pub struct KeyBinding {
    /// Single character like "e", or a key name like "Tab", "Enter", "Up"
    pub key: String,
    #[serde(default)]
    pub modifiers: Vec<ModifierSpec>,
    /// Unset means the binding applies in every context
    #[serde(default)]
    pub context: Option<BindingContext>,
    pub action: Action,
}

/// Modifier key specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierSpec {
    Ctrl,
    Shift,
    Alt,
}

/// Context in which the binding applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingContext {
    /// Table or a select field has focus; plain letters are commands
    Navigation,
    /// A text field has focus; plain letters are typed into it
    Editing,
}

/// Action to execute when a binding is triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    NextField,
    PreviousField,
    NextOption,
    PreviousOption,
    Submit,
    EditSelected,
    DeleteSelected,
    NewRecord,
    CycleFilter,
    Refresh,
    Export,
    SelectUp,
    SelectDown,
    FocusTable,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeySpecError {
    #[error("unknown key name '{0}'")]
    UnknownKey(String),
    #[error("empty key")]
    Empty,
}

/// Parse a key name from the config into a crossterm key code
pub fn parse_key(spec: &str) -> Result<KeyCode, KeySpecError> {
    let mut chars = spec.chars();
    match (chars.next(), chars.next()) {
        (None, _) => return Err(KeySpecError::Empty),
        (Some(c), None) => return Ok(KeyCode::Char(c)),
        _ => {}
    }
    let code = match spec {
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Left" => KeyCode::Left,
        "Right" => KeyCode::Right,
        "Enter" => KeyCode::Enter,
        "Tab" => KeyCode::Tab,
        "BackTab" => KeyCode::BackTab,
        "Esc" | "Escape" => KeyCode::Esc,
        "Backspace" => KeyCode::Backspace,
        "Delete" => KeyCode::Delete,
        "Home" => KeyCode::Home,
        "End" => KeyCode::End,
        "PageUp" => KeyCode::PageUp,
        "PageDown" => KeyCode::PageDown,
        "Space" => KeyCode::Char(' '),
        other => return Err(KeySpecError::UnknownKey(other.to_string())),
    };
    Ok(code)
}

impl KeyBinding {
    fn new(key: &str, context: Option<BindingContext>, action: Action) -> Self {
        Self {
            key: key.to_string(),
            modifiers: Vec::new(),
            context,
            action,
        }
    }

    fn with_ctrl(mut self) -> Self {
        self.modifiers.push(ModifierSpec::Ctrl);
        self
    }

    fn matches(&self, key: &KeyEvent, context: BindingContext) -> bool {
        if self.context.is_some_and(|c| c != context) {
            return false;
        }

        let Ok(code) = parse_key(&self.key) else {
            return false;
        };
        let code_matches = match (code, key.code) {
            // Letters compare case-insensitively only when Ctrl is involved,
            // terminals report Ctrl+Q and Ctrl+q alike
            (KeyCode::Char(spec), KeyCode::Char(actual)) if self.requires(ModifierSpec::Ctrl) => {
                spec.eq_ignore_ascii_case(&actual)
            }
            (spec, actual) => spec == actual,
        };
        if !code_matches {
            return false;
        }

        // Shift is implied by the character itself and by BackTab
        let shift_implied = matches!(key.code, KeyCode::Char(_) | KeyCode::BackTab);
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);

        ctrl == self.requires(ModifierSpec::Ctrl)
            && alt == self.requires(ModifierSpec::Alt)
            && (shift_implied || shift == self.requires(ModifierSpec::Shift))
    }

    fn requires(&self, modifier: ModifierSpec) -> bool {
        self.modifiers.contains(&modifier)
    }
}

impl KeyBindingConfig {
    /// Built-in bindings, used after any user bindings
    pub fn defaults() -> Vec<KeyBinding> {
        use Action::*;
        use BindingContext::{Editing, Navigation};

        vec![
            KeyBinding::new("q", None, Quit).with_ctrl(),
            KeyBinding::new("Tab", None, NextField),
            KeyBinding::new("BackTab", None, PreviousField),
            KeyBinding::new("Enter", None, Submit),
            KeyBinding::new("Up", None, SelectUp),
            KeyBinding::new("Down", None, SelectDown),
            KeyBinding::new("Esc", Some(Editing), FocusTable),
            KeyBinding::new("Left", Some(Navigation), PreviousOption),
            KeyBinding::new("Right", Some(Navigation), NextOption),
            KeyBinding::new("e", Some(Navigation), EditSelected),
            KeyBinding::new("d", Some(Navigation), DeleteSelected),
            KeyBinding::new("n", Some(Navigation), NewRecord),
            KeyBinding::new("f", Some(Navigation), CycleFilter),
            KeyBinding::new("r", Some(Navigation), Refresh),
            KeyBinding::new("x", Some(Navigation), Export),
            KeyBinding::new("q", Some(Navigation), Quit),
        ]
    }

    /// Fails on the first binding whose key name is not recognised
    pub fn validate(&self) -> Result<(), KeySpecError> {
        for binding in &self.bindings {
            parse_key(&binding.key)?;
        }
        Ok(())
    }

    /// User bindings and then built-in ones, in lookup order
    pub fn into_keymap(self) -> Keymap {
        let mut bindings = self.bindings;
        bindings.extend(Self::defaults());
        Keymap { bindings }
    }
}

/// Resolved key bindings; the first match wins
#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: Vec<KeyBinding>,
}

impl Default for Keymap {
    fn default() -> Self {
        KeyBindingConfig::default().into_keymap()
    }
}

impl Keymap {
    pub fn find_binding(&self, key: &KeyEvent, context: BindingContext) -> Option<Action> {
        self.bindings
            .iter()
            .find(|binding| binding.matches(key, context))
            .map(|binding| binding.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_default_bindings() {
        let keymap = Keymap::default();
        let nav = BindingContext::Navigation;

        assert_eq!(keymap.find_binding(&key(KeyCode::Tab), nav), Some(Action::NextField));
        assert_eq!(
            keymap.find_binding(
                &KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT),
                nav
            ),
            Some(Action::PreviousField)
        );
        assert_eq!(keymap.find_binding(&key(KeyCode::Char('e')), nav), Some(Action::EditSelected));
        assert_eq!(keymap.find_binding(&key(KeyCode::Char('x')), nav), Some(Action::Export));
        assert_eq!(
            keymap.find_binding(
                &KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
                BindingContext::Editing
            ),
            Some(Action::Quit)
        );
    }

    #[test]
    fn test_letters_are_not_commands_while_editing() {
        let keymap = Keymap::default();
        let editing = BindingContext::Editing;

        assert_eq!(keymap.find_binding(&key(KeyCode::Char('e')), editing), None);
        assert_eq!(keymap.find_binding(&key(KeyCode::Char('q')), editing), None);
        assert_eq!(keymap.find_binding(&key(KeyCode::Enter), editing), Some(Action::Submit));
        assert_eq!(keymap.find_binding(&key(KeyCode::Esc), editing), Some(Action::FocusTable));
    }

    #[test]
    fn test_ctrl_does_not_trigger_plain_binding() {
        let keymap = Keymap::default();
        let ctrl_e = KeyEvent::new(KeyCode::Char('e'), KeyModifiers::CONTROL);
        assert_eq!(keymap.find_binding(&ctrl_e, BindingContext::Navigation), None);
    }

    #[test]
    fn test_parse_key_names() {
        assert_eq!(parse_key("x"), Ok(KeyCode::Char('x')));
        assert_eq!(parse_key("PageDown"), Ok(KeyCode::PageDown));
        assert_eq!(parse_key("Space"), Ok(KeyCode::Char(' ')));
        assert_eq!(
            parse_key("Hyper"),
            Err(KeySpecError::UnknownKey("Hyper".to_string()))
        );
        assert_eq!(parse_key(""), Err(KeySpecError::Empty));
    }

    #[test]
    fn test_load_partial_config_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "base_url: http://pasajes.local:8080\nkeybindings:\n  bindings:\n    - key: s\n      modifiers: [ctrl]\n      action: submit\n    - key: g\n      context: navigation\n      action: refresh"
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.base_url, "http://pasajes.local:8080");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.export_path, PathBuf::from(DEFAULT_EXPORT_PATH));

        let keymap = config.keybindings.into_keymap();
        let ctrl_s = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL);
        assert_eq!(
            keymap.find_binding(&ctrl_s, BindingContext::Editing),
            Some(Action::Submit)
        );
        assert_eq!(
            keymap.find_binding(&key(KeyCode::Char('g')), BindingContext::Navigation),
            Some(Action::Refresh)
        );
        assert_eq!(
            keymap.find_binding(&key(KeyCode::Char('r')), BindingContext::Navigation),
            Some(Action::Refresh)
        );
    }

    #[test]
    fn test_unknown_key_name_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "keybindings:\n  bindings:\n    - key: Hyper\n      action: quit"
        )
        .unwrap();

        let err = AppConfig::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Hyper"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(AppConfig::resolve(Some(missing.as_path())).is_err());
    }
}
