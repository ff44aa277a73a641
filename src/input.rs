//! Keyboard and paste input for the emulator.
//!
//! Keys arrive from the editor as strings, either in the editor's own notation
//! (`"ctrl-c"`, `"shift-tab"`, `"enter"`) or in vim notation (`"<C-c>"`,
//! `"<S-Tab>"`, `"<CR>"`). [`Keystroke::parse`] accepts both, and
//! [`keystroke_to_bytes`] converts the result into what the PTY expects.
//!
//! # Key Mappings
//!
//! | Key | Sequence | Notes |
//! |-----|----------|-------|
//! | Enter | `\r` | |
//! | Escape | `\x1b` | |
//! | Backspace | `\x7f` | DEL |
//! | Tab / Shift+Tab | `\t` / `\x1b[Z` | |
//! | Ctrl+Space | `\x00` | NUL |
//! | Up/Down/Right/Left | `\x1b[A`..`\x1b[D` | `\x1bOA`..`\x1bOD` in APP_CURSOR mode |
//! | Home / End | `\x1b[H` / `\x1b[F` | |
//! | PageUp / PageDown | `\x1b[5~` / `\x1b[6~` | |
//! | Insert / Delete | `\x1b[2~` / `\x1b[3~` | |
//! | F1-F4 | `\x1bOP`..`\x1bOS` | |
//! | F5-F12 | `\x1b[15~`..`\x1b[24~` | |
//! | Ctrl+A..Ctrl+Z | `0x01`..`0x1a` | |
//! | Alt+key | `\x1b` + key | |
//!
//! # Example
//!
//! ```
//! use alacritty_terminal::term::TermMode;
//! use oni_terminal::input::{keystroke_to_bytes, Keystroke};
//!
//! let keystroke = Keystroke::parse("ctrl-c").unwrap();
//! assert_eq!(keystroke_to_bytes(&keystroke, TermMode::empty()), Some(vec![0x03]));
//!
//! let keystroke = Keystroke::parse("<CR>").unwrap();
//! assert_eq!(keystroke_to_bytes(&keystroke, TermMode::empty()), Some(b"\r".to_vec()));
//! ```

use alacritty_terminal::term::TermMode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub control: bool,
    pub alt: bool,
    pub shift: bool,
}

/// A parsed key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keystroke {
    /// Canonical key name (`"enter"`, `"up"`, `"f5"`) or the lowercase
    /// character for printable keys.
    pub key: String,

    /// Text the key types, when it types any.
    pub key_char: Option<String>,

    pub modifiers: Modifiers,
}

const NAMED_KEYS: &[&str] = &[
    "space", "enter", "escape", "backspace", "tab", "up", "down", "right", "left", "home", "end",
    "pageup", "pagedown", "insert", "delete", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9",
    "f10", "f11", "f12",
];

impl Keystroke {
    /// Parses editor or vim key notation. Returns `None` for anything that is
    /// not a single key, such as a word of text.
    pub fn parse(source: &str) -> Option<Self> {
        match source
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
        {
            Some(inner) if !inner.is_empty() => Self::parse_vim(inner),
            _ => Self::parse_editor(source),
        }
    }

    /// `ctrl-shift-a`, `alt-x`, `enter`.
    fn parse_editor(source: &str) -> Option<Self> {
        let mut modifiers = Modifiers::default();
        let mut rest = source;
        loop {
            let Some((prefix, tail)) = rest.split_once('-') else {
                break;
            };
            if tail.is_empty() {
                break;
            }
            match prefix {
                "ctrl" => modifiers.control = true,
                "alt" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                _ => break,
            }
            rest = tail;
        }
        Self::from_key(rest, modifiers)
    }

    /// The inside of `<C-S-a>`, `<CR>`, `<M-x>`.
    fn parse_vim(inner: &str) -> Option<Self> {
        let mut modifiers = Modifiers::default();
        let mut rest = inner;
        loop {
            let Some((prefix, tail)) = rest.split_once('-') else {
                break;
            };
            if tail.is_empty() {
                break;
            }
            match prefix.to_ascii_uppercase().as_str() {
                "C" => modifiers.control = true,
                "A" | "M" => modifiers.alt = true,
                "S" => modifiers.shift = true,
                _ => break,
            }
            rest = tail;
        }

        let key = match rest.to_ascii_lowercase().as_str() {
            "cr" | "return" => "enter".to_string(),
            "esc" => "escape".to_string(),
            "bs" => "backspace".to_string(),
            "del" => "delete".to_string(),
            "ins" => "insert".to_string(),
            "lt" => "<".to_string(),
            "bslash" => "\\".to_string(),
            "bar" => "|".to_string(),
            other if NAMED_KEYS.contains(&other) => other.to_string(),
            _ => rest.to_string(),
        };
        Self::from_key(&key, modifiers)
    }

    fn from_key(key: &str, modifiers: Modifiers) -> Option<Self> {
        let lower = key.to_ascii_lowercase();
        if NAMED_KEYS.contains(&lower.as_str()) {
            return Some(Self {
                key: lower,
                key_char: None,
                modifiers,
            });
        }

        let ch = single_char(key)?;
        let typed = if modifiers.shift || ch.is_uppercase() {
            ch.to_uppercase().collect::<String>()
        } else {
            ch.to_string()
        };
        let key_char = (!modifiers.control && !modifiers.alt).then_some(typed);
        Some(Self {
            key: ch.to_lowercase().collect(),
            key_char,
            modifiers: Modifiers {
                shift: modifiers.shift || ch.is_uppercase(),
                ..modifiers
            },
        })
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    let ch = chars.next()?;
    chars.next().is_none().then_some(ch)
}

/// Converts a keystroke to the bytes a terminal program expects.
///
/// Returns `None` for keystrokes that produce no output.
pub fn keystroke_to_bytes(keystroke: &Keystroke, mode: TermMode) -> Option<Vec<u8>> {
    let app_cursor = mode.contains(TermMode::APP_CURSOR);
    let arrow = |normal: &[u8], app: &[u8]| Some(if app_cursor { app } else { normal }.to_vec());

    match keystroke.key.as_str() {
        "space" if keystroke.modifiers.control => return Some(vec![0x00]),
        "space" if keystroke.modifiers.alt => return Some(b"\x1b ".to_vec()),
        "space" => return Some(b" ".to_vec()),
        "enter" if keystroke.modifiers.alt => return Some(b"\x1b\r".to_vec()),
        "enter" => return Some(b"\r".to_vec()),
        "escape" => return Some(b"\x1b".to_vec()),
        "backspace" if keystroke.modifiers.alt => return Some(b"\x1b\x7f".to_vec()),
        "backspace" => return Some(b"\x7f".to_vec()),
        "tab" if keystroke.modifiers.shift => return Some(b"\x1b[Z".to_vec()),
        "tab" => return Some(b"\t".to_vec()),

        "up" => return arrow(b"\x1b[A", b"\x1bOA"),
        "down" => return arrow(b"\x1b[B", b"\x1bOB"),
        "right" => return arrow(b"\x1b[C", b"\x1bOC"),
        "left" => return arrow(b"\x1b[D", b"\x1bOD"),

        "home" => return Some(b"\x1b[H".to_vec()),
        "end" => return Some(b"\x1b[F".to_vec()),
        "pageup" => return Some(b"\x1b[5~".to_vec()),
        "pagedown" => return Some(b"\x1b[6~".to_vec()),
        "insert" => return Some(b"\x1b[2~".to_vec()),
        "delete" => return Some(b"\x1b[3~".to_vec()),

        "f1" => return Some(b"\x1bOP".to_vec()),
        "f2" => return Some(b"\x1bOQ".to_vec()),
        "f3" => return Some(b"\x1bOR".to_vec()),
        "f4" => return Some(b"\x1bOS".to_vec()),
        "f5" => return Some(b"\x1b[15~".to_vec()),
        "f6" => return Some(b"\x1b[17~".to_vec()),
        "f7" => return Some(b"\x1b[18~".to_vec()),
        "f8" => return Some(b"\x1b[19~".to_vec()),
        "f9" => return Some(b"\x1b[20~".to_vec()),
        "f10" => return Some(b"\x1b[21~".to_vec()),
        "f11" => return Some(b"\x1b[23~".to_vec()),
        "f12" => return Some(b"\x1b[24~".to_vec()),

        _ => {}
    }

    let ch = single_char(&keystroke.key)?;

    if keystroke.modifiers.control {
        if ch.is_ascii_alphabetic() {
            let ctrl_char = (ch.to_ascii_uppercase() as u8) - b'@';
            return Some(with_alt(keystroke, vec![ctrl_char]));
        }
        let ctrl_char = match ch {
            '@' | '2' => 0x00,
            '[' => 0x1b,
            '\\' => 0x1c,
            ']' => 0x1d,
            '^' | '6' => 0x1e,
            '_' | '-' => 0x1f,
            '?' => 0x7f,
            _ => return None,
        };
        return Some(with_alt(keystroke, vec![ctrl_char]));
    }

    if keystroke.modifiers.alt {
        let ch = if keystroke.modifiers.shift {
            ch.to_ascii_uppercase()
        } else {
            ch
        };
        let mut bytes = vec![0x1b];
        bytes.extend_from_slice(ch.to_string().as_bytes());
        return Some(bytes);
    }

    match &keystroke.key_char {
        Some(text) => Some(text.as_bytes().to_vec()),
        None => Some(ch.to_string().into_bytes()),
    }
}

fn with_alt(keystroke: &Keystroke, mut bytes: Vec<u8>) -> Vec<u8> {
    if keystroke.modifiers.alt {
        bytes.insert(0, 0x1b);
    }
    bytes
}

/// Bytes for a key string in editor or vim notation. Strings that are not a
/// single key are typed as literal text.
pub fn encode_key(key: &str, mode: TermMode) -> Vec<u8> {
    Keystroke::parse(key)
        .and_then(|keystroke| keystroke_to_bytes(&keystroke, mode))
        .unwrap_or_else(|| key.as_bytes().to_vec())
}

/// Bytes for pasting `text`.
///
/// With bracketed paste enabled the text is wrapped in `ESC[200~`/`ESC[201~`
/// and stripped of escape characters so it cannot end the bracket early.
/// Otherwise line feeds become carriage returns, the way a typed Enter would.
///
/// ```
/// use alacritty_terminal::term::TermMode;
/// use oni_terminal::input::paste_bytes;
///
/// assert_eq!(paste_bytes("ls\n", TermMode::empty()), b"ls\r");
/// assert_eq!(
///     paste_bytes("ls\n", TermMode::BRACKETED_PASTE),
///     b"\x1b[200~ls\n\x1b[201~"
/// );
/// ```
pub fn paste_bytes(text: &str, mode: TermMode) -> Vec<u8> {
    if mode.contains(TermMode::BRACKETED_PASTE) {
        let mut bytes = b"\x1b[200~".to_vec();
        bytes.extend(text.bytes().filter(|byte| *byte != 0x1b));
        bytes.extend_from_slice(b"\x1b[201~");
        bytes
    } else {
        text.replace("\r\n", "\r").replace('\n', "\r").into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(key: &str, mode: TermMode) -> Option<Vec<u8>> {
        keystroke_to_bytes(&Keystroke::parse(key).unwrap(), mode)
    }

    #[test]
    fn test_parse_editor_notation() {
        let keystroke = Keystroke::parse("ctrl-shift-a").unwrap();
        assert_eq!(keystroke.key, "a");
        assert!(keystroke.modifiers.control && keystroke.modifiers.shift);
        assert_eq!(keystroke.key_char, None);

        let keystroke = Keystroke::parse("A").unwrap();
        assert_eq!(keystroke.key, "a");
        assert_eq!(keystroke.key_char.as_deref(), Some("A"));

        assert_eq!(Keystroke::parse("-").unwrap().key, "-");
        assert_eq!(Keystroke::parse("ctrl--").unwrap().key, "-");
        assert_eq!(Keystroke::parse("PageUp").unwrap().key, "pageup");
        assert!(Keystroke::parse("hello").is_none());
        assert!(Keystroke::parse("").is_none());
    }

    #[test]
    fn test_parse_vim_notation() {
        assert_eq!(Keystroke::parse("<CR>").unwrap().key, "enter");
        assert_eq!(Keystroke::parse("<Esc>").unwrap().key, "escape");
        assert_eq!(Keystroke::parse("<BS>").unwrap().key, "backspace");
        assert_eq!(Keystroke::parse("<lt>").unwrap().key_char.as_deref(), Some("<"));

        let keystroke = Keystroke::parse("<C-c>").unwrap();
        assert_eq!(keystroke.key, "c");
        assert!(keystroke.modifiers.control);

        let keystroke = Keystroke::parse("<M-x>").unwrap();
        assert!(keystroke.modifiers.alt);

        let keystroke = Keystroke::parse("<S-Tab>").unwrap();
        assert_eq!(keystroke.key, "tab");
        assert!(keystroke.modifiers.shift);

        // A lone angle bracket is a plain key.
        assert_eq!(Keystroke::parse("<").unwrap().key_char.as_deref(), Some("<"));
    }

    #[test]
    fn test_enter_key() {
        assert_eq!(bytes("enter", TermMode::empty()), Some(b"\r".to_vec()));
        assert_eq!(bytes("<CR>", TermMode::empty()), Some(b"\r".to_vec()));
    }

    #[test]
    fn test_escape_key() {
        assert_eq!(bytes("escape", TermMode::empty()), Some(b"\x1b".to_vec()));
    }

    #[test]
    fn test_backspace_key() {
        assert_eq!(bytes("backspace", TermMode::empty()), Some(b"\x7f".to_vec()));
    }

    #[test]
    fn test_tab_key() {
        assert_eq!(bytes("tab", TermMode::empty()), Some(b"\t".to_vec()));
        assert_eq!(bytes("shift-tab", TermMode::empty()), Some(b"\x1b[Z".to_vec()));
        assert_eq!(bytes("<S-Tab>", TermMode::empty()), Some(b"\x1b[Z".to_vec()));
    }

    #[test]
    fn test_arrow_keys_normal_mode() {
        let mode = TermMode::empty();
        assert_eq!(bytes("up", mode), Some(b"\x1b[A".to_vec()));
        assert_eq!(bytes("down", mode), Some(b"\x1b[B".to_vec()));
        assert_eq!(bytes("right", mode), Some(b"\x1b[C".to_vec()));
        assert_eq!(bytes("<Left>", mode), Some(b"\x1b[D".to_vec()));
    }

    #[test]
    fn test_arrow_keys_app_cursor_mode() {
        let mode = TermMode::APP_CURSOR;
        assert_eq!(bytes("up", mode), Some(b"\x1bOA".to_vec()));
        assert_eq!(bytes("down", mode), Some(b"\x1bOB".to_vec()));
        assert_eq!(bytes("right", mode), Some(b"\x1bOC".to_vec()));
        assert_eq!(bytes("left", mode), Some(b"\x1bOD".to_vec()));
    }

    #[test]
    fn test_navigation_keys() {
        let mode = TermMode::empty();
        assert_eq!(bytes("home", mode), Some(b"\x1b[H".to_vec()));
        assert_eq!(bytes("end", mode), Some(b"\x1b[F".to_vec()));
        assert_eq!(bytes("pageup", mode), Some(b"\x1b[5~".to_vec()));
        assert_eq!(bytes("pagedown", mode), Some(b"\x1b[6~".to_vec()));
        assert_eq!(bytes("insert", mode), Some(b"\x1b[2~".to_vec()));
        assert_eq!(bytes("<Del>", mode), Some(b"\x1b[3~".to_vec()));
    }

    #[test]
    fn test_function_keys() {
        let mode = TermMode::empty();
        assert_eq!(bytes("f1", mode), Some(b"\x1bOP".to_vec()));
        assert_eq!(bytes("f2", mode), Some(b"\x1bOQ".to_vec()));
        assert_eq!(bytes("<F5>", mode), Some(b"\x1b[15~".to_vec()));
        assert_eq!(bytes("f12", mode), Some(b"\x1b[24~".to_vec()));
    }

    #[test]
    fn test_ctrl_combinations() {
        let mode = TermMode::empty();
        assert_eq!(bytes("ctrl-a", mode), Some(vec![0x01]));
        assert_eq!(bytes("ctrl-c", mode), Some(vec![0x03]));
        assert_eq!(bytes("<C-d>", mode), Some(vec![0x04]));
        assert_eq!(bytes("ctrl-z", mode), Some(vec![0x1a]));
        assert_eq!(bytes("ctrl-space", mode), Some(vec![0x00]));
        assert_eq!(bytes("ctrl-[", mode), Some(vec![0x1b]));
        assert_eq!(bytes("<C-\\>", mode), Some(vec![0x1c]));
        assert_eq!(bytes("ctrl-1", mode), None);
    }

    #[test]
    fn test_alt_combinations() {
        let mode = TermMode::empty();
        assert_eq!(bytes("alt-a", mode), Some(b"\x1ba".to_vec()));
        assert_eq!(bytes("<M-x>", mode), Some(b"\x1bx".to_vec()));
        assert_eq!(bytes("<A-S-x>", mode), Some(b"\x1bX".to_vec()));
        assert_eq!(bytes("ctrl-alt-c", mode), Some(vec![0x1b, 0x03]));
    }

    #[test]
    fn test_regular_characters() {
        let mode = TermMode::empty();
        assert_eq!(bytes("a", mode), Some(b"a".to_vec()));
        assert_eq!(bytes("shift-a", mode), Some(b"A".to_vec()));
        assert_eq!(bytes("0", mode), Some(b"0".to_vec()));
        assert_eq!(bytes("é", mode), Some("é".as_bytes().to_vec()));
    }

    #[test]
    fn test_space_key() {
        assert_eq!(bytes("space", TermMode::empty()), Some(b" ".to_vec()));
        assert_eq!(bytes("<Space>", TermMode::empty()), Some(b" ".to_vec()));
    }

    #[test]
    fn test_encode_key_falls_back_to_text() {
        assert_eq!(encode_key("<C-c>", TermMode::empty()), vec![0x03]);
        assert_eq!(encode_key("ls -la", TermMode::empty()), b"ls -la".to_vec());
        assert_eq!(encode_key("ctrl-1", TermMode::empty()), b"ctrl-1".to_vec());
    }

    #[test]
    fn test_paste() {
        assert_eq!(paste_bytes("a\r\nb\nc", TermMode::empty()), b"a\rb\rc".to_vec());
        assert_eq!(
            paste_bytes("x\x1b[201~y", TermMode::BRACKETED_PASTE),
            b"\x1b[200~x[201~y\x1b[201~".to_vec()
        );
    }
}
