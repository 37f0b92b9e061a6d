/// Keys the tasks care about, independent of the windowing backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Space,
    Escape,
    /// Lower-cased letter or digit
    Char(char),
    Other,
}

impl Key {
    pub fn from_char(c: char) -> Self {
        match c {
            ' ' => Key::Space,
            c if c.is_ascii_alphanumeric() => Key::Char(c.to_ascii_lowercase()),
            _ => Key::Other,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            Key::Char(c) => Some(*c),
            _ => None,
        }
    }
}
