//! Musical key normalization.
//!
//! Every accepted notation (Open Key, Camelot, conventional names) maps
//! through one immutable table onto 24 tonal keys plus an off-key sentinel.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Serialize, Serializer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Major,
    Minor,
}

/// A position on the Open Key wheel: `1d`..`12d` (major), `1m`..`12m` (minor).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OpenKey {
    number: u8,
    mode: Mode,
}

impl OpenKey {
    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MusicalKey {
    Tonal(OpenKey),
    /// Non-musical material (speech, noise, atonal).
    OffKey,
}

/// Tonic spellings per Open Key number: (major, minor). First spelling is
/// the display name.
const WHEEL: [(&[&str], &[&str]); 12] = [
    (&["C"], &["A"]),
    (&["G"], &["E"]),
    (&["D"], &["B"]),
    (&["A"], &["F#", "Gb"]),
    (&["E"], &["C#", "Db"]),
    (&["B", "Cb"], &["G#", "Ab"]),
    (&["F#", "Gb"], &["D#", "Eb"]),
    (&["Db", "C#"], &["Bb", "A#"]),
    (&["Ab", "G#"], &["F"]),
    (&["Eb", "D#"], &["C"]),
    (&["Bb", "A#"], &["G"]),
    (&["F"], &["D"]),
];

const MAJOR_SUFFIXES: [&str; 3] = ["", "maj", "major"];
const MINOR_SUFFIXES: [&str; 3] = ["m", "min", "minor"];
const OFF_KEY_SPELLINGS: [&str; 3] = ["o", "off", "offkey"];

static KEY_TABLE: LazyLock<HashMap<String, MusicalKey>> = LazyLock::new(build_table);

fn build_table() -> HashMap<String, MusicalKey> {
    let mut table = HashMap::new();

    for (index, (major, minor)) in WHEEL.iter().enumerate() {
        let number = index as u8 + 1;
        for (mode, tonics, suffixes) in [
            (Mode::Major, *major, MAJOR_SUFFIXES),
            (Mode::Minor, *minor, MINOR_SUFFIXES),
        ] {
            let key = MusicalKey::Tonal(OpenKey { number, mode });

            table.insert(key.open_key().to_ascii_lowercase(), key);
            let camelot = key.camelot();
            table.insert(camelot.to_ascii_lowercase(), key);
            if camelot.len() == 2 {
                table.insert(format!("0{}", camelot).to_ascii_lowercase(), key);
            }

            for tonic in tonics {
                for suffix in suffixes {
                    table.insert(format!("{}{}", tonic, suffix).to_ascii_lowercase(), key);
                }
            }
        }
    }

    for spelling in OFF_KEY_SPELLINGS {
        table.insert(spelling.to_string(), MusicalKey::OffKey);
    }

    table
}

impl MusicalKey {
    /// Normalize a raw key string. Unknown notations yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .map(|c| match c {
                '♯' => '#',
                '♭' => 'b',
                other => other,
            })
            .collect::<String>()
            .to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        KEY_TABLE.get(&normalized).copied()
    }

    /// Open Key notation, e.g. `"1d"`, `"8m"`, or `"o"` when off-key.
    pub fn open_key(&self) -> String {
        match self {
            MusicalKey::Tonal(k) => match k.mode {
                Mode::Major => format!("{}d", k.number),
                Mode::Minor => format!("{}m", k.number),
            },
            MusicalKey::OffKey => "o".to_string(),
        }
    }

    /// Camelot notation, e.g. `"8B"` for C major; `"-"` when off-key.
    pub fn camelot(&self) -> String {
        match self {
            MusicalKey::Tonal(k) => {
                let number = (k.number + 6) % 12 + 1;
                let letter = match k.mode {
                    Mode::Major => 'B',
                    Mode::Minor => 'A',
                };
                format!("{}{}", number, letter)
            }
            MusicalKey::OffKey => "-".to_string(),
        }
    }

    /// Conventional name, e.g. `"C"`, `"F#m"`.
    pub fn name(&self) -> String {
        match self {
            MusicalKey::Tonal(k) => {
                let (major, minor) = WHEEL[(k.number - 1) as usize];
                match k.mode {
                    Mode::Major => major[0].to_string(),
                    Mode::Minor => format!("{}m", minor[0]),
                }
            }
            MusicalKey::OffKey => "off-key".to_string(),
        }
    }
}

impl fmt::Display for MusicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.open_key())
    }
}

impl Serialize for MusicalKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.open_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tonal(number: u8, mode: Mode) -> MusicalKey {
        MusicalKey::Tonal(OpenKey { number, mode })
    }

    #[test]
    fn camelot_maps_onto_open_key() {
        assert_eq!(MusicalKey::parse("8B"), Some(tonal(1, Mode::Major)));
        assert_eq!(MusicalKey::parse("8A"), Some(tonal(1, Mode::Minor)));
        assert_eq!(MusicalKey::parse("1B"), Some(tonal(6, Mode::Major)));
        assert_eq!(MusicalKey::parse("12a"), Some(tonal(5, Mode::Minor)));
        assert_eq!(MusicalKey::parse("08B"), MusicalKey::parse("8B"));
    }

    #[test]
    fn conventional_names() {
        assert_eq!(MusicalKey::parse("C"), Some(tonal(1, Mode::Major)));
        assert_eq!(MusicalKey::parse("Am"), Some(tonal(1, Mode::Minor)));
        assert_eq!(MusicalKey::parse("A minor"), Some(tonal(1, Mode::Minor)));
        assert_eq!(MusicalKey::parse("C#"), Some(tonal(8, Mode::Major)));
        assert_eq!(MusicalKey::parse("Db"), Some(tonal(8, Mode::Major)));
        assert_eq!(MusicalKey::parse("D♭"), Some(tonal(8, Mode::Major)));
        assert_eq!(MusicalKey::parse("Bbm"), Some(tonal(8, Mode::Minor)));
        assert_eq!(MusicalKey::parse("A♯min"), Some(tonal(8, Mode::Minor)));
        assert_eq!(MusicalKey::parse("Gbmaj"), Some(tonal(7, Mode::Major)));
        assert_eq!(MusicalKey::parse("B"), Some(tonal(6, Mode::Major)));
    }

    #[test]
    fn open_key_round_trips_through_table() {
        for number in 1..=12 {
            for mode in [Mode::Major, Mode::Minor] {
                let key = tonal(number, mode);
                assert_eq!(MusicalKey::parse(&key.open_key()), Some(key));
                assert_eq!(MusicalKey::parse(&key.camelot()), Some(key));
                assert_eq!(MusicalKey::parse(&key.name()), Some(key));
            }
        }
    }

    #[test]
    fn off_key_sentinel() {
        assert_eq!(MusicalKey::parse("o"), Some(MusicalKey::OffKey));
        assert_eq!(MusicalKey::parse("Off-Key"), Some(MusicalKey::OffKey));
        assert_eq!(MusicalKey::OffKey.open_key(), "o");
    }

    #[test]
    fn unknown_notation_is_rejected() {
        assert_eq!(MusicalKey::parse("Zz"), None);
        assert_eq!(MusicalKey::parse("13B"), None);
        assert_eq!(MusicalKey::parse("H"), None);
        assert_eq!(MusicalKey::parse("   "), None);
    }

    #[test]
    fn display_names() {
        let c = MusicalKey::parse("8B").unwrap();
        assert_eq!(c.name(), "C");
        assert_eq!(c.open_key(), "1d");
        assert_eq!(c.to_string(), "1d");
        assert_eq!(MusicalKey::parse("4m").unwrap().name(), "F#m");
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"1d\"");
    }
}
