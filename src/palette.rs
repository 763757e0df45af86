//! Color table: the named colors the animators pick from.
//!
//! The table is a JSON object mapping a color name to an entry with an
//! `rgb` array. Anything else in an entry (hex codes, notes) is ignored:
//!
//! ```json
//! { "red": { "rgb": [255, 0, 0], "hex": "#FF0000" } }
//! ```
//!
//! ## Rust concepts
//! - `serde::Deserialize` for parsing straight into typed structs
//! - `BTreeMap` for sorted, deterministic iteration
//! - Generic functions over `R: Rng`

use crate::{Color, Error, Result};
use rand::Rng;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Default location of the table, relative to the working directory.
pub const DEFAULT_COLOR_TABLE: &str = "rgb_color_codes.json";

/// One entry of the JSON file. Unknown fields are skipped by serde.
#[derive(Deserialize)]
struct Entry {
    rgb: [u8; 3],
}

/// Immutable name → color lookup, loaded once at startup.
#[derive(Clone, Debug)]
pub struct ColorTable {
    /// Sorted names, so a seeded RNG picks the same sequence every run
    names: Vec<String>,
    colors: BTreeMap<String, Color>,
}

impl ColorTable {
    /// Read and parse a color table file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::ColorTable {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json_str(&text)?;
        tracing::info!(
            "Loaded {} colors from {}",
            table.names.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse a color table from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let entries: BTreeMap<String, Entry> = serde_json::from_str(text)?;
        if entries.is_empty() {
            return Err(Error::EmptyColorTable);
        }

        let colors: BTreeMap<String, Color> = entries
            .into_iter()
            .map(|(name, entry)| (name, Color::from(entry.rgb)))
            .collect();
        let names = colors.keys().cloned().collect();

        Ok(Self { names, colors })
    }

    /// All valid color names, sorted.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a loaded table.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<Color> {
        self.colors.get(name).copied()
    }

    /// Like [`ColorTable::get`], but an unknown name is an error.
    pub fn lookup(&self, name: &str) -> Result<Color> {
        self.get(name)
            .ok_or_else(|| Error::UnknownColor(name.to_string()))
    }

    /// Pick a color name uniformly at random.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> (&str, Color) {
        let name = &self.names[rng.gen_range(0..self.names.len())];
        (name.as_str(), self.colors[name])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;
    use tempfile::TempDir;

    const SAMPLE: &str = r##"{
        "red":   { "rgb": [255, 0, 0], "hex": "#FF0000" },
        "green": { "rgb": [0, 255, 0] },
        "black": { "rgb": [0, 0, 0] }
    }"##;

    #[test]
    fn parses_names_in_sorted_order() {
        let table = ColorTable::from_json_str(SAMPLE).unwrap();
        assert_eq!(table.names(), ["black", "green", "red"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn lookup_returns_rgb() {
        let table = ColorTable::from_json_str(SAMPLE).unwrap();
        assert_eq!(table.lookup("red").unwrap(), Color::new(255, 0, 0));
        assert_eq!(table.get("green"), Some(Color::new(0, 255, 0)));
    }

    #[test]
    fn lookup_unknown_name_fails() {
        let table = ColorTable::from_json_str(SAMPLE).unwrap();
        let err = table.lookup("not-a-color").unwrap_err();
        assert!(matches!(err, Error::UnknownColor(name) if name == "not-a-color"));
    }

    #[test]
    fn load_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("colors.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let table = ColorTable::load(&path).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn load_missing_file_fails() {
        let tmp = TempDir::new().unwrap();
        let err = ColorTable::load(&tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::ColorTable { .. }));
    }

    #[rstest::rstest]
    #[case::not_json("this is not json")]
    #[case::missing_rgb(r#"{ "red": { "hex": "FF0000" } }"#)]
    #[case::value_too_large(r#"{ "red": { "rgb": [256, 0, 0] } }"#)]
    #[case::negative(r#"{ "red": { "rgb": [-1, 0, 0] } }"#)]
    #[case::wrong_arity(r#"{ "red": { "rgb": [255, 0] } }"#)]
    #[case::not_an_object(r#"[1, 2, 3]"#)]
    fn malformed_table_is_rejected(#[case] text: &str) {
        let err = ColorTable::from_json_str(text).unwrap_err();
        assert!(matches!(err, Error::ColorTableFormat(_)), "got {err:?}");
    }

    #[test]
    fn empty_table_is_rejected() {
        let err = ColorTable::from_json_str("{}").unwrap_err();
        assert!(matches!(err, Error::EmptyColorTable));
    }

    #[test]
    fn choose_returns_matching_color() {
        let table = ColorTable::from_json_str(SAMPLE).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let (name, color) = table.choose(&mut rng);
            assert_eq!(table.get(name), Some(color));
        }
    }

    #[test]
    fn choose_eventually_visits_every_name() {
        let table = ColorTable::from_json_str(SAMPLE).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let seen: HashSet<String> = (0..200)
            .map(|_| table.choose(&mut rng).0.to_string())
            .collect();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn bundled_table_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_COLOR_TABLE);
        let table = ColorTable::load(&path).unwrap();
        assert_eq!(table.lookup("black").unwrap(), Color::BLACK);
        assert!(table.len() > 10);
    }
}
