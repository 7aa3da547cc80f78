//! Hierarchical configuration access on top of the `config` crate.
//!
//! [`ConfigSection`] is a read-only view of one subtree. Key lookups are
//! case-insensitive, missing keys read as `None`, and children enumerate in a
//! stable order so endpoints bind in the same sequence on every run.

pub mod reader;

pub use reader::{ConfigReader, EndpointConfig};

use std::cmp::Ordering;
use std::path::Path;

use config::{ConfigError, FileFormat, Value, ValueKind};

/// Separators accepted in a multi-segment key such as `Endpoints:Demo:Url`.
const KEY_SEPARATORS: [char; 2] = [':', '.'];

/// A named subtree of the configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigSection {
    key: String,
    path: String,
    value: Option<Value>,
}

impl ConfigSection {
    /// Root section over an already materialised value.
    pub fn from_value(value: Value) -> Self {
        Self {
            key: String::new(),
            path: String::new(),
            value: Some(value),
        }
    }

    /// Snapshot the whole of `cfg` as the root section.
    ///
    /// The `config` crate lowercases keys while building, so names read back
    /// from this snapshot are lowercase. Use [`ConfigSection::parse`] where the
    /// declared casing matters.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be materialised.
    pub fn from_config(cfg: &config::Config) -> Result<Self, ConfigError> {
        let value: Value = cfg.clone().try_deserialize()?;
        Ok(Self::from_value(value))
    }

    /// Parse a JSON or TOML document, keeping keys exactly as written.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is not valid in `format`, or if `format` is
    /// neither JSON nor TOML.
    pub fn parse(text: &str, format: FileFormat) -> Result<Self, ConfigError> {
        let value: Value = match format {
            FileFormat::Json => {
                serde_json::from_str(text).map_err(|e| ConfigError::Foreign(Box::new(e)))?
            }
            FileFormat::Toml => {
                toml::from_str(text).map_err(|e| ConfigError::Foreign(Box::new(e)))?
            }
            other => {
                return Err(ConfigError::Message(format!(
                    "unsupported settings format {other:?}; use JSON or TOML"
                )))
            }
        };
        Ok(Self::from_value(value))
    }

    /// Read a settings file, picking the format from its extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has an extension other
    /// than `.json` or `.toml`, or does not parse.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let format = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            Some(ext) if ext.eq_ignore_ascii_case("toml") => FileFormat::Toml,
            _ => {
                return Err(ConfigError::Message(format!(
                    "settings file {} must end in .json or .toml",
                    path.display()
                )))
            }
        };
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Foreign(Box::new(e)))?;
        Self::parse(&text, format)
    }

    /// Overlay `other` onto this section. Tables merge key by key, matching
    /// keys case-insensitively and keeping this section's casing; any other
    /// value in `other` replaces the one here.
    pub fn merge(&mut self, other: ConfigSection) {
        let Some(overlay) = other.value else {
            return;
        };
        match &mut self.value {
            Some(base) => merge_values(base, overlay),
            None => self.value = Some(overlay),
        }
    }

    /// Last key segment of this section (empty for the root).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Full `:`-joined path from the root, e.g. `Endpoints:Demo:Certificate`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Navigate to a sub-section. A missing section is returned empty rather
    /// than as an error.
    pub fn section(&self, key: &str) -> ConfigSection {
        key.split(KEY_SEPARATORS)
            .filter(|segment| !segment.is_empty())
            .fold(self.clone(), |section, segment| section.child(segment))
    }

    /// Read a scalar value. Tables, arrays, and missing keys read as `None`.
    pub fn get(&self, key: &str) -> Option<String> {
        let section = self.section(key);
        match section.value?.kind {
            ValueKind::Nil | ValueKind::Table(_) | ValueKind::Array(_) => None,
            kind => Value::new(None, kind).into_string().ok(),
        }
    }

    /// Immediate children in key order: numeric keys first and numerically,
    /// then the rest case-insensitively.
    pub fn children(&self) -> Vec<ConfigSection> {
        let mut children: Vec<ConfigSection> = match self.value.as_ref().map(|v| &v.kind) {
            Some(ValueKind::Table(map)) => map
                .iter()
                .map(|(key, value)| self.make_child(key, Some(value.clone())))
                .collect(),
            Some(ValueKind::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, value)| self.make_child(&index.to_string(), Some(value.clone())))
                .collect(),
            _ => Vec::new(),
        };
        children.sort_by(|a, b| compare_keys(&a.key, &b.key));
        children
    }

    /// `true` if the section holds a scalar or has at least one child.
    pub fn exists(&self) -> bool {
        match self.value.as_ref().map(|v| &v.kind) {
            None | Some(ValueKind::Nil) => false,
            Some(ValueKind::Table(map)) => !map.is_empty(),
            Some(ValueKind::Array(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }

    /// Child named `key`. When it exists the section takes the declared
    /// casing of its key.
    fn child(&self, key: &str) -> ConfigSection {
        match self.value.as_ref().map(|v| &v.kind) {
            Some(ValueKind::Table(map)) => {
                match map.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
                    Some((declared, value)) => self.make_child(declared, Some(value.clone())),
                    None => self.make_child(key, None),
                }
            }
            Some(ValueKind::Array(items)) => {
                let value = key.parse::<usize>().ok().and_then(|i| items.get(i).cloned());
                self.make_child(key, value)
            }
            _ => self.make_child(key, None),
        }
    }

    fn make_child(&self, key: &str, value: Option<Value>) -> ConfigSection {
        let path = if self.path.is_empty() {
            key.to_owned()
        } else {
            format!("{}:{key}", self.path)
        };
        ConfigSection {
            key: key.to_owned(),
            path,
            value,
        }
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (&mut base.kind, overlay.kind) {
        (ValueKind::Table(base_map), ValueKind::Table(overlay_map)) => {
            for (key, value) in overlay_map {
                let existing = base_map.keys().find(|k| k.eq_ignore_ascii_case(&key)).cloned();
                match existing {
                    Some(existing) => {
                        if let Some(slot) = base_map.get_mut(&existing) {
                            merge_values(slot, value);
                        }
                    }
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, kind) => *slot = kind,
    }
}

fn compare_keys(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()),
    }
}

#[cfg(test)]
pub(crate) fn section_from_json(json: &str) -> ConfigSection {
    ConfigSection::parse(json, FileFormat::Json).expect("valid JSON configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_lookup_is_case_insensitive() {
        let root = section_from_json(r#"{"Endpoints": {"Demo": {"Url": "http://*:5000"}}}"#);
        assert_eq!(root.get("endpoints:demo:url").as_deref(), Some("http://*:5000"));
        assert_eq!(
            root.section("ENDPOINTS").section("Demo").get("URL").as_deref(),
            Some("http://*:5000")
        );
    }

    #[test]
    fn missing_keys_read_as_none() {
        let root = section_from_json(r#"{"Endpoints": {}}"#);
        assert_eq!(root.get("Endpoints:Demo:Url"), None);
        assert!(!root.section("Nope").exists());
        assert!(root.section("Nope").children().is_empty());
    }

    #[test]
    fn tables_are_not_scalars() {
        let root = section_from_json(r#"{"A": {"B": "c"}}"#);
        assert_eq!(root.get("A"), None);
        assert!(root.section("A").exists());
    }

    #[test]
    fn numbers_read_as_strings() {
        let root = section_from_json(r#"{"Port": 5000}"#);
        assert_eq!(root.get("Port").as_deref(), Some("5000"));
    }

    #[test]
    fn children_are_ordered() {
        let root = section_from_json(r#"{"S": {"b": 1, "10": 1, "A": 1, "2": 1}}"#);
        let children = root.section("S").children();
        let keys: Vec<&str> = children.iter().map(ConfigSection::key).collect();
        assert_eq!(keys, vec!["2", "10", "A", "b"]);
    }

    #[test]
    fn array_children_use_index_keys() {
        let root = section_from_json(r#"{"L": [{"Url": "http://a:1"}, {"Url": "http://b:2"}]}"#);
        let children = root.section("L").children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].key(), "1");
        assert_eq!(children[1].get("Url").as_deref(), Some("http://b:2"));
        assert_eq!(root.get("L:0:Url").as_deref(), Some("http://a:1"));
    }

    #[test]
    fn path_tracks_navigation() {
        let root =
            section_from_json(r#"{"Endpoints": {"Demo": {"Certificate": {"Path": "c.pem"}}}}"#);
        let cert = root.section("endpoints").section("DEMO").section("Certificate");
        assert_eq!(cert.path(), "Endpoints:Demo:Certificate");
        assert_eq!(cert.key(), "Certificate");
    }

    #[test]
    fn keys_keep_declared_case() {
        let root =
            section_from_json(r#"{"Endpoints": {"DemoEndpoint": {"Url": "http://*:5000"}}}"#);
        let children = root.section("Endpoints").children();
        assert_eq!(children[0].key(), "DemoEndpoint");
    }

    #[test]
    fn parses_toml() {
        let root = ConfigSection::parse(
            "[Endpoints.DemoEndpoint]\nUrl = \"http://*:5000\"\n",
            FileFormat::Toml,
        )
        .unwrap();
        let children = root.section("Endpoints").children();
        assert_eq!(children[0].key(), "DemoEndpoint");
        assert_eq!(children[0].get("Url").as_deref(), Some("http://*:5000"));
    }

    #[test]
    fn invalid_document_is_an_error() {
        assert!(ConfigSection::parse("{not json", FileFormat::Json).is_err());
    }

    #[test]
    fn from_file_requires_known_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.ini");
        std::fs::write(&path, "x = 1").unwrap();
        assert!(ConfigSection::from_file(&path).is_err());

        let path = dir.path().join("server.JSON");
        std::fs::write(&path, r#"{"Endpoints": {"Api": {"Url": "http://*:1"}}}"#).unwrap();
        let root = ConfigSection::from_file(&path).unwrap();
        assert_eq!(root.section("Endpoints").children()[0].key(), "Api");
    }

    #[test]
    fn merge_overrides_values_and_keeps_declared_case() {
        let mut base = section_from_json(
            r#"{"Endpoints": {"DemoEndpoint": {
                "Url": "http://*:5000",
                "Certificate": {"Path": "a.pem"}
            }}}"#,
        );
        let overlay = section_from_json(
            r#"{"endpoints": {
                "demoendpoint": {"url": "http://*:6000"},
                "extra": {"url": "http://*:7000"}
            }}"#,
        );
        base.merge(overlay);

        let endpoints = base.section("Endpoints").children();
        let keys: Vec<&str> = endpoints.iter().map(ConfigSection::key).collect();
        assert_eq!(keys, vec!["DemoEndpoint", "extra"]);
        assert_eq!(endpoints[0].get("Url").as_deref(), Some("http://*:6000"));
        assert_eq!(endpoints[0].get("Certificate:Path").as_deref(), Some("a.pem"));
    }

    #[test]
    fn merge_into_empty_section_takes_overlay() {
        let mut base = ConfigSection::default();
        base.merge(section_from_json(r#"{"A": "b"}"#));
        assert_eq!(base.get("A").as_deref(), Some("b"));

        base.merge(ConfigSection::default());
        assert_eq!(base.get("A").as_deref(), Some("b"));
    }
}
