use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;

/// Errors from required configuration lookups.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("no key found for {0}")]
    MissingKey(String),
    #[error("no keys found for {0:?}")]
    MissingOneOf(Vec<String>),
    #[error("value for key {key} must be of type {expected}")]
    WrongType { key: String, expected: &'static str },
    #[error("entry {entry} under key {key} must be {expected}")]
    BadEntry {
        key: String,
        entry: String,
        expected: &'static str,
    },
    #[error("value {value:?} for key {key} is not a known {kind}")]
    UnknownVariant {
        key: String,
        value: String,
        kind: &'static str,
    },
}

/// User-configured data with type-checked accessors.
///
/// Every `get_*` has a required form returning [`ConfigError`] and an
/// `_or`/`_or_empty` form that silently falls back when the key is absent
/// or holds the wrong kind of value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeData {
    backing: Mapping,
}

impl TypeData {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_mapping(backing: Mapping) -> Self {
        Self { backing }
    }

    /// Load a table from a YAML file.
    ///
    /// IO and parse errors are logged and produce an empty table.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_yaml_str(&text),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "could not read configuration");
                Self::empty()
            }
        }
    }

    /// Parse a table from YAML text, degrading to empty on malformed input.
    pub fn from_yaml_str(text: &str) -> Self {
        match serde_yaml::from_str::<Value>(text) {
            Ok(Value::Mapping(backing)) => Self { backing },
            Ok(Value::Null) => Self::empty(),
            Ok(_) => {
                tracing::warn!("configuration root is not a table");
                Self::empty()
            }
            Err(error) => {
                tracing::warn!(%error, "malformed configuration");
                Self::empty()
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.backing.contains_key(key)
    }

    /// Top-level keys that are strings, in file order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.backing.keys().filter_map(Value::as_str)
    }

    pub fn backing_data(&self) -> &Mapping {
        &self.backing
    }

    pub fn require_key(&self, key: &str) -> Result<(), ConfigError> {
        if self.contains_key(key) {
            Ok(())
        } else {
            Err(ConfigError::MissingKey(key.to_string()))
        }
    }

    /// Succeeds if at least one of `keys` is present.
    pub fn require_one_of(&self, keys: &[&str]) -> Result<(), ConfigError> {
        if keys.iter().any(|k| self.contains_key(k)) {
            Ok(())
        } else {
            Err(ConfigError::MissingOneOf(
                keys.iter().map(|k| k.to_string()).collect(),
            ))
        }
    }

    fn require(&self, key: &str) -> Result<&Value, ConfigError> {
        self.backing
            .get(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    fn typed<'a, T>(
        &'a self,
        key: &str,
        expected: &'static str,
        convert: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, ConfigError> {
        convert(self.require(key)?).ok_or_else(|| ConfigError::WrongType {
            key: key.to_string(),
            expected,
        })
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        self.typed(key, "boolean", Value::as_bool)
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// Integer values only; floats are a type mismatch.
    pub fn get_int(&self, key: &str) -> Result<i64, ConfigError> {
        self.typed(key, "int", Value::as_i64)
    }

    pub fn get_int_or(&self, key: &str, default: i64) -> i64 {
        self.get_int(key).unwrap_or(default)
    }

    /// Accepts both floating point and integer values.
    pub fn get_double(&self, key: &str) -> Result<f64, ConfigError> {
        self.typed(key, "double", Value::as_f64)
    }

    pub fn get_double_or(&self, key: &str, default: f64) -> f64 {
        self.get_double(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<&str, ConfigError> {
        self.typed(key, "string", Value::as_str)
    }

    pub fn get_string_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_string(key).unwrap_or(default)
    }

    /// Parse a string value by name into `T`.
    pub fn get_enum<T: FromStr>(&self, key: &str) -> Result<T, ConfigError> {
        let name = self.get_string(key)?;
        name.parse().map_err(|_| ConfigError::UnknownVariant {
            key: key.to_string(),
            value: name.to_string(),
            kind: short_type_name::<T>(),
        })
    }

    pub fn get_enum_or<T: FromStr>(&self, key: &str, default: T) -> T {
        self.get_enum(key).unwrap_or(default)
    }

    /// A list of names parsed into a set of `T`. Any bad entry fails the lookup.
    pub fn get_enum_set<T: FromStr + Ord>(&self, key: &str) -> Result<BTreeSet<T>, ConfigError> {
        let list = self
            .require(key)?
            .as_sequence()
            .ok_or_else(|| ConfigError::WrongType {
                key: key.to_string(),
                expected: "list",
            })?;
        let mut out = BTreeSet::new();
        for entry in list {
            let parsed = entry.as_str().and_then(|name| name.parse().ok());
            match parsed {
                Some(value) => {
                    out.insert(value);
                }
                None => {
                    return Err(ConfigError::BadEntry {
                        key: key.to_string(),
                        entry: describe(entry),
                        expected: short_type_name::<T>(),
                    });
                }
            }
        }
        Ok(out)
    }

    /// Like [`TypeData::get_enum_set`], but skips entries that do not parse.
    pub fn get_enum_set_or_empty<T: FromStr + Ord>(&self, key: &str) -> BTreeSet<T> {
        self.get_list_or_empty(key)
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|name| name.parse().ok())
            .collect()
    }

    /// Nested table under `key`.
    pub fn get_data(&self, key: &str) -> Result<TypeData, ConfigError> {
        self.typed(key, "map", |v| v.as_mapping().cloned().map(Self::from_mapping))
    }

    pub fn get_data_or_empty(&self, key: &str) -> TypeData {
        self.get_data(key).unwrap_or_default()
    }

    pub fn get_list(&self, key: &str) -> Result<&[Value], ConfigError> {
        self.typed(key, "list", |v| v.as_sequence().map(Vec::as_slice))
    }

    pub fn get_list_or_empty(&self, key: &str) -> &[Value] {
        self.get_list(key).unwrap_or(&[])
    }

    pub fn get_string_list(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        self.get_list(key)?
            .iter()
            .map(|entry| {
                entry
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ConfigError::BadEntry {
                        key: key.to_string(),
                        entry: describe(entry),
                        expected: "string",
                    })
            })
            .collect()
    }

    /// Strings under `key`; non-string entries are dropped.
    pub fn get_string_list_or_empty(&self, key: &str) -> Vec<String> {
        self.get_list_or_empty(key)
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    }
}

fn describe(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| format!("{value:?}"))
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum Material {
        Stone,
        Dirt,
        Glass,
    }

    impl FromStr for Material {
        type Err = ();

        fn from_str(s: &str) -> Result<Self, ()> {
            match s {
                "STONE" => Ok(Self::Stone),
                "DIRT" => Ok(Self::Dirt),
                "GLASS" => Ok(Self::Glass),
                _ => Err(()),
            }
        }
    }

    const CRAFT: &str = r#"
name: Airship
maxSize: 5000
speed: 1.5
cruiseSkipBlocks: 2
canFly: true
allowedBlocks: [STONE, DIRT, GLASS]
mixedBlocks: [STONE, 7, BEDROCK]
tags: [fast, "slow", 3]
moveEntities:
  onlyPlayers: false
  radius: 4
fuel: COAL
"#;

    fn craft() -> TypeData {
        TypeData::from_yaml_str(CRAFT)
    }

    #[test]
    fn scalar_getters() {
        let data = craft();
        assert_eq!(data.get_string("name"), Ok("Airship"));
        assert_eq!(data.get_int("maxSize"), Ok(5000));
        assert_eq!(data.get_double("speed"), Ok(1.5));
        assert_eq!(data.get_double("cruiseSkipBlocks"), Ok(2.0));
        assert_eq!(data.get_bool("canFly"), Ok(true));
    }

    #[test]
    fn required_getters_report_missing_and_mismatched() {
        let data = craft();
        assert_eq!(
            data.get_bool("canDive"),
            Err(ConfigError::MissingKey("canDive".into()))
        );
        assert_eq!(
            data.get_int("speed"),
            Err(ConfigError::WrongType {
                key: "speed".into(),
                expected: "int",
            })
        );
        let msg = data.get_bool("name").unwrap_err().to_string();
        assert_eq!(msg, "value for key name must be of type boolean");
    }

    #[test]
    fn defaulting_getters_fall_back_silently() {
        let data = craft();
        assert!(!data.get_bool_or("canDive", false));
        assert_eq!(data.get_int_or("speed", 7), 7);
        assert_eq!(data.get_double_or("missing", 0.25), 0.25);
        assert_eq!(data.get_string_or("maxSize", "none"), "none");
        assert_eq!(data.get_int_or("maxSize", 0), 5000);
    }

    #[test]
    fn enums_by_name() {
        let data = craft();
        assert_eq!(
            data.get_enum::<Material>("fuel"),
            Err(ConfigError::UnknownVariant {
                key: "fuel".into(),
                value: "COAL".into(),
                kind: "Material",
            })
        );
        assert_eq!(data.get_enum_or("fuel", Material::Dirt), Material::Dirt);

        let allowed = data.get_enum_set::<Material>("allowedBlocks").unwrap();
        assert_eq!(
            allowed.into_iter().collect::<Vec<_>>(),
            vec![Material::Stone, Material::Dirt, Material::Glass]
        );
    }

    #[test]
    fn enum_sets_reject_or_skip_bad_entries() {
        let data = craft();
        assert!(matches!(
            data.get_enum_set::<Material>("mixedBlocks"),
            Err(ConfigError::BadEntry { ref entry, .. }) if entry == "7"
        ));
        let lenient: BTreeSet<Material> = data.get_enum_set_or_empty("mixedBlocks");
        assert_eq!(lenient.len(), 1);
        assert!(data.get_enum_set_or_empty::<Material>("name").is_empty());
    }

    #[test]
    fn nested_tables() {
        let data = craft();
        let entities = data.get_data("moveEntities").unwrap();
        assert_eq!(entities.get_int("radius"), Ok(4));
        assert!(!entities.get_bool_or("onlyPlayers", true));

        assert!(data.get_data("name").is_err());
        assert_eq!(data.get_data_or_empty("nope"), TypeData::empty());
    }

    #[test]
    fn lists_and_string_lists() {
        let data = craft();
        assert_eq!(data.get_list("tags").unwrap().len(), 3);
        assert!(data.get_list("name").is_err());
        assert!(data.get_list_or_empty("name").is_empty());

        assert!(matches!(
            data.get_string_list("tags"),
            Err(ConfigError::BadEntry { expected: "string", .. })
        ));
        assert_eq!(data.get_string_list_or_empty("tags"), vec!["fast", "slow"]);
    }

    #[test]
    fn require_one_of() {
        let data = craft();
        assert!(data.require_one_of(&["speed", "tickCooldown"]).is_ok());
        assert_eq!(
            data.require_one_of(&["a", "b"]),
            Err(ConfigError::MissingOneOf(vec!["a".into(), "b".into()]))
        );
        assert!(data.require_key("fuel").is_ok());
    }

    #[test]
    fn keys_in_file_order() {
        let data = TypeData::from_yaml_str("b: 1\na: 2\n");
        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn load_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(CRAFT.as_bytes()).unwrap();
        let data = TypeData::load(tmp.path());
        assert_eq!(data, craft());
    }

    #[test]
    fn load_failures_degrade_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = TypeData::load(dir.path().join("missing.craft"));
        assert_eq!(missing, TypeData::empty());

        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"key: [unclosed").unwrap();
        assert_eq!(TypeData::load(tmp.path()), TypeData::empty());

        assert_eq!(TypeData::from_yaml_str("- just\n- a list\n"), TypeData::empty());
        assert_eq!(TypeData::from_yaml_str(""), TypeData::empty());
    }
}
