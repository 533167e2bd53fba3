//! Environment variable substitution for configuration values.
//!
//! String values may embed `${NAME}` or `${NAME:-default}`. A reference with
//! no default fails when `NAME` is unset. When a string consists of exactly
//! one reference, the substituted text is re-typed (so `"${PORT:-5432}"`
//! becomes the integer `5432`); references mixed with other text always
//! produce a string. Malformed syntax such as an unclosed `${` is kept as
//! literal text.

use std::collections::{BTreeMap, HashMap};
use std::env::VarError;

use tracing::{debug, trace};

use super::coerce::{infer_collection, infer_scalar};
use super::value::ConfigValue;
use super::ConfigError;

/// Source of environment variable values.
///
/// Variables whose name or value is not valid UTF-8 are treated as unset.
pub trait EnvLookup {
    fn lookup(&self, name: &str) -> Option<String>;

    /// Every variable visible through this lookup, in any order.
    fn vars(&self) -> Vec<(String, String)>;
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        match std::env::var(name) {
            Ok(value) => Some(value),
            Err(VarError::NotPresent) => None,
            Err(VarError::NotUnicode(_)) => {
                debug!(name, "ignoring environment variable with non-UTF-8 value");
                None
            }
        }
    }

    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (key, _) => {
                    let name = key.unwrap_or_else(|k| k.to_string_lossy().into_owned());
                    debug!(name = %name, "ignoring non-UTF-8 environment variable");
                    None
                }
            })
            .collect()
    }
}

impl EnvLookup for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl EnvLookup for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl<T: EnvLookup + ?Sized> EnvLookup for &T {
    fn lookup(&self, name: &str) -> Option<String> {
        (**self).lookup(name)
    }

    fn vars(&self) -> Vec<(String, String)> {
        (**self).vars()
    }
}

/// One `${NAME}` or `${NAME:-DEFAULT}` occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
    pub name: &'a str,
    pub default: Option<&'a str>,
}

/// A piece of a scanned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Reference(Reference<'a>),
}

/// Splits `s` into literal text and references, in order.
pub fn scan(s: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while let Some(offset) = s[pos..].find("${") {
        let start = pos + offset;
        match parse_reference(&s[start + 2..]) {
            Some((reference, consumed)) => {
                if literal_start < start {
                    segments.push(Segment::Literal(&s[literal_start..start]));
                }
                segments.push(Segment::Reference(reference));
                pos = start + 2 + consumed;
                literal_start = pos;
            }
            // Not a reference: the '$' stays literal, keep scanning after it.
            None => pos = start + 1,
        }
    }

    if literal_start < s.len() {
        segments.push(Segment::Literal(&s[literal_start..]));
    }
    segments
}

/// Parses what follows `${`. Returns the reference and the number of bytes
/// consumed, including the closing `}`.
fn parse_reference(rest: &str) -> Option<(Reference<'_>, usize)> {
    let name_len = rest.bytes().take_while(|b| is_name_byte(*b)).count();
    if name_len == 0 {
        return None;
    }
    let name = &rest[..name_len];
    let after = &rest[name_len..];

    if after.starts_with('}') {
        return Some((Reference { name, default: None }, name_len + 1));
    }

    let tail = after.strip_prefix(":-")?;
    let end = tail.find('}')?;
    Some((
        Reference {
            name,
            default: Some(&tail[..end]),
        },
        name_len + 2 + end + 1,
    ))
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Substitutes environment references throughout a tree.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<L> {
    lookup: L,
    structured_values: bool,
}

impl<L: EnvLookup> Resolver<L> {
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            structured_values: false,
        }
    }

    /// When enabled, a whole-string reference whose value is an inline
    /// `[...]` or `{...}` collection becomes a sequence or mapping.
    pub fn structured_values(mut self, enabled: bool) -> Self {
        self.structured_values = enabled;
        self
    }

    /// Resolves every reference in `tree`.
    ///
    /// The first reference to an unset variable without a default aborts the
    /// whole operation.
    pub fn resolve(&self, mut tree: ConfigValue) -> Result<ConfigValue, ConfigError> {
        self.resolve_value(&mut tree)?;
        Ok(tree)
    }

    fn resolve_value(&self, value: &mut ConfigValue) -> Result<(), ConfigError> {
        match value {
            ConfigValue::String(s) => {
                if let Some(resolved) = self.resolve_string(s)? {
                    *value = resolved;
                }
            }
            ConfigValue::Mapping(map) => {
                for child in map.values_mut() {
                    self.resolve_value(child)?;
                }
            }
            ConfigValue::Sequence(items) => {
                for child in items.iter_mut() {
                    self.resolve_value(child)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Returns `None` when `s` holds no references.
    fn resolve_string(&self, s: &str) -> Result<Option<ConfigValue>, ConfigError> {
        let segments = scan(s);

        match segments.as_slice() {
            [Segment::Reference(reference)] => {
                let text = self.substitute(reference)?;
                Ok(Some(self.retype(text)))
            }
            segments if segments.iter().any(|s| matches!(s, Segment::Reference(_))) => {
                let mut result = String::with_capacity(s.len());
                for segment in segments {
                    match segment {
                        Segment::Literal(text) => result.push_str(text),
                        Segment::Reference(reference) => {
                            result.push_str(&self.substitute(reference)?);
                        }
                    }
                }
                Ok(Some(ConfigValue::String(result)))
            }
            _ => Ok(None),
        }
    }

    fn substitute(&self, reference: &Reference<'_>) -> Result<String, ConfigError> {
        if let Some(value) = self.lookup.lookup(reference.name) {
            trace!(name = reference.name, "substituted environment variable");
            return Ok(value);
        }

        match reference.default {
            Some(default) => {
                trace!(name = reference.name, "environment variable unset, using default");
                Ok(default.to_string())
            }
            None => Err(ConfigError::MissingEnvVar(reference.name.to_string())),
        }
    }

    fn retype(&self, text: String) -> ConfigValue {
        if self.structured_values {
            if let Some(collection) = infer_collection(&text) {
                return collection;
            }
        }
        infer_scalar(&text)
    }
}

/// Resolves every reference in `tree` against `lookup`.
pub fn resolve<L: EnvLookup>(tree: ConfigValue, lookup: L) -> Result<ConfigValue, ConfigError> {
    Resolver::new(lookup).resolve(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn tree(value: serde_json::Value) -> ConfigValue {
        ConfigValue::from_json(value)
    }

    #[test]
    fn test_scan_segments() {
        assert_eq!(
            scan("a${X}b${Y:-z}"),
            vec![
                Segment::Literal("a"),
                Segment::Reference(Reference { name: "X", default: None }),
                Segment::Literal("b"),
                Segment::Reference(Reference { name: "Y", default: Some("z") }),
            ]
        );
    }

    #[test]
    fn test_scan_malformed_is_literal() {
        assert_eq!(scan("${unclosed"), vec![Segment::Literal("${unclosed")]);
        assert_eq!(scan("${}"), vec![Segment::Literal("${}")]);
        assert_eq!(scan("${A B}"), vec![Segment::Literal("${A B}")]);
        assert_eq!(scan("$X"), vec![Segment::Literal("$X")]);
    }

    #[test]
    fn test_scan_default_stops_at_first_brace() {
        assert_eq!(
            scan("${A:-${B}}"),
            vec![
                Segment::Reference(Reference { name: "A", default: Some("${B") }),
                Segment::Literal("}"),
            ]
        );
    }

    #[test]
    fn test_scan_recovers_after_stray_dollar() {
        assert_eq!(
            scan("${${X}"),
            vec![
                Segment::Literal("${"),
                Segment::Reference(Reference { name: "X", default: None }),
            ]
        );
    }

    #[test]
    fn test_default_is_retyped() {
        let result = resolve(tree(serde_json::json!({"k": "${X:-5432}"})), &env(&[])).unwrap();
        assert_eq!(result, tree(serde_json::json!({"k": 5432})));
    }

    #[test]
    fn test_empty_default_is_null() {
        let result = resolve(tree(serde_json::json!({"k": "${X:-}"})), &env(&[])).unwrap();
        assert_eq!(result, tree(serde_json::json!({"k": null})));
    }

    #[test]
    fn test_env_value_is_retyped() {
        let vars = env(&[("B", "true"), ("F", "123.45"), ("S", "default_string")]);
        let result = resolve(
            tree(serde_json::json!({"b": "${B}", "f": "${F}", "s": "${S}"})),
            &vars,
        )
        .unwrap();
        assert_eq!(result.get("b"), Some(&ConfigValue::Boolean(true)));
        assert_eq!(result.get("f"), Some(&ConfigValue::Float(123.45)));
        assert_eq!(result.get("s"), Some(&ConfigValue::from("default_string")));
    }

    #[test]
    fn test_env_value_wins_over_default() {
        let result = resolve(
            tree(serde_json::json!({"k": "${X:-fallback}"})),
            &env(&[("X", "set")]),
        )
        .unwrap();
        assert_eq!(result.get("k"), Some(&ConfigValue::from("set")));
    }

    #[test]
    fn test_missing_var_without_default() {
        let result = resolve(tree(serde_json::json!({"k": "${X}"})), &env(&[]));
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(name)) if name == "X"));
    }

    #[test]
    fn test_missing_var_in_mixed_text() {
        let result = resolve(tree(serde_json::json!({"k": "a-${X}"})), &env(&[]));
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(name)) if name == "X"));
    }

    #[test]
    fn test_mixed_text_stays_string() {
        let result = resolve(
            tree(serde_json::json!({"k": "prefix-${X}-suffix"})),
            &env(&[("X", "5")]),
        )
        .unwrap();
        assert_eq!(result, tree(serde_json::json!({"k": "prefix-5-suffix"})));
    }

    #[test]
    fn test_multiple_references_stay_string() {
        let result = resolve(
            tree(serde_json::json!({"k": "${A}${B}"})),
            &env(&[("A", "1"), ("B", "2")]),
        )
        .unwrap();
        assert_eq!(result.get("k"), Some(&ConfigValue::from("12")));
    }

    #[test]
    fn test_substituted_value_not_rescanned() {
        let result = resolve(
            tree(serde_json::json!({"k": "${A}"})),
            &env(&[("A", "${B}")]),
        )
        .unwrap();
        assert_eq!(result.get("k"), Some(&ConfigValue::from("${B}")));
    }

    #[test]
    fn test_nested_sequences_and_mappings() {
        let vars = env(&[("HOST", "db"), ("PORT", "5432")]);
        let result = resolve(
            tree(serde_json::json!({
                "servers": [{"host": "${HOST}", "port": "${PORT}"}, "literal"],
                "count": 3
            })),
            &vars,
        )
        .unwrap();
        assert_eq!(
            result,
            tree(serde_json::json!({
                "servers": [{"host": "db", "port": 5432}, "literal"],
                "count": 3
            }))
        );
    }

    #[test]
    fn test_literal_passthrough_is_fixed_point() {
        let original = tree(serde_json::json!({
            "s": "no refs here $ { }",
            "n": 1,
            "f": 1.5,
            "b": false,
            "z": null,
            "l": ["x", {"y": "${"}]
        }));
        let once = resolve(original.clone(), &env(&[])).unwrap();
        let twice = resolve(once.clone(), &env(&[])).unwrap();
        assert_eq!(once, original);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_structured_values() {
        let vars = env(&[("LIST", r#"["a", "b", "c"]"#), ("DICT", r#"{"key1": "value1"}"#)]);
        let input = tree(serde_json::json!({"l": "${LIST}", "d": "${DICT}"}));

        let plain = resolve(input.clone(), &vars).unwrap();
        assert_eq!(plain.get("l"), Some(&ConfigValue::from(r#"["a", "b", "c"]"#)));

        let structured = Resolver::new(&vars).structured_values(true).resolve(input).unwrap();
        assert_eq!(
            structured.get("l"),
            Some(&ConfigValue::Sequence(vec!["a".into(), "b".into(), "c".into()]))
        );
        assert_eq!(
            structured.get_path("d.key1"),
            Some(&ConfigValue::from("value1"))
        );
    }

    #[test]
    fn test_first_missing_in_document_order_wins() {
        let input = ConfigValue::from_yaml(
            serde_yaml::from_str("zeta: ${FIRST_MISSING}\nalpha: ${SECOND_MISSING}\n").unwrap(),
        )
        .unwrap();
        let result = resolve(input, &env(&[]));
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(name)) if name == "FIRST_MISSING"));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_env_non_utf8_value_is_unset() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let name = "SETTINGS_SOURCES_RESOLVE_TEST_NON_UTF8";
        std::env::set_var(name, OsStr::from_bytes(&[0x66, 0xff, 0x6f]));

        assert_eq!(ProcessEnv.lookup(name), None);
        assert!(ProcessEnv.vars().iter().all(|(key, _)| key != name));

        let reference = format!("${{{name}:-fallback}}");
        let result = resolve(tree(serde_json::json!({ "k": reference })), ProcessEnv);
        assert_eq!(result.unwrap().get("k"), Some(&ConfigValue::from("fallback")));
    }

    #[test]
    fn test_process_env_lookup() {
        std::env::set_var("SETTINGS_SOURCES_RESOLVE_TEST_PORT", "6543");
        let result = resolve(
            tree(serde_json::json!({"port": "${SETTINGS_SOURCES_RESOLVE_TEST_PORT}"})),
            ProcessEnv,
        )
        .unwrap();
        assert_eq!(result.get("port"), Some(&ConfigValue::Integer(6543)));
    }
}
