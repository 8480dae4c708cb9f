//! Custom properties attached to maps, layers, objects, tilesets and tiles.

use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use crate::common::Color;
use crate::error::{MapError, Result};
use crate::raw::RawProperty;

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// `string`
    String(String),
    /// `int`, also used for `object` references (object ids)
    Int(i64),
    /// `float`
    Float(f64),
    /// `bool`
    Bool(bool),
    /// `color`
    Color(Color),
    /// `file`, resolved against the owning document's directory when known
    File(PathBuf),
}

/// Insertion-ordered name → value mapping. Names are unique; inserting an
/// existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(String, PropertyValue)>,
}

impl Properties {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a property.
    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Looks up a property by name.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no properties are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Returns a `bool` property.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns an `int` property.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns an `int` property if it fits in `i32`.
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get_i64(name).and_then(|i| i32::try_from(i).ok())
    }

    /// Returns a `float` property.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns a `string` property.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns a `color` property.
    pub fn get_color(&self, name: &str) -> Option<Color> {
        match self.get(name)? {
            PropertyValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Returns a `file` property.
    pub fn get_file(&self, name: &str) -> Option<&Path> {
        match self.get(name)? {
            PropertyValue::File(p) => Some(p),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a Properties {
    type Item = (&'a str, &'a PropertyValue);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a PropertyValue)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

fn bad_value(name: &str, value: &JsonValue) -> MapError {
    MapError::InvalidValue {
        field: "property value",
        value: format!("{name}={value}"),
    }
}

fn as_i64(name: &str, value: &JsonValue) -> Result<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().ok_or_else(|| bad_value(name, value)),
        JsonValue::String(s) => s.trim().parse().map_err(|_| bad_value(name, value)),
        _ => Err(bad_value(name, value)),
    }
}

fn as_f64(name: &str, value: &JsonValue) -> Result<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64().ok_or_else(|| bad_value(name, value)),
        JsonValue::String(s) => s.trim().parse().map_err(|_| bad_value(name, value)),
        _ => Err(bad_value(name, value)),
    }
}

fn as_bool(name: &str, value: &JsonValue) -> Result<bool> {
    match value {
        JsonValue::Bool(b) => Ok(*b),
        JsonValue::String(s) => match s.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(bad_value(name, value)),
        },
        _ => Err(bad_value(name, value)),
    }
}

fn as_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Infers a value for legacy property lists that carry no type tag.
fn infer(value: &JsonValue) -> PropertyValue {
    if let Some(b) = value.as_bool() {
        PropertyValue::Bool(b)
    } else if let Some(i) = value.as_i64() {
        PropertyValue::Int(i)
    } else if let Some(f) = value.as_f64() {
        PropertyValue::Float(f)
    } else {
        PropertyValue::String(as_text(value))
    }
}

fn parse_property(prop: &RawProperty, base_dir: Option<&Path>) -> Result<PropertyValue> {
    let RawProperty { name, kind, value } = prop;

    let parsed = match kind.as_deref() {
        None => infer(value),
        Some("string") => PropertyValue::String(as_text(value)),
        Some("int") | Some("object") => PropertyValue::Int(as_i64(name, value)?),
        Some("float") => PropertyValue::Float(as_f64(name, value)?),
        Some("bool") => PropertyValue::Bool(as_bool(name, value)?),
        Some("color") => PropertyValue::Color(as_text(value).parse()?),
        Some("file") => {
            let raw = PathBuf::from(as_text(value));
            PropertyValue::File(match base_dir {
                Some(dir) if !raw.as_os_str().is_empty() => dir.join(raw),
                _ => raw,
            })
        }
        Some(other) => {
            return Err(MapError::UnsupportedPropertyType {
                name: name.clone(),
                kind: other.to_owned(),
            });
        }
    };

    Ok(parsed)
}

/// Converts raw `(name, type, value)` triples into [`Properties`].
pub(crate) fn parse(raw: Option<&[RawProperty]>, base_dir: Option<&Path>) -> Result<Properties> {
    let mut out = Properties::new();
    for prop in raw.unwrap_or_default() {
        out.insert(prop.name.clone(), parse_property(prop, base_dir)?);
    }
    Ok(out)
}

/// Converts [`Properties`] back into raw triples.
pub(crate) fn to_raw(properties: &Properties) -> Option<Vec<RawProperty>> {
    if properties.is_empty() {
        return None;
    }

    let raw = properties
        .iter()
        .map(|(name, value)| {
            let (kind, value) = match value {
                PropertyValue::String(s) => ("string", JsonValue::from(s.as_str())),
                PropertyValue::Int(i) => ("int", JsonValue::from(*i)),
                PropertyValue::Float(f) => ("float", JsonValue::from(*f)),
                PropertyValue::Bool(b) => ("bool", JsonValue::from(*b)),
                PropertyValue::Color(c) => ("color", JsonValue::from(c.to_string())),
                PropertyValue::File(p) => ("file", JsonValue::from(p.to_string_lossy().as_ref())),
            };
            RawProperty {
                name: name.to_owned(),
                kind: Some(kind.to_owned()),
                value,
            }
        })
        .collect();
    Some(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(name: &str, kind: Option<&str>, value: JsonValue) -> RawProperty {
        RawProperty {
            name: name.to_owned(),
            kind: kind.map(str::to_owned),
            value,
        }
    }

    fn parse_list(list: &[RawProperty], base_dir: Option<&Path>) -> Result<Properties> {
        parse(Some(list), base_dir)
    }

    #[test]
    fn parses_every_supported_type() {
        let props = parse_list(
            &[
                raw("night", Some("bool"), json!(true)),
                raw("gravity", Some("float"), json!(9.8)),
                raw("lives", Some("int"), json!(3)),
                raw("theme", Some("string"), json!("forest")),
                raw("tint", Some("color"), json!("#ff112233")),
                raw("script", Some("file"), json!("scripts/a.lua")),
                raw("target", Some("object"), json!(12)),
            ],
            Some(Path::new("maps")),
        )
        .unwrap();

        assert_eq!(props.get_bool("night"), Some(true));
        assert_eq!(props.get_f64("gravity"), Some(9.8));
        assert_eq!(props.get_i32("lives"), Some(3));
        assert_eq!(props.get_string("theme"), Some("forest"));
        assert_eq!(props.get_color("tint"), Some(Color::rgb(0x11, 0x22, 0x33)));
        assert_eq!(props.get_file("script"), Some(Path::new("maps/scripts/a.lua")));
        assert_eq!(props.get_i64("target"), Some(12));
    }

    #[test]
    fn coerces_xml_string_values() {
        let props = parse_list(
            &[
                raw("solid", Some("bool"), json!("true")),
                raw("hp", Some("int"), json!("42")),
                raw("speed", Some("float"), json!("1.5")),
                raw("label", None, json!("plain")),
            ],
            None,
        )
        .unwrap();

        assert_eq!(props.get_bool("solid"), Some(true));
        assert_eq!(props.get_i64("hp"), Some(42));
        assert_eq!(props.get_f64("speed"), Some(1.5));
        assert_eq!(props.get_string("label"), Some("plain"));
    }

    #[test]
    fn keeps_large_int_property_values() {
        let props = parse_list(&[raw("big_id", Some("object"), json!(5_000_000_000i64))], None).unwrap();
        assert_eq!(props.get_i64("big_id"), Some(5_000_000_000));
        assert_eq!(props.get_i32("big_id"), None);
    }

    #[test]
    fn rejects_unknown_type_tag() {
        let err = parse_list(&[raw("mystery", Some("not_supported"), json!("x"))], None).unwrap_err();
        assert!(matches!(err, MapError::UnsupportedPropertyType { .. }));
    }

    #[test]
    fn duplicate_names_replace_in_place() {
        let mut props = Properties::new();
        props.insert("a", PropertyValue::Int(1));
        props.insert("b", PropertyValue::Int(2));
        props.insert("a", PropertyValue::Int(3));

        let names: Vec<_> = props.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(props.get_i64("a"), Some(3));
    }

    #[test]
    fn to_raw_tags_each_value() {
        let mut props = Properties::new();
        props.insert("c", PropertyValue::Color(Color::rgb(1, 2, 3)));
        props.insert("f", PropertyValue::Float(0.5));

        let raw = to_raw(&props).unwrap();
        assert_eq!(raw[0].kind.as_deref(), Some("color"));
        assert_eq!(raw[0].value, json!("#010203"));
        assert_eq!(raw[1].kind.as_deref(), Some("float"));
        assert!(to_raw(&Properties::new()).is_none());
    }
}
