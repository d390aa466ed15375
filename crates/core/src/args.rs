use std::collections::{BTreeMap, HashMap};
use std::fmt;

use glam::{DVec2, DVec3, DVec4};
use serde::{Deserialize, Serialize};

use crate::math::Mat4d;

/// 64-bit hash value stored as 16 lowercase hex digits.
pub type HashValue = u64;

/// String-keyed attribute bag. Typed getters and setters go through a string
/// encoding so the set can be passed between nodes and plugins verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgSet {
    values: HashMap<String, String>,
}

impl ArgSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Stored string, or `""` when the key is absent.
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn get_string<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.values.get(key).map(String::as_str).unwrap_or(default)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Key/value pairs ordered by key.
    pub fn sorted(&self) -> BTreeMap<&str, &str> {
        self.iter().collect()
    }

    /// Copies every entry of `other` over this set.
    pub fn extend(&mut self, other: &ArgSet) {
        for (key, value) in other.iter() {
            self.set(key, value);
        }
    }

    fn non_empty(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    //--------------------------------------------------------------------
    // Typed access. Absent, empty or unparsable values yield the default.

    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.non_empty(key)
            .and_then(parse_leading_int)
            .and_then(|value| i32::try_from(value).ok())
            .unwrap_or(default)
    }

    pub fn get_double(&self, key: &str, default: f64) -> f64 {
        self.non_empty(key)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .unwrap_or(default)
    }

    /// Parsed as an integer, so `"1.0"` is true and `"0.5"` is false.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.non_empty(key)
            .and_then(parse_leading_int)
            .map(|value| value != 0)
            .unwrap_or(default)
    }

    pub fn get_hash(&self, key: &str, default: HashValue) -> HashValue {
        self.non_empty(key)
            .and_then(|value| {
                let value = value.trim();
                let digits = value
                    .strip_prefix("0x")
                    .or_else(|| value.strip_prefix("0X"))
                    .unwrap_or(value);
                HashValue::from_str_radix(digits, 16).ok()
            })
            .unwrap_or(default)
    }

    pub fn get_vec2d(&self, key: &str, default: DVec2) -> DVec2 {
        self.non_empty(key)
            .and_then(parse_doubles::<2>)
            .map(DVec2::from_array)
            .unwrap_or(default)
    }

    pub fn get_vec3d(&self, key: &str, default: DVec3) -> DVec3 {
        self.non_empty(key)
            .and_then(parse_doubles::<3>)
            .map(DVec3::from_array)
            .unwrap_or(default)
    }

    pub fn get_vec4d(&self, key: &str, default: DVec4) -> DVec4 {
        self.non_empty(key)
            .and_then(parse_doubles::<4>)
            .map(DVec4::from_array)
            .unwrap_or(default)
    }

    pub fn get_mat4d(&self, key: &str, default: Mat4d) -> Mat4d {
        self.non_empty(key)
            .and_then(parse_doubles::<16>)
            .map(Mat4d::from_column_major)
            .unwrap_or(default)
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i32) {
        self.set(key, value.to_string());
    }

    pub fn set_double(&mut self, key: impl Into<String>, value: f64) {
        self.set(key, format_double(value));
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.set(key, if value { "1" } else { "0" });
    }

    pub fn set_hash(&mut self, key: impl Into<String>, value: HashValue) {
        self.set(key, format!("{value:016x}"));
    }

    pub fn set_vec2d(&mut self, key: impl Into<String>, value: DVec2) {
        self.set(key, join_doubles(&value.to_array()));
    }

    pub fn set_vec3d(&mut self, key: impl Into<String>, value: DVec3) {
        self.set(key, join_doubles(&value.to_array()));
    }

    pub fn set_vec4d(&mut self, key: impl Into<String>, value: DVec4) {
        self.set(key, join_doubles(&value.to_array()));
    }

    /// Stored as 16 values in column-major order: `a00 a10 a20 a30 a01 ...`.
    pub fn set_mat4d(&mut self, key: impl Into<String>, value: &Mat4d) {
        self.set(key, join_doubles(&value.to_column_major()));
    }
}

impl fmt::Display for ArgSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (key, value)) in self.sorted().into_iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "'{key}'=[{value}]")?;
        }
        Ok(())
    }
}

impl From<HashMap<String, String>> for ArgSet {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl From<BTreeMap<String, String>> for ArgSet {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ArgSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Shortest representation that parses back to the same double.
pub(crate) fn format_double(value: f64) -> String {
    format!("{value:?}")
}

fn join_doubles(values: &[f64]) -> String {
    values
        .iter()
        .map(|value| format_double(*value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Leading-integer parse: optional sign then digits, trailing text ignored.
fn parse_leading_int(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let (negative, rest) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let magnitude = rest[..digits].parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_doubles<const N: usize>(value: &str) -> Option<[f64; N]> {
    let mut out = [0.0; N];
    let mut parts = value.split_whitespace();
    for slot in out.iter_mut() {
        *slot = parts.next()?.parse::<f64>().ok()?;
    }
    Some(out)
}
