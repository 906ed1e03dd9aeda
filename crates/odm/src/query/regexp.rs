//! Regular expression query options.

use std::ops::{BitOr, BitOrAssign};

use serde_json::{Map, Value};

/// Lucene regular expression syntax flags as a bit set.
///
/// Flags always render in the canonical order of [`RegexpFlags::CANONICAL`],
/// whatever order they were combined in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegexpFlags(u16);

impl RegexpFlags {
    /// No optional syntax.
    pub const NONE: RegexpFlags = RegexpFlags(0);
    /// `&` intersection operator.
    pub const INTERSECTION: RegexpFlags = RegexpFlags(0x0001);
    /// `~` complement operator.
    pub const COMPLEMENT: RegexpFlags = RegexpFlags(0x0002);
    /// `#` empty language.
    pub const EMPTY: RegexpFlags = RegexpFlags(0x0004);
    /// `@` any string.
    pub const ANYSTRING: RegexpFlags = RegexpFlags(0x0008);
    /// `<n-m>` numeric intervals.
    pub const INTERVAL: RegexpFlags = RegexpFlags(0x0020);
    /// Every optional operator.
    pub const ALL: RegexpFlags = RegexpFlags(0x002F);

    /// Rendering order of the individual flags.
    pub const CANONICAL: [(RegexpFlags, &'static str); 5] = [
        (RegexpFlags::INTERSECTION, "INTERSECTION"),
        (RegexpFlags::COMPLEMENT, "COMPLEMENT"),
        (RegexpFlags::EMPTY, "EMPTY"),
        (RegexpFlags::ANYSTRING, "ANYSTRING"),
        (RegexpFlags::INTERVAL, "INTERVAL"),
    ];

    /// Creates a flag set from raw bits. Unknown bits are dropped.
    pub fn from_bits(bits: u16) -> Self {
        RegexpFlags(bits & Self::ALL.0)
    }

    /// Returns the raw bits.
    pub fn bits(&self) -> u16 {
        self.0
    }

    /// Returns true if every flag in `other` is set.
    pub fn contains(&self, other: RegexpFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Renders the set as a pipe-joined list, e.g. `INTERSECTION|ANYSTRING`.
    pub fn to_dsl(&self) -> String {
        if self.0 == 0 {
            return "NONE".to_string();
        }

        Self::CANONICAL
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl BitOr for RegexpFlags {
    type Output = RegexpFlags;

    fn bitor(self, rhs: RegexpFlags) -> RegexpFlags {
        RegexpFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for RegexpFlags {
    fn bitor_assign(&mut self, rhs: RegexpFlags) {
        self.0 |= rhs.0;
    }
}

/// Options accepted by a `regexp` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum RegexpOptions {
    /// No options beyond the pattern.
    None,
    /// A flag bit set, decoded into symbolic names.
    Flags(RegexpFlags),
    /// A literal `flags` string.
    Named(String),
    /// Arbitrary options merged next to `value` (e.g. `max_determinized_states`).
    Map(Map<String, Value>),
}

impl RegexpOptions {
    /// Builds the per-field parameter object for `pattern`.
    pub fn parameters(&self, pattern: &str) -> Value {
        let mut params = Map::new();
        params.insert("value".to_string(), Value::String(pattern.to_string()));

        match self {
            RegexpOptions::None => {}
            RegexpOptions::Flags(flags) => {
                params.insert("flags".to_string(), Value::String(flags.to_dsl()));
            }
            RegexpOptions::Named(name) => {
                params.insert("flags".to_string(), Value::String(name.clone()));
            }
            RegexpOptions::Map(options) => {
                for (key, value) in options {
                    params.insert(key.clone(), value.clone());
                }
            }
        }

        Value::Object(params)
    }
}

impl From<RegexpFlags> for RegexpOptions {
    fn from(flags: RegexpFlags) -> Self {
        RegexpOptions::Flags(flags)
    }
}

impl From<&str> for RegexpOptions {
    fn from(name: &str) -> Self {
        RegexpOptions::Named(name.to_string())
    }
}

impl From<Map<String, Value>> for RegexpOptions {
    fn from(options: Map<String, Value>) -> Self {
        RegexpOptions::Map(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flags_render_in_canonical_order() {
        let a = RegexpFlags::ANYSTRING | RegexpFlags::INTERSECTION;
        let b = RegexpFlags::INTERSECTION | RegexpFlags::ANYSTRING;
        assert_eq!(a.to_dsl(), "INTERSECTION|ANYSTRING");
        assert_eq!(b.to_dsl(), "INTERSECTION|ANYSTRING");
    }

    #[test]
    fn test_empty_flags_render_none() {
        assert_eq!(RegexpFlags::NONE.to_dsl(), "NONE");
    }

    #[test]
    fn test_all_flags() {
        assert_eq!(
            RegexpFlags::ALL.to_dsl(),
            "INTERSECTION|COMPLEMENT|EMPTY|ANYSTRING|INTERVAL"
        );
        assert_eq!(RegexpFlags::from_bits(0xFFFF), RegexpFlags::ALL);
    }

    #[test]
    fn test_option_map_is_merged() {
        let mut options = Map::new();
        options.insert("case_insensitive".to_string(), json!(true));
        let params = RegexpOptions::from(options).parameters("k.*y");
        assert_eq!(params, json!({"value": "k.*y", "case_insensitive": true}));
    }
}
