//! Component descriptors
//!
//! Units are identified by three four-character codes (type, subtype,
//! manufacturer) plus flag bits. A zero code in a query matches anything.

use serde::{Deserialize, Serialize};
use soul_core::SoulError;
use std::fmt;
use std::str::FromStr;

/// Four ASCII characters packed big-endian into a `u32`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FourCharCode(u32);

impl FourCharCode {
    /// Wildcard, matches any code
    pub const ANY: Self = Self(0);

    /// Effect unit type (`aufx`)
    pub const EFFECT: Self = Self::new(*b"aufx");

    /// Built-in unit manufacturer (`soul`)
    pub const SOUL: Self = Self::new(*b"soul");

    /// Pack four bytes
    pub const fn new(code: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(code))
    }

    /// Packed value
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Check if this is the wildcard
    pub const fn is_any(self) -> bool {
        self.0 == 0
    }

    /// Wildcard-aware comparison
    pub fn matches(self, other: Self) -> bool {
        self.is_any() || self == other
    }
}

impl From<u32> for FourCharCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl FromStr for FourCharCode {
    type Err = SoulError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            return Err(SoulError::UnknownComponent(format!(
                "'{}' is not a four-character code",
                s
            )));
        }
        Ok(Self::new([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl TryFrom<String> for FourCharCode {
    type Error = SoulError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FourCharCode> for String {
    fn from(code: FourCharCode) -> Self {
        code.to_string()
    }
}

impl fmt::Display for FourCharCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            for b in bytes {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(f, "0x{:08x}", self.0)
        }
    }
}

/// Identifies a unit implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// Unit kind, e.g. [`FourCharCode::EFFECT`]
    pub component_type: FourCharCode,
    /// Specific unit, e.g. `lmtr`
    pub sub_type: FourCharCode,
    /// Vendor
    pub manufacturer: FourCharCode,
    /// Capability bits
    #[serde(default)]
    pub flags: u32,
    /// Bits of `flags` a query cares about
    #[serde(default)]
    pub flags_mask: u32,
}

impl ComponentDescriptor {
    /// Descriptor for an effect unit with no flags
    pub const fn effect(sub_type: FourCharCode, manufacturer: FourCharCode) -> Self {
        Self {
            component_type: FourCharCode::EFFECT,
            sub_type,
            manufacturer,
            flags: 0,
            flags_mask: 0,
        }
    }

    /// Descriptor for a built-in effect
    pub const fn builtin(sub_type: [u8; 4]) -> Self {
        Self::effect(FourCharCode::new(sub_type), FourCharCode::SOUL)
    }

    /// Query matching every effect unit
    pub const fn any_effect() -> Self {
        Self::effect(FourCharCode::ANY, FourCharCode::ANY)
    }

    /// Require `flags` under `mask` when matching
    #[must_use]
    pub const fn with_flags(mut self, flags: u32, mask: u32) -> Self {
        self.flags = flags;
        self.flags_mask = mask;
        self
    }

    /// Check if `candidate` satisfies this descriptor used as a query
    pub fn matches(&self, candidate: &ComponentDescriptor) -> bool {
        self.component_type.matches(candidate.component_type)
            && self.sub_type.matches(candidate.sub_type)
            && self.manufacturer.matches(candidate.manufacturer)
            && (candidate.flags & self.flags_mask) == (self.flags & self.flags_mask)
    }
}

impl fmt::Display for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.component_type, self.sub_type, self.manufacturer
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_display_as_text() {
        assert_eq!(FourCharCode::EFFECT.to_string(), "aufx");
        assert_eq!(FourCharCode::from(1).to_string(), "0x00000001");
        assert_eq!("lmtr".parse::<FourCharCode>().unwrap(), FourCharCode::new(*b"lmtr"));
        assert!("toolong".parse::<FourCharCode>().is_err());
    }

    #[test]
    fn zero_codes_are_wildcards() {
        let limiter = ComponentDescriptor::builtin(*b"lmtr");
        assert!(ComponentDescriptor::any_effect().matches(&limiter));
        assert!(limiter.matches(&limiter));
        assert!(!ComponentDescriptor::builtin(*b"gain").matches(&limiter));
    }

    #[test]
    fn flags_compare_under_mask() {
        let candidate = ComponentDescriptor::builtin(*b"dely").with_flags(0b101, 0);
        let wants_bit_0 = ComponentDescriptor::any_effect().with_flags(0b001, 0b001);
        let wants_bit_1 = ComponentDescriptor::any_effect().with_flags(0b010, 0b010);
        assert!(wants_bit_0.matches(&candidate));
        assert!(!wants_bit_1.matches(&candidate));
    }

    #[test]
    fn descriptor_serializes_codes_as_strings() {
        let json = serde_json::to_string(&ComponentDescriptor::builtin(*b"gain")).unwrap();
        assert!(json.contains("\"aufx\""));
        let back: ComponentDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ComponentDescriptor::builtin(*b"gain"));
    }
}
