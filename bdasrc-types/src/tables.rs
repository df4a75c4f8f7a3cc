//! Static name tables for enumerated tuning values.
//!
//! Every enumerated value has a fixed textual nick used by the property
//! surface and the command line. The tables are plain `const` data; there
//! is no runtime registration.

use crate::error::ParseValueError;

/// An enumeration with a static table of `(value, nick)` pairs.
pub trait NickTable: Sized + Copy + PartialEq + 'static {
    /// Human readable name of the table, used in error messages.
    const KIND: &'static str;
    /// All values with their nicks, in presentation order.
    const TABLE: &'static [(Self, &'static str)];

    /// The nick of this value.
    fn nick(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(value, _)| *value == self)
            .map(|(_, nick)| *nick)
            .unwrap_or("?")
    }

    /// Look a value up by nick.
    ///
    /// Matching ignores ASCII case, whitespace, `-` and `_`, so `"QAM 64"`,
    /// `"qam64"` and `"qam-64"` all name the same value.
    fn from_nick(input: &str) -> Result<Self, ParseValueError> {
        let wanted = normalize(input);
        Self::TABLE
            .iter()
            .find(|(_, nick)| normalize(nick) == wanted)
            .map(|(value, _)| *value)
            .ok_or_else(|| ParseValueError {
                kind: Self::KIND,
                value: input.to_string(),
                expected: Self::TABLE
                    .iter()
                    .map(|(_, nick)| *nick)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Implements [`NickTable`], `Display`, `FromStr`, serde by nick and an
/// inherent `NICKS` constant for a fieldless enum.
macro_rules! nick_table {
    ($ty:ident, $kind:literal, { $($variant:path => $nick:literal),+ $(,)? }) => {
        impl $ty {
            /// Accepted nicks, in table order.
            pub const NICKS: &'static [&'static str] = &[$($nick),+];
        }

        impl $crate::tables::NickTable for $ty {
            const KIND: &'static str = $kind;
            const TABLE: &'static [(Self, &'static str)] = &[$(($variant, $nick)),+];
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::tables::NickTable::nick(*self))
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::error::ParseValueError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty as $crate::tables::NickTable>::from_nick(s)
            }
        }

        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str($crate::tables::NickTable::nick(*self))
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = <String as serde::Deserialize>::deserialize(deserializer)?;
                <$ty as $crate::tables::NickTable>::from_nick(&text).map_err(serde::de::Error::custom)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FecRate, Modulation};

    #[test]
    fn test_from_nick_is_lenient() {
        assert_eq!(Modulation::from_nick("QAM 64").unwrap(), Modulation::Qam64);
        assert_eq!(Modulation::from_nick("qam64").unwrap(), Modulation::Qam64);
        assert_eq!(Modulation::from_nick("Qam-256").unwrap(), Modulation::Qam256);
        assert_eq!(FecRate::from_nick("3/4").unwrap(), FecRate::Rate3_4);
    }

    #[test]
    fn test_unknown_nick() {
        let err = Modulation::from_nick("QAM 4096").unwrap_err();
        assert_eq!(err.kind, "modulation");
        assert!(err.expected.contains("QAM 16"));
    }

    #[test]
    fn test_nicks_match_table() {
        assert_eq!(Modulation::NICKS.len(), Modulation::TABLE.len());
        for (value, nick) in Modulation::TABLE {
            assert_eq!(value.nick(), *nick);
            assert_eq!(value.to_string(), *nick);
        }
    }
}
