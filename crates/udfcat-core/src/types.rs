//! Column types that may appear in function signatures.
//!
//! [`ColumnType`] is the closed set of SQL types a user-defined function can
//! accept or return. Types parse case-insensitively from text
//! (`"decimal(9, 2)"`), display in uppercase (`DECIMAL(9,2)`), and have a
//! lowercase, whitespace-free canonical form used by the durable store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Maximum precision of a `DECIMAL` type.
pub const MAX_DECIMAL_PRECISION: u8 = 38;

/// Precision used when `DECIMAL` is written without parameters.
pub const DEFAULT_DECIMAL_PRECISION: u8 = 9;

/// A SQL column type usable as a function argument or return type.
///
/// The derived ordering is the declaration order (then precision/scale for
/// decimals). It has no semantic meaning beyond giving signatures a stable
/// display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColumnType {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    String,
    Timestamp,
    /// Fixed-point decimal. Precision and scale are part of the type's
    /// identity: `DECIMAL(9,2)` and `DECIMAL(18,2)` are different types.
    Decimal { precision: u8, scale: u8 },
}

impl ColumnType {
    /// Creates a decimal type, validating precision and scale.
    pub fn decimal(precision: u8, scale: u8) -> Result<Self, CatalogError> {
        if precision == 0 || precision > MAX_DECIMAL_PRECISION || scale > precision {
            return Err(CatalogError::InvalidType {
                text: format!("decimal({precision},{scale})"),
                reason: format!(
                    "precision must be in 1..={MAX_DECIMAL_PRECISION} and scale must not exceed precision"
                ),
            });
        }
        Ok(ColumnType::Decimal { precision, scale })
    }

    /// Returns `true` for the four integer types.
    pub fn is_integer(self) -> bool {
        self.integer_rank().is_some()
    }

    /// Returns `true` for `FLOAT` and `DOUBLE`.
    pub fn is_floating(self) -> bool {
        matches!(self, ColumnType::Float | ColumnType::Double)
    }

    /// Returns `true` for types whose values have no fixed width.
    pub fn is_variable_length(self) -> bool {
        matches!(self, ColumnType::String)
    }

    /// Widening rank of an integer type. Higher rank means wider.
    pub(crate) fn integer_rank(self) -> Option<u8> {
        match self {
            ColumnType::TinyInt => Some(1),
            ColumnType::SmallInt => Some(2),
            ColumnType::Int => Some(3),
            ColumnType::BigInt => Some(4),
            _ => None,
        }
    }

    /// Lowercase, whitespace-free text form stored in the metastore.
    pub fn canonical(self) -> std::string::String {
        self.to_string().to_ascii_lowercase()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Boolean => f.write_str("BOOLEAN"),
            ColumnType::TinyInt => f.write_str("TINYINT"),
            ColumnType::SmallInt => f.write_str("SMALLINT"),
            ColumnType::Int => f.write_str("INT"),
            ColumnType::BigInt => f.write_str("BIGINT"),
            ColumnType::Float => f.write_str("FLOAT"),
            ColumnType::Double => f.write_str("DOUBLE"),
            ColumnType::String => f.write_str("STRING"),
            ColumnType::Timestamp => f.write_str("TIMESTAMP"),
            ColumnType::Decimal { precision, scale } => {
                write!(f, "DECIMAL({precision},{scale})")
            }
        }
    }
}

impl FromStr for ColumnType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text: std::string::String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let lower = text.to_ascii_lowercase();
        let invalid = |reason: &str| CatalogError::InvalidType {
            text: s.trim().to_string(),
            reason: reason.to_string(),
        };

        let ty = match lower.as_str() {
            "boolean" => ColumnType::Boolean,
            "tinyint" => ColumnType::TinyInt,
            "smallint" => ColumnType::SmallInt,
            "int" | "integer" => ColumnType::Int,
            "bigint" => ColumnType::BigInt,
            "float" => ColumnType::Float,
            "double" => ColumnType::Double,
            "string" => ColumnType::String,
            "timestamp" => ColumnType::Timestamp,
            "decimal" => ColumnType::decimal(DEFAULT_DECIMAL_PRECISION, 0)?,
            other => {
                let Some(params) = other
                    .strip_prefix("decimal(")
                    .and_then(|rest| rest.strip_suffix(')'))
                else {
                    return Err(invalid("unknown type"));
                };
                let (precision, scale) = match params.split_once(',') {
                    Some((p, s)) => (p, s),
                    None => (params, "0"),
                };
                let precision: u8 = precision
                    .parse()
                    .map_err(|_| invalid("decimal precision is not a number"))?;
                let scale: u8 = scale
                    .parse()
                    .map_err(|_| invalid("decimal scale is not a number"))?;
                ColumnType::decimal(precision, scale)?
            }
        };
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalar_names_case_insensitively() {
        assert_eq!("INT".parse::<ColumnType>().unwrap(), ColumnType::Int);
        assert_eq!("BigInt".parse::<ColumnType>().unwrap(), ColumnType::BigInt);
        assert_eq!(" string ".parse::<ColumnType>().unwrap(), ColumnType::String);
        assert_eq!("integer".parse::<ColumnType>().unwrap(), ColumnType::Int);
    }

    #[test]
    fn parses_decimal_with_whitespace() {
        assert_eq!(
            "decimal( 9, 2 )".parse::<ColumnType>().unwrap(),
            ColumnType::Decimal { precision: 9, scale: 2 }
        );
        assert_eq!(
            "DECIMAL(18)".parse::<ColumnType>().unwrap(),
            ColumnType::Decimal { precision: 18, scale: 0 }
        );
        assert_eq!(
            "decimal".parse::<ColumnType>().unwrap(),
            ColumnType::Decimal { precision: 9, scale: 0 }
        );
    }

    #[test]
    fn rejects_out_of_range_decimals() {
        assert!("decimal(39,0)".parse::<ColumnType>().is_err());
        assert!("decimal(4,5)".parse::<ColumnType>().is_err());
        assert!("decimal(0,0)".parse::<ColumnType>().is_err());
    }

    #[test]
    fn rejects_unknown_types() {
        let err = "varchar(10)".parse::<ColumnType>().unwrap_err();
        assert!(matches!(err, CatalogError::InvalidType { .. }));
    }

    #[test]
    fn display_and_canonical_forms() {
        let dec = ColumnType::Decimal { precision: 38, scale: 10 };
        assert_eq!(dec.to_string(), "DECIMAL(38,10)");
        assert_eq!(dec.canonical(), "decimal(38,10)");
        assert_eq!(ColumnType::Timestamp.canonical(), "timestamp");
    }

    #[test]
    fn canonical_form_parses_back() {
        for ty in [
            ColumnType::Boolean,
            ColumnType::SmallInt,
            ColumnType::Double,
            ColumnType::Decimal { precision: 2, scale: 0 },
        ] {
            assert_eq!(ty.canonical().parse::<ColumnType>().unwrap(), ty);
        }
    }
}
