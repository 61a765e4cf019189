//! Function signatures, assignability, and overload match quality.
//!
//! A [`FunctionSignature`] is the overload identity of a function: its
//! ordered argument types and variadic flag. The return type travels with the
//! signature but does not participate in equality, hashing, or ordering, so
//! two overloads differing only in return type collide as registry keys.
//!
//! Assignability follows a conservative, lossless policy:
//!
//! - identical types always match (cost 0)
//! - integer widening: tinyint -> smallint -> int -> bigint (cost = rank distance)
//! - float widening: float -> double (cost 1)
//! - NO integer <-> floating conversion
//! - NO conversion into or out of decimal, string, timestamp, boolean;
//!   decimal precision and scale must match exactly

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::CatalogError;
use crate::types::ColumnType;

/// Argument list storage. Most functions take four or fewer arguments.
pub type ArgTypes = SmallVec<[ColumnType; 4]>;

/// The argument/return shape of one function overload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSignature {
    args: ArgTypes,
    variadic: bool,
    return_type: ColumnType,
}

/// How well a signature accepts a particular call.
///
/// Ordered best-first: `Exact < Promotion < Variadic`, then by cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchQuality {
    /// Non-variadic, every argument identical.
    Exact,
    /// Non-variadic, at least one argument widened.
    Promotion { cost: u32 },
    /// Matched through a variadic tail.
    Variadic { cost: u32 },
}

/// Returns the widening cost of passing a `from` value where `to` is
/// declared, or `None` if no implicit conversion exists.
pub fn assignment_cost(from: ColumnType, to: ColumnType) -> Option<u32> {
    if from == to {
        return Some(0);
    }

    if let (Some(from_rank), Some(to_rank)) = (from.integer_rank(), to.integer_rank()) {
        return (from_rank < to_rank).then(|| u32::from(to_rank - from_rank));
    }

    if from == ColumnType::Float && to == ColumnType::Double {
        return Some(1);
    }

    None
}

/// Returns `true` if `from` is implicitly assignable to `to`.
pub fn is_assignable(from: ColumnType, to: ColumnType) -> bool {
    assignment_cost(from, to).is_some()
}

impl FunctionSignature {
    /// Creates a signature. A variadic signature needs at least one declared
    /// argument: the last one is the variadic element type.
    pub fn new(
        args: impl IntoIterator<Item = ColumnType>,
        variadic: bool,
        return_type: ColumnType,
    ) -> Result<Self, CatalogError> {
        let args: ArgTypes = args.into_iter().collect();
        if variadic && args.is_empty() {
            return Err(CatalogError::InvalidType {
                text: "...".to_string(),
                reason: "a variadic signature needs at least one argument type".to_string(),
            });
        }
        Ok(FunctionSignature {
            args,
            variadic,
            return_type,
        })
    }

    /// Parses a signature from its argument text (`"double, int..."`) and a
    /// return type.
    pub fn parse(args: &str, return_type: ColumnType) -> Result<Self, CatalogError> {
        let (types, variadic) = parse_arg_list(args)?;
        FunctionSignature::new(types, variadic, return_type)
    }

    pub fn args(&self) -> &[ColumnType] {
        &self.args
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn return_type(&self) -> ColumnType {
        self.return_type
    }

    /// Canonical argument text as stored in the metastore: lowercase,
    /// comma-separated, `...` after the variadic element type.
    pub fn canonical_args(&self) -> String {
        let mut out = self
            .args
            .iter()
            .map(|t| t.canonical())
            .collect::<Vec<_>>()
            .join(",");
        if self.variadic {
            out.push_str("...");
        }
        out
    }

    /// Human-readable form with the function name, e.g. `var_sum(INT...)`.
    pub fn display_with_name(&self, name: &str) -> String {
        format!("{name}({self})")
    }

    /// Returns `true` if this signature accepts a call with `call_args`.
    pub fn matches(&self, call_args: &[ColumnType]) -> bool {
        self.match_quality(call_args).is_some()
    }

    /// Classifies how this signature accepts a call, or `None` if it does not.
    pub fn match_quality(&self, call_args: &[ColumnType]) -> Option<MatchQuality> {
        if !self.variadic {
            if call_args.len() != self.args.len() {
                return None;
            }
            let cost = total_cost(call_args.iter().zip(self.args.iter()))?;
            return Some(if cost == 0 {
                MatchQuality::Exact
            } else {
                MatchQuality::Promotion { cost }
            });
        }

        // Variadic: fixed prefix, then any number (including zero) of
        // arguments assignable to the element type.
        let fixed = self.args.len() - 1;
        if call_args.len() < fixed {
            return None;
        }
        let element = self.args[fixed];
        let fixed_cost = total_cost(call_args[..fixed].iter().zip(self.args[..fixed].iter()))?;
        let tail_cost = total_cost(call_args[fixed..].iter().zip(std::iter::repeat(&element)))?;
        Some(MatchQuality::Variadic {
            cost: fixed_cost + tail_cost,
        })
    }
}

fn total_cost<'a>(
    pairs: impl Iterator<Item = (&'a ColumnType, &'a ColumnType)>,
) -> Option<u32> {
    pairs.map(|(from, to)| assignment_cost(*from, *to)).sum()
}

/// Parses a comma-separated argument list, honoring parentheses inside
/// decimal types. A trailing `...` on the last argument marks it variadic.
pub fn parse_arg_list(text: &str) -> Result<(Vec<ColumnType>, bool), CatalogError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok((Vec::new(), false));
    }

    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in trimmed.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&trimmed[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&trimmed[start..]);

    let last = parts.len() - 1;
    let mut variadic = false;
    let mut types = Vec::with_capacity(parts.len());
    for (i, part) in parts.into_iter().enumerate() {
        let part = part.trim();
        let part = match part.strip_suffix("...") {
            Some(element) if i == last => {
                variadic = true;
                element
            }
            Some(_) => {
                return Err(CatalogError::InvalidType {
                    text: part.to_string(),
                    reason: "only the last argument may be variadic".to_string(),
                })
            }
            None => part,
        };
        types.push(part.parse::<ColumnType>()?);
    }
    Ok((types, variadic))
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        if self.variadic {
            f.write_str("...")?;
        }
        Ok(())
    }
}

// Overload identity: argument list and variadic flag only.

impl PartialEq for FunctionSignature {
    fn eq(&self, other: &Self) -> bool {
        self.variadic == other.variadic && self.args == other.args
    }
}

impl Eq for FunctionSignature {}

impl Hash for FunctionSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.args.hash(state);
        self.variadic.hash(state);
    }
}

impl PartialOrd for FunctionSignature {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FunctionSignature {
    fn cmp(&self, other: &Self) -> Ordering {
        self.args
            .len()
            .cmp(&other.args.len())
            .then_with(|| self.args.cmp(&other.args))
            .then_with(|| self.variadic.cmp(&other.variadic))
    }
}
