//! Itanium C++ name mangling for the native UDF calling convention.
//!
//! Native UDFs are free functions whose first parameter is
//! `impala_udf::FunctionContext*`. Arguments are passed as `const <T>Val&`;
//! a variadic tail is passed as `int num_varargs, const <T>Val* varargs`.
//! Aggregate phases pass their intermediate value through `<I>Val*` output
//! parameters.
//!
//! Only the subset of the ABI needed for these shapes is implemented:
//! unqualified function names, nested names under `impala_udf`, pointer,
//! reference and const qualifiers, the `int` builtin, and substitutions.

use std::fmt::Write;

use udfcat_core::ColumnType;

const UDF_NAMESPACE: &str = "impala_udf";

/// A parameter type of a native entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CxxType {
    /// `int`
    Int,
    /// A class nested under `impala_udf` (path excludes the namespace).
    Udf(&'static [&'static str]),
    Const(Box<CxxType>),
    Pointer(Box<CxxType>),
    Reference(Box<CxxType>),
}

impl CxxType {
    /// `impala_udf::FunctionContext*`
    pub fn context() -> Self {
        CxxType::Pointer(Box::new(CxxType::Udf(&["FunctionContext"])))
    }

    /// `impala_udf::FunctionContext::FunctionStateScope`
    pub fn state_scope() -> Self {
        CxxType::Udf(&["FunctionContext", "FunctionStateScope"])
    }

    /// The `<T>Val` class for a column type.
    pub fn value(ty: ColumnType) -> Self {
        CxxType::Udf(match ty {
            ColumnType::Boolean => &["BooleanVal"],
            ColumnType::TinyInt => &["TinyIntVal"],
            ColumnType::SmallInt => &["SmallIntVal"],
            ColumnType::Int => &["IntVal"],
            ColumnType::BigInt => &["BigIntVal"],
            ColumnType::Float => &["FloatVal"],
            ColumnType::Double => &["DoubleVal"],
            ColumnType::String => &["StringVal"],
            ColumnType::Timestamp => &["TimestampVal"],
            ColumnType::Decimal { .. } => &["DecimalVal"],
        })
    }

    /// `const <T>Val&`
    pub fn const_ref(ty: ColumnType) -> Self {
        CxxType::Reference(Box::new(CxxType::Const(Box::new(CxxType::value(ty)))))
    }

    /// `const <T>Val*`
    pub fn const_ptr(ty: ColumnType) -> Self {
        CxxType::Pointer(Box::new(CxxType::Const(Box::new(CxxType::value(ty)))))
    }

    /// `<T>Val*`
    pub fn out_ptr(ty: ColumnType) -> Self {
        CxxType::Pointer(Box::new(CxxType::value(ty)))
    }

    /// Stable key identifying this type in the substitution table.
    fn key(&self) -> String {
        match self {
            CxxType::Int => "int".to_string(),
            CxxType::Udf(path) => format!("{UDF_NAMESPACE}::{}", path.join("::")),
            CxxType::Const(inner) => format!("K({})", inner.key()),
            CxxType::Pointer(inner) => format!("P({})", inner.key()),
            CxxType::Reference(inner) => format!("R({})", inner.key()),
        }
    }
}

/// Parameters of a scalar entry point: context, then `const T&` per fixed
/// argument, then `int, const T*` for a variadic tail.
pub fn scalar_params(args: &[ColumnType], variadic: bool) -> Vec<CxxType> {
    let mut params = vec![CxxType::context()];
    let fixed = if variadic { args.len().saturating_sub(1) } else { args.len() };
    params.extend(args[..fixed].iter().map(|t| CxxType::const_ref(*t)));
    if variadic {
        if let Some(element) = args.last() {
            params.push(CxxType::Int);
            params.push(CxxType::const_ptr(*element));
        }
    }
    params
}

/// Parameters of a `prepare` or `close` entry point.
pub fn lifecycle_params() -> Vec<CxxType> {
    vec![CxxType::context(), CxxType::state_scope()]
}

/// Mangles a free function in the global namespace.
pub fn mangle(name: &str, params: &[CxxType]) -> String {
    let mut out = format!("_Z{}{}", name.len(), name);
    let mut subs = Substitutions::default();
    if params.is_empty() {
        // `f()` is encoded as `f(void)`.
        out.push('v');
    }
    for param in params {
        subs.encode(param, &mut out);
    }
    out
}

/// Extracts the unqualified function name from a mangled symbol
/// (`_Z8IdentityPN...` gives `Identity`).
pub fn base_name(symbol: &str) -> Option<&str> {
    let rest = symbol.strip_prefix("_Z")?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let len: usize = rest[..digits].parse().ok()?;
    rest.get(digits..digits + len)
}

#[derive(Default)]
struct Substitutions {
    seen: Vec<String>,
}

impl Substitutions {
    fn lookup(&self, key: &str) -> Option<String> {
        self.seen
            .iter()
            .position(|k| k == key)
            .map(substitution_token)
    }

    fn add(&mut self, key: String) {
        self.seen.push(key);
    }

    fn encode(&mut self, ty: &CxxType, out: &mut String) {
        let key = ty.key();
        match ty {
            // Builtins are never substitution candidates.
            CxxType::Int => out.push('i'),
            CxxType::Udf(path) => {
                if let Some(token) = self.lookup(&key) {
                    out.push_str(&token);
                    return;
                }
                self.encode_nested(path, out);
            }
            CxxType::Const(inner) | CxxType::Pointer(inner) | CxxType::Reference(inner) => {
                if let Some(token) = self.lookup(&key) {
                    out.push_str(&token);
                    return;
                }
                out.push(match ty {
                    CxxType::Const(_) => 'K',
                    CxxType::Pointer(_) => 'P',
                    _ => 'R',
                });
                self.encode(inner, out);
                self.add(key);
            }
        }
    }

    /// `N <prefix> <components> E`, reusing the longest known prefix.
    fn encode_nested(&mut self, path: &[&str], out: &mut String) {
        let full: Vec<&str> = std::iter::once(UDF_NAMESPACE)
            .chain(path.iter().copied())
            .collect();
        out.push('N');

        let mut start = 0;
        for len in (1..full.len()).rev() {
            if let Some(token) = self.lookup(&full[..len].join("::")) {
                out.push_str(&token);
                start = len;
                break;
            }
        }
        for i in start..full.len() {
            let component = full[i];
            let _ = write!(out, "{}{}", component.len(), component);
            self.add(full[..=i].join("::"));
        }
        out.push('E');
    }
}

/// `S_`, `S0_`, ..., `S9_`, `SA_`, ... (base 36, uppercase).
fn substitution_token(index: usize) -> String {
    if index == 0 {
        return "S_".to_string();
    }
    let mut n = index - 1;
    let mut digits = Vec::new();
    loop {
        let d = (n % 36) as u8;
        digits.push(if d < 10 { b'0' + d } else { b'A' + d - 10 });
        n /= 36;
        if n == 0 {
            break;
        }
    }
    digits.reverse();
    format!("S{}_", String::from_utf8_lossy(&digits))
}
