//! Values flowing in and out of applications.
//!
//! An application takes positional and keyword arguments of mixed kinds and
//! returns one or more values. Only [`Value::Variable`] entries are copied
//! and tagged; everything else passes through untouched.

use brickwork_core::Variable;
use std::fmt;
use std::rc::Rc;

use crate::bound::BoundApplication;
use crate::call::ApplicationCall;
use crate::error::BrickError;

/// Keyword that forces a mapping from output name to value.
pub const RETURN_DICT: &str = "return_dict";
/// Keyword that forces a sequence even for a single output.
pub const RETURN_LIST: &str = "return_list";

// ============================================================================
// Values
// ============================================================================

/// An argument or result of an application.
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Variable(Variable),
    /// Injected for functions declaring an `application` parameter.
    Application(BoundApplication),
    /// Injected for functions declaring an `application_call` parameter.
    Call(Rc<ApplicationCall>),
}

impl Value {
    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Variable(_) => "variable",
            Value::Application(_) => "application",
            Value::Call(_) => "application call",
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Value::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_variable(self) -> Result<Variable, BrickError> {
        match self {
            Value::Variable(v) => Ok(v),
            other => Err(BrickError::TypeMismatch {
                expected: "variable",
                got: other.kind().to_string(),
            }),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Variable(v) => write!(f, "{:?}", v),
            Value::Application(a) => write!(f, "{:?}", a),
            Value::Call(c) => write!(f, "{:?}", c),
        }
    }
}

impl From<Variable> for Value {
    fn from(v: Variable) -> Self {
        Value::Variable(v)
    }
}

impl From<&Variable> for Value {
    fn from(v: &Variable) -> Self {
        Value::Variable(v.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

// ============================================================================
// Attributes
// ============================================================================

/// Metadata readable through a bound application: `inputs`, `outputs`,
/// `name`, or anything a brick declares.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    Names(Vec<String>),
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Attr {
    /// A list of names, e.g. for `outputs`.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Attr::Names(names.into_iter().map(Into::into).collect())
    }

    pub fn as_names(&self) -> Option<&[String]> {
        match self {
            Attr::Names(names) => Some(names),
            _ => None,
        }
    }

    pub fn into_names(self) -> Result<Vec<String>, BrickError> {
        match self {
            Attr::Names(names) => Ok(names),
            other => Err(BrickError::TypeMismatch {
                expected: "list of names",
                got: format!("{:?}", other),
            }),
        }
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// Arguments for one application call.
///
/// ```rust
/// use brickwork_bricks::{Args, Value};
///
/// let args = Args::new().arg(3i64).kwarg("mask", Value::None).return_list();
/// assert_eq!(args.positional().len(), 1);
/// assert_eq!(args.keywords().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Args {
    pub(crate) positional: Vec<Value>,
    pub(crate) keywords: Vec<(String, Value)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Add a keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.push((name.into(), value.into()));
        self
    }

    /// Ask for a mapping from declared output name to value.
    pub fn return_dict(self) -> Self {
        self.kwarg(RETURN_DICT, true)
    }

    /// Ask for a sequence even when there is a single output.
    pub fn return_list(self) -> Self {
        self.kwarg(RETURN_LIST, true)
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn keywords(&self) -> &[(String, Value)] {
        &self.keywords
    }
}

impl From<Variable> for Args {
    fn from(v: Variable) -> Self {
        Args::new().arg(v)
    }
}

impl From<&Variable> for Args {
    fn from(v: &Variable) -> Self {
        Args::new().arg(v)
    }
}

/// Remove every occurrence of the boolean flag `flag` from `keywords`.
pub(crate) fn take_flag(
    keywords: &mut Vec<(String, Value)>,
    flag: &str,
) -> Result<bool, BrickError> {
    let mut set = false;
    let mut error = None;
    keywords.retain(|(name, value)| {
        if name != flag {
            return true;
        }
        match value.as_bool() {
            Some(b) => set |= b,
            None => {
                error = Some(BrickError::InvalidReturnFlag {
                    flag: flag.to_string(),
                })
            }
        }
        false
    });
    match error {
        Some(err) => Err(err),
        None => Ok(set),
    }
}

// ============================================================================
// Outputs
// ============================================================================

/// Raw results of an application function, before they are tagged.
#[derive(Debug, Clone, Default)]
pub struct Returns(pub Vec<Value>);

impl From<Value> for Returns {
    fn from(value: Value) -> Self {
        Returns(vec![value])
    }
}

impl From<Variable> for Returns {
    fn from(v: Variable) -> Self {
        Returns(vec![Value::Variable(v)])
    }
}

impl From<Vec<Value>> for Returns {
    fn from(values: Vec<Value>) -> Self {
        Returns(values)
    }
}

impl From<Vec<Variable>> for Returns {
    fn from(variables: Vec<Variable>) -> Self {
        Returns(variables.into_iter().map(Value::Variable).collect())
    }
}

impl From<()> for Returns {
    fn from(_: ()) -> Self {
        Returns(Vec::new())
    }
}

/// What an application call hands back.
#[derive(Debug, Clone)]
pub enum Outputs {
    /// Exactly one output, default mode.
    Single(Value),
    /// Zero or several outputs, or `return_list`.
    Sequence(Vec<Value>),
    /// `return_dict`: declared output names paired with values, in order.
    Dict(Vec<(String, Value)>),
}

impl Outputs {
    pub fn len(&self) -> usize {
        match self {
            Outputs::Single(_) => 1,
            Outputs::Sequence(values) => values.len(),
            Outputs::Dict(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The single output; errors for sequences and mappings.
    pub fn into_value(self) -> Result<Value, BrickError> {
        match self {
            Outputs::Single(value) => Ok(value),
            Outputs::Sequence(_) => Err(BrickError::TypeMismatch {
                expected: "single output",
                got: "sequence".to_string(),
            }),
            Outputs::Dict(_) => Err(BrickError::TypeMismatch {
                expected: "single output",
                got: "mapping".to_string(),
            }),
        }
    }

    /// The single output as a variable.
    pub fn into_variable(self) -> Result<Variable, BrickError> {
        self.into_value()?.into_variable()
    }

    /// All values in output order, whatever the shape.
    pub fn into_vec(self) -> Vec<Value> {
        match self {
            Outputs::Single(value) => vec![value],
            Outputs::Sequence(values) => values,
            Outputs::Dict(pairs) => pairs.into_iter().map(|(_, v)| v).collect(),
        }
    }

    /// All outputs as variables.
    pub fn into_variables(self) -> Result<Vec<Variable>, BrickError> {
        self.into_vec().into_iter().map(Value::into_variable).collect()
    }

    /// Look up a named output in a `return_dict` result.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Outputs::Dict(pairs) => pairs.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_flag_removes_all_occurrences() {
        let mut keywords = vec![
            (RETURN_LIST.to_string(), Value::Bool(true)),
            ("x".to_string(), Value::Int(1)),
            (RETURN_LIST.to_string(), Value::Bool(false)),
        ];
        assert!(take_flag(&mut keywords, RETURN_LIST).unwrap());
        assert_eq!(keywords.len(), 1);
        assert!(!take_flag(&mut keywords, RETURN_DICT).unwrap());
    }

    #[test]
    fn test_take_flag_rejects_non_bool() {
        let mut keywords = vec![(RETURN_DICT.to_string(), Value::Int(1))];
        let result = take_flag(&mut keywords, RETURN_DICT);
        assert!(matches!(result, Err(BrickError::InvalidReturnFlag { .. })));
    }

    #[test]
    fn test_outputs_shapes() {
        let single = Outputs::Single(Value::Int(1));
        assert_eq!(single.len(), 1);
        assert!(single.into_value().is_ok());

        let seq = Outputs::Sequence(vec![Value::Int(1), Value::Int(2)]);
        assert!(seq.clone().into_value().is_err());
        assert_eq!(seq.into_vec().len(), 2);

        let dict = Outputs::Dict(vec![("y".to_string(), Value::Int(3))]);
        assert_eq!(dict.get("y").and_then(Value::as_int), Some(3));
        assert!(dict.get("z").is_none());
    }

    #[test]
    fn test_attr_names() {
        let attr = Attr::names(["x", "y"]);
        assert_eq!(attr.as_names().map(|n| n.len()), Some(2));
        assert!(Attr::Int(3).into_names().is_err());
    }
}
