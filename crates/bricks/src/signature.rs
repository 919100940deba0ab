//! Declared parameter lists of application functions.
//!
//! A Rust closure has no introspectable parameter names, so an application
//! declares them up front. A name prefixed with `*` declares the varargs
//! name: surplus positionals are accepted and named `<varargs>_<i>`.

use crate::error::BrickError;
use crate::value::Value;

/// Parameter name that receives the bound application.
pub const APPLICATION_PARAM: &str = "application";
/// Parameter name that receives the per-call context.
pub const APPLICATION_CALL_PARAM: &str = "application_call";

/// Ordered parameter names of an application function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<String>,
    varargs: Option<String>,
}

impl Signature {
    /// Build from names; `"*rest"` declares `rest` as the varargs name.
    ///
    /// ```rust
    /// use brickwork_bricks::Signature;
    ///
    /// let sig = Signature::new(["x", "mask", "*states"]);
    /// assert_eq!(sig.params(), ["x", "mask"]);
    /// assert_eq!(sig.varargs(), Some("states"));
    /// ```
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Vec::new();
        let mut varargs = None;
        for name in names {
            let name = name.as_ref();
            match name.strip_prefix('*') {
                Some(rest) => varargs = Some(rest.to_string()),
                None => params.push(name.to_string()),
            }
        }
        Self { params, varargs }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn varargs(&self) -> Option<&str> {
        self.varargs.as_deref()
    }

    /// Position of a named parameter.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p == name)
    }

    /// Whether `name` is a parameter or the varargs name.
    pub fn accepts(&self, name: &str) -> bool {
        self.position(name).is_some() || self.varargs() == Some(name)
    }

    /// Name given to positional argument `index` when tagging it.
    pub(crate) fn positional_name(&self, index: usize) -> String {
        match self.params.get(index) {
            Some(name) => name.clone(),
            None => format!(
                "{}_{}",
                self.varargs().unwrap_or("args"),
                index - self.params.len()
            ),
        }
    }

    /// Check that the arguments fit: no surplus positionals without
    /// varargs, keywords name known parameters, no parameter given twice.
    pub(crate) fn check(
        &self,
        positional: usize,
        keywords: &[(String, Value)],
    ) -> Result<(), BrickError> {
        if self.varargs.is_none() && positional > self.params.len() {
            return Err(BrickError::TooManyArguments {
                expected: self.params.len(),
                got: positional,
            });
        }
        for (i, (name, _)) in keywords.iter().enumerate() {
            let position = self
                .position(name)
                .ok_or_else(|| BrickError::UnexpectedKeyword { name: name.clone() })?;
            let repeated = keywords[..i].iter().any(|(earlier, _)| earlier == name);
            if position < positional || repeated {
                return Err(BrickError::DuplicateArgument { name: name.clone() });
            }
        }
        Ok(())
    }
}
