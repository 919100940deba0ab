//! Parameter lists that annotate what goes into them.
//!
//! Every variable stored in a [`Parameters`] list, whether appended, set at
//! an index or inserted, is tagged [`Role::Parameter`] and annotated with
//! the owning brick. Slots may be empty.

use brickwork_core::{add_annotation, add_role, Role, Variable};
use std::fmt;
use std::ops::Index;
use std::rc::Rc;

use crate::brick::BrickTag;
use crate::error::BrickError;

/// Ordered parameter slots of one brick.
pub struct Parameters {
    owner: Rc<BrickTag>,
    params: Vec<Option<Variable>>,
}

impl Parameters {
    pub(crate) fn new(owner: Rc<BrickTag>) -> Self {
        Self {
            owner,
            params: Vec::new(),
        }
    }

    fn annotate(&self, param: &Option<Variable>) {
        if let Some(variable) = param {
            add_role(variable, Role::Parameter);
            add_annotation(variable, self.owner.clone());
        }
    }

    pub fn push(&mut self, param: impl Into<Option<Variable>>) {
        let param = param.into();
        self.annotate(&param);
        self.params.push(param);
    }

    /// Replace the slot at `index`.
    pub fn set(
        &mut self,
        index: usize,
        param: impl Into<Option<Variable>>,
    ) -> Result<Option<Variable>, BrickError> {
        let len = self.params.len();
        if index >= len {
            return Err(BrickError::IndexOutOfBounds { index, len });
        }
        let param = param.into();
        self.annotate(&param);
        Ok(std::mem::replace(&mut self.params[index], param))
    }

    /// Insert before `index`; `index == len()` appends.
    pub fn insert(
        &mut self,
        index: usize,
        param: impl Into<Option<Variable>>,
    ) -> Result<(), BrickError> {
        let len = self.params.len();
        if index > len {
            return Err(BrickError::IndexOutOfBounds { index, len });
        }
        let param = param.into();
        self.annotate(&param);
        self.params.insert(index, param);
        Ok(())
    }

    /// Remove a slot, keeping the order of the rest. The removed variable
    /// keeps its role and annotation.
    pub fn remove(&mut self, index: usize) -> Result<Option<Variable>, BrickError> {
        let len = self.params.len();
        if index >= len {
            return Err(BrickError::IndexOutOfBounds { index, len });
        }
        Ok(self.params.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&Variable> {
        self.params.get(index).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn clear(&mut self) {
        self.params.clear();
    }

    /// All slots, empty ones included.
    pub fn iter(&self) -> std::slice::Iter<'_, Option<Variable>> {
        self.params.iter()
    }

    /// Filled slots only.
    pub fn variables(&self) -> Vec<Variable> {
        self.params.iter().flatten().cloned().collect()
    }
}

impl Index<usize> for Parameters {
    type Output = Option<Variable>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.params[index]
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Option<Variable>;
    type IntoIter = std::slice::Iter<'a, Option<Variable>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.params.iter()).finish()
    }
}
