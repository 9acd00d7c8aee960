// SPDX: CC0-1.0

use crate::expr::UserFunction;
use std::{collections::HashMap, sync::Arc};

/// User-defined functions of one document, in the order they were defined.
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    funs: Vec<Arc<UserFunction>>,
    by_name: HashMap<String, usize>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<UserFunction>> {
        self.by_name.get(name).map(|&idx| &self.funs[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Adds a function, replacing any previous function of the same name.
    pub fn insert(&mut self, fun: Arc<UserFunction>) -> Option<Arc<UserFunction>> {
        match self.by_name.get(&fun.name) {
            Some(&idx) => Some(core::mem::replace(&mut self.funs[idx], fun)),
            None => {
                self.by_name.insert(fun.name.clone(), self.funs.len());
                self.funs.push(fun);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.funs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funs.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Arc<UserFunction>> {
        self.funs.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.funs.iter().map(|fun| fun.name.as_str())
    }
}

impl<'a> IntoIterator for &'a FunctionRegistry {
    type Item = &'a Arc<UserFunction>;
    type IntoIter = core::slice::Iter<'a, Arc<UserFunction>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
