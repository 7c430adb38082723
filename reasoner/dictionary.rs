//! Two-way map between values and term identifiers.

use std::collections::HashMap;

use gavotte_syntax::Symbol;

use crate::{TermId, Value};

#[derive(Debug, Default)]
pub(crate) struct Dictionary {
    values: Vec<Value>,
    constants: HashMap<Symbol, TermId>,
    nulls: usize,
}

impl Dictionary {
    pub fn get_or_add(&mut self, constant: &Symbol) -> TermId {
        if let Some(&id) = self.constants.get(constant) {
            return id;
        }
        let id = self.values.len() as TermId;
        self.values.push(Value::Constant(constant.clone()));
        self.constants.insert(constant.clone(), id);
        id
    }

    /// Invent a labelled null.
    pub fn fresh_null(&mut self) -> TermId {
        let id = self.values.len() as TermId;
        self.values.push(Value::Null(self.nulls));
        self.nulls += 1;
        id
    }

    pub fn value(&self, id: TermId) -> Option<&Value> {
        usize::try_from(id).ok().and_then(|i| self.values.get(i))
    }

    pub fn is_null(&self, id: TermId) -> bool {
        self.value(id).map(Value::is_null).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stable_ids() {
        let mut d = Dictionary::default();
        let a = d.get_or_add(&Symbol::from("a"));
        let n = d.fresh_null();
        let b = d.get_or_add(&Symbol::from("b"));
        assert_eq!(d.get_or_add(&Symbol::from("a")), a);
        assert_ne!(a, b);
        assert!(d.is_null(n) && !d.is_null(a));
        assert_eq!(d.value(n), Some(&Value::Null(0)));
        assert_eq!(d.value(99), None);
        assert_eq!(d.len(), 3);
    }
}
