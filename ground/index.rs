//! Assign aspif atom numbers to ground literals.

use std::collections::HashMap;

use gavotte_reasoner::TermId;
use gavotte_syntax::Predicate;

use crate::GroundingError;

/// The literal that is always true; omitted from rule bodies.
pub const TOP: i32 = 0;

/// A ground atom: a predicate and one term identifier per position.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Fingerprint {
    pub predicate: Predicate,
    pub terms: Vec<TermId>,
}

impl Fingerprint {
    pub fn new(predicate: Predicate, terms: Vec<TermId>) -> Self {
        Self { predicate, terms }
    }
}

/// A write-once interner: every fingerprint gets exactly one atom,
/// and atoms are never reassigned. Anonymous atoms from [`fresh`]
/// share the numbering but have no fingerprint.
///
/// [`fresh`]: AspifIndex::fresh
/// Atoms are numbered from 1 up to `i32::MAX`.
fn atom_number(allocated: usize) -> Result<i32, GroundingError> {
    allocated
        .checked_add(1)
        .and_then(|n| i32::try_from(n).ok())
        .ok_or(GroundingError::TooManyAtoms)
}

#[derive(Debug)]
pub struct AspifIndex {
    atoms: HashMap<Fingerprint, i32>,
    fingerprints: Vec<Option<Fingerprint>>,
}

impl Default for AspifIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl AspifIndex {
    pub fn new() -> Self {
        Self {
            atoms: HashMap::new(),
            fingerprints: Vec::new(),
        }
    }

    fn next(&mut self, fingerprint: Option<Fingerprint>) -> Result<i32, GroundingError> {
        let atom = atom_number(self.fingerprints.len())?;
        self.fingerprints.push(fingerprint);
        Ok(atom)
    }

    /// The atom for `fingerprint`, negated if the literal is.
    pub fn get_or_create(
        &mut self,
        fingerprint: Fingerprint,
        negated: bool,
    ) -> Result<i32, GroundingError> {
        let atom = match self.atoms.get(&fingerprint) {
            Some(&atom) => atom,
            None => {
                let atom = self.next(Some(fingerprint.clone()))?;
                self.atoms.insert(fingerprint, atom);
                atom
            }
        };
        Ok(if negated { -atom } else { atom })
    }

    /// A new atom that no fingerprint will ever map to.
    pub fn fresh(&mut self) -> Result<i32, GroundingError> {
        self.next(None)
    }

    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<i32> {
        self.atoms.get(fingerprint).copied()
    }

    /// The fingerprint of an interned atom (sign ignored).
    pub fn fingerprint(&self, atom: i32) -> Option<&Fingerprint> {
        let i = usize::try_from(atom.unsigned_abs()).ok()?.checked_sub(1)?;
        self.fingerprints.get(i)?.as_ref()
    }

    /// Number of atoms handed out, fresh ones included.
    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}
