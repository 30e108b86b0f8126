// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Dense maps keyed by SPIR-V `<id>`s.
//!
//! Every `<id>` in a module is strictly less than the id bound recorded in the
//! module header, so a map can be a flat array indexed by `id - 1`.

use rspirv::dr::ModuleHeader;
use rspirv::spirv::Word;
use std::convert::TryFrom;
use std::fmt;
use std::iter;
use std::marker::PhantomData;
use std::mem;
use std::slice;

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct IdOutOfBounds;

impl fmt::Display for IdOutOfBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("SPIR-V Id is out of bounds")
    }
}

impl std::error::Error for IdOutOfBounds {}

/// a reference to a SPIR-V `<id>`
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct IdRef(pub Word);

impl fmt::Display for IdRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl From<Word> for IdRef {
    fn from(v: Word) -> Self {
        IdRef(v)
    }
}

pub trait Id: Copy + Eq + 'static {
    const ZERO: Self;
    fn map_index(self) -> Result<usize, IdOutOfBounds>;
    fn from_map_index_checked(index: usize) -> Option<Self>;
    fn from_map_index(index: usize) -> Self {
        if let Some(retval) = Self::from_map_index_checked(index) {
            retval
        } else {
            panic!("index out of range: {}", index);
        }
    }
}

impl Id for IdRef {
    const ZERO: Self = IdRef(0);
    fn map_index(self) -> Result<usize, IdOutOfBounds> {
        usize::try_from(self.0)
            .map_err(|_| IdOutOfBounds)?
            .checked_sub(1)
            .ok_or(IdOutOfBounds)
    }
    fn from_map_index_checked(index: usize) -> Option<Self> {
        u32::try_from(index.checked_add(1)?).map(Self).ok()
    }
}

type KeyPhantomData<K> = PhantomData<fn(K) -> K>;

#[derive(Clone)]
pub struct IdMap<K: Id, V> {
    values: Box<[Option<V>]>,
    len: usize,
    _phantom: KeyPhantomData<K>,
}

impl<K: Id, V> IdMap<K, V> {
    pub fn with_bound(id_bound: u32) -> Self {
        let values = (1..id_bound).map(|_| None).collect();
        Self {
            values,
            len: 0,
            _phantom: PhantomData,
        }
    }
    pub fn new(header: &ModuleHeader) -> Self {
        Self::with_bound(header.bound)
    }
    pub fn capacity(&self) -> usize {
        self.values.len()
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            base: self.values.iter().enumerate(),
            _phantom: PhantomData,
        }
    }
    pub fn get(&self, key: K) -> Result<Option<&V>, IdOutOfBounds> {
        Ok(self
            .values
            .get(key.map_index()?)
            .ok_or(IdOutOfBounds)?
            .as_ref())
    }
    pub fn entry(&mut self, key: K) -> Result<Entry<'_, K, V>, IdOutOfBounds> {
        let entry = self.values.get_mut(key.map_index()?).ok_or(IdOutOfBounds)?;
        match entry {
            None => Ok(Vacant(VacantEntry {
                entry,
                key,
                len: &mut self.len,
            })),
            Some(_) => Ok(Occupied(OccupiedEntry { entry, key })),
        }
    }
    pub fn contains_key(&self, key: K) -> Result<bool, IdOutOfBounds> {
        Ok(self.get(key)?.is_some())
    }
    pub fn get_mut(&mut self, key: K) -> Result<Option<&mut V>, IdOutOfBounds> {
        Ok(self
            .values
            .get_mut(key.map_index()?)
            .ok_or(IdOutOfBounds)?
            .as_mut())
    }
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, IdOutOfBounds> {
        Ok(match self.entry(key)? {
            Vacant(entry) => {
                entry.insert(value);
                None
            }
            Occupied(mut entry) => Some(entry.insert(value)),
        })
    }
}

impl<K: Id + fmt::Debug, V: fmt::Debug> fmt::Debug for IdMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, K: Id, V> {
    base: iter::Enumerate<slice::Iter<'a, Option<V>>>,
    _phantom: KeyPhantomData<K>,
}

impl<K: Id, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<'a, K: Id, V> Iterator for Iter<'a, K, V> {
    type Item = (K, &'a V);
    fn next(&mut self) -> Option<(K, &'a V)> {
        Some(loop {
            if let (index, Some(v)) = self.base.next()? {
                break (K::from_map_index(index), v);
            }
        })
    }
}

impl<'a, K: Id, V> IntoIterator for &'a IdMap<K, V> {
    type Item = (K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

pub struct VacantEntry<'a, K: Id, V> {
    key: K,
    entry: &'a mut Option<V>,
    len: &'a mut usize,
}

impl<'a, K: Id, V> VacantEntry<'a, K, V> {
    pub fn key(&self) -> K {
        self.key
    }
    pub fn insert(self, value: V) -> &'a mut V {
        *self.len += 1;
        self.entry.get_or_insert(value)
    }
}

pub struct OccupiedEntry<'a, K: Id, V> {
    key: K,
    entry: &'a mut Option<V>,
}

impl<'a, K: Id, V> OccupiedEntry<'a, K, V> {
    pub fn key(&self) -> K {
        self.key
    }
    pub fn get(&self) -> &V {
        self.entry.as_ref().expect("entry known to be occupied")
    }
    pub fn get_mut(&mut self) -> &mut V {
        self.entry.as_mut().expect("entry known to be occupied")
    }
    pub fn insert(&mut self, value: V) -> V {
        mem::replace(self.get_mut(), value)
    }
    pub fn into_mut(self) -> &'a mut V {
        self.entry.as_mut().expect("entry known to be occupied")
    }
}

pub enum Entry<'a, K: Id, V> {
    Vacant(VacantEntry<'a, K, V>),
    Occupied(OccupiedEntry<'a, K, V>),
}

pub use Entry::Occupied;
pub use Entry::Vacant;

impl<'a, K: Id, V> Entry<'a, K, V> {
    pub fn key(&self) -> K {
        match self {
            Vacant(v) => v.key(),
            Occupied(v) => v.key(),
        }
    }
    pub fn or_insert_with<F: FnOnce() -> V>(self, f: F) -> &'a mut V {
        match self {
            Vacant(entry) => entry.insert(f()),
            Occupied(entry) => entry.into_mut(),
        }
    }
    pub fn or_insert_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(Default::default)
    }
}
