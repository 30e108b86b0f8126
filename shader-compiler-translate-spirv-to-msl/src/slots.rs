// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Mapping from SPIR-V `(set, binding)` pairs to Metal buffer slots.
//!
//! Metal has a single flat buffer argument table per stage, so only
//! descriptor set 0 is accepted and each binding number is used as the
//! buffer index unchanged. Bindings must fit in the table.

use crate::errors::{
    BindingExceedsBufferSlotRange, ConflictingBufferSlot, MultipleDescriptorSetsUnimplemented,
    NoBufferSizesSlot, TranslationResult,
};
use crate::resources::ResourceDescriptor;
use hashbrown::HashMap;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::convert::TryFrom;

/// index into the Metal buffer argument table
pub type BufferSlot = u8;

/// entries in a Metal buffer argument table, on every platform
pub const BUFFER_ARGUMENT_TABLE_LEN: u32 = 31;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SlotAssignment {
    slots: BTreeMap<ResourceDescriptor, BufferSlot>,
}

impl SlotAssignment {
    /// assign every descriptor in `descriptors` the buffer slot equal to its binding
    pub fn for_descriptors(descriptors: &[ResourceDescriptor]) -> TranslationResult<Self> {
        let mut builder = SlotAssignmentBuilder::default();
        for &descriptor in descriptors {
            if descriptor.descriptor_set != 0 {
                return Err(MultipleDescriptorSetsUnimplemented { descriptor }.into());
            }
            let slot = Some(descriptor.binding)
                .filter(|&binding| binding < BUFFER_ARGUMENT_TABLE_LEN)
                .and_then(|binding| BufferSlot::try_from(binding).ok())
                .ok_or(BindingExceedsBufferSlotRange {
                    descriptor,
                    table_len: BUFFER_ARGUMENT_TABLE_LEN,
                })?;
            builder.assign(descriptor, slot)?;
        }
        Ok(builder.finish())
    }
    pub fn get(&self, descriptor: ResourceDescriptor) -> Option<BufferSlot> {
        self.slots.get(&descriptor).copied()
    }
    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
    /// slot for the table of runtime-sized buffer lengths, just past every assigned slot
    pub fn buffer_sizes_slot(&self) -> Result<BufferSlot, NoBufferSizesSlot> {
        let last_slot = match self.slots.values().max() {
            Some(&slot) => slot,
            None => return Ok(0),
        };
        last_slot
            .checked_add(1)
            .filter(|&slot| u32::from(slot) < BUFFER_ARGUMENT_TABLE_LEN)
            .ok_or(NoBufferSizesSlot { last_slot })
    }
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            base: self.slots.iter(),
        }
    }
}

impl<'a> IntoIterator for &'a SlotAssignment {
    type Item = (ResourceDescriptor, BufferSlot);
    type IntoIter = Iter<'a>;
    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

#[derive(Clone, Debug)]
pub struct Iter<'a> {
    base: btree_map::Iter<'a, ResourceDescriptor, BufferSlot>,
}

impl Iterator for Iter<'_> {
    type Item = (ResourceDescriptor, BufferSlot);
    fn next(&mut self) -> Option<Self::Item> {
        self.base.next().map(|(&descriptor, &slot)| (descriptor, slot))
    }
}

#[derive(Default)]
struct SlotAssignmentBuilder {
    slots: BTreeMap<ResourceDescriptor, BufferSlot>,
    owners: HashMap<BufferSlot, ResourceDescriptor>,
}

impl SlotAssignmentBuilder {
    fn assign(&mut self, descriptor: ResourceDescriptor, slot: BufferSlot) -> TranslationResult<()> {
        // variables aliasing one descriptor share its slot
        if let Some(&first) = self.owners.get(&slot) {
            if first != descriptor {
                return Err(ConflictingBufferSlot {
                    slot,
                    first,
                    second: descriptor,
                }
                .into());
            }
        }
        self.owners.insert(slot, descriptor);
        self.slots.insert(descriptor, slot);
        Ok(())
    }
    fn finish(self) -> SlotAssignment {
        SlotAssignment { slots: self.slots }
    }
}
