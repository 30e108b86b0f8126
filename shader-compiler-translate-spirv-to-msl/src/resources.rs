// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Enumeration of the buffer resources a module binds through descriptor sets.

use crate::errors::{MissingResourceDecoration, TranslationResult, UnsupportedStorageClass};
use crate::reflect::{GlobalVariable, SpirvReflection};
use core::fmt;
use rspirv::spirv::{Decoration, StorageClass};
use tracing::trace;

/// the `(DescriptorSet, Binding)` pair of one buffer resource
///
/// Ordered by descriptor set, then binding.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ResourceDescriptor {
    pub descriptor_set: u32,
    pub binding: u32,
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(set = {}, binding = {})",
            self.descriptor_set, self.binding
        )
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum StorageClassKind {
    /// not an externally bound resource
    Interior,
    Buffer,
    Unsupported,
}

impl From<StorageClass> for StorageClassKind {
    fn from(storage_class: StorageClass) -> Self {
        match storage_class {
            StorageClass::Function
            | StorageClass::Private
            | StorageClass::Workgroup
            // built-in inputs such as GlobalInvocationId
            | StorageClass::Input => StorageClassKind::Interior,
            StorageClass::Uniform | StorageClass::StorageBuffer => StorageClassKind::Buffer,
            // TODO: push constants could map to a dedicated buffer slot
            _ => StorageClassKind::Unsupported,
        }
    }
}

#[derive(Default)]
struct BufferDescriptorsBuilder {
    descriptors: Vec<ResourceDescriptor>,
}

impl BufferDescriptorsBuilder {
    fn visit(
        &mut self,
        reflection: &SpirvReflection,
        variable: GlobalVariable,
    ) -> TranslationResult<()> {
        let GlobalVariable { id, storage_class } = variable;
        trace!(variable = %id, ?storage_class, "visiting global variable");
        match StorageClassKind::from(storage_class) {
            StorageClassKind::Interior => Ok(()),
            StorageClassKind::Unsupported => Err(UnsupportedStorageClass {
                variable: id,
                storage_class,
            }
            .into()),
            StorageClassKind::Buffer => {
                let decorations = reflection.decorations().get(id)?;
                let descriptor_set = decorations
                    .and_then(|v| v.descriptor_set)
                    .ok_or(MissingResourceDecoration {
                        variable: id,
                        decoration: Decoration::DescriptorSet,
                    })?;
                let binding = decorations
                    .and_then(|v| v.binding)
                    .ok_or(MissingResourceDecoration {
                        variable: id,
                        decoration: Decoration::Binding,
                    })?;
                self.descriptors.push(ResourceDescriptor {
                    descriptor_set,
                    binding,
                });
                Ok(())
            }
        }
    }
    fn finish(mut self) -> Vec<ResourceDescriptor> {
        self.descriptors.sort();
        self.descriptors
    }
}

/// every buffer resource's set and binding numbers, in increasing order
pub(crate) fn buffer_set_binding_pairs(
    reflection: &SpirvReflection,
) -> TranslationResult<Vec<ResourceDescriptor>> {
    let mut builder = BufferDescriptorsBuilder::default();
    for &variable in reflection.global_variables() {
        builder.visit(reflection, variable)?;
    }
    Ok(builder.finish())
}
