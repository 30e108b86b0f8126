// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::entry_point::EntryPoint;
use crate::errors::{
    DuplicateSPIRVLocalSize, InvalidWorkgroupSizeConstant, MissingSPIRVLocalSize,
    TranslationResult,
};
use crate::reflect::{id_operand, literal_operand, malformed, Constant, SpirvReflection};
use core::mem;
use rspirv::dr::Operand;
use rspirv::spirv::{BuiltIn, ExecutionMode};
use spirv_id_map::IdRef;

/// the number of invocations in a Metal thread group along each axis
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ThreadGroupSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl ThreadGroupSize {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
    pub fn has_zero_extent(&self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }
    pub fn invocation_count(&self) -> u64 {
        u64::from(self.x) * u64::from(self.y) * u64::from(self.z)
    }
}

/// the workgroup size declared by a compute entry point
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum WorkgroupSize {
    Literal(ThreadGroupSize),
    /// set at pipeline creation through specialization constants
    Specialized {
        /// `SpecId`s of the specializable extents
        spec_ids: Vec<u32>,
    },
}

impl WorkgroupSize {
    /// the concrete size, if every extent is a known non-zero literal
    pub fn resolved(&self) -> Option<ThreadGroupSize> {
        match *self {
            WorkgroupSize::Literal(size) if !size.has_zero_extent() => Some(size),
            WorkgroupSize::Literal(_) | WorkgroupSize::Specialized { .. } => None,
        }
    }
}

#[derive(Default)]
struct ExtentsResolver {
    extents: [u32; 3],
    spec_ids: Vec<u32>,
    specialized: bool,
}

impl ExtentsResolver {
    fn resolve(
        mut self,
        reflection: &SpirvReflection,
        ids: &[IdRef],
        composite_is_specialization: bool,
    ) -> TranslationResult<WorkgroupSize> {
        self.specialized = composite_is_specialization;
        if ids.len() != self.extents.len() {
            return Err(InvalidWorkgroupSizeConstant {
                id: ids.first().copied().unwrap_or(IdRef(0)),
            }
            .into());
        }
        for (extent, &id) in self.extents.iter_mut().zip(ids) {
            match reflection.constant(id)? {
                Some(&Constant::Literal(value)) => *extent = value,
                Some(&Constant::Specialization { default }) => {
                    *extent = default;
                    self.specialized = true;
                    if let Some(spec_id) = reflection.decorations().get(id)?.and_then(|v| v.spec_id)
                    {
                        self.spec_ids.push(spec_id);
                    }
                }
                _ => return Err(InvalidWorkgroupSizeConstant { id }.into()),
            }
        }
        if self.specialized {
            return Ok(WorkgroupSize::Specialized {
                spec_ids: self.spec_ids,
            });
        }
        let [x, y, z] = self.extents;
        Ok(WorkgroupSize::Literal(ThreadGroupSize { x, y, z }))
    }
}

fn local_size_from_execution_modes(
    reflection: &SpirvReflection,
    entry_point: &EntryPoint,
) -> TranslationResult<Option<WorkgroupSize>> {
    let mut retval = None;
    for instruction in &reflection.module().execution_modes {
        if id_operand(instruction, 0)? != entry_point.id {
            continue;
        }
        let execution_mode = match instruction.operands.get(1) {
            Some(&Operand::ExecutionMode(v)) => v,
            _ => return Err(malformed(instruction, 1)),
        };
        let local_size = match execution_mode {
            ExecutionMode::LocalSize => WorkgroupSize::Literal(ThreadGroupSize {
                x: literal_operand(instruction, 2)?,
                y: literal_operand(instruction, 3)?,
                z: literal_operand(instruction, 4)?,
            }),
            ExecutionMode::LocalSizeId => {
                let ids = [
                    id_operand(instruction, 2)?,
                    id_operand(instruction, 3)?,
                    id_operand(instruction, 4)?,
                ];
                ExtentsResolver::default().resolve(reflection, &ids, false)?
            }
            _ => continue,
        };
        if mem::replace(&mut retval, Some(local_size)).is_some() {
            return Err(DuplicateSPIRVLocalSize.into());
        }
    }
    Ok(retval)
}

/// the workgroup size of `entry_point`
///
/// A constant decorated `BuiltIn WorkgroupSize` takes precedence over the
/// entry point's `LocalSize`/`LocalSizeId` execution mode.
pub(crate) fn workgroup_size_for_entry_point(
    reflection: &SpirvReflection,
    entry_point: &EntryPoint,
) -> TranslationResult<WorkgroupSize> {
    let local_size = local_size_from_execution_modes(reflection, entry_point)?;
    if let Some(id) = reflection
        .decorations()
        .find_built_in(BuiltIn::WorkgroupSize)
    {
        return match reflection.constant(id)? {
            Some(Constant::Composite {
                constituents,
                specialization,
            }) => ExtentsResolver::default().resolve(reflection, constituents, *specialization),
            _ => Err(InvalidWorkgroupSizeConstant { id }.into()),
        };
    }
    local_size.ok_or_else(|| {
        MissingSPIRVLocalSize {
            entry_point: entry_point.name.clone(),
        }
        .into()
    })
}
