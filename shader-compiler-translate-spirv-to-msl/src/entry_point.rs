// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::errors::{DuplicateSPIRVEntryPoint, MatchingSPIRVEntryPointNotFound, TranslationResult};
use crate::reflect::{id_operand, malformed, SpirvReflection};
use rspirv::dr::Operand;
use rspirv::spirv::ExecutionModel;
use spirv_id_map::IdRef;

/// the entry point every translation is bound to
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct EntryPoint {
    pub name: String,
    pub execution_model: ExecutionModel,
    /// the `OpFunction` result `<id>`
    pub id: IdRef,
}

/// look up a compute entry point by exact name
pub(crate) fn find_compute_entry_point(
    reflection: &SpirvReflection,
    name: &str,
) -> TranslationResult<EntryPoint> {
    const EXECUTION_MODEL: ExecutionModel = ExecutionModel::GLCompute;
    let mut retval = None;
    for instruction in &reflection.module().entry_points {
        let execution_model = match instruction.operands.first() {
            Some(&Operand::ExecutionModel(v)) => v,
            _ => return Err(malformed(instruction, 0)),
        };
        let entry_point_name = match instruction.operands.get(2) {
            Some(Operand::LiteralString(v)) => v,
            _ => return Err(malformed(instruction, 2)),
        };
        if execution_model != EXECUTION_MODEL || entry_point_name != name {
            continue;
        }
        if retval.is_some() {
            return Err(DuplicateSPIRVEntryPoint {
                name: name.into(),
                execution_model,
            }
            .into());
        }
        retval = Some(EntryPoint {
            name: entry_point_name.clone(),
            execution_model,
            id: id_operand(instruction, 1)?,
        });
    }
    retval.ok_or_else(|| {
        MatchingSPIRVEntryPointNotFound {
            name: name.into(),
            execution_model: EXECUTION_MODEL,
        }
        .into()
    })
}
