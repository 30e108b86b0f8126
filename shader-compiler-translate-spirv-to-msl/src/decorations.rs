// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::errors::{DuplicateSPIRVDecoration, TranslationResult};
use crate::reflect::{id_operand, literal_operand, malformed};
use rspirv::dr::{Instruction, ModuleHeader, Operand};
use rspirv::spirv::{BuiltIn, Decoration, Op};
use spirv_id_map::{IdMap, IdRef};

/// the decorations this translator cares about on a single `<id>`
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Decorations {
    pub(crate) descriptor_set: Option<u32>,
    pub(crate) binding: Option<u32>,
    pub(crate) built_in: Option<BuiltIn>,
    pub(crate) spec_id: Option<u32>,
}

fn set_once<T>(
    slot: &mut Option<T>,
    value: T,
    target: IdRef,
    decoration: Decoration,
) -> TranslationResult<()> {
    if slot.is_some() {
        return Err(DuplicateSPIRVDecoration { target, decoration }.into());
    }
    *slot = Some(value);
    Ok(())
}

pub(crate) struct DecorationTable {
    decorations: IdMap<IdRef, Decorations>,
}

impl DecorationTable {
    pub(crate) fn parse(
        header: &ModuleHeader,
        annotations: &[Instruction],
    ) -> TranslationResult<Self> {
        let mut decorations = IdMap::<IdRef, Decorations>::new(header);
        for instruction in annotations {
            if instruction.class.opcode != Op::Decorate {
                continue;
            }
            let target = id_operand(instruction, 0)?;
            let decoration = match instruction.operands.get(1) {
                Some(&Operand::Decoration(v)) => v,
                _ => return Err(malformed(instruction, 1)),
            };
            match decoration {
                Decoration::DescriptorSet => {
                    let value = literal_operand(instruction, 2)?;
                    let entry = decorations.entry(target)?.or_insert_default();
                    set_once(&mut entry.descriptor_set, value, target, decoration)?;
                }
                Decoration::Binding => {
                    let value = literal_operand(instruction, 2)?;
                    let entry = decorations.entry(target)?.or_insert_default();
                    set_once(&mut entry.binding, value, target, decoration)?;
                }
                Decoration::SpecId => {
                    let value = literal_operand(instruction, 2)?;
                    let entry = decorations.entry(target)?.or_insert_default();
                    set_once(&mut entry.spec_id, value, target, decoration)?;
                }
                Decoration::BuiltIn => {
                    let value = match instruction.operands.get(2) {
                        Some(&Operand::BuiltIn(v)) => v,
                        _ => return Err(malformed(instruction, 2)),
                    };
                    let entry = decorations.entry(target)?.or_insert_default();
                    set_once(&mut entry.built_in, value, target, decoration)?;
                }
                _ => {}
            }
        }
        Ok(Self { decorations })
    }
    pub(crate) fn get(&self, id: IdRef) -> TranslationResult<Option<&Decorations>> {
        Ok(self.decorations.get(id)?)
    }
    /// the first `<id>` decorated with `built_in`, if any
    pub(crate) fn find_built_in(&self, built_in: BuiltIn) -> Option<IdRef> {
        self.decorations
            .iter()
            .find(|(_, decorations)| decorations.built_in == Some(built_in))
            .map(|(id, _)| id)
    }
}
