// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Read-only view of a loaded SPIR-V module: decorations, constants and
//! global variables, indexed by `<id>`.

use crate::decorations::DecorationTable;
use crate::errors::{
    InvalidSPIRVBinary, MalformedSPIRVInstruction, MissingSPIRVHeader, TranslationResult,
};
use rspirv::binary::{self, Consumer, ParseAction};
use rspirv::dr::{self, Instruction, Operand};
use rspirv::spirv::{Op, StorageClass};
use spirv_id_map::{IdMap, IdRef};

pub(crate) fn id_operand(instruction: &Instruction, operand_index: usize) -> TranslationResult<IdRef> {
    match instruction.operands.get(operand_index) {
        Some(&Operand::IdRef(id)) => Ok(IdRef(id)),
        _ => Err(malformed(instruction, operand_index)),
    }
}

pub(crate) fn literal_operand(
    instruction: &Instruction,
    operand_index: usize,
) -> TranslationResult<u32> {
    match instruction.operands.get(operand_index) {
        Some(&Operand::LiteralBit32(value)) => Ok(value),
        _ => Err(malformed(instruction, operand_index)),
    }
}

pub(crate) fn malformed(instruction: &Instruction, operand_index: usize) -> crate::TranslationError {
    MalformedSPIRVInstruction {
        opcode: instruction.class.opcode,
        operand_index,
    }
    .into()
}

pub(crate) fn result_id(instruction: &Instruction) -> TranslationResult<IdRef> {
    instruction
        .result_id
        .map(IdRef)
        .ok_or_else(|| malformed(instruction, 0))
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Constant {
    /// `OpConstant` holding a 32-bit scalar
    Literal(u32),
    /// `OpSpecConstant` holding a 32-bit scalar; `default` is used when not specialized
    Specialization { default: u32 },
    /// `OpConstantComposite` or `OpSpecConstantComposite`
    Composite {
        constituents: Vec<IdRef>,
        specialization: bool,
    },
    /// any other constant; never a valid workgroup extent
    Other,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) struct GlobalVariable {
    pub(crate) id: IdRef,
    pub(crate) storage_class: StorageClass,
}

/// [`dr::Loader`] that also accepts `OpExecutionModeId`, which it rejects on its own
struct ModuleLoader {
    loader: dr::Loader,
    execution_mode_ids: Vec<Instruction>,
}

impl ModuleLoader {
    fn new() -> Self {
        Self {
            loader: dr::Loader::new(),
            execution_mode_ids: Vec::new(),
        }
    }
    fn module(self) -> dr::Module {
        let mut module = self.loader.module();
        module.execution_modes.extend(self.execution_mode_ids);
        module
    }
}

impl Consumer for ModuleLoader {
    fn initialize(&mut self) -> ParseAction {
        self.loader.initialize()
    }
    fn finalize(&mut self) -> ParseAction {
        self.loader.finalize()
    }
    fn consume_header(&mut self, header: dr::ModuleHeader) -> ParseAction {
        self.loader.consume_header(header)
    }
    fn consume_instruction(&mut self, instruction: Instruction) -> ParseAction {
        if instruction.class.opcode == Op::ExecutionModeId {
            self.execution_mode_ids.push(instruction);
            return ParseAction::Continue;
        }
        self.loader.consume_instruction(instruction)
    }
}

pub(crate) struct SpirvReflection {
    module: dr::Module,
    decorations: DecorationTable,
    constants: IdMap<IdRef, Constant>,
    global_variables: Vec<GlobalVariable>,
}

impl SpirvReflection {
    pub(crate) fn load(words: &[u32]) -> TranslationResult<Self> {
        let mut loader = ModuleLoader::new();
        binary::parse_words(words, &mut loader).map_err(|e| InvalidSPIRVBinary {
            message: format!("{:?}", e),
        })?;
        let module = loader.module();
        let header = module.header.as_ref().ok_or(MissingSPIRVHeader)?;
        let decorations = DecorationTable::parse(header, &module.annotations)?;
        let mut constants = IdMap::new(header);
        let mut global_variables = Vec::new();
        for instruction in &module.types_global_values {
            let constant = match instruction.class.opcode {
                Op::Variable => {
                    let storage_class = match instruction.operands.first() {
                        Some(&Operand::StorageClass(v)) => v,
                        _ => return Err(malformed(instruction, 0)),
                    };
                    global_variables.push(GlobalVariable {
                        id: result_id(instruction)?,
                        storage_class,
                    });
                    continue;
                }
                Op::Constant => match instruction.operands.as_slice() {
                    [Operand::LiteralBit32(value)] => Constant::Literal(*value),
                    _ => Constant::Other,
                },
                Op::SpecConstant => match instruction.operands.as_slice() {
                    [Operand::LiteralBit32(default)] => Constant::Specialization { default: *default },
                    _ => Constant::Other,
                },
                Op::ConstantComposite | Op::SpecConstantComposite => Constant::Composite {
                    constituents: (0..instruction.operands.len())
                        .map(|index| id_operand(instruction, index))
                        .collect::<TranslationResult<_>>()?,
                    specialization: instruction.class.opcode == Op::SpecConstantComposite,
                },
                Op::ConstantTrue
                | Op::ConstantFalse
                | Op::ConstantNull
                | Op::SpecConstantTrue
                | Op::SpecConstantFalse
                | Op::SpecConstantOp => Constant::Other,
                _ => continue,
            };
            constants.insert(result_id(instruction)?, constant)?;
        }
        Ok(Self {
            module,
            decorations,
            constants,
            global_variables,
        })
    }
    pub(crate) fn module(&self) -> &dr::Module {
        &self.module
    }
    pub(crate) fn decorations(&self) -> &DecorationTable {
        &self.decorations
    }
    pub(crate) fn constant(&self, id: IdRef) -> TranslationResult<Option<&Constant>> {
        Ok(self.constants.get(id)?)
    }
    /// global `OpVariable`s in declaration order
    pub(crate) fn global_variables(&self) -> &[GlobalVariable] {
        &self.global_variables
    }
}
