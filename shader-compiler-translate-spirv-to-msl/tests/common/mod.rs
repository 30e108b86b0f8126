// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Hand-assembled SPIR-V compute kernels.

#![allow(dead_code)]

use rspirv::binary::Assemble;
use rspirv::dr::{self, Instruction, Operand};
use rspirv::spirv::{
    AddressingModel, BuiltIn, Capability, Decoration, Dim, ExecutionMode, ExecutionModel,
    FunctionControl, ImageFormat, MemoryModel, Op, StorageClass, Word,
};

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

#[derive(Copy, Clone, Debug)]
pub enum Resource {
    /// `uint data[]` in a `StorageBuffer` block, incremented at the invocation index
    StorageBuffer { descriptor_set: u32, binding: u32 },
    /// `uint data[64]` in a `Uniform` block, read but never written
    UniformBuffer { descriptor_set: u32, binding: u32 },
    /// a combined image sampler in `UniformConstant`
    SampledImage { descriptor_set: u32, binding: u32 },
}

#[derive(Copy, Clone, Debug)]
pub enum Extent {
    Constant(u32),
    Specialization { spec_id: u32, default: u32 },
}

#[derive(Copy, Clone, Debug)]
pub enum LocalSize {
    /// `OpExecutionMode LocalSize`
    Literal([u32; 3]),
    /// `OpExecutionModeId LocalSizeId`
    Ids([Extent; 3]),
}

#[derive(Clone, Debug)]
pub struct Kernel {
    pub name: String,
    pub execution_model: ExecutionModel,
    pub resources: Vec<Resource>,
    pub local_size: Option<LocalSize>,
    /// constant decorated `BuiltIn WorkgroupSize`
    pub workgroup_size_built_in: Option<[Extent; 3]>,
}

struct Ids {
    bound: Word,
}

impl Ids {
    fn next(&mut self) -> Word {
        let retval = self.bound;
        self.bound += 1;
        retval
    }
}

fn instruction(
    opcode: Op,
    result_type: Option<Word>,
    result_id: Option<Word>,
    operands: Vec<Operand>,
) -> Instruction {
    Instruction::new(opcode, result_type, result_id, operands)
}

fn decorate(target: Word, decoration: Decoration, literal: Option<u32>) -> Instruction {
    let mut operands = vec![Operand::IdRef(target), Operand::Decoration(decoration)];
    operands.extend(literal.map(Operand::LiteralBit32));
    instruction(Op::Decorate, None, None, operands)
}

/// declare a constant per extent; the flag is set if any is specializable
fn extent_ids(
    ids: &mut Ids,
    uint_type: Word,
    extents: &[Extent; 3],
    types: &mut Vec<Instruction>,
    annotations: &mut Vec<Instruction>,
) -> (Vec<Operand>, bool) {
    let mut specialization = false;
    let mut operands = Vec::new();
    for extent in extents {
        let id = ids.next();
        match *extent {
            Extent::Constant(value) => types.push(instruction(
                Op::Constant,
                Some(uint_type),
                Some(id),
                vec![Operand::LiteralBit32(value)],
            )),
            Extent::Specialization { spec_id, default } => {
                specialization = true;
                types.push(instruction(
                    Op::SpecConstant,
                    Some(uint_type),
                    Some(id),
                    vec![Operand::LiteralBit32(default)],
                ));
                annotations.push(decorate(id, Decoration::SpecId, Some(spec_id)));
            }
        }
        operands.push(Operand::IdRef(id));
    }
    (operands, specialization)
}

impl Kernel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            execution_model: ExecutionModel::GLCompute,
            resources: Vec::new(),
            local_size: Some(LocalSize::Literal([32, 1, 1])),
            workgroup_size_built_in: None,
        }
    }
    pub fn execution_model(self, execution_model: ExecutionModel) -> Self {
        Self {
            execution_model,
            ..self
        }
    }
    pub fn resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }
    pub fn storage_buffer(self, descriptor_set: u32, binding: u32) -> Self {
        self.resource(Resource::StorageBuffer {
            descriptor_set,
            binding,
        })
    }
    pub fn local_size(self, local_size: Option<LocalSize>) -> Self {
        Self { local_size, ..self }
    }
    pub fn workgroup_size_built_in(self, extents: [Extent; 3]) -> Self {
        Self {
            workgroup_size_built_in: Some(extents),
            ..self
        }
    }
    pub fn assemble(&self) -> Vec<u32> {
        let mut ids = Ids { bound: 1 };
        let mut module = dr::Module::new();
        let mut types = Vec::new();
        let mut annotations = Vec::new();
        let mut body = Vec::new();

        let void_type = ids.next();
        let uint_type = ids.next();
        let uvec3_type = ids.next();
        let function_type = ids.next();
        let zero = ids.next();
        let one = ids.next();
        let sixty_four = ids.next();
        let input_uvec3_pointer = ids.next();
        let storage_buffer_uint_pointer = ids.next();
        let uniform_uint_pointer = ids.next();
        let global_invocation_id = ids.next();
        let main_function = ids.next();
        let main_label = ids.next();
        types.push(instruction(Op::TypeVoid, None, Some(void_type), vec![]));
        types.push(instruction(
            Op::TypeInt,
            None,
            Some(uint_type),
            vec![Operand::LiteralBit32(32), Operand::LiteralBit32(0)],
        ));
        types.push(instruction(
            Op::TypeVector,
            None,
            Some(uvec3_type),
            vec![Operand::IdRef(uint_type), Operand::LiteralBit32(3)],
        ));
        types.push(instruction(
            Op::TypeFunction,
            None,
            Some(function_type),
            vec![Operand::IdRef(void_type)],
        ));
        for &(id, value) in &[(zero, 0), (one, 1), (sixty_four, 64)] {
            types.push(instruction(
                Op::Constant,
                Some(uint_type),
                Some(id),
                vec![Operand::LiteralBit32(value)],
            ));
        }
        for &(id, storage_class, pointee) in &[
            (input_uvec3_pointer, StorageClass::Input, uvec3_type),
            (
                storage_buffer_uint_pointer,
                StorageClass::StorageBuffer,
                uint_type,
            ),
            (uniform_uint_pointer, StorageClass::Uniform, uint_type),
        ] {
            types.push(instruction(
                Op::TypePointer,
                None,
                Some(id),
                vec![Operand::StorageClass(storage_class), Operand::IdRef(pointee)],
            ));
        }
        types.push(instruction(
            Op::Variable,
            Some(input_uvec3_pointer),
            Some(global_invocation_id),
            vec![Operand::StorageClass(StorageClass::Input)],
        ));
        annotations.push(instruction(
            Op::Decorate,
            None,
            None,
            vec![
                Operand::IdRef(global_invocation_id),
                Operand::Decoration(Decoration::BuiltIn),
                Operand::BuiltIn(BuiltIn::GlobalInvocationId),
            ],
        ));

        let invocation_id = ids.next();
        let index = ids.next();
        body.push(instruction(
            Op::Load,
            Some(uvec3_type),
            Some(invocation_id),
            vec![Operand::IdRef(global_invocation_id)],
        ));
        body.push(instruction(
            Op::CompositeExtract,
            Some(uint_type),
            Some(index),
            vec![Operand::IdRef(invocation_id), Operand::LiteralBit32(0)],
        ));

        for resource in &self.resources {
            match *resource {
                Resource::StorageBuffer {
                    descriptor_set,
                    binding,
                }
                | Resource::UniformBuffer {
                    descriptor_set,
                    binding,
                } => {
                    let is_storage = matches!(resource, Resource::StorageBuffer { .. });
                    let (storage_class, element_pointer) = if is_storage {
                        (StorageClass::StorageBuffer, storage_buffer_uint_pointer)
                    } else {
                        (StorageClass::Uniform, uniform_uint_pointer)
                    };
                    let array_type = ids.next();
                    let struct_type = ids.next();
                    let pointer_type = ids.next();
                    let variable = ids.next();
                    if is_storage {
                        types.push(instruction(
                            Op::TypeRuntimeArray,
                            None,
                            Some(array_type),
                            vec![Operand::IdRef(uint_type)],
                        ));
                    } else {
                        types.push(instruction(
                            Op::TypeArray,
                            None,
                            Some(array_type),
                            vec![Operand::IdRef(uint_type), Operand::IdRef(sixty_four)],
                        ));
                    }
                    types.push(instruction(
                        Op::TypeStruct,
                        None,
                        Some(struct_type),
                        vec![Operand::IdRef(array_type)],
                    ));
                    types.push(instruction(
                        Op::TypePointer,
                        None,
                        Some(pointer_type),
                        vec![
                            Operand::StorageClass(storage_class),
                            Operand::IdRef(struct_type),
                        ],
                    ));
                    types.push(instruction(
                        Op::Variable,
                        Some(pointer_type),
                        Some(variable),
                        vec![Operand::StorageClass(storage_class)],
                    ));
                    // std140 rounds uniform array elements up to 16 bytes
                    let array_stride = if is_storage { 4 } else { 16 };
                    annotations.push(decorate(
                        array_type,
                        Decoration::ArrayStride,
                        Some(array_stride),
                    ));
                    annotations.push(decorate(struct_type, Decoration::Block, None));
                    annotations.push(instruction(
                        Op::MemberDecorate,
                        None,
                        None,
                        vec![
                            Operand::IdRef(struct_type),
                            Operand::LiteralBit32(0),
                            Operand::Decoration(Decoration::Offset),
                            Operand::LiteralBit32(0),
                        ],
                    ));
                    annotations.push(decorate(
                        variable,
                        Decoration::DescriptorSet,
                        Some(descriptor_set),
                    ));
                    annotations.push(decorate(variable, Decoration::Binding, Some(binding)));

                    let element = ids.next();
                    let value = ids.next();
                    body.push(instruction(
                        Op::AccessChain,
                        Some(element_pointer),
                        Some(element),
                        vec![
                            Operand::IdRef(variable),
                            Operand::IdRef(zero),
                            Operand::IdRef(index),
                        ],
                    ));
                    body.push(instruction(
                        Op::Load,
                        Some(uint_type),
                        Some(value),
                        vec![Operand::IdRef(element)],
                    ));
                    if is_storage {
                        let sum = ids.next();
                        body.push(instruction(
                            Op::IAdd,
                            Some(uint_type),
                            Some(sum),
                            vec![Operand::IdRef(value), Operand::IdRef(one)],
                        ));
                        body.push(instruction(
                            Op::Store,
                            None,
                            None,
                            vec![Operand::IdRef(element), Operand::IdRef(sum)],
                        ));
                    }
                }
                Resource::SampledImage {
                    descriptor_set,
                    binding,
                } => {
                    let image_type = ids.next();
                    let sampled_image_type = ids.next();
                    let pointer_type = ids.next();
                    let variable = ids.next();
                    types.push(instruction(
                        Op::TypeImage,
                        None,
                        Some(image_type),
                        vec![
                            Operand::IdRef(uint_type),
                            Operand::Dim(Dim::Dim2D),
                            Operand::LiteralBit32(0),
                            Operand::LiteralBit32(0),
                            Operand::LiteralBit32(0),
                            Operand::LiteralBit32(1),
                            Operand::ImageFormat(ImageFormat::Unknown),
                        ],
                    ));
                    types.push(instruction(
                        Op::TypeSampledImage,
                        None,
                        Some(sampled_image_type),
                        vec![Operand::IdRef(image_type)],
                    ));
                    types.push(instruction(
                        Op::TypePointer,
                        None,
                        Some(pointer_type),
                        vec![
                            Operand::StorageClass(StorageClass::UniformConstant),
                            Operand::IdRef(sampled_image_type),
                        ],
                    ));
                    types.push(instruction(
                        Op::Variable,
                        Some(pointer_type),
                        Some(variable),
                        vec![Operand::StorageClass(StorageClass::UniformConstant)],
                    ));
                    annotations.push(decorate(
                        variable,
                        Decoration::DescriptorSet,
                        Some(descriptor_set),
                    ));
                    annotations.push(decorate(variable, Decoration::Binding, Some(binding)));
                }
            }
        }
        body.push(instruction(Op::Return, None, None, vec![]));

        let mut execution_modes = Vec::new();
        match &self.local_size {
            Some(LocalSize::Literal([x, y, z])) => execution_modes.push(instruction(
                Op::ExecutionMode,
                None,
                None,
                vec![
                    Operand::IdRef(main_function),
                    Operand::ExecutionMode(ExecutionMode::LocalSize),
                    Operand::LiteralBit32(*x),
                    Operand::LiteralBit32(*y),
                    Operand::LiteralBit32(*z),
                ],
            )),
            Some(LocalSize::Ids(extents)) => {
                let (extent_operands, _) =
                    extent_ids(&mut ids, uint_type, extents, &mut types, &mut annotations);
                let mut operands = vec![
                    Operand::IdRef(main_function),
                    Operand::ExecutionMode(ExecutionMode::LocalSizeId),
                ];
                operands.extend(extent_operands);
                execution_modes.push(instruction(Op::ExecutionModeId, None, None, operands));
            }
            None => {}
        }
        if let Some(extents) = &self.workgroup_size_built_in {
            let (constituents, specialization) =
                extent_ids(&mut ids, uint_type, extents, &mut types, &mut annotations);
            let composite = ids.next();
            let opcode = if specialization {
                Op::SpecConstantComposite
            } else {
                Op::ConstantComposite
            };
            types.push(instruction(
                opcode,
                Some(uvec3_type),
                Some(composite),
                constituents,
            ));
            annotations.push(instruction(
                Op::Decorate,
                None,
                None,
                vec![
                    Operand::IdRef(composite),
                    Operand::Decoration(Decoration::BuiltIn),
                    Operand::BuiltIn(BuiltIn::WorkgroupSize),
                ],
            ));
        }

        let mut header = dr::ModuleHeader::new(ids.bound);
        header.set_version(1, 3);
        module.header = Some(header);
        module.capabilities = vec![instruction(
            Op::Capability,
            None,
            None,
            vec![Operand::Capability(Capability::Shader)],
        )];
        module.extensions = vec![instruction(
            Op::Extension,
            None,
            None,
            vec![Operand::LiteralString(
                "SPV_KHR_storage_buffer_storage_class".into(),
            )],
        )];
        module.memory_model = Some(instruction(
            Op::MemoryModel,
            None,
            None,
            vec![
                Operand::AddressingModel(AddressingModel::Logical),
                Operand::MemoryModel(MemoryModel::GLSL450),
            ],
        ));
        module.entry_points = vec![instruction(
            Op::EntryPoint,
            None,
            None,
            vec![
                Operand::ExecutionModel(self.execution_model),
                Operand::IdRef(main_function),
                Operand::LiteralString(self.name.clone()),
                Operand::IdRef(global_invocation_id),
            ],
        )];
        module.execution_modes = execution_modes;
        module.annotations = annotations;
        module.types_global_values = types;
        let mut function = dr::Function::new();
        function.def = Some(instruction(
            Op::Function,
            Some(void_type),
            Some(main_function),
            vec![
                Operand::FunctionControl(FunctionControl::NONE),
                Operand::IdRef(function_type),
            ],
        ));
        let mut block = dr::Block::new();
        block.label = Some(instruction(Op::Label, None, Some(main_label), vec![]));
        block.instructions = body;
        function.blocks.push(block);
        function.end = Some(instruction(Op::FunctionEnd, None, None, vec![]));
        module.functions.push(function);
        module.assemble()
    }
}

/// `words` as little-endian bytes
pub fn to_le_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}

/// `words` as big-endian bytes
pub fn to_be_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_be_bytes()).collect()
}
