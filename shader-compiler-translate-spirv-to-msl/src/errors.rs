// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::resources::ResourceDescriptor;
use crate::slots::BufferSlot;
use rspirv::spirv::{Decoration, ExecutionModel, Op, StorageClass};
use spirv_id_map::IdRef;

macro_rules! impl_error {
    (
        $(#[doc = $doc:expr])*
        #[display = $display:tt]
        pub struct $name:ident {
            $(
                $(#[doc = $member_doc:expr])*
                pub $member_name:ident: $member_ty:ty,
            )*
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Debug, thiserror::Error)]
        #[error($display)]
        pub struct $name {
            $(
                $(#[doc = $member_doc])*
                pub $member_name: $member_ty,
            )*
        }
    };
    (
        $(#[doc = $doc:expr])*
        #[display = $display:tt]
        pub struct $name:ident;
    ) => {
        $(#[doc = $doc])*
        #[derive(Debug, thiserror::Error)]
        #[error($display)]
        pub struct $name;
    };
}

impl_error! {
    #[display = "invalid SPIR-V binary: {message}"]
    pub struct InvalidSPIRVBinary {
        pub message: String,
    }
}

impl_error! {
    #[display = "SPIR-V binary length ({byte_len} bytes) is not a multiple of the word size"]
    pub struct SPIRVBinaryLengthNotWordAligned {
        pub byte_len: usize,
    }
}

impl_error! {
    #[display = "invalid SPIR-V magic number: {magic_number:#010x}"]
    pub struct InvalidSPIRVMagicNumber {
        pub magic_number: u32,
    }
}

impl_error! {
    #[display = "missing SPIR-V module header"]
    pub struct MissingSPIRVHeader;
}

impl_error! {
    #[display = "malformed SPIR-V Op{opcode:?} instruction: invalid operand {operand_index}"]
    pub struct MalformedSPIRVInstruction {
        pub opcode: Op,
        pub operand_index: usize,
    }
}

impl_error! {
    #[display = "duplicate SPIR-V {decoration:?} decoration on <id> {target}"]
    pub struct DuplicateSPIRVDecoration {
        pub target: IdRef,
        pub decoration: Decoration,
    }
}

impl_error! {
    #[display = "duplicate SPIR-V entry point with name {name:?} and execution model {execution_model:?}"]
    pub struct DuplicateSPIRVEntryPoint {
        pub name: String,
        pub execution_model: ExecutionModel,
    }
}

impl_error! {
    #[display = "matching SPIR-V entry point with name {name:?} and execution model {execution_model:?} not found"]
    pub struct MatchingSPIRVEntryPointNotFound {
        pub name: String,
        pub execution_model: ExecutionModel,
    }
}

impl_error! {
    #[display = "buffer variable {variable} is missing its {decoration:?} decoration"]
    pub struct MissingResourceDecoration {
        pub variable: IdRef,
        pub decoration: Decoration,
    }
}

impl_error! {
    #[display = "missing SPIR-V LocalSize annotation for entry point {entry_point:?}"]
    pub struct MissingSPIRVLocalSize {
        pub entry_point: String,
    }
}

impl_error! {
    #[display = "duplicate SPIR-V LocalSize annotation for entry point"]
    pub struct DuplicateSPIRVLocalSize;
}

impl_error! {
    /// a workgroup size operand that is not a 32-bit integer constant
    #[display = "SPIR-V <id> {id} is not a valid workgroup size constant"]
    pub struct InvalidWorkgroupSizeConstant {
        pub id: IdRef,
    }
}

impl_error! {
    #[display = "unsupported storage class {storage_class:?} on resource variable {variable}"]
    pub struct UnsupportedStorageClass {
        pub variable: IdRef,
        pub storage_class: StorageClass,
    }
}

impl_error! {
    #[display = "multiple descriptor sets unimplemented: resource {descriptor} is not in descriptor set 0"]
    pub struct MultipleDescriptorSetsUnimplemented {
        pub descriptor: ResourceDescriptor,
    }
}

impl_error! {
    #[display = "resource {descriptor} is outside the {table_len}-entry Metal buffer argument table"]
    pub struct BindingExceedsBufferSlotRange {
        pub descriptor: ResourceDescriptor,
        pub table_len: u32,
    }
}

impl_error! {
    #[display = "no Metal buffer slot left for the buffer length table after slot {last_slot}"]
    pub struct NoBufferSizesSlot {
        pub last_slot: BufferSlot,
    }
}

impl_error! {
    #[display = "Metal buffer slot {slot} assigned to both {first} and {second}"]
    pub struct ConflictingBufferSlot {
        pub slot: BufferSlot,
        pub first: ResourceDescriptor,
        pub second: ResourceDescriptor,
    }
}

impl_error! {
    #[display = "invalid compilation options: {reason}"]
    pub struct InvalidCompilationOptions {
        pub reason: String,
    }
}

impl_error! {
    /// the translation engine rejected input that passed every earlier check
    #[display = "internal translator fault during {stage}: {message}"]
    pub struct InternalTranslatorFault {
        pub stage: &'static str,
        pub message: String,
    }
}

/// broad classification of a [`TranslationError`]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorKind {
    /// the SPIR-V module is corrupt or violates the rules this translator relies on
    MalformedInput,
    /// the module is valid but uses something the Metal resource model here can't express
    UnsupportedFeature,
    /// a bug in the translator or in the assumptions it makes about its input
    Internal,
}

macro_rules! impl_translation_error {
    ($($kind:ident {
        $($error:ident($wrapped_error:ty),)+
    })+) => {
        #[derive(Debug, thiserror::Error)]
        pub enum TranslationError {
            $($(
                #[error(transparent)]
                $error(#[from] $wrapped_error),
            )+)+
        }

        impl TranslationError {
            pub fn kind(&self) -> ErrorKind {
                match self {
                    $($(
                        Self::$error(_) => ErrorKind::$kind,
                    )+)+
                }
            }
        }
    };
}

impl_translation_error! {
    MalformedInput {
        InvalidSPIRVBinary(InvalidSPIRVBinary),
        SPIRVBinaryLengthNotWordAligned(SPIRVBinaryLengthNotWordAligned),
        InvalidSPIRVMagicNumber(InvalidSPIRVMagicNumber),
        MissingSPIRVHeader(MissingSPIRVHeader),
        MalformedSPIRVInstruction(MalformedSPIRVInstruction),
        SPIRVIdOutOfBounds(spirv_id_map::IdOutOfBounds),
        DuplicateSPIRVDecoration(DuplicateSPIRVDecoration),
        DuplicateSPIRVEntryPoint(DuplicateSPIRVEntryPoint),
        MatchingSPIRVEntryPointNotFound(MatchingSPIRVEntryPointNotFound),
        MissingResourceDecoration(MissingResourceDecoration),
        MissingSPIRVLocalSize(MissingSPIRVLocalSize),
        DuplicateSPIRVLocalSize(DuplicateSPIRVLocalSize),
        InvalidWorkgroupSizeConstant(InvalidWorkgroupSizeConstant),
    }
    UnsupportedFeature {
        UnsupportedStorageClass(UnsupportedStorageClass),
        MultipleDescriptorSetsUnimplemented(MultipleDescriptorSetsUnimplemented),
        BindingExceedsBufferSlotRange(BindingExceedsBufferSlotRange),
        NoBufferSizesSlot(NoBufferSizesSlot),
    }
    Internal {
        ConflictingBufferSlot(ConflictingBufferSlot),
        InvalidCompilationOptions(InvalidCompilationOptions),
        InternalTranslatorFault(InternalTranslatorFault),
    }
}

pub type TranslationResult<T> = Result<T, TranslationError>;
