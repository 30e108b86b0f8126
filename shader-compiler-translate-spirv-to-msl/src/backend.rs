// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! The engine that writes MSL source, behind a narrow interface.

use crate::entry_point::EntryPoint;
use crate::errors::{InternalTranslatorFault, TranslationResult};
use crate::module::BinaryModule;
use crate::options::CompilationOptions;
use crate::slots::{BufferSlot, SlotAssignment};
use naga::back::msl;
use tracing::debug;

/// output of [`CrossCompiler::compile`]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompiledSource {
    /// MSL source text
    pub source: String,
    /// name of the kernel function in `source`
    pub entry_point: String,
    /// slot of the runtime-sized buffer length table, if `source` declares one
    pub buffer_sizes_slot: Option<BufferSlot>,
}

/// emits MSL for one entry point of an already-analyzed SPIR-V module
pub trait CrossCompiler {
    /// write MSL for `entry_point`, binding buffers as `slots` dictates
    fn compile(
        &self,
        entry_point: &EntryPoint,
        slots: &SlotAssignment,
        options: &CompilationOptions,
    ) -> TranslationResult<CompiledSource>;
}

fn fault(stage: &'static str, message: impl ToString) -> InternalTranslatorFault {
    InternalTranslatorFault {
        stage,
        message: message.to_string(),
    }
}

/// whether MSL needs the buffer length table to access a global of type `ty`
fn has_runtime_sized_array(
    ty: naga::Handle<naga::Type>,
    types: &naga::UniqueArena<naga::Type>,
) -> bool {
    match types[ty].inner {
        naga::TypeInner::Array {
            size: naga::ArraySize::Dynamic,
            ..
        } => true,
        naga::TypeInner::Struct { ref members, .. } => members
            .last()
            .map_or(false, |member| has_runtime_sized_array(member.ty, types)),
        _ => false,
    }
}

/// [`CrossCompiler`] backed by naga's SPIR-V front end and MSL back end
#[derive(Debug)]
pub struct NagaMslCompiler {
    module: naga::Module,
}

impl NagaMslCompiler {
    pub fn new(module: BinaryModule<'_>) -> TranslationResult<Self> {
        let options = naga::front::spv::Options {
            adjust_coordinate_space: false,
            strict_capabilities: false,
            ..Default::default()
        };
        let module = naga::front::spv::Frontend::new(module.words().iter().copied(), &options)
            .parse()
            .map_err(|e| fault("SPIR-V parsing", e))?;
        Ok(Self { module })
    }
    fn binding_map(slots: &SlotAssignment) -> msl::BindingMap {
        slots
            .iter()
            .map(|(descriptor, slot)| {
                (
                    naga::ResourceBinding {
                        group: descriptor.descriptor_set,
                        binding: descriptor.binding,
                    },
                    msl::BindTarget {
                        buffer: Some(slot),
                        ..Default::default()
                    },
                )
            })
            .collect()
    }
}

impl CrossCompiler for NagaMslCompiler {
    fn compile(
        &self,
        entry_point: &EntryPoint,
        slots: &SlotAssignment,
        options: &CompilationOptions,
    ) -> TranslationResult<CompiledSource> {
        let mut module = self.module.clone();
        module.entry_points.retain(|v| {
            v.stage == naga::ShaderStage::Compute && v.name == entry_point.name
        });
        if module.entry_points.len() != 1 {
            return Err(fault(
                "entry point selection",
                format!(
                    "expected one compute entry point named {:?}, found {}",
                    entry_point.name,
                    module.entry_points.len()
                ),
            )
            .into());
        }
        let info = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| fault("validation", e))?;
        let function_info = info.get_entry_point(0);
        let needs_buffer_sizes = module.global_variables.iter().any(|(handle, variable)| {
            !function_info[handle].is_empty()
                && has_runtime_sized_array(variable.ty, &module.types)
        });
        let buffer_sizes_slot = if needs_buffer_sizes {
            Some(slots.buffer_sizes_slot()?)
        } else {
            None
        };
        let mut per_entry_point_map = msl::EntryPointResourceMap::default();
        per_entry_point_map.insert(
            entry_point.name.clone(),
            msl::EntryPointResources {
                resources: Self::binding_map(slots),
                sizes_buffer: buffer_sizes_slot,
                ..Default::default()
            },
        );
        let msl_options = msl::Options {
            lang_version: (options.msl_version.major, options.msl_version.minor),
            per_entry_point_map,
            fake_missing_bindings: !options.explicit_resource_table,
            zero_initialize_workgroup_memory: options.zero_initialize_workgroup_memory,
            ..Default::default()
        };
        debug!(
            platform = ?options.platform,
            msl_version = %options.msl_version,
            buffers = slots.len(),
            ?buffer_sizes_slot,
            "writing MSL"
        );
        let (source, translation_info) = msl::write_string(
            &module,
            &info,
            &msl_options,
            &msl::PipelineOptions::default(),
        )
        .map_err(|e| fault("MSL generation", e))?;
        let entry_point = translation_info
            .entry_point_names
            .into_iter()
            .next()
            .ok_or_else(|| fault("MSL generation", "no entry point written"))?
            .map_err(|e| fault("MSL generation", e))?;
        Ok(CompiledSource {
            source,
            entry_point,
            buffer_sizes_slot,
        })
    }
}
