// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Cross compiles SPIR-V compute kernels to Metal Shading Language.
//!
//! Translation binds one compute entry point, gives every buffer resource a
//! Metal buffer slot, writes MSL source and reports the fixed thread-group
//! size the kernel needs. Kernels whose workgroup size is only known once
//! specialization constants are supplied produce no output (`Ok(None)`).

mod backend;
mod decorations;
mod entry_point;
mod errors;
mod module;
mod options;
mod reflect;
mod resources;
mod slots;
mod workgroup;

pub use crate::backend::{CompiledSource, CrossCompiler, NagaMslCompiler};
pub use crate::entry_point::EntryPoint;
pub use crate::errors::*;
pub use crate::module::{spirv_words_from_bytes, BinaryModule};
pub use crate::options::{CompilationOptions, MetalPlatform, MslVersion};
pub use crate::resources::ResourceDescriptor;
pub use crate::slots::{BufferSlot, SlotAssignment, BUFFER_ARGUMENT_TABLE_LEN};
pub use crate::workgroup::{ThreadGroupSize, WorkgroupSize};

use crate::reflect::SpirvReflection;
use tracing::debug;

/// a translated kernel
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MetalShader {
    /// MSL source text
    pub source: String,
    /// name of the kernel function in `source`
    pub entry_point: String,
    pub thread_group_size: ThreadGroupSize,
    /// slot the host binds the runtime-sized buffer length table to; `None`
    /// when `source` doesn't declare one
    pub buffer_sizes_slot: Option<BufferSlot>,
}

/// per-call translator state
///
/// Every call to [`SpirvToMslCompiler::new`] reads the module afresh, so
/// separate instances can be used on separate threads without coordination.
pub struct SpirvToMslCompiler<'a> {
    module: BinaryModule<'a>,
    reflection: SpirvReflection,
    options: CompilationOptions,
}

impl<'a> SpirvToMslCompiler<'a> {
    pub fn new(spirv: &'a [u32]) -> TranslationResult<Self> {
        let module = BinaryModule::new(spirv);
        Ok(Self {
            module,
            reflection: SpirvReflection::load(module.words())?,
            options: CompilationOptions::metal_compute(),
        })
    }
    pub fn with_options(self, options: CompilationOptions) -> Self {
        Self { options, ..self }
    }
    pub fn options(&self) -> &CompilationOptions {
        &self.options
    }
    pub fn compute_entry_point(&self, name: &str) -> TranslationResult<EntryPoint> {
        entry_point::find_compute_entry_point(&self.reflection, name)
    }
    /// `(set, binding)` of every buffer resource, sorted
    pub fn buffer_descriptors(&self) -> TranslationResult<Vec<ResourceDescriptor>> {
        resources::buffer_set_binding_pairs(&self.reflection)
    }
    pub fn slot_assignment(&self) -> TranslationResult<SlotAssignment> {
        SlotAssignment::for_descriptors(&self.buffer_descriptors()?)
    }
    pub fn workgroup_size(&self, entry_point: &EntryPoint) -> TranslationResult<WorkgroupSize> {
        workgroup::workgroup_size_for_entry_point(&self.reflection, entry_point)
    }
    /// translate `entry_point_name` with naga as the MSL engine
    pub fn compile(&self, entry_point_name: &str) -> TranslationResult<Option<MetalShader>> {
        self.compile_with(entry_point_name, NagaMslCompiler::new)
    }
    /// translate `entry_point_name`, creating the MSL engine with `new_backend`
    ///
    /// The engine is only created once the kernel is known to have a concrete
    /// workgroup size. It reads a copy of the module with that size declared
    /// as a literal `LocalSize`.
    pub fn compile_with<C, F>(
        &self,
        entry_point_name: &str,
        new_backend: F,
    ) -> TranslationResult<Option<MetalShader>>
    where
        C: CrossCompiler,
        F: for<'m> FnOnce(BinaryModule<'m>) -> TranslationResult<C>,
    {
        let entry_point = self.compute_entry_point(entry_point_name)?;
        debug!(entry_point = %entry_point.name, "cross compiling SPIR-V to MSL");
        let descriptors = self.buffer_descriptors()?;
        let slots = SlotAssignment::for_descriptors(&descriptors)?;
        self.options.validate()?;
        let workgroup_size = self.workgroup_size(&entry_point)?;
        let thread_group_size = match workgroup_size.resolved() {
            Some(v) => v,
            None => {
                debug!(
                    entry_point = %entry_point.name,
                    ?workgroup_size,
                    "workgroup size not resolvable at translation time"
                );
                return Ok(None);
            }
        };
        let words = module::with_literal_local_size(
            self.module.words(),
            entry_point.id,
            thread_group_size,
        )?;
        let backend = new_backend(BinaryModule::new(&words))?;
        let CompiledSource {
            source,
            entry_point: msl_entry_point,
            buffer_sizes_slot,
        } = backend.compile(&entry_point, &slots, &self.options)?;
        debug!(
            "Cross compiled Metal Shading Language source code:\n-----\n{}\n-----",
            source
        );
        Ok(Some(MetalShader {
            source,
            entry_point: msl_entry_point,
            thread_group_size,
            buffer_sizes_slot,
        }))
    }
}

/// translate the compute entry point `entry_point` of `spirv` to MSL
///
/// Returns `Ok(None)` when the workgroup size depends on specialization
/// constants or has a zero extent.
pub fn cross_compile_spirv_to_msl(
    spirv: &[u32],
    entry_point: &str,
) -> TranslationResult<Option<MetalShader>> {
    SpirvToMslCompiler::new(spirv)?.compile(entry_point)
}
