// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::errors::{InvalidCompilationOptions, TranslationResult};
use core::fmt;

/// Metal GPU platform family
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MetalPlatform {
    MacOS,
    IOS,
}

impl MetalPlatform {
    /// oldest MSL version supporting buffer argument tables on this platform
    pub fn minimum_msl_version(self) -> MslVersion {
        match self {
            MetalPlatform::MacOS => MslVersion::new(2, 0),
            MetalPlatform::IOS => MslVersion::new(2, 0),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct MslVersion {
    pub major: u8,
    pub minor: u8,
}

impl MslVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for MslVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// options controlling MSL generation
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CompilationOptions {
    pub platform: MetalPlatform,
    pub msl_version: MslVersion,
    /// address every resource through the explicit slot table; the backend
    /// rejects any resource missing from the table instead of inventing a slot
    pub explicit_resource_table: bool,
    pub zero_initialize_workgroup_memory: bool,
}

impl CompilationOptions {
    /// the options used for every compute kernel unless overridden
    pub fn metal_compute() -> Self {
        // TODO: select the platform and version from the target Metal GPU family
        let platform = MetalPlatform::MacOS;
        Self {
            platform,
            msl_version: platform.minimum_msl_version(),
            explicit_resource_table: true,
            zero_initialize_workgroup_memory: true,
        }
    }
    pub(crate) fn validate(&self) -> TranslationResult<()> {
        let minimum = self.platform.minimum_msl_version();
        if self.msl_version < minimum {
            return Err(InvalidCompilationOptions {
                reason: format!(
                    "MSL {} is older than the minimum MSL {} for {:?}",
                    self.msl_version, minimum, self.platform
                ),
            }
            .into());
        }
        Ok(())
    }
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self::metal_compute()
    }
}
