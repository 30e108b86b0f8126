// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::errors::{
    InvalidSPIRVBinary, InvalidSPIRVMagicNumber, SPIRVBinaryLengthNotWordAligned,
    TranslationResult,
};
use crate::workgroup::ThreadGroupSize;
use rspirv::spirv::{ExecutionMode, Op, MAGIC_NUMBER};
use spirv_id_map::IdRef;
use std::mem;

const HEADER_WORD_COUNT: usize = 5;

/// a borrowed SPIR-V binary, one `u32` per word in host byte order
///
/// The module is assumed to already pass the SPIR-V validator; it is never
/// modified.
#[derive(Copy, Clone, Debug)]
pub struct BinaryModule<'a> {
    words: &'a [u32],
}

impl<'a> BinaryModule<'a> {
    pub fn new(words: &'a [u32]) -> Self {
        Self { words }
    }
    pub fn words(&self) -> &'a [u32] {
        self.words
    }
}

/// decode a SPIR-V byte blob into words, accepting either byte order
pub fn spirv_words_from_bytes(bytes: &[u8]) -> TranslationResult<Vec<u32>> {
    const WORD_SIZE: usize = mem::size_of::<u32>();
    if bytes.len() % WORD_SIZE != 0 {
        return Err(SPIRVBinaryLengthNotWordAligned {
            byte_len: bytes.len(),
        }
        .into());
    }
    let mut words: Vec<u32> = bytes
        .chunks_exact(WORD_SIZE)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    match words.first().copied() {
        Some(MAGIC_NUMBER) => {}
        Some(magic_number) if magic_number.swap_bytes() == MAGIC_NUMBER => {
            for word in &mut words {
                *word = word.swap_bytes();
            }
        }
        magic_number => {
            return Err(InvalidSPIRVMagicNumber {
                magic_number: magic_number.unwrap_or(0),
            }
            .into())
        }
    }
    Ok(words)
}

fn first_word(opcode: Op, word_count: usize) -> u32 {
    ((word_count as u32) << 16) | opcode as u32
}

fn is_local_size_mode(instruction: &[u32]) -> bool {
    let opcode = instruction[0] & 0xFFFF;
    (opcode == Op::ExecutionMode as u32 || opcode == Op::ExecutionModeId as u32)
        && instruction.len() > 2
        && (instruction[2] == ExecutionMode::LocalSize as u32
            || instruction[2] == ExecutionMode::LocalSizeId as u32)
}

/// `words` with the size of `entry_point` declared as a literal `LocalSize`
///
/// Every `LocalSize`/`LocalSizeId` of `entry_point` is replaced by one
/// `OpExecutionMode LocalSize` holding `size`, and the `LocalSizeId` modes
/// of other entry points are dropped.
pub(crate) fn with_literal_local_size(
    words: &[u32],
    entry_point: IdRef,
    size: ThreadGroupSize,
) -> TranslationResult<Vec<u32>> {
    let truncated = || InvalidSPIRVBinary {
        message: "truncated SPIR-V instruction".into(),
    };
    if words.len() < HEADER_WORD_COUNT {
        return Err(truncated().into());
    }
    let local_size = [
        first_word(Op::ExecutionMode, 6),
        entry_point.0,
        ExecutionMode::LocalSize as u32,
        size.x,
        size.y,
        size.z,
    ];
    let mut retval = Vec::with_capacity(words.len() + local_size.len());
    retval.extend_from_slice(&words[..HEADER_WORD_COUNT]);
    let mut inserted = false;
    let mut rest = &words[HEADER_WORD_COUNT..];
    while let Some(&first) = rest.first() {
        let word_count = (first >> 16) as usize;
        if word_count == 0 || word_count > rest.len() {
            return Err(truncated().into());
        }
        let (instruction, tail) = rest.split_at(word_count);
        rest = tail;
        let opcode = first & 0xFFFF;
        let in_preamble = [
            Op::Capability,
            Op::Extension,
            Op::ExtInstImport,
            Op::MemoryModel,
            Op::EntryPoint,
        ]
        .iter()
        .any(|&v| v as u32 == opcode);
        // execution modes follow the entry points
        if !inserted && !in_preamble {
            retval.extend_from_slice(&local_size);
            inserted = true;
        }
        if is_local_size_mode(instruction)
            && (instruction[1] == entry_point.0 || opcode == Op::ExecutionModeId as u32)
        {
            continue;
        }
        retval.extend_from_slice(instruction);
    }
    if !inserted {
        retval.extend_from_slice(&local_size);
    }
    Ok(retval)
}
