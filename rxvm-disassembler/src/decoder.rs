//! Raw byte decoding

use rxvm_isa::{Instruction, Program, INSTRUCTION_SIZE};

use crate::error::{DisassemblerError, Result};

/// Decode a single 8-byte instruction
pub fn decode(bytes: &[u8]) -> Result<Instruction> {
    Ok(Instruction::from_slice(bytes)?)
}

/// Decode a bare instruction stream (no entropy block)
pub fn decode_stream(bytes: &[u8]) -> Result<Vec<Instruction>> {
    let remainder = bytes.len() % INSTRUCTION_SIZE;
    if remainder != 0 {
        return Err(DisassemblerError::TrailingBytes(remainder));
    }
    bytes.chunks_exact(INSTRUCTION_SIZE).map(decode).collect()
}

/// Decode a full program buffer: entropy block followed by the instructions
pub fn decode_program(bytes: &[u8]) -> Result<Program> {
    Ok(Program::from_bytes(bytes)?)
}
