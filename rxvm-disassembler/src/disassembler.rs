//! Program listing

use rxvm_isa::{Instruction, Program};

use crate::decoder::decode_program;
use crate::error::Result;
use crate::formatter::format_instruction;

/// Disassemble a program into a listing with an entropy header
pub fn disassemble(program: &Program) -> String {
    let mut output = String::new();

    output.push_str("; RXVM program\n");
    output.push_str(&format!("; {} instructions\n", program.len()));
    output.push_str(";\n; entropy:\n");
    for (row, words) in program.entropy.chunks(4).enumerate() {
        output.push_str(&format!(";  {:2}:", row * 4));
        for word in words {
            output.push_str(&format!(" {word:016x}"));
        }
        output.push('\n');
    }
    output.push('\n');

    for (index, instr) in program.instructions.iter().enumerate() {
        output.push_str(&listing_line(index, instr));
        output.push('\n');
    }

    output
}

/// Decode and disassemble a raw program buffer
pub fn disassemble_bytes(bytes: &[u8]) -> Result<String> {
    Ok(disassemble(&decode_program(bytes)?))
}

/// `index:  hex  text` line of the listing
pub fn listing_line(index: usize, instr: &Instruction) -> String {
    let hex: String = instr.to_bytes().iter().map(|b| format!("{b:02x}")).collect();
    format!("{index:3}:  {hex}  {}", format_instruction(instr))
}
