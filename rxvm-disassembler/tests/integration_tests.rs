//! Integration tests for the RXVM disassembler
//!
//! Tests the complete disassembly workflow including:
//! - Decoding raw buffers
//! - Listing layout
//! - Operand rendering for every instruction kind

use proptest::prelude::*;
use rxvm_disassembler::{
    decode, decode_stream, disassemble, disassemble_bytes, format_instruction, DisassemblerError,
};
use rxvm_isa::{Instruction, InstructionKind, Program, FREQUENCIES, PROGRAM_BYTES};

fn instr(kind: InstructionKind, dst: u8, src: u8, modifier: u8, imm32: u32) -> Instruction {
    Instruction::new(kind.first_opcode().unwrap(), dst, src, modifier, imm32)
}

// ============================================================================
// Listing
// ============================================================================

#[test]
fn test_listing_has_one_line_per_instruction() {
    let asm = disassemble(&Program::new());
    let code_lines = asm
        .lines()
        .filter(|line| !line.starts_with(';') && !line.is_empty())
        .count();
    assert_eq!(code_lines, 256);
}

#[test]
fn test_listing_from_bytes_matches_program() {
    let mut bytes = vec![0u8; PROGRAM_BYTES];
    // first instruction: FSQRT_R e1
    let first = 128;
    bytes[first..first + 8].copy_from_slice(&instr(InstructionKind::FsqrtR, 1, 0, 0, 0).to_bytes());
    let program = Program::from_bytes(&bytes).unwrap();

    let from_bytes = disassemble_bytes(&bytes).unwrap();
    assert_eq!(from_bytes, disassemble(&program));
    assert!(from_bytes.contains("  0:  "));
    assert!(from_bytes.contains("FSQRT_R e1"));
}

#[test]
fn test_truncated_buffer_rejected() {
    let result = disassemble_bytes(&[0u8; PROGRAM_BYTES - 1]);
    assert!(matches!(result, Err(DisassemblerError::InvalidProgram(_))));
}

// ============================================================================
// Operand rendering
// ============================================================================

#[test]
fn test_every_kind_has_a_rendering() {
    for (kind, _) in FREQUENCIES.iter().filter(|(_, weight)| *weight > 0) {
        let text = format_instruction(&instr(*kind, 2, 3, 0x11, 5));
        assert!(text.starts_with(kind.name()), "{text}");
    }
}

#[test]
fn test_integer_register_ops() {
    let cases = [
        (instr(InstructionKind::ImulR, 0, 1, 0, 0), "IMUL_R r0, r1"),
        (instr(InstructionKind::IxorR, 3, 11, 0, 7), "IXOR_R r3, 7"),
        (instr(InstructionKind::ImulhR, 2, 2, 0, 0), "IMULH_R r2, r2"),
        (instr(InstructionKind::IsmulhR, 4, 5, 0, 0), "ISMULH_R r4, r5"),
        (instr(InstructionKind::ImulRcp, 7, 0, 0, 12345), "IMUL_RCP r7, 12345"),
        (instr(InstructionKind::InegR, 15, 0, 0, 0), "INEG_R r7"),
        (instr(InstructionKind::IswapR, 1, 2, 0, 0), "ISWAP_R r1, r2"),
        (instr(InstructionKind::IrolR, 1, 2, 0, 0), "IROL_R r1, r2"),
    ];
    for (instruction, expected) in cases {
        assert_eq!(format_instruction(&instruction), expected);
    }
}

#[test]
fn test_memory_ops() {
    let cases = [
        (instr(InstructionKind::IsubM, 0, 1, 1, 100), "ISUB_M r0, L1[r1+100]"),
        (instr(InstructionKind::ImulhM, 0, 1, 2, 100), "IMULH_M r0, L1[r1+100]"),
        (instr(InstructionKind::IsmulhM, 0, 1, 0, 100), "ISMULH_M r0, L2[r1+100]"),
        (instr(InstructionKind::IsmulhM, 1, 1, 0, 100), "ISMULH_M r1, L3[100]"),
        (instr(InstructionKind::FaddM, 6, 1, 0, 0), "FADD_M f2, L2[r1+0]"),
        (instr(InstructionKind::FsubM, 0, 1, 3, 8), "FSUB_M f0, L1[r1+8]"),
    ];
    for (instruction, expected) in cases {
        assert_eq!(format_instruction(&instruction), expected);
    }
}

#[test]
fn test_float_register_ops() {
    assert_eq!(format_instruction(&instr(InstructionKind::FsubR, 0, 1, 0, 0)), "FSUB_R f0, a1");
    assert_eq!(format_instruction(&instr(InstructionKind::FscalR, 7, 0, 0, 0)), "FSCAL_R f3");
}

#[test]
fn test_branch_condition() {
    assert_eq!(
        format_instruction(&instr(InstructionKind::Cbranch, 0, 0, 0xF0, (-1i32) as u32)),
        "CBRANCH -1, COND 15"
    );
}

// ============================================================================
// Decoding
// ============================================================================

#[test]
fn test_decode_stream_roundtrip_text() {
    let instructions = [
        instr(InstructionKind::IaddRs, 0, 1, 0, 0),
        instr(InstructionKind::Istore, 2, 3, 0, 0),
    ];
    let bytes: Vec<u8> = instructions.iter().flat_map(|i| i.to_bytes()).collect();
    let decoded = decode_stream(&bytes).unwrap();
    assert_eq!(decoded, instructions);
}

proptest! {
    #[test]
    fn prop_any_word_formats(bytes in prop::array::uniform8(any::<u8>())) {
        let instruction = decode(&bytes).unwrap();
        let text = format_instruction(&instruction);
        prop_assert!(text.starts_with(instruction.kind().name()));
        prop_assert!(!text.contains('\n'));
    }
}
