//! Bytecode compiler
//!
//! Turns the 256 instructions of a program into 256 [`ByteCode`] entries in a
//! single forward pass. The pass tracks, for every integer register, the
//! index of the last instruction that wrote it; branches use this to pick
//! their condition register and their backward target.
//!
//! ## Operand Rules
//!
//! - Register/immediate ALU forms use the immediate when `src == dst`
//! - Memory forms use `mod.mem` to choose L1 or L2, except when
//!   `src == dst` where the immediate alone addresses L3
//! - IMUL_RCP by zero or a power of two compiles to NOP
//! - ISWAP_R with `src == dst` compiles to NOP
//! - ISTORE goes to L3 when `mod.cond >= 14`

use rxvm_isa::{
    Config, Instruction, InstructionKind, Program, FLOAT_REGISTER_COUNT, PROGRAM_SIZE,
    REGISTER_COUNT, REGISTER_NEEDS_DISPLACEMENT, STORE_L3_CONDITION,
};
use tracing::debug;

use crate::arith::{is_zero_or_power_of_two, reciprocal};
use crate::bytecode::{ByteCode, Bytecode, FloatSlot, IntSource, MemOperand};

/// Compile a program with the given parameters.
///
/// `params` must pass [`Config::validate`]: the branch window is shifted by
/// `jump_offset + mod.cond` and only validated parameters keep it inside 64
/// bits. [`VM::new`](crate::VM::new) validates before anything is compiled.
pub fn compile(program: &Program, params: &Config) -> Bytecode {
    debug_assert!(params.validate().is_ok(), "compiling with invalid parameters");

    let mut compiler = Compiler::new(params);
    let entries: Vec<ByteCode> = program
        .instructions
        .iter()
        .enumerate()
        .map(|(index, instr)| {
            let entry = compiler.compile_instruction(index, instr);
            compiler.record_writes(index, &entry);
            entry
        })
        .collect();

    let bytecode = Bytecode::from_entries(entries);
    debug!(
        branches = bytecode.branches().count(),
        nops = bytecode.nop_count(),
        "compiled program"
    );
    bytecode
}

struct Compiler<'a> {
    params: &'a Config,
    /// Index of the last instruction writing each register, -1 if none
    last_write: [i32; REGISTER_COUNT],
}

impl<'a> Compiler<'a> {
    fn new(params: &'a Config) -> Self {
        Self {
            params,
            last_write: [-1; REGISTER_COUNT],
        }
    }

    fn compile_instruction(&self, index: usize, instr: &Instruction) -> ByteCode {
        debug_assert!(index < PROGRAM_SIZE);
        let dst = instr.dst_index();
        let src = instr.src_index();
        let fdst = instr.dst as usize % FLOAT_REGISTER_COUNT;
        let fsrc = instr.src as usize % FLOAT_REGISTER_COUNT;

        match instr.kind() {
            InstructionKind::IaddRs => {
                let imm = if dst == REGISTER_NEEDS_DISPLACEMENT { instr.imm_sext() } else { 0 };
                ByteCode::IaddRs {
                    dst,
                    src,
                    shift: instr.mod_shift() as u32,
                    imm,
                }
            }
            InstructionKind::IaddM => ByteCode::IaddM { dst, mem: self.int_memory(instr) },
            InstructionKind::IsubR => ByteCode::IsubR { dst, src: Self::sext_source(instr) },
            InstructionKind::IsubM => ByteCode::IsubM { dst, mem: self.int_memory(instr) },
            InstructionKind::ImulR => ByteCode::ImulR { dst, src: Self::sext_source(instr) },
            InstructionKind::ImulM => ByteCode::ImulM { dst, mem: self.int_memory(instr) },
            InstructionKind::ImulhR => ByteCode::ImulhR { dst, src },
            InstructionKind::ImulhM => ByteCode::ImulhM { dst, mem: self.int_memory(instr) },
            InstructionKind::IsmulhR => ByteCode::IsmulhR { dst, src },
            InstructionKind::IsmulhM => ByteCode::IsmulhM { dst, mem: self.int_memory(instr) },
            InstructionKind::ImulRcp => {
                if is_zero_or_power_of_two(instr.imm32) {
                    return ByteCode::Nop;
                }
                ByteCode::ImulR {
                    dst,
                    src: IntSource::Imm(reciprocal(instr.imm32)),
                }
            }
            InstructionKind::InegR => ByteCode::InegR { dst },
            InstructionKind::IxorR => ByteCode::IxorR { dst, src: Self::sext_source(instr) },
            InstructionKind::IxorM => ByteCode::IxorM { dst, mem: self.int_memory(instr) },
            InstructionKind::IrorR => ByteCode::IrorR { dst, src: Self::raw_source(instr) },
            InstructionKind::IrolR => ByteCode::IrolR { dst, src: Self::raw_source(instr) },
            InstructionKind::IswapR => {
                if src == dst {
                    return ByteCode::Nop;
                }
                ByteCode::IswapR { dst, src }
            }
            InstructionKind::FswapR => {
                let slot = instr.dst as usize % (2 * FLOAT_REGISTER_COUNT);
                let dst = if slot < FLOAT_REGISTER_COUNT {
                    FloatSlot::F(slot)
                } else {
                    FloatSlot::E(slot - FLOAT_REGISTER_COUNT)
                };
                ByteCode::FswapR { dst }
            }
            InstructionKind::FaddR => ByteCode::FaddR { dst: fdst, src: fsrc },
            InstructionKind::FaddM => ByteCode::FaddM {
                dst: fdst,
                mem: self.float_memory(instr),
            },
            InstructionKind::FsubR => ByteCode::FsubR { dst: fdst, src: fsrc },
            InstructionKind::FsubM => ByteCode::FsubM {
                dst: fdst,
                mem: self.float_memory(instr),
            },
            InstructionKind::FscalR => ByteCode::FscalR { dst: fdst },
            InstructionKind::FmulR => ByteCode::FmulR { dst: fdst, src: fsrc },
            InstructionKind::FdivM => ByteCode::FdivM {
                dst: fdst,
                mem: self.float_memory(instr),
            },
            InstructionKind::FsqrtR => ByteCode::FsqrtR { dst: fdst },
            InstructionKind::Cbranch => self.branch(instr),
            InstructionKind::Cfround => ByteCode::Cfround {
                src,
                rotate: instr.imm32 & 63,
            },
            InstructionKind::Istore => {
                let mask = if instr.mod_cond() >= STORE_L3_CONDITION {
                    self.params.l3_mask()
                } else {
                    self.tier_mask(instr)
                };
                ByteCode::Istore {
                    mem: MemOperand {
                        base: Some(dst),
                        displacement: instr.imm_sext(),
                        mask,
                    },
                    src,
                }
            }
            InstructionKind::Nop => ByteCode::Nop,
        }
    }

    fn branch(&self, instr: &Instruction) -> ByteCode {
        // Oldest write wins; strict comparison keeps the lowest index on ties
        let mut creg = 0;
        for reg in 1..REGISTER_COUNT {
            if self.last_write[reg] < self.last_write[creg] {
                creg = reg;
            }
        }
        let target = self.last_write[creg] as i16;

        let shift = instr.mod_cond() as u32 + self.params.jump_offset as u32;
        let mut imm = instr.imm_sext() | (1u64 << shift);
        if shift > 0 {
            imm &= !(1u64 << (shift - 1));
        }
        let mask = self.params.condition_mask() << shift;

        ByteCode::Cbranch {
            creg,
            imm,
            mask,
            target,
        }
    }

    /// Update register ages after emitting `entry` at `index`
    fn record_writes(&mut self, index: usize, entry: &ByteCode) {
        let index = index as i32;
        match *entry {
            // No later instruction may rely on register age across a branch
            ByteCode::Cbranch { .. } => self.last_write = [index; REGISTER_COUNT],
            ByteCode::IswapR { dst, src } => {
                self.last_write[dst] = index;
                self.last_write[src] = index;
            }
            _ => {
                if let Some(reg) = entry.integer_destination() {
                    self.last_write[reg] = index;
                }
            }
        }
    }

    #[inline]
    fn tier_mask(&self, instr: &Instruction) -> u32 {
        if instr.mod_mem() != 0 {
            self.params.l1_mask()
        } else {
            self.params.l2_mask()
        }
    }

    fn int_memory(&self, instr: &Instruction) -> MemOperand {
        if instr.src_index() != instr.dst_index() {
            MemOperand {
                base: Some(instr.src_index()),
                displacement: instr.imm_sext(),
                mask: self.tier_mask(instr),
            }
        } else {
            MemOperand {
                base: None,
                displacement: instr.imm_sext(),
                mask: self.params.l3_mask(),
            }
        }
    }

    fn float_memory(&self, instr: &Instruction) -> MemOperand {
        MemOperand {
            base: Some(instr.src_index()),
            displacement: instr.imm_sext(),
            mask: self.tier_mask(instr),
        }
    }

    fn sext_source(instr: &Instruction) -> IntSource {
        if instr.src_index() != instr.dst_index() {
            IntSource::Reg(instr.src_index())
        } else {
            IntSource::Imm(instr.imm_sext())
        }
    }

    fn raw_source(instr: &Instruction) -> IntSource {
        if instr.src_index() != instr.dst_index() {
            IntSource::Reg(instr.src_index())
        } else {
            IntSource::Imm(instr.imm32 as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opcode(kind: InstructionKind) -> u8 {
        kind.first_opcode().unwrap()
    }

    fn instr(kind: InstructionKind, dst: u8, src: u8, modifier: u8, imm32: u32) -> Instruction {
        Instruction::new(opcode(kind), dst, src, modifier, imm32)
    }

    /// Program filled with FSCAL_R (touches no integer register)
    fn float_program(prefix: &[Instruction]) -> Program {
        let mut program = Program::new();
        program.instructions = [instr(InstructionKind::FscalR, 0, 0, 0, 0); PROGRAM_SIZE];
        program.instructions[..prefix.len()].copy_from_slice(prefix);
        program
    }

    fn compile_one(instruction: Instruction) -> ByteCode {
        let bytecode = compile(&float_program(&[instruction]), &Config::DEFAULT);
        bytecode.entries()[0]
    }

    #[test]
    fn test_iadd_rs_displacement() {
        let entry = compile_one(instr(InstructionKind::IaddRs, 5, 2, 0b1000, 0xFFFF_FFF0));
        assert_eq!(
            entry,
            ByteCode::IaddRs { dst: 5, src: 2, shift: 2, imm: 0xFFFF_FFFF_FFFF_FFF0 }
        );

        let entry = compile_one(instr(InstructionKind::IaddRs, 4, 4, 0, 0xFFFF_FFF0));
        assert_eq!(entry, ByteCode::IaddRs { dst: 4, src: 4, shift: 0, imm: 0 });
    }

    #[test]
    fn test_memory_tier_selection() {
        let l1 = Config::DEFAULT.l1_mask();
        let l2 = Config::DEFAULT.l2_mask();
        let l3 = Config::DEFAULT.l3_mask();

        let entry = compile_one(instr(InstructionKind::IxorM, 1, 2, 1, 16));
        assert_eq!(
            entry.memory_operand(),
            Some(MemOperand { base: Some(2), displacement: 16, mask: l1 })
        );

        let entry = compile_one(instr(InstructionKind::IxorM, 1, 2, 0, 16));
        assert_eq!(entry.memory_operand().map(|m| m.mask), Some(l2));

        // src == dst: absolute L3 address
        let entry = compile_one(instr(InstructionKind::IaddM, 3, 11, 1, 0x1234));
        assert_eq!(
            entry.memory_operand(),
            Some(MemOperand { base: None, displacement: 0x1234, mask: l3 })
        );
    }

    #[test]
    fn test_register_immediate_sources() {
        let entry = compile_one(instr(InstructionKind::IsubR, 2, 2, 0, 0x8000_0000));
        assert_eq!(entry, ByteCode::IsubR { dst: 2, src: IntSource::Imm(0xFFFF_FFFF_8000_0000) });

        let entry = compile_one(instr(InstructionKind::IsubR, 2, 3, 0, 0x8000_0000));
        assert_eq!(entry, ByteCode::IsubR { dst: 2, src: IntSource::Reg(3) });

        // rotations use the raw immediate
        let entry = compile_one(instr(InstructionKind::IrorR, 6, 14, 0, 0x8000_0000));
        assert_eq!(entry, ByteCode::IrorR { dst: 6, src: IntSource::Imm(0x8000_0000) });

        // high multiplies always read a register
        let entry = compile_one(instr(InstructionKind::ImulhR, 6, 6, 0, 7));
        assert_eq!(entry, ByteCode::ImulhR { dst: 6, src: 6 });
    }

    #[test]
    fn test_imul_rcp() {
        let entry = compile_one(instr(InstructionKind::ImulRcp, 1, 0, 0, 3));
        assert_eq!(
            entry,
            ByteCode::ImulR { dst: 1, src: IntSource::Imm(12297829382473034410) }
        );
        assert_eq!(compile_one(instr(InstructionKind::ImulRcp, 1, 0, 0, 0)), ByteCode::Nop);
        assert_eq!(compile_one(instr(InstructionKind::ImulRcp, 1, 0, 0, 64)), ByteCode::Nop);
    }

    #[test]
    fn test_iswap_self_is_nop() {
        assert_eq!(compile_one(instr(InstructionKind::IswapR, 3, 11, 0, 0)), ByteCode::Nop);
        assert_eq!(
            compile_one(instr(InstructionKind::IswapR, 3, 4, 0, 0)),
            ByteCode::IswapR { dst: 3, src: 4 }
        );
    }

    #[test]
    fn test_float_operands() {
        assert_eq!(
            compile_one(instr(InstructionKind::FswapR, 2, 0, 0, 0)),
            ByteCode::FswapR { dst: FloatSlot::F(2) }
        );
        assert_eq!(
            compile_one(instr(InstructionKind::FswapR, 14, 0, 0, 0)),
            ByteCode::FswapR { dst: FloatSlot::E(2) }
        );
        assert_eq!(
            compile_one(instr(InstructionKind::FmulR, 7, 9, 0, 0)),
            ByteCode::FmulR { dst: 3, src: 1 }
        );
        // float memory forms never switch to L3
        let entry = compile_one(instr(InstructionKind::FdivM, 2, 2, 0, 8));
        assert_eq!(
            entry.memory_operand(),
            Some(MemOperand { base: Some(2), displacement: 8, mask: Config::DEFAULT.l2_mask() })
        );
    }

    #[test]
    fn test_istore_l3_condition() {
        let l3 = Config::DEFAULT.l3_mask();
        let entry = compile_one(instr(InstructionKind::Istore, 1, 2, 0xE0, 0));
        assert_eq!(
            entry,
            ByteCode::Istore {
                mem: MemOperand { base: Some(1), displacement: 0, mask: l3 },
                src: 2
            }
        );
        let entry = compile_one(instr(InstructionKind::Istore, 1, 2, 0xD1, 0));
        assert_eq!(entry.memory_operand().map(|m| m.mask), Some(Config::DEFAULT.l1_mask()));
    }

    #[test]
    fn test_cfround() {
        assert_eq!(
            compile_one(instr(InstructionKind::Cfround, 0, 13, 0, 0xFFFF_FFFF)),
            ByteCode::Cfround { src: 5, rotate: 63 }
        );
    }

    #[test]
    fn test_branch_without_writes() {
        let entry = compile_one(instr(InstructionKind::Cbranch, 0, 0, 0x30, 0));
        // shift = 3 + 8
        assert_eq!(
            entry,
            ByteCode::Cbranch {
                creg: 0,
                imm: 1 << 11,
                mask: 0xFF << 11,
                target: -1
            }
        );
    }

    #[test]
    fn test_branch_picks_oldest_register() {
        let mut prefix = Vec::new();
        // write r0..r7 except r4 in order, then r4 last
        for reg in [0u8, 1, 2, 3, 5, 6, 7, 4] {
            prefix.push(instr(InstructionKind::InegR, reg, 0, 0, 0));
        }
        prefix.push(instr(InstructionKind::Cbranch, 0, 0, 0, 0xFFFF_FFFF));
        let bytecode = compile(&float_program(&prefix), &Config::DEFAULT);

        match bytecode.entries()[8] {
            ByteCode::Cbranch { creg, target, imm, mask } => {
                assert_eq!(creg, 0);
                assert_eq!(target, 0);
                // imm = -1 | bit 8, with bit 7 cleared
                assert_eq!(imm, !(1u64 << 7));
                assert_eq!(mask, 0xFF00);
            }
            other => panic!("expected branch, got {other:?}"),
        }
    }

    #[test]
    fn test_branch_tie_breaks_to_lowest_register() {
        let prefix = [
            instr(InstructionKind::InegR, 0, 0, 0, 0),
            instr(InstructionKind::InegR, 1, 0, 0, 0),
            instr(InstructionKind::Cbranch, 0, 0, 0, 0),
        ];
        let bytecode = compile(&float_program(&prefix), &Config::DEFAULT);
        // r2..r7 were never written
        assert!(matches!(
            bytecode.entries()[2],
            ByteCode::Cbranch { creg: 2, target: -1, .. }
        ));
    }

    #[test]
    fn test_branch_marks_all_registers() {
        let prefix = [
            instr(InstructionKind::InegR, 6, 0, 0, 0),
            instr(InstructionKind::Cbranch, 0, 0, 0, 0),
            instr(InstructionKind::InegR, 0, 0, 0, 0),
            instr(InstructionKind::Cbranch, 0, 0, 0, 0),
        ];
        let bytecode = compile(&float_program(&prefix), &Config::DEFAULT);
        // every register except r0 was last touched by the first branch
        assert!(matches!(
            bytecode.entries()[3],
            ByteCode::Cbranch { creg: 1, target: 1, .. }
        ));
    }

    #[test]
    fn test_back_to_back_branches_target_previous() {
        let prefix = [
            instr(InstructionKind::Cbranch, 0, 0, 0, 0),
            instr(InstructionKind::Cbranch, 0, 0, 0, 0),
        ];
        let bytecode = compile(&float_program(&prefix), &Config::DEFAULT);
        let branches: Vec<_> = bytecode.branches().take(2).collect();
        assert_eq!(branches, vec![(0, -1), (1, 0)]);
    }

    #[test]
    fn test_swap_ages_both_registers() {
        let mut prefix: Vec<Instruction> = (0..8)
            .map(|reg| instr(InstructionKind::InegR, reg, 0, 0, 0))
            .collect();
        prefix.push(instr(InstructionKind::IswapR, 0, 1, 0, 0));
        prefix.push(instr(InstructionKind::Cbranch, 0, 0, 0, 0));

        let bytecode = compile(&float_program(&prefix), &Config::DEFAULT);
        assert!(matches!(
            bytecode.entries()[9],
            ByteCode::Cbranch { creg: 2, target: 2, .. }
        ));
    }

    #[test]
    fn test_nop_forms_do_not_age_registers() {
        let prefix = [
            instr(InstructionKind::InegR, 1, 0, 0, 0),
            instr(InstructionKind::IswapR, 0, 0, 0, 0),
            instr(InstructionKind::ImulRcp, 0, 0, 0, 64),
            instr(InstructionKind::Cbranch, 0, 0, 0, 0),
        ];
        let bytecode = compile(&float_program(&prefix), &Config::DEFAULT);
        assert!(matches!(
            bytecode.entries()[3],
            ByteCode::Cbranch { creg: 0, target: -1, .. }
        ));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "compiling with invalid parameters")]
    fn test_compile_requires_valid_params() {
        let params = Config {
            jump_bits: 60,
            ..Config::DEFAULT
        };
        compile(&float_program(&[]), &params);
    }
}
