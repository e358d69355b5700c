//! Instruction formatting to assembly text
//!
//! Operands are shown as the compiler resolves them: register forms that
//! fall back to an immediate print the immediate, memory forms print their
//! scratchpad tier.

use rxvm_isa::{
    FloatBank, Instruction, InstructionKind, FLOAT_REGISTER_COUNT, REGISTER_NEEDS_DISPLACEMENT,
    STORE_L3_CONDITION,
};

/// Format instruction as assembly text
pub fn format_instruction(instr: &Instruction) -> String {
    let kind = instr.kind();
    let name = kind.name();
    let dst = int_reg(instr.dst_index());
    let same = instr.src_index() == instr.dst_index();

    match kind {
        InstructionKind::IaddRs => {
            let mut text = format!(
                "{name} {dst}, {}, LSH {}",
                int_reg(instr.src_index()),
                instr.mod_shift()
            );
            if instr.dst_index() == REGISTER_NEEDS_DISPLACEMENT {
                text.push_str(&format!(", {}", signed(instr)));
            }
            text
        }

        InstructionKind::IaddM
        | InstructionKind::IsubM
        | InstructionKind::ImulM
        | InstructionKind::ImulhM
        | InstructionKind::IsmulhM
        | InstructionKind::IxorM => {
            format!("{name} {dst}, {}", int_memory(instr))
        }

        InstructionKind::IsubR | InstructionKind::ImulR | InstructionKind::IxorR => {
            if same {
                format!("{name} {dst}, {}", signed(instr))
            } else {
                format!("{name} {dst}, {}", int_reg(instr.src_index()))
            }
        }

        InstructionKind::IrorR | InstructionKind::IrolR => {
            if same {
                format!("{name} {dst}, {}", instr.imm32 & 63)
            } else {
                format!("{name} {dst}, {}", int_reg(instr.src_index()))
            }
        }

        InstructionKind::ImulhR | InstructionKind::IsmulhR | InstructionKind::IswapR => {
            format!("{name} {dst}, {}", int_reg(instr.src_index()))
        }

        InstructionKind::ImulRcp => format!("{name} {dst}, {}", instr.imm32),

        InstructionKind::InegR => format!("{name} {dst}"),

        InstructionKind::FswapR => {
            let slot = instr.dst as usize % (2 * FLOAT_REGISTER_COUNT);
            if slot < FLOAT_REGISTER_COUNT {
                format!("{name} {}", float_reg(FloatBank::F, slot))
            } else {
                format!("{name} {}", float_reg(FloatBank::E, slot - FLOAT_REGISTER_COUNT))
            }
        }

        InstructionKind::FaddR | InstructionKind::FsubR => format!(
            "{name} {}, {}",
            float_reg(FloatBank::F, float_index(instr.dst)),
            float_reg(FloatBank::A, float_index(instr.src))
        ),

        InstructionKind::FaddM | InstructionKind::FsubM => format!(
            "{name} {}, {}",
            float_reg(FloatBank::F, float_index(instr.dst)),
            tier_memory(instr, instr.src_index())
        ),

        InstructionKind::FscalR => {
            format!("{name} {}", float_reg(FloatBank::F, float_index(instr.dst)))
        }

        InstructionKind::FmulR => format!(
            "{name} {}, {}",
            float_reg(FloatBank::E, float_index(instr.dst)),
            float_reg(FloatBank::A, float_index(instr.src))
        ),

        InstructionKind::FdivM => format!(
            "{name} {}, {}",
            float_reg(FloatBank::E, float_index(instr.dst)),
            tier_memory(instr, instr.src_index())
        ),

        InstructionKind::FsqrtR => {
            format!("{name} {}", float_reg(FloatBank::E, float_index(instr.dst)))
        }

        InstructionKind::Cbranch => {
            format!("{name} {}, COND {}", signed(instr), instr.mod_cond())
        }

        InstructionKind::Cfround => {
            format!("{name} {}, {}", int_reg(instr.src_index()), instr.imm32 & 63)
        }

        InstructionKind::Istore => {
            let target = if instr.mod_cond() >= STORE_L3_CONDITION {
                format!("L3[{}{:+}]", dst, signed(instr))
            } else {
                tier_memory(instr, instr.dst_index())
            };
            format!("{name} {target}, {}", int_reg(instr.src_index()))
        }

        InstructionKind::Nop => name.to_string(),
    }
}

fn int_reg(index: usize) -> String {
    format!("r{index}")
}

fn float_reg(bank: FloatBank, index: usize) -> String {
    format!("{}{index}", bank.prefix())
}

#[inline]
fn float_index(operand: u8) -> usize {
    operand as usize % FLOAT_REGISTER_COUNT
}

#[inline]
fn signed(instr: &Instruction) -> i32 {
    instr.imm32 as i32
}

/// `L1[rN+imm]` or `L2[rN+imm]` depending on `mod.mem`
fn tier_memory(instr: &Instruction, base: usize) -> String {
    let tier = if instr.mod_mem() != 0 { "L1" } else { "L2" };
    format!("{tier}[{}{:+}]", int_reg(base), signed(instr))
}

/// Integer memory operand, absolute L3 when `src == dst`
fn int_memory(instr: &Instruction) -> String {
    if instr.src_index() == instr.dst_index() {
        format!("L3[{}]", signed(instr))
    } else {
        tier_memory(instr, instr.src_index())
    }
}
