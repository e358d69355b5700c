//! Bytecode execution
//!
//! One pass over the compiled program runs every entry in order; a taken
//! branch moves the program counter back to `target` and the loop's
//! increment resumes execution at `target + 1`.

use crate::arith::{mulh, smulh};
use crate::bytecode::{ByteCode, Bytecode, FloatSlot};
use crate::float::{FloatPair, RoundingMode, SCALE_MASK};
use crate::register_file::RegisterFile;
use crate::scratchpad::Scratchpad;

/// Run the compiled program once over the register file
pub fn execute(
    bytecode: &Bytecode,
    regs: &mut RegisterFile,
    scratchpad: &mut Scratchpad,
    e_mask: [u64; 2],
    mode: &mut RoundingMode,
) {
    let entries = bytecode.entries();
    let mut pc: isize = 0;
    while (pc as usize) < entries.len() {
        if let Some(target) = execute_entry(&entries[pc as usize], regs, scratchpad, e_mask, mode) {
            pc = target as isize;
        }
        pc += 1;
    }
}

/// Execute one entry; returns the branch target when a branch is taken
#[inline]
pub fn execute_entry(
    entry: &ByteCode,
    regs: &mut RegisterFile,
    scratchpad: &mut Scratchpad,
    e_mask: [u64; 2],
    mode: &mut RoundingMode,
) -> Option<i16> {
    let r = &mut regs.r;
    match *entry {
        ByteCode::IaddRs { dst, src, shift, imm } => {
            r[dst] = r[dst].wrapping_add(r[src] << shift).wrapping_add(imm);
        }
        ByteCode::IaddM { dst, mem } => {
            let value = scratchpad.read_u64(mem.address(r));
            r[dst] = r[dst].wrapping_add(value);
        }
        ByteCode::IsubR { dst, src } => {
            r[dst] = r[dst].wrapping_sub(src.value(r));
        }
        ByteCode::IsubM { dst, mem } => {
            let value = scratchpad.read_u64(mem.address(r));
            r[dst] = r[dst].wrapping_sub(value);
        }
        ByteCode::ImulR { dst, src } => {
            r[dst] = r[dst].wrapping_mul(src.value(r));
        }
        ByteCode::ImulM { dst, mem } => {
            let value = scratchpad.read_u64(mem.address(r));
            r[dst] = r[dst].wrapping_mul(value);
        }
        ByteCode::ImulhR { dst, src } => {
            r[dst] = mulh(r[dst], r[src]);
        }
        ByteCode::ImulhM { dst, mem } => {
            let value = scratchpad.read_u64(mem.address(r));
            r[dst] = mulh(r[dst], value);
        }
        ByteCode::IsmulhR { dst, src } => {
            r[dst] = smulh(r[dst], r[src]);
        }
        ByteCode::IsmulhM { dst, mem } => {
            let value = scratchpad.read_u64(mem.address(r));
            r[dst] = smulh(r[dst], value);
        }
        ByteCode::InegR { dst } => {
            r[dst] = r[dst].wrapping_neg();
        }
        ByteCode::IxorR { dst, src } => {
            r[dst] ^= src.value(r);
        }
        ByteCode::IxorM { dst, mem } => {
            r[dst] ^= scratchpad.read_u64(mem.address(r));
        }
        ByteCode::IrorR { dst, src } => {
            r[dst] = r[dst].rotate_right((src.value(r) & 63) as u32);
        }
        ByteCode::IrolR { dst, src } => {
            r[dst] = r[dst].rotate_left((src.value(r) & 63) as u32);
        }
        ByteCode::IswapR { dst, src } => {
            r.swap(dst, src);
        }
        ByteCode::FswapR { dst } => match dst {
            FloatSlot::F(i) => regs.f[i] = regs.f[i].swap(),
            FloatSlot::E(i) => regs.e[i] = regs.e[i].swap(),
        },
        ByteCode::FaddR { dst, src } => {
            regs.f[dst] = regs.f[dst].add(regs.a[src], *mode);
        }
        ByteCode::FaddM { dst, mem } => {
            let operand = scratchpad.read_float_pair(mem.address(r));
            regs.f[dst] = regs.f[dst].add(operand, *mode);
        }
        ByteCode::FsubR { dst, src } => {
            regs.f[dst] = regs.f[dst].sub(regs.a[src], *mode);
        }
        ByteCode::FsubM { dst, mem } => {
            let operand = scratchpad.read_float_pair(mem.address(r));
            regs.f[dst] = regs.f[dst].sub(operand, *mode);
        }
        ByteCode::FscalR { dst } => {
            regs.f[dst] = regs.f[dst].xor_mask(SCALE_MASK);
        }
        ByteCode::FmulR { dst, src } => {
            regs.e[dst] = regs.e[dst].mul(regs.a[src], *mode);
        }
        ByteCode::FdivM { dst, mem } => {
            let divisor: FloatPair = scratchpad
                .read_float_pair(mem.address(r))
                .mask_exponent_mantissa(e_mask);
            regs.e[dst] = regs.e[dst].div(divisor, *mode);
        }
        ByteCode::FsqrtR { dst } => {
            regs.e[dst] = regs.e[dst].sqrt(*mode);
        }
        ByteCode::Cbranch { creg, imm, mask, target } => {
            r[creg] = r[creg].wrapping_add(imm);
            if r[creg] & mask == 0 {
                return Some(target);
            }
        }
        ByteCode::Cfround { src, rotate } => {
            *mode = RoundingMode::from_bits(r[src].rotate_right(rotate));
        }
        ByteCode::Istore { mem, src } => {
            let addr = mem.address(r);
            scratchpad.write_u64(addr, r[src]);
        }
        ByteCode::Nop => {}
    }
    None
}
