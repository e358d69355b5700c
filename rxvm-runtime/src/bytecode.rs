//! Compiled program representation
//!
//! Each instruction compiles to one [`ByteCode`] entry whose operands are
//! already resolved: register operands are indices into the register file,
//! immediates are pre-extended, scratchpad operands carry their tier mask and
//! branches carry their target and condition window.

use rxvm_isa::PROGRAM_SIZE;

/// Integer source operand
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntSource {
    /// Integer register index
    Reg(usize),
    /// Embedded immediate
    Imm(u64),
}

impl IntSource {
    #[inline]
    pub fn value(self, r: &[u64]) -> u64 {
        match self {
            IntSource::Reg(index) => r[index],
            IntSource::Imm(imm) => imm,
        }
    }
}

/// Scratchpad operand: `(base + displacement) & mask`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MemOperand {
    /// Base register, `None` for an absolute address
    pub base: Option<usize>,
    /// Sign-extended displacement
    pub displacement: u64,
    /// Tier mask (8-byte aligned)
    pub mask: u32,
}

impl MemOperand {
    #[inline]
    pub fn address(&self, r: &[u64]) -> usize {
        let base = self.base.map_or(0, |index| r[index]);
        (base.wrapping_add(self.displacement) as u32 & self.mask) as usize
    }
}

/// Float slot addressed by FSWAP_R
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FloatSlot {
    F(usize),
    E(usize),
}

/// One compiled instruction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ByteCode {
    IaddRs { dst: usize, src: usize, shift: u32, imm: u64 },
    IaddM { dst: usize, mem: MemOperand },
    IsubR { dst: usize, src: IntSource },
    IsubM { dst: usize, mem: MemOperand },
    /// Also carries the reciprocal constant of IMUL_RCP
    ImulR { dst: usize, src: IntSource },
    ImulM { dst: usize, mem: MemOperand },
    ImulhR { dst: usize, src: usize },
    ImulhM { dst: usize, mem: MemOperand },
    IsmulhR { dst: usize, src: usize },
    IsmulhM { dst: usize, mem: MemOperand },
    InegR { dst: usize },
    IxorR { dst: usize, src: IntSource },
    IxorM { dst: usize, mem: MemOperand },
    IrorR { dst: usize, src: IntSource },
    IrolR { dst: usize, src: IntSource },
    IswapR { dst: usize, src: usize },
    FswapR { dst: FloatSlot },
    FaddR { dst: usize, src: usize },
    FaddM { dst: usize, mem: MemOperand },
    FsubR { dst: usize, src: usize },
    FsubM { dst: usize, mem: MemOperand },
    FscalR { dst: usize },
    FmulR { dst: usize, src: usize },
    FdivM { dst: usize, mem: MemOperand },
    FsqrtR { dst: usize },
    /// `r[creg] += imm`; jump to `target + 1` when `r[creg] & mask == 0`.
    /// `target` is -1 when the condition register was never written.
    Cbranch { creg: usize, imm: u64, mask: u64, target: i16 },
    Cfround { src: usize, rotate: u32 },
    Istore { mem: MemOperand, src: usize },
    Nop,
}

impl ByteCode {
    /// Integer register written by this entry, if any
    pub fn integer_destination(&self) -> Option<usize> {
        match *self {
            ByteCode::IaddRs { dst, .. }
            | ByteCode::IaddM { dst, .. }
            | ByteCode::IsubR { dst, .. }
            | ByteCode::IsubM { dst, .. }
            | ByteCode::ImulR { dst, .. }
            | ByteCode::ImulM { dst, .. }
            | ByteCode::ImulhR { dst, .. }
            | ByteCode::ImulhM { dst, .. }
            | ByteCode::IsmulhR { dst, .. }
            | ByteCode::IsmulhM { dst, .. }
            | ByteCode::InegR { dst }
            | ByteCode::IxorR { dst, .. }
            | ByteCode::IxorM { dst, .. }
            | ByteCode::IrorR { dst, .. }
            | ByteCode::IrolR { dst, .. }
            | ByteCode::IswapR { dst, .. } => Some(dst),
            ByteCode::Cbranch { creg, .. } => Some(creg),
            _ => None,
        }
    }

    /// Scratchpad operand, if any
    pub fn memory_operand(&self) -> Option<MemOperand> {
        match *self {
            ByteCode::IaddM { mem, .. }
            | ByteCode::IsubM { mem, .. }
            | ByteCode::ImulM { mem, .. }
            | ByteCode::ImulhM { mem, .. }
            | ByteCode::IsmulhM { mem, .. }
            | ByteCode::IxorM { mem, .. }
            | ByteCode::FaddM { mem, .. }
            | ByteCode::FsubM { mem, .. }
            | ByteCode::FdivM { mem, .. }
            | ByteCode::Istore { mem, .. } => Some(mem),
            _ => None,
        }
    }
}

/// Compiled program: one entry per instruction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bytecode {
    entries: Vec<ByteCode>,
}

impl Bytecode {
    pub(crate) fn from_entries(entries: Vec<ByteCode>) -> Self {
        debug_assert_eq!(entries.len(), PROGRAM_SIZE);
        Self { entries }
    }

    #[inline]
    pub fn entries(&self) -> &[ByteCode] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&ByteCode> {
        self.entries.get(index)
    }

    /// Iterate over `(index, target)` of every branch entry
    pub fn branches(&self) -> impl Iterator<Item = (usize, i16)> + '_ {
        self.entries.iter().enumerate().filter_map(|(index, entry)| match entry {
            ByteCode::Cbranch { target, .. } => Some((index, *target)),
            _ => None,
        })
    }

    /// Number of entries compiled to NOP
    pub fn nop_count(&self) -> usize {
        self.entries.iter().filter(|entry| **entry == ByteCode::Nop).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_source_value() {
        let r = [10, 20, 30, 40, 50, 60, 70, 80];
        assert_eq!(IntSource::Reg(2).value(&r), 30);
        assert_eq!(IntSource::Imm(99).value(&r), 99);
    }

    #[test]
    fn test_mem_operand_masking() {
        let mut r = [0u64; 8];
        r[1] = 0xFFFF_FFFF_0000_1234;
        let mem = MemOperand {
            base: Some(1),
            displacement: 0xFFFF_FFFF_FFFF_FFFC, // -4
            mask: 0x3FF8,
        };
        assert_eq!(mem.address(&r), (0x1230 & 0x3FF8) as usize);

        let absolute = MemOperand {
            base: None,
            displacement: 0xFFFF_FFFF_FFFF_FFF8,
            mask: 0x1F_FFF8,
        };
        assert_eq!(absolute.address(&r), 0x1F_FFF8);
    }

    #[test]
    fn test_integer_destination() {
        assert_eq!(ByteCode::InegR { dst: 3 }.integer_destination(), Some(3));
        assert_eq!(ByteCode::FsqrtR { dst: 1 }.integer_destination(), None);
        assert_eq!(ByteCode::Nop.integer_destination(), None);
    }

    #[test]
    fn test_branches_iterator() {
        let mut entries = vec![ByteCode::Nop; PROGRAM_SIZE];
        entries[10] = ByteCode::Cbranch {
            creg: 0,
            imm: 1 << 8,
            mask: 0xFF << 8,
            target: 4,
        };
        let bytecode = Bytecode::from_entries(entries);
        let branches: Vec<_> = bytecode.branches().collect();
        assert_eq!(branches, vec![(10, 4)]);
        assert_eq!(bytecode.nop_count(), PROGRAM_SIZE - 1);
        assert_eq!(bytecode.len(), PROGRAM_SIZE);
    }
}
