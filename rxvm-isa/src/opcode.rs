//! # RXVM Opcode Table
//!
//! The opcode byte of an instruction does not name an operation directly.
//! Every one of the 256 byte values maps to an [`InstructionKind`] through a
//! frequency table: kinds are laid out in table order, each occupying as many
//! consecutive opcode values as its weight. The weights sum to exactly 256,
//! which is checked when the table is built at compile time.
//!
//! ## Kinds
//!
//! - Integer: IADD_RS, IADD_M, ISUB_R, ISUB_M, IMUL_R, IMUL_M, IMULH_R, IMULH_M,
//!   ISMULH_R, ISMULH_M, IMUL_RCP, INEG_R, IXOR_R, IXOR_M, IROR_R, IROL_R, ISWAP_R
//! - Float: FSWAP_R, FADD_R, FADD_M, FSUB_R, FSUB_M, FSCAL_R, FMUL_R, FDIV_M, FSQRT_R
//! - Control: CBRANCH, CFROUND
//! - Store: ISTORE
//! - NOP (weight 0, only produced by the compiler)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of distinct opcode byte values
pub const OPCODE_SPACE: usize = 256;

/// Instruction kind selected by an opcode byte
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstructionKind {
    /// IADD_RS: dst += (src << shift) + imm
    IaddRs,
    /// IADD_M: dst += mem
    IaddM,
    /// ISUB_R: dst -= src
    IsubR,
    /// ISUB_M: dst -= mem
    IsubM,
    /// IMUL_R: dst *= src
    ImulR,
    /// IMUL_M: dst *= mem
    ImulM,
    /// IMULH_R: dst = (dst * src) >> 64 (unsigned)
    ImulhR,
    /// IMULH_M: dst = (dst * mem) >> 64 (unsigned)
    ImulhM,
    /// ISMULH_R: dst = (dst * src) >> 64 (signed)
    IsmulhR,
    /// ISMULH_M: dst = (dst * mem) >> 64 (signed)
    IsmulhM,
    /// IMUL_RCP: dst *= 2^x / imm32
    ImulRcp,
    /// INEG_R: dst = -dst
    InegR,
    /// IXOR_R: dst ^= src
    IxorR,
    /// IXOR_M: dst ^= mem
    IxorM,
    /// IROR_R: dst = dst >>> src
    IrorR,
    /// IROL_R: dst = dst <<< src
    IrolR,
    /// ISWAP_R: swap dst and src
    IswapR,
    /// FSWAP_R: swap the lanes of a float pair
    FswapR,
    /// FADD_R: f += a
    FaddR,
    /// FADD_M: f += mem
    FaddM,
    /// FSUB_R: f -= a
    FsubR,
    /// FSUB_M: f -= mem
    FsubM,
    /// FSCAL_R: f = scale(f)
    FscalR,
    /// FMUL_R: e *= a
    FmulR,
    /// FDIV_M: e /= mem
    FdivM,
    /// FSQRT_R: e = sqrt(e)
    FsqrtR,
    /// CBRANCH: conditional backward branch
    Cbranch,
    /// CFROUND: set rounding mode
    Cfround,
    /// ISTORE: mem = src
    Istore,
    /// NOP
    Nop,
}

/// Opcode weights in table order
pub const FREQUENCIES: [(InstructionKind, u16); 30] = [
    (InstructionKind::IaddRs, 16),
    (InstructionKind::IaddM, 7),
    (InstructionKind::IsubR, 16),
    (InstructionKind::IsubM, 7),
    (InstructionKind::ImulR, 16),
    (InstructionKind::ImulM, 4),
    (InstructionKind::ImulhR, 4),
    (InstructionKind::ImulhM, 1),
    (InstructionKind::IsmulhR, 4),
    (InstructionKind::IsmulhM, 1),
    (InstructionKind::ImulRcp, 8),
    (InstructionKind::InegR, 2),
    (InstructionKind::IxorR, 15),
    (InstructionKind::IxorM, 5),
    (InstructionKind::IrorR, 8),
    (InstructionKind::IrolR, 2),
    (InstructionKind::IswapR, 4),
    (InstructionKind::FswapR, 4),
    (InstructionKind::FaddR, 16),
    (InstructionKind::FaddM, 5),
    (InstructionKind::FsubR, 16),
    (InstructionKind::FsubM, 5),
    (InstructionKind::FscalR, 6),
    (InstructionKind::FmulR, 32),
    (InstructionKind::FdivM, 4),
    (InstructionKind::FsqrtR, 6),
    (InstructionKind::Cbranch, 25),
    (InstructionKind::Cfround, 1),
    (InstructionKind::Istore, 16),
    (InstructionKind::Nop, 0),
];

const fn build_opcode_table() -> [InstructionKind; OPCODE_SPACE] {
    let mut table = [InstructionKind::Nop; OPCODE_SPACE];
    let mut opcode = 0;
    let mut entry = 0;
    while entry < FREQUENCIES.len() {
        let (kind, weight) = FREQUENCIES[entry];
        let mut n = 0;
        while n < weight {
            table[opcode] = kind;
            opcode += 1;
            n += 1;
        }
        entry += 1;
    }
    assert!(opcode == OPCODE_SPACE, "opcode weights must sum to 256");
    table
}

/// Opcode byte to instruction kind
pub static OPCODE_TABLE: [InstructionKind; OPCODE_SPACE] = build_opcode_table();

impl InstructionKind {
    /// Decode an opcode byte
    #[inline]
    pub fn from_opcode(opcode: u8) -> Self {
        OPCODE_TABLE[opcode as usize]
    }

    /// Number of opcode values mapped to this kind
    pub fn weight(self) -> u16 {
        FREQUENCIES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map_or(0, |(_, weight)| *weight)
    }

    /// Lowest opcode byte mapped to this kind, `None` for zero-weight kinds
    pub fn first_opcode(self) -> Option<u8> {
        let mut start = 0usize;
        for (kind, weight) in FREQUENCIES {
            if kind == self {
                return if weight == 0 { None } else { u8::try_from(start).ok() };
            }
            start += weight as usize;
        }
        None
    }

    /// Assembly mnemonic
    pub fn name(self) -> &'static str {
        match self {
            Self::IaddRs => "IADD_RS",
            Self::IaddM => "IADD_M",
            Self::IsubR => "ISUB_R",
            Self::IsubM => "ISUB_M",
            Self::ImulR => "IMUL_R",
            Self::ImulM => "IMUL_M",
            Self::ImulhR => "IMULH_R",
            Self::ImulhM => "IMULH_M",
            Self::IsmulhR => "ISMULH_R",
            Self::IsmulhM => "ISMULH_M",
            Self::ImulRcp => "IMUL_RCP",
            Self::InegR => "INEG_R",
            Self::IxorR => "IXOR_R",
            Self::IxorM => "IXOR_M",
            Self::IrorR => "IROR_R",
            Self::IrolR => "IROL_R",
            Self::IswapR => "ISWAP_R",
            Self::FswapR => "FSWAP_R",
            Self::FaddR => "FADD_R",
            Self::FaddM => "FADD_M",
            Self::FsubR => "FSUB_R",
            Self::FsubM => "FSUB_M",
            Self::FscalR => "FSCAL_R",
            Self::FmulR => "FMUL_R",
            Self::FdivM => "FDIV_M",
            Self::FsqrtR => "FSQRT_R",
            Self::Cbranch => "CBRANCH",
            Self::Cfround => "CFROUND",
            Self::Istore => "ISTORE",
            Self::Nop => "NOP",
        }
    }

    /// Check if this kind reads the scratchpad
    pub fn reads_memory(self) -> bool {
        matches!(
            self,
            Self::IaddM
                | Self::IsubM
                | Self::ImulM
                | Self::ImulhM
                | Self::IsmulhM
                | Self::IxorM
                | Self::FaddM
                | Self::FsubM
                | Self::FdivM
        )
    }

    /// Check if this kind operates on the float banks
    pub fn is_float(self) -> bool {
        matches!(
            self,
            Self::FswapR
                | Self::FaddR
                | Self::FaddM
                | Self::FsubR
                | Self::FsubM
                | Self::FscalR
                | Self::FmulR
                | Self::FdivM
                | Self::FsqrtR
        )
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
