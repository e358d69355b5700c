//! Register definitions for RXVM

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of integer registers
pub const REGISTER_COUNT: usize = 8;

/// Number of register pairs in each float bank
pub const FLOAT_REGISTER_COUNT: usize = 4;

/// Integer register (r0-r7)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Register {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5, // displacement register for IADD_RS
    R6 = 6,
    R7 = 7,
}

impl Register {
    pub const ALL: [Register; REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
    ];

    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Register selected by a raw operand byte (reduced modulo 8)
    #[inline]
    pub fn from_operand(byte: u8) -> Self {
        Self::ALL[byte as usize % REGISTER_COUNT]
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::R0 => "r0",
            Self::R1 => "r1",
            Self::R2 => "r2",
            Self::R3 => "r3",
            Self::R4 => "r4",
            Self::R5 => "r5",
            Self::R6 => "r6",
            Self::R7 => "r7",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Register {
    type Error = crate::IsaError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(value as usize).ok_or(crate::IsaError::InvalidRegister(value))
    }
}

/// Float register bank
///
/// `F` and `E` are working banks; `A` holds the per-program additive
/// constants and is read-only while a program runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatBank {
    F,
    E,
    A,
}

impl FloatBank {
    pub fn prefix(self) -> char {
        match self {
            Self::F => 'f',
            Self::E => 'e',
            Self::A => 'a',
        }
    }
}
