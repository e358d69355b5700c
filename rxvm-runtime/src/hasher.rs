//! Chained program hashing
//!
//! One hash runs `program_count` programs back to back over the same VM. The
//! input seeds the scratchpad and the first program; every later program is
//! generated from a SHA-512 digest of the previous register file. The final
//! scratchpad is folded into the register file before the keyed output hash.

use rxvm_isa::Config;
use sha2::{Digest, Sha512};
use tracing::debug;

use crate::dataset::DatasetAccess;
use crate::error::Result;
use crate::generator::{generate_program, Blake3Generator};
use crate::register_file::RegisterFile;
use crate::vm::VM;

/// Length of the published digest
pub const HASH_SIZE: usize = 32;

/// Length of the finalization key
pub const KEY_SIZE: usize = 32;

const SCRATCHPAD_DIGEST_CONTEXT: &str = "rxvm 2024 scratchpad digest";

pub struct Hasher<D: DatasetAccess> {
    vm: VM<D>,
    key: [u8; KEY_SIZE],
    hashes: u64,
}

impl<D: DatasetAccess> Hasher<D> {
    pub fn new(vm: VM<D>, key: [u8; KEY_SIZE]) -> Self {
        Self { vm, key, hashes: 0 }
    }

    #[inline]
    pub fn vm(&self) -> &VM<D> {
        &self.vm
    }

    pub fn into_vm(self) -> VM<D> {
        self.vm
    }

    #[inline]
    pub fn params(&self) -> &Config {
        self.vm.params()
    }

    /// Number of completed hashes
    #[inline]
    pub fn hashes(&self) -> u64 {
        self.hashes
    }

    /// Compute the digest of `input`
    pub fn hash(&mut self, input: &[u8]) -> Result<[u8; HASH_SIZE]> {
        let mut seed = [0u8; 64];
        seed.copy_from_slice(&Sha512::digest(input));

        self.vm.reset_rounding_mode();
        self.vm
            .scratchpad_mut()
            .fill(&Blake3Generator::SCRATCHPAD, &seed, 0);

        let program_count = self.vm.params().program_count;
        let mut regs = RegisterFile::default();
        for chain in 0..program_count {
            let program = generate_program(&Blake3Generator::PROGRAM, &seed, chain as u64)?;
            regs = *self.vm.run(&program);
            seed.copy_from_slice(&Sha512::digest(regs.to_bytes()?));
        }

        let mut digest = [0u8; 64];
        let mut hasher = blake3::Hasher::new_derive_key(SCRATCHPAD_DIGEST_CONTEXT);
        hasher.update(self.vm.scratchpad().as_bytes());
        hasher.finalize_xof().fill(&mut digest);
        regs.set_a_from_digest(&digest);

        let output = blake3::keyed_hash(&self.key, &regs.to_bytes()?);
        self.hashes += 1;
        debug!(
            programs = program_count,
            mode = self.vm.rounding_mode().name(),
            "hash complete"
        );
        Ok(*output.as_bytes())
    }
}

impl<D: DatasetAccess> std::fmt::Debug for Hasher<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hasher")
            .field("vm", &self.vm)
            .field("hashes", &self.hashes)
            .finish()
    }
}
