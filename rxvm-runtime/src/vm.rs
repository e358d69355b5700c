//! Virtual Machine for RXVM
//!
//! The VM owns a scratchpad, the register file and a dataset handle. Each
//! program is compiled once and then iterated `program_iterations` times:
//!
//! ```text
//! Init → { mix-in → dispatch → dataset mix → write-back } × N → finalize
//! ```
//!
//! The iteration count never depends on data.

use rxvm_isa::{Config, IsaError, Program, FLOAT_REGISTER_COUNT, REGISTER_COUNT};
use tracing::{debug, trace};

use crate::bytecode::Bytecode;
use crate::compiler::compile;
use crate::dataset::DatasetAccess;
use crate::error::{Result, RuntimeError};
use crate::execute::execute as dispatch;
use crate::float::{verify_platform, RoundingMode};
use crate::register_file::{ProgramConfig, RegisterFile};
use crate::scratchpad::Scratchpad;

/// VM configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VMConfig {
    /// Sizes, iteration counts and branch tuning
    pub params: Config,

    /// Log every compiled instruction at trace level
    pub trace: bool,
}

impl Default for VMConfig {
    fn default() -> Self {
        Self {
            params: Config::DEFAULT,
            trace: false,
        }
    }
}

impl VMConfig {
    pub fn with_params(params: Config) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }
}

/// RXVM Virtual Machine
pub struct VM<D: DatasetAccess> {
    config: VMConfig,
    dataset: D,
    scratchpad: Scratchpad,
    regs: RegisterFile,
    /// Set by CFROUND, kept across programs
    mode: RoundingMode,
}

impl<D: DatasetAccess> VM<D> {
    /// Create a VM over `dataset`.
    ///
    /// Fails on an invalid configuration, when the scratchpad cannot be
    /// allocated or when host float arithmetic fails the self-test.
    pub fn new(dataset: D, config: VMConfig) -> Result<Self> {
        config.params.validate().map_err(IsaError::from)?;

        verify_platform().map_err(|check| RuntimeError::UnsupportedPlatform {
            reason: format!("float self-test failed: {check}"),
        })?;

        let scratchpad = Scratchpad::new(config.params.scratchpad_l3 as usize)?;

        debug!(
            scratchpad = scratchpad.len(),
            iterations = config.params.program_iterations,
            "VM created"
        );

        Ok(Self {
            config,
            dataset,
            scratchpad,
            regs: RegisterFile::default(),
            mode: RoundingMode::default(),
        })
    }

    #[inline]
    pub fn config(&self) -> &VMConfig {
        &self.config
    }

    #[inline]
    pub fn params(&self) -> &Config {
        &self.config.params
    }

    /// Register file left by the last program
    #[inline]
    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    #[inline]
    pub fn scratchpad(&self) -> &Scratchpad {
        &self.scratchpad
    }

    #[inline]
    pub fn scratchpad_mut(&mut self) -> &mut Scratchpad {
        &mut self.scratchpad
    }

    #[inline]
    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    #[inline]
    pub fn dataset_mut(&mut self) -> &mut D {
        &mut self.dataset
    }

    pub fn into_dataset(self) -> D {
        self.dataset
    }

    #[inline]
    pub fn rounding_mode(&self) -> RoundingMode {
        self.mode
    }

    pub fn reset_rounding_mode(&mut self) {
        self.mode = RoundingMode::Nearest;
    }

    /// Compile and run one program from its initial register state
    pub fn run(&mut self, program: &Program) -> &RegisterFile {
        let bytecode = compile(program, &self.config.params);
        if self.config.trace {
            trace_program(program);
        }

        let program_config = ProgramConfig::new(program, &self.config.params);
        let initial = RegisterFile::from_program(program);
        self.regs = self.execute(&bytecode, initial, &program_config);
        &self.regs
    }

    /// Run the execution loop over already compiled bytecode
    pub fn execute(
        &mut self,
        bytecode: &Bytecode,
        registers: RegisterFile,
        program_config: &ProgramConfig,
    ) -> RegisterFile {
        let params = self.config.params;
        let l3_mask64 = params.l3_mask64();
        let align_mask = params.cache_line_align_mask();
        let [rr0, rr1, rr2, rr3] = program_config.read_reg;
        let e_mask = program_config.e_mask;

        let mut regs = registers;
        let mut ma = program_config.ma;
        let mut mx = program_config.mx;
        let mut sp0 = mx;
        let mut sp1 = ma;

        for _ in 0..params.program_iterations {
            // mix-in
            let mix = regs.r[rr0] ^ regs.r[rr1];
            sp0 = (sp0 ^ mix as u32) & l3_mask64;
            sp1 = (sp1 ^ (mix >> 32) as u32) & l3_mask64;
            let int_addr = sp0 as usize;
            let float_addr = sp1 as usize;

            for (i, r) in regs.r.iter_mut().enumerate() {
                *r ^= self.scratchpad.read_u64(int_addr + 8 * i);
            }
            for i in 0..FLOAT_REGISTER_COUNT {
                regs.f[i] = self.scratchpad.read_float_pair(float_addr + 8 * i);
            }
            for i in 0..FLOAT_REGISTER_COUNT {
                regs.e[i] = self
                    .scratchpad
                    .read_float_pair(float_addr + 32 + 8 * i)
                    .mask_exponent_mantissa(e_mask);
            }

            dispatch(bytecode, &mut regs, &mut self.scratchpad, e_mask, &mut self.mode);

            // dataset mix
            mx ^= (regs.r[rr2] ^ regs.r[rr3]) as u32;
            mx &= align_mask;
            let block = self.dataset.read(program_config.dataset_offset + ma as u64);
            for (r, word) in regs.r.iter_mut().zip(block) {
                *r ^= word;
            }
            self.dataset.prefetch(program_config.dataset_offset + mx as u64);
            std::mem::swap(&mut mx, &mut ma);

            // write-back
            for i in 0..REGISTER_COUNT {
                self.scratchpad.write_u64(int_addr + 8 * i, regs.r[i]);
            }
            for i in 0..FLOAT_REGISTER_COUNT {
                self.scratchpad
                    .write_float_pair(float_addr + 16 * i, regs.f[i].xor(regs.e[i]));
            }

            sp0 = 0;
            sp1 = 0;
        }

        regs
    }
}

fn trace_program(program: &Program) {
    for (index, instr) in program.instructions.iter().enumerate() {
        trace!(index, "{}", rxvm_disassembler::format_instruction(instr));
    }
}

impl<D: DatasetAccess> std::fmt::Debug for VM<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VM")
            .field("config", &self.config)
            .field("scratchpad", &self.scratchpad.len())
            .field("mode", &self.mode)
            .finish()
    }
}
