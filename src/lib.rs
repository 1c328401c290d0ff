// Machine
mod mem;
pub use mem::{AddressSpace, KBDR, KBSR, MEMORY_MAX};
mod state;
pub use state::{Flag, Register, RegisterFile, PC_START};
mod ops;
pub use ops::{sign_extend, Instr, Opcode};

// Running
mod runtime;
pub use runtime::{Machine, RunState, TrapVector, INTERRUPT_CHECK_INTERVAL};
mod error;
pub use error::Fault;

// Loading
mod loader;
pub use loader::Image;

// Devices
pub mod device;
pub mod term;

// Process plumbing
pub mod env;
pub mod output;
