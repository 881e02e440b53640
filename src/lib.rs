//! A deterministic, cycle-agnostic interpreter core for the Intel 8086
//! (iAPX 86) real-mode instruction set: fetch/decode/execute, segmented
//! effective-address computation, the six-flag ALU engine, and the
//! 256-entry opcode dispatch table with its group sub-dispatches.
//!
//! Out of scope, by design: I/O ports, the interrupt controller, BIOS,
//! the x87 co-processor, peripheral timing, disassembly, a debugger UI
//! and a CLI. Those are a host's job; this crate exposes [`memory::Bus`]
//! (the flat, ABI-fixed register/flag/RAM buffer) and [`cpu::Cpu`] (the
//! execution loop over it) for a host to drive.

pub mod cpu;
pub mod memory;

pub use cpu::Cpu;
pub use memory::Bus;
