//! # LC-3 Simulator
//!
//! The interactive half of the toolchain: a virtual machine core and a
//! debug controller that runs it on its own execution context so a
//! front-end (this crate's TUI, or any other presentation) can step,
//! breakpoint, and inspect a running program without blocking its own
//! event loop.
//!
//! ## Pipeline
//!
//! 1. **vm** — the fetch-decode-execute loop, registers, memory, MMIO.
//! 2. **debugger** — owns a [`vm::Vm`] on a background thread and exposes
//!    `load`/`run`/`step`/`stop`/`reset`/breakpoint/`feed_input` commands
//!    plus a stream of events the front-end polls or blocks on.
//!
//! Instruction bit layout is shared with the assembler via
//! [`lc3_assembler::codec`], so a word this crate executes and a word the
//! assembler emitted agree on every field by construction.

pub mod debugger;
pub mod vm;
