// Assembling
mod asm;
pub use asm::assemble;
mod isa;

// Running
mod emu;
pub use emu::{Emulator, ROM_CAPACITY};
mod font;
mod rng;
mod state;
pub use state::{FrameBuffer, Snapshot, FRAME_HEIGHT, FRAME_WIDTH, MEM_SIZE};

// Driver support
mod output;
pub use output::render_frame;

mod error;
pub use error::{AsmError, AsmErrorKind, ExecError};
