use thiserror::Error;

/// Failures while copying a program image into memory. Reported before any
/// machine state changes; the machine stays in its prior reset state.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to read rom: {0}")]
    Io(#[from] std::io::Error),

    #[error("rom is too large ({size} bytes), max size is {max} bytes")]
    TooLarge { size: usize, max: usize },
}

/// Fatal execution faults. Unknown opcodes are not errors; they are logged
/// and skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecError {
    #[error("call stack overflow at {pc:#06X}")]
    StackOverflow { pc: u16 },

    #[error("return with empty call stack at {pc:#06X}")]
    StackUnderflow { pc: u16 },

    #[error("memory access out of bounds at address {addr:#06X}")]
    OutOfBounds { addr: u16 },
}
