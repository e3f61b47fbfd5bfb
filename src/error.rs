use std::fmt;

/// Assembly failure, tagged with the 1-based source line it came from.
///
/// Operand-level failures are raised as an [`AsmErrorKind`] and wrapped with
/// the line number and stripped line text by the per-line driver, so callers
/// always see where in the source things went wrong.
#[derive(Debug, PartialEq, Eq)]
pub struct AsmError {
    pub line: usize,
    pub text: String,
    pub kind: AsmErrorKind,
}

impl AsmError {
    pub(crate) fn at(line: usize, text: &str, kind: AsmErrorKind) -> Self {
        AsmError {
            line,
            text: text.to_string(),
            kind,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AsmErrorKind {
    /// Line failed to parse as any recognized category.
    Syntax(String),
    /// First token is not a mnemonic from the instruction table.
    UnknownInstruction(String),
    /// Operand list length does not match the instruction's arity.
    OperandCount { expected: usize, found: usize },
    /// An operand failed its grammar (register, address, or literal form).
    OperandFormat(String),
    /// A well-formed decimal literal too large for its target field.
    LiteralOverflow { value: u32, limit: u16 },
    DuplicateLabel(String),
    UnresolvedLabel(String),
}

impl fmt::Display for AsmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(what) => write!(f, "syntax error: {what}"),
            Self::UnknownInstruction(name) => write!(f, "unknown instruction `{name}`"),
            Self::OperandCount { expected, found } => {
                write!(f, "expected {expected} operand(s), found {found}")
            }
            Self::OperandFormat(what) => write!(f, "malformed operand: {what}"),
            Self::LiteralOverflow { value, limit } => {
                write!(f, "literal {value} does not fit field (max {limit})")
            }
            Self::DuplicateLabel(name) => write!(f, "duplicate label `{name}`"),
            Self::UnresolvedLabel(name) => write!(f, "unresolved label `{name}`"),
        }
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} in `{}`", self.line, self.kind, self.text)
    }
}

impl std::error::Error for AsmError {}

/// Fatal emulation failure. Execution must not continue past any of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    /// Fetched word matched no entry in the instruction table.
    UnknownOpcode { opcode: u16, pc: u16 },
    /// Machine-language call (0NNN); assembles but cannot be executed.
    UnsupportedOpcode { opcode: u16, pc: u16 },
    RomTooLarge { size: usize },
    /// A call would push a return address past the top of the stack window.
    StackOverflow { pc: u16 },
    /// `step` was invoked after the program finished; reset first.
    AlreadyFinished,
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOpcode { opcode, pc } => {
                write!(f, "unknown opcode {opcode:#06X} at {pc:#05X}")
            }
            Self::UnsupportedOpcode { opcode, pc } => {
                write!(f, "unsupported machine call {opcode:#06X} at {pc:#05X}")
            }
            Self::RomTooLarge { size } => {
                write!(f, "ROM is {size} bytes; at most {} fit", crate::ROM_CAPACITY)
            }
            Self::StackOverflow { pc } => write!(f, "call stack overflow at {pc:#05X}"),
            Self::AlreadyFinished => {
                write!(f, "program has finished; reset before stepping again")
            }
        }
    }
}

impl std::error::Error for ExecError {}
