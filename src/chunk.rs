use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        };
        f.write_str(name)
    }
}

/// Arithmetic and logical commands of the stack machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Add => "add",
            Command::Sub => "sub",
            Command::Neg => "neg",
            Command::Eq => "eq",
            Command::Gt => "gt",
            Command::Lt => "lt",
            Command::And => "and",
            Command::Or => "or",
            Command::Not => "not",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Push(Segment, u16),
    Pop(Segment, u16),
    Arithmetic(Command),
    Label(String),
    Goto(String),
    IfGoto(String),
    Function { name: String, n_locals: u16 },
    Call { name: String, n_args: u16 },
    Return,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Push(segment, index) => write!(f, "push {} {}", segment, index),
            Instruction::Pop(segment, index) => write!(f, "pop {} {}", segment, index),
            Instruction::Arithmetic(command) => write!(f, "{}", command),
            Instruction::Label(label) => write!(f, "label {}", label),
            Instruction::Goto(label) => write!(f, "goto {}", label),
            Instruction::IfGoto(label) => write!(f, "if-goto {}", label),
            Instruction::Function { name, n_locals } => write!(f, "function {} {}", name, n_locals),
            Instruction::Call { name, n_args } => write!(f, "call {} {}", name, n_args),
            Instruction::Return => write!(f, "return"),
        }
    }
}

/// Ordered instruction stream with the source line of every instruction.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Chunk {
    code: Vec<Instruction>,
    lines: Vec<u32>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_code(&self, offset: usize) -> Option<&Instruction> {
        self.code.get(offset)
    }

    pub fn get_line(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    pub fn append(&mut self, code: Instruction, line: u32) {
        self.code.push(code);
        self.lines.push(line);
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.code.iter()
    }

    /// Listing with offsets and source lines, a `|` marking a repeated line.
    pub fn disassemble(&self, name: &str) -> String {
        let mut out = format!("== {} ==\n", name);
        for (offset, code) in self.code.iter().enumerate() {
            out.push_str(&format!("{:>4} ", offset));
            if offset > 0 && self.lines[offset] == self.lines[offset - 1] {
                out.push_str("   | ");
            } else {
                out.push_str(&format!("{:>4} ", self.lines[offset]));
            }
            out.push_str(&code.to_string());
            out.push('\n');
        }
        out
    }
}

/// One instruction per line, each terminated by a newline.
impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for code in &self.code {
            writeln!(f, "{}", code)?;
        }
        Ok(())
    }
}
