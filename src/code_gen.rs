use crate::chunk::{Chunk, Command, Instruction, Segment};

/// Append-only emitter. Segment and index legality is the caller's concern.
pub struct Generator {
    chunk: Chunk,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    pub fn new() -> Self {
        Self {
            chunk: Chunk::new(),
        }
    }

    fn emit(&mut self, code: Instruction, line: u32) {
        self.chunk.append(code, line)
    }

    pub fn emit_push(&mut self, segment: Segment, index: u16, line: u32) {
        self.emit(Instruction::Push(segment, index), line)
    }

    pub fn emit_pop(&mut self, segment: Segment, index: u16, line: u32) {
        self.emit(Instruction::Pop(segment, index), line)
    }

    pub fn emit_arithmetic(&mut self, command: Command, line: u32) {
        self.emit(Instruction::Arithmetic(command), line)
    }

    pub fn emit_label(&mut self, label: &str, line: u32) {
        self.emit(Instruction::Label(label.to_string()), line)
    }

    pub fn emit_goto(&mut self, label: &str, line: u32) {
        self.emit(Instruction::Goto(label.to_string()), line)
    }

    pub fn emit_if(&mut self, label: &str, line: u32) {
        self.emit(Instruction::IfGoto(label.to_string()), line)
    }

    pub fn emit_function(&mut self, name: &str, n_locals: u16, line: u32) {
        self.emit(
            Instruction::Function {
                name: name.to_string(),
                n_locals,
            },
            line,
        )
    }

    pub fn emit_call(&mut self, name: &str, n_args: u16, line: u32) {
        self.emit(
            Instruction::Call {
                name: name.to_string(),
                n_args,
            },
            line,
        )
    }

    pub fn emit_return(&mut self, line: u32) {
        self.emit(Instruction::Return, line)
    }

    pub fn end(self) -> Chunk {
        self.chunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_emission_keeps_order() {
        let mut generator = Generator::new();
        generator.emit_function("Main.main", 1, 1);
        generator.emit_label("WHILE_EXP0", 2);
        generator.emit_push(Segment::Local, 0, 2);
        generator.emit_arithmetic(Command::Not, 2);
        generator.emit_if("WHILE_END0", 2);
        generator.emit_goto("WHILE_EXP0", 3);
        generator.emit_label("WHILE_END0", 3);
        generator.emit_call("Output.println", 0, 4);
        generator.emit_pop(Segment::Temp, 0, 4);
        generator.emit_push(Segment::Constant, 0, 5);
        generator.emit_return(5);
        let chunk = generator.end();
        assert_eq!(chunk.len(), 11);
        assert_eq!(
            chunk.to_string(),
            "function Main.main 1\n\
             label WHILE_EXP0\n\
             push local 0\n\
             not\n\
             if-goto WHILE_END0\n\
             goto WHILE_EXP0\n\
             label WHILE_END0\n\
             call Output.println 0\n\
             pop temp 0\n\
             push constant 0\n\
             return\n"
        );
        assert_eq!(chunk.get_line(7), Some(4));
    }

    #[test]
    fn empty_generator_yields_empty_chunk() {
        let chunk = Generator::new().end();
        assert!(chunk.is_empty());
        assert_eq!(chunk.to_string(), "");
    }
}
