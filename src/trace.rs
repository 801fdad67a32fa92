use crate::lexer::Token;

/// Parenthesized record of recognized productions and consumed tokens.
#[derive(Debug, Default)]
pub struct Trace {
    out: String,
    depth: usize,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, production: &str) {
        self.indent();
        self.out.push('(');
        self.out.push_str(production);
        self.out.push('\n');
        self.depth += 1;
    }

    pub fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.out.push_str(")\n");
    }

    pub fn token(&mut self, token: &Token) {
        self.indent();
        self.out.push_str(&format!(
            "{} '{}'\n",
            token.tok_type.category(),
            token.string_value()
        ));
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }

    pub fn finish(self) -> String {
        self.out
    }
}
