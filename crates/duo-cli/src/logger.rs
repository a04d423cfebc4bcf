use colored::{Color, Colorize};
use duo_types::ProcessName;
use std::io::{self, Stdout, Write};

pub struct Logger<W: Write = Stdout> {
    output: W,
}

impl<W: Write> Logger<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    fn process_color(process: ProcessName) -> Color {
        match process {
            ProcessName::Backend => Color::Blue,
            ProcessName::Frontend => Color::Cyan,
        }
    }

    fn write(&mut self, prefix: &str, message: &str) {
        for line in message.lines() {
            let _ = writeln!(self.output, "{prefix} {line}");
        }
    }

    /// Raw output of a managed process.
    pub fn log(&mut self, process: ProcessName, message: &str) {
        let prefix = format!("[{process}]")
            .color(Self::process_color(process))
            .to_string();
        self.write(&prefix, message);
    }

    /// A recognised milestone in a process's output.
    pub fn notice(&mut self, process: ProcessName, message: &str) {
        let prefix = format!("[{process}]")
            .color(Self::process_color(process))
            .bold()
            .to_string();
        let message = message.color(Color::Green).to_string();
        self.write(&prefix, &message);
    }

    pub fn system(&mut self, message: &str) {
        let prefix = "[duo]".color(Color::Magenta).to_string();
        self.write(&prefix, message);
    }

    pub fn error(&mut self, message: &str) {
        let prefix = "[duo]".color(Color::Red).bold().to_string();
        let message = message.color(Color::Red).to_string();
        self.write(&prefix, &message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(io::stdout())
    }
}
