//! The interactive menu loop.
//!
//! Input and output are injected so the loop runs the same against a
//! terminal or an in-memory script.

use anyhow::Result;
use std::io::{BufRead, Write};
use tracing::debug;

use crate::batch::{backup_directory, backup_file};
use crate::config::Settings;

const HELP: &str = "\
Welcome to PDF backupper!

This script takes a single backup file or a folder with with such files
and converts them into a single PDF ready for printing.

Backup files should be formatted like this:

filename=\"Service name.txt\"
code-1
code-2
code-3
...

Every page of the output PDF will represent backups codes of a single service.
On the top there is a service name taken from the file being backed up.
Every code gets a place which you can mark off with a pen, like this:

[ ] code-1
[ ] code-2
[ ] code-3
...
";

const OPTIONS: &str = "\
[1] back up a single file
[2] back up a folder
[q] quit
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Menu,
    Terminated,
}

pub struct Shell<'a, R, W> {
    input: R,
    output: W,
    settings: &'a Settings,
    state: State,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(input: R, output: W, settings: &'a Settings) -> Self {
        Self {
            input,
            output,
            settings,
            state: State::Menu,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Print the help text, then serve the menu until the user quits or
    /// the input runs dry
    pub fn run(&mut self) -> Result<()> {
        writeln!(self.output, "{HELP}")?;
        while self.state() == State::Menu {
            self.step()?;
        }
        Ok(())
    }

    /// Show the menu once and handle a single choice
    pub fn step(&mut self) -> Result<()> {
        write!(self.output, "{OPTIONS}")?;
        let Some(choice) = self.read_line()? else {
            return self.terminate();
        };

        match choice.as_str() {
            "1" => {
                let Some((input, output)) = self.read_paths("Enter the input filepath > ")? else {
                    return self.terminate();
                };
                backup_file(&input, &output, self.settings, &mut self.output)?;
            }
            "2" => {
                let Some((input, output)) =
                    self.read_paths("Enter the input directory path > ")?
                else {
                    return self.terminate();
                };
                backup_directory(&input, &output, self.settings, &mut self.output)?;
            }
            "q" => return self.terminate(),
            other => debug!("Ignoring menu choice {:?}", other),
        }
        Ok(())
    }

    fn terminate(&mut self) -> Result<()> {
        self.state = State::Terminated;
        self.output.flush()?;
        Ok(())
    }

    fn read_paths(&mut self, input_prompt: &str) -> Result<Option<(String, String)>> {
        let Some(input) = self.prompt(input_prompt)? else {
            return Ok(None);
        };
        let Some(output) = self.prompt("Enter the output filepath > ")? else {
            return Ok(None);
        };
        Ok(Some((input, output)))
    }

    fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        write!(self.output, "{message}")?;
        self.read_line()
    }

    /// Next line without its terminator; `None` at end of input
    fn read_line(&mut self) -> Result<Option<String>> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}
