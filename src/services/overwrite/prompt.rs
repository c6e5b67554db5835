//! Terminal [`OverwriteChooser`].

use std::io::{BufRead, Write};

use super::{OverwriteChooser, OverwriteMode};

const PROMPT_CHOICES: &str =
    "[r]eplace, [s]kip, rename [n]ew, rename [e]xisting, [c]ancel (uppercase: apply to all)";

/// Asks on `output` and reads answers from `input`, one line per question.
///
/// An uppercase answer is remembered and returned for every later file
/// without asking again. End of input cancels.
pub struct PromptChooser<R, W> {
    input: R,
    output: W,
    remembered: Option<OverwriteMode>,
}

impl<R: BufRead, W: Write> PromptChooser<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            remembered: None,
        }
    }

    pub fn remembered(&self) -> Option<OverwriteMode> {
        self.remembered
    }

    fn ask(&mut self, file_name: &str) -> std::io::Result<Option<(OverwriteMode, bool)>> {
        loop {
            write!(
                self.output,
                "A file named '{file_name}' already exists. {PROMPT_CHOICES}: "
            )?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            if let Some(answer) = parse_answer(line.trim()) {
                return Ok(Some(answer));
            }
            writeln!(self.output, "Unrecognized answer '{}'.", line.trim())?;
        }
    }
}

fn parse_answer(answer: &str) -> Option<(OverwriteMode, bool)> {
    let mut chars = answer.chars();
    let first = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let mode = match first.to_ascii_lowercase() {
        'r' => OverwriteMode::Replace,
        's' => OverwriteMode::Skip,
        'n' => OverwriteMode::RenameNew,
        'e' => OverwriteMode::RenameExisting,
        'c' => OverwriteMode::Cancel,
        _ => return None,
    };
    Some((mode, first.is_ascii_uppercase()))
}

impl<R: BufRead, W: Write> OverwriteChooser for PromptChooser<R, W> {
    fn choose(&mut self, file_name: &str) -> OverwriteMode {
        if let Some(mode) = self.remembered {
            return mode;
        }
        match self.ask(file_name) {
            Ok(Some((mode, apply_to_all))) => {
                if apply_to_all {
                    self.remembered = Some(mode);
                }
                mode
            }
            Ok(None) => {
                log::warn!("No answer for '{file_name}', cancelling");
                OverwriteMode::Cancel
            }
            Err(e) => {
                log::warn!("Overwrite prompt failed: {e}");
                OverwriteMode::Cancel
            }
        }
    }
}
