//! Interactive confirmation gate
//!
//! State-changing actions ask before they run. Only a literal `y` accepts;
//! anything else, including an empty line or end of input, declines.

use std::io::{self, BufRead, Write};

/// A yes/no question answered before a guarded action runs
pub trait Confirm {
    /// Ask `prompt`; `Ok(true)` only when the answer accepts
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
}

/// Whether a raw answer line accepts the prompt
pub fn is_acceptance(answer: &str) -> bool {
    answer.trim() == "y"
}

/// Line-based prompt over any reader/writer pair
pub struct PromptGate<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptGate<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl PromptGate<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on the controlling terminal. The question goes to stderr so
    /// `--json` output on stdout stays machine-readable.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Confirm for PromptGate<R, W> {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        write!(self.output, "{} [y/N]? ", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        if read == 0 {
            // End of input: nobody is there to say yes
            writeln!(self.output)?;
            return Ok(false);
        }
        Ok(is_acceptance(&line))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ask(input: &str) -> (bool, String) {
        let mut output = Vec::new();
        let accepted = {
            let mut gate = PromptGate::new(Cursor::new(input.as_bytes().to_vec()), &mut output);
            gate.confirm("sync music").unwrap()
        };
        (accepted, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_only_lowercase_y_accepts() {
        assert!(ask("y\n").0);
        assert!(ask("  y  \n").0);
        assert!(ask("y").0);

        for declined in ["\n", "Y\n", "yes\n", "n\n", "N\n", "yy\n", "q\n"] {
            assert!(!ask(declined).0, "input {:?} should decline", declined);
        }
    }

    #[test]
    fn test_end_of_input_declines() {
        let (accepted, _) = ask("");
        assert!(!accepted);
    }

    #[test]
    fn test_prompt_suffix() {
        let (_, shown) = ask("n\n");
        assert_eq!(shown, "sync music [y/N]? ");
    }

    #[test]
    fn test_reads_a_single_line() {
        let mut output = Vec::new();
        let mut gate = PromptGate::new(Cursor::new(b"n\ny\n".to_vec()), &mut output);
        assert!(!gate.confirm("first").unwrap());
        assert!(gate.confirm("second").unwrap());
    }
}
