use std::io::{BufRead, Write};

use anyhow::bail;

/// Asks the operator before any state-changing command runs.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> anyhow::Result<bool>;

    /// Abort unless the operator agrees.
    fn require(&mut self, prompt: &str) -> anyhow::Result<()> {
        if !self.confirm(prompt)? {
            bail!("transaction cancelled");
        }
        Ok(())
    }
}

/// `--yes`: every prompt is accepted.
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Prompt on `output`, read one line from `input`. Only `y` and `yes` accept.
pub struct PromptConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl PromptConfirm<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> Confirm for PromptConfirm<R, W> {
    fn confirm(&mut self, prompt: &str) -> anyhow::Result<bool> {
        write!(self.output, "{prompt} (y/n) ")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        let answer = line.trim().to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}
