//! Remote address candidate validation.
//!
//! Turns user input (an option-supplied list, or interactive prompting)
//! into a working set of validated remote targets. Candidates pass a
//! liveness probe; survivors are deduplicated and sorted. The empty
//! string is never a valid candidate.

use crate::exec::{Cmd, CommandRunner};
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::time::Duration;
use tracing::warn;

/// Liveness probe against one candidate address.
pub trait Probe {
    fn probe(&self, addr: &str) -> bool;
}

/// Probe that runs `<program> <pre_args> <addr> <post_args>` and passes
/// on exit 0. The address is a single argv element.
pub struct CommandProbe<'a> {
    pub runner: &'a dyn CommandRunner,
    pub program: &'a str,
    pub pre_args: &'a [&'a str],
    pub post_args: &'a [&'a str],
    pub timeout: Duration,
}

impl Probe for CommandProbe<'_> {
    fn probe(&self, addr: &str) -> bool {
        let cmd = Cmd::new(self.program)
            .args(self.pre_args.iter().copied())
            .arg(addr)
            .args(self.post_args.iter().copied());
        matches!(self.runner.run(&cmd, self.timeout), Ok(out) if out.success())
    }
}

/// Operator interaction seam: read one line, show one message.
pub trait PromptSource {
    /// `Ok(None)` means end of input.
    fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>>;
    fn notify(&mut self, message: &str);
}

/// Real prompt over stdin/stdout.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl PromptSource for StdinPrompt {
    fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        let mut out = std::io::stdout().lock();
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut line = String::new();
        let n = std::io::stdin().lock().read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn notify(&mut self, message: &str) {
        println!("{message}");
    }
}

/// Scripted prompt for tests: feeds prepared lines, records notices.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    lines: VecDeque<String>,
    pub notices: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            notices: Vec::new(),
        }
    }
}

impl PromptSource for ScriptedPrompt {
    fn read_line(&mut self, _prompt: &str) -> std::io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

/// Where the validated address set came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressSource {
    /// Explicit option value.
    OptionList,
    /// Interactive prompting.
    Interactive,
    /// Batch run with no option: nothing collected, one warning.
    BatchSkipped,
}

/// Validated, deduplicated, sorted address set plus its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddresses {
    pub addresses: Vec<String>,
    pub source: AddressSource,
}

/// Drop empties, keep probe-passing candidates, dedup and sort.
pub fn validate_candidates<'a, I>(candidates: I, probe: &dyn Probe) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut kept: Vec<String> = candidates
        .into_iter()
        .filter(|c| !c.is_empty())
        .filter(|c| {
            let alive = probe.probe(c);
            if !alive {
                warn!(address = *c, "address is not a responsive service processor");
            }
            alive
        })
        .map(str::to_string)
        .collect();
    kept.sort();
    kept.dedup();
    kept
}

enum PromptState {
    CollectingInput,
    Done,
}

/// Interactive accumulation loop: one address per line, empty line or
/// end of input finishes. Rejections are reported through the prompt,
/// never aborting the loop.
pub fn prompt_for_addresses(
    prompt: &mut dyn PromptSource,
    prompt_text: &str,
    probe: &dyn Probe,
) -> Vec<String> {
    let mut accepted: Vec<String> = Vec::new();
    let mut state = PromptState::CollectingInput;
    while let PromptState::CollectingInput = state {
        match prompt.read_line(prompt_text) {
            Ok(Some(line)) if !line.is_empty() => {
                if probe.probe(&line) {
                    accepted.push(line);
                } else {
                    prompt.notify(&format!(
                        "The address you entered, {line}, is not a responsive service processor."
                    ));
                }
            }
            // Empty line, end of input, or a read error all end the loop.
            _ => state = PromptState::Done,
        }
    }
    accepted.sort();
    accepted.dedup();
    accepted
}

/// Resolve the working address set, trying sources in order: explicit
/// option list first; interactive prompting when allowed; otherwise a
/// batch skip.
pub fn resolve_addresses(
    option_list: &[String],
    batch: bool,
    prompt: &mut dyn PromptSource,
    prompt_text: &str,
    probe: &dyn Probe,
) -> ResolvedAddresses {
    if !option_list.is_empty() {
        return ResolvedAddresses {
            addresses: validate_candidates(option_list.iter().map(String::as_str), probe),
            source: AddressSource::OptionList,
        };
    }
    if batch {
        return ResolvedAddresses {
            addresses: Vec::new(),
            source: AddressSource::BatchSkipped,
        };
    }
    ResolvedAddresses {
        addresses: prompt_for_addresses(prompt, prompt_text, probe),
        source: AddressSource::Interactive,
    }
}
