use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};

use tracing::debug;

use crate::backends::smtlib_printer::{sort_to_smtlib, to_smtlib};
use crate::oracle::{Oracle, OracleError, OracleFactory, SatOutcome, Value};
use crate::sorts::Sort;
use crate::terms::SmtTerm;

/// One cvc5 subprocess speaking SMT-LIB2 over pipes.
///
/// The session sets `:global-declarations true` so that
/// `(reset-assertions)` clears the assertion set but keeps declared
/// constants, which the candidate loop relies on.
pub struct Cvc5Session {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: BufReader<ChildStderr>,
}

impl Cvc5Session {
    pub fn spawn(cmd: &str, time_limit_ms: Option<u64>) -> Result<Self, OracleError> {
        let mut args = vec![
            "--lang".to_string(),
            "smt2".to_string(),
            "--incremental".to_string(),
            "--produce-models".to_string(),
        ];
        if let Some(ms) = time_limit_ms {
            args.push(format!("--tlimit-per={ms}"));
        }

        let mut child = Command::new(cmd)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OracleError::NotFound(format!("{cmd}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| OracleError::Backend("failed to capture cvc5 stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| OracleError::Backend("failed to capture cvc5 stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| OracleError::Backend("failed to capture cvc5 stderr".into()))?;

        let mut session = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr: BufReader::new(stderr),
        };

        // Options must precede set-logic.
        session.send_command_no_response("(set-option :global-declarations true)")?;
        session.send_command_no_response("(set-logic QF_ALL)")?;
        Ok(session)
    }

    fn send_command(&mut self, cmd: &str) -> Result<String, OracleError> {
        debug!(target: "cvc5", command = cmd);
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;

        let mut response = String::new();
        self.stdout.read_line(&mut response)?;
        if response.is_empty() {
            let mut stderr = String::new();
            let _ = self.stderr.read_line(&mut stderr);
            return Err(OracleError::Backend(format!(
                "no response from cvc5 for command `{cmd}`. stderr: {}",
                stderr.trim()
            )));
        }
        Ok(response.trim_end().to_string())
    }

    fn send_command_no_response(&mut self, cmd: &str) -> Result<(), OracleError> {
        debug!(target: "cvc5", command = cmd);
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl Drop for Cvc5Session {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}

impl Oracle for Cvc5Session {
    fn declare_const(&mut self, name: &str, sort: &Sort) -> Result<(), OracleError> {
        let sort_str = sort_to_smtlib(sort);
        self.send_command_no_response(&format!("(declare-const {name} {sort_str})"))
    }

    fn assert_term(&mut self, term: &SmtTerm) -> Result<(), OracleError> {
        let smt_str = to_smtlib(term);
        self.send_command_no_response(&format!("(assert {smt_str})"))
    }

    fn reset_assertions(&mut self) -> Result<(), OracleError> {
        self.send_command_no_response("(reset-assertions)")
    }

    fn check_sat(&mut self) -> Result<SatOutcome, OracleError> {
        let response = self.send_command("(check-sat)")?;
        match response.as_str() {
            "sat" => Ok(SatOutcome::Sat),
            "unsat" => Ok(SatOutcome::Unsat),
            "unknown" => Ok(SatOutcome::Unknown("cvc5 returned unknown".into())),
            other => Err(OracleError::Backend(other.to_string())),
        }
    }

    fn get_value(&mut self, term: &SmtTerm) -> Result<Value, OracleError> {
        let printed = to_smtlib(term);
        let response = self.send_command(&format!("(get-value ({printed}))"))?;
        parse_value_response(&response, &printed)
    }

    fn set_time_limit(&mut self, ms: u64) -> Result<(), OracleError> {
        self.send_command_no_response(&format!("(set-option :tlimit-per {ms})"))
    }
}

/// Parse a `(get-value (t))` response of the form `((t v))`.
fn parse_value_response(response: &str, printed_term: &str) -> Result<Value, OracleError> {
    let inner = response
        .trim()
        .strip_prefix("((")
        .and_then(|s| s.strip_suffix("))"))
        .ok_or_else(|| OracleError::ParseValue(response.to_string()))?;
    let value_str = inner
        .strip_prefix(printed_term)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        // cvc5 may pretty-print the echoed term differently from us; fall
        // back to splitting off the trailing value token.
        .unwrap_or_else(|| trailing_value(inner));
    parse_literal(value_str).ok_or_else(|| OracleError::ParseValue(response.to_string()))
}

/// The value is the last balanced token of the `term value` pair.
fn trailing_value(inner: &str) -> &str {
    let trimmed = inner.trim_end();
    if trimmed.ends_with(')') {
        let mut depth = 0usize;
        for (idx, ch) in trimmed.char_indices().rev() {
            match ch {
                ')' => depth += 1,
                '(' => {
                    depth -= 1;
                    if depth == 0 {
                        return &trimmed[idx..];
                    }
                }
                _ => {}
            }
        }
        trimmed
    } else {
        trimmed.rsplit(char::is_whitespace).next().unwrap_or(trimmed)
    }
}

fn parse_literal(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Some(bits) = text.strip_prefix("#b") {
        let value = u64::from_str_radix(bits, 2).ok()?;
        return Some(Value::Bits {
            value,
            width: bits.len() as u32,
        });
    }
    if let Some(rest) = text.strip_prefix("(_ bv") {
        // (_ bvN w)
        let rest = rest.strip_suffix(')')?;
        let mut parts = rest.split_whitespace();
        let value = parts.next()?.parse().ok()?;
        let width = parts.next()?.parse().ok()?;
        return Some(Value::Bits { value, width });
    }
    if let Some(rest) = text.strip_prefix("(-") {
        let magnitude: i64 = rest.trim().strip_suffix(')')?.trim().parse().ok()?;
        return Some(Value::Int(-magnitude));
    }
    text.parse().ok().map(Value::Int)
}

/// Opens fresh cvc5 sessions for each run.
#[derive(Debug, Clone)]
pub struct Cvc5Factory {
    cmd: String,
}

impl Cvc5Factory {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into() }
    }
}

impl Default for Cvc5Factory {
    fn default() -> Self {
        Self::new("cvc5")
    }
}

impl OracleFactory for Cvc5Factory {
    fn open(&self, time_limit_ms: Option<u64>) -> Result<Box<dyn Oracle>, OracleError> {
        Ok(Box::new(Cvc5Session::spawn(&self.cmd, time_limit_ms)?))
    }
}
