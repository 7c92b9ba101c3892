//! The execution backend boundary.
//!
//! The analyzer talks to the backend through three requests: declare a
//! signature, define a body, and evaluate an expression. Code is sent
//! incrementally, REPL style, so later requests may refer to anything
//! declared before them.
//!
//! - [`ProgramBuffer`]: in-memory backend that only records the program.
//!   Evaluation is delegated to an optional scripted evaluator.
//! - [`ReplBackend`]: drives an external process over line-delimited JSON.

use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use yune_core::BackendError;

use crate::options::CompileOptions;

/// Requests the analyzer sends to the execution backend.
pub trait Backend {
    /// Register a signature-only declaration.
    fn declare(&mut self, text: &str) -> Result<(), BackendError>;

    /// Supply the body of a previously declared name.
    fn define(&mut self, text: &str) -> Result<(), BackendError>;

    /// Evaluate an expression against everything defined so far and return
    /// its value as tagged JSON.
    fn evaluate(&mut self, text: &str) -> Result<Json, BackendError>;

    /// Everything declared and defined so far, in order.
    fn program(&self) -> String;
}

// ============================================================================
// ProgramBuffer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Declaration,
    Definition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryKind,
    pub text: String,
}

type Evaluator = Box<dyn FnMut(&str) -> Result<Json, BackendError>>;

/// In-memory backend.
#[derive(Default)]
pub struct ProgramBuffer {
    entries: Vec<Entry>,
    evaluations: Vec<String>,
    evaluator: Option<Evaluator>,
}

impl ProgramBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `evaluate` requests with `evaluator`.
    pub fn with_evaluator(
        mut self,
        evaluator: impl FnMut(&str) -> Result<Json, BackendError> + 'static,
    ) -> Self {
        self.evaluator = Some(Box::new(evaluator));
        self
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Texts of every `evaluate` request, answered or not.
    pub fn evaluations(&self) -> &[String] {
        &self.evaluations
    }

    pub fn declarations(&self) -> impl Iterator<Item = &str> {
        self.texts(EntryKind::Declaration)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &str> {
        self.texts(EntryKind::Definition)
    }

    fn texts(&self, kind: EntryKind) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |entry| entry.kind == kind)
            .map(|entry| entry.text.as_str())
    }

    fn push(&mut self, kind: EntryKind, text: &str) {
        self.entries.push(Entry {
            kind,
            text: text.to_string(),
        });
    }
}

impl fmt::Debug for ProgramBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramBuffer")
            .field("entries", &self.entries)
            .field("evaluations", &self.evaluations)
            .field("has_evaluator", &self.evaluator.is_some())
            .finish()
    }
}

impl Backend for ProgramBuffer {
    fn declare(&mut self, text: &str) -> Result<(), BackendError> {
        self.push(EntryKind::Declaration, text);
        Ok(())
    }

    fn define(&mut self, text: &str) -> Result<(), BackendError> {
        self.push(EntryKind::Definition, text);
        Ok(())
    }

    fn evaluate(&mut self, text: &str) -> Result<Json, BackendError> {
        self.evaluations.push(text.to_string());
        match self.evaluator.as_mut() {
            Some(evaluator) => evaluator(text),
            None => Err(BackendError::Unsupported {
                operation: "evaluate".to_string(),
            }),
        }
    }

    fn program(&self) -> String {
        self.entries
            .iter()
            .map(|entry| entry.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ============================================================================
// ReplBackend
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum RequestKind {
    Declare,
    Define,
    Evaluate,
}

impl RequestKind {
    fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Declare => "declare",
            RequestKind::Define => "define",
            RequestKind::Evaluate => "evaluate",
        }
    }
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    kind: RequestKind,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct Response {
    ok: bool,
    #[serde(default)]
    value: Option<Json>,
    #[serde(default)]
    error: Option<String>,
}

/// Backend that drives an external REPL process.
///
/// Each request is one JSON line on the child's stdin:
/// `{"kind": "declare" | "define" | "evaluate", "text": "..."}`. The child
/// answers each with one line: `{"ok": bool, "value"?: json, "error"?: string}`.
pub struct ReplBackend {
    child: Child,
    stdin: ChildStdin,
    replies: Receiver<std::io::Result<String>>,
    timeout: Duration,
    /// Set once a request timed out. A late reply would otherwise be read
    /// as the answer to the next request.
    stalled: bool,
    buffer: ProgramBuffer,
}

impl ReplBackend {
    /// Spawn `command` with piped stdin and stdout.
    pub fn spawn(mut command: Command, timeout: Duration) -> Result<Self, BackendError> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(BackendError::Io {
                message: "backend process has no stdio pipes".to_string(),
            });
        };

        // Replies are read on a separate thread so each request can wait
        // with a deadline.
        let (sender, replies) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                if sender.send(line).is_err() {
                    break;
                }
            }
        });

        tracing::debug!(pid = child.id(), "backend process started");
        Ok(Self {
            child,
            stdin,
            replies,
            timeout,
            stalled: false,
            buffer: ProgramBuffer::new(),
        })
    }

    /// Spawn `command` with the request timeout from `options`.
    pub fn from_options(
        command: Command,
        options: &CompileOptions,
    ) -> Result<Self, BackendError> {
        Self::spawn(command, options.backend_timeout)
    }

    fn request(&mut self, kind: RequestKind, text: &str) -> Result<Option<Json>, BackendError> {
        if self.stalled {
            return Err(BackendError::Protocol {
                message: "backend stopped answering after a timeout".to_string(),
            });
        }
        let mut line = serde_json::to_string(&Request { kind, text })?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes())?;
        self.stdin.flush()?;

        let reply = match self.replies.recv_timeout(self.timeout) {
            Ok(reply) => reply?,
            Err(RecvTimeoutError::Timeout) => {
                self.stalled = true;
                return Err(BackendError::Timeout {
                    millis: self.timeout.as_millis(),
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(BackendError::Io {
                    message: "backend process closed its output".to_string(),
                });
            }
        };

        let response: Response = serde_json::from_str(&reply)?;
        if !response.ok {
            return Err(BackendError::Rejected {
                kind: kind.as_str().to_string(),
                message: response.error.unwrap_or_default(),
            });
        }
        Ok(response.value)
    }
}

impl Backend for ReplBackend {
    fn declare(&mut self, text: &str) -> Result<(), BackendError> {
        self.request(RequestKind::Declare, text)?;
        self.buffer.declare(text)
    }

    fn define(&mut self, text: &str) -> Result<(), BackendError> {
        self.request(RequestKind::Define, text)?;
        self.buffer.define(text)
    }

    fn evaluate(&mut self, text: &str) -> Result<Json, BackendError> {
        self.request(RequestKind::Evaluate, text)?
            .ok_or_else(|| BackendError::Protocol {
                message: "evaluate reply has no value".to_string(),
            })
    }

    fn program(&self) -> String {
        self.buffer.program()
    }
}

impl Drop for ReplBackend {
    fn drop(&mut self) {
        // The process may already have exited.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl fmt::Debug for ReplBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplBackend")
            .field("pid", &self.child.id())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn buffer_records_in_order() {
        let mut buffer = ProgramBuffer::new();
        buffer.declare("int f();").unwrap();
        buffer.define("int f() { return 1; }").unwrap();
        assert_eq!(buffer.program(), "int f();\nint f() { return 1; }");
        assert_eq!(buffer.declarations().collect::<Vec<_>>(), ["int f();"]);
        assert_eq!(buffer.definitions().count(), 1);
    }

    #[test]
    fn buffer_without_evaluator_is_unsupported() {
        let mut buffer = ProgramBuffer::new();
        assert!(matches!(
            buffer.evaluate("f()"),
            Err(BackendError::Unsupported { .. })
        ));
        assert_eq!(buffer.evaluations(), ["f()"]);
    }

    #[test]
    fn buffer_uses_scripted_evaluator() {
        let mut buffer =
            ProgramBuffer::new().with_evaluator(|_| Ok(json!({"$tag": "Int", "value": 7})));
        assert_eq!(
            buffer.evaluate("f()").unwrap(),
            json!({"$tag": "Int", "value": 7})
        );
    }

    #[test]
    fn request_wire_format() {
        let line = serde_json::to_string(&Request {
            kind: RequestKind::Evaluate,
            text: "1 + 2",
        })
        .unwrap();
        assert_eq!(line, r#"{"kind":"evaluate","text":"1 + 2"}"#);

        let response: Response = serde_json::from_str(r#"{"ok":false,"error":"boom"}"#).unwrap();
        assert!(!response.ok);
        assert_eq!(response.error.as_deref(), Some("boom"));
        assert!(response.value.is_none());
    }

    #[cfg(unix)]
    fn shell(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        command
    }

    #[cfg(unix)]
    #[test]
    fn repl_round_trip() {
        let script = r#"while read line; do echo '{"ok":true,"value":{"$tag":"Int","value":3}}'; done"#;
        let mut backend = ReplBackend::spawn(shell(script), Duration::from_secs(5)).unwrap();
        backend.declare("extern int a;").unwrap();
        backend.define("int a = 3;").unwrap();
        assert_eq!(
            backend.evaluate("a").unwrap(),
            json!({"$tag": "Int", "value": 3})
        );
        assert_eq!(backend.program(), "extern int a;\nint a = 3;");
    }

    #[cfg(unix)]
    #[test]
    fn repl_rejection() {
        let script = r#"while read line; do echo '{"ok":false,"error":"syntax error"}'; done"#;
        let mut backend = ReplBackend::spawn(shell(script), Duration::from_secs(5)).unwrap();
        assert_eq!(
            backend.define("int a = ;"),
            Err(BackendError::Rejected {
                kind: "define".into(),
                message: "syntax error".into(),
            })
        );
        assert!(backend.program().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn repl_timeout() {
        let options = CompileOptions::new().with_backend_timeout(Duration::from_millis(50));
        let mut backend = ReplBackend::from_options(shell("sleep 5"), &options).unwrap();
        assert_eq!(
            backend.declare("int f();"),
            Err(BackendError::Timeout { millis: 50 })
        );
    }

    #[cfg(unix)]
    #[test]
    fn repl_late_reply_is_not_paired_with_next_request() {
        let script = r#"read line; sleep 0.2; echo '{"ok":true}'; while read line; do echo '{"ok":true}'; done"#;
        let options = CompileOptions::new().with_backend_timeout(Duration::from_millis(50));
        let mut backend = ReplBackend::from_options(shell(script), &options).unwrap();
        assert_eq!(
            backend.declare("int f();"),
            Err(BackendError::Timeout { millis: 50 })
        );
        // Let the late reply arrive.
        thread::sleep(Duration::from_millis(400));
        assert!(matches!(
            backend.define("int f() { return 1; }"),
            Err(BackendError::Protocol { .. })
        ));
        assert!(backend.program().is_empty());
    }
}
