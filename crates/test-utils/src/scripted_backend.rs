use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use reliable::errors::Result;
use reliable::exec::{CommandLine, ExitStatus, OutputChunk, OutputSink, ProcessBackend};

/// Canned output and status for one attempt.
#[derive(Debug, Clone)]
pub struct ScriptedAttempt {
    pub chunks: Vec<OutputChunk>,
    pub status: ExitStatus,
}

/// A fake backend that:
/// - replays scripted attempts in order, repeating the last one forever
/// - records the command line of every attempt it was asked to run.
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    script: Vec<ScriptedAttempt>,
    runs: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<ScriptedAttempt>) -> Self {
        assert!(!script.is_empty(), "a scripted backend needs at least one attempt");
        Self {
            script,
            runs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every attempt fails (or succeeds) the same way.
    pub fn repeating(attempt: ScriptedAttempt) -> Self {
        Self::new(vec![attempt])
    }

    /// Shared handle to the argv of every attempt run so far.
    pub fn runs(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        Arc::clone(&self.runs)
    }

    pub fn attempts(&self) -> usize {
        self.runs.lock().unwrap().len()
    }
}

impl ProcessBackend for ScriptedBackend {
    fn run<'a>(
        &'a mut self,
        command: &'a CommandLine,
        sink: &'a mut dyn OutputSink,
    ) -> Pin<Box<dyn Future<Output = Result<ExitStatus>> + Send + 'a>> {
        Box::pin(async move {
            let index = {
                let mut runs = self.runs.lock().unwrap();
                runs.push(command.argv().to_vec());
                runs.len() - 1
            };
            let attempt = &self.script[index.min(self.script.len() - 1)];

            for chunk in &attempt.chunks {
                sink.on_chunk(chunk.stream, &chunk.bytes)?;
            }
            Ok(attempt.status.clone())
        })
    }
}
