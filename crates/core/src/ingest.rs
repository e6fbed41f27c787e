//! Line-oriented import of `question,answer` text files.
//!
//! Each accepted line is embedded, completed with a generated answer when the
//! answer column is empty, and written to the vector store. Progress is
//! published on a watch channel so callers can poll it while an import runs.

use crate::{
    answer::AnswerProvider,
    embedding::{require_api_key, Embedder},
    store::VectorStore,
};
use embedding_lab_common::{IngestProgress, IngestReport, IngestStep, LabError, Result};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Lines of this many characters or more are ignored.
pub const MAX_LINE_LENGTH: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvLine<'a> {
    pub question: &'a str,
    pub answer: Option<&'a str>,
}

/// True if the text holds control characters other than tab, LF and CR.
pub fn looks_binary(text: &str) -> bool {
    text.chars()
        .any(|c| (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r'))
}

/// Parses one `question,answer` line.
///
/// Returns `None` for lines that must be skipped: anything without exactly
/// one comma, lines at or above [`MAX_LINE_LENGTH`], and blank questions.
pub fn parse_line(line: &str) -> Option<CsvLine<'_>> {
    if line.matches(',').count() != 1 || line.chars().count() >= MAX_LINE_LENGTH {
        return None;
    }

    let (question, answer) = line.split_once(',')?;
    if question.trim().is_empty() {
        return None;
    }

    let answer = answer.trim_end();
    Some(CsvLine {
        question,
        answer: (!answer.is_empty()).then_some(answer),
    })
}

/// Runs one import at a time; the progress channel always describes the
/// current or most recent import.
pub struct Ingestor {
    embedder: Arc<Embedder>,
    answers: Arc<dyn AnswerProvider>,
    store: Arc<dyn VectorStore>,
    progress: watch::Sender<IngestProgress>,
    running: AtomicBool,
}

/// Clears the running flag when an import ends, including on early return.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Ingestor {
    pub fn new(
        embedder: Arc<Embedder>,
        answers: Arc<dyn AnswerProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        let (progress, _) = watch::channel(IngestProgress::idle());
        Self {
            embedder,
            answers,
            store,
            progress,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<RunningGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LabError::IngestInProgress)?;
        Ok(RunningGuard(&self.running))
    }

    pub fn subscribe(&self) -> watch::Receiver<IngestProgress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> IngestProgress {
        self.progress.borrow().clone()
    }

    fn publish(&self, step: IngestStep, current: usize, total: usize) {
        let progress = IngestProgress::at(step, current, total);
        debug!(
            "{}: {}/{} ({}%)",
            progress.step, progress.current, progress.total, progress.percent
        );
        self.progress.send_replace(progress);
    }

    /// Imports `content` and returns a summary.
    ///
    /// The first failing embedding, generation or insert aborts the import;
    /// records written before the failure stay in the store. Fails with
    /// [`LabError::IngestInProgress`] while another import is running.
    pub async fn ingest(&self, content: &str, api_key: Option<&str>) -> Result<IngestReport> {
        let api_key = require_api_key(api_key)?;
        let _running = self.begin()?;

        self.publish(IngestStep::LoadFile, 0, content.len());
        self.publish(IngestStep::LoadFile, content.len(), content.len());

        if looks_binary(content) {
            error!("Rejected ingest input: binary content");
            self.publish(IngestStep::Failed, 0, 0);
            return Err(LabError::BinaryInput);
        }

        let lines: Vec<&str> = content.split('\n').collect();
        let total = lines.len();
        let mut report = IngestReport {
            total_lines: total,
            ..Default::default()
        };

        info!("Ingesting {} lines", total);
        self.publish(IngestStep::AnalyzeFile, 0, total);

        for (index, line) in lines.into_iter().enumerate() {
            match parse_line(line) {
                Some(parsed) => {
                    match self.import_line(parsed, api_key).await {
                        Ok(generated) => {
                            report.imported += 1;
                            if generated {
                                report.generated_answers += 1;
                            }
                        }
                        Err(e) => {
                            error!("Ingest aborted at line {}: {}", index + 1, e);
                            self.publish(IngestStep::Failed, index, total);
                            return Err(e);
                        }
                    }
                }
                None => report.skipped += 1,
            }

            self.publish(IngestStep::AnalyzeFile, index + 1, total);
        }

        self.publish(IngestStep::Done, total, total);
        info!(
            "Ingest finished: {} imported, {} skipped, {} answers generated",
            report.imported, report.skipped, report.generated_answers
        );

        Ok(report)
    }

    /// Returns whether the answer had to be generated.
    async fn import_line(&self, line: CsvLine<'_>, api_key: &str) -> Result<bool> {
        let data = self
            .embedder
            .generate_vector(line.question, Some(api_key))
            .await?;

        let (answer, generated) = match line.answer {
            Some(answer) => (answer.to_string(), false),
            None => (self.answers.answer(line.question, api_key).await?, true),
        };

        self.store.insert(data.with_answer(answer)).await?;
        Ok(generated)
    }
}
