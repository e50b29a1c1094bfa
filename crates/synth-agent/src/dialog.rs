//! The turn-taking loop between a customer and a cashier

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::error::Result;

/// One side of a dialog
#[async_trait]
pub trait DialogAgent: Send {
    /// Reply to the other side's last line
    async fn get_answer(&mut self, line: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Client,
    Cashier,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Client => f.write_str("Client"),
            Speaker::Cashier => f.write_str("Cashier"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub speaker: Speaker,
    pub text: String,
}

impl fmt::Display for TranscriptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.speaker, self.text)
    }
}

/// Ordered dialog lines
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Vec<TranscriptLine>,
}

impl Transcript {
    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) -> &TranscriptLine {
        self.lines.push(TranscriptLine {
            speaker,
            text: text.into(),
        });
        &self.lines[self.lines.len() - 1]
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The file form: one `"<Speaker>: <text>"` line each
    pub fn render(&self) -> String {
        self.lines.iter().map(|l| l.to_string()).collect()
    }

    /// Whitespace-separated tokens in the rendered text
    pub fn token_count(&self) -> usize {
        self.render().split_whitespace().count()
    }

    /// Unicode scalar values in the rendered text
    pub fn char_count(&self) -> usize {
        self.render().chars().count()
    }
}

/// Decides whether a cashier line ends the dialog
pub trait FarewellDetector: Send + Sync {
    fn is_farewell(&self, utterance: &str) -> bool;
}

/// Case-insensitive substring match against a token list
pub struct KeywordFarewellDetector {
    tokens: Vec<String>,
}

impl KeywordFarewellDetector {
    pub fn new(tokens: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tokens: tokens.into_iter().map(|t| t.into().to_lowercase()).collect(),
        }
    }
}

impl Default for KeywordFarewellDetector {
    fn default() -> Self {
        Self::new(["bye", "enjoy the meal", "enjoy your meal"])
    }
}

impl FarewellDetector for KeywordFarewellDetector {
    fn is_farewell(&self, utterance: &str) -> bool {
        let lower = utterance.to_lowercase();
        self.tokens.iter().any(|t| lower.contains(t.as_str()))
    }
}

#[derive(Clone)]
pub struct DialogOptions {
    /// Client replies after the opening before the loop gives up
    pub max_exchanges: u32,
    pub farewell: Arc<dyn FarewellDetector>,
}

impl Default for DialogOptions {
    fn default() -> Self {
        Self {
            max_exchanges: 10,
            farewell: Arc::new(KeywordFarewellDetector::default()),
        }
    }
}

impl fmt::Debug for DialogOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogOptions")
            .field("max_exchanges", &self.max_exchanges)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The cashier said goodbye
    Farewell,
    /// The exchange cap was hit
    TurnCap,
}

/// Summary of one finished dialog
#[derive(Debug, Clone)]
pub struct DialogStats {
    pub order_id: Option<u32>,
    pub start_time: DateTime<Local>,
    pub duration: Duration,
    pub token_count: usize,
    pub char_count: usize,
    pub exchanges: u32,
    pub end_reason: EndReason,
}

#[derive(Debug, Clone)]
pub struct DialogOutcome {
    pub transcript: Transcript,
    pub stats: DialogStats,
}

/// Alternate between the two agents until the cashier says goodbye or the
/// exchange cap is passed. Every line is written to `sink` and flushed as
/// soon as it exists, so a failed dialog leaves a partial transcript.
pub async fn run_dialog(
    client: &mut dyn DialogAgent,
    cashier: &mut dyn DialogAgent,
    sink: &mut dyn Write,
    options: &DialogOptions,
) -> Result<DialogOutcome> {
    let start_time = Local::now();
    let started = Instant::now();
    let mut transcript = Transcript::default();

    let mut client_line = client.get_answer("").await?;
    emit(&mut transcript, sink, Speaker::Client, &client_line)?;

    let mut exchanges = 0u32;
    let end_reason = loop {
        let cashier_line = cashier.get_answer(&client_line).await?;
        emit(&mut transcript, sink, Speaker::Cashier, &cashier_line)?;
        if options.farewell.is_farewell(&cashier_line) {
            break EndReason::Farewell;
        }

        client_line = client.get_answer(&cashier_line).await?;
        emit(&mut transcript, sink, Speaker::Client, &client_line)?;

        exchanges += 1;
        if exchanges > options.max_exchanges {
            break EndReason::TurnCap;
        }
    };

    let stats = DialogStats {
        order_id: None,
        start_time,
        duration: started.elapsed(),
        token_count: transcript.token_count(),
        char_count: transcript.char_count(),
        exchanges,
        end_reason,
    };

    tracing::debug!(
        lines = transcript.len(),
        exchanges,
        ?end_reason,
        "Dialog finished"
    );

    Ok(DialogOutcome { transcript, stats })
}

fn emit(
    transcript: &mut Transcript,
    sink: &mut dyn Write,
    speaker: Speaker,
    text: &str,
) -> Result<()> {
    let line = transcript.push(speaker, text);
    write!(sink, "{}", line)?;
    sink.flush()?;
    Ok(())
}

/// Run a dialog straight into a transcript file at `path`
pub async fn write_dialog(
    client: &mut dyn DialogAgent,
    cashier: &mut dyn DialogAgent,
    path: &Path,
    options: &DialogOptions,
) -> Result<DialogOutcome> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mut outcome = run_dialog(client, cashier, &mut writer, options).await?;
    writer.flush()?;

    outcome.stats.order_id = order_id_from_path(path);
    Ok(outcome)
}

/// `Dialog-0007.txt` → 7, `RandomDialog-0003.txt` → 3
pub fn order_id_from_path(path: &Path) -> Option<u32> {
    path.file_stem()?
        .to_str()?
        .rsplit('-')
        .next()?
        .parse()
        .ok()
}

/// `H:MM:SS.ffffff`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{}:{:02}:{:02}.{:06}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        duration.subsec_micros()
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Agent that replays a script, then repeats its last line, and
    /// records what it was told
    pub(crate) struct ScriptedAgent {
        script: Vec<String>,
        turn: usize,
        pub(crate) heard: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedAgent {
        pub(crate) fn new(script: &[&str]) -> Self {
            Self {
                script: script.iter().map(|s| s.to_string()).collect(),
                turn: 0,
                heard: Arc::new(Mutex::new(vec![])),
            }
        }
    }

    #[async_trait]
    impl DialogAgent for ScriptedAgent {
        async fn get_answer(&mut self, line: &str) -> Result<String> {
            self.heard.lock().push(line.to_string());
            let index = self.turn.min(self.script.len() - 1);
            self.turn += 1;
            Ok(self.script[index].clone())
        }
    }

    #[tokio::test]
    async fn test_turn_cap() {
        let mut client = ScriptedAgent::new(&["Hi", "More please"]);
        let mut cashier = ScriptedAgent::new(&["Sure, anything else?"]);
        let mut sink = Vec::new();

        let outcome = run_dialog(&mut client, &mut cashier, &mut sink, &DialogOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.stats.end_reason, EndReason::TurnCap);
        assert_eq!(outcome.stats.exchanges, 11);
        // opening + 11 cashier + 11 client
        assert_eq!(outcome.transcript.len(), 23);
        assert_eq!(String::from_utf8(sink).unwrap(), outcome.transcript.render());
    }

    #[tokio::test]
    async fn test_farewell_stops_loop() {
        let mut client = ScriptedAgent::new(&["I'd like to order", "Two burgers", "That's all"]);
        let mut cashier = ScriptedAgent::new(&[
            "What would you like?",
            "Anything else?",
            "Your order: 2 Burger. Enjoy the meal!",
        ]);
        let client_heard = client.heard.clone();
        let cashier_heard = cashier.heard.clone();
        let mut sink = Vec::new();

        let outcome = run_dialog(&mut client, &mut cashier, &mut sink, &DialogOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.stats.end_reason, EndReason::Farewell);
        assert_eq!(outcome.stats.exchanges, 2);
        assert_eq!(
            String::from_utf8(sink).unwrap(),
            "Client: I'd like to order\n\
             Cashier: What would you like?\n\
             Client: Two burgers\n\
             Cashier: Anything else?\n\
             Client: That's all\n\
             Cashier: Your order: 2 Burger. Enjoy the meal!\n"
        );
        assert_eq!(
            client_heard.lock().as_slice(),
            ["", "What would you like?", "Anything else?"]
        );
        assert_eq!(
            cashier_heard.lock().as_slice(),
            ["I'd like to order", "Two burgers", "That's all"]
        );
    }

    #[tokio::test]
    async fn test_custom_farewell_detector() {
        struct Never;
        impl FarewellDetector for Never {
            fn is_farewell(&self, _: &str) -> bool {
                false
            }
        }

        let mut client = ScriptedAgent::new(&["Hi"]);
        let mut cashier = ScriptedAgent::new(&["Bye!"]);
        let options = DialogOptions {
            max_exchanges: 2,
            farewell: Arc::new(Never),
        };
        let outcome = run_dialog(&mut client, &mut cashier, &mut std::io::sink(), &options)
            .await
            .unwrap();
        assert_eq!(outcome.stats.end_reason, EndReason::TurnCap);
        assert_eq!(outcome.transcript.len(), 7);
    }

    #[tokio::test]
    async fn test_write_dialog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Dialog-0042.txt");
        let mut client = ScriptedAgent::new(&["Hello"]);
        let mut cashier = ScriptedAgent::new(&["Goodbye"]);

        let outcome = write_dialog(&mut client, &mut cashier, &path, &DialogOptions::default())
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "Client: Hello\nCashier: Goodbye\n");
        assert_eq!(outcome.stats.order_id, Some(42));
        assert_eq!(outcome.stats.token_count, 4);
        assert_eq!(outcome.stats.char_count, contents.chars().count());
    }

    #[test]
    fn test_counts_use_unicode_scalars() {
        let mut transcript = Transcript::default();
        transcript.push(Speaker::Client, "Один бургер");
        assert_eq!(transcript.render(), "Client: Один бургер\n");
        assert_eq!(transcript.token_count(), 3);
        assert_eq!(transcript.char_count(), 20);
    }

    #[test]
    fn test_order_id_from_path() {
        assert_eq!(order_id_from_path(Path::new("results/Dialog-0007.txt")), Some(7));
        assert_eq!(order_id_from_path(Path::new("RandomDialog-0003.txt")), Some(3));
        assert_eq!(order_id_from_path(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_micros(1_500)), "0:00:00.001500");
        assert_eq!(
            format_duration(Duration::from_secs(3725) + Duration::from_micros(42)),
            "1:02:05.000042"
        );
    }
}
