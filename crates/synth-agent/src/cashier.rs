//! The simulated cashier

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use synth_ai::Message;

use crate::{
    conversation::Conversation,
    dialog::DialogAgent,
    error::{Error, Result},
    knowledge::Retriever,
    menu::Menu,
    transport::{RunConfig, Transport},
};

/// Customer phrases that mean the order is finished
pub const CLOSING_PHRASES: &[&str] = &[
    "that's all",
    "nothing else",
    "i'm done",
    "that will be all",
    "no more",
    "that's everything",
    "finish my order",
    "complete the order",
    "looking forward",
    "look forward",
    "that's it",
    "can't wait",
    "i have everything",
];

static HAVE_A_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)have a \w+ day").unwrap());

const MENU_REMINDER: &str = "If what I say is not on the menu, say you don't have it. \
     If I say something similar to an item on the menu, name it exactly as it appears on the menu.";

/// Decides whether a customer line ends the order. Keyword matching on
/// generated text is a heuristic, so it is swappable.
pub trait ClosingDetector: Send + Sync {
    fn is_closing(&self, utterance: &str) -> bool;
}

/// Case-insensitive phrase list plus a regex
pub struct KeywordClosingDetector {
    phrases: Vec<String>,
    pattern: Regex,
}

impl KeywordClosingDetector {
    pub fn new(phrases: impl IntoIterator<Item = impl Into<String>>, pattern: Regex) -> Self {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.into().to_lowercase())
                .collect(),
            pattern,
        }
    }
}

impl Default for KeywordClosingDetector {
    fn default() -> Self {
        Self::new(CLOSING_PHRASES.iter().copied(), HAVE_A_DAY.clone())
    }
}

impl ClosingDetector for KeywordClosingDetector {
    fn is_closing(&self, utterance: &str) -> bool {
        let lower = utterance.to_lowercase();
        self.phrases.iter().any(|p| lower.contains(p.as_str())) || self.pattern.is_match(&lower)
    }
}

/// Where the cashier is in the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashierPhase {
    /// Collecting items, grounding each reply in retrieved menu context
    TakingOrder,
    /// The customer signalled completion; reading the order back
    Finalizing,
}

impl CashierPhase {
    /// Phase for a turn given the incoming customer line. Every turn is
    /// judged on its own line, so a customer who keeps talking after a
    /// read-back puts the cashier back into `TakingOrder`.
    pub fn for_utterance(detector: &dyn ClosingDetector, utterance: &str) -> Self {
        if detector.is_closing(utterance) {
            CashierPhase::Finalizing
        } else {
            CashierPhase::TakingOrder
        }
    }
}

/// Cashier settings
#[derive(Debug, Clone)]
pub struct CashierConfig {
    pub run: RunConfig,
    pub restaurant_name: String,
    /// Context chunks retrieved per turn
    pub top_k: usize,
}

impl CashierConfig {
    pub fn new(run: RunConfig) -> Self {
        Self {
            run,
            restaurant_name: "Vkusno i tochka".to_string(),
            top_k: 2,
        }
    }
}

pub struct CashierAgent {
    retriever: Box<dyn Retriever>,
    detector: Arc<dyn ClosingDetector>,
    transport: Arc<dyn Transport>,
    config: CashierConfig,
    phase: CashierPhase,
    current_order: Vec<String>,
    conversation: Conversation,
}

impl CashierAgent {
    pub fn new(
        menu: &Menu,
        retriever: Box<dyn Retriever>,
        transport: Arc<dyn Transport>,
        config: CashierConfig,
    ) -> Self {
        let conversation = Conversation::with_system(system_prompt(menu, &config.restaurant_name));
        Self {
            retriever,
            detector: Arc::new(KeywordClosingDetector::default()),
            transport,
            config,
            phase: CashierPhase::TakingOrder,
            current_order: vec![],
            conversation,
        }
    }

    /// Replace the order-completion heuristic
    pub fn with_closing_detector(mut self, detector: Arc<dyn ClosingDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn phase(&self) -> CashierPhase {
        self.phase
    }

    /// Raw customer lines collected since the last read-back
    pub fn current_order(&self) -> &[String] {
        &self.current_order
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    /// Produce the cashier's reply to one customer line
    pub async fn get_answer(&mut self, customer_line: &str) -> Result<String> {
        self.phase = CashierPhase::for_utterance(self.detector.as_ref(), customer_line);

        match self.phase {
            CashierPhase::Finalizing => {
                tracing::debug!(
                    fragments = self.current_order.len(),
                    "Customer finished ordering, reading order back"
                );
                let fragments = std::mem::take(&mut self.current_order);
                self.conversation.push(Message::system(read_back_instruction(&fragments)));
            }
            CashierPhase::TakingOrder => {
                self.current_order.push(customer_line.to_string());

                let context = self
                    .retriever
                    .retrieve(customer_line, self.config.top_k)
                    .await?;
                tracing::debug!(context = %context, "Retrieved menu context");

                self.conversation.push(Message::system(format!("Context: {}", context)));
                self.conversation.push(Message::user(customer_line));
                self.conversation.push(Message::system(MENU_REMINDER));
            }
        }

        let reply = self
            .transport
            .complete(self.conversation.messages(), &self.config.run)
            .await?;
        let text = reply.text().trim().to_string();
        if text.is_empty() {
            return Err(Error::EmptyResponse);
        }
        self.conversation.push(Message::assistant(text.clone()));
        Ok(text)
    }
}

#[async_trait]
impl DialogAgent for CashierAgent {
    async fn get_answer(&mut self, line: &str) -> Result<String> {
        CashierAgent::get_answer(self, line).await
    }
}

fn system_prompt(menu: &Menu, restaurant_name: &str) -> String {
    format!(
        "You are a cashier at the fast food restaurant '{restaurant}'. \
         I am a customer who came to '{restaurant}' to place an order. \
         Your task is to help me with the order and clarify the details. \
         If what I say is not on the menu, say you don't have it. \
         Say ONLY the correct names of items on the menu: {summaries} \
         In one list: {items}. \
         Speak briefly, only to the point. There is NO NEED to list the entire menu.",
        restaurant = restaurant_name,
        summaries = menu.category_summaries().join(" "),
        items = menu.item_names().join(", "),
    )
}

fn read_back_instruction(fragments: &[String]) -> String {
    let quoted = fragments
        .iter()
        .map(|f| format!("'{}'", f))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "I finished voicing my order. Now analyze all my messages: [{}] and voice my order yourself. \
         It is strictly forbidden to voice anything that is not on the menu. \
         Also, don't forget to say 'enjoy the meal' at the end.",
        quoted
    )
}
