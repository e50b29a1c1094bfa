//! The simulated customer
//!
//! Each turn is decided in two steps. [`ClientAgent::next_move`] runs the
//! ordering policy with no I/O and returns a [`ClientMove`]; the move is
//! then rendered into an instruction prompt and sent to the model.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use synth_ai::Message;

use crate::{
    conversation::Conversation,
    dialog::DialogAgent,
    error::{Error, Result},
    order::{OrderLine, OrderSource},
    profile::Profile,
    transport::{RunConfig, Transport},
};

/// Upper bound on clarifying questions per dialog
pub const MAX_QUESTIONS: u32 = 3;

/// Where the customer is in its order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientPhase {
    /// Nothing said yet
    Opening,
    /// No predefined order; improvising
    Freeform,
    /// Working through the predefined order
    Ordering,
    /// A question was asked; `deferred` is ordered on the next turn
    AwaitingAnswer { deferred: Vec<OrderLine> },
    /// Every order line has been mentioned
    Complete,
}

/// What the customer does on one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMove {
    Open,
    Continue,
    Close,
    Ask {
        item: OrderLine,
        deferred: Vec<OrderLine>,
    },
    Order(Vec<OrderLine>),
}

pub struct ClientAgent {
    profile: Profile,
    order: Vec<OrderLine>,
    phase: ClientPhase,
    mentioned: HashSet<OrderLine>,
    committed: Vec<OrderLine>,
    questions_asked: u32,
    conversation: Conversation,
    transport: Arc<dyn Transport>,
    config: RunConfig,
    rng: StdRng,
}

impl ClientAgent {
    pub fn new(
        profile: Profile,
        source: OrderSource,
        transport: Arc<dyn Transport>,
        config: RunConfig,
        rng: StdRng,
    ) -> Self {
        let order = match source {
            OrderSource::Fixed(lines) => {
                // Lines are identified by their rendered text, so exact
                // repeats collapse into one
                let mut seen = HashSet::new();
                lines
                    .into_iter()
                    .filter(|line| seen.insert(line.clone()))
                    .collect()
            }
            OrderSource::Freeform => vec![],
        };

        Self {
            profile,
            order,
            phase: ClientPhase::Opening,
            mentioned: HashSet::new(),
            committed: vec![],
            questions_asked: 0,
            conversation: Conversation::with_system(profile.instruction()),
            transport,
            config,
            rng,
        }
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn phase(&self) -> &ClientPhase {
        &self.phase
    }

    /// Order lines the customer has actually ordered so far
    pub fn committed_order(&self) -> &[OrderLine] {
        &self.committed
    }

    pub fn mentioned(&self) -> &HashSet<OrderLine> {
        &self.mentioned
    }

    pub fn questions_asked(&self) -> u32 {
        self.questions_asked
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    /// Decide this turn's move and apply it to the order state
    pub fn next_move(&mut self) -> ClientMove {
        let next = self.plan_move();
        self.apply_move(&next);
        next
    }

    /// Probability of asking a question on the next fresh ordering turn.
    /// Decays linearly with each question already asked.
    pub fn question_probability(&self) -> f64 {
        let remaining = 1.0 - f64::from(self.questions_asked) / f64::from(MAX_QUESTIONS);
        (self.profile.question_rate() * remaining).clamp(0.0, 1.0)
    }

    /// Pick a move without touching the order state. Only the rng advances.
    fn plan_move(&mut self) -> ClientMove {
        match &self.phase {
            ClientPhase::Opening => return ClientMove::Open,
            ClientPhase::Freeform => return ClientMove::Continue,
            ClientPhase::Complete => return ClientMove::Close,
            ClientPhase::AwaitingAnswer { deferred } => return ClientMove::Order(deferred.clone()),
            ClientPhase::Ordering => {}
        }

        let unmentioned: Vec<OrderLine> = self
            .order
            .iter()
            .filter(|line| !self.mentioned.contains(*line))
            .cloned()
            .collect();
        if unmentioned.is_empty() {
            return ClientMove::Close;
        }

        let count = self.rng.gen_range(1..=unmentioned.len());
        let subset: Vec<OrderLine> = unmentioned
            .choose_multiple(&mut self.rng, count)
            .cloned()
            .collect();

        let p = self.question_probability();
        if self.questions_asked < MAX_QUESTIONS && self.rng.gen_bool(p) {
            if let Some(item) = subset.choose(&mut self.rng).cloned() {
                return ClientMove::Ask {
                    item,
                    deferred: subset,
                };
            }
        }
        ClientMove::Order(subset)
    }

    fn apply_move(&mut self, next: &ClientMove) {
        match next {
            ClientMove::Open => {
                self.phase = if self.order.is_empty() {
                    ClientPhase::Freeform
                } else {
                    ClientPhase::Ordering
                };
            }
            ClientMove::Continue => {}
            ClientMove::Close => self.phase = ClientPhase::Complete,
            ClientMove::Ask { deferred, .. } => {
                self.questions_asked += 1;
                self.phase = ClientPhase::AwaitingAnswer {
                    deferred: deferred.clone(),
                };
            }
            ClientMove::Order(items) => {
                self.mentioned.extend(items.iter().cloned());
                self.committed.extend(items.iter().cloned());
                self.phase = ClientPhase::Ordering;
            }
        }
    }

    /// Produce the customer's reply to the cashier's last line. The
    /// opening turn is seeded with an empty line. The order state only
    /// moves once the model has answered.
    pub async fn get_answer(&mut self, cashier_line: &str) -> Result<String> {
        let next = self.plan_move();
        tracing::debug!(profile = %self.profile, ?next, "Client move");
        let prompt = self.prompt_for(&next, cashier_line);

        let mut request = self.conversation.messages().to_vec();
        if !cashier_line.is_empty() {
            request.push(Message::user(cashier_line));
        }
        request.push(Message::user(prompt));

        let reply = self.transport.complete(&request, &self.config).await?;
        let text = reply.text().trim().to_string();
        if text.is_empty() {
            return Err(Error::EmptyResponse);
        }

        if !cashier_line.is_empty() {
            self.conversation.push(Message::user(cashier_line));
        }
        self.conversation.push(Message::assistant(text.clone()));
        self.apply_move(&next);
        Ok(text)
    }

    fn prompt_for(&self, next: &ClientMove, cashier_line: &str) -> String {
        match next {
            ClientMove::Open => OPENING_PROMPT.to_string(),
            ClientMove::Continue => format!(
                "The cashier said: '{}'. You're ordering food. \
                 Respond naturally according to your personality ({}). \
                 Do not impersonate the cashier.",
                cashier_line, self.profile
            ),
            ClientMove::Close => CLOSING_PROMPT.to_string(),
            ClientMove::Ask { item, .. } => format!(
                "The cashier said: '{}'. You have a question about the {}. \
                 Ask a relevant question about ONLY this item. \
                 Remember to include the item next time. \
                 Do not order anything in this response. \
                 Do not ask about other items. \
                 Do not impersonate the cashier.",
                cashier_line, item
            ),
            ClientMove::Order(items) => format!(
                "The cashier said: '{}'. Your current order is: {}. \
                 You want to order {}. \
                 Respond naturally, adding this to your order according to your personality ({}). \
                 Do not order anything else at this time. Do not invent new items. \
                 Only order items from your predefined list. \
                 Do not use closing phrases. \
                 Do not impersonate the cashier.",
                cashier_line,
                join_lines(&self.committed),
                join_lines(items),
                self.profile
            ),
        }
    }
}

#[async_trait]
impl DialogAgent for ClientAgent {
    async fn get_answer(&mut self, line: &str) -> Result<String> {
        ClientAgent::get_answer(self, line).await
    }
}

const OPENING_PROMPT: &str = "You are at a fast-food restaurant. \
     This is your first interaction with the cashier. \
     Begin the conversation by politely initiating an order. \
     Do not list items at this time. \
     Do not impersonate the cashier. \
     The cashier will respond, and you will then proceed to place your order. \
     Do not include 'Customer:' or 'Sure' in your response. \
     Examples: \"May I place an order?\", \"I'd like to order, please.\", \"I'm ready to order.\"";

const CLOSING_PROMPT: &str = "You have ordered all the items on your list. \
     Respond with a short, polite closing phrase. \
     Do not impersonate the cashier.";

fn join_lines(lines: &[OrderLine]) -> String {
    lines
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
