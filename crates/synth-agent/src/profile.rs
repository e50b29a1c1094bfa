//! Customer personalities

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A named customer personality. Each profile carries both the system
/// instruction that sets the tone and the base rate at which the customer
/// interrupts its order with a clarifying question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    Regular,
    Friendly,
    Impatient,
    PoliteAndRespectful,
    Indecisive,
}

impl Profile {
    pub const ALL: [Profile; 5] = [
        Profile::Regular,
        Profile::Friendly,
        Profile::Impatient,
        Profile::PoliteAndRespectful,
        Profile::Indecisive,
    ];

    /// Config/prompt name
    pub fn name(&self) -> &'static str {
        match self {
            Profile::Regular => "regular",
            Profile::Friendly => "friendly",
            Profile::Impatient => "impatient",
            Profile::PoliteAndRespectful => "polite_and_respectful",
            Profile::Indecisive => "indecisive",
        }
    }

    /// Probability of asking a question on a fresh ordering turn, before
    /// the decay applied per question already asked
    pub fn question_rate(&self) -> f64 {
        match self {
            Profile::Regular => 0.0,
            Profile::Friendly => 0.1,
            Profile::Impatient => 0.1,
            Profile::PoliteAndRespectful => 0.2,
            Profile::Indecisive => 0.3,
        }
    }

    /// System instruction describing the personality
    pub fn instruction(&self) -> &'static str {
        match self {
            Profile::Regular => {
                "A regular customer approaches the counter. \
                 You know the menu well and order efficiently without unnecessary questions or conversation. \
                 You are polite but brief."
            }
            Profile::Friendly => {
                "A friendly customer approaches the counter in a fast food restaurant. \
                 You greet the staff with a smile and are excited to order. \
                 You express gratitude and seem eager to enjoy your meal."
            }
            Profile::Impatient => {
                "An impatient customer walks up to the counter at a fast food restaurant. \
                 You are in a rush and not interested in chatting. \
                 You want your food as quickly as possible."
            }
            Profile::PoliteAndRespectful => {
                "A polite and respectful customer approaches the counter with a calm demeanor. \
                 You are considerate of the staff's time and well-mannered throughout the ordering process. \
                 You choose quickly, but you are thankful and appreciative of the service."
            }
            Profile::Indecisive => {
                "An indecisive customer is at the counter, unsure of what to order. \
                 You hesitate, seem unsure about what to pick, and often second-guess yourself."
            }
        }
    }

    /// Pick a profile uniformly at random
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Profile {
        *Self::ALL.choose(rng).unwrap_or(&Profile::Regular)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        Profile::ALL
            .into_iter()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| {
                Error::Other(format!(
                    "unknown client profile '{}' (expected one of: {})",
                    s.trim(),
                    Profile::ALL.map(|p| p.name()).join(", ")
                ))
            })
    }
}
