//! Seed data: the built-in riddle bank and the chat greeting.

use crate::config::RiddleCfg;

/// First bot turn shown on every new connection.
pub const GREETING: &str = "Hi there! How can I help you adjust the riddles? Ask for 'easy', 'medium', 'hard' difficulty, or suggest a 'topic' like 'animals' or 'science'.";

/// Entry in the local bank. Difficulty and topic are lowercase tags used for filtering.
#[derive(Clone, Debug)]
pub struct BankEntry {
  pub riddle: String,
  pub answer: String,
  pub hint: String,
  pub difficulty: String,
  pub topic: String,
}

impl From<&RiddleCfg> for BankEntry {
  fn from(c: &RiddleCfg) -> Self {
    Self {
      riddle: c.riddle.clone(),
      answer: c.answer.clone(),
      hint: c.hint.clone(),
      difficulty: c.difficulty.as_deref().unwrap_or("medium").trim().to_lowercase(),
      topic: c.topic.as_deref().unwrap_or("general").trim().to_lowercase(),
    }
  }
}

macro_rules! seed {
  ($diff:expr, $topic:expr, $riddle:expr, $answer:expr, $hint:expr) => {
    BankEntry {
      riddle: $riddle.into(),
      answer: $answer.into(),
      hint: $hint.into(),
      difficulty: $diff.into(),
      topic: $topic.into(),
    }
  };
}

/// Minimal set of built-in riddles so the game is playable without a model.
pub fn seed_riddles() -> Vec<BankEntry> {
  vec![
    seed!("medium", "general", "I have cities, but no houses; forests, but no trees; and water, but no fish. What am I?", "A map", "I show you places but can't take you there."),
    seed!("easy", "general", "What has to be broken before you can use it?", "An egg", "You might have one for breakfast."),
    seed!("easy", "general", "What has hands but can't clap?", "A clock", "It tells you something all day long."),
    seed!("medium", "general", "The more of this there is, the less you see. What is it?", "Darkness", "Turn on a light to get rid of it."),
    seed!("hard", "general", "What can run but never walks, has a mouth but never talks, has a head but never weeps, has a bed but never sleeps?", "A river", "Fish live in my bed."),
    seed!("easy", "animals", "I have a mane but I'm not a horse, I roar but I'm not thunder. What am I?", "A lion", "They call me the king of the jungle."),
    seed!("medium", "animals", "I carry my house on my back, I'm slow but never late for home. What am I?", "A snail", "I leave a shiny trail."),
    seed!("hard", "animals", "I sleep hanging by my feet, see with my ears, and fly without feathers. What am I?", "A bat", "I come out at dusk."),
    seed!("easy", "science", "I'm a star you can see in the daytime. What am I?", "The sun", "Plants need me to grow."),
    seed!("medium", "science", "I pull everything down but you can never see me. What am I?", "Gravity", "An apple taught Newton about me."),
    seed!("hard", "science", "I'm lighter than a feather, yet the strongest person can't hold me for more than a few minutes. What am I?", "Breath", "You take me in and let me out all day."),
    seed!("medium", "food", "I'm yellow, curved, and come in a bunch. What am I?", "A banana", "Monkeys love me."),
  ]
}
