//! Static passages for practice drills and races, tiered by difficulty.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

const BEGINNER: &[&str] = &[
    "The quick brown fox jumps over the lazy dog. This pangram contains all letters of the alphabet.",
    "She sells seashells by the seashore. The shells she sells are surely seashells.",
    "How much wood would a woodchuck chuck if a woodchuck could chuck wood?",
    "Peter Piper picked a peck of pickled peppers. A peck of pickled peppers Peter Piper picked.",
    "Betty bought a bit of butter, but the butter Betty bought was bitter.",
];

const INTERMEDIATE: &[&str] = &[
    "The ability to type quickly and accurately is an essential skill in today's digital world. Practice makes perfect.",
    "Programming is the process of creating a set of instructions that tell a computer how to perform a task.",
    "The Internet is a global system of interconnected computer networks that use standardized communication protocols.",
    "Artificial intelligence is intelligence demonstrated by machines, as opposed to natural intelligence displayed by humans.",
    "Cloud computing is the on-demand availability of computer system resources, especially data storage and computing power.",
];

const ADVANCED: &[&str] = &[
    "The intricate interplay between quantum mechanics and general relativity presents one of the most profound challenges in modern theoretical physics.",
    "The implementation of sophisticated machine learning algorithms requires a deep understanding of both statistical methods and computational optimization techniques.",
    "Cryptocurrency transactions are verified by network nodes through cryptography and recorded in a public distributed ledger called a blockchain.",
    "The anthropogenic impact on biodiversity and ecosystem functioning has accelerated dramatically in recent decades, leading to unprecedented rates of species extinction.",
];

fn tier(difficulty: Difficulty) -> &'static [&'static str] {
    match difficulty {
        Difficulty::Beginner => BEGINNER,
        Difficulty::Intermediate => INTERMEDIATE,
        Difficulty::Advanced => ADVANCED,
    }
}

/// Pick a passage for the given difficulty, seeded by wall-clock time.
pub fn random_passage(difficulty: Difficulty) -> &'static str {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    crate::clock::now_ms().hash(&mut hasher);
    let texts = tier(difficulty);
    texts[(hasher.finish() as usize) % texts.len()]
}

/// Passage by index, for deterministic tests.
pub fn passage_at(difficulty: Difficulty, index: usize) -> Option<&'static str> {
    tier(difficulty).get(index).copied()
}
