//! Closing remarks.
//!
//! Every reply ends with one line picked from a static table. The tables never
//! change at runtime; the only state here is the random number generator.

use crate::triage::LanguageTag;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Chance of mixing the flavor table into a regular pick.
pub const FLAVOR_PROBABILITY: f64 = 0.25;

/// The remark tables, one per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuipTable {
    CFamily,
    Python,
    TypeScript,
    /// Used when the language is unknown and for non-error replies.
    Default,
    /// Mixed into a pick now and then.
    Flavor,
    /// "No real diagnostic signal was found."
    Basic,
}

const C_FAMILY_QUIPS: &[&str] = &[
    "Ohio code moment: a missing return cooked the build.",
    "The function dipped before returning. No return, no rizz.",
    "Control path went NPC. Give it a return, blud.",
    "Low taper fade that logic and return something, fr.",
];

const PYTHON_QUIPS: &[&str] = &[
    "Traceback doom scrolling again. Add the check, stay sigma.",
    "Cringe None arc. Put a guard on it.",
    "Sussy exception energy. Tighten that branch.",
];

const TYPESCRIPT_QUIPS: &[&str] = &[
    "Types won't glaze themselves. Narrow it, gigachad.",
    "TS asked for a string and you brought a number. Ohio assign.",
    "Rizz up the types and refine that union.",
];

const DEFAULT_QUIPS: &[&str] = &[
    "Cooked build. Not the mosquito again.",
    "Goofy pipeline crashed out. Apply the fix and mew on.",
    "Put the fries in the bag and the return in the function.",
    "Goated with the sauce once the tests pass.",
    "Skibidi",
    "Sigma",
    "Chad",
    "Gigachad",
    "Fine Shyt: work hard",
];

const FLAVOR_QUIPS: &[&str] = &[
    "Ballerina Cappuccina pirouetted away with your semicolons.",
    "Bombombini Gusini says add that return, fr.",
    "Tralalero Tralala stomping the bug in fresh sneakers.",
    "Chimpanzini Bananini approved the patch diff.",
];

const BASIC_QUIPS: &[&str] = &["Negative Aura"];

impl QuipTable {
    pub fn for_language(language: Option<LanguageTag>) -> Self {
        match language {
            Some(LanguageTag::CFamily) => QuipTable::CFamily,
            Some(LanguageTag::Python) => QuipTable::Python,
            Some(LanguageTag::TypeScript) => QuipTable::TypeScript,
            None => QuipTable::Default,
        }
    }

    pub fn entries(&self) -> &'static [&'static str] {
        match self {
            QuipTable::CFamily => C_FAMILY_QUIPS,
            QuipTable::Python => PYTHON_QUIPS,
            QuipTable::TypeScript => TYPESCRIPT_QUIPS,
            QuipTable::Default => DEFAULT_QUIPS,
            QuipTable::Flavor => FLAVOR_QUIPS,
            QuipTable::Basic => BASIC_QUIPS,
        }
    }

    pub fn contains(&self, remark: &str) -> bool {
        self.entries().contains(&remark)
    }
}

/// Picks closing remarks. Seed it for reproducible output.
#[derive(Debug, Clone)]
pub struct RemarkSelector<R = StdRng> {
    rng: R,
}

impl RemarkSelector<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl Default for RemarkSelector<StdRng> {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl<R: Rng> RemarkSelector<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Pick a remark for `language`; `basic` forces the basic table.
    pub fn select(&mut self, language: Option<LanguageTag>, basic: bool) -> &'static str {
        pick_remark(&mut self.rng, language, basic)
    }
}

/// One-off pick with the thread-local RNG.
pub fn select_remark(language: Option<LanguageTag>, basic: bool) -> &'static str {
    pick_remark(&mut rand::thread_rng(), language, basic)
}

fn pick_remark<R: Rng + ?Sized>(
    rng: &mut R,
    language: Option<LanguageTag>,
    basic: bool,
) -> &'static str {
    if basic {
        return choose(rng, QuipTable::Basic.entries());
    }

    let base = QuipTable::for_language(language).entries();
    if rng.gen_bool(FLAVOR_PROBABILITY) {
        let mixed: Vec<&'static str> = base.iter().chain(FLAVOR_QUIPS).copied().collect();
        choose(rng, &mixed)
    } else {
        choose(rng, base)
    }
}

fn choose<R: Rng + ?Sized>(rng: &mut R, pool: &[&'static str]) -> &'static str {
    // Every table is non-empty, so the fallback is never reached.
    pool.choose(rng).copied().unwrap_or(BASIC_QUIPS[0])
}
