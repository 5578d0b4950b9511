pub mod aggregate;
pub mod format;
pub mod narrative;

pub use aggregate::aggregate;
pub use narrative::{
    FixedChooser, NarrativeFacts, NarrativeGenerator, PhraseChooser, RandomChooser, analyze,
};
