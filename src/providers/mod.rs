mod gemini;
mod traits;

pub use gemini::GeminiGenerator;
pub use traits::{GenerateOutcome, TextGenerator};
