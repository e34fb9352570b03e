pub mod classifier;
pub mod openrouter;
pub mod pipeline;

pub use classifier::{
    Classification, ClassificationRequest, ClassifierBackend, ClassifyError, MockClassifier,
};
pub use openrouter::{OpenRouterClassifier, OpenRouterConfig};
pub use pipeline::{CategorizeError, Categorizer, ItemOutcome};
