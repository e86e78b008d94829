//! Semantic pillar: phrase translation, ontology checks and hallucination
//! scoring against per-framework knowledge graphs.

mod knowledge;
mod linguist;

pub use knowledge::{Concept, DomainFramework, KnowledgeGraph};
pub use linguist::{
    ConceptRecord, DomainLinguist, SemanticBridge, SemanticReport, SemanticResult, SemanticValidationResult,
};
