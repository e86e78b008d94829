//! Conversation-facing entry point: turn one user request into an
//! integrated profile, recommendations and a starter configuration.

use crate::layer::{IntegratedProfile, IntegrationLayer};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, info};
use triad_config::Settings;
use triad_core::{MemoryEntry, MemoryType, Result};
use triad_pillars::behavioral::QualityAssessment;
use triad_pillars::technical::ComponentType;

const DEFAULT_FRAMEWORK: &str = "universal";
const EXPECTED_CONCEPT: &str = "agent_configuration";
const METHODOLOGY_STEPS: [&str; 4] = ["analyze", "design", "validate", "recommend"];
const METHODOLOGY_GATES: [&str; 3] = [
    "tech_implementation_check",
    "behavior_consistency_check",
    "semantic_accuracy_check",
];
const INTERACTION_TTL_HOURS: i64 = 24;

/// Pass/fail counts over technical tests. Anything else counts as `skip`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResultTally {
    pub pass: usize,
    pub fail: usize,
    pub skip: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TechnicalRecommendations {
    pub infrastructure_suggestions: BTreeMap<ComponentType, usize>,
    pub validation_results_summary: ResultTally,
    pub sre_considerations: Value,
    pub performance_recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BehavioralRecommendations {
    pub consistency_maintained: bool,
    pub methodology_adherence: bool,
    pub cognitive_pattern_validation: bool,
    pub response_quality_assessment: QualityAssessment,
}

#[derive(Debug, Clone, Serialize)]
pub struct SemanticRecommendations {
    pub semantic_bridge_quality: bool,
    pub translation_confidence: f64,
    pub mapping_validation_status: bool,
    pub hallucination_prevention_success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameworkConfiguration {
    pub target_framework: String,
    pub identified_requirements: String,
    pub configuration_template: String,
    pub confidence_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendations {
    pub technical_recommendations: TechnicalRecommendations,
    pub behavioral_recommendations: BehavioralRecommendations,
    pub semantic_recommendations: SemanticRecommendations,
    pub framework_specific_configurations: FrameworkConfiguration,
    pub generation_timestamp: DateTime<Utc>,
    /// Framework name to configuration file contents.
    pub configurations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfilerResponse {
    pub original_request: String,
    pub analysis: IntegratedProfile,
    pub recommendations: Recommendations,
    pub processing_timestamp: DateTime<Utc>,
}

/// Wraps an [`IntegrationLayer`] and speaks in user requests.
pub struct ConversationalProfiler {
    layer: IntegrationLayer,
}

impl ConversationalProfiler {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self::with_layer(IntegrationLayer::new(settings))
    }

    pub fn with_layer(layer: IntegrationLayer) -> Self {
        info!("Conversational profiler ready");
        Self { layer }
    }

    pub fn layer(&self) -> &IntegrationLayer {
        &self.layer
    }

    /// Profile `text` and derive recommendations for `framework_hint`
    /// (`universal` when absent). The exchange is kept in short-term memory
    /// for a day.
    pub fn process_user_request(&self, text: &str, framework_hint: Option<&str>) -> Result<ProfilerResponse> {
        let preview: String = text.chars().take(50).collect();
        info!(request = %preview, "Processing user request");

        let target = json!({
            "user_intent": text,
            "target_framework": framework_hint.unwrap_or(DEFAULT_FRAMEWORK),
            "expected_concept": EXPECTED_CONCEPT,
            "required_methodology": {
                "steps": METHODOLOGY_STEPS,
                "validation_gates": METHODOLOGY_GATES,
            },
        });
        let analysis = self.layer.execute_integrated_profiling(&target)?;
        debug!(score = analysis.integration_score, "Profiling finished");

        let recommendations = recommendations(&analysis);
        let response = ProfilerResponse {
            original_request: text.to_string(),
            analysis,
            recommendations,
            processing_timestamp: Utc::now(),
        };

        self.layer.memory().store(
            MemoryEntry::new(
                format!("interaction_{}", uuid::Uuid::new_v4().simple()),
                json!({
                    "user_input": text,
                    "response": serde_json::to_value(&response)?,
                    "timestamp": Utc::now(),
                }),
                MemoryType::ShortTerm,
            )
            .with_tags(["conversational_profiler", "interaction_log"])
            .with_ttl(TimeDelta::hours(INTERACTION_TTL_HOURS)),
        );
        Ok(response)
    }
}

/// Markdown digest of an integrated profile.
pub fn analysis_summary(analysis: &IntegratedProfile) -> String {
    let mut out = String::from("## Project Analysis Summary\n\n");

    let tests = &analysis.technical_pillar.validation_tests;
    if !tests.is_empty() {
        let passed = analysis.technical_pillar.passed_tests();
        out.push_str("### Technical Analysis\n");
        let _ = writeln!(out, "- Validation tests: {passed}/{} passed", tests.len());
        out.push_str(if passed < tests.len() {
            "- ⚠️ Some technical validations failed - specific remediation may be required\n"
        } else {
            "- ✅ All technical validations passed\n"
        });
    }

    let behavioral = &analysis.behavioral_pillar;
    out.push_str("### Behavioral Analysis\n");
    out.push_str(if behavioral.behavioral_consistency.status == "pass" {
        "- ✅ Behavioral consistency maintained\n"
    } else {
        "- ⚠️ Behavioral consistency concerns identified\n"
    });
    out.push_str(if behavioral.methodology_adherence.status == "pass" {
        "- ✅ Methodology adherence confirmed\n"
    } else {
        "- ⚠️ Methodology adherence issues detected\n"
    });

    let semantic = &analysis.semantic_pillar;
    out.push_str("### Semantic Analysis\n");
    out.push_str(if bridge_succeeded(analysis) {
        "- ✅ Semantic translation successful\n"
    } else {
        "- ⚠️ Semantic translation issues detected\n"
    });
    out.push_str(if semantic.hallucination_prevention.success {
        "- ✅ Hallucination prevention effective\n"
    } else {
        "- ⚠️ Hallucination risks detected\n"
    });

    out.push_str("### Integration Score\n");
    let _ = write!(out, "- Overall system coherence: {:.2}/1.0", analysis.integration_score);
    out
}

/// `0.4·tech + 0.3·behavioral + 0.3·semantic` confidence in the generated
/// configuration.
pub fn configuration_confidence(analysis: &IntegratedProfile) -> f64 {
    let tests = analysis.technical_pillar.validation_tests.len().max(1);
    let tech = analysis.technical_pillar.passed_tests() as f64 / tests as f64;
    let behavioral = if analysis.behavioral_pillar.behavioral_consistency.status == "pass" {
        1.0
    } else {
        0.3
    };
    let semantic = if bridge_succeeded(analysis) { 1.0 } else { 0.4 };
    tech * 0.4 + behavioral * 0.3 + semantic * 0.3
}

/// Starter configuration for `framework`; unknown names get the universal
/// template.
pub fn configuration_template(framework: &str, user_intent: &str, translated_intent: &str) -> String {
    let (title, body) = match framework.to_lowercase().as_str() {
        "autogen" => ("Autogen", AUTOGEN_BODY.to_string()),
        "crewai" => ("CrewAI", CREWAI_BODY.replace("{user_intent}", user_intent)),
        "semantic_kernel" => ("Semantic Kernel", SEMANTIC_KERNEL_BODY.to_string()),
        "langgraph" => ("LangGraph", LANGGRAPH_BODY.to_string()),
        "langroid" => ("Langroid", LANGROID_BODY.to_string()),
        _ => ("Universal", UNIVERSAL_BODY.to_string()),
    };
    format!(
        "# {title} Configuration Template\n# Based on user request: {user_intent}\n# Translated to: {translated_intent}\n{body}"
    )
}

// ── Internal ────────────────────────────────────────────

fn bridge_succeeded(analysis: &IntegratedProfile) -> bool {
    analysis
        .semantic_pillar
        .semantic_bridge
        .bridge()
        .is_some_and(|b| b.overall_success)
}

fn recommendations(analysis: &IntegratedProfile) -> Recommendations {
    let technical = &analysis.technical_pillar;
    let mut tally = ResultTally::default();
    for test in &technical.validation_tests {
        match test.status.as_str() {
            "pass" => tally.pass += 1,
            "fail" => tally.fail += 1,
            _ => tally.skip += 1,
        }
    }
    let performance_recommendations = if tally.fail > 0 {
        vec![format!(
            "Address {} technical validation failures identified in analysis",
            tally.fail
        )]
    } else {
        Vec::new()
    };

    let behavioral = &analysis.behavioral_pillar;
    let semantic = &analysis.semantic_pillar;
    let bridge = semantic.semantic_bridge.bridge();

    let user_intent = analysis
        .input
        .get("user_intent")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let target_framework = analysis
        .input
        .get("target_framework")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_FRAMEWORK)
        .to_string();
    let translated_intent = bridge
        .map(|b| b.translation_result.translated_intent.clone())
        .unwrap_or_else(|| "Unknown translation".into());
    let configuration_template = configuration_template(&target_framework, user_intent, &translated_intent);

    Recommendations {
        technical_recommendations: TechnicalRecommendations {
            infrastructure_suggestions: technical.infrastructure.components_by_type.clone(),
            validation_results_summary: tally,
            sre_considerations: technical.sre_metrics.reliability_metrics.clone(),
            performance_recommendations,
        },
        behavioral_recommendations: BehavioralRecommendations {
            consistency_maintained: behavioral.behavioral_consistency.status == "pass",
            methodology_adherence: behavioral.methodology_adherence.status == "pass",
            cognitive_pattern_validation: behavioral.cognitive_patterns.status == "pass",
            response_quality_assessment: behavioral.response_coordination.quality_assessment.clone(),
        },
        semantic_recommendations: SemanticRecommendations {
            semantic_bridge_quality: bridge.is_some_and(|b| b.overall_success),
            translation_confidence: bridge.map_or(0.0, |b| b.translation_result.confidence),
            mapping_validation_status: semantic.mapping_validation.status == "pass",
            hallucination_prevention_success: semantic.hallucination_prevention.success,
        },
        configurations: BTreeMap::from([(target_framework.clone(), configuration_template.clone())]),
        framework_specific_configurations: FrameworkConfiguration {
            target_framework,
            identified_requirements: translated_intent,
            configuration_template,
            confidence_score: configuration_confidence(analysis),
        },
        generation_timestamp: Utc::now(),
    }
}

const AUTOGEN_BODY: &str = r#"
from autogen import ConversableAgent, GroupChat, GroupChatManager

# Example configuration
user_proxy = ConversableAgent(
    name="user_proxy",
    llm_config=False,
    is_termination_msg=lambda msg: "TERMINATE" in msg.get("content", ""),
    human_input_mode="ALWAYS",
    max_consecutive_auto_reply=5,
)

# Additional agents would be configured based on detailed requirements
"#;

const CREWAI_BODY: &str = r#"
from crewai import Agent, Task

# Example configuration
task = Task(
    description="{user_intent}",
    expected_output="Detailed implementation plan"
)

# Agents and tasks would be configured based on detailed requirements
"#;

const SEMANTIC_KERNEL_BODY: &str = r#"
import semantic_kernel as sk
from semantic_kernel.connectors.ai.open_ai import OpenAIChatCompletion

# Example configuration
kernel = sk.Kernel()
kernel.add_chat_service("gpt", OpenAIChatCompletion(service_id="chat-gpt", ai_model_id="gpt-4"))

# Plugins and functions would be configured based on detailed requirements
"#;

const LANGGRAPH_BODY: &str = "
from langgraph.graph import StateGraph

# Example configuration
# Graph structure would be configured based on detailed requirements
";

const LANGROID_BODY: &str = "
from langroid.agent.base_agent import BaseAgent
from langroid.my_agent import MyAgent

# Example configuration
# Agent interactions would be configured based on detailed requirements
";

const UNIVERSAL_BODY: &str = "
# This is a conceptual template that would be refined based on
# detailed requirements analysis from all three pillars
";

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &str =
        "I need to set up a multi-agent system where agents can collaborate to solve research tasks";

    fn profiler() -> ConversationalProfiler {
        ConversationalProfiler::new(Arc::new(Settings::default()))
    }

    #[test]
    fn templates_fall_back_to_universal() {
        let text = configuration_template("Haystack", "do things", "do things");
        assert!(text.starts_with("# Universal Configuration Template\n"));
        assert!(text.contains("# Based on user request: do things\n"));
    }

    #[test]
    fn framework_name_is_case_insensitive() {
        let text = configuration_template("AutoGen", "chat", "GroupChat");
        assert!(text.starts_with("# Autogen Configuration Template"));
        assert!(text.contains("from autogen import ConversableAgent, GroupChat, GroupChatManager"));
    }

    #[test]
    fn crewai_template_embeds_the_request() {
        let text = configuration_template("crewai", "plan a launch", "plan a launch");
        assert!(text.contains(r#"description="plan a launch","#));
    }

    #[test]
    fn hint_selects_framework_configuration() {
        let response = profiler().process_user_request(REQUEST, Some("autogen")).unwrap();
        let config = &response.recommendations.framework_specific_configurations;
        assert_eq!(config.target_framework, "autogen");
        assert!(config.configuration_template.starts_with("# Autogen Configuration Template"));
        assert!(response.recommendations.configurations.contains_key("autogen"));
        assert!((0.0..=1.0).contains(&config.confidence_score));
    }

    #[test]
    fn missing_hint_means_universal() {
        let response = profiler().process_user_request(REQUEST, None).unwrap();
        assert_eq!(response.analysis.input["target_framework"], "universal");
        assert!(response.recommendations.configurations.contains_key("universal"));
    }

    #[test]
    fn tally_covers_every_technical_test() {
        let response = profiler().process_user_request(REQUEST, Some("crewai")).unwrap();
        let tally = response.recommendations.technical_recommendations.validation_results_summary;
        assert_eq!(
            tally.pass + tally.fail + tally.skip,
            response.analysis.technical_pillar.validation_tests.len()
        );
        let advice = &response.recommendations.technical_recommendations.performance_recommendations;
        assert_eq!(advice.is_empty(), tally.fail == 0);
    }

    #[test]
    fn interaction_is_logged_to_memory() {
        let profiler = profiler();
        profiler.process_user_request(REQUEST, None).unwrap();
        let logged = profiler.layer().memory().search(&["interaction_log"], Some(MemoryType::ShortTerm));
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].content["user_input"], REQUEST);
    }

    #[test]
    fn summary_has_every_section() {
        let response = profiler().process_user_request(REQUEST, Some("autogen")).unwrap();
        let summary = analysis_summary(&response.analysis);
        assert!(summary.starts_with("## Project Analysis Summary\n\n"));
        for heading in ["### Behavioral Analysis", "### Semantic Analysis", "### Integration Score"] {
            assert!(summary.contains(heading), "missing {heading}");
        }
        assert!(summary.ends_with(&format!("{:.2}/1.0", response.analysis.integration_score)));
    }
}
