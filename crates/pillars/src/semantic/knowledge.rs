//! Static domain knowledge: supported frameworks, phrase mappings and the
//! seed knowledge graphs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use triad_core::PillarError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainFramework {
    Autogen,
    Langroid,
    SemanticKernel,
    Crewai,
    Langgraph,
}

impl DomainFramework {
    pub const ALL: [DomainFramework; 5] = [
        Self::Autogen,
        Self::Langroid,
        Self::SemanticKernel,
        Self::Crewai,
        Self::Langgraph,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Autogen => "autogen",
            Self::Langroid => "langroid",
            Self::SemanticKernel => "semantic_kernel",
            Self::Crewai => "crewai",
            Self::Langgraph => "langgraph",
        }
    }
}

impl fmt::Display for DomainFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainFramework {
    type Err = PillarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| PillarError::UnknownFramework(s.to_string()))
    }
}

/// Everyday phrasing and the technical wording it is rewritten to.
pub const GENERAL_MAPPINGS: &[(&str, &str)] = &[
    ("make it talk to the other one", "register a Converseable Agent with a GroupChatManager"),
    ("connect them together", "establish communication protocol between agents"),
    ("work as a team", "configure collaborative agent framework"),
    ("coordinate activities", "implement coordination mechanisms"),
    ("share information", "configure shared memory or communication channel"),
    ("learn from each other", "implement knowledge transfer protocols"),
    (
        "make the agents talk to each other",
        "create a GroupChat with ConverseableAgent instances and register them",
    ),
];

pub const AUTOGEN_MAPPINGS: &[(&str, &str)] = &[
    ("conversable agent", "ConversableAgent"),
    ("group chat manager", "GroupChatManager"),
    ("user proxy", "UserProxyAgent"),
    ("assistant", "AssistantAgent"),
    ("llm config", "llm_config"),
    ("group chat", "GroupChat"),
    ("converseable agent", "ConversableAgent"),
];

pub const CREWAI_MAPPINGS: &[(&str, &str)] = &[
    ("agent", "CrewAgent"),
    ("task", "CrewTask"),
    ("crew", "Crew"),
    ("tools", "CrewTools"),
];

/// Mapping tables in the order they are reported.
pub const MAPPING_DOMAINS: [(&str, &[(&str, &str)]); 3] = [
    ("general", GENERAL_MAPPINGS),
    ("autogen", AUTOGEN_MAPPINGS),
    ("crewai", CREWAI_MAPPINGS),
];

/// Phrase table for a framework key, if it has one.
pub fn framework_mappings(key: &str) -> Option<&'static [(&'static str, &'static str)]> {
    MAPPING_DOMAINS
        .iter()
        .find(|(domain, _)| *domain != "general" && *domain == key)
        .map(|(_, table)| *table)
}

/// One node of a knowledge graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Concept {
    pub description: String,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<String>,
    #[serde(default)]
    pub usage_examples: Vec<String>,
}

impl Concept {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_properties(mut self, items: &[&str]) -> Self {
        self.properties = items.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_relationships(mut self, items: &[&str]) -> Self {
        self.relationships = items.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_examples(mut self, items: &[&str]) -> Self {
        self.usage_examples = items.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Concept type (`agents`, `chats`, ...) to concept name to concept.
pub type KnowledgeGraph = BTreeMap<String, BTreeMap<String, Concept>>;

pub fn default_graphs() -> BTreeMap<DomainFramework, KnowledgeGraph> {
    let mut graphs: BTreeMap<DomainFramework, KnowledgeGraph> =
        DomainFramework::ALL.into_iter().map(|f| (f, KnowledgeGraph::new())).collect();

    let autogen = graphs.entry(DomainFramework::Autogen).or_default();
    autogen.insert(
        "agents".into(),
        BTreeMap::from([
            (
                "ConversableAgent".to_string(),
                Concept::new("An agent that can engage in conversations")
                    .with_properties(&["llm_config", "human_input_mode", "max_consecutive_auto_reply"])
                    .with_relationships(&["GroupChatManager", "UserProxyAgent", "AssistantAgent"])
                    .with_examples(&[
                        "ConversableAgent(name='user_proxy', llm_config=False, human_input_mode='ALWAYS')",
                        "ConversableAgent(name='assistant', llm_config={'config_list': config_list})",
                    ]),
            ),
            (
                "AssistantAgent".to_string(),
                Concept::new("A subclass of ConversableAgent with specific default settings for assistants")
                    .with_properties(&["llm_config", "system_message", "human_input_mode"])
                    .with_relationships(&["ConversableAgent"])
                    .with_examples(&["AssistantAgent(name='assistant', llm_config={'config_list': config_list})"]),
            ),
            (
                "UserProxyAgent".to_string(),
                Concept::new("A subclass of ConversableAgent that can represent a human user")
                    .with_properties(&["human_input_mode", "max_consecutive_auto_reply", "code_execution_config"])
                    .with_relationships(&["ConversableAgent"])
                    .with_examples(&[
                        "UserProxyAgent(name='user_proxy', code_execution_config=False, human_input_mode='TERMINATE')",
                    ]),
            ),
        ]),
    );
    autogen.insert(
        "chats".into(),
        BTreeMap::from([
            (
                "GroupChat".to_string(),
                Concept::new("A group chat environment for multiple agents")
                    .with_properties(&["agents", "admin_name", "max_round", "speaker_selection_method"])
                    .with_relationships(&["ConversableAgent"])
                    .with_examples(&["GroupChat(agents=agent_list, messages=[], max_round=12)"]),
            ),
            (
                "GroupChatManager".to_string(),
                Concept::new("Manages group conversations between agents")
                    .with_properties(&["agents", "admin_name", "max_round", "speaker_selection_method"])
                    .with_relationships(&["ConversableAgent", "GroupChat"])
                    .with_examples(&["GroupChatManager(groupchat=group_chat, llm_config=llm_config)"]),
            ),
        ]),
    );
    autogen.insert(
        "configurations".into(),
        BTreeMap::from([(
            "llm_config".to_string(),
            Concept::new("Configuration for Large Language Model")
                .with_properties(&["config_list", "temperature", "seed"])
                .with_relationships(&["ConversableAgent", "AssistantAgent", "GroupChatManager"])
                .with_examples(&[
                    "{'config_list': [{'model': 'gpt-4', 'api_key': '...'}]}",
                    "{'config_list': config_list, 'temperature': 0.7}",
                ]),
        )]),
    );

    graphs.entry(DomainFramework::Crewai).or_default().insert(
        "agents".into(),
        BTreeMap::from([(
            "CrewAgent".to_string(),
            Concept::new("An intelligent agent in CrewAI framework")
                .with_properties(&["role", "goal", "tools", "verbose"])
                .with_relationships(&["CrewTask"]),
        )]),
    );

    graphs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_round_trips_through_its_name() {
        assert_eq!("semantic_kernel".parse::<DomainFramework>().unwrap(), DomainFramework::SemanticKernel);
        assert!("haystack".parse::<DomainFramework>().is_err());
    }

    #[test]
    fn only_autogen_and_crewai_have_phrase_tables() {
        assert_eq!(framework_mappings("autogen").map(<[_]>::len), Some(7));
        assert_eq!(framework_mappings("crewai").map(<[_]>::len), Some(4));
        assert!(framework_mappings("langgraph").is_none());
        assert!(framework_mappings("general").is_none());
    }

    #[test]
    fn seed_graphs_cover_every_framework() {
        let graphs = default_graphs();
        assert_eq!(graphs.len(), 5);
        assert_eq!(graphs[&DomainFramework::Autogen].len(), 3);
        assert!(graphs[&DomainFramework::Langroid].is_empty());
        assert_eq!(graphs[&DomainFramework::Crewai]["agents"]["CrewAgent"].properties.len(), 4);
    }
}
