//! Response template registry
//!
//! Every response the service produces is generated from one of a fixed set of
//! templates. A template pairs a system prompt with special instructions and
//! lists the alias phrases that also select it.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use super::prompts;
use crate::errors::NexqaError;
use crate::errors::Result;

/// Canonical response types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Ask,
    Summary,
    TestcaseExcel,
    Validate,
    TestStrategy,
    Risk,
}

impl ActionType {
    pub const ALL: [Self; 6] = [
        Self::Ask,
        Self::Summary,
        Self::TestcaseExcel,
        Self::Validate,
        Self::TestStrategy,
        Self::Risk,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ask => "ask",
            Self::Summary => "summary",
            Self::TestcaseExcel => "testcase_excel",
            Self::Validate => "validate",
            Self::TestStrategy => "test_strategy",
            Self::Risk => "risk",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = NexqaError;

    /// Exact canonical names only; aliases go through [`TemplateRegistry::resolve`]
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| NexqaError::InvalidRequest(format!("unknown response type '{s}'")))
    }
}

/// Prompt pair and selection aliases for one response type
#[derive(Debug, Clone, Copy)]
pub struct ActionTemplate {
    pub action: ActionType,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    pub system_prompt: &'static str,
    pub special_prompt: &'static str,
}

const TEMPLATES: [ActionTemplate; 6] = [
    ActionTemplate {
        action: ActionType::Ask,
        aliases: &["question", "answer", "general"],
        description: "Answer a question using the retrieved documents",
        system_prompt: prompts::QA_PROMPT,
        special_prompt: "Provide a comprehensive answer based on the context.",
    },
    ActionTemplate {
        action: ActionType::Summary,
        aliases: &["summarize", "summarise", "overview"],
        description: "Summarize the retrieved documents",
        system_prompt: prompts::QA_PROMPT,
        special_prompt: "Summarize the context in concise bullet points or paragraphs.",
    },
    ActionTemplate {
        action: ActionType::TestcaseExcel,
        aliases: &[
            "excel",
            "xlsx",
            "test_case_excel",
            "testcase",
            "test_cases",
            "tc",
            "generate test",
            "test_case",
        ],
        description: "Generate test cases as a table ready for spreadsheet export",
        system_prompt: prompts::TESTCASE_PROMPT,
        special_prompt: prompts::TESTCASE_PROMPT,
    },
    ActionTemplate {
        action: ActionType::Validate,
        aliases: &["validate test", "check test", "review test", "improve test"],
        description: "Review existing test cases and add the missing ones",
        system_prompt: prompts::TESTCASE_VALIDATE_PROMPT,
        special_prompt: prompts::TESTCASE_VALIDATE_PROMPT,
    },
    ActionTemplate {
        action: ActionType::TestStrategy,
        aliases: &["strategy", "test plan", "test approach", "test scope"],
        description: "Draft a test strategy document",
        system_prompt: prompts::STRATEGY_PROMPT,
        special_prompt: prompts::STRATEGY_PROMPT,
    },
    ActionTemplate {
        action: ActionType::Risk,
        aliases: &["risk assessment", "risk analysis", "potential risk"],
        description: "Produce a risk assessment",
        system_prompt: prompts::RISK_PROMPT,
        special_prompt: prompts::RISK_PROMPT,
    },
];

/// How an intent string was matched to a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    Alias,
    Default,
}

/// Validated, read-only lookup from intent strings to templates
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<ActionType, ActionTemplate>,
    aliases: HashMap<&'static str, ActionType>,
}

impl TemplateRegistry {
    /// The built-in registry
    ///
    /// # Errors
    /// Fails if the built-in table violates a registry invariant
    pub fn builtin() -> Result<Self> {
        Self::from_templates(&TEMPLATES)
    }

    /// Build and validate a registry.
    ///
    /// Every [`ActionType`] needs exactly one template, alias phrases must be
    /// unique and must not shadow a canonical name, and every classifier
    /// intent must resolve without falling through to the default.
    pub fn from_templates(templates: &[ActionTemplate]) -> Result<Self> {
        let mut by_action = HashMap::new();
        for template in templates {
            if by_action.insert(template.action, *template).is_some() {
                return Err(NexqaError::Config(format!(
                    "duplicate template for '{}'",
                    template.action
                )));
            }
        }
        if let Some(missing) = ActionType::ALL.iter().find(|a| !by_action.contains_key(a)) {
            return Err(NexqaError::Config(format!("no template for '{missing}'")));
        }

        let mut aliases = HashMap::new();
        for template in templates {
            for alias in template.aliases {
                if ActionType::from_str(alias).is_ok() {
                    return Err(NexqaError::Config(format!(
                        "alias '{alias}' shadows a response type"
                    )));
                }
                if let Some(previous) = aliases.insert(*alias, template.action) {
                    return Err(NexqaError::Config(format!(
                        "alias '{alias}' claimed by both '{previous}' and '{}'",
                        template.action
                    )));
                }
            }
        }

        let registry = Self {
            templates: by_action,
            aliases,
        };
        for intent in super::classifier::CANDIDATE_INTENTS {
            if registry.resolve_with_tier(intent).1 == MatchTier::Default {
                return Err(NexqaError::Config(format!(
                    "classifier intent '{intent}' has no template"
                )));
            }
        }
        Ok(registry)
    }

    /// Template for `intent`: exact name, then alias, then `ask`
    pub fn resolve(&self, intent: &str) -> &ActionTemplate {
        self.resolve_with_tier(intent).0
    }

    pub fn resolve_with_tier(&self, intent: &str) -> (&ActionTemplate, MatchTier) {
        if let Ok(action) = ActionType::from_str(intent) {
            return (self.get(action), MatchTier::Exact);
        }
        if let Some(action) = self.aliases.get(intent) {
            return (self.get(*action), MatchTier::Alias);
        }
        (self.get(ActionType::Ask), MatchTier::Default)
    }

    pub fn get(&self, action: ActionType) -> &ActionTemplate {
        // Construction guarantees every action is present
        &self.templates[&action]
    }

    pub fn templates(&self) -> impl Iterator<Item = &ActionTemplate> {
        ActionType::ALL.iter().map(|action| self.get(*action))
    }
}
