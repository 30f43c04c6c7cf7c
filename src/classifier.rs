//! Keyword classifier for security signalements.
//!
//! The rules are an ordered list of (category, keywords). A message is assigned
//! the first category whose keyword list it contains, compared
//! case-insensitively as plain substrings. Messages matching nothing fall into
//! the default category. The result only holds for natures listed in the
//! security whitelist; everything else is `NotConcerned`.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::record::Subcategory;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Static classification settings; `categories` is in priority order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub categories: Vec<CategoryRule>,
    pub default_category: String,
    pub security_natures: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            categories: vec![
                CategoryRule::new(
                    "Agression / Violence",
                    &[
                        "agression", "violent", "frappé", "battu", "violence", "coup",
                        "menace", "bagarre", "rixe", "insulté", "poussé", "bousculé",
                        "menacé", "agressif", "altercation", "gifle", "crachat",
                    ],
                ),
                CategoryRule::new(
                    "Harcèlement / Sexisme",
                    &[
                        "harcèlement", "harcelé", "frottement", "exhibition", "sexiste",
                        "insultes", "outrage", "mains aux fesses",
                        "comportement inapproprié", "frotteur", "exhibitionniste",
                        "remarques", "sexuel", "attouchements", "obscène",
                        "propos sexistes", "gestes déplacés",
                    ],
                ),
                CategoryRule::new(
                    "Malaise / Assistance",
                    &[
                        "malaise", "tombé", "chute", "blessé", "urgence", "assistance",
                        "personne au sol", "sdf", "évanoui", "secours", "aide",
                        "blessure", "urgence médicale", "sans abri",
                        "difficulté respiratoire", "inconscient",
                    ],
                ),
                CategoryRule::new(
                    "Dégradation",
                    &[
                        "dégradation", "cassé", "fracassé", "vandalisme", "tag",
                        "graffiti", "abîmé", "détruit", "vitre cassée", "siège arraché",
                        "détérioration", "brisé",
                    ],
                ),
            ],
            default_category: "Incivilité / Conflit / Autre".to_string(),
            security_natures: [
                "sécurité",
                "violence physique",
                "violence verbale",
                "harcèlement sexiste",
                "violence sexuelle",
            ]
            .iter()
            .map(|n| n.to_string())
            .collect(),
        }
    }
}

struct CompiledRule {
    name: String,
    // None when the rule has no keywords: such a rule never matches
    pattern: Option<Regex>,
}

/// Compiled form of a [`ClassifierConfig`].
pub struct KeywordClassifier {
    rules: Vec<CompiledRule>,
    default_category: String,
    security_natures: HashSet<String>,
}

impl KeywordClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, regex::Error> {
        let rules = config
            .categories
            .iter()
            .map(|rule| {
                let keywords: Vec<String> = rule
                    .keywords
                    .iter()
                    .filter(|k| !k.is_empty())
                    .map(|k| regex::escape(k))
                    .collect();
                let pattern = if keywords.is_empty() {
                    None
                } else {
                    Some(
                        RegexBuilder::new(&keywords.join("|"))
                            .case_insensitive(true)
                            .build()?,
                    )
                };
                Ok(CompiledRule {
                    name: rule.name.clone(),
                    pattern,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        debug!(
            "Compiled {} keyword categories (default '{}')",
            rules.len(),
            config.default_category
        );

        Ok(Self {
            rules,
            default_category: config.default_category.clone(),
            security_natures: config
                .security_natures
                .iter()
                .map(|n| n.trim().to_lowercase())
                .collect(),
        })
    }

    /// First category in priority order whose keywords occur in `message`.
    pub fn match_category(&self, message: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| {
                rule.pattern
                    .as_ref()
                    .is_some_and(|pattern| pattern.is_match(message))
            })
            .map(|rule| rule.name.as_str())
            .unwrap_or(&self.default_category)
    }

    pub fn is_security_nature(&self, nature: &str) -> bool {
        self.security_natures.contains(&nature.to_lowercase())
    }

    /// `message` is `None` when the file has no message column at all.
    pub fn classify(&self, message: Option<&str>, nature: &str) -> Subcategory {
        let Some(message) = message else {
            return Subcategory::NotApplicable;
        };
        if !self.is_security_nature(nature) {
            return Subcategory::NotConcerned;
        }
        Subcategory::Classified(self.match_category(message).to_string())
    }
}
