//! Classification output.

use serde::{Deserialize, Serialize};

use crate::types::entry::{Capabilities, EntryType};

/// Channel a classified endpoint is routed to downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKey {
    UrlPool,
    Rss,
    Sitemap,
    SearchTemplate,
    OfficialApi,
}

impl ChannelKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKey::UrlPool => "url_pool",
            ChannelKey::Rss => "rss",
            ChannelKey::Sitemap => "sitemap",
            ChannelKey::SearchTemplate => "search_template",
            ChannelKey::OfficialApi => "official_api",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "url_pool" => Some(ChannelKey::UrlPool),
            "rss" => Some(ChannelKey::Rss),
            "sitemap" => Some(ChannelKey::Sitemap),
            "search_template" => Some(ChannelKey::SearchTemplate),
            "official_api" => Some(ChannelKey::OfficialApi),
            _ => None,
        }
    }

    /// The fixed channel for each entry type.
    pub fn for_entry_type(entry_type: EntryType) -> Self {
        match entry_type {
            EntryType::DomainRoot => ChannelKey::UrlPool,
            EntryType::Sitemap => ChannelKey::Sitemap,
            EntryType::Rss => ChannelKey::Rss,
            EntryType::SearchTemplate => ChannelKey::SearchTemplate,
            EntryType::OfficialApi => ChannelKey::OfficialApi,
        }
    }
}

/// Which stage of the decision pipeline produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    Rule,
    Llm,
    Fallback,
}

/// Validated output of the classification engine for one candidate URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub entry_type: EntryType,
    pub channel_key: ChannelKey,
    pub template: Option<String>,
    pub validated: bool,
    pub source: RecommendationSource,
    pub capabilities: Capabilities,
    /// Identifier suggestion from the model, already pattern-checked.
    pub symbol_suggestion: Option<String>,
}

impl Recommendation {
    /// The deterministic last-resort recommendation.
    pub fn fallback() -> Self {
        Recommendation {
            entry_type: EntryType::DomainRoot,
            channel_key: ChannelKey::UrlPool,
            template: None,
            validated: false,
            source: RecommendationSource::Fallback,
            capabilities: Capabilities::for_entry_type(EntryType::DomainRoot),
            symbol_suggestion: None,
        }
    }

    pub fn rule(entry_type: EntryType, template: Option<String>) -> Self {
        Recommendation {
            entry_type,
            channel_key: ChannelKey::for_entry_type(entry_type),
            template,
            validated: true,
            source: RecommendationSource::Rule,
            capabilities: Capabilities::for_entry_type(entry_type),
            symbol_suggestion: None,
        }
    }
}
