use serde::{Deserialize, Serialize};

/// Lifecycle of a company-context analysis row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Scraping,
    Researching,
    Analyzing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub const ALL: [AnalysisStatus; 6] = [
        AnalysisStatus::Pending,
        AnalysisStatus::Scraping,
        AnalysisStatus::Researching,
        AnalysisStatus::Analyzing,
        AnalysisStatus::Completed,
        AnalysisStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Scraping => "scraping",
            AnalysisStatus::Researching => "researching",
            AnalysisStatus::Analyzing => "analyzing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }
}

/// Outcome of a seed request. The serialized names are part of the API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeedReason {
    Triggered,
    Success,
    NoResults,
    AlreadyExists,
    NoApiKey,
}

impl SeedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeedReason::Triggered => "triggered",
            SeedReason::Success => "success",
            SeedReason::NoResults => "no_results",
            SeedReason::AlreadyExists => "already_exists",
            SeedReason::NoApiKey => "no_api_key",
        }
    }

    /// Whether the caller should consider the topics seeded.
    pub fn seeded(&self) -> bool {
        matches!(self, SeedReason::Triggered | SeedReason::Success)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutboxKind {
    IngestNews,
    AnalyzeCompany,
}

impl OutboxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxKind::IngestNews => "ingest_news",
            OutboxKind::AnalyzeCompany => "analyze_company",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ingest_news" => Some(OutboxKind::IngestNews),
            "analyze_company" => Some(OutboxKind::AnalyzeCompany),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Pending,
    Published,
    Failed,
    Cancelled,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
            PostStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PostStatus::Pending),
            "published" => Some(PostStatus::Published),
            "failed" => Some(PostStatus::Failed),
            "cancelled" => Some(PostStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Anyone,
    Connections,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Anyone => "anyone",
            Visibility::Connections => "connections",
        }
    }
}

/// Providers a user may bring their own key for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeyProvider {
    Openrouter,
    Perplexity,
    Tavily,
    RemoveBg,
}

impl KeyProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyProvider::Openrouter => "openrouter",
            KeyProvider::Perplexity => "perplexity",
            KeyProvider::Tavily => "tavily",
            KeyProvider::RemoveBg => "remove_bg",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "openrouter" => Some(KeyProvider::Openrouter),
            "perplexity" => Some(KeyProvider::Perplexity),
            "tavily" => Some(KeyProvider::Tavily),
            "remove_bg" => Some(KeyProvider::RemoveBg),
            _ => None,
        }
    }
}

/// Message kinds accepted from the browser extension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    Profile,
    Posts,
    Analytics,
}

impl SyncType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "profile" => Some(SyncType::Profile),
            "posts" => Some(SyncType::Posts),
            "analytics" => Some(SyncType::Analytics),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_status_round_trips_through_str() {
        for st in AnalysisStatus::ALL {
            assert_eq!(AnalysisStatus::parse(st.as_str()), Some(st));
        }
        assert_eq!(AnalysisStatus::parse("done"), None);
    }

    #[test]
    fn seed_reason_serializes_as_api_names() {
        let v = serde_json::to_value(SeedReason::AlreadyExists).unwrap();
        assert_eq!(v, "already_exists");
        assert!(SeedReason::Triggered.seeded());
        assert!(!SeedReason::NoResults.seeded());
    }
}
