//! Logical model names and the provider model strings they route to
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::errors::{RelayError, RelayResult};
use crate::models::message::TurnRole;
use crate::providers::base::ProviderKind;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumString,
    AsRefStr,
    Display,
    Serialize,
    Deserialize,
)]
pub enum LogicalModel {
    #[strum(serialize = "claude-3-5-sonnet")]
    #[serde(rename = "claude-3-5-sonnet")]
    Claude35Sonnet,
    #[strum(serialize = "claude-3-7-sonnet")]
    #[serde(rename = "claude-3-7-sonnet")]
    Claude37Sonnet,
    #[strum(serialize = "chatgpt-4o")]
    #[serde(rename = "chatgpt-4o")]
    ChatGpt4o,
    #[strum(serialize = "o3-mini")]
    #[serde(rename = "o3-mini")]
    O3Mini,
    #[strum(serialize = "deepseek-r1")]
    #[serde(rename = "deepseek-r1")]
    DeepSeekR1,
    #[strum(serialize = "deepseek-v3")]
    #[serde(rename = "deepseek-v3")]
    DeepSeekV3,
}

impl LogicalModel {
    pub fn parse(name: &str) -> RelayResult<Self> {
        Self::from_str(name).map_err(|_| RelayError::UnsupportedModel(name.to_string()))
    }

    pub fn provider(&self) -> ProviderKind {
        match self {
            LogicalModel::Claude35Sonnet | LogicalModel::Claude37Sonnet => ProviderKind::Anthropic,
            LogicalModel::ChatGpt4o | LogicalModel::O3Mini => ProviderKind::OpenAi,
            LogicalModel::DeepSeekR1 | LogicalModel::DeepSeekV3 => ProviderKind::Together,
        }
    }

    /// Snapshot the model resolves to unless configuration says otherwise
    pub fn default_model_string(&self) -> &'static str {
        match self {
            LogicalModel::Claude35Sonnet => "claude-3-5-sonnet-20241022",
            LogicalModel::Claude37Sonnet => "claude-3-7-sonnet-20250219",
            LogicalModel::ChatGpt4o => "chatgpt-4o-latest",
            LogicalModel::O3Mini => "o3-mini-2025-01-31",
            LogicalModel::DeepSeekR1 => "deepseek-ai/DeepSeek-R1",
            LogicalModel::DeepSeekV3 => "deepseek-ai/DeepSeek-V3",
        }
    }

    /// Role of the leading instructions turn for in-band system text
    pub fn instructions_role(&self) -> TurnRole {
        match self {
            LogicalModel::O3Mini => TurnRole::Developer,
            _ => TurnRole::System,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedModel {
    #[serde(rename = "name")]
    pub logical: LogicalModel,
    pub provider: ProviderKind,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    models: HashMap<LogicalModel, String>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        let models = LogicalModel::iter()
            .map(|logical| (logical, logical.default_model_string().to_string()))
            .collect();
        Self { models }
    }
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override<S: Into<String>>(mut self, logical: LogicalModel, model: S) -> Self {
        self.models.insert(logical, model.into());
        self
    }

    /// Apply overrides keyed by logical name; `_` is accepted in place of `-`
    /// since environment derived keys cannot carry dashes.
    pub fn with_overrides<'a, I>(self, overrides: I) -> RelayResult<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        overrides.into_iter().try_fold(self, |catalog, (name, model)| {
            let logical = LogicalModel::parse(&name.replace('_', "-"))?;
            Ok(catalog.with_override(logical, model.as_str()))
        })
    }

    pub fn resolve(&self, name: &str) -> RelayResult<ResolvedModel> {
        let logical = LogicalModel::parse(name)?;
        Ok(self.resolve_logical(logical))
    }

    pub fn resolve_logical(&self, logical: LogicalModel) -> ResolvedModel {
        let model = self
            .models
            .get(&logical)
            .cloned()
            .unwrap_or_else(|| logical.default_model_string().to_string());

        ResolvedModel {
            logical,
            provider: logical.provider(),
            model,
        }
    }

    /// Every supported model, in declaration order
    pub fn entries(&self) -> Vec<ResolvedModel> {
        LogicalModel::iter()
            .map(|logical| self.resolve_logical(logical))
            .collect()
    }
}
