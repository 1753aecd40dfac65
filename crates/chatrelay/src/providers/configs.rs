pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const TOGETHER_HOST: &str = "https://api.together.xyz";

// Unified enum to wrap different provider configurations
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    Anthropic(AnthropicProviderConfig),
    OpenAi(OpenAiProviderConfig),
    Together(TogetherProviderConfig),
}

#[derive(Debug, Clone)]
pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct TogetherProviderConfig {
    pub host: String,
    pub api_key: String,
}
