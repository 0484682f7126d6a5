//! Request headers GitHub and Copilot expect from an editor integration.

use reqwest::RequestBuilder;

pub const GITHUB_BASE_URL: &str = "https://github.com";
pub const GITHUB_API_BASE_URL: &str = "https://api.github.com";

/// VS Code's public OAuth client id.
pub const GITHUB_CLIENT_ID: &str = "Iv1.b507a08c87ecfe98";
pub const GITHUB_APP_SCOPES: &str = "read:user";

pub const EDITOR_VERSION: &str = "vscode/1.99.3";
pub const EDITOR_PLUGIN_VERSION: &str = "copilot-chat/0.26.7";
pub const USER_AGENT: &str = "GitHubCopilotChat/0.26.7";
pub const GITHUB_API_VERSION: &str = "2025-04-01";

/// Headers for `api.github.com` calls authenticated with the GitHub token.
pub fn github_headers(builder: RequestBuilder, github_token: &str) -> RequestBuilder {
    editor_headers(builder)
        .header("authorization", format!("token {}", github_token))
        .header("accept", "application/json")
        .header("x-github-api-version", GITHUB_API_VERSION)
}

/// Editor identification shared by GitHub and Copilot calls.
pub fn editor_headers(builder: RequestBuilder) -> RequestBuilder {
    builder
        .header("editor-version", EDITOR_VERSION)
        .header("editor-plugin-version", EDITOR_PLUGIN_VERSION)
        .header("user-agent", USER_AGENT)
}
