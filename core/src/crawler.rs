//! Decides whether a requester should get fully enumerated, link-only
//! content instead of the interactive list.

/// Where the list is being rendered for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeContext {
    /// No interactive client at all (piped output, pre-rendering)
    NoClientRuntime,
    /// Interactive client, optionally identified by a user agent
    Client { user_agent: Option<String> },
}

impl RuntimeContext {
    pub fn client(user_agent: impl Into<String>) -> Self {
        RuntimeContext::Client {
            user_agent: Some(user_agent.into()),
        }
    }
}

/// Result of [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub is_crawler_like: bool,
}

/// Lowercase signatures of search engines, link preview fetchers and
/// generic automation.
const CRAWLER_SIGNATURES: &[&str] = &[
    "googlebot",
    "google-inspectiontool",
    "adsbot-google",
    "mediapartners-google",
    "bingbot",
    "bingpreview",
    "slurp",
    "duckduckbot",
    "baiduspider",
    "yandexbot",
    "yandex.com/bots",
    "sogou",
    "exabot",
    "applebot",
    "petalbot",
    "semrushbot",
    "ahrefsbot",
    "mj12bot",
    "facebookexternalhit",
    "facebot",
    "twitterbot",
    "linkedinbot",
    "slackbot",
    "slack-imgproxy",
    "discordbot",
    "telegrambot",
    "whatsapp",
    "pinterest",
    "redditbot",
    "embedly",
    "quora link preview",
    "skypeuripreview",
    "vkshare",
    "ia_archiver",
    "headless",
    "lighthouse",
    "bot",
    "spider",
    "crawler",
    "crawl",
];

/// Classify a runtime context.
///
/// No client runtime is always crawler-equivalent. A client is
/// crawler-like when its user agent contains a known signature, compared
/// case-insensitively. A missing or empty agent is a regular user.
pub fn classify(context: &RuntimeContext) -> Verdict {
    let is_crawler_like = match context {
        RuntimeContext::NoClientRuntime => true,
        RuntimeContext::Client { user_agent } => user_agent
            .as_deref()
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
            .is_some_and(matches_signature),
    };
    Verdict { is_crawler_like }
}

fn matches_signature(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    CRAWLER_SIGNATURES.iter().any(|sig| ua.contains(sig))
}
