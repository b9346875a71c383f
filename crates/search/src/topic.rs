use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse subject of a question, used to gate detectors and stoplists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Auth,
    Db,
    Api,
    State,
    Components,
    Errors,
    Config,
    Unknown,
}

impl Topic {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Db => "db",
            Self::Api => "api",
            Self::State => "state",
            Self::Components => "components",
            Self::Errors => "errors",
            Self::Config => "config",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checked in order; the first matching rule decides the topic.
static TOPIC_RULES: Lazy<Vec<(Topic, Regex)>> = Lazy::new(|| {
    [
        (
            Topic::Auth,
            r"\b(auth\w*|log[ -]?in|log[ -]?out|sign[ -]?(in|up|out)|session\w*|jwt|oauth\w*|passwords?|credentials?|permissions?|rbac|clerk|nextauth)\b",
        ),
        (
            Topic::Db,
            r"\b(databases?|db|sql\w*|postgres\w*|mysql|mongo\w*|prisma|drizzle|orm|schemas?|migrations?|tables?|persist\w*|storage|repositor(y|ies)|supabase)\b",
        ),
        (
            Topic::Api,
            r"\b(api|apis|endpoints?|routes?|router|routing|rest|graphql|handlers?|controllers?|requests?|http|webhooks?)\b",
        ),
        (
            Topic::State,
            r"\b(state|stores?|redux|zustand|recoil|jotai|pinia|vuex|reducers?|signals?|context)\b",
        ),
        (
            Topic::Components,
            r"\b(components?|ui|buttons?|modals?|forms?|pages?|layouts?|views?|render\w*|jsx|tsx|widgets?|screens?)\b",
        ),
        (
            Topic::Errors,
            r"\b(errors?|exceptions?|crash\w*|fail\w*|bugs?|stack ?traces?|throw\w*|panic\w*|debug\w*)\b",
        ),
        (
            Topic::Config,
            r"\b(config\w*|settings?|env|environment|dotenv|options|flags?)\b",
        ),
    ]
    .into_iter()
    .map(|(topic, pattern)| {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .expect("topic regex");
        (topic, regex)
    })
    .collect()
});

#[must_use]
pub fn classify_topic(query: &str) -> Topic {
    TOPIC_RULES
        .iter()
        .find(|(_, regex)| regex.is_match(query))
        .map_or(Topic::Unknown, |(topic, _)| *topic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        assert_eq!(classify_topic("auth supabase login"), Topic::Auth);
        assert_eq!(classify_topic("database initialization"), Topic::Db);
        assert_eq!(classify_topic("which API route lists users"), Topic::Api);
        assert_eq!(classify_topic("where is the redux store"), Topic::State);
        assert_eq!(classify_topic("Header component props"), Topic::Components);
        assert_eq!(classify_topic("why does it crash on boot"), Topic::Errors);
        assert_eq!(classify_topic("read the config"), Topic::Config);
        // auth is checked before db
        assert_eq!(classify_topic("session table schema"), Topic::Auth);
    }

    #[test]
    fn matching_is_case_insensitive_and_word_bounded() {
        assert_eq!(classify_topic("DATABASE"), Topic::Db);
        assert_eq!(classify_topic("authorization"), Topic::Auth);
        assert_eq!(classify_topic("rapid"), Topic::Unknown);
        assert_eq!(classify_topic(""), Topic::Unknown);
    }

    #[test]
    fn topic_names_are_lowercase() {
        assert_eq!(Topic::Components.as_str(), "components");
        assert_eq!(Topic::Unknown.to_string(), "unknown");
    }
}
