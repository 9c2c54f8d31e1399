//! Typed results for every forced tool call.
//!
//! Each struct is both the tool's parameter schema (generated with
//! `schemars`, field doc comments become descriptions) and the type its
//! arguments are parsed into.

use crate::provider::ToolDefinition;
use needfinder_core::RelevanceScore;
use schemars::{schema_for, JsonSchema};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A classifier result with a fixed tool name and description.
pub trait ToolSchema: JsonSchema + DeserializeOwned {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    /// Semantic checks beyond what deserialization enforces.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    fn definition() -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: Self::DESCRIPTION.to_string(),
            parameters: parameters_schema::<Self>(),
        }
    }
}

/// JSON-object parameter schema for `T`: definitions inlined, no extra
/// properties, every property required.
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let mut value = serde_json::to_value(schema_for!(T)).unwrap_or_default();

    let definitions = match &mut value {
        Value::Object(map) => {
            map.remove("$schema");
            map.remove("title");
            map.remove("definitions")
        }
        _ => None,
    };
    if let Some(definitions) = definitions {
        inline_refs(&mut value, &definitions);
    }
    close_objects(&mut value);
    value
}

fn inline_refs(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(path)) = map.get("$ref").cloned() {
                let name = path.trim_start_matches("#/definitions/");
                if let Some(definition) = definitions.get(name) {
                    *value = definition.clone();
                    inline_refs(value, definitions);
                    return;
                }
            }
            for (_, nested) in map.iter_mut() {
                inline_refs(nested, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                inline_refs(item, definitions);
            }
        }
        _ => {}
    }
}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type") == Some(&Value::String("object".to_string())) {
                map.remove("title");
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(properties)) = map.get("properties") {
                    let required = properties.keys().cloned().map(Value::String).collect();
                    map.insert("required".to_string(), Value::Array(required));
                }
            }
            for (_, nested) in map.iter_mut() {
                close_objects(nested);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                close_objects(item);
            }
        }
        _ => {}
    }
}

/// Restate the need in a single sentence from your perspective.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RestatedNeed {
    /// The restated need.
    pub restated_need: String,
}

impl ToolSchema for RestatedNeed {
    const NAME: &'static str = "restate_need";
    const DESCRIPTION: &'static str =
        "Restate the need in a single sentence from your perspective.";

    fn validate(&self) -> Result<(), String> {
        let text = self.restated_need.trim();
        if text.is_empty() {
            return Err("restated need is empty".to_string());
        }
        if !starts_with_first_person(text) {
            return Err(format!("restated need does not start with \"I\": {text}"));
        }
        Ok(())
    }
}

fn starts_with_first_person(text: &str) -> bool {
    let first = text.split_whitespace().next().unwrap_or_default();
    let first = first.trim_end_matches(|c: char| c.is_ascii_punctuation());
    first == "I" || first.starts_with("I'") || first.starts_with("I\u{2019}")
}

/// A group name and why the group has the problem. Lives only for the
/// duration of one enumeration call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct UserGroup {
    /// A short reason why the user group has the problem.
    pub reason: String,
    /// The name of the user group.
    pub user_group: String,
}

/// Generate a list of user groups who have a problem and a short reason why
/// they have it.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UserGroups {
    /// The full list of user groups who have the problem and a short reason why they have it.
    #[serde(default)]
    pub all_user_groups: Vec<UserGroup>,
    /// The top 3 user groups who have the problem the most.
    #[serde(default)]
    pub top_3_user_groups: Vec<String>,
    /// Some models answer with this name instead of `top_3_user_groups`.
    #[serde(default)]
    #[schemars(skip)]
    pub user_groups: Vec<String>,
}

impl UserGroups {
    /// Exactly three distinct group names: the top-3 selection first, topped
    /// up from the full list when the model repeated itself or came up short.
    pub fn top_three(&self) -> Result<Vec<String>, String> {
        let candidates = self
            .top_3_user_groups
            .iter()
            .chain(self.user_groups.iter())
            .chain(self.all_user_groups.iter().map(|entry| &entry.user_group));

        let mut selected: Vec<String> = Vec::with_capacity(3);
        for name in candidates {
            let name = name.trim();
            if name.is_empty() || selected.iter().any(|s| s.eq_ignore_ascii_case(name)) {
                continue;
            }
            selected.push(name.to_string());
            if selected.len() == 3 {
                return Ok(selected);
            }
        }
        Err(format!(
            "expected 3 distinct user groups, got {}",
            selected.len()
        ))
    }
}

impl ToolSchema for UserGroups {
    const NAME: &'static str = "generate_user_groups";
    const DESCRIPTION: &'static str =
        "Generate a list of user groups who have a problem and a short reason why they have it.";

    fn validate(&self) -> Result<(), String> {
        self.top_three().map(|_| ())
    }
}

/// Summarize the reddit post and how it relates to the given need.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PostSummary {
    /// The summary of the reddit post and how it relates to the need.
    pub summary: String,
}

impl ToolSchema for PostSummary {
    const NAME: &'static str = "summarize";
    const DESCRIPTION: &'static str =
        "Summarize the reddit post and how it relates to the given need.";

    fn validate(&self) -> Result<(), String> {
        if self.summary.trim().is_empty() {
            Err("summary is empty".to_string())
        } else {
            Ok(())
        }
    }
}

/// Determine if the person writing the post explicitly mentions having the
/// given need.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct Applicability {
    /// The explanation for whether the person has the need or not.
    pub explanation: String,
    /// True if the person has the need, false otherwise.
    pub applicable: bool,
}

impl ToolSchema for Applicability {
    const NAME: &'static str = "discern_applicability";
    const DESCRIPTION: &'static str =
        "Determine if the person writing the post explicitly mentions having the given need.";
}

/// Score the relevance of the reddit post to the given need on a scale of 1
/// to 10.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PostRelevance {
    /// The relevance score between 1 and 10.
    #[schemars(range(min = 1, max = 10))]
    #[serde(deserialize_with = "integral_score")]
    pub relevance_score: i64,
}

impl PostRelevance {
    pub fn score(&self) -> Option<RelevanceScore> {
        RelevanceScore::new(self.relevance_score)
    }
}

impl ToolSchema for PostRelevance {
    const NAME: &'static str = "score_post_relevance";
    const DESCRIPTION: &'static str =
        "Score the relevance of the reddit post to the given need on a scale of 1 to 10.";

    fn validate(&self) -> Result<(), String> {
        validate_score(self.relevance_score)
    }
}

/// Score the relevance of the subreddit to the given need on a scale of 1 to
/// 10.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SubredditRelevance {
    /// The relevance score between 1 and 10.
    #[schemars(range(min = 1, max = 10))]
    #[serde(deserialize_with = "integral_score")]
    pub relevance_score: i64,
}

impl SubredditRelevance {
    pub fn score(&self) -> Option<RelevanceScore> {
        RelevanceScore::new(self.relevance_score)
    }
}

impl ToolSchema for SubredditRelevance {
    const NAME: &'static str = "score_subreddit_relevance";
    const DESCRIPTION: &'static str =
        "Score the relevance of the subreddit to the given need on a scale of 1 to 10.";

    fn validate(&self) -> Result<(), String> {
        validate_score(self.relevance_score)
    }
}

/// Accepts `7` and `7.0` alike; a fractional score is a parse error.
fn integral_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(i64),
        Float(f64),
    }

    match Number::deserialize(deserializer)? {
        Number::Int(value) => Ok(value),
        Number::Float(value) if value.fract() == 0.0 && value.abs() <= i64::MAX as f64 => {
            Ok(value as i64)
        }
        Number::Float(value) => Err(de::Error::custom(format!(
            "relevance score {value} is not a whole number"
        ))),
    }
}

fn validate_score(value: i64) -> Result<(), String> {
    RelevanceScore::new(value)
        .map(|_| ())
        .ok_or_else(|| format!("relevance score {value} is outside 1..=10"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_score_schema_has_bounds_and_required_field() {
        let definition = SubredditRelevance::definition();
        assert_eq!(definition.name, "score_subreddit_relevance");

        let params = definition.parameters;
        assert_eq!(params["type"], "object");
        assert_eq!(params["additionalProperties"], false);
        assert_eq!(params["required"], json!(["relevance_score"]));

        let score = &params["properties"]["relevance_score"];
        assert_eq!(score["type"], "integer");
        assert_eq!(score["minimum"], 1.0);
        assert_eq!(score["maximum"], 10.0);
        assert_eq!(score["description"], "The relevance score between 1 and 10.");
        assert!(params.get("$schema").is_none());
    }

    #[test]
    fn test_user_group_schema_is_inlined_and_requires_both_lists() {
        let params = UserGroups::definition().parameters;
        assert!(params.get("definitions").is_none());

        let required = params["required"].as_array().unwrap();
        assert!(required.contains(&json!("all_user_groups")));
        assert!(required.contains(&json!("top_3_user_groups")));

        let item = &params["properties"]["all_user_groups"]["items"];
        assert_eq!(item["type"], "object");
        assert!(item.get("$ref").is_none());
        assert_eq!(item["required"], json!(["reason", "user_group"]));
    }

    #[test]
    fn test_first_person_validation() {
        let ok = |text: &str| {
            RestatedNeed {
                restated_need: text.to_string(),
            }
            .validate()
        };
        assert!(ok("I want to track my expenses automatically.").is_ok());
        assert!(ok("  I'm looking for a budgeting tool").is_ok());
        assert!(ok("I, for one, need receipts scanned").is_ok());
        assert!(ok("In my job I need to track expenses").is_err());
        assert!(ok("You want to track expenses").is_err());
        assert!(ok("   ").is_err());
    }

    #[test]
    fn test_top_three_prefers_top_selection() {
        let groups: UserGroups = serde_json::from_value(json!({
            "all_user_groups": [
                {"user_group": "students", "reason": "tight budgets"},
                {"user_group": "freelancers", "reason": "irregular income"}
            ],
            "top_3_user_groups": ["freelancers", "small business owners", "budget-conscious individuals"]
        }))
        .unwrap();

        assert_eq!(
            groups.top_three().unwrap(),
            vec![
                "freelancers",
                "small business owners",
                "budget-conscious individuals"
            ]
        );
    }

    #[test]
    fn test_top_three_tolerates_field_name_mismatch_and_duplicates() {
        let groups: UserGroups = serde_json::from_value(json!({
            "user_groups": ["Freelancers", "freelancers "],
            "all_user_groups": [
                {"user_group": "freelancers", "reason": "irregular income"},
                {"user_group": "students", "reason": "tight budgets"},
                {"user_group": "retirees", "reason": "fixed income"},
                {"user_group": "parents", "reason": "household costs"}
            ]
        }))
        .unwrap();

        assert_eq!(
            groups.top_three().unwrap(),
            vec!["Freelancers", "students", "retirees"]
        );
    }

    #[test]
    fn test_top_three_accepts_both_list_names_at_once() {
        let groups: UserGroups = serde_json::from_value(json!({
            "all_user_groups": [
                {"user_group": "retirees", "reason": "fixed income"}
            ],
            "top_3_user_groups": ["freelancers"],
            "user_groups": ["students", "Freelancers"]
        }))
        .unwrap();

        assert_eq!(
            groups.top_three().unwrap(),
            vec!["freelancers", "students", "retirees"]
        );
        assert!(UserGroups::definition().parameters["properties"]
            .get("user_groups")
            .is_none());
    }

    #[test]
    fn test_user_group_entries_keep_reasons() {
        let groups: UserGroups = serde_json::from_value(json!({
            "all_user_groups": [
                {"user_group": "students", "reason": "tight budgets"}
            ],
            "top_3_user_groups": []
        }))
        .unwrap();

        assert_eq!(
            groups.all_user_groups,
            vec![UserGroup {
                reason: "tight budgets".to_string(),
                user_group: "students".to_string(),
            }]
        );
    }

    #[test]
    fn test_top_three_rejects_short_lists() {
        let groups: UserGroups =
            serde_json::from_value(json!({"top_3_user_groups": ["freelancers"]})).unwrap();
        assert!(groups.validate().is_err());
    }

    #[test]
    fn test_out_of_range_scores_fail_validation() {
        let relevance: PostRelevance =
            serde_json::from_value(json!({"relevance_score": 0})).unwrap();
        assert!(relevance.validate().is_err());
        assert!(relevance.score().is_none());

        let relevance: PostRelevance =
            serde_json::from_value(json!({"relevance_score": 8})).unwrap();
        assert!(relevance.validate().is_ok());
        assert_eq!(relevance.score().unwrap().value(), 8);
    }

    #[test]
    fn test_whole_number_floats_are_accepted_as_scores() {
        let relevance: SubredditRelevance =
            serde_json::from_value(json!({"relevance_score": 7.0})).unwrap();
        assert_eq!(relevance.relevance_score, 7);
        assert!(relevance.validate().is_ok());

        let relevance: PostRelevance = serde_json::from_str(r#"{"relevance_score": 3.0}"#).unwrap();
        assert_eq!(relevance.score().unwrap().value(), 3);

        assert!(serde_json::from_value::<PostRelevance>(json!({"relevance_score": 7.5})).is_err());
        assert!(
            serde_json::from_value::<PostRelevance>(json!({"relevance_score": "7"})).is_err()
        );

        let params = PostRelevance::definition().parameters;
        assert_eq!(params["properties"]["relevance_score"]["type"], "integer");
    }

    #[test]
    fn test_missing_required_field_fails_to_parse() {
        assert!(serde_json::from_value::<Applicability>(json!({"applicable": true})).is_err());
        assert!(serde_json::from_value::<PostSummary>(json!({})).is_err());
    }
}
