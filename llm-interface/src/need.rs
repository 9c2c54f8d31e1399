use crate::prompts;
use crate::provider::LlmProvider;
use crate::suite::NeedClassifier;
use crate::tools::{RestatedNeed, ToolSchema, UserGroups};
use needfinder_core::{CoreError, LlmError, Need};
use tracing::debug;

impl<P: LlmProvider> NeedClassifier<P> {
    /// The need as a single first-person sentence starting with "I".
    pub async fn restate_need(&self, need: &Need) -> Result<String, CoreError> {
        let result: RestatedNeed = self
            .classifier
            .classify(prompts::restate_need(need))
            .await?;

        let restated = result.restated_need.trim().to_string();
        debug!(need = %need, restated = %restated, "Restated need");
        Ok(restated)
    }

    /// The three user groups most affected by `need`.
    pub async fn generate_user_groups(&self, need: &Need) -> Result<Vec<String>, CoreError> {
        let groups: UserGroups = self
            .classifier
            .classify(prompts::generate_user_groups(need))
            .await?;

        let top_three = groups.top_three().map_err(|details| LlmError::SchemaMismatch {
            tool: UserGroups::NAME.to_string(),
            details,
        })?;
        debug!(
            need = %need,
            candidates = groups.all_user_groups.len(),
            groups = ?top_three,
            "Generated user groups"
        );
        Ok(top_three)
    }
}
