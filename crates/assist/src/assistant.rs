use tracing::{info, instrument};

use project_hub_core::{validation::ensure_present, HubError, HubResult};

use crate::model::LanguageModel;

/// Idea generation and note polishing on top of a [`LanguageModel`].
///
/// Nothing here touches storage; accepted suggestions go through the usual
/// project actions.
pub struct Assistant<M> {
  model: M,
}

impl<M: LanguageModel> Assistant<M> {
  pub fn new(model: M) -> Self {
    Self { model }
  }

  /// One idea per non-empty line of the completion.
  ///
  /// # Errors
  ///
  /// Empty keywords are a validation error. A failed call or a completion
  /// without any idea is a [`HubError::Model`].
  #[instrument(level = "debug", skip(self))]
  pub async fn generate_ideas(&self, keywords: &str) -> HubResult<Vec<String>> {
    ensure_present("keywords", keywords)?;

    let completion = self.model.complete(&ideas_prompt(keywords)).await?;
    let ideas: Vec<String> = completion
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(String::from)
      .collect();

    if ideas.is_empty() {
      return Err(HubError::Model("The model did not suggest any ideas".into()));
    }
    info!("Generated {} ideas", ideas.len());

    Ok(ideas)
  }

  /// # Errors
  ///
  /// Fails with [`HubError::Model`] when the call fails or comes back blank.
  #[instrument(level = "debug", skip(self, notes))]
  pub async fn improve_notes(&self, description: &str, notes: &str) -> HubResult<String> {
    let completion = self.model.complete(&notes_prompt(description, notes)).await?;
    let improved = completion.trim();

    if improved.is_empty() {
      return Err(HubError::Model("No output from the model".into()));
    }

    Ok(improved.to_string())
  }
}

fn ideas_prompt(keywords: &str) -> String {
  format!(
    "You are a creative project idea generator. Based on the description or keywords provided, \
     generate a list of project ideas, one per line.\n\nDescription or Keywords: {keywords}\n\nProject Ideas:"
  )
}

fn notes_prompt(description: &str, notes: &str) -> String {
  format!(
    "You are an AI assistant helping to improve project notes.\n\nBased on the project description and the \
     current project notes, suggest improvements to the notes, including grammar corrections, clarity \
     enhancements, and relevant topic suggestions. Reply with the improved notes only.\n\nProject \
     Description: {description}\nCurrent Project Notes: {notes}\n\nImproved Notes:"
  )
}
