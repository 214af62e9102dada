use anyhow::{Context, Result};
use minijinja::{context, Environment};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

// NOTE:
// Prompt text and the component catalog live under assets/ and are
// embedded at build time. Everything here is read-only after first use.

const COMPONENTS_TEMPLATE_NAME: &str = "components.jinja";

/// Appended to the image description in the two-call pipeline.
pub const CODE_ONLY_SUFFIX: &str = "\nPlease ONLY return code, NO backticks or language names.";

macro_rules! asset {
    ($path:literal) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/", $path))
    };
}

const CODING_PROMPT: &str = asset!("prompts/coding.txt");
const DESCRIPTION_PROMPT: &str = asset!("prompts/description.txt");
const CLOSING_CONSTRAINT: &str = asset!("prompts/closing.txt");

/// One reusable UI component the model may import instead of writing markup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDoc {
    pub name: String,
    pub import_docs: String,
    pub usage_docs: String,
}

static CATALOG: Lazy<Vec<ComponentDoc>> = Lazy::new(|| {
    serde_json::from_str(asset!("shadcn-docs.json")).expect("invalid component catalog")
});

static TEMPLATES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.add_template(COMPONENTS_TEMPLATE_NAME, asset!("prompts/components.jinja"))
        .expect("invalid component catalog template");
    env
});

pub fn component_catalog() -> &'static [ComponentDoc] {
    &CATALOG
}

pub fn description_prompt() -> &'static str {
    DESCRIPTION_PROMPT
}

/// System prompt for code generation. With `use_component_library` the
/// prestyled component catalog is appended so the model can reuse it.
pub fn coding_prompt(use_component_library: bool) -> Result<String> {
    coding_prompt_with(use_component_library, component_catalog())
}

pub fn coding_prompt_with(use_component_library: bool, catalog: &[ComponentDoc]) -> Result<String> {
    let mut prompt = String::from(CODING_PROMPT.trim_end());

    if use_component_library {
        let block = render_catalog(catalog)?;
        prompt.push_str("\n\n");
        prompt.push_str(block.trim_end());
    }

    prompt.push_str("\n\n");
    prompt.push_str(CLOSING_CONSTRAINT.trim_end());
    Ok(prompt)
}

fn render_catalog(catalog: &[ComponentDoc]) -> Result<String> {
    TEMPLATES
        .get_template(COMPONENTS_TEMPLATE_NAME)
        .and_then(|tmpl| tmpl.render(context! { components => catalog }))
        .context("component catalog rendering failed")
}
