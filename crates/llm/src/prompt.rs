//! Prompt templates for providers without native structured output.
//!
//! Templates are rendered with Handlebars with HTML escaping disabled, so
//! JSON examples and Markdown pass through verbatim.

use handlebars::Handlebars;
use serde_json::json;

use crate::error::ProviderError;
use crate::example::synthesize_example;
use crate::schema::Schema;

const REPORT_TEMPLATE: &str = r#"{{system}}

Follow these steps:
1. First, think about this request and analyze it carefully:
{{prompt}}
2. Format your response using the tags shown below.
   The reasoning section helps organize your thoughts.
   The report section contains the actual content.
Format your response EXACTLY like this, using these exact tags:
<REASONING>
Step 1: [Initial analysis]
Step 2: [Key points considered]
Step 3: [Final reasoning]
</REASONING>
<REPORT>
[Your markdown report here]
</REPORT>
IMPORTANT INSTRUCTIONS:
- The <REPORT> section must contain properly formatted markdown content
- Format the report professionally with clear sections and headings
- Include all relevant information from the research
- Make the report as detailed and comprehensive as possible"#;

const JSON_TEMPLATE: &str = r#"{{system}}

Follow these steps:
1. First, think about this request and analyze it carefully:
{{prompt}}
2. Format your complete response in TWO parts as shown below.
   The reasoning section helps organize your thoughts.
   The JSON section MUST match the schema structure EXACTLY.
Format your response EXACTLY like this, using these exact tags:
<REASONING>
Step 1: [Initial analysis]
Step 2: [Key points considered]
Step 3: [Final reasoning]
</REASONING>
<JSON>
{{example}}
</JSON>
IMPORTANT INSTRUCTIONS:
- The <JSON> section must contain ONLY valid JSON
- Your response must match this exact structure with fields: {{fields}}
{{#if required}}
- These fields are required and must never be omitted: {{required}}
{{/if}}
- Follow the example format precisely, replacing example values with real content
- No additional fields or different structure allowed
- No markdown formatting or code blocks
- Ensure all JSON syntax is valid"#;

/// Output shape a tagged prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaggedShape {
    /// A single free-text field inside `<REPORT>`.
    Report,
    /// A JSON object inside `<JSON>`.
    Json,
}

impl TaggedShape {
    pub fn for_schema(schema: &Schema) -> Self {
        if schema.report_field().is_some() {
            Self::Report
        } else {
            Self::Json
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Report => "REPORT",
            Self::Json => "JSON",
        }
    }

    fn template_name(&self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Json => "json",
        }
    }
}

/// Registered reasoning-plus-tag templates.
pub struct TaggedPrompts {
    registry: Handlebars<'static>,
}

impl TaggedPrompts {
    pub fn new() -> Result<Self, ProviderError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        registry
            .register_template_string("report", REPORT_TEMPLATE)
            .map_err(|e| ProviderError::Prompt(format!("Failed to register template: {}", e)))?;
        registry
            .register_template_string("json", JSON_TEMPLATE)
            .map_err(|e| ProviderError::Prompt(format!("Failed to register template: {}", e)))?;

        Ok(Self { registry })
    }

    /// Render the full prompt for `shape`.
    pub fn render(
        &self,
        shape: TaggedShape,
        system: &str,
        prompt: &str,
        schema: &Schema,
    ) -> Result<String, ProviderError> {
        let data = match shape {
            TaggedShape::Report => json!({ "system": system, "prompt": prompt }),
            TaggedShape::Json => json!({
                "system": system,
                "prompt": prompt,
                "example": synthesize_example(schema),
                "fields": schema.fields().join(", "),
                "required": schema.required().join(", "),
            }),
        };

        self.registry
            .render(shape.template_name(), &data)
            .map_err(|e| ProviderError::Prompt(format!("Failed to render template: {}", e)))
    }
}
