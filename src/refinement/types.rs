use serde::{Deserialize, Serialize};

/// Analysis method selected for a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Structured data extraction from the document.
    #[default]
    Extraction,
    /// Free-form reasoning over the document.
    Reasoning,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Extraction => write!(f, "extraction"),
            Method::Reasoning => write!(f, "reasoning"),
        }
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "extraction" => Ok(Method::Extraction),
            "reasoning" => Ok(Method::Reasoning),
            _ => Err(format!("Unknown analysis method: {}", s)),
        }
    }
}

/// Artifact metadata sent alongside a refinement request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementContext {
    /// Version number the context was captured from.
    pub current_version: u32,
    /// The instruction that seeded the lineage.
    pub original_prompt: String,
}

/// One refinement turn submitted to the backend
#[derive(Debug, Clone, Serialize)]
pub struct RefinementRequest {
    /// The user's refinement instruction.
    pub user_message: String,
    /// Selected analysis method.
    pub method: Method,
    /// Full output of the version being refined, untruncated.
    pub current_context: String,
    /// Every instruction issued so far, in order.
    pub chat_history: Vec<String>,
    /// Artifact metadata, absent when the lineage was never initialized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_context: Option<ElementContext>,
}

impl RefinementRequest {
    /// Create a request with just the instruction
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            method: Method::default(),
            current_context: String::new(),
            chat_history: Vec::new(),
            element_context: None,
        }
    }

    /// Set the analysis method
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the current output context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.current_context = context.into();
        self
    }

    /// Set the accumulated chat history
    pub fn with_chat_history(mut self, history: Vec<String>) -> Self {
        self.chat_history = history;
        self
    }

    /// Attach artifact metadata
    pub fn with_element_context(mut self, context: ElementContext) -> Self {
        self.element_context = Some(context);
        self
    }
}

/// Raw wire response from the refinement endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct IterateResponse {
    /// Explicit success flag; false means the backend rejected the turn.
    pub success: bool,
    /// Conversational acknowledgement for the chat transcript.
    pub ai_response: Option<String>,
    /// The refined analysis output.
    pub updated_output: Option<String>,
    /// Method the backend actually used.
    pub method_used: Option<String>,
    /// Length of the context the backend received.
    pub context_length: Option<u64>,
    /// Human-readable status message.
    pub message: Option<String>,
    /// Error detail on rejection.
    pub detail: Option<String>,
}

/// Validated result of a refinement turn
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    /// Conversational acknowledgement for the chat transcript.
    pub ai_response: String,
    /// The refined analysis output that becomes the next version.
    pub updated_output: String,
}

/// Initial analysis request that seeds a lineage
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    /// The configured analysis prompt.
    pub user_prompt: String,
    /// Selected analysis method.
    pub method: Method,
    /// Model override, backend default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl AnalysisRequest {
    /// Create a request with just the prompt
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            method: Method::default(),
            model: None,
        }
    }

    /// Set the analysis method
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set a model override
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Raw wire response from the initial analysis endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessResponse {
    /// Explicit success flag.
    pub success: bool,
    /// The analysis output.
    pub result: Option<String>,
    /// Method the backend actually used.
    pub method_used: Option<String>,
    /// Prompt the backend processed, after any server-side additions.
    pub user_prompt: Option<String>,
    /// Human-readable status message.
    pub message: Option<String>,
    /// Error detail on rejection.
    pub detail: Option<String>,
}

/// Validated result of an initial analysis
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// The analysis output that becomes Version #1.
    pub result: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_roundtrip() {
        assert_eq!("extraction".parse::<Method>().unwrap(), Method::Extraction);
        assert_eq!("Reasoning".parse::<Method>().unwrap(), Method::Reasoning);
        assert!("divination".parse::<Method>().is_err());
        assert_eq!(Method::Extraction.to_string(), "extraction");
        assert_eq!(Method::default(), Method::Extraction);
    }

    #[test]
    fn test_method_serializes_lowercase() {
        let json = serde_json::to_string(&Method::Reasoning).unwrap();
        assert_eq!(json, "\"reasoning\"");
    }

    #[test]
    fn test_refinement_request_builder() {
        let request = RefinementRequest::new("Add USA data")
            .with_method(Method::Reasoning)
            .with_context("previous output")
            .with_chat_history(vec!["seed".to_string()])
            .with_element_context(ElementContext {
                current_version: 2,
                original_prompt: "seed".to_string(),
            });

        assert_eq!(request.user_message, "Add USA data");
        assert_eq!(request.method, Method::Reasoning);
        assert_eq!(request.current_context, "previous output");
        assert_eq!(request.chat_history, ["seed"]);
        assert_eq!(request.element_context.unwrap().current_version, 2);
    }

    #[test]
    fn test_refinement_request_omits_absent_element_context() {
        let json = serde_json::to_value(RefinementRequest::new("x")).unwrap();
        assert!(json.get("element_context").is_none());
    }

    #[test]
    fn test_iterate_response_tolerates_missing_fields() {
        let response: IterateResponse =
            serde_json::from_str(r#"{"success": true, "updated_output": "out"}"#).unwrap();
        assert!(response.success);
        assert_eq!(response.updated_output.as_deref(), Some("out"));
        assert!(response.ai_response.is_none());
        assert!(response.detail.is_none());
    }
}
