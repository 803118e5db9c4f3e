//! Question classification into a retrieval route.
//!
//! One chat call picks among three labels; on symbol lookup a second call
//! extracts the identifier. Any provider error, empty response, or label the
//! classifier was not asked for falls back to [`Route::NoTool`].

use codelore_llm::{LlmProvider, Message, Role};

/// The retrieval action chosen for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Exact search for a named function or variable.
    SymbolLookup { identifier: String },
    /// Fuzzy search over the embedding index.
    SemanticSearch,
    /// Answer from general knowledge, no repository context.
    NoTool,
}

const CLASSIFIER_SYSTEM: &str = "You are an expert developer and programmer.";

const CLASSIFIER_PROMPT: &str = r"You act as a tool recommender for questions about a code repository.
Choose exactly one of the following tools. Answer with the tool name only,
no other words or symbols.

The tools are defined as follows:

- symbol_lookup: searches the repository for a specific function or variable
  named in the question. Use it when the question points at a particular
  identifier, such as 'How do I use the function parse_grep_line?' or
  'How should I apply the function def build_snapshot()?'.

- semantic_search: performs a fuzzy search over the repository. Use it for
  questions about general procedures that may span multiple files, such as
  'Which function processes incoming messages?' or 'How does the code store
  its index?'.

- no_tool: the default when the question is not specific to this repository,
  such as generic programming questions like 'How is the asyncio library used
  in Python?' or 'Can you explain smart pointers in C++?'.

Below are some example questions and answers:

- Question: How to use the function extract_identifier?
- symbol_lookup

- Question: How to use the function def load_snapshot(path):?
- symbol_lookup

- Question: How to create the search index?
- semantic_search

- Question: How does this repo render its UI?
- semantic_search

- Question: How to use the python asyncio library?
- no_tool
";

const EXTRACTOR_PROMPT: &str = r"You handle user questions about a code repository.
Extract the function or variable name that appears in the question.
Respond with the one name only, without parameters or any other words.
If both a function and a variable are mentioned, extract the function name.

Below are some examples:

- Question: How to use the function extract_identifier?
- Answer: extract_identifier

- Question: How to use the function def load_snapshot(path):?
- Answer: load_snapshot

- Question: What is the usage of snapshot?
- Answer: snapshot
";

/// Classify `question` into a route. Never fails: every provider error or
/// unexpected answer degrades to [`Route::NoTool`].
pub async fn route<P: LlmProvider>(provider: &P, question: &str) -> Route {
    let label = match classify(provider, question).await {
        Ok(label) => label,
        Err(e) => {
            tracing::debug!("classification failed, passing question through: {e}");
            return Route::NoTool;
        }
    };

    match parse_label(&label) {
        Some(Label::SymbolLookup) => match extract_identifier(provider, question).await {
            Some(identifier) => Route::SymbolLookup { identifier },
            None => {
                tracing::debug!("identifier extraction came back empty");
                Route::NoTool
            }
        },
        Some(Label::SemanticSearch) => Route::SemanticSearch,
        Some(Label::NoTool) => Route::NoTool,
        None => {
            tracing::debug!(label = %label, "unrecognized classifier label");
            Route::NoTool
        }
    }
}

async fn classify<P: LlmProvider>(
    provider: &P,
    question: &str,
) -> Result<String, codelore_llm::LlmError> {
    let messages = [
        Message::new(Role::System, CLASSIFIER_SYSTEM),
        Message::new(
            Role::User,
            format!("{CLASSIFIER_PROMPT}\nHere is the user question: {question}"),
        ),
    ];
    provider.chat(&messages).await
}

async fn extract_identifier<P: LlmProvider>(provider: &P, question: &str) -> Option<String> {
    let messages = [
        Message::new(Role::System, CLASSIFIER_SYSTEM),
        Message::new(
            Role::User,
            format!("{EXTRACTOR_PROMPT}\nHere is the user question: {question}"),
        ),
    ];
    match provider.chat(&messages).await {
        Ok(answer) => {
            let identifier = sanitize_identifier(&answer);
            (!identifier.is_empty()).then_some(identifier)
        }
        Err(e) => {
            tracing::debug!("identifier extraction failed: {e}");
            None
        }
    }
}

enum Label {
    SymbolLookup,
    SemanticSearch,
    NoTool,
}

fn parse_label(raw: &str) -> Option<Label> {
    let normalized = raw.trim().trim_end_matches(['.', '!']).to_lowercase();
    match normalized.as_str() {
        "symbol_lookup" => Some(Label::SymbolLookup),
        "semantic_search" => Some(Label::SemanticSearch),
        "no_tool" => Some(Label::NoTool),
        _ => None,
    }
}

/// Reduce an extractor answer to a bare identifier: first token, with any
/// surrounding punctuation the model left in stripped off.
fn sanitize_identifier(raw: &str) -> String {
    raw.split_whitespace()
        .next()
        .unwrap_or("")
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
        .to_string()
}
