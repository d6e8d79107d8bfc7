use sha2::{Digest, Sha256};

const PROMPT_ABI_VERSION: &str = "v1-slicefix";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmPrompt {
    pub system: String,
    pub user: String,
}

impl LlmPrompt {
    /// Stable digest of the rendered prompt, used as a provider cache key.
    pub fn hash(&self) -> String {
        let mut h = Sha256::new();
        h.update(PROMPT_ABI_VERSION.as_bytes());
        h.update(self.system.as_bytes());
        h.update(self.user.as_bytes());
        hex::encode(h.finalize())
    }
}

/// One fixed persona/task pair. The code is bound at render time.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub role: &'static str,
    pub request: &'static str,
}

/* ============================================================
   Stage 1: completion
   ============================================================ */

pub const COMPLETION: PromptTemplate = PromptTemplate {
    role: "You are an expert C/C++ engineer with deep knowledge of the language \
standards, common toolchains, and large production codebases.",
    request: r#"
The code below is a fragment cut out of a larger C/C++ project. Complete it so
that it compiles and runs as a standalone translation unit.

Rules:
- Preserve the original logic exactly; do not change behavior
- Add only the minimal declarations, stubs, and includes needed to compile
- Infer missing types from how they are used
- Keep the result secure and robust: no undefined behavior, no unchecked
  memory access introduced by the stubs
- Output the complete code only, in a single fenced code block
"#,
};

/* ============================================================
   Stage 2: analysis
   ============================================================ */

pub const ANALYSIS: PromptTemplate = PromptTemplate {
    role: "You are a senior C/C++ static analysis specialist who reviews code for \
correctness, safety, and performance.",
    request: r#"
Review the code below as a static analyzer would.

Identify bugs, undefined behavior, and inefficiencies. For every problem,
propose a concrete fix and show the corrected code.

Answer in Markdown with exactly these four sections:

## Identified Issues
## Suggested Fixes
## Performance Recommendations
## Additional Insights
"#,
};

/// Render `template` against `code`.
///
/// The system message carries ROLE; the user message carries the template,
/// which names REQUEST and CODE and then supplies them.
pub fn render(template: &PromptTemplate, code: &str) -> LlmPrompt {
    let system = format!("ROLE:\n{}", template.role.trim());

    let mut user = String::new();
    user.push_str("Act as described by ROLE. Carry out REQUEST on CODE.\n\n");

    user.push_str("REQUEST:\n");
    user.push_str(template.request.trim());
    user.push_str("\n\n");

    user.push_str("CODE:\n```cpp\n");
    user.push_str(code);
    if !code.ends_with('\n') {
        user.push('\n');
    }
    user.push_str("```\n");

    LlmPrompt { system, user }
}

pub fn completion_prompt(code: &str) -> LlmPrompt {
    render(&COMPLETION, code)
}

pub fn analysis_prompt(completed: &str) -> LlmPrompt {
    render(&ANALYSIS, completed)
}
