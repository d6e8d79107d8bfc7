use std::fmt;
use std::time::Instant;

use crate::error::{Result, SliceError};
use crate::llm::prompt::{analysis_prompt, completion_prompt};
use crate::llm::{Generate, LlmPrompt, LlmRunResult};
use crate::slice::SliceName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Completion,
    Analysis,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Completion => "completion",
            Stage::Analysis => "analysis",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stage 1: ask for a compilable version of the raw slice.
pub fn complete<G: Generate + ?Sized>(llm: &G, code: &str) -> Result<LlmRunResult> {
    if code.trim().is_empty() {
        tracing::warn!("slice is empty; sending it anyway");
    }

    call(llm, Stage::Completion, &completion_prompt(code))
}

/// Stage 2: review stage 1's output. `name` only identifies the slice in logs.
pub fn analyze<G: Generate + ?Sized>(
    llm: &G,
    completed: &str,
    name: &SliceName,
) -> Result<LlmRunResult> {
    let _span = tracing::debug_span!(
        "analysis",
        source = %name.source_name,
        function = %name.function_name
    )
    .entered();

    call(llm, Stage::Analysis, &analysis_prompt(completed))
}

fn call<G: Generate + ?Sized>(
    llm: &G,
    stage: Stage,
    prompt: &LlmPrompt,
) -> Result<LlmRunResult> {
    let started = Instant::now();

    let result = llm.generate(prompt).map_err(|source| SliceError::Llm {
        stage: stage.label(),
        source,
    })?;

    tracing::debug!(
        %stage,
        elapsed_ms = started.elapsed().as_millis() as u64,
        prompt_hash = %result.prompt_hash,
        cached_tokens = result.cached_tokens,
        "stage finished"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::LlmError;

    struct Echo {
        seen: RefCell<Vec<LlmPrompt>>,
    }

    impl Generate for Echo {
        fn generate(&self, prompt: &LlmPrompt) -> std::result::Result<LlmRunResult, LlmError> {
            self.seen.borrow_mut().push(prompt.clone());
            Ok(LlmRunResult {
                text: format!("reply#{}", self.seen.borrow().len()),
                prompt_hash: prompt.hash(),
                cached_tokens: None,
            })
        }
    }

    struct Down;

    impl Generate for Down {
        fn generate(&self, _: &LlmPrompt) -> std::result::Result<LlmRunResult, LlmError> {
            Err(LlmError::Parse("OpenAI"))
        }
    }

    fn name() -> SliceName {
        SliceName {
            prefix: "z3".into(),
            source_name: "nla_throttle".into(),
            function_name: "insert_new_impl".into(),
        }
    }

    #[test]
    fn completion_sends_raw_code() {
        let llm = Echo { seen: RefCell::new(vec![]) };
        let out = complete(&llm, "void f();").unwrap();
        assert_eq!(out.text, "reply#1");
        assert!(llm.seen.borrow()[0].user.contains("void f();"));
    }

    #[test]
    fn analysis_does_not_inject_names() {
        let llm = Echo { seen: RefCell::new(vec![]) };
        analyze(&llm, "int main() {}", &name()).unwrap();
        let seen = llm.seen.borrow();
        let user = &seen[0].user;
        assert!(user.contains("int main() {}"));
        assert!(!user.contains("nla_throttle"));
        assert!(!user.contains("insert_new_impl"));
    }

    #[test]
    fn failure_names_the_stage() {
        let err = complete(&Down, "x").unwrap_err();
        assert!(matches!(err, SliceError::Llm { stage: "completion", .. }));
        assert!(err.to_string().starts_with("completion request failed"));

        let err = analyze(&Down, "x", &name()).unwrap_err();
        assert!(matches!(err, SliceError::Llm { stage: "analysis", .. }));
    }
}
