//! Command table and dispatch.
//!
//! Each command is one stateless completion call. Dispatch builds replies
//! and returns them; delivering messages (and reporting failures) is the
//! caller's job, so the send path lives in exactly one place.

use tracing::{debug, info};

use crate::completion::CompletionClient;
use crate::reply;
use crate::Result;

/// The bot's commands, in menu order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Summarize,
    GenerateCode,
    GenerateStory,
    Ask,
    SupremeCourt,
}

/// A reply ready to deliver: ordered chunks, then the metadata line.
///
/// Carries the usage numbers alongside so callers can log them without
/// re-parsing the metadata line.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandReply {
    pub chunks: Vec<String>,
    pub metadata: String,
    pub cost: Option<f64>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl Command {
    /// Every registered command. Parsing and the platform command menu both
    /// derive from this table.
    pub const ALL: &'static [Command] = &[
        Command::Summarize,
        Command::GenerateCode,
        Command::GenerateStory,
        Command::Ask,
        Command::SupremeCourt,
    ];

    pub fn parse(name: &str) -> Option<Command> {
        Command::ALL.iter().copied().find(|c| c.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Summarize => "summarize",
            Command::GenerateCode => "generate_code",
            Command::GenerateStory => "generate_story",
            Command::Ask => "ask",
            Command::SupremeCourt => "supreme_court",
        }
    }

    /// Short description for the command menu.
    pub fn description(self) -> &'static str {
        match self {
            Command::Summarize => "Summarize recent channel messages",
            Command::GenerateCode => "Generate code from a request",
            Command::GenerateStory => "Write a short story from a prompt",
            Command::Ask => "Answer a free-form question",
            Command::SupremeCourt => "Simulate a Supreme Court decision",
        }
    }

    /// Acknowledgement sent before the completion call starts.
    pub fn ack(self) -> &'static str {
        match self {
            Command::Summarize => "Collecting and summarizing messages...",
            Command::GenerateCode => "Generating code based on your request...",
            Command::GenerateStory => "Generating a story based on your prompt...",
            Command::Ask => "Thinking about your question...",
            Command::SupremeCourt => {
                "Generating a simulated Supreme Court decision based on your question..."
            }
        }
    }

    /// Label slotted into the `"Here's {label}:"` reply framing.
    pub fn label(self) -> &'static str {
        match self {
            Command::Summarize => "a summary of the current plans",
            Command::GenerateCode => "the generated code based on your request",
            Command::GenerateStory => "a short story based on your prompt",
            Command::Ask => "the answer to your question",
            Command::SupremeCourt => "a simulated Supreme Court decision based on your question",
        }
    }

    /// Phrase slotted into the `"An error occurred while {..}"` report.
    pub fn failure_context(self) -> &'static str {
        match self {
            Command::Summarize => "summarizing",
            Command::GenerateCode => "generating code",
            Command::GenerateStory => "generating the story",
            Command::Ask => "answering the question",
            Command::SupremeCourt => "generating the Supreme Court decision",
        }
    }

    /// Whether the command needs a non-empty argument. Summarize reads the
    /// recorded channel transcript instead.
    pub fn takes_argument(self) -> bool {
        !matches!(self, Command::Summarize)
    }

    pub fn usage(self) -> &'static str {
        match self {
            Command::Summarize => "Usage: /summarize",
            Command::GenerateCode => "Usage: /generate_code <request>",
            Command::GenerateStory => "Usage: /generate_story <prompt>",
            Command::Ask => "Usage: /ask <question>",
            Command::SupremeCourt => "Usage: /supreme_court <legal question>",
        }
    }

    /// Build the completion prompt. `input` is the command argument, except
    /// for summarize where it is the recorded channel transcript.
    pub fn build_prompt(self, input: &str) -> String {
        match self {
            Command::Summarize => format!(
                "Summarize the following conversation and provide clear instructions on current plans, including what's happening, where, and when where applicable.\n\
The conversation may be in-regards to a digital gathering (such as to play a video game) or it may be a physical gathering (going for food).\n\
You may consider highlighting different elements of the gathering differently based on context (e.g. which game is being played, who's playing)\n\
You may receive messages unrelated to the gathering, please ignore these.\n\
As the conversations continues, plans may change, please ensure the summary is as up-to-date as possible, mentioning when elements are still to be decided or are unclear.\n\
Here's the conversation:\n\
{input}\n\
Summary and instructions:"
            ),
            Command::GenerateCode => format!(
                "Generate code based on the following request:\n\
{input}\n\n\
Provide a brief explanation of the code if necessary.\n\
Return the code in a format that can be directly used in markdown code blocks."
            ),
            Command::GenerateStory => format!(
                "Generate a short story based on the following prompt:\n\
{input}\n\n\
The story should have a clear beginning, middle, and end. Include vivid descriptions and engaging dialogue if appropriate.\n\
Feel free to be creative and expand on the prompt in unexpected ways."
            ),
            // The question goes through verbatim.
            Command::Ask => input.to_string(),
            Command::SupremeCourt => format!(
                "Generate a simulated Supreme Court decision for the following legal question:\n\
{input}\n\n\
Your response should include:\n\
1. A brief introduction to the case and the legal question at hand.\n\
2. Arguments from both sides (petitioner and respondent), presenting at least two major points for each.\n\
3. The Court's decision, including:\n\
   - The majority opinion (5-4 split)\n\
   - A concurring opinion\n\
   - A dissenting opinion\n\
4. The implications of this decision on future cases and society.\n\n\
Present a balanced view of the issue, demonstrating the complexity of the legal question and the nuanced perspectives of the Justices. Use legal terminology appropriately but ensure the language is accessible to a general audience.\n\n\
Format the decision as follows:\n\
[Case Name] (Simulated Case)\n\n\
Question Presented:\n\
[Restate the legal question]\n\n\
Background:\n\
[Brief introduction to the case]\n\n\
Arguments:\n\
Petitioner:\n\
[Present arguments]\n\n\
Respondent:\n\
[Present arguments]\n\n\
Decision:\n\
[State the Court's decision]\n\n\
Majority Opinion (delivered by Justice [Name]):\n\
[Present majority opinion]\n\n\
Concurring Opinion (Justice [Name]):\n\
[Present concurring opinion]\n\n\
Dissenting Opinion (Justice [Name]):\n\
[Present dissenting opinion]\n\n\
Implications:\n\
[Discuss potential implications]"
            ),
        }
    }
}

/// Run a command end to end: build the prompt, call the completion
/// endpoint, frame the response, and chunk it for transport.
///
/// On `Err` the caller reports the failure once, using
/// [`Command::failure_context`]; any chunks already produced are discarded.
pub async fn execute(
    command: Command,
    input: &str,
    client: &dyn CompletionClient,
    chunk_limit: usize,
) -> Result<CommandReply> {
    let prompt = command.build_prompt(input);
    debug!("prompt for /{}:\n{prompt}", command.name());

    let result = client.complete(&prompt).await?;
    info!("/{} response: {}", command.name(), result.body);

    let (body, metadata) = reply::normalize(&result, command.label());
    info!("{metadata}");

    Ok(CommandReply {
        chunks: reply::chunk(&body, chunk_limit),
        metadata,
        cost: result.cost,
        prompt_tokens: result.prompt_tokens,
        completion_tokens: result.completion_tokens,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::completion::CompletionResult;
    use crate::Error;

    struct FakeCompletion {
        result: CompletionResult,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeCompletion {
        fn new(body: &str, cost: Option<f64>) -> Self {
            Self {
                result: CompletionResult {
                    body: body.to_string(),
                    prompt_tokens: 5,
                    completion_tokens: 10,
                    cost,
                },
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for FakeCompletion {
        fn model(&self) -> &str {
            "fake/fake-model"
        }

        async fn complete(&self, prompt: &str) -> Result<CompletionResult> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.result.clone())
        }
    }

    struct FailingCompletion;

    #[async_trait]
    impl CompletionClient for FailingCompletion {
        fn model(&self) -> &str {
            "fake/fake-model"
        }

        async fn complete(&self, _prompt: &str) -> Result<CompletionResult> {
            Err(Error::Completion("gateway timed out".to_string()))
        }
    }

    #[test]
    fn parses_registered_names() {
        assert_eq!(Command::parse("summarize"), Some(Command::Summarize));
        assert_eq!(Command::parse("supreme_court"), Some(Command::SupremeCourt));
        assert_eq!(Command::parse("codemonkeygo"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn table_names_are_unique() {
        let mut names: Vec<_> = Command::ALL.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Command::ALL.len());
    }

    #[test]
    fn only_summarize_runs_without_argument() {
        for &command in Command::ALL {
            assert_eq!(
                command.takes_argument(),
                command != Command::Summarize,
                "{}",
                command.name()
            );
        }
    }

    #[test]
    fn prompts_embed_the_input() {
        for &command in Command::ALL {
            let prompt = command.build_prompt("blue footed boobies");
            assert!(prompt.contains("blue footed boobies"), "{}", command.name());
        }
    }

    #[test]
    fn ask_prompt_is_verbatim() {
        assert_eq!(Command::Ask.build_prompt("What is Rust?"), "What is Rust?");
    }

    #[test]
    fn summarize_prompt_wraps_the_transcript() {
        let prompt = Command::Summarize.build_prompt("alice: pizza at 7\nbob: works for me");
        assert!(prompt.contains("Here's the conversation:\nalice: pizza at 7\nbob: works for me\n"));
        assert!(prompt.ends_with("Summary and instructions:"));
    }

    #[tokio::test]
    async fn execute_frames_chunks_and_metadata() {
        let client = FakeCompletion::new("Dinner is at 7pm.", Some(0.1234));
        let reply = execute(Command::Summarize, "alice: dinner?", &client, 1900)
            .await
            .unwrap();

        assert_eq!(
            reply.chunks,
            vec!["Here's a summary of the current plans:\n\nDinner is at 7pm.".to_string()]
        );
        assert_eq!(
            reply.metadata,
            "Cost of request: $0.1234 (Prompt tokens: 5, Completion tokens: 10)"
        );
        assert_eq!(reply.cost, Some(0.1234));
        assert_eq!(reply.prompt_tokens, 5);
        assert_eq!(reply.completion_tokens, 10);
    }

    #[tokio::test]
    async fn execute_chunks_long_responses() {
        let body = (0..200)
            .map(|i| format!("plan item {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let client = FakeCompletion::new(&body, None);
        let reply = execute(Command::Ask, "what are the plans?", &client, 200)
            .await
            .unwrap();

        assert!(reply.chunks.len() > 1);
        assert!(reply.chunks[0].starts_with("Here's the answer to your question:"));
        assert!(reply.chunks.iter().all(|c| c.chars().count() <= 200));
        assert!(reply.metadata.starts_with(reply::NO_COST_NOTE));
    }

    #[tokio::test]
    async fn execute_sends_the_built_prompt() {
        let client = FakeCompletion::new("ok", Some(0.01));
        execute(Command::GenerateStory, "a lighthouse keeper", &client, 1900)
            .await
            .unwrap();

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("Generate a short story based on the following prompt:"));
        assert!(prompts[0].contains("a lighthouse keeper"));
    }

    #[tokio::test]
    async fn execute_surfaces_completion_errors() {
        let err = execute(Command::Ask, "hello?", &FailingCompletion, 1900)
            .await
            .unwrap_err();
        match err {
            Error::Completion(msg) => assert_eq!(msg, "gateway timed out"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
