//! `docchat chat`: interactive chat grounded in the search index.

use std::sync::Arc;

use docchat_config::AppConfig;
use docchat_core::message::Conversation;
use docchat_core::provider::Provider;
use docchat_rag::{ChatLoop, ExitReason, PromptAssembler, Retriever, StdinLines};

/// The collaborators one chat session needs.
pub(crate) fn session_parts(
    config: &AppConfig,
) -> Result<(PromptAssembler, Arc<dyn Provider>), Box<dyn std::error::Error>> {
    let provider = docchat_providers::build_from_config(config)?;
    let index = docchat_search::build_from_config(config)?;

    let retriever = Retriever::from_config(index, &config.retrieval);
    let assembler = PromptAssembler::from_config(retriever, config);
    Ok((assembler, provider))
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let (assembler, provider) = session_parts(&config)?;

    let conversation = Conversation::new(config.chat.system_prompt.clone());
    let mut chat = ChatLoop::new(assembler, provider, conversation)
        .with_error_policy(config.session.on_error);

    println!("\nChat started! Type 'exit' to end the conversation.\n");

    let outcome = chat.run(&mut StdinLines::new()).await?;

    println!();
    match outcome.exit_reason {
        ExitReason::Failed(reason) => {
            return Err(format!("Session ended after a failed turn: {reason}").into());
        }
        ExitReason::UserExit | ExitReason::EndOfInput => {
            println!("Goodbye! ({} turn(s))", outcome.turns_completed);
        }
    }

    Ok(())
}
