//! `docchat ask <QUESTION>`: answer one question and exit.

use docchat_core::message::Conversation;
use docchat_rag::ChatLoop;

pub async fn run(question: String) -> Result<(), Box<dyn std::error::Error>> {
    let question = question.trim();
    if question.is_empty() {
        return Err("Question must not be empty".into());
    }

    let config = super::load_config()?;
    let (assembler, provider) = super::chat::session_parts(&config)?;

    let conversation = Conversation::new(config.chat.system_prompt.clone());
    let mut chat = ChatLoop::new(assembler, provider, conversation);

    for reply in chat.submit(question).await? {
        println!("{}", reply.content);
    }

    Ok(())
}
