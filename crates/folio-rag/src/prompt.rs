//! Prompt assembly for the persona assistant
//!
//! Author: hephaex@gmail.com

use folio_core::{ChatMessage, PersonaConfig, Role, ScoredChunk};

/// Render retrieved chunks as labelled context blocks
pub fn format_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, scored)| {
            format!(
                "Chunk {} ({}):\n{}",
                i + 1,
                scored.chunk.source,
                scored.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Standing rules for the assistant's voice and grounding
pub fn persona_rules(persona: &PersonaConfig) -> String {
    let name = &persona.name;
    let pronouns = &persona.pronouns;
    [
        format!("You are a warm, conversational AI assistant for the personal site of {name}."),
        "Speak naturally with a friendly, concise tone and use contractions. Avoid sounding robotic or overly formal.".to_string(),
        format!("Answer ONLY using the provided context about {name}. If something is not covered by the context, say you do not know and suggest asking a related question."),
        format!("When asked about personality or what kind of person {name} is, synthesize an answer grounded in the context without inventing facts."),
        format!("In your first reply of a new conversation (no prior assistant messages), begin with ONE friendly sentence introducing yourself as {name}'s AI assistant. State that you will answer as {name} would, but you will refer to {name} in the third person ({pronouns}). After that sentence, immediately answer the user's question."),
        format!("After your first reply, continue speaking in the third person about {name} ({pronouns}) for the rest of the chat, and do not repeat the introduction again."),
    ]
    .join(" ")
}

/// Whether to introduce, or to forbid re-introducing, the assistant
pub fn intro_directive(persona: &PersonaConfig, first_turn: bool) -> String {
    let name = &persona.name;
    let pronouns = &persona.pronouns;
    if first_turn {
        format!(
            "This is your first reply in a new chat: start with one brief, friendly sentence such as: \"Hi! I'm {name}'s AI assistant. I'll answer as {name} would, while referring to {name} in the third person (promise I'm not trying to steal anyone's identity!).\" Then immediately answer the user's question."
        )
    } else {
        format!(
            "Do not introduce yourself again. Continue to speak in the third person about {name} ({pronouns})."
        )
    }
}

/// Builds the message list sent to the chat model
///
/// Order: persona rules, introduction directive, retrieved context, then the
/// conversation itself.
pub struct PromptBuilder<'a> {
    persona: &'a PersonaConfig,
    context: String,
    history: Vec<ChatMessage>,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(persona: &'a PersonaConfig) -> Self {
        Self {
            persona,
            context: String::new(),
            history: Vec::new(),
        }
    }

    /// Set the retrieved context
    pub fn context(mut self, chunks: &[ScoredChunk]) -> Self {
        self.context = format_context(chunks);
        self
    }

    /// Set the (already trimmed) conversation
    pub fn history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// No assistant message yet means this reply opens the conversation
    pub fn is_first_turn(&self) -> bool {
        !self.history.iter().any(|m| m.role == Role::Assistant)
    }

    /// Build the final message list
    pub fn build(self) -> Vec<ChatMessage> {
        let first_turn = self.is_first_turn();
        let mut messages = Vec::with_capacity(self.history.len() + 3);

        messages.push(ChatMessage::system(persona_rules(self.persona)));
        messages.push(ChatMessage::system(intro_directive(self.persona, first_turn)));
        messages.push(ChatMessage::system(format!(
            "Context about {} (use this to answer):\n{}",
            self.persona.name, self.context
        )));
        messages.extend(self.history);

        messages
    }
}
