//! System prompt rendering for the agent gateway.
//!
//! Templates stored in `agent_configurations` may use `{{politician_name}}`, `{{tone}}`,
//! `{{current_date}}` and `{{agent_name}}`. Missing values fall back to neutral defaults so a
//! half-configured cabinet still produces a usable prompt.

use chrono::NaiveDate;

use crate::db::models::{AgentConfiguration, Cabinet};

pub const FALLBACK_SYSTEM_PROMPT: &str = "Você é um assistente útil.";
pub const FALLBACK_POLITICIAN_NAME: &str = "Parlamentar";
pub const FALLBACK_TONE: &str = "Neutro";
pub const FALLBACK_AGENT_NAME: &str = "Assistente";

/// pt-BR short date, e.g. `07/03/2026`.
const DATE_FORMAT: &str = "%d/%m/%Y";

/// Values substituted into a prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    pub politician_name: Option<String>,
    pub current_date: NaiveDate,
}

impl PromptContext {
    pub fn new(politician_name: Option<String>, current_date: NaiveDate) -> Self {
        Self {
            politician_name,
            current_date,
        }
    }

    /// Uses the official name, then the parliamentary name.
    pub fn for_cabinet(cabinet: &Cabinet, current_date: NaiveDate) -> Self {
        let politician_name = non_blank(cabinet.official_name.as_deref())
            .or_else(|| non_blank(cabinet.parliamentary_name.as_deref()))
            .map(str::to_string);
        Self::new(politician_name, current_date)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl AgentConfiguration {
    /// End-user prompt with placeholders resolved.
    pub fn render_system_prompt(&self, ctx: &PromptContext) -> String {
        let template = non_blank(Some(self.system_prompt.as_str())).unwrap_or(FALLBACK_SYSTEM_PROMPT);
        self.render(template, ctx)
    }

    /// Staff copilot prompt, if the cabinet configured one.
    pub fn render_copilot_prompt(&self, ctx: &PromptContext) -> Option<String> {
        non_blank(self.copilot_system_prompt.as_deref()).map(|template| self.render(template, ctx))
    }

    fn render(&self, template: &str, ctx: &PromptContext) -> String {
        let politician_name =
            non_blank(ctx.politician_name.as_deref()).unwrap_or(FALLBACK_POLITICIAN_NAME);
        let tone = non_blank(Some(self.tone.as_str())).unwrap_or(FALLBACK_TONE);
        let agent_name = non_blank(Some(self.agent_name.as_str())).unwrap_or(FALLBACK_AGENT_NAME);
        let current_date = ctx.current_date.format(DATE_FORMAT).to_string();

        template
            .replace("{{politician_name}}", politician_name)
            .replace("{{tone}}", tone)
            .replace("{{current_date}}", &current_date)
            .replace("{{agent_name}}", agent_name)
    }
}
