use tera::{Context, Tera};

use mission_core::domain::email::EmailDraft;
use mission_core::domain::lead::Lead;

const OUTREACH_TEMPLATE: &str = "outreach.html";

/// Turns plain-text drafts into the HTML body handed to the email gateway.
pub struct EmailRenderer {
    templates: Tera,
}

impl EmailRenderer {
    pub fn new() -> Result<Self, tera::Error> {
        let mut templates = Tera::default();
        templates.add_raw_template(
            OUTREACH_TEMPLATE,
            include_str!("../../../templates/email/outreach.html"),
        )?;
        Ok(Self { templates })
    }

    pub fn render(&self, draft: &EmailDraft, lead: &Lead) -> Result<String, tera::Error> {
        let paragraphs: Vec<String> = draft
            .body
            .split("\n\n")
            .map(|paragraph| paragraph.trim().replace('\n', " "))
            .filter(|paragraph| !paragraph.is_empty())
            .collect();

        let mut context = Context::new();
        context.insert("subject", &draft.subject);
        context.insert("paragraphs", &paragraphs);
        context.insert("sequence_step", &draft.sequence_step);
        context.insert("company", &lead.company);
        self.templates.render(OUTREACH_TEMPLATE, &context)
    }
}
