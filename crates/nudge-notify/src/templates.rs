//! Minijinja rendering for slot subject/body templates.
//!
//! Templates are registered once at startup under the slot's template key;
//! unknown onboarding keys (operators can configure more slots than the
//! built-in set covers) fall back to the generic onboarding pair.

use serde::Serialize;

use crate::error::NotifyError;

/// Data available to slot templates.
#[derive(Debug, Clone, Serialize)]
pub struct SlotContext {
    /// GitHub login of the recipient.
    pub user_login: String,
    /// GitHub login of the installed account.
    pub owner_login: String,
    /// Days since install (onboarding slots only).
    pub day: Option<u32>,
    /// Inactivity cycle number (dormancy slots only).
    pub cycle: Option<u32>,
}

struct SlotTemplate {
    key: &'static str,
    subject: &'static str,
    body: &'static str,
}

const TEMPLATES: &[SlotTemplate] = &[
    SlotTemplate {
        key: "onboarding_day_1",
        subject: "Welcome aboard, {{ user_login }}!",
        body: "Hi {{ user_login }},\n\n\
               The app is now live on {{ owner_login }}. Open any issue, add the\n\
               trigger label, and a pull request will show up within minutes.\n\n\
               Happy shipping!",
    },
    SlotTemplate {
        key: "onboarding_day_3",
        subject: "Three days in — tried a generated PR yet?",
        body: "Hi {{ user_login }},\n\n\
               A quick nudge: the fastest way to see value is to pick one small\n\
               failing test on {{ owner_login }} and let the app open the fix.",
    },
    SlotTemplate {
        key: "onboarding",
        subject: "Getting the most out of day {{ day }}",
        body: "Hi {{ user_login }},\n\n\
               You're {{ day }} days into the install on {{ owner_login }}.\n\
               Reply to this email if anything is in your way.",
    },
    SlotTemplate {
        key: "dormancy",
        subject: "It's been quiet on {{ owner_login }}",
        body: "Hi {{ user_login }},\n\n\
               No pull requests have gone out on {{ owner_login }} for a while.\n\
               Anything we can help unblock?",
    },
];

/// Renders slot templates from the built-in set.
pub struct TemplateEngine {
    env: minijinja::Environment<'static>,
}

impl TemplateEngine {
    /// Build an engine with every built-in template registered.
    pub fn with_defaults() -> Result<Self, NotifyError> {
        let mut env = minijinja::Environment::new();
        // Subjects live under a ".subject" suffix beside each body.
        for t in TEMPLATES {
            env.add_template(t.key, t.body)
                .map_err(|e| NotifyError::Template(e.to_string()))?;
            env.add_template_owned(format!("{}.subject", t.key), t.subject)
                .map_err(|e| NotifyError::Template(e.to_string()))?;
        }
        Ok(Self { env })
    }

    /// Render the subject and body for `template_key`.
    ///
    /// Onboarding keys without a dedicated template (e.g. `onboarding_day_5`)
    /// use the generic onboarding pair; anything else unknown is an error.
    pub fn render(
        &self,
        template_key: &str,
        ctx: &SlotContext,
    ) -> Result<(String, String), NotifyError> {
        let key = if self.env.get_template(template_key).is_ok() {
            template_key.to_string()
        } else if template_key.starts_with("onboarding") {
            "onboarding".to_string()
        } else {
            return Err(NotifyError::Template(format!(
                "unknown template key: {template_key}"
            )));
        };

        let subject = self
            .env
            .get_template(&format!("{key}.subject"))
            .map_err(|e| NotifyError::Template(e.to_string()))?
            .render(ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))?;

        let body = self
            .env
            .get_template(&key)
            .map_err(|e| NotifyError::Template(e.to_string()))?
            .render(ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))?;

        Ok((subject, body))
    }
}
