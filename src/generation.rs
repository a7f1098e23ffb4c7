//! Blog posts generated from a reflection by an external text provider.
//!
//! The provider is a black box behind [`TextGenerator`]. This module builds
//! the prompt, calls the provider and caches the result on the reflection
//! row. A failed call never touches the cached content.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::GenerationConfig;
use crate::database::{Database, TaskStore};
use crate::error::{DomainError, GenerationError};
use crate::labels::Labels;
use crate::models::{DailyMemo, DailyReflection, Task};
use crate::reflection::get_reflection;
use crate::rollover::{self, Day};

const SYSTEM_PROMPT: &str = "You are a writer keeping a personal blog. You write in a warm, \
     everyday tone and tell stories centred on personal growth and experience.";

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Claude,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Claude => "claude",
        }
    }

    pub fn api_key_var(self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Claude => "CLAUDE_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "claude" | "anthropic" => Ok(Provider::Claude),
            other => Err(GenerationError::UnknownProvider(other.to_string())),
        }
    }
}

/// Provider client over blocking HTTP.
pub struct HttpGenerator {
    provider: Provider,
    model: String,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
    max_tokens: u32,
    temperature: f32,
}

impl HttpGenerator {
    /// Build from config, reading the API key from the provider's
    /// environment variable.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let provider = config.provider;
        let api_key = std::env::var(provider.api_key_var())
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(GenerationError::MissingApiKey(provider.api_key_var()))?;
        let (model, base_url) = match provider {
            Provider::OpenAi => (&config.openai_model, &config.openai_base_url),
            Provider::Claude => (&config.claude_model, &config.claude_base_url),
        };
        Ok(Self {
            provider,
            model: model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_secs: config.timeout_secs,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        match self.provider {
            Provider::OpenAi => serde_json::json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": prompt },
                ],
                "temperature": self.temperature,
                "max_tokens": self.max_tokens,
            }),
            Provider::Claude => serde_json::json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
                "system": SYSTEM_PROMPT,
                "messages": [
                    { "role": "user", "content": prompt },
                ],
            }),
        }
    }

    fn invalid(&self, message: impl Into<String>) -> GenerationError {
        GenerationError::InvalidResponse {
            provider: self.provider.to_string(),
            message: message.into(),
        }
    }
}

impl TextGenerator for HttpGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build();

        let request = match self.provider {
            Provider::OpenAi => agent
                .post(&format!("{}/chat/completions", self.base_url))
                .set("Authorization", &format!("Bearer {}", self.api_key)),
            Provider::Claude => agent
                .post(&format!("{}/messages", self.base_url))
                .set("x-api-key", &self.api_key)
                .set("anthropic-version", ANTHROPIC_VERSION),
        };

        let body_str = serde_json::to_string(&self.request_body(prompt))
            .map_err(|e| self.invalid(format!("JSON serialize error: {e}")))?;
        debug!(provider = %self.provider, model = %self.model, "sending generation request");

        let response = request
            .set("Content-Type", "application/json")
            .send_string(&body_str)
            .map_err(|e| match e {
                ureq::Error::Status(status, resp) => {
                    let body = resp.into_string().unwrap_or_default();
                    GenerationError::Status {
                        provider: self.provider.to_string(),
                        status,
                        message: provider_error_message(&body),
                    }
                }
                other => GenerationError::Transport {
                    provider: self.provider.to_string(),
                    message: other.to_string(),
                },
            })?;

        let resp_str = response
            .into_string()
            .map_err(|e| self.invalid(e.to_string()))?;
        let json: serde_json::Value =
            serde_json::from_str(&resp_str).map_err(|e| self.invalid(e.to_string()))?;

        extract_text(self.provider, &json)
            .ok_or_else(|| self.invalid("response carried no text"))
    }
}

/// Generated text from a provider response body.
pub fn extract_text(provider: Provider, json: &serde_json::Value) -> Option<String> {
    let text = match provider {
        Provider::OpenAi => json["choices"][0]["message"]["content"].as_str(),
        Provider::Claude => json["content"][0]["text"].as_str(),
    };
    text.map(str::to_string)
}

/// The provider's own error message when the body has one, else the body.
pub fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Everything the prompt is built from.
pub struct PromptInput<'a> {
    pub reflection: &'a DailyReflection,
    pub completed: &'a [&'a Task],
    pub pending: &'a [&'a Task],
    pub memos: &'a [DailyMemo],
    pub include_images: bool,
    pub extra_request: Option<&'a str>,
    /// Offset used to print memo times.
    pub offset: FixedOffset,
    pub labels: &'a Labels,
}

fn score(value: Option<u8>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn task_line(task: &Task, labels: &Labels) -> String {
    let mut line = format!("- **{}**", task.title);
    if let Some(description) = &task.description {
        line.push_str(&format!(": {description}"));
    }
    line.push_str(&format!(" (category: {})\n", labels.category(task.category)));
    line
}

pub fn build_prompt(input: &PromptInput) -> String {
    let reflection = input.reflection;
    let mut prompt = String::from(
        "You are a skilled blogger. Using the daily reflection below, write an engaging, \
         easy-to-read blog post.\n\n",
    );

    prompt.push_str("## Reflection\n");
    prompt.push_str(&format!(
        "- Date: {}\n",
        reflection.reflection_date.format("%B %-d, %Y")
    ));
    prompt.push_str(&format!(
        "- Satisfaction: {}/5\n",
        score(reflection.satisfaction_score)
    ));
    prompt.push_str(&format!("- Energy: {}/5\n", score(reflection.energy_level)));
    prompt.push_str(&format!(
        "- Completion rate: {:.1}%\n\n",
        reflection.completion_rate
    ));

    prompt.push_str("## Full reflection\n");
    prompt.push_str(&reflection.reflection_text);
    prompt.push_str("\n\n");

    if !input.completed.is_empty() {
        prompt.push_str("## Completed\n");
        for task in input.completed {
            prompt.push_str(&task_line(task, input.labels));
            if let Some(note) = &task.completion_reflection {
                prompt.push_str(&format!("  Reflection: {note}\n"));
            }
            if input.include_images {
                if let Some(image) = &task.completion_image {
                    prompt.push_str(&format!("  Image: {image}\n"));
                }
            }
            prompt.push('\n');
        }
    }

    if !input.pending.is_empty() {
        prompt.push_str("## Not finished\n");
        for task in input.pending {
            prompt.push_str(&task_line(task, input.labels));
        }
        prompt.push('\n');
    }

    if !input.memos.is_empty() {
        prompt.push_str("## Memos written during the day\n");
        for memo in input.memos {
            let time = memo.created_at.with_timezone(&input.offset).format("%H:%M");
            prompt.push_str(&format!("- {} ({time})\n", memo.content));
        }
        prompt.push('\n');
    }

    if input.include_images {
        let with_images: Vec<&&Task> = input
            .completed
            .iter()
            .filter(|t| t.completion_image.is_some())
            .collect();
        if !with_images.is_empty() {
            prompt.push_str("## Tasks with images\n");
            for task in with_images {
                if let Some(image) = &task.completion_image {
                    prompt.push_str(&format!("- {}: {image}\n", task.title));
                }
            }
            prompt.push_str("\nPlace the images at fitting spots in the post.\n\n");
        }
    }

    prompt.push_str(
        "## Guidelines\n\
         1. Write in Markdown\n\
         2. Give the post an inviting title that includes the date\n\
         3. Keep the tone personal and honest\n\
         4. Highlight the sense of achievement and lessons from completed tasks\n\
         5. Include plans or resolutions for the unfinished ones\n\
         6. Keep the overall message positive and growth-oriented\n\
         7. Use emoji sparingly to keep it readable\n\n",
    );

    if let Some(extra) = input.extra_request.map(str::trim).filter(|e| !e.is_empty()) {
        prompt.push_str(&format!("## Additional request\n{extra}\n\n"));
    }

    prompt.push_str("Now write the blog post based on the information above:");
    prompt
}

#[derive(Debug, Clone, Default)]
pub struct BlogOptions {
    pub force: bool,
    pub include_images: bool,
    pub extra_request: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlogPost {
    pub content: String,
    pub is_cached: bool,
    pub generated_at: Option<DateTime<Utc>>,
}

/// Cached post for a date, if one was generated.
pub fn cached_blog(db: &Database, date: chrono::NaiveDate) -> Result<Option<BlogPost>, DomainError> {
    let reflection = get_reflection(db, date)?;
    Ok(reflection.generated_content.map(|content| BlogPost {
        content,
        is_cached: true,
        generated_at: reflection.generated_at,
    }))
}

/// Return the cached post for `date`, or generate and store a new one.
pub fn generate_blog(
    db: &Database,
    clock: &dyn Clock,
    generator: &dyn TextGenerator,
    labels: &Labels,
    date: chrono::NaiveDate,
    options: &BlogOptions,
) -> Result<BlogPost, DomainError> {
    let reflection = get_reflection(db, date)?;

    if !options.force {
        if let Some(content) = reflection.generated_content.clone() {
            debug!(%date, "using cached blog post");
            return Ok(BlogPost {
                content,
                is_cached: true,
                generated_at: reflection.generated_at,
            });
        }
    }

    let tasks = db.all()?;
    let selected = rollover::reflection_tasks(&tasks, &Day::of(date, clock));
    let (completed, pending): (Vec<&Task>, Vec<&Task>) =
        selected.into_iter().partition(|t| t.is_completed);
    let memos = db.get_memos_by_date(date)?;

    let prompt = build_prompt(&PromptInput {
        reflection: &reflection,
        completed: &completed,
        pending: &pending,
        memos: &memos,
        include_images: options.include_images,
        extra_request: options.extra_request.as_deref(),
        offset: clock.offset(),
        labels,
    });

    let content = generator.generate(&prompt).map_err(|e| {
        warn!(%date, error = %e, "blog generation failed");
        DomainError::ExternalProvider(e)
    })?;

    let generated_at = clock.now();
    db.save_generated_content(date, &content, &prompt, generated_at)?;
    info!(%date, chars = content.len(), "generated blog post");
    Ok(BlogPost {
        content,
        is_cached: false,
        generated_at: Some(generated_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memo::create_memo;
    use crate::reflection::{upsert_reflection, ReflectionInput};
    use crate::tasks::{create_task, toggle_complete, NewTask};
    use crate::testing::date;
    use std::cell::{Cell, RefCell};

    struct Scripted {
        replies: RefCell<Vec<Result<String, GenerationError>>>,
        calls: Cell<usize>,
        last_prompt: RefCell<String>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                replies: RefCell::new(replies),
                calls: Cell::new(0),
                last_prompt: RefCell::new(String::new()),
            }
        }
    }

    impl TextGenerator for Scripted {
        fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.calls.set(self.calls.get() + 1);
            *self.last_prompt.borrow_mut() = prompt.to_string();
            self.replies.borrow_mut().remove(0)
        }
    }

    fn failure() -> GenerationError {
        GenerationError::Status {
            provider: "openai".into(),
            status: 429,
            message: "rate limited".into(),
        }
    }

    fn seeded() -> (Database, FixedClock) {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::at_noon(date(2025, 9, 1));
        let run = create_task(&db, &clock, NewTask::titled("Run 5k")).unwrap();
        toggle_complete(&db, &clock, run.id.unwrap(), Some("legs hurt"), Some("run.png")).unwrap();
        create_task(&db, &clock, NewTask::titled("Taxes")).unwrap();
        create_memo(&db, &clock, "rainy morning", None).unwrap();
        upsert_reflection(
            &db,
            &clock,
            clock.today(),
            ReflectionInput {
                text: "Solid day".into(),
                satisfaction_score: Some(4),
                energy_level: Some(3),
            },
        )
        .unwrap();
        (db, clock)
    }

    #[test]
    fn prompt_carries_the_day() {
        let (db, clock) = seeded();
        let generator = Scripted::new(vec![Ok("# Post".into())]);
        let options = BlogOptions {
            include_images: true,
            extra_request: Some("Keep it short".into()),
            ..BlogOptions::default()
        };
        generate_blog(&db, &clock, &generator, &Labels::default(), clock.today(), &options).unwrap();

        let prompt = generator.last_prompt.borrow();
        assert!(prompt.contains("September 1, 2025"));
        assert!(prompt.contains("Satisfaction: 4/5"));
        assert!(prompt.contains("Completion rate: 50.0%"));
        assert!(prompt.contains("Solid day"));
        assert!(prompt.contains("**Run 5k**"));
        assert!(prompt.contains("Reflection: legs hurt"));
        assert!(prompt.contains("Image: run.png"));
        assert!(prompt.contains("## Not finished\n- **Taxes**"));
        assert!(prompt.contains("- rainy morning (12:00)"));
        assert!(prompt.contains("## Additional request\nKeep it short"));
    }

    #[test]
    fn images_are_left_out_unless_requested() {
        let (db, clock) = seeded();
        let generator = Scripted::new(vec![Ok("# Post".into())]);
        generate_blog(&db, &clock, &generator, &Labels::default(), clock.today(), &BlogOptions::default())
            .unwrap();
        assert!(!generator.last_prompt.borrow().contains("run.png"));
    }

    #[test]
    fn cached_post_is_reused_until_forced() {
        let (db, clock) = seeded();
        let generator = Scripted::new(vec![Ok("first".into()), Ok("second".into())]);
        let labels = Labels::default();
        let today = clock.today();

        let post = generate_blog(&db, &clock, &generator, &labels, today, &BlogOptions::default()).unwrap();
        assert!(!post.is_cached);
        let again = generate_blog(&db, &clock, &generator, &labels, today, &BlogOptions::default()).unwrap();
        assert!(again.is_cached);
        assert_eq!(again.content, "first");
        assert_eq!(generator.calls.get(), 1);

        let forced = BlogOptions {
            force: true,
            ..BlogOptions::default()
        };
        let fresh = generate_blog(&db, &clock, &generator, &labels, today, &forced).unwrap();
        assert_eq!(fresh.content, "second");
        assert_eq!(cached_blog(&db, today).unwrap().unwrap().content, "second");
    }

    #[test]
    fn failure_keeps_previous_content() {
        let (db, clock) = seeded();
        let generator = Scripted::new(vec![Ok("kept".into()), Err(failure())]);
        let labels = Labels::default();
        let today = clock.today();
        generate_blog(&db, &clock, &generator, &labels, today, &BlogOptions::default()).unwrap();

        let forced = BlogOptions {
            force: true,
            ..BlogOptions::default()
        };
        let err = generate_blog(&db, &clock, &generator, &labels, today, &forced).unwrap_err();
        assert!(matches!(err, DomainError::ExternalProvider(GenerationError::Status { status: 429, .. })));
        assert_eq!(cached_blog(&db, today).unwrap().unwrap().content, "kept");
    }

    #[test]
    fn missing_reflection_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::at_noon(date(2025, 9, 1));
        let generator = Scripted::new(vec![]);
        let err = generate_blog(&db, &clock, &generator, &Labels::default(), clock.today(), &BlogOptions::default())
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
        assert_eq!(generator.calls.get(), 0);
    }

    #[test]
    fn response_parsing_per_provider() {
        let openai = serde_json::json!({"choices": [{"message": {"content": "hello"}}]});
        let claude = serde_json::json!({"content": [{"type": "text", "text": "hi"}]});
        assert_eq!(extract_text(Provider::OpenAi, &openai).as_deref(), Some("hello"));
        assert_eq!(extract_text(Provider::Claude, &claude).as_deref(), Some("hi"));
        assert_eq!(extract_text(Provider::Claude, &openai), None);

        assert_eq!(
            provider_error_message(r#"{"error": {"message": "bad key"}}"#),
            "bad key"
        );
        assert_eq!(provider_error_message("gateway down"), "gateway down");
        assert_eq!("Anthropic".parse::<Provider>().unwrap(), Provider::Claude);
        assert!("bard".parse::<Provider>().is_err());
    }
}
