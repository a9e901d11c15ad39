//! Interactive terminal front end.
//!
//! The shell owns the session gate and the three clients. While the gate
//! shows setup only `setup`, `status`, `help` and `quit` are accepted.

use std::sync::Arc;

use colored::*;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::gate::{SessionGate, View};
use crate::generate::GenerationClient;
use crate::models::{Category, GenerationRequest, QueryRequest, SessionConfig};
use crate::query::QueryClient;
use crate::setup::SetupCoordinator;
use crate::tracker::Completion;
use crate::transport::Transport;
use crate::visual::VisualOutput;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Setup {
        chat: Option<String>,
        embed: Option<String>,
        source: Option<String>,
    },
    Ask {
        top_k: Option<u32>,
        text: String,
    },
    /// `None` falls back to the configured default category.
    Generate {
        category: Option<Category>,
        top_k: Option<u32>,
        prompt: String,
    },
    View(View),
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Returns `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        let command = match head.to_lowercase().as_str() {
            "quit" | "exit" => Command::Quit,
            "help" | "?" => Command::Help,
            "status" => Command::Status,
            "view" | "go" => Command::View(rest.parse()?),
            "setup" => parse_setup(rest)?,
            "ask" => {
                let (top_k, text) = take_top_k(rest)?;
                Command::Ask {
                    top_k,
                    text: text.to_string(),
                }
            }
            "gen" | "generate" => {
                // A leading word that is not a category starts the prompt.
                let (first, after) = match rest.split_once(char::is_whitespace) {
                    Some((first, after)) => (first, after.trim()),
                    None => (rest, ""),
                };
                let (category, rest) = match first.parse::<Category>() {
                    Ok(category) => (Some(category), after),
                    Err(_) => (None, rest),
                };
                let (top_k, prompt) = take_top_k(rest)?;
                Command::Generate {
                    category,
                    top_k,
                    prompt: prompt.to_string(),
                }
            }
            other => {
                return Err(ClientError::validation(
                    "command",
                    format!("Unknown command '{other}'. Type 'help' for commands."),
                ));
            }
        };
        Ok(Some(command))
    }
}

// `k=N` may lead the argument list.
fn take_top_k(rest: &str) -> Result<(Option<u32>, &str)> {
    let Some(after) = rest.strip_prefix("k=") else {
        return Ok((None, rest));
    };
    let (value, remainder) = match after.split_once(char::is_whitespace) {
        Some((value, remainder)) => (value, remainder.trim()),
        None => (after, ""),
    };
    let top_k = value.parse().map_err(|_| {
        ClientError::validation("top_k", format!("'{value}' is not a valid result count."))
    })?;
    Ok((Some(top_k), remainder))
}

// `setup chat=.. embed=.. source=..`; a value runs until the next key, so
// paths may contain spaces.
fn parse_setup(rest: &str) -> Result<Command> {
    let mut chat = None;
    let mut embed = None;
    let mut source = None;
    let mut current: Option<(&str, Vec<&str>)> = None;

    let mut store = |key: &str, words: Vec<&str>| {
        let value = Some(words.join(" "));
        match key {
            "chat" => chat = value,
            "embed" => embed = value,
            _ => source = value,
        }
    };

    for word in rest.split_whitespace() {
        let key = ["chat", "embed", "source"]
            .into_iter()
            .find(|k| word.starts_with(&format!("{k}=")));
        match key {
            Some(key) => {
                if let Some((prev, words)) = current.take() {
                    store(prev, words);
                }
                current = Some((key, vec![&word[key.len() + 1..]]));
            }
            None => match current.as_mut() {
                Some((_, words)) => words.push(word),
                None => {
                    return Err(ClientError::validation(
                        "setup",
                        "Usage: setup [chat=MODEL] [embed=MODEL] [source=PATH]",
                    ));
                }
            },
        }
    }
    if let Some((key, words)) = current {
        store(key, words);
    }

    Ok(Command::Setup {
        chat,
        embed,
        source,
    })
}

/// What the caller should do after a command ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue(String),
    Quit,
}

pub struct Shell {
    config: Arc<Config>,
    gate: SessionGate,
    setup: SetupCoordinator,
    query: QueryClient,
    generation: GenerationClient,
    visual: VisualOutput,
}

impl Shell {
    pub fn new(config: Arc<Config>, tx: Arc<dyn Transport>) -> Self {
        Self {
            config,
            gate: SessionGate::new(),
            setup: SetupCoordinator::new(Arc::clone(&tx)),
            query: QueryClient::new(Arc::clone(&tx)),
            generation: GenerationClient::new(tx),
            visual: VisualOutput::new(),
        }
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub fn prompt(&self) -> String {
        if self.gate.shows_setup() {
            return "setup> ".to_string();
        }
        let label = self.gate.source_label().unwrap_or_default();
        format!("[{label}] {}> ", self.gate.state().active_view)
    }

    /// Parse and run one input line.
    pub async fn handle_line(&mut self, line: &str) -> Flow {
        match Command::parse(line) {
            Ok(Some(command)) => self.execute(command).await,
            Ok(None) => Flow::Continue(String::new()),
            Err(e) => Flow::Continue(self.visual.error(&e.user_message("Invalid command."))),
        }
    }

    pub async fn execute(&mut self, command: Command) -> Flow {
        let out = match command {
            Command::Quit => return Flow::Quit,
            Command::Help => self.help(),
            Command::Status => self.status(),
            Command::Setup {
                chat,
                embed,
                source,
            } => self.run_setup(chat, embed, source).await,
            _ if self.gate.shows_setup() => self
                .visual
                .hint("The echoes are still asleep. Run 'setup' first (see 'help')."),
            Command::View(view) => {
                if self.gate.navigate(view) {
                    self.visual.hint(&format!("Now in {view} view."))
                } else {
                    self.visual.hint(&format!("Already in {view} view."))
                }
            }
            Command::Ask { top_k, text } => self.run_ask(top_k, text).await,
            Command::Generate {
                category,
                top_k,
                prompt,
            } => self.run_generate(category, top_k, prompt).await,
        };
        Flow::Continue(out)
    }

    async fn run_setup(
        &mut self,
        chat: Option<String>,
        embed: Option<String>,
        source: Option<String>,
    ) -> String {
        self.gate.navigate(View::Setup);

        let (default_chat, default_embed, default_source) = match self.gate.config() {
            Some(previous) => (
                previous.chat_model.clone(),
                previous.embed_model.clone(),
                previous.content_source_path.clone(),
            ),
            None => (
                self.config.setup.chat_model.clone(),
                self.config.setup.embed_model.clone(),
                self.config.setup.source_path.clone(),
            ),
        };
        let config = SessionConfig::new(
            chat.unwrap_or(default_chat),
            embed.unwrap_or(default_embed),
            source.unwrap_or(default_source),
        );

        match self.setup.submit(config).await {
            Ok(Completion::Applied(outcome)) => {
                let label = outcome.source_label.clone();
                self.gate.complete_setup(outcome);
                self.visual
                    .success(&format!("The echoes of '{label}' have awakened."))
            }
            Ok(Completion::Superseded) => String::new(),
            Err(_) => self.status_error(self.setup.status().error),
        }
    }

    async fn run_ask(&mut self, top_k: Option<u32>, text: String) -> String {
        self.gate.navigate(View::Query);
        let top_k = top_k.unwrap_or(self.config.query.default_top_k);
        let request = match QueryRequest::new(text, top_k) {
            Ok(request) => request,
            Err(e) => return self.visual.error(&e.user_message("Invalid query.")),
        };

        match self.query.ask(request).await {
            Ok(Completion::Applied(response)) => self.visual.answer(&response),
            Ok(Completion::Superseded) => String::new(),
            Err(_) => self.status_error(self.query.state().error),
        }
    }

    async fn run_generate(
        &mut self,
        category: Option<Category>,
        top_k: Option<u32>,
        prompt: String,
    ) -> String {
        self.gate.navigate(View::Generate);
        let category = category.unwrap_or(self.config.generation.default_category);
        let top_k = top_k.unwrap_or(self.config.generation.default_top_k);
        let request = match GenerationRequest::new(category, top_k, prompt) {
            Ok(request) => request,
            Err(e) => return self.visual.error(&e.user_message("Invalid request.")),
        };

        match self.generation.generate(request).await {
            Ok(Completion::Applied(_)) => self
                .visual
                .results(category, &self.generation.state().blocks()),
            Ok(Completion::Superseded) => String::new(),
            Err(_) => self.status_error(self.generation.state().error),
        }
    }

    fn status_error(&self, message: Option<String>) -> String {
        self.visual
            .error(message.as_deref().unwrap_or("Something went wrong."))
    }

    fn status(&self) -> String {
        let state = self.gate.state();
        let mut out = format!(
            "{} {}\n{} {}\n{} {}",
            "backend:".cyan(),
            self.config.backend.base_url,
            "ready:".cyan(),
            state.is_ready,
            "view:".cyan(),
            state.active_view
        );
        if let Some(config) = self.gate.config() {
            out.push_str(&format!(
                "\n{} {}\n{} {}\n{} {}",
                "chat model:".cyan(),
                config.chat_model,
                "embed model:".cyan(),
                config.embed_model,
                "source:".cyan(),
                self.gate.source_label().unwrap_or_default()
            ));
        }
        out
    }

    fn help(&self) -> String {
        let categories = Category::ALL
            .iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join("|");
        [
            format!("{}", "Commands".bright_magenta().bold()),
            format!(
                "  {}  configure the backend (defaults come from config)",
                "setup [chat=MODEL] [embed=MODEL] [source=PATH]".green()
            ),
            format!(
                "  {}  ask the knowledge base (k: 1-30)",
                "ask [k=N] QUESTION".green()
            ),
            format!(
                "  {}  generate content (k: 1-20, category defaults from config)",
                format!("gen [{categories}] [k=N] [PROMPT]").green()
            ),
            format!("  {}  switch view", "view query|generate|setup".green()),
            format!("  {}  show session state", "status".green()),
            format!("  {}  leave", "quit".green()),
        ]
        .join("\n")
    }

    /// Read-eval-print loop on the terminal.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut rl = DefaultEditor::new()?;

        println!("{}", "=== At the Foothills of Parnassus ===".bright_magenta().bold());
        println!(
            "{}",
            "Awaken your echo source with 'setup', or type 'help'.".bright_black()
        );
        println!();

        loop {
            match rl.readline(&self.prompt()) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = rl.add_history_entry(line.as_str());
                    }
                    match self.handle_line(&line).await {
                        Flow::Quit => {
                            println!("{}", "Farewell.".bright_green());
                            break;
                        }
                        Flow::Continue(out) if out.is_empty() => {}
                        Flow::Continue(out) => println!("{}", out.trim_end()),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }
}
