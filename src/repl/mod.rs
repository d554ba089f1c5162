//! Interactive prompt
//!
//! One thread for the whole process. Each line is a turn through the shared
//! run loop; `exit`/`quit` or Ctrl-D ends the session, Ctrl-C during a turn
//! abandons that turn.

pub mod colors;

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::BridgeError;
use crate::run_loop::{AssistantReply, AssistantRunLoop, Session};

/// Inputs that end the session
const EXIT_COMMANDS: &[&str] = &["exit", "quit"];

pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim();
    EXIT_COMMANDS
        .iter()
        .any(|cmd| line.eq_ignore_ascii_case(cmd))
}

/// Console text for one finished turn
pub fn render_outcome(outcome: &crate::error::Result<AssistantReply>) -> String {
    match outcome {
        Ok(reply) if reply.text.is_empty() => colors::warning("(no reply)"),
        Ok(reply) => colors::assistant(&reply.text),
        Err(BridgeError::Cancelled) => colors::warning("Turn cancelled"),
        Err(e) => colors::error(&format!("Error: {e}")),
    }
}

pub struct Repl {
    editor: DefaultEditor,
    run_loop: Arc<AssistantRunLoop>,
    session: Session,
    history_path: PathBuf,
}

impl Repl {
    /// Create the editor and the process-wide thread
    pub async fn start(run_loop: Arc<AssistantRunLoop>) -> Result<Self> {
        let editor = DefaultEditor::new()?;
        let history_path = dirs::home_dir()
            .unwrap_or_default()
            .join(".assistant-bridge")
            .join("history");

        let mut session = Session::new();
        let thread_id = run_loop.ensure_thread(&mut session).await?;
        println!("{}", colors::banner_line("Thread", &thread_id));
        println!(
            "{}",
            colors::banner_line("Tools", &run_loop.tools().names().join(", "))
        );
        println!();

        Ok(Self {
            editor,
            run_loop,
            session,
            history_path,
        })
    }

    fn load_history(&mut self) {
        if self.history_path.exists() {
            let _ = self.editor.load_history(&self.history_path);
        }
    }

    fn save_history(&mut self) {
        if let Some(parent) = self.history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = self.editor.save_history(&self.history_path);
    }

    pub async fn run(&mut self) -> Result<()> {
        self.load_history();
        println!("Type your message ('exit' or Ctrl+D to quit)");
        println!();

        loop {
            let prompt = colors::prompt();
            // rustyline blocks; keep it off the async workers
            let readline = tokio::task::block_in_place(|| self.editor.readline(&prompt));

            match readline {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    self.editor.add_history_entry(trimmed)?;

                    if is_exit_command(trimmed) {
                        println!("Goodbye!");
                        break;
                    }

                    let input = trimmed.to_string();
                    self.process_input(&input).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(err) => {
                    eprintln!("{}", colors::error(&format!("Error: {err:?}")));
                    break;
                }
            }
        }

        self.save_history();
        Ok(())
    }

    async fn process_input(&mut self, input: &str) {
        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let outcome = self
            .run_loop
            .execute_with_cancel(&mut self.session, input, &cancel)
            .await;
        watcher.abort();

        println!("{}", render_outcome(&outcome));
        println!();
    }
}

/// Start the prompt with a fresh thread and run until exit
pub async fn run(run_loop: Arc<AssistantRunLoop>) -> Result<()> {
    let mut repl = Repl::start(run_loop).await?;
    repl.run().await
}
