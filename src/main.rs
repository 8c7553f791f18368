//! Postsmith CLI - a conversational post-drafting session on stdin/stdout.
//!
//! One process is one session. Type a topic or paste source text to get a
//! draft, reply with feedback to revise it, approve it to finish. `upload
//! <path>` ingests a .txt/.md file; `quit` exits.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use postsmith::adapters::ai::OpenAiProvider;
use postsmith::adapters::extract::PlainTextExtractor;
use postsmith::adapters::storage::FileSessionStore;
use postsmith::adapters::trace::LogSink;
use postsmith::application::{ConversationOrchestrator, SessionSweeper};
use postsmith::config::AppConfig;
use postsmith::domain::foundation::SessionId;
use postsmith::domain::intent::{IntentClassifier, RuleTable};
use postsmith::domain::workflow::RefinementEngine;
use postsmith::ports::{SessionStore, TraceSink, UploadedFile};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("postsmith=info")),
        )
        .init();

    let config = AppConfig::load()?;

    let provider = Arc::new(OpenAiProvider::new(config.ai.clone()));
    let store: Arc<dyn SessionStore> =
        Arc::new(FileSessionStore::new(config.session.storage_dir.clone()));
    let trace: Arc<dyn TraceSink> = Arc::new(LogSink);

    let engine = RefinementEngine::new(provider.clone(), trace.clone(), config.engine.clone());
    let classifier = IntentClassifier::new(
        RuleTable::standard(
            config.intent.content_length_threshold,
            &config.intent.extra_feedback_keywords,
            &config.intent.extra_approval_keywords,
        ),
        provider,
    );
    let extractor = Arc::new(PlainTextExtractor::new(config.ingestion.clone()));

    let orchestrator = ConversationOrchestrator::new(
        engine,
        classifier,
        extractor,
        store.clone(),
        trace.clone(),
        config.session.history_cap,
    );

    let sweeper = SessionSweeper::new(
        store,
        trace,
        chrono::Duration::hours(config.session.staleness_hours),
    );
    tokio::spawn(async move {
        sweeper.run(std::time::Duration::from_secs(3600)).await;
    });

    let session_id = SessionId::new();
    tracing::info!(session = %session_id, "session started");
    println!("postsmith - session {}", session_id);
    println!("Type a topic, paste source text, or `upload <path>`. `quit` exits.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let (text, file) = match line.strip_prefix("upload ") {
            Some(path) => match read_upload(path.trim()).await {
                Ok(file) => (String::new(), Some(file)),
                Err(e) => {
                    println!("could not read '{}': {}\n", path.trim(), e);
                    continue;
                }
            },
            None => (line, None),
        };

        match orchestrator.process(session_id, &text, file).await {
            Ok(reply) => println!("{}\n", reply.text),
            Err(e) => {
                tracing::error!(error = %e, "turn failed");
                println!("something went wrong persisting the session: {}\n", e);
            }
        }
    }

    Ok(())
}

async fn read_upload(path: &str) -> std::io::Result<UploadedFile> {
    let bytes = tokio::fs::read(path).await?;
    let name = std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string();
    Ok(UploadedFile::new(name, bytes))
}
