//! CLI interface for feedback-insights

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::ai::llm::LlmClient;
use crate::config::{self, Config};
use crate::feedback::batch::{BatchEvent, BatchObserver, ChannelObserver};
use crate::feedback::{FeedbackRequest, FeedbackService};
use crate::error::FeedbackError;
use crate::store::FindField;
use crate::types::{EnhancedFeedback, FeedbackEntry};

#[derive(Parser)]
#[command(name = "feedback-insights")]
#[command(about = "Customer feedback store with AI-generated categories and actionable insights", long_about = None)]
#[command(version)]
struct Cli {
    /// Use this config file instead of the default location
    #[arg(long, global = true, env = "FEEDBACK_INSIGHTS_CONFIG")]
    config: Option<PathBuf>,

    /// Use this feedback file instead of the configured one
    #[arg(long, global = true, env = "FEEDBACK_INSIGHTS_STORE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored feedback
    List {
        /// Only entries for this department (case-insensitive)
        #[arg(short, long)]
        department: Option<String>,
        /// Only entries with this sentiment label (case-insensitive)
        #[arg(short, long)]
        sentiment: Option<String>,
    },
    /// Show a single feedback entry
    Show {
        /// Feedback id
        id: u64,
    },
    /// Label and store a new comment
    Submit {
        /// Customer name
        #[arg(short, long, default_value = "")]
        customer: String,
        /// Department the comment is about
        #[arg(short, long, default_value = "")]
        department: String,
        /// The comment text
        #[arg(long)]
        comment: String,
        /// Also generate a category and insight before storing
        #[arg(short, long)]
        enhance: bool,
    },
    /// Label and enhance a single comment without storing it
    Analyze {
        /// Customer name
        #[arg(short, long, default_value = "")]
        customer: String,
        /// Department the comment is about
        #[arg(short, long, default_value = "")]
        department: String,
        /// The comment text
        #[arg(long)]
        comment: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the sentiment label for a piece of text
    Sentiment {
        /// Text to label
        text: String,
    },
    /// Delete a feedback entry
    Delete {
        /// Feedback id
        id: u64,
    },
    /// Enhance every stored entry with a category and an actionable insight
    Enhanced {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Dashboard summary of the enhanced feedback
    Summary {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Enhance a JSON array of submissions concurrently
    Batch {
        /// File holding `[{"customer": .., "department": .., "comment": ..}, ..]`
        file: PathBuf,
        /// Report the batch id and poll its status instead of drawing a progress bar
        #[arg(long)]
        detach: bool,
        /// Persist every successfully enhanced entry to the store
        #[arg(long)]
        save: bool,
        /// Print the batch result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configure feedback-insights
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Write a default config file (keeps an existing one)
        #[arg(long)]
        init: bool,
    },
    /// Check that the completion provider answers
    Ping,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.store)?;

    match cli.command {
        Commands::List { department, sentiment } => {
            let service = FeedbackService::store_only(&config)?;
            let store = service.store();
            let entries = match (department, sentiment) {
                (Some(dept), Some(sent)) => store
                    .find_by_department(&dept)
                    .into_iter()
                    .filter(|e| FindField::Sentiment.matches(e, &sent))
                    .collect(),
                (Some(dept), None) => store.find_by_department(&dept),
                (None, Some(sent)) => store.find_by_sentiment(&sent),
                (None, None) => store.scan_all()?,
            };
            if entries.is_empty() {
                println!("No feedback found.");
            }
            for entry in &entries {
                print_entry(entry);
            }
        }
        Commands::Show { id } => {
            let service = FeedbackService::store_only(&config)?;
            match service.store().find_by_id(id) {
                Some(entry) => print_entry(&entry),
                None => {
                    eprintln!("Feedback not found: {}", id);
                    eprintln!("Use 'feedback-insights list' to see stored feedback.");
                }
            }
        }
        Commands::Submit { customer, department, comment, enhance } => {
            if enhance {
                let service = FeedbackService::from_config(&config)?;
                let request = FeedbackRequest { customer, department, comment };
                let enhanced = service.process_one(request).await?;
                println!("Saved feedback #{}", enhanced.base.id_label());
                print_enhanced(&enhanced);
            } else {
                let service = FeedbackService::store_only(&config)?;
                let saved = service.submit(&customer, &department, &comment).await?;
                println!(
                    "Saved feedback #{} ({})",
                    saved.id_label(),
                    saved.sentiment.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Analyze { customer, department, comment, json } => {
            let service = FeedbackService::from_config(&config)?;
            let enhanced = service
                .enhance_one(FeedbackRequest { customer, department, comment })
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&enhanced)?);
            } else {
                print_enhanced(&enhanced);
            }
        }
        Commands::Sentiment { text } => {
            let service = FeedbackService::store_only(&config)?;
            println!("{}", service.analyze_sentiment(&text)?);
        }
        Commands::Delete { id } => {
            let service = FeedbackService::store_only(&config)?;
            match service.delete(id).await {
                Ok(()) => println!("Feedback deleted: {}", id),
                Err(FeedbackError::NotFound(_)) => eprintln!("Feedback not found: {}", id),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Enhanced { json } => {
            let service = FeedbackService::from_config(&config)?;
            let all = service.enhanced().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(all.as_slice())?);
            } else {
                for feedback in all.iter() {
                    print_enhanced(feedback);
                }
            }
        }
        Commands::Summary { json } => {
            let service = FeedbackService::from_config(&config)?;
            let summary = service.summary().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("\n=== Feedback Summary ===");
                println!("Total feedback: {}", summary.total_feedback);
                print_counts("Sentiment", &summary.sentiment_counts);
                print_counts("Category", &summary.category_counts);
                print_counts("Department", &summary.department_counts);
                println!("\nMost recent:");
                for feedback in &summary.recent_feedback {
                    print_enhanced(feedback);
                }
            }
        }
        Commands::Batch { file, detach, save, json } => {
            run_batch(&config, &file, detach, save, json).await?;
        }
        Commands::Config { show, init } => {
            if init {
                let path = config::config_path()?;
                if path.exists() {
                    println!("Config already exists at {}", path.display());
                } else {
                    Config::default().save()?;
                    println!("Wrote default config to {}", path.display());
                }
            } else if show {
                config::show_config(&config)?;
            } else {
                println!("Configuration options:");
                println!("  --show    Display current configuration");
                println!("  --init    Write a default config file");
                println!();
                println!("Default config:");
                print!("{}", config::default_config_toml());
            }
        }
        Commands::Ping => {
            let client = LlmClient::from_config(&config).context("Failed to create completion client")?;
            println!("Testing connection to {}...", client.provider().kind.name());
            if client.test_connection().await {
                println!("Connection OK");
            } else {
                anyhow::bail!("Completion provider did not answer; see log output for details");
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>, store: Option<PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if store.is_some() {
        config.store.path = store;
    }
    Ok(config)
}

async fn run_batch(config: &Config, file: &Path, detach: bool, save: bool, json: bool) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read batch file {}", file.display()))?;
    let requests: Vec<FeedbackRequest> =
        serde_json::from_str(&contents).context("Batch file must be a JSON array of feedback")?;

    let service = FeedbackService::from_config(config)?;
    let entries = service.prepare_batch(requests)?;
    let total = entries.len() as u64;

    let result = if detach {
        let handle = service.spawn_batch(entries, None);
        println!("Started batch {}", handle.batch_id());
        while !handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let status = handle.status();
            println!(
                "  {} / {} processed ({} ok, {} failed)",
                status.processed_entries,
                status.total_entries,
                status.successful_entries,
                status.failed_entries
            );
        }
        handle.join().await?
    } else {
        let (observer, mut events) = ChannelObserver::new();
        let observer: Arc<dyn BatchObserver> = Arc::new(observer);
        let handle = service.spawn_batch(entries, Some(observer));

        let pb = create_batch_bar(total);
        while let Some(event) = events.recv().await {
            match event {
                BatchEvent::Progress(progress) => pb.set_position(progress.processed as u64),
                BatchEvent::Completed(_) => break,
            }
        }
        pb.finish_and_clear();
        handle.join().await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Batch {}: {} total, {} succeeded, {} failed",
            if result.completed { "completed" } else { "failed" },
            result.total_entries,
            result.successful_entries,
            result.failed_entries
        );
        for error in &result.errors {
            eprintln!("  {}", error);
        }
    }

    if save {
        let mut saved = 0;
        for enhanced in &result.results {
            match service.save_enhanced(enhanced).await {
                Ok(_) => saved += 1,
                Err(e) => eprintln!("Failed to save feedback #{}: {}", enhanced.base.id_label(), e),
            }
        }
        println!("Saved {} entries to {}", saved, service.store().path().display());
    }

    Ok(())
}

fn create_batch_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner:.dim} [{bar:30}] {pos}/{len} enhanced ({percent}%)")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn print_entry(entry: &FeedbackEntry) {
    println!("\n=== Feedback #{} ===", entry.id_label());
    println!("Customer:   {}", entry.customer.as_deref().unwrap_or("-"));
    println!("Department: {}", entry.department.as_deref().unwrap_or("-"));
    if let Some(date) = entry.date {
        println!("Date:       {}", date.format("%Y-%m-%d"));
    }
    println!("Sentiment:  {}", entry.sentiment.as_deref().unwrap_or("-"));
    println!("Comment:    {}", entry.comment.as_deref().unwrap_or(""));
}

fn print_enhanced(feedback: &EnhancedFeedback) {
    print_entry(&feedback.base);
    println!("Category:   {}", feedback.category);
    println!("Insight:    {}", feedback.actionable_insight);
}

fn print_counts(title: &str, counts: &std::collections::BTreeMap<String, usize>) {
    println!("\n{}:", title);
    for (key, count) in counts {
        println!("  {:<24} {}", key, count);
    }
}
