use anyhow::{bail, Context as AnyhowContext, Result};
use clap::Parser;
use context_engine::{EngineConfig, LocalContextEngine};
use context_protocol::LocalContextRequest;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "context-local")]
#[command(about = "Ranked jump targets and a drafted answer for a question about a repository", long_about = None)]
#[command(version)]
struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(default_value = ".")]
    project: PathBuf,

    /// Question about the code
    #[arg(short = 'q', long)]
    query: Option<String>,

    /// understand | debug | implement | review
    #[arg(long)]
    task_type: Option<String>,

    /// auto | init-read-write | api-route | auth | error-driven
    #[arg(long)]
    attack_plan: Option<String>,

    /// Jump targets to return (clamped to 1..=20)
    #[arg(long)]
    max_similar_chunks: Option<usize>,

    /// Token budget for the mini bundle
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Glob of files to leave out (repeatable)
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    /// Re-index instead of reusing a cached project index
    #[arg(long)]
    no_cache: bool,

    /// Add a debug block to the retrieval bundle
    #[arg(long)]
    debug: bool,

    /// Inline JSON request (replaces the flags above; mutually exclusive with --file)
    #[arg(long, conflicts_with = "file")]
    json: Option<String>,

    /// Path to a JSON request, `-` for stdin
    #[arg(long)]
    file: Option<PathBuf>,

    /// Engine configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretty-print JSON response
    #[arg(long)]
    pretty: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    fn request(&self) -> Result<LocalContextRequest> {
        if let Some(json) = &self.json {
            return serde_json::from_str(json).context("Invalid --json request");
        }
        if let Some(path) = &self.file {
            let text = read_request_file(path)?;
            return serde_json::from_str(&text)
                .with_context(|| format!("Invalid request in {}", path.display()));
        }
        Ok(LocalContextRequest {
            project_path: Some(self.project.to_string_lossy().into_owned()),
            query: self.query.clone(),
            task_type: self.task_type.clone(),
            max_similar_chunks: self.max_similar_chunks,
            max_tokens: self.max_tokens,
            attack_plan: self.attack_plan.clone(),
            exclude_patterns: self.exclude.clone(),
            use_project_hints_cache: Some(!self.no_cache),
            debug: self.debug,
            ..LocalContextRequest::default()
        })
    }

    fn engine_config(&self) -> Result<EngineConfig> {
        let config = match &self.config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        Ok(config.with_env_overrides())
    }
}

fn read_request_file(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read request from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn init_logging(cli: &Cli) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let request = cli.request()?;
    let engine = LocalContextEngine::new(cli.engine_config()?);
    log::debug!("Engine config: {:?}", engine.config());

    let response = engine.run(&request).await.context("Request rejected")?;
    let text = if cli.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    print_stdout(&text)?;

    if !response.success {
        bail!("{}", response.answer_draft);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_build_a_request() {
        let cli = Cli::parse_from([
            "context-local",
            "/repo",
            "-q",
            "database initialization",
            "--attack-plan",
            "init-read-write",
            "--exclude",
            "**/auth/**",
            "--exclude",
            "**/legacy/**",
            "--no-cache",
        ]);
        let request = cli.request().unwrap();
        assert_eq!(request.project_path.as_deref(), Some("/repo"));
        assert_eq!(request.query.as_deref(), Some("database initialization"));
        assert_eq!(request.attack_plan.as_deref(), Some("init-read-write"));
        assert_eq!(request.exclude_patterns.len(), 2);
        assert!(!request.use_cache());
    }

    #[test]
    fn json_request_wins_over_flags() {
        let cli = Cli::parse_from([
            "context-local",
            "--json",
            r#"{"projectPath":"/other","query":"auth","maxTokens":100}"#,
        ]);
        let request = cli.request().unwrap();
        assert_eq!(request.project_path.as_deref(), Some("/other"));
        assert_eq!(request.effective_max_tokens(), 100);
    }

    #[test]
    fn json_and_file_conflict() {
        let parsed = Cli::try_parse_from(["context-local", "--json", "{}", "--file", "req.json"]);
        assert!(parsed.is_err());
    }
}
