//! CLI argument parsing for the fetch-chain workflow.
//!
//! Every command works against one workspace directory; see
//! [`crate::workspace::WorkspacePaths`] for its layout.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "mchain",
    version,
    about = "Resolve manifest override sources and chain their fetch rounds",
    after_help = "Commands:\n  plan --workspace <dir>                 Show ordered overrides and planned rounds\n  validate --workspace <dir>             Check the step for configuration errors\n  start --workspace <dir>                Emit the first fetch round (or finish)\n  resume --workspace <dir> --reply <f>   Consume a round reply\n  abort --workspace <dir>                Cancel the chain in progress\n\nExamples:\n  mchain plan --workspace /tmp/deploy\n  mchain start --workspace /tmp/deploy --step /tmp/deploy/step.json\n  mchain resume --workspace /tmp/deploy --reply reply.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Plan(PlanArgs),
    Validate(ValidateArgs),
    Start(StartArgs),
    Resume(ResumeArgs),
    Abort(AbortArgs),
}

impl Command {
    pub fn verbose(&self) -> bool {
        match self {
            Command::Plan(args) => args.verbose,
            Command::Validate(args) => args.verbose,
            Command::Start(args) => args.verbose,
            Command::Resume(args) => args.verbose,
            Command::Abort(args) => args.verbose,
        }
    }
}

/// Plan command inputs: a dry run that never dispatches.
#[derive(Parser, Debug)]
#[command(about = "Print aggregated overrides and the rounds they need")]
pub struct PlanArgs {
    /// Workspace root holding connectors, secrets, variables and the file store
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub workspace: PathBuf,

    /// Apply step JSON (defaults to <workspace>/step.json)
    #[arg(long, value_name = "FILE")]
    pub step: Option<PathBuf>,

    /// Emit debug diagnostics on stderr
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Check an apply step for configuration errors")]
pub struct ValidateArgs {
    /// Workspace root holding connectors, secrets, variables and the file store
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub workspace: PathBuf,

    /// Apply step JSON (defaults to <workspace>/step.json)
    #[arg(long, value_name = "FILE")]
    pub step: Option<PathBuf>,

    /// Emit debug diagnostics on stderr
    #[arg(long)]
    pub verbose: bool,
}

/// Start command inputs; writes `chain/state.json` and `chain/request.json`.
#[derive(Parser, Debug)]
#[command(about = "Start a fetch chain for an apply step")]
pub struct StartArgs {
    /// Workspace root holding connectors, secrets, variables and the file store
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub workspace: PathBuf,

    /// Apply step JSON (defaults to <workspace>/step.json)
    #[arg(long, value_name = "FILE")]
    pub step: Option<PathBuf>,

    /// Emit debug diagnostics on stderr
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Resume a fetch chain with the awaited round's reply")]
pub struct ResumeArgs {
    /// Workspace root holding connectors, secrets, variables and the file store
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub workspace: PathBuf,

    /// Round reply JSON from the worker
    #[arg(long, value_name = "FILE")]
    pub reply: PathBuf,

    /// Chain state snapshot (defaults to <workspace>/chain/state.json)
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Emit debug diagnostics on stderr
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Cancel the fetch chain in progress")]
pub struct AbortArgs {
    /// Workspace root holding connectors, secrets, variables and the file store
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub workspace: PathBuf,

    /// Chain state snapshot (defaults to <workspace>/chain/state.json)
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,

    #[arg(long, default_value = "cancelled by user")]
    pub reason: String,

    /// Emit debug diagnostics on stderr
    #[arg(long)]
    pub verbose: bool,
}
