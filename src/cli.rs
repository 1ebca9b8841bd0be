use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "job-intake", about = "Job intake and dispatch service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply pending database migrations and exit.
    Migrate,
}
