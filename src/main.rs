use anyhow::Result;
use clap::Parser;
use ficstream::{
    cli::{Cli, Commands},
    infra::logging,
};

fn main() -> Result<()>
{
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Build a context once, pass everywhere
    let ctx = cli.context();

    match cli.command
    {
        Commands::Count(args) => ficstream::count_run(args, &ctx),
        Commands::Entities(args) => ficstream::entities_run(args, &ctx),
        Commands::Cooccur(args) => ficstream::cooccur_run(args, &ctx),
        Commands::Rewrite(args) => ficstream::rewrite_run(args, &ctx),
        Commands::Export(args) => ficstream::export_run(args, &ctx),
        Commands::Report(args) => ficstream::report_run(args, &ctx),
        Commands::Init(args) => ficstream::infra::config::init(args, &ctx),
        Commands::Completions(args) => ficstream::completion::run(args),
    }
}
