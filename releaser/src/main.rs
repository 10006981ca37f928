//! Release cutter CLI entrypoint.
//!
//! This binary cuts a hermetic_cc_toolchain release: it checks the
//! repository, publishes boilerplate carrying the archive hash, tags, and
//! writes the verified archive. The boilerplate for the release notes is
//! printed at the end.

use clap::Parser;
use release_cutter::cli::Cli;
use release_cutter::command::SystemCommandExecutor;
use release_cutter::config::ReleaseConfig;
use release_cutter::error::Result;
use release_cutter::git::GitRepository;
use release_cutter::mirror::HttpProbe;
use release_cutter::output::{format_human, format_json, write_line, write_stderr_line};
use release_cutter::release::Releaser;
use std::error::Error as _;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Install `env_logger` at the `-v` level unless `RUST_LOG` says otherwise.
fn init_logging(cli: &Cli) {
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    let root = cli.repo_root()?;
    let config = ReleaseConfig::load(root, cli.config.as_deref())?;

    let executor = SystemCommandExecutor::with_timeout(config.timeouts.command());
    let repository = GitRepository::new(root, executor);
    let probe = HttpProbe::with_timeout(config.timeouts.probe());

    let report =
        Releaser::new(root, &config, &repository, &probe).run(&cli.release_options(), stderr)?;

    let text = if cli.json {
        format_json(&report)
    } else {
        format_human(&report)
    };
    write_line(stdout, text.trim_end());
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            let mut source = err.source();
            while let Some(cause) = source {
                write_stderr_line(stderr, format!("  caused by: {cause}"));
                source = cause.source();
            }
            1
        }
    }
}
