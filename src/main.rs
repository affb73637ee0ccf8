//! shell-spawn binary entry point.

use std::io::Write;
use std::process::ExitCode;

use shell_spawn::cli::{self, Args};
use shell_spawn::config::Config;
use shell_spawn::{logging, Captured, Context, Options, Outcome};
use tracing::{debug, error};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'shell-spawn --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    let _ = logging::init_with_filter(config.log_filter());
    debug!("shell-spawn v{}", env!("CARGO_PKG_VERSION"));

    if args.command.is_empty() {
        eprintln!("error: no command given");
        eprintln!("Try 'shell-spawn --help' for more information.");
        return ExitCode::from(2);
    }

    let ctx = Context::new(Options::defaults().merge(&config.to_options()));
    run(&ctx, &args).await
}

async fn run(ctx: &Context, args: &Args) -> ExitCode {
    let overrides = args.overrides();

    let execution = if args.direct {
        let (program, rest) = match args.command.split_first() {
            Some(split) => split,
            None => return ExitCode::from(2),
        };
        ctx.spawn(program, rest.iter().cloned(), overrides)
    } else {
        ctx.exec(&args.command.join(" "), overrides)
    };

    let result = match execution {
        Ok(execution) => execution.wait().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(Some(outcome)) => report(outcome),
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            let code = e.exit_code().and_then(|c| u8::try_from(c).ok()).unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn report(outcome: Outcome) -> ExitCode {
    if let Some(Captured::Text(text)) = &outcome.stdout {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
    if let Some(Captured::Text(text)) = &outcome.stderr {
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(text.as_bytes());
    }

    match outcome.exit_code {
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => ExitCode::from(1),
    }
}
