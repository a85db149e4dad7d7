//! Dr. Squid - mock responder and operator tooling

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use dr_squid::{
    cli::{Cli, Command, TokenCommand},
    logging,
    outcome::{Buckets, Outcome},
    profile::FaultProfile,
    responder::MockServer,
    settings::Settings,
    setup_tracing,
    token::{self, MockToken},
};

#[tokio::main]
async fn main() -> ExitCode {
    let mut cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    logging::apply_override(cli.fault_logging);
    logging::set_force_logging(cli.force_logging);

    match cli.command.take() {
        Some(Command::Validate { file }) => run_validate(&file).await,
        Some(Command::Token(cmd)) => run_token_command(&cmd),
        Some(Command::Serve) | None => run_server(cli).await,
    }
}

/// Run the mock responder
async fn run_server(cli: Cli) -> ExitCode {
    let mut settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // CLI overrides
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(directory) = cli.profiles {
        settings.profiles.directory = directory;
    }

    info!(
        threshold = %logging::logging_level(),
        force = logging::force_logging(),
        "Fault pipeline logging"
    );

    match MockServer::new(settings).run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Mock responder error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Parse a fault profile and print a summary
async fn run_validate(file: &Path) -> ExitCode {
    let text = match tokio::fs::read_to_string(file).await {
        Ok(text) => text,
        Err(e) => {
            eprintln!("❌ Failed to read {}: {e}", file.display());
            return ExitCode::FAILURE;
        }
    };

    let profile = match FaultProfile::from_yaml(&text) {
        Ok(profile) => profile,
        Err(e) => {
            eprintln!("❌ Failed to parse: {e}");
            return ExitCode::FAILURE;
        }
    };

    let state = if profile.is_enabled() { "enabled" } else { "disabled" };
    println!("✅ {} - valid ({state})", file.display());
    if let Some(level) = profile.logging_level {
        println!("   Logging level: {level}");
    }

    let mut problems = 0;
    for service in profile.services() {
        let flag = if service.enabled { "on " } else { "off" };
        println!("   [{flag}] {} ({})", service.name, service.url_pattern);
        let Some(behavior) = &service.behavior else {
            println!("         no behavior, calls pass through");
            continue;
        };
        let [success, failure, timeout] = behavior.percentages();
        if Buckets::compute(success, failure, timeout).is_err() {
            problems += 1;
            println!("         ⚠ percentages {success}/{failure}/{timeout} do not sum to 100");
        } else {
            println!("         success {success}% / failure {failure}% / timeout {timeout}%");
        }
    }
    for rule in profile.databases() {
        let flag = if rule.enabled { "on " } else { "off" };
        println!("   [{flag}] {} store", rule.kind);
    }

    if problems > 0 {
        eprintln!("❌ {problems} service(s) would never be faulted");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Encode or decode a token
fn run_token_command(cmd: &TokenCommand) -> ExitCode {
    match cmd {
        TokenCommand::Encode {
            client,
            pattern,
            profile,
            status,
        } => {
            if let Err(e) = status.parse::<Outcome>() {
                eprintln!("❌ {e}");
                return ExitCode::FAILURE;
            }
            println!("{}", token::encode(client, pattern, profile, status));
            ExitCode::SUCCESS
        }
        TokenCommand::Decode { token } => match MockToken::decode(token) {
            Ok(decoded) => {
                println!("clientName:        {}", decoded.client_name);
                println!("downstreamPattern: {}", decoded.downstream_pattern);
                println!("profile:           {}", decoded.profile);
                println!("status:            {}", decoded.status);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ {e}");
                ExitCode::FAILURE
            }
        },
    }
}
