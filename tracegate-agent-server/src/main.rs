use std::process::ExitCode;
use tracegate_agent_server::Settings;
use tracegate_launcher::ConfigSettings;

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match Settings::build() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("invalid configuration: {err:#}");
            return ExitCode::from(1);
        }
    };

    if let Err(err) = tracegate_launcher::tracing::init_logs(&settings.tracing) {
        eprintln!("failed to initialize logging: {err:#}");
        return ExitCode::from(1);
    }

    if let Err(err) = tracegate_agent_server::run(settings).await {
        tracing::error!(error = ?err, "agent terminated");
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}
