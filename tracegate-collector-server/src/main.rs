use std::process::ExitCode;
use tracegate_collector_server::Settings;
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

    if let Err(err) = tracegate_collector_server::run(settings).await {
        tracing::error!(error = ?err, "collector terminated");
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}
