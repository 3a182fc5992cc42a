//! Doctor command - verify configuration and connectivity.

use crate::cli::{mask_secret, Output};
use crate::config::Settings;
use crate::scoring::ScoringClient;
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("gaia-agent Doctor");
    println!();
    println!("Checking configuration and connectivity...\n");

    let mut checks = Vec::new();

    println!("{}", style("Model").bold());
    let model_checks = vec![check_api_key(settings), check_settings(settings)];
    for check in &model_checks {
        check.print();
    }
    checks.extend(model_checks);

    println!();

    println!("{}", style("Directories").bold());
    let dir_checks = check_directories(settings);
    for check in &dir_checks {
        check.print();
    }
    checks.extend(dir_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    println!("{}", style("Scoring Service").bold());
    let service_check = check_scoring_service(settings).await;
    service_check.print();
    checks.push(service_check);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before answering questions.",
            errors
        ));
        anyhow::bail!("doctor found {} error(s)", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! gaia-agent is ready to use.");
    }

    Ok(())
}

/// Check that a Gemini API key is configured.
fn check_api_key(settings: &Settings) -> CheckResult {
    match settings.model.api_key.as_deref().map(str::trim) {
        Some(key) if key.starts_with("AIza") && key.len() > 20 => CheckResult::ok(
            "GEMINI_API_KEY",
            &format!("configured ({})", mask_secret(key)),
        ),
        Some(key) if key.is_empty() => CheckResult::error(
            "GEMINI_API_KEY",
            "empty",
            "Set with: export GEMINI_API_KEY='...' (or add it to .env)",
        ),
        Some(_) => CheckResult::warning(
            "GEMINI_API_KEY",
            "set but format looks unusual",
            "Expected a Google AI Studio key starting with AIza",
        ),
        None => CheckResult::error(
            "GEMINI_API_KEY",
            "not set",
            "Set with: export GEMINI_API_KEY='...' (or add it to .env)",
        ),
    }
}

/// Check that the rest of the settings validate.
fn check_settings(settings: &Settings) -> CheckResult {
    // A missing key is already reported on its own
    let mut candidate = settings.clone();
    candidate.model.api_key.get_or_insert_with(|| "placeholder".to_string());

    match candidate.validate() {
        Ok(()) => CheckResult::ok(
            "Settings",
            &format!(
                "model {} at temperature {}",
                settings.model.name, settings.model.temperature
            ),
        ),
        Err(e) => CheckResult::error("Settings", &e.to_string(), "Fix with: gaia-agent config show"),
    }
}

/// Check the data directory and the staged question set.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok(
            "Data directory",
            &format!("{}", data_dir.display()),
        ));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created by: gaia-agent fetch",
        ));
    }

    let questions_path = settings.questions_path();
    if questions_path.exists() {
        let size = std::fs::metadata(&questions_path)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        results.push(CheckResult::ok(
            "Questions",
            &format!("{} ({})", questions_path.display(), size),
        ));
    } else {
        results.push(CheckResult::warning(
            "Questions",
            &format!("{} (not fetched yet)", questions_path.display()),
            "Download with: gaia-agent fetch",
        ));
    }

    results
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: gaia-agent config init",
        )
    }
}

/// Check that the scoring service answers `GET /questions`.
async fn check_scoring_service(settings: &Settings) -> CheckResult {
    let client = match ScoringClient::new(&settings.api) {
        Ok(client) => client,
        Err(e) => return CheckResult::error("Questions endpoint", &e.to_string(), "Check api.base_url"),
    };

    match client.questions_raw().await {
        Ok(questions) => CheckResult::ok(
            "Questions endpoint",
            &format!("{} ({} questions)", client.questions_url(), questions.len()),
        ),
        Err(e) => CheckResult::error(
            "Questions endpoint",
            &e.to_string(),
            "Check api.base_url or API_BASE_URL and your network connection",
        ),
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_api_key() {
        let mut settings = Settings::default();
        settings.model.api_key = None;
        assert_eq!(check_api_key(&settings).status, CheckStatus::Error);

        settings.model.api_key = Some("not-a-google-key".to_string());
        assert_eq!(check_api_key(&settings).status, CheckStatus::Warning);

        settings.model.api_key = Some("AIzaSyA-0123456789abcdefghij".to_string());
        let check = check_api_key(&settings);
        assert_eq!(check.status, CheckStatus::Ok);
        assert!(!check.message.contains("AIzaSyA-0123"));
    }

    #[test]
    fn test_check_settings_ignores_missing_key() {
        let mut settings = Settings::default();
        settings.model.api_key = None;
        assert_eq!(check_settings(&settings).status, CheckStatus::Ok);

        settings.model.temperature = 3.5;
        assert_eq!(check_settings(&settings).status, CheckStatus::Error);
    }

    #[tokio::test]
    async fn test_scoring_service_check() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/questions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "task_id": "t1", "question": "Q" }
            ])))
            .mount(&server)
            .await;

        let mut settings = Settings::default();
        settings.api.base_url = server.uri();
        let check = check_scoring_service(&settings).await;
        assert_eq!(check.status, CheckStatus::Ok);
        assert!(check.message.contains("1 questions"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }
}
