use printchat_core::catalog::Catalog;
use printchat_core::config::{AppConfig, LlmProvider, LoadOptions};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    if json_output {
        return CommandResult::json("doctor", exit_code, &report);
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_catalog(&config));
            checks.push(check_llm_credentials(&config));
            checks.push(check_cloudprinter_credentials(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["catalog_load", "llm_credentials", "cloudprinter_credentials"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks.iter().any(|check| matches!(check.status, CheckStatus::Fail | CheckStatus::Skipped));
    let warned = checks.iter().any(|check| check.status == CheckStatus::Warn);
    let (overall_status, summary) = if failed {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    } else if warned {
        (CheckStatus::Warn, "doctor: ready with warnings")
    } else {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    match Catalog::load(&config.catalog.path) {
        Ok(catalog) if catalog.is_empty() => DoctorCheck {
            name: "catalog_load",
            status: CheckStatus::Fail,
            details: format!("`{}` contains no products", config.catalog.path.display()),
        },
        Ok(catalog) => DoctorCheck {
            name: "catalog_load",
            status: CheckStatus::Pass,
            details: format!(
                "{} products in {} categories from `{}`",
                catalog.len(),
                catalog.categories().len(),
                config.catalog.path.display()
            ),
        },
        Err(error) => {
            DoctorCheck { name: "catalog_load", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn check_llm_credentials(config: &AppConfig) -> DoctorCheck {
    let details = match config.llm.provider {
        LlmProvider::OpenAi => {
            format!("openai key present; model `{}`", config.llm.model)
        }
        LlmProvider::Ollama => {
            format!("ollama at `{}` needs no key; model `{}`", config.llm.effective_base_url(), config.llm.model)
        }
    };
    DoctorCheck { name: "llm_credentials", status: CheckStatus::Pass, details }
}

fn check_cloudprinter_credentials(config: &AppConfig) -> DoctorCheck {
    if config.cloudprinter.api_key.is_some() {
        DoctorCheck {
            name: "cloudprinter_credentials",
            status: CheckStatus::Pass,
            details: "cloudprinter api key present".to_string(),
        }
    } else {
        DoctorCheck {
            name: "cloudprinter_credentials",
            status: CheckStatus::Warn,
            details: "no cloudprinter api key (set PRINTCHAT_CLOUDPRINTER_API_KEY or CLOUDPRINT_API_KEY); product info and pricing calls will be rejected upstream".to_string(),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
