use crate::demo::{run_demo, run_explain, run_score, DemoArgs, ExplainArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use dropout_risk::config::AssessmentSettings;
use dropout_risk::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Dropout Risk Assessor",
    about = "Score, explain and serve student dropout risk assessments",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score every student in a CSV export and print the cohort summary
    Score(ScoreArgs),
    /// Explain the assessment of a single student record stored as JSON
    Explain(ExplainArgs),
    /// Assess two sample students end to end
    Demo(DemoArgs),
}

/// Overrides for where the trained model and rule tables are read from.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct AssessmentArgs {
    /// Path to a decision forest JSON file (overrides RISK_MODEL_PATH)
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
    /// Path to a rule table JSON file (overrides RISK_RULES_PATH)
    #[arg(long)]
    pub(crate) rules: Option<PathBuf>,
}

impl AssessmentArgs {
    pub(crate) fn apply(self, settings: &mut AssessmentSettings) {
        if let Some(model) = self.model {
            settings.model_path = Some(model);
        }
        if let Some(rules) = self.rules {
            settings.rules_path = Some(rules);
        }
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) assessment: AssessmentArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Explain(args) => run_explain(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["dropout-risk-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn score_accepts_model_and_rule_overrides() {
        let cli = Cli::try_parse_from([
            "dropout-risk-api",
            "score",
            "--csv",
            "students.csv",
            "--model",
            "forest.json",
        ])
        .expect("parses");

        let Some(Command::Score(args)) = cli.command else {
            panic!("expected score command");
        };
        assert_eq!(args.csv, PathBuf::from("students.csv"));

        let mut settings = AssessmentSettings {
            model_path: None,
            rules_path: Some(PathBuf::from("env-rules.json")),
        };
        args.assessment.apply(&mut settings);
        assert_eq!(settings.model_path, Some(PathBuf::from("forest.json")));
        assert_eq!(settings.rules_path, Some(PathBuf::from("env-rules.json")));
    }

    #[test]
    fn explain_requires_a_student_file() {
        assert!(Cli::try_parse_from(["dropout-risk-api", "explain"]).is_err());
    }
}
