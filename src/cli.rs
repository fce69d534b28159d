//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for the personas server.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::recommend::{
    Complexity, RecommendationContext, TaskDescription, TimeConstraint, Urgency,
};

/// Personas Server - persona registry and task recommendation
///
/// Resolves persona documents from built-in, user and project sources,
/// keeps them current as files change, and recommends the persona that
/// best fits a described task.
#[derive(Parser, Debug)]
#[command(name = "personas-server")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, env = "PERSONAS_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the registry, watch override directories and log reloads until Ctrl-C
    Serve,

    /// List all resolved personas
    List,

    /// Show one persona document
    Show {
        /// Persona id
        id: String,
    },

    /// Show registry statistics, conflicts and invalid documents
    Info,

    /// Recommend personas for a task
    Recommend {
        #[command(flatten)]
        task: TaskArgs,

        /// Number of recommendations (1-10)
        #[arg(short = 'n', long)]
        max: Option<u8>,

        /// Omit the reasoning text
        #[arg(long)]
        no_reasoning: bool,

        /// Time pressure: tight, normal, relaxed
        #[arg(long)]
        time_constraint: Option<TimeConstraint>,

        /// Priority: low, medium, high, critical
        #[arg(long)]
        priority: Option<Urgency>,

        /// Current project phase (added to the task context)
        #[arg(long)]
        phase: Option<String>,
    },

    /// Explain how well one persona fits a task
    Explain {
        /// Persona id
        id: String,

        #[command(flatten)]
        task: TaskArgs,
    },

    /// Compare selected personas against a task
    Compare {
        /// Persona ids to compare
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,

        #[command(flatten)]
        task: TaskArgs,
    },

    /// Show engine statistics and active scoring weights
    Stats,

    /// Validate a single persona document
    Validate {
        /// Path to the document
        file: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Task description arguments
#[derive(Args, Debug, Clone)]
pub struct TaskArgs {
    /// Task title
    #[arg(short, long)]
    pub title: String,

    /// Task description
    #[arg(short, long)]
    pub description: String,

    /// Keyword (repeatable)
    #[arg(short, long = "keyword")]
    pub keywords: Vec<String>,

    /// Task domain
    #[arg(long)]
    pub domain: Option<String>,

    /// Additional context
    #[arg(long)]
    pub context: Option<String>,

    /// Complexity: simple, moderate, complex, expert
    #[arg(long)]
    pub complexity: Option<Complexity>,

    /// Urgency: low, medium, high, critical
    #[arg(long)]
    pub urgency: Option<Urgency>,
}

impl TaskArgs {
    pub fn into_task(self) -> TaskDescription {
        TaskDescription {
            title: self.title,
            description: self.description,
            keywords: self.keywords,
            context: self.context,
            domain: self.domain,
            complexity: self.complexity,
            urgency: self.urgency,
        }
    }
}

/// Build a recommendation context when any contextual flag was given
pub fn recommendation_context(
    time_constraint: Option<TimeConstraint>,
    priority: Option<Urgency>,
    phase: Option<String>,
    max: Option<u8>,
    include_reasoning: bool,
) -> Option<RecommendationContext> {
    if time_constraint.is_none() && priority.is_none() && phase.is_none() {
        return None;
    }
    Some(RecommendationContext {
        time_constraint,
        priority,
        project_phase: phase,
        max_recommendations: max,
        include_reasoning,
    })
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show,

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        // Verifies that the CLI definition is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_command() {
        let cli = Cli::parse_from(["personas-server", "serve"]);
        assert!(matches!(cli.command, Commands::Serve));
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::parse_from(["personas-server", "list", "--config", "/path/to/config.toml"]);
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
    }

    #[test]
    fn test_recommend_arguments() {
        let cli = Cli::parse_from([
            "personas-server",
            "recommend",
            "--title",
            "Design a scalable microservices architecture",
            "--description",
            "Split the monolith",
            "-k",
            "microservices",
            "-k",
            "scalability",
            "--complexity",
            "complex",
            "--max",
            "2",
            "--no-reasoning",
        ]);
        match cli.command {
            Commands::Recommend {
                task,
                max,
                no_reasoning,
                time_constraint,
                ..
            } => {
                assert_eq!(task.keywords, vec!["microservices", "scalability"]);
                assert_eq!(task.complexity, Some(Complexity::Complex));
                assert_eq!(max, Some(2));
                assert!(no_reasoning);
                assert!(time_constraint.is_none());

                let task = task.into_task();
                assert_eq!(task.title, "Design a scalable microservices architecture");
            }
            _ => panic!("Expected Recommend command"),
        }
    }

    #[test]
    fn test_invalid_complexity_rejected() {
        let result = Cli::try_parse_from([
            "personas-server",
            "recommend",
            "-t",
            "t",
            "-d",
            "d",
            "--complexity",
            "huge",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_compare_requires_ids() {
        let result = Cli::try_parse_from(["personas-server", "compare", "-t", "t", "-d", "d"]);
        assert!(result.is_err());

        let cli = Cli::parse_from([
            "personas-server",
            "compare",
            "architect",
            "developer",
            "-t",
            "t",
            "-d",
            "d",
        ]);
        match cli.command {
            Commands::Compare { ids, .. } => assert_eq!(ids, vec!["architect", "developer"]),
            _ => panic!("Expected Compare command"),
        }
    }

    #[test]
    fn test_recommendation_context_only_when_flagged() {
        assert!(recommendation_context(None, None, None, Some(3), true).is_none());

        let ctx =
            recommendation_context(Some(TimeConstraint::Tight), None, None, Some(2), true).unwrap();
        assert_eq!(ctx.time_constraint, Some(TimeConstraint::Tight));
        assert_eq!(ctx.max_recommendations, Some(2));
        assert!(ctx.include_reasoning);

        let ctx = recommendation_context(None, Some(Urgency::High), None, None, false).unwrap();
        assert!(!ctx.include_reasoning);
    }

    #[test]
    fn test_help_uses_doc_comment_summary() {
        let about = Cli::command().get_about().map(|s| s.to_string()).unwrap_or_default();
        assert!(about.starts_with("Personas Server"), "about was {:?}", about);
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["personas-server", "-vv", "stats"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_quiet_flag() {
        let cli = Cli::parse_from(["personas-server", "--quiet", "info"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["personas-server", "config", "init", "--force"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Init { path, force },
            } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
