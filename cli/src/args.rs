use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use coursefetch_client::SortKey;

/// Fetch course listings from the portal proxy, retrying through flaky
/// backend sessions until it works or you press Ctrl-C.
#[derive(Debug, Parser)]
#[command(name = "coursefetch", version)]
pub struct Cli {
    /// Config file (defaults to ./coursefetch.toml, then
    /// ~/.config/coursefetch/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override `portal.base_url`.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the credentials are accepted.
    Login(Credentials),
    /// List departments and semesters.
    Options(OptionsArgs),
    /// List course sections for a department and semester.
    Courses(CoursesArgs),
}

/// Password comes from `COURSEFETCH_PASSWORD`, or the first line on stdin.
#[derive(Debug, Args)]
pub struct Credentials {
    /// Portal user ID.
    #[arg(long = "user", short = 'u')]
    pub user: String,
}

#[derive(Debug, Args)]
pub struct OptionsArgs {
    #[command(flatten)]
    pub credentials: Credentials,

    #[arg(long, value_enum, default_value_t = OptionsFormat::Table)]
    pub format: OptionsFormat,
}

#[derive(Debug, Args)]
pub struct CoursesArgs {
    #[command(flatten)]
    pub credentials: Credentials,

    /// Department ID (see `coursefetch options`).
    #[arg(long = "dept", short = 'd')]
    pub department: String,

    /// Semester ID (see `coursefetch options`).
    #[arg(long = "semester", short = 's')]
    pub semester: String,

    /// Only sections with seats left.
    #[arg(long)]
    pub available: bool,

    /// Keep sections matching any tag (code, section, name, days, time, room).
    #[arg(long = "tag", short = 't')]
    pub tags: Vec<String>,

    /// code, seats-left, name or time.
    #[arg(long)]
    pub sort: Option<SortKey>,

    #[arg(long, value_enum, default_value_t = CourseFormat::Table)]
    pub format: CourseFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OptionsFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CourseFormat {
    Table,
    Json,
    Csv,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_courses_invocation() {
        let cli = Cli::try_parse_from([
            "coursefetch",
            "courses",
            "--user",
            "2021-1-60-001",
            "--dept",
            "7",
            "--semester",
            "231",
            "--available",
            "--tag",
            "cse110",
            "-t",
            "friday",
            "--sort",
            "seats-left",
            "--format",
            "csv",
        ])
        .unwrap();

        let Command::Courses(args) = cli.command else {
            panic!("expected courses command");
        };
        assert_eq!(args.credentials.user, "2021-1-60-001");
        assert_eq!(args.department, "7");
        assert!(args.available);
        assert_eq!(args.tags, vec!["cse110", "friday"]);
        assert_eq!(args.sort, Some(SortKey::SeatsLeft));
        assert_eq!(args.format, CourseFormat::Csv);
    }

    #[test]
    fn rejects_unknown_sort_key() {
        let result = Cli::try_parse_from([
            "coursefetch",
            "courses",
            "--user",
            "x",
            "--dept",
            "1",
            "--semester",
            "2",
            "--sort",
            "popularity",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "coursefetch",
            "login",
            "--user",
            "x",
            "--base-url",
            "http://127.0.0.1:9/V2/api",
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://127.0.0.1:9/V2/api"));
    }
}
