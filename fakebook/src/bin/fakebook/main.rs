mod commands;
mod context;
mod examples;
mod output;
mod theme;
mod views;

use std::{
    fmt::Write,
    io::{self, Write as IoWrite},
    path::PathBuf,
};

use anyhow::Result;
use clap::{
    ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Color as ClapColor, RgbColor, Style},
    },
    error::ErrorKind,
};
use colored::{Color as ThemeColor, Colorize, control::ShouldColorize};
use fakebook::{Authenticator, config::CONFIG_ENV};

use commands::{
    Session,
    admin::{AdminCommands, handle_admin_commands},
    demo::handle_demo,
    friend::{FriendCommands, handle_friend_commands},
    post::{PostCommands, handle_post_commands},
    user::{UserCommands, handle_user_commands},
};
use context::{Actor, AppContext};
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{ICONS, THEME};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("FAKEBOOK_CONFIG", "Path to the config file (default: nearest .fakebook/config.toml)"),
    ("FAKEBOOK_AS", "Email of the acting user"),
    ("FAKEBOOK_PASSWORD", "Password of the acting user"),
    ("RUST_LOG", "Log filter, e.g. fakebook=debug"),
];

#[derive(Parser)]
#[command(name = "fakebook")]
#[command(version)]
#[command(
    about = "Operator console for the fakebook social core",
    long_about = r#"Operator console for the fakebook social core:

• Accounts and profiles
• Friend requests and friendships
• Posts with public, friends-only and private visibility
• Likes, comments and admin moderation

Commands run against the store named in the config file. The default
memory store forgets everything when the command exits; use 'demo' to see
a full walkthrough, or point [store] at Redis.
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Config file to load
    #[arg(long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Act as the user with this email
    #[arg(long = "as", env = "FAKEBOOK_AS", value_name = "EMAIL")]
    as_user: Option<String>,

    /// Password for --as
    #[arg(long, env = "FAKEBOOK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn parse_with_styles() -> Self {
        let command = build_cli_command();
        match command.styles(help_styles()).try_get_matches() {
            Ok(matches) => match Cli::from_arg_matches(&matches) {
                Ok(cli) => cli,
                Err(err) => err.exit(),
            },
            Err(err) => match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = print_blank_line_stdout();
                    if let Err(print_err) = err.print()
                        && print_err.kind() != io::ErrorKind::BrokenPipe
                    {
                        eprintln!("Failed to display help: {print_err}");
                    }
                    let _ = print_blank_line_stdout();
                    std::process::exit(0);
                }
                ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                    handle_missing_subcommand(err);
                }
                _ => {
                    let exit_code = err.exit_code();
                    let _ = print_blank_line_stderr();
                    if let Err(print_err) = err.print()
                        && print_err.kind() != io::ErrorKind::BrokenPipe
                    {
                        eprintln!("Failed to display error: {print_err}");
                    }
                    let _ = print_blank_line_stderr();
                    std::process::exit(exit_code);
                }
            },
        }
    }
}

fn handle_missing_subcommand(error: clap::error::Error) -> ! {
    let mut command = build_cli_command();
    let command_name = command
        .get_display_name()
        .unwrap_or_else(|| command.get_name())
        .to_string();

    let _ = print_blank_line_stderr();
    eprintln!("error: '{command_name}' requires a subcommand but one was not provided");
    let _ = print_blank_line_stderr();

    command = command.styles(help_styles());

    let mut stderr = io::stderr();
    if command.write_long_help(&mut stderr).is_ok() {
        let _ = IoWrite::write_all(&mut stderr, b"\n");
        let _ = IoWrite::flush(&mut stderr);
    }

    let _ = print_blank_line_stderr();
    std::process::exit(error.exit_code());
}

fn build_cli_command() -> Command {
    let use_color = detect_color_support();
    let appendix = render_top_level_appendix(use_color);
    let mut command = Cli::command().after_long_help(appendix);
    command = command.color(if use_color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    });
    attach_command_examples(&mut command, use_color);
    command
}

fn attach_command_examples(command: &mut Command, use_color: bool) {
    for example in command_examples() {
        if let Some(subcommand) = command.find_subcommand_mut(example.name) {
            let help_text = render_examples(example.groups, use_color);
            *subcommand = subcommand.clone().after_long_help(help_text);
        }
    }
}

fn render_examples(groups: &[ExampleGroup], use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let heading = stylize("Examples:", theme.highlight, true, use_color);
    let _ = writeln!(buffer, "{heading}");

    for (index, group) in groups.iter().enumerate() {
        let title = stylize(group.title, theme.primary, true, use_color);
        let _ = writeln!(buffer, "  {title}");

        for command in group.commands {
            let arrow = stylize(ICONS.arrow, theme.secondary, false, use_color);
            let command_text = stylize(command, theme.secondary, false, use_color);
            let _ = writeln!(buffer, "    {arrow} {command_text}");
        }

        if index + 1 < groups.len() {
            buffer.push('\n');
        }
    }

    buffer
}

fn render_top_level_appendix(use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let env_heading = stylize("Environment Variables:", theme.highlight, true, use_color);
    let _ = writeln!(buffer, "{env_heading}");
    for (key, description) in ENVIRONMENT_VARIABLES {
        let key_text = stylize(key, theme.key, true, use_color);
        let value_text = stylize(description, theme.value, false, use_color);
        let _ = writeln!(buffer, "  {key_text}  {value_text}");
    }

    buffer.push('\n');

    let tip_heading = stylize("Tip:", theme.highlight, true, use_color);
    let tip_text = stylize(
        "Use 'fakebook <command> --help' to view examples for each command.",
        theme.secondary,
        false,
        use_color,
    );
    let _ = writeln!(buffer, "{tip_heading} {tip_text}");

    buffer
}

fn print_blank_line_stdout() -> io::Result<()> {
    let mut stdout = io::stdout();
    IoWrite::write_all(&mut stdout, b"\n")?;
    IoWrite::flush(&mut stdout)
}

fn print_blank_line_stderr() -> io::Result<()> {
    let mut stderr = io::stderr();
    IoWrite::write_all(&mut stderr, b"\n")?;
    IoWrite::flush(&mut stderr)
}

fn stylize(text: &str, color: ThemeColor, bold: bool, use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    let styled = text.color(color);
    if bold { styled.bold().to_string() } else { styled.to_string() }
}

fn detect_color_support() -> bool {
    ShouldColorize::from_env().should_colorize()
}

fn help_styles() -> Styles {
    let theme = &THEME;
    Styles::styled()
        .usage(style_from_color(theme.primary).bold())
        .header(style_from_color(theme.highlight).bold())
        .literal(style_from_color(theme.secondary))
        .placeholder(style_from_color(theme.muted))
        .valid(style_from_color(theme.success))
        .invalid(style_from_color(theme.warning))
        .error(style_from_color(theme.error).bold())
}

fn style_from_color(color: ThemeColor) -> Style {
    Style::new().fg_color(Some(color_to_clap_color(color)))
}

fn color_to_clap_color(color: ThemeColor) -> ClapColor {
    match color {
        ThemeColor::Black => ClapColor::Ansi(AnsiColor::Black),
        ThemeColor::Red => ClapColor::Ansi(AnsiColor::Red),
        ThemeColor::Green => ClapColor::Ansi(AnsiColor::Green),
        ThemeColor::Yellow => ClapColor::Ansi(AnsiColor::Yellow),
        ThemeColor::Blue => ClapColor::Ansi(AnsiColor::Blue),
        ThemeColor::Magenta => ClapColor::Ansi(AnsiColor::Magenta),
        ThemeColor::Cyan => ClapColor::Ansi(AnsiColor::Cyan),
        ThemeColor::White => ClapColor::Ansi(AnsiColor::White),
        ThemeColor::BrightBlack => ClapColor::Ansi(AnsiColor::BrightBlack),
        ThemeColor::BrightRed => ClapColor::Ansi(AnsiColor::BrightRed),
        ThemeColor::BrightGreen => ClapColor::Ansi(AnsiColor::BrightGreen),
        ThemeColor::BrightYellow => ClapColor::Ansi(AnsiColor::BrightYellow),
        ThemeColor::BrightBlue => ClapColor::Ansi(AnsiColor::BrightBlue),
        ThemeColor::BrightMagenta => ClapColor::Ansi(AnsiColor::BrightMagenta),
        ThemeColor::BrightCyan => ClapColor::Ansi(AnsiColor::BrightCyan),
        ThemeColor::BrightWhite => ClapColor::Ansi(AnsiColor::BrightWhite),
        ThemeColor::TrueColor { r, g, b } => ClapColor::Rgb(RgbColor(r, g, b)),
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Register, list, show and update users
    #[command(subcommand)]
    User(UserCommands),

    /// Send, answer and list friend requests
    #[command(subcommand)]
    Friend(FriendCommands),

    /// Create posts, read feeds and profiles, like and comment
    #[command(subcommand)]
    Post(PostCommands),

    /// Admin-only listings and deletions
    #[command(subcommand)]
    Admin(AdminCommands),

    /// Run the friendship walkthrough on a throwaway in-memory store
    Demo,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse_with_styles();

    let default_filter = if cli.verbose { "fakebook=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output.clone(),
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    });

    let _ = print_blank_line_stdout();

    match execute(cli, &output).await {
        Ok(()) => {
            let _ = print_blank_line_stdout();
        }
        Err(err) => {
            output.error(&format!("{err:#}"));
            let _ = print_blank_line_stdout();
            std::process::exit(1);
        }
    }
}

async fn execute(cli: Cli, output: &OutputManager) -> Result<()> {
    if let Commands::Demo = cli.command {
        return handle_demo(output).await;
    }

    let ctx = AppContext::load(cli.config.as_deref())?;
    let store = ctx.connect(output).await?;
    let auth = Authenticator::new(&store);
    let actor = Actor {
        email: cli.as_user,
        password: cli.password,
    };
    let user = actor.sign_in(&auth).await?;
    if let Some(user) = &user {
        output.verbose(&format!("acting as {} ({})", user.email, user.id));
    }

    let session = Session {
        store: &store,
        auth: &auth,
        config: &ctx.config,
        user,
        output,
    };

    match cli.command {
        Commands::User(command) => handle_user_commands(command, &session).await?,
        Commands::Friend(command) => handle_friend_commands(command, &session).await?,
        Commands::Post(command) => handle_post_commands(command, &session).await?,
        Commands::Admin(command) => handle_admin_commands(command, &session).await?,
        Commands::Demo => handle_demo(output).await?,
    }

    Ok(())
}
