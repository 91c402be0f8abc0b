use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "credbuster",
    version,
    about = "login brute-forcing pentesting tool",
    long_about = "Credbuster brute-forces HTTP login forms with a bounded worker pool, redirect/indicator based response classification, and CAPTCHA back-off.\n\nExamples:\n  credbuster -u http://target.tld/login.php -n admin -w passwords.txt\n  credbuster -u http://target.tld/login.php -n admin -w builtin --success-indicator dashboard\n  credbuster --scan http://target.tld/\n  credbuster --targets targets.yml --target dvwa_local\n\nUse only against systems you are authorized to test."
)]
pub struct CliArgs {
    #[arg(
        short = 'u',
        long = "url",
        value_name = "URL",
        help_heading = "Input",
        help = "Target login URL."
    )]
    pub url: Option<String>,

    #[arg(
        short = 'n',
        long = "username",
        value_name = "NAME",
        help_heading = "Input",
        help = "Username to attack."
    )]
    pub username: Option<String>,

    #[arg(
        short = 'w',
        long = "wordlist",
        value_name = "FILE",
        help_heading = "Input",
        help = "Password list file ('builtin' selects the built-in list)."
    )]
    pub wordlist: Option<String>,

    #[arg(
        long = "max-passwords",
        value_name = "N",
        help_heading = "Input",
        help = "Cap on passwords loaded from a wordlist file."
    )]
    pub max_passwords: Option<usize>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.credbuster/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "targets",
        value_name = "FILE",
        help_heading = "Input",
        help = "YAML file of named target entries for sequential runs."
    )]
    pub targets: Option<String>,

    #[arg(
        long = "target",
        value_name = "NAME",
        help_heading = "Input",
        help = "Run a single named entry from --targets."
    )]
    pub target: Option<String>,

    #[arg(
        long = "list-targets",
        help_heading = "Input",
        help = "List entries in --targets and exit."
    )]
    pub list_targets: bool,

    #[arg(
        long = "uf",
        visible_alias = "username-field",
        value_name = "NAME",
        help_heading = "Form",
        help = "Form field name carrying the username."
    )]
    pub username_field: Option<String>,

    #[arg(
        long = "pf",
        visible_alias = "password-field",
        value_name = "NAME",
        help_heading = "Form",
        help = "Form field name carrying the password."
    )]
    pub password_field: Option<String>,

    #[arg(
        long = "si",
        visible_alias = "success-indicator",
        value_name = "TEXT",
        help_heading = "Detection",
        help = "Body text marking a successful login (case-insensitive)."
    )]
    pub success_indicator: Option<String>,

    #[arg(
        long = "fi",
        visible_alias = "failure-indicator",
        value_name = "TEXT",
        help_heading = "Detection",
        help = "Body text marking a failed login (case-insensitive)."
    )]
    pub failure_indicator: Option<String>,

    #[arg(
        long = "sr",
        visible_alias = "success-regex",
        value_name = "REGEX",
        help_heading = "Detection",
        help = "Regex over the raw body marking a successful login."
    )]
    pub success_regex: Option<String>,

    #[arg(
        long = "fr",
        visible_alias = "failure-regex",
        value_name = "REGEX",
        help_heading = "Detection",
        help = "Regex over the raw body marking a failed login."
    )]
    pub failure_regex: Option<String>,

    #[arg(
        short = 'x',
        long = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "Proxy URL for all requests."
    )]
    pub proxy: Option<String>,

    #[arg(
        long = "ua",
        visible_alias = "user-agent",
        value_name = "STRING",
        help_heading = "HTTP",
        help = "Custom User-Agent header."
    )]
    pub user_agent: Option<String>,

    #[arg(
        long = "timeout",
        value_name = "SECS",
        help_heading = "HTTP",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<usize>,

    #[arg(
        short = 'r',
        long = "rt",
        visible_alias = "rate",
        value_name = "RPS",
        help_heading = "Performance",
        help = "Attempt submission rate limit (attempts per second)."
    )]
    pub rate: Option<u32>,

    #[arg(
        short = 't',
        long = "threads",
        visible_alias = "workers",
        value_name = "N",
        help_heading = "Performance",
        help = "Number of concurrent workers."
    )]
    pub threads: Option<u32>,

    #[arg(
        short = 'd',
        long = "delay",
        value_name = "SECS",
        help_heading = "Performance",
        help = "Delay between attempts per worker (fractional seconds)."
    )]
    pub delay: Option<f64>,

    #[arg(
        long = "pi",
        visible_alias = "progress-interval",
        value_name = "N",
        help_heading = "Output",
        help = "Emit a progress line every N attempts."
    )]
    pub progress_interval: Option<usize>,

    #[arg(
        short = 'l',
        long = "logfile",
        value_name = "FILE",
        help_heading = "Output",
        help = "Append all attempt/result lines to this file."
    )]
    pub logfile: Option<String>,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write a run report to this file."
    )]
    pub output: Option<String>,

    #[arg(
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Report format: text, json, or yaml (inferred from path if unset)."
    )]
    pub output_format: Option<String>,

    #[arg(
        long = "sa",
        visible_alias = "show-attempts",
        help_heading = "Output",
        help = "Print every failed attempt, not just findings."
    )]
    pub show_attempts: bool,

    #[arg(
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        long = "scan",
        value_name = "URL",
        help_heading = "Scan",
        help = "Scan a page for login forms and print/save detected configs."
    )]
    pub scan: Option<String>,

    #[arg(
        long = "scan-output",
        value_name = "FILE",
        help_heading = "Scan",
        help = "Write detected configs as a YAML targets file."
    )]
    pub scan_output: Option<String>,
}
