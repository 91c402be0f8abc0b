use crate::cli::args::CliArgs;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.success_regex.as_deref() {
        regex::Regex::new(raw).map_err(|e| format!("invalid --success-regex '{raw}': {e}"))?;
    }
    if let Some(raw) = args.failure_regex.as_deref() {
        regex::Regex::new(raw).map_err(|e| format!("invalid --failure-regex '{raw}': {e}"))?;
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid --timeout, expected positive integer".to_string());
        }
    }
    if let Some(threads) = args.threads {
        if threads == 0 {
            return Err("invalid --threads, expected positive integer".to_string());
        }
    }
    if let Some(rate) = args.rate {
        if rate == 0 {
            return Err("invalid --rate, expected positive integer".to_string());
        }
    }
    if let Some(interval) = args.progress_interval {
        if interval == 0 {
            return Err("invalid --progress-interval, expected positive integer".to_string());
        }
    }
    if let Some(delay) = args.delay {
        if !delay.is_finite() || delay < 0.0 {
            return Err("invalid --delay, expected non-negative seconds".to_string());
        }
    }
    if let Some(max_passwords) = args.max_passwords {
        if max_passwords == 0 {
            return Err("invalid --max-passwords, expected positive integer".to_string());
        }
    }
    if let Some(format) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(format).is_none() {
            return Err(format!(
                "invalid --output-format '{format}', expected text, json, or yaml"
            ));
        }
    }
    if args.target.is_some() && args.targets.is_none() {
        return Err("--target requires --targets".to_string());
    }
    if args.list_targets && args.targets.is_none() {
        return Err("--list-targets requires --targets".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(argv: &[&str]) -> CliArgs {
        let mut full = vec!["credbuster"];
        full.extend_from_slice(argv);
        CliArgs::parse_from(full)
    }

    #[test]
    fn accepts_a_plain_attack_invocation() {
        let args = parse(&["-u", "http://t.tld/login", "-n", "admin", "-w", "builtin"]);
        assert!(validate(&args).is_ok());
    }

    #[test]
    fn rejects_bad_regex() {
        let args = parse(&["--success-regex", "("]);
        assert!(validate(&args).unwrap_err().contains("--success-regex"));
    }

    #[test]
    fn rejects_zero_threads() {
        let args = parse(&["-t", "0"]);
        assert!(validate(&args).unwrap_err().contains("--threads"));
    }

    #[test]
    fn rejects_negative_delay() {
        let args = parse(&["--delay=-1.5"]);
        assert!(validate(&args).unwrap_err().contains("--delay"));
    }

    #[test]
    fn rejects_unknown_output_format() {
        let args = parse(&["--output-format", "xml"]);
        assert!(validate(&args).unwrap_err().contains("--output-format"));
    }

    #[test]
    fn target_without_targets_is_rejected() {
        let args = parse(&["--target", "x"]);
        assert!(validate(&args).is_err());
    }
}
