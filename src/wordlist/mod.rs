use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;

pub const DEFAULT_MAX_PASSWORDS: usize = 1000;

// magic wordlist path that selects the built-in list
pub const BUILTIN_WORDLIST: &str = "builtin";

#[derive(Clone, Debug)]
pub enum PasswordSource {
    FilePath(String),
    Inline(Vec<String>),
    Builtin,
}

#[derive(Debug, Error)]
pub enum WordlistError {
    #[error("failed to open wordlist: {path}: {source}")]
    FileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read wordlist: {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// resolves a password source into an ordered candidate list. file loads
// trim lines, skip blanks and '#' comments, and stop at max_passwords.
pub async fn load_passwords(
    source: &PasswordSource,
    max_passwords: usize,
) -> Result<Vec<String>, WordlistError> {
    match source {
        PasswordSource::Builtin => Ok(builtin_passwords()),
        PasswordSource::Inline(values) => Ok(values
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .take(max_passwords)
            .map(|s| s.to_string())
            .collect()),
        PasswordSource::FilePath(path) => {
            let path = crate::config::expand_tilde_string(path.as_str());
            let handle = File::open(&path).await.map_err(|e| WordlistError::FileOpen {
                path: path.clone(),
                source: e,
            })?;
            let mut out = Vec::new();
            let mut lines = BufReader::new(handle).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() || line.starts_with('#') {
                            continue;
                        }
                        out.push(line.to_string());
                        if out.len() >= max_passwords {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        return Err(WordlistError::FileRead { path, source: e });
                    }
                }
            }
            Ok(out)
        }
    }
}

// fallback list of common passwords for when no usable wordlist is given
pub fn builtin_passwords() -> Vec<String> {
    [
        "123456", "password", "123456789", "12345678", "12345", "qwerty", "abc123",
        "football", "1234567", "monkey", "111111", "letmein", "1234", "1234567890",
        "dragon", "baseball", "sunshine", "princess", "master", "hello", "freedom",
        "whatever", "qazwsx", "trustno1", "jordan", "harley", "buster", "thomas",
        "tigger", "robert", "soccer", "batman", "test", "pass", "killer", "hunter",
        "mike", "shadow", "mustang", "dennis", "fisher", "marshall", "cooper",
        "steve", "caesar", "mickey", "cowboy", "malcolm", "sievert", "buffalo",
        "swimming", "dolphins", "gandalf", "packers", "alexis", "player", "sunflower",
        "florida", "ferrari", "rainbow", "hammer", "silver", "orange", "88888888",
        "internet", "scooter", "golfer", "cookie", "richard", "summer",
        "heather", "yankees", "joshua", "maggie", "enter", "ashley",
        "thunder", "marvin", "dakota", "blowme", "spider", "miller",
        "chicago", "tigers", "gateway", "gators",
        "love", "5201314", "zoosk", "ninja", "cameron", "starwars",
        "fishing", "cowboys", "enigma", "bheem", "matt", "peanut", "morgan",
        "wizard", "tester", "butter",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
