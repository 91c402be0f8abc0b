use regex::Regex;

// markers that indicate the target started serving a CAPTCHA challenge
const CAPTCHA_MARKERS: [&str; 4] = ["captcha", "recaptcha", "i am not a robot", "please verify"];

#[derive(Clone, Debug, Default)]
pub struct Indicators {
    pub success_literal: Option<String>,
    pub failure_literal: Option<String>,
    pub success_regex: Option<Regex>,
    pub failure_regex: Option<Regex>,
}

// everything classification needs from one login response, captured
// by the executor so classification stays free of network state
#[derive(Clone, Debug)]
pub struct LoginResponse {
    pub status: u16,
    pub requested_url: String,
    pub final_url: String,
    pub body: String,
}

impl LoginResponse {
    pub fn was_redirected(&self) -> bool {
        self.final_url != self.requested_url
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Success,
    ExplicitFailure,
    AmbiguousFailure,
    Captcha,
}

pub fn classify(response: &LoginResponse, indicators: &Indicators) -> Classification {
    // a followed redirect chain is the strongest post-login signal and
    // overrides any indicator text in the final body
    if response.was_redirected() {
        return Classification::Success;
    }

    let lowered = response.body.to_lowercase();

    if contains_captcha_marker(&lowered) {
        return Classification::Captcha;
    }

    if matches_success(&lowered, &response.body, indicators) {
        return Classification::Success;
    }

    if matches_failure(&lowered, &response.body, indicators) {
        return Classification::ExplicitFailure;
    }

    Classification::AmbiguousFailure
}

fn contains_captcha_marker(lowered_body: &str) -> bool {
    CAPTCHA_MARKERS
        .iter()
        .any(|marker| lowered_body.contains(marker))
}

fn matches_success(lowered_body: &str, body: &str, indicators: &Indicators) -> bool {
    if let Some(literal) = indicators.success_literal.as_deref() {
        if lowered_body.contains(&literal.to_lowercase()) {
            return true;
        }
    }
    if let Some(re) = indicators.success_regex.as_ref() {
        if re.is_match(body) {
            return true;
        }
    }
    false
}

fn matches_failure(lowered_body: &str, body: &str, indicators: &Indicators) -> bool {
    if let Some(literal) = indicators.failure_literal.as_deref() {
        if lowered_body.contains(&literal.to_lowercase()) {
            return true;
        }
    }
    if let Some(re) = indicators.failure_regex.as_ref() {
        if re.is_match(body) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> LoginResponse {
        LoginResponse {
            status: 200,
            requested_url: "http://target.tld/login".to_string(),
            final_url: "http://target.tld/login".to_string(),
            body: body.to_string(),
        }
    }

    fn indicators() -> Indicators {
        Indicators {
            success_literal: Some("welcome".to_string()),
            failure_literal: Some("invalid credentials".to_string()),
            success_regex: None,
            failure_regex: None,
        }
    }

    #[test]
    fn redirect_wins_over_failure_text() {
        let mut resp = response("Invalid credentials, please verify your password");
        resp.final_url = "http://target.tld/dashboard".to_string();
        assert_eq!(classify(&resp, &indicators()), Classification::Success);
    }

    #[test]
    fn captcha_short_circuits_success_text() {
        let resp = response("Welcome! But first, complete the reCAPTCHA below");
        assert_eq!(classify(&resp, &indicators()), Classification::Captcha);
    }

    #[test]
    fn captcha_marker_phrases_are_detected() {
        for body in [
            "please solve the CAPTCHA",
            "protected by reCaptcha",
            "Check: I am not a robot",
            "Please verify you are human",
        ] {
            assert_eq!(classify(&response(body), &indicators()), Classification::Captcha);
        }
    }

    #[test]
    fn success_literal_is_case_insensitive() {
        let resp = response("<h1>WELCOME back, admin</h1>");
        assert_eq!(classify(&resp, &indicators()), Classification::Success);
    }

    #[test]
    fn success_regex_matches_raw_body() {
        let mut inds = Indicators::default();
        inds.success_regex = Some(Regex::new(r"session=[0-9a-f]{8}").unwrap());
        let resp = response("Set-Cookie echo: session=deadbeef");
        assert_eq!(classify(&resp, &inds), Classification::Success);
    }

    #[test]
    fn success_regex_is_case_sensitive_unlike_literal() {
        let mut inds = Indicators::default();
        inds.success_regex = Some(Regex::new("Welcome").unwrap());
        assert_eq!(
            classify(&response("welcome back"), &inds),
            Classification::AmbiguousFailure
        );
    }

    #[test]
    fn failure_literal_yields_explicit_failure() {
        let resp = response("Error: invalid credentials");
        assert_eq!(classify(&resp, &indicators()), Classification::ExplicitFailure);
    }

    #[test]
    fn failure_regex_yields_explicit_failure() {
        let mut inds = Indicators::default();
        inds.failure_regex = Some(Regex::new(r"login failed \(attempt \d+\)").unwrap());
        let resp = response("login failed (attempt 3)");
        assert_eq!(classify(&resp, &inds), Classification::ExplicitFailure);
    }

    #[test]
    fn no_markers_yields_ambiguous_failure() {
        let resp = response("<html><body>hello</body></html>");
        assert_eq!(classify(&resp, &indicators()), Classification::AmbiguousFailure);
    }

    #[test]
    fn success_checked_before_failure() {
        let resp = response("welcome back (previous attempt was invalid credentials)");
        assert_eq!(classify(&resp, &indicators()), Classification::Success);
    }
}
