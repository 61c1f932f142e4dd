use serde::{Deserialize, Serialize};

// What clients send to the protected endpoints
#[derive(Deserialize, Clone)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

// What gets forwarded to the inference service
#[derive(Serialize, Clone)]
pub struct UpstreamAskRequest {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub stream: bool,
}

const MAX_QUESTION_LEN: usize = 4000;
const MAX_SESSION_ID_LEN: usize = 64;

/// Syntactic validation of an incoming request. Pure function: returns
/// the sanitized payload or a message suitable for a 400 body. Never
/// touches any limiter state.
pub fn validate(req: &AskRequest, stream: bool) -> Result<UpstreamAskRequest, String> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err("question must not be empty".to_owned());
    }
    if question.len() > MAX_QUESTION_LEN {
        return Err(format!("question exceeds {MAX_QUESTION_LEN} characters"));
    }

    let session_id = match req.session_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(id) => {
            if id.len() > MAX_SESSION_ID_LEN
                || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err("session_id is malformed".to_owned());
            }
            Some(id.to_owned())
        }
    };

    Ok(UpstreamAskRequest {
        question: question.to_owned(),
        session_id,
        stream,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(question: &str, session_id: Option<&str>) -> AskRequest {
        AskRequest {
            question: question.to_owned(),
            session_id: session_id.map(str::to_owned),
        }
    }

    #[test]
    fn trims_and_accepts_a_plain_question() {
        let out = validate(&request("  why is the sky blue?  ", None), false).unwrap();
        assert_eq!(out.question, "why is the sky blue?");
        assert_eq!(out.session_id, None);
        assert!(!out.stream);
    }

    #[test]
    fn rejects_empty_and_oversized_questions() {
        assert!(validate(&request("   ", None), false).is_err());
        let long = "x".repeat(MAX_QUESTION_LEN + 1);
        assert!(validate(&request(&long, None), false).is_err());
    }

    #[test]
    fn session_id_charset_is_enforced() {
        assert!(validate(&request("q", Some("abc-123_DEF")), true).is_ok());
        assert!(validate(&request("q", Some("no spaces")), true).is_err());
        assert!(validate(&request("q", Some("semi;colon")), true).is_err());
    }

    #[test]
    fn blank_session_id_normalizes_to_none() {
        let out = validate(&request("q", Some("  ")), true).unwrap();
        assert_eq!(out.session_id, None);
    }
}
