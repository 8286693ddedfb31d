use rand::{distributions::Alphanumeric, thread_rng, Rng};

const SESSION_TOKEN_LEN: usize = 32;

/// Opaque bearer token identifying one live quiz session.
pub fn generate_session_token() -> String {
    let body: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect();
    format!("qs_{}", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_prefixed_and_unique() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert!(a.starts_with("qs_"));
        assert_eq!(a.len(), SESSION_TOKEN_LEN + 3);
        assert_ne!(a, b);
    }
}
